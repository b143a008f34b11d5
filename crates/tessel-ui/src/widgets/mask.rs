use tessel_engine::coords::Rect;
use tessel_engine::material::Material;
use tessel_engine::mesh::Mesh;
use tessel_engine::paint::Color;

use crate::error::UiError;
use crate::tree::ElementId;

use super::{Placement, WidgetCtx};

/// An element that clips its descendants to its own rect, with an optional
/// background fill drawn under them.
#[derive(Debug, Clone)]
pub struct Mask {
    name: String,
    background: Option<Color>,
    placement: Placement,
}

impl Mask {
    pub fn new() -> Self {
        Self { name: "mask".to_string(), background: None, placement: Placement::default() }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = Some(color);
        self
    }

    pub fn place(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn build(self, cx: &mut WidgetCtx<'_>, parent: ElementId) -> Result<ElementId, UiError> {
        let id = match self.background {
            Some(color) => {
                let mesh = Mesh::quad(Rect::UNIT, Rect::UNIT);
                let material = Material::new(cx.programs.solid.clone());
                cx.spawn_drawable(&self.name, parent, self.placement, mesh, material, color)?
            }
            None => {
                let id = cx.tree.create(self.name);
                cx.attach(id, parent, self.placement)?;
                id
            }
        };
        cx.tree.set_mask(id, true)?;
        Ok(id)
    }
}

impl Default for Mask {
    fn default() -> Self {
        Self::new()
    }
}
