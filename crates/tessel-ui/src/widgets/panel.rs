use tessel_engine::coords::Rect;
use tessel_engine::material::Material;
use tessel_engine::mesh::Mesh;
use tessel_engine::paint::Color;

use crate::error::UiError;
use crate::tree::ElementId;

use super::{Placement, WidgetCtx};

/// A solid-colour rectangle.
///
/// The quad is authored in unit space and scaled by the resolved size, so a
/// panel follows its anchors without rebuilding the mesh.
#[derive(Debug, Clone)]
pub struct Panel {
    name: String,
    color: Color,
    placement: Placement,
}

impl Panel {
    pub fn new(color: Color) -> Self {
        Self { name: "panel".to_string(), color, placement: Placement::default() }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn place(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn build(self, cx: &mut WidgetCtx<'_>, parent: ElementId) -> Result<ElementId, UiError> {
        let mesh = Mesh::quad(Rect::UNIT, Rect::UNIT);
        let material = Material::new(cx.programs.solid.clone());
        cx.spawn_drawable(&self.name, parent, self.placement, mesh, material, self.color)
    }
}
