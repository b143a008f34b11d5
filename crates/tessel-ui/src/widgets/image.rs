use std::rc::Rc;

use tessel_engine::coords::Rect;
use tessel_engine::gpu::Texture;
use tessel_engine::material::Material;
use tessel_engine::mesh::Mesh;
use tessel_engine::paint::Color;
use tessel_engine::render::builtin::uniforms;

use crate::error::UiError;
use crate::tree::ElementId;

use super::{Placement, WidgetCtx};

/// A textured rectangle, optionally showing a sub-rect of the texture.
///
/// When the image is destroyed its texture is released too, unless
/// something else still holds the `Rc`.
#[derive(Debug, Clone)]
pub struct Image {
    name: String,
    texture: Rc<Texture>,
    uv: Rect,
    tint: Color,
    placement: Placement,
}

impl Image {
    pub fn new(texture: Rc<Texture>) -> Self {
        Self { name: "image".to_string(), texture, uv: Rect::UNIT, tint: Color::WHITE, placement: Placement::default() }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Atlas-normalized rect to sample.
    pub fn uv(mut self, uv: Rect) -> Self {
        self.uv = uv;
        self
    }

    pub fn tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    pub fn place(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn build(self, cx: &mut WidgetCtx<'_>, parent: ElementId) -> Result<ElementId, UiError> {
        let mesh = Mesh::quad(Rect::UNIT, self.uv);
        let mut material = Material::new(cx.programs.sprite.clone());
        material.set_texture(uniforms::MAIN_TEXTURE, self.texture);
        cx.spawn_drawable(&self.name, parent, self.placement, mesh, material, self.tint)
    }
}
