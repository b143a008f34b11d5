//! Element builders and behaviours.
//!
//! Panels, images, labels and masks are payload builders: they create one
//! element with a mesh and material and attach it. Scroll bars and scroll
//! views add a [`Behavior`](crate::behavior::Behavior) on top.

pub mod image;
pub mod label;
pub mod mask;
pub mod panel;
pub mod scroll_view;
pub mod scrollbar;

use std::rc::Rc;

use tessel_engine::coords::{Vec2, Vec2i};
use tessel_engine::gpu::{GraphicsDevice, Program};
use tessel_engine::material::Material;
use tessel_engine::mesh::Mesh;
use tessel_engine::paint::Color;
use tessel_engine::render::builtin;

use crate::error::UiError;
use crate::layout::Edges;
use crate::tree::{ElementId, RenderPayload, UiTree};

// ── UiPrograms ────────────────────────────────────────────────────────────

/// The built-in programs, compiled once and shared by every widget.
#[derive(Debug, Clone)]
pub struct UiPrograms {
    pub solid: Rc<Program>,
    pub sprite: Rc<Program>,
    pub text: Rc<Program>,
    pub vertex_color: Rc<Program>,
}

impl UiPrograms {
    pub fn compile(dev: &mut GraphicsDevice) -> Result<Self, UiError> {
        Ok(Self {
            solid: Rc::new(Program::compile(dev, &builtin::SOLID)?),
            sprite: Rc::new(Program::compile(dev, &builtin::SPRITE)?),
            text: Rc::new(Program::compile(dev, &builtin::TEXT)?),
            vertex_color: Rc::new(Program::compile(dev, &builtin::VERTEX_COLOR)?),
        })
    }

    pub fn dispose(&self, dev: &mut GraphicsDevice) {
        for program in [&self.solid, &self.sprite, &self.text, &self.vertex_color] {
            program.dispose(dev);
        }
    }
}

// ── WidgetCtx ─────────────────────────────────────────────────────────────

/// Everything a builder needs to create and attach elements.
pub struct WidgetCtx<'a> {
    pub tree: &'a mut UiTree,
    pub dev: &'a mut GraphicsDevice,
    pub programs: &'a UiPrograms,
}

impl<'a> WidgetCtx<'a> {
    pub fn new(tree: &'a mut UiTree, dev: &'a mut GraphicsDevice, programs: &'a UiPrograms) -> Self {
        Self { tree, dev, programs }
    }

    /// Applies `mesh`, wraps it with `material` and attaches the new element
    /// under `parent`. Nothing is left behind on failure.
    pub(crate) fn spawn_drawable(
        &mut self,
        name: &str,
        parent: ElementId,
        placement: Placement,
        mut mesh: Mesh,
        material: Material,
        tint: Color,
    ) -> Result<ElementId, UiError> {
        mesh.apply(self.dev)?;
        let id = self.tree.create(name);
        self.tree.set_payload(id, Some(RenderPayload::new(mesh, material)))?;
        self.tree.set_tint(id, tint)?;
        self.attach(id, parent, placement)?;
        Ok(id)
    }

    /// Places `id` and adds it under `parent`, destroying it on failure.
    pub(crate) fn attach(&mut self, id: ElementId, parent: ElementId, placement: Placement) -> Result<(), UiError> {
        let result = placement.apply(self.tree, id).and_then(|_| self.tree.add_child(parent, id));
        if result.is_err() {
            self.tree.destroy(self.dev, id);
        }
        result
    }
}

// ── Placement ─────────────────────────────────────────────────────────────

/// Layout inputs a builder sets on the element it creates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub position: Vec2i,
    pub size: Vec2i,
    pub pivot: Vec2,
    pub anchor_min: Vec2,
    pub anchor_max: Vec2,
    pub margin: Edges,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            position: Vec2i::ZERO,
            size: Vec2i::ZERO,
            pivot: Vec2::ZERO,
            anchor_min: Vec2::ZERO,
            anchor_max: Vec2::ZERO,
            margin: Edges::ZERO,
        }
    }
}

impl Placement {
    /// `size` at `position` from the parent's top-left.
    pub fn fixed(position: Vec2i, size: Vec2i) -> Self {
        Self { position, size, ..Self::default() }
    }

    /// Fills the parent's padded region, inset by `margin`.
    pub fn stretch(margin: Edges) -> Self {
        Self { anchor_max: Vec2::ONE, margin, ..Self::default() }
    }

    pub fn anchors(mut self, min: Vec2, max: Vec2) -> Self {
        self.anchor_min = min;
        self.anchor_max = max;
        self
    }

    pub fn pivot(mut self, pivot: Vec2) -> Self {
        self.pivot = pivot;
        self
    }

    pub fn margin(mut self, margin: Edges) -> Self {
        self.margin = margin;
        self
    }

    pub fn apply(&self, tree: &mut UiTree, id: ElementId) -> Result<(), UiError> {
        tree.set_position(id, self.position)?;
        tree.set_size(id, self.size)?;
        tree.set_pivot(id, self.pivot)?;
        tree.set_anchors(id, self.anchor_min, self.anchor_max)?;
        tree.set_margin(id, self.margin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_engine::gpu::HandleKind;

    #[test]
    fn programs_compile_and_dispose() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let programs = UiPrograms::compile(&mut dev).unwrap();
        assert_eq!(dev.live_resources(HandleKind::Program), 4);
        assert!(programs.text.has_texture(builtin::uniforms::MAIN_TEXTURE));
        programs.dispose(&mut dev);
        programs.dispose(&mut dev);
        assert_eq!(dev.live_resources(HandleKind::Program), 0);
    }

    #[test]
    fn failed_attach_leaves_nothing_behind() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let programs = UiPrograms::compile(&mut dev).unwrap();
        let mut tree = UiTree::new();
        let gone = tree.create("gone");
        tree.destroy(&mut dev, gone);

        let mut cx = WidgetCtx::new(&mut tree, &mut dev, &programs);
        let mesh = Mesh::quad(tessel_engine::coords::Rect::UNIT, tessel_engine::coords::Rect::UNIT);
        let material = Material::new(programs.solid.clone());
        let err = cx.spawn_drawable("orphan", gone, Placement::default(), mesh, material, Color::WHITE);
        assert!(matches!(err, Err(UiError::StaleElement(_))));
        assert!(tree.is_empty());
        assert_eq!(dev.live_resources(HandleKind::VertexArray), 0);
        programs.dispose(&mut dev);
    }
}
