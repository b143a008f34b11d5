//! Render driver for one element tree.
//!
//! The canvas owns the tree and its root, keeps the screen-space projection
//! in step with the window, runs behaviours and walks the tree pre-order
//! turning payloads into draws. Z-order is traversal order: later siblings
//! and children draw over earlier ones.

use glam::Mat4;

use tessel_engine::coords::{Rect, Vec2, Vec2i, Viewport};
use tessel_engine::gpu::GraphicsDevice;
use tessel_engine::paint::Color;
use tessel_engine::render::builtin::uniforms;

use crate::behavior::BehaviorCtx;
use crate::error::UiError;
use crate::input::UiInput;
use crate::tree::{ElementId, UiTree};

/// Canvas-wide settings.
#[derive(Debug, Clone, Copy)]
pub struct CanvasConfig {
    /// Colour the frame is cleared to before the tree draws.
    pub clear_color: Color,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self { clear_color: Color::from_straight(0.07, 0.07, 0.09, 1.0) }
    }
}

/// One tree walk entry: the element, the alpha its ancestors multiply in
/// and the scissor inherited from enclosing masks (`None` = unclipped).
#[derive(Copy, Clone)]
struct Visit {
    id: ElementId,
    alpha: f32,
    clip: Option<Rect>,
}

pub struct Canvas {
    tree: UiTree,
    root: ElementId,
    size: Vec2i,
    projection: Mat4,
    config: CanvasConfig,
}

impl Canvas {
    /// A canvas of `width × height` logical pixels whose root stretches over
    /// the whole surface.
    pub fn new(width: f32, height: f32, config: CanvasConfig) -> Self {
        let mut tree = UiTree::new();
        let root = tree.create("canvas");
        let mut canvas = Self { tree, root, size: Vec2i::ZERO, projection: Mat4::IDENTITY, config };
        // The root was just created, so these cannot see a stale id.
        let _ = canvas.tree.set_anchors(root, Vec2::ZERO, Vec2::ONE);
        canvas.recompute_projection(width, height);
        canvas
    }

    pub fn tree(&self) -> &UiTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut UiTree {
        &mut self.tree
    }

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn size(&self) -> Vec2i {
        self.size
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    /// Creates an element and attaches it to `parent` (the root when `None`).
    pub fn spawn(&mut self, name: impl Into<String>, parent: Option<ElementId>) -> Result<ElementId, UiError> {
        let id = self.tree.create(name);
        self.tree.add_child(parent.unwrap_or(self.root), id)?;
        Ok(id)
    }

    /// Rebuilds the orthographic projection for a new surface size
    /// (logical pixels, origin top-left, +Y down) and re-lays the whole tree.
    pub fn recompute_projection(&mut self, width: f32, height: f32) {
        let (w, h) = (width.max(0.0), height.max(0.0));
        self.size = Vec2::new(w, h).round_to_i();
        self.projection = Mat4::orthographic_rh(0.0, w.max(1.0), h.max(1.0), 0.0, -1.0, 1.0);
        if let Err(e) = self.tree.set_canvas_frame(self.root, self.size) {
            log::error!("canvas root lost: {e}");
        }
        log::debug!("canvas projection {w}x{h}");
    }

    // ── per frame ─────────────────────────────────────────────────────────

    /// Runs the behaviour of every active element, in draw order.
    ///
    /// The order is fixed before the first behaviour runs; elements created
    /// meanwhile run next frame, destroyed ones are skipped.
    pub fn update(&mut self, input: &UiInput) -> Result<(), UiError> {
        for id in self.tree.pre_order(self.root)? {
            if !self.tree.is_active(id).unwrap_or(false) {
                continue;
            }
            let Some(mut behavior) = self.tree.take_behavior(id) else {
                continue;
            };
            let result = behavior.update(&mut BehaviorCtx { tree: &mut self.tree, element: id, input });
            self.tree.restore_behavior(id, behavior);
            result?;
        }
        Ok(())
    }

    /// Drains deferred GPU commands, starts a device frame and renders.
    pub fn frame(&mut self, dev: &mut GraphicsDevice, viewport: Viewport) -> Result<u32, UiError> {
        dev.drain_commands()?;
        dev.begin_frame(viewport);
        self.render(dev)
    }

    /// Walks active elements pre-order and records one draw per drawable
    /// payload. Returns the number of draws.
    ///
    /// Per draw the material is applied first, then `transform` (projection
    /// × element matrix) and `tint` (element tint × inherited alpha) are set,
    /// so those two always come from the element.
    pub fn render(&mut self, dev: &mut GraphicsDevice) -> Result<u32, UiError> {
        let mut draws = 0;
        let mut stack = vec![Visit { id: self.root, alpha: 1.0, clip: None }];

        while let Some(visit) = stack.pop() {
            let element = self.tree.element(visit.id)?;
            if !element.is_active() {
                continue;
            }
            let alpha = visit.alpha * element.alpha();
            let tint = element.tint();
            let masks = element.is_mask();

            let resolved = self.tree.resolve(visit.id)?;
            let element = self.tree.element(visit.id)?;

            // An applied but empty mesh draws nothing; one never applied is an error.
            if let Some(payload) = element.payload().filter(|p| !p.mesh.is_applied() || p.mesh.is_drawable()) {
                let vertex_array = payload.mesh.vertex_array()?;
                let program = payload.material.program();
                payload.material.apply()?;
                program.set_matrix(uniforms::TRANSFORM, self.projection * resolved.matrix)?;
                program.set_color(uniforms::TINT, tint.with_opacity(alpha))?;
                dev.draw(program, vertex_array, visit.clip)?;
                draws += 1;
            }

            let clip = if masks {
                match child_clip(visit.clip, resolved.rect()) {
                    Some(clip) => Some(clip),
                    None => continue,
                }
            } else {
                visit.clip
            };
            stack.extend(element.children().iter().rev().map(|&id| Visit { id, alpha, clip }));
        }

        log::trace!("canvas rendered {draws} draws");
        Ok(draws)
    }

    /// The front-most active element under `point`, honouring masks.
    pub fn hit_test(&mut self, point: Vec2) -> Result<Option<ElementId>, UiError> {
        let mut hits = Vec::new();
        let mut stack = vec![Visit { id: self.root, alpha: 1.0, clip: None }];

        while let Some(visit) = stack.pop() {
            if !self.tree.is_active(visit.id)? {
                continue;
            }
            let rect = self.tree.rect(visit.id)?;
            if rect.contains(point) && visit.clip.is_none_or(|c| c.contains(point)) {
                hits.push(visit.id);
            }

            let element = self.tree.element(visit.id)?;
            let clip = if element.is_mask() {
                match child_clip(visit.clip, rect) {
                    Some(clip) => Some(clip),
                    None => continue,
                }
            } else {
                visit.clip
            };
            stack.extend(element.children().iter().rev().map(|&id| Visit { id, alpha: 1.0, clip }));
        }

        Ok(hits.pop())
    }

    /// Destroys every element, root included, and starts over with a fresh root.
    pub fn clear(&mut self, dev: &mut GraphicsDevice) {
        self.tree.destroy(dev, self.root);
        self.root = self.tree.create("canvas");
        let _ = self.tree.set_anchors(self.root, Vec2::ZERO, Vec2::ONE);
        let (w, h) = (self.size.x as f32, self.size.y as f32);
        self.recompute_projection(w, h);
    }
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("size", &self.size)
            .field("elements", &self.tree.len())
            .finish()
    }
}

/// Scissor for a mask's children: its own rect, narrowed by the enclosing
/// clip. `None` when nothing remains visible.
fn child_clip(enclosing: Option<Rect>, own: Rect) -> Option<Rect> {
    match enclosing {
        Some(clip) => clip.intersect(own),
        None if own.is_empty() => None,
        None => Some(own.normalized()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canvas() -> Canvas {
        Canvas::new(320.0, 200.0, CanvasConfig::default())
    }

    // ── projection ────────────────────────────────────────────────────────

    #[test]
    fn projection_maps_corners_to_clip_space() {
        let c = canvas();
        let tl = c.projection().transform_point3(glam::Vec3::new(0.0, 0.0, 0.0));
        let br = c.projection().transform_point3(glam::Vec3::new(320.0, 200.0, 0.0));
        assert!((tl.x + 1.0).abs() < 1e-5 && (tl.y - 1.0).abs() < 1e-5);
        assert!((br.x - 1.0).abs() < 1e-5 && (br.y + 1.0).abs() < 1e-5);
    }

    #[test]
    fn resize_relayouts_root_and_stretching_children() {
        let mut c = canvas();
        let child = c.spawn("child", None).unwrap();
        c.tree_mut().set_anchors(child, Vec2::ZERO, Vec2::ONE).unwrap();
        assert_eq!(c.tree_mut().scaled_size(child).unwrap(), Vec2i::new(320, 200));

        c.recompute_projection(800.0, 600.0);
        assert!(c.tree().is_dirty(child).unwrap());
        assert_eq!(c.tree_mut().scaled_size(child).unwrap(), Vec2i::new(800, 600));
        assert_eq!(c.size(), Vec2i::new(800, 600));
    }

    // ── hit testing ───────────────────────────────────────────────────────

    #[test]
    fn hit_test_prefers_front_most() {
        let mut c = canvas();
        let back = c.spawn("back", None).unwrap();
        let front = c.spawn("front", None).unwrap();
        for id in [back, front] {
            c.tree_mut().set_size(id, Vec2i::new(50, 50)).unwrap();
        }
        assert_eq!(c.hit_test(Vec2::new(10.0, 10.0)).unwrap(), Some(front));

        c.tree_mut().set_active(front, false).unwrap();
        assert_eq!(c.hit_test(Vec2::new(10.0, 10.0)).unwrap(), Some(back));
        assert_eq!(c.hit_test(Vec2::new(100.0, 100.0)).unwrap(), Some(c.root()));
        assert_eq!(c.hit_test(Vec2::new(-1.0, 0.0)).unwrap(), None);
    }

    #[test]
    fn masked_children_are_not_hit_outside_the_mask() {
        let mut c = canvas();
        let mask = c.spawn("mask", None).unwrap();
        c.tree_mut().set_size(mask, Vec2i::new(20, 20)).unwrap();
        c.tree_mut().set_mask(mask, true).unwrap();
        let wide = c.spawn("wide", Some(mask)).unwrap();
        c.tree_mut().set_size(wide, Vec2i::new(100, 20)).unwrap();

        assert_eq!(c.hit_test(Vec2::new(10.0, 10.0)).unwrap(), Some(wide));
        assert_eq!(c.hit_test(Vec2::new(50.0, 10.0)).unwrap(), Some(c.root()));
    }

    // ── clear ─────────────────────────────────────────────────────────────

    #[test]
    fn clear_starts_a_fresh_root() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let mut c = canvas();
        let old_root = c.root();
        c.spawn("child", None).unwrap();
        c.clear(&mut dev);
        assert_ne!(c.root(), old_root);
        assert_eq!(c.tree().len(), 1);
        let root = c.root();
        assert_eq!(c.tree_mut().scaled_size(root).unwrap(), Vec2i::new(320, 200));
    }
}
