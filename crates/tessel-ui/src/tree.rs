//! Retained element tree.
//!
//! Elements live in a slot arena addressed by generational [`ElementId`]s.
//! Layout inputs are plain data; the resolved rect and matrix are cached per
//! element behind an explicit dirty flag and recomputed on the next read.
//!
//! Invariants:
//! - an element has at most one parent, and parent links never form a cycle
//! - dirtying an element dirties every descendant; resolving clears only the
//!   resolved element
//! - a destroyed element's id stays stale forever (its slot's generation moves on)

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use tessel_engine::coords::{Rect, Vec2, Vec2i};
use tessel_engine::gpu::{GraphicsDevice, Texture};
use tessel_engine::material::Material;
use tessel_engine::mesh::Mesh;
use tessel_engine::paint::Color;

use crate::behavior::Behavior;
use crate::error::UiError;
use crate::layout::{resolve_node, Edges, LayoutInputs, ParentFrame, Resolved};

// ── ElementId ─────────────────────────────────────────────────────────────

/// Generational handle to an element in a [`UiTree`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ElementId {
    index: u32,
    generation: u32,
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

// ── Element ───────────────────────────────────────────────────────────────

/// What an element draws: geometry plus the material to draw it with.
#[derive(Debug)]
pub struct RenderPayload {
    pub mesh: Mesh,
    pub material: Material,
}

impl RenderPayload {
    pub fn new(mesh: Mesh, material: Material) -> Self {
        Self { mesh, material }
    }
}

/// One node of the tree. Read through [`UiTree::element`], mutate through
/// the tree's setters.
pub struct Element {
    name: String,
    inputs: LayoutInputs,
    padding: Edges,
    tint: Color,
    alpha: f32,

    parent: Option<ElementId>,
    children: Vec<ElementId>,

    active_self: bool,
    active_in_hierarchy: bool,

    payload: Option<RenderPayload>,
    mask: bool,
    behavior: Option<Box<dyn Behavior>>,

    resolved: Resolved,
    dirty: bool,
}

impl Element {
    fn new(name: String) -> Self {
        Self {
            name,
            inputs: LayoutInputs::default(),
            padding: Edges::ZERO,
            tint: Color::WHITE,
            alpha: 1.0,
            parent: None,
            children: Vec::new(),
            active_self: true,
            active_in_hierarchy: true,
            payload: None,
            mask: false,
            behavior: None,
            resolved: Resolved::default(),
            dirty: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &LayoutInputs {
        &self.inputs
    }

    pub fn padding(&self) -> Edges {
        self.padding
    }

    pub fn tint(&self) -> Color {
        self.tint
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    /// In draw order, back to front.
    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn active_self(&self) -> bool {
        self.active_self
    }

    pub fn is_active(&self) -> bool {
        self.active_self && self.active_in_hierarchy
    }

    pub fn payload(&self) -> Option<&RenderPayload> {
        self.payload.as_ref()
    }

    pub fn is_mask(&self) -> bool {
        self.mask
    }

    pub fn has_behavior(&self) -> bool {
        self.behavior.is_some()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("children", &self.children.len())
            .field("active", &self.is_active())
            .field("mask", &self.mask)
            .field("dirty", &self.dirty)
            .finish()
    }
}

// ── UiTree ────────────────────────────────────────────────────────────────

struct Slot {
    generation: u32,
    element: Option<Element>,
}

/// Arena of elements plus the canvas frame its root resolves against.
#[derive(Default)]
pub struct UiTree {
    slots: Vec<Slot>,
    free: Vec<u32>,
    canvas_root: Option<ElementId>,
    canvas_size: Vec2i,
}

impl UiTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached, active element with default inputs.
    pub fn create(&mut self, name: impl Into<String>) -> ElementId {
        let element = Element::new(name.into());
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.element = Some(element);
                ElementId { index, generation: slot.generation }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, element: Some(element) });
                ElementId { index, generation: 0 }
            }
        }
    }

    /// Number of live elements.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.element(id).is_ok()
    }

    pub fn element(&self, id: ElementId) -> Result<&Element, UiError> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.element.as_ref())
            .ok_or(UiError::StaleElement(id))
    }

    fn element_mut(&mut self, id: ElementId) -> Result<&mut Element, UiError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.element.as_mut())
            .ok_or(UiError::StaleElement(id))
    }

    /// Makes `root` resolve against `Rect(0, 0, size)` instead of a zero rect.
    pub fn set_canvas_frame(&mut self, root: ElementId, size: Vec2i) -> Result<(), UiError> {
        self.element(root)?;
        if let Some(old) = self.canvas_root.filter(|old| *old != root) {
            let _ = self.mark_dirty(old);
        }
        self.canvas_root = Some(root);
        self.canvas_size = size;
        self.mark_dirty(root)
    }

    // ── hierarchy ─────────────────────────────────────────────────────────

    /// Appends `child` as the last (front-most) child of `parent`, detaching
    /// it from any previous parent first.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), UiError> {
        self.element(child)?;
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(UiError::Cycle { parent, child });
            }
            cursor = self.element(id)?.parent;
        }

        if let Some(old) = self.element(child)?.parent {
            self.element_mut(old)?.children.retain(|c| *c != child);
        }
        let inherited = self.element(parent)?.is_active();
        self.element_mut(parent)?.children.push(child);

        let element = self.element_mut(child)?;
        element.parent = Some(parent);
        element.active_in_hierarchy = inherited;
        self.propagate_active(child)?;
        self.mark_dirty(child)
    }

    /// Detaches `child` from `parent`. The child keeps its subtree and
    /// becomes a detached root.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), UiError> {
        self.element(parent)?;
        if self.element(child)?.parent != Some(parent) {
            return Err(UiError::NotAChild { parent, child });
        }
        self.element_mut(parent)?.children.retain(|c| *c != child);

        let element = self.element_mut(child)?;
        element.parent = None;
        element.active_in_hierarchy = true;
        self.propagate_active(child)?;
        self.mark_dirty(child)
    }

    /// Destroys `id` and its subtree, children first.
    ///
    /// Releases each element's mesh and the material textures nothing else
    /// holds. Programs are shared and left alone. A stale id is a no-op.
    pub fn destroy(&mut self, dev: &mut GraphicsDevice, id: ElementId) {
        let Ok(element) = self.element(id) else {
            return;
        };
        if let Some(parent) = element.parent {
            if let Ok(parent) = self.element_mut(parent) {
                parent.children.retain(|c| *c != id);
            }
        }
        self.destroy_subtree(dev, id);
    }

    fn destroy_subtree(&mut self, dev: &mut GraphicsDevice, id: ElementId) {
        let children = match self.element(id) {
            Ok(element) => element.children.clone(),
            Err(_) => return,
        };
        for child in children {
            self.destroy_subtree(dev, child);
        }

        let slot = &mut self.slots[id.index as usize];
        let Some(element) = slot.element.take() else {
            return;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        if self.canvas_root == Some(id) {
            self.canvas_root = None;
        }

        if let Some(RenderPayload { mut mesh, material }) = element.payload {
            mesh.dispose(dev);
            // One material may hold the same texture under several names.
            let mut textures: Vec<Rc<Texture>> = Vec::new();
            for texture in material.textures() {
                if !textures.iter().any(|t| Rc::ptr_eq(t, texture)) {
                    textures.push(texture.clone());
                }
            }
            drop(material);
            for texture in textures.into_iter().filter(|t| Rc::strong_count(t) == 1) {
                texture.dispose(dev);
            }
        }
        log::trace!("destroyed element `{}` {id}", element.name);
    }

    pub fn parent(&self, id: ElementId) -> Result<Option<ElementId>, UiError> {
        Ok(self.element(id)?.parent)
    }

    pub fn children(&self, id: ElementId) -> Result<&[ElementId], UiError> {
        Ok(&self.element(id)?.children)
    }

    /// `root` and its descendants in draw order (pre-order).
    pub fn pre_order(&self, root: ElementId) -> Result<Vec<ElementId>, UiError> {
        self.element(root)?;
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Ok(element) = self.element(id) {
                stack.extend(element.children.iter().rev().copied());
            }
        }
        Ok(out)
    }

    // ── dirty flags ───────────────────────────────────────────────────────

    /// Flags `id` and every descendant for re-resolution.
    pub fn mark_dirty(&mut self, id: ElementId) -> Result<(), UiError> {
        self.element(id)?;
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Ok(element) = self.element_mut(id) {
                element.dirty = true;
                stack.extend(element.children.iter().copied());
            }
        }
        Ok(())
    }

    pub fn is_dirty(&self, id: ElementId) -> Result<bool, UiError> {
        Ok(self.element(id)?.dirty)
    }

    fn edit_layout(&mut self, id: ElementId, edit: impl FnOnce(&mut LayoutInputs)) -> Result<(), UiError> {
        let element = self.element_mut(id)?;
        let before = element.inputs;
        edit(&mut element.inputs);
        if element.inputs != before {
            self.mark_dirty(id)?;
        }
        Ok(())
    }

    // ── layout inputs ─────────────────────────────────────────────────────

    pub fn set_name(&mut self, id: ElementId, name: impl Into<String>) -> Result<(), UiError> {
        self.element_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn set_position(&mut self, id: ElementId, position: Vec2i) -> Result<(), UiError> {
        self.edit_layout(id, |i| i.position = position)
    }

    pub fn set_size(&mut self, id: ElementId, size: Vec2i) -> Result<(), UiError> {
        self.edit_layout(id, |i| i.size = size)
    }

    pub fn set_scale(&mut self, id: ElementId, scale: Vec2) -> Result<(), UiError> {
        self.edit_layout(id, |i| i.scale = scale)
    }

    /// Degrees around the pivot. Visual only: hit-testing stays axis-aligned.
    pub fn set_rotation(&mut self, id: ElementId, degrees: f32) -> Result<(), UiError> {
        self.edit_layout(id, |i| i.rotation = degrees)
    }

    pub fn set_pivot(&mut self, id: ElementId, pivot: Vec2) -> Result<(), UiError> {
        self.edit_layout(id, |i| i.pivot = pivot)
    }

    pub fn set_anchors(&mut self, id: ElementId, min: Vec2, max: Vec2) -> Result<(), UiError> {
        self.edit_layout(id, |i| {
            i.anchor_min = min;
            i.anchor_max = max;
        })
    }

    pub fn set_anchor_min(&mut self, id: ElementId, min: Vec2) -> Result<(), UiError> {
        self.edit_layout(id, |i| i.anchor_min = min)
    }

    pub fn set_anchor_max(&mut self, id: ElementId, max: Vec2) -> Result<(), UiError> {
        self.edit_layout(id, |i| i.anchor_max = max)
    }

    pub fn set_margin(&mut self, id: ElementId, margin: Edges) -> Result<(), UiError> {
        self.edit_layout(id, |i| i.margin = margin)
    }

    pub fn set_scale_with_size(&mut self, id: ElementId, on: bool) -> Result<(), UiError> {
        self.edit_layout(id, |i| i.scale_with_size = on)
    }

    /// Padding only moves stretching children, which are all descendants.
    pub fn set_padding(&mut self, id: ElementId, padding: Edges) -> Result<(), UiError> {
        let element = self.element_mut(id)?;
        if element.padding != padding {
            element.padding = padding;
            self.mark_dirty(id)?;
        }
        Ok(())
    }

    // ── appearance ────────────────────────────────────────────────────────

    pub fn set_tint(&mut self, id: ElementId, tint: Color) -> Result<(), UiError> {
        self.element_mut(id)?.tint = tint;
        Ok(())
    }

    /// Multiplies into every descendant's alpha at draw time.
    pub fn set_alpha(&mut self, id: ElementId, alpha: f32) -> Result<(), UiError> {
        self.element_mut(id)?.alpha = alpha.clamp(0.0, 1.0);
        Ok(())
    }

    /// Clips descendants to this element's rect.
    pub fn set_mask(&mut self, id: ElementId, mask: bool) -> Result<(), UiError> {
        self.element_mut(id)?.mask = mask;
        Ok(())
    }

    /// Replaces the payload, handing back the old one for the caller to dispose.
    pub fn set_payload(&mut self, id: ElementId, payload: Option<RenderPayload>) -> Result<Option<RenderPayload>, UiError> {
        Ok(std::mem::replace(&mut self.element_mut(id)?.payload, payload))
    }

    pub fn payload_mut(&mut self, id: ElementId) -> Result<Option<&mut RenderPayload>, UiError> {
        Ok(self.element_mut(id)?.payload.as_mut())
    }

    // ── activity ──────────────────────────────────────────────────────────

    pub fn set_active(&mut self, id: ElementId, active: bool) -> Result<(), UiError> {
        let element = self.element_mut(id)?;
        if element.active_self == active {
            return Ok(());
        }
        element.active_self = active;
        self.propagate_active(id)
    }

    pub fn is_active(&self, id: ElementId) -> Result<bool, UiError> {
        Ok(self.element(id)?.is_active())
    }

    fn propagate_active(&mut self, id: ElementId) -> Result<(), UiError> {
        let element = self.element(id)?;
        let mut stack: Vec<(ElementId, bool)> = element.children.iter().map(|c| (*c, element.is_active())).collect();
        while let Some((id, inherited)) = stack.pop() {
            let element = self.element_mut(id)?;
            element.active_in_hierarchy = inherited;
            let active = element.is_active();
            stack.extend(element.children.iter().map(|c| (*c, active)));
        }
        Ok(())
    }

    // ── behaviours ────────────────────────────────────────────────────────

    pub fn set_behavior(&mut self, id: ElementId, behavior: impl Behavior) -> Result<(), UiError> {
        self.element_mut(id)?.behavior = Some(Box::new(behavior));
        Ok(())
    }

    pub fn behavior<T: Any>(&self, id: ElementId) -> Option<&T> {
        self.element(id).ok()?.behavior.as_ref()?.as_any().downcast_ref()
    }

    pub fn behavior_mut<T: Any>(&mut self, id: ElementId) -> Option<&mut T> {
        self.element_mut(id).ok()?.behavior.as_mut()?.as_any_mut().downcast_mut()
    }

    /// Lends the behaviour out so it can run with `&mut UiTree`.
    pub(crate) fn take_behavior(&mut self, id: ElementId) -> Option<Box<dyn Behavior>> {
        self.element_mut(id).ok()?.behavior.take()
    }

    /// Puts a lent behaviour back unless the element was destroyed meanwhile
    /// or got a new behaviour.
    pub(crate) fn restore_behavior(&mut self, id: ElementId, behavior: Box<dyn Behavior>) {
        if let Ok(element) = self.element_mut(id) {
            element.behavior.get_or_insert(behavior);
        }
    }

    // ── resolution ────────────────────────────────────────────────────────

    /// Resolved geometry of `id`, recomputing it (and any dirty ancestor)
    /// when flagged.
    pub fn resolve(&mut self, id: ElementId) -> Result<Resolved, UiError> {
        let element = self.element(id)?;
        if !element.dirty {
            return Ok(element.resolved);
        }

        let frame = match element.parent {
            Some(parent) => {
                let resolved = self.resolve(parent)?;
                ParentFrame::of(&resolved, self.element(parent)?.padding)
            }
            None if self.canvas_root == Some(id) => ParentFrame::root(self.canvas_size),
            None => ParentFrame::root(Vec2i::ZERO),
        };

        let element = self.element_mut(id)?;
        element.resolved = resolve_node(&element.inputs, &frame);
        element.dirty = false;
        Ok(element.resolved)
    }

    pub fn matrix(&mut self, id: ElementId) -> Result<glam::Mat4, UiError> {
        Ok(self.resolve(id)?.matrix)
    }

    pub fn scaled_size(&mut self, id: ElementId) -> Result<Vec2i, UiError> {
        Ok(self.resolve(id)?.scaled_size)
    }

    pub fn real_position(&mut self, id: ElementId) -> Result<Vec2i, UiError> {
        Ok(self.resolve(id)?.real_position)
    }

    pub fn rect(&mut self, id: ElementId) -> Result<Rect, UiError> {
        Ok(self.resolve(id)?.rect())
    }

    /// Half-open, axis-aligned test against the resolved rect. Rotation is
    /// ignored.
    pub fn contains_point(&mut self, id: ElementId, point: Vec2) -> Result<bool, UiError> {
        Ok(self.rect(id)?.contains(point))
    }
}

impl fmt::Debug for UiTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UiTree")
            .field("elements", &self.len())
            .field("canvas_root", &self.canvas_root)
            .field("canvas_size", &self.canvas_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_engine::coords::Rect;
    use tessel_engine::gpu::{HandleKind, Program, Texture};
    use tessel_engine::render::builtin;

    fn stretch(tree: &mut UiTree, id: ElementId, margin: Edges) {
        tree.set_anchors(id, Vec2::ZERO, Vec2::ONE).unwrap();
        tree.set_margin(id, margin).unwrap();
    }

    /// root (200x100 canvas) > a > b
    fn chain() -> (UiTree, ElementId, ElementId, ElementId) {
        let mut tree = UiTree::new();
        let root = tree.create("root");
        let a = tree.create("a");
        let b = tree.create("b");
        tree.add_child(root, a).unwrap();
        tree.add_child(a, b).unwrap();
        tree.set_canvas_frame(root, Vec2i::new(200, 100)).unwrap();
        stretch(&mut tree, root, Edges::ZERO);
        (tree, root, a, b)
    }

    // ── hierarchy ─────────────────────────────────────────────────────────

    #[test]
    fn add_child_reparents() {
        let (mut tree, root, a, b) = chain();
        tree.add_child(root, b).unwrap();
        assert_eq!(tree.children(root).unwrap(), [a, b]);
        assert!(tree.children(a).unwrap().is_empty());
        assert_eq!(tree.parent(b).unwrap(), Some(root));
    }

    #[test]
    fn cycles_are_rejected() {
        let (mut tree, root, a, b) = chain();
        assert!(matches!(tree.add_child(b, root), Err(UiError::Cycle { .. })));
        assert!(matches!(tree.add_child(a, a), Err(UiError::Cycle { .. })));
        assert_eq!(tree.parent(root).unwrap(), None);
    }

    #[test]
    fn remove_child_checks_parentage() {
        let (mut tree, root, a, b) = chain();
        assert!(matches!(tree.remove_child(root, b), Err(UiError::NotAChild { .. })));
        tree.remove_child(a, b).unwrap();
        assert_eq!(tree.parent(b).unwrap(), None);
        assert!(tree.children(a).unwrap().is_empty());
        assert_eq!(tree.pre_order(root).unwrap(), [root, a]);
    }

    #[test]
    fn pre_order_follows_insertion() {
        let mut tree = UiTree::new();
        let root = tree.create("root");
        let ids: Vec<_> = (0..3).map(|i| tree.create(format!("c{i}"))).collect();
        for id in &ids {
            tree.add_child(root, *id).unwrap();
        }
        let leaf = tree.create("leaf");
        tree.add_child(ids[0], leaf).unwrap();
        assert_eq!(tree.pre_order(root).unwrap(), [root, ids[0], leaf, ids[1], ids[2]]);
    }

    // ── dirty flags ───────────────────────────────────────────────────────

    #[test]
    fn dirty_cascades_and_resolve_clears() {
        let (mut tree, root, a, b) = chain();
        tree.resolve(b).unwrap();
        for id in [root, a, b] {
            assert!(!tree.is_dirty(id).unwrap());
        }

        tree.set_position(a, Vec2i::new(5, 5)).unwrap();
        assert!(!tree.is_dirty(root).unwrap());
        assert!(tree.is_dirty(a).unwrap());
        assert!(tree.is_dirty(b).unwrap());

        // Resolving the parent does not clean the child.
        tree.resolve(a).unwrap();
        assert!(tree.is_dirty(b).unwrap());
        assert_eq!(tree.real_position(b).unwrap(), Vec2i::new(5, 5));
        assert!(!tree.is_dirty(b).unwrap());
    }

    #[test]
    fn dirty_reaches_inactive_descendants() {
        let (mut tree, root, a, b) = chain();
        tree.resolve(b).unwrap();
        tree.set_active(a, false).unwrap();
        tree.mark_dirty(root).unwrap();
        assert!(tree.is_dirty(b).unwrap());
    }

    #[test]
    fn unchanged_setter_keeps_cache() {
        let (mut tree, _root, a, b) = chain();
        tree.set_size(a, Vec2i::new(10, 10)).unwrap();
        tree.resolve(b).unwrap();
        tree.set_size(a, Vec2i::new(10, 10)).unwrap();
        assert!(!tree.is_dirty(b).unwrap());
    }

    // ── resolution ────────────────────────────────────────────────────────

    #[test]
    fn nested_stretch_with_margin() {
        let (mut tree, _root, a, b) = chain();
        tree.set_position(a, Vec2i::new(7, 3)).unwrap();
        tree.set_size(a, Vec2i::new(200, 100)).unwrap();
        stretch(&mut tree, b, Edges::all(10));

        let parent = tree.resolve(a).unwrap();
        assert_eq!(parent.scaled_size, Vec2i::new(200, 100));
        let child = tree.resolve(b).unwrap();
        assert_eq!(child.size, Vec2i::new(180, 80));
        assert_eq!(child.real_position, parent.real_position + Vec2i::new(10, 10));
    }

    #[test]
    fn canvas_root_fills_canvas() {
        let (mut tree, root, ..) = chain();
        assert_eq!(tree.scaled_size(root).unwrap(), Vec2i::new(200, 100));
        tree.set_canvas_frame(root, Vec2i::new(640, 480)).unwrap();
        assert_eq!(tree.scaled_size(root).unwrap(), Vec2i::new(640, 480));

        let detached = tree.create("detached");
        stretch(&mut tree, detached, Edges::ZERO);
        assert_eq!(tree.scaled_size(detached).unwrap(), Vec2i::ZERO);
    }

    #[test]
    fn contains_point_is_half_open_and_ignores_rotation() {
        let (mut tree, _root, a, _b) = chain();
        tree.set_position(a, Vec2i::new(10, 10)).unwrap();
        tree.set_size(a, Vec2i::new(20, 20)).unwrap();
        tree.set_rotation(a, 45.0).unwrap();
        assert!(tree.contains_point(a, Vec2::new(10.0, 10.0)).unwrap());
        assert!(tree.contains_point(a, Vec2::new(29.9, 29.9)).unwrap());
        assert!(!tree.contains_point(a, Vec2::new(30.0, 20.0)).unwrap());
        assert_eq!(tree.rect(a).unwrap(), Rect::new(10.0, 10.0, 20.0, 20.0));
    }

    // ── activity ──────────────────────────────────────────────────────────

    #[test]
    fn deactivation_propagates_and_restores() {
        let (mut tree, root, a, b) = chain();
        tree.set_active(a, false).unwrap();
        assert!(!tree.is_active(a).unwrap());
        assert!(!tree.is_active(b).unwrap());
        assert!(tree.element(b).unwrap().active_self());

        tree.set_active(b, false).unwrap();
        tree.set_active(a, true).unwrap();
        assert!(tree.is_active(a).unwrap());
        assert!(!tree.is_active(b).unwrap());

        tree.set_active(b, true).unwrap();
        tree.set_active(root, false).unwrap();
        let moved = tree.create("moved");
        tree.add_child(b, moved).unwrap();
        assert!(!tree.is_active(moved).unwrap());
        tree.remove_child(b, moved).unwrap();
        assert!(tree.is_active(moved).unwrap());
    }

    // ── destroy ───────────────────────────────────────────────────────────

    #[test]
    fn destroy_releases_subtree_and_stales_ids() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let program = Rc::new(Program::compile(&mut dev, &builtin::SPRITE).unwrap());
        let owned = Rc::new(Texture::from_rgba(&mut dev, 1, 1, &[255; 4]).unwrap());
        let shared = Rc::new(Texture::from_rgba(&mut dev, 1, 1, &[255; 4]).unwrap());

        let (mut tree, root, a, b) = chain();
        for (id, texture) in [(a, &owned), (b, &shared)] {
            let mut mesh = Mesh::quad(Rect::UNIT, Rect::UNIT);
            mesh.apply(&mut dev).unwrap();
            let mut material = Material::new(program.clone());
            material.set_texture("main_texture", texture.clone());
            tree.set_payload(id, Some(RenderPayload::new(mesh, material))).unwrap();
        }
        drop(owned);
        assert_eq!(dev.live_resources(HandleKind::VertexArray), 2);

        tree.destroy(&mut dev, a);
        assert_eq!(dev.live_resources(HandleKind::VertexArray), 0);
        assert_eq!(dev.live_resources(HandleKind::Texture), 1);
        assert!(shared.handle().is_ok());
        assert!(matches!(tree.resolve(a), Err(UiError::StaleElement(_))));
        assert!(matches!(tree.set_size(b, Vec2i::ZERO), Err(UiError::StaleElement(_))));
        assert!(tree.children(root).unwrap().is_empty());
        assert_eq!(tree.len(), 1);

        // A second destroy is a no-op, and the freed slot is reused under a new id.
        tree.destroy(&mut dev, a);
        let fresh = tree.create("fresh");
        assert_ne!(fresh, a);
        assert_ne!(fresh, b);
        assert!(!tree.contains(a));

        shared.dispose(&mut dev);
        program.dispose(&mut dev);
    }

    #[test]
    fn destroy_releases_texture_held_under_two_names() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let program = Rc::new(Program::compile(&mut dev, &builtin::SPRITE).unwrap());
        let texture = Rc::new(Texture::from_rgba(&mut dev, 1, 1, &[255; 4]).unwrap());

        let (mut tree, _root, a, _b) = chain();
        let mut material = Material::new(program.clone());
        material.set_texture("main_texture", texture.clone());
        material.set_texture("overlay", texture.clone());
        tree.set_payload(a, Some(RenderPayload::new(Mesh::new(), material))).unwrap();
        drop(texture);
        assert_eq!(dev.live_resources(HandleKind::Texture), 1);

        tree.destroy(&mut dev, a);
        assert_eq!(dev.live_resources(HandleKind::Texture), 0);
        program.dispose(&mut dev);
    }
}
