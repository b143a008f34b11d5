use glam::{Mat4, Vec3};

use tessel_engine::coords::{Rect, Vec2, Vec2i};

/// Anchor pairs closer than this on an axis do not stretch.
pub const ANCHOR_EPSILON: f32 = 1e-4;

// ── Edges ─────────────────────────────────────────────────────────────────

/// Insets on all four sides (margin, padding), in whole logical pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edges {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl Edges {
    pub const ZERO: Edges = Edges::new(0, 0, 0, 0);

    #[inline]
    pub const fn new(top: i32, right: i32, bottom: i32, left: i32) -> Self {
        Self { top, right, bottom, left }
    }

    #[inline]
    pub const fn all(v: i32) -> Self {
        Self::new(v, v, v, v)
    }

    #[inline]
    pub const fn symmetric(vertical: i32, horizontal: i32) -> Self {
        Self::new(vertical, horizontal, vertical, horizontal)
    }

    #[inline]
    pub fn horizontal(v: i32) -> Self {
        Self { left: v, right: v, ..Self::default() }
    }

    #[inline]
    pub fn vertical(v: i32) -> Self {
        Self { top: v, bottom: v, ..Self::default() }
    }

    /// Total inset on the horizontal axis.
    #[inline]
    pub fn h(self) -> i32 {
        self.left + self.right
    }

    /// Total inset on the vertical axis.
    #[inline]
    pub fn v(self) -> i32 {
        self.top + self.bottom
    }

    /// `(left, top)`: the insets at the low end of each axis.
    #[inline]
    fn near(self) -> (i32, i32) {
        (self.left, self.top)
    }

    /// `(right, bottom)`.
    #[inline]
    fn far(self) -> (i32, i32) {
        (self.right, self.bottom)
    }
}

// ── inputs ────────────────────────────────────────────────────────────────

/// Authored geometry of one element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutInputs {
    /// Offset from the anchor-resolved origin.
    pub position: Vec2i,
    /// Authored size; replaced on stretching axes.
    pub size: Vec2i,
    pub scale: Vec2,
    /// Degrees, counter-clockwise on screen, around the pivot.
    pub rotation: f32,
    /// 0..1 within the element's own rect.
    pub pivot: Vec2,
    /// 0..1 within the parent's rect.
    pub anchor_min: Vec2,
    pub anchor_max: Vec2,
    /// Inset from the anchor region; only used on stretching axes.
    pub margin: Edges,
    /// `true`: the mesh is authored in unit space and scaled by the resolved
    /// size. `false`: the mesh is in pixels and scaled by `scale` only.
    pub scale_with_size: bool,
}

impl Default for LayoutInputs {
    fn default() -> Self {
        Self {
            position: Vec2i::ZERO,
            size: Vec2i::ZERO,
            scale: Vec2::ONE,
            rotation: 0.0,
            pivot: Vec2::ZERO,
            anchor_min: Vec2::ZERO,
            anchor_max: Vec2::ZERO,
            margin: Edges::ZERO,
            scale_with_size: true,
        }
    }
}

/// What a child needs from its parent to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParentFrame {
    pub real_position: Vec2i,
    pub scaled_size: Vec2i,
    /// Inset from the region the parent offers to stretching children.
    pub padding: Edges,
}

impl ParentFrame {
    /// A parentless frame at the origin with no padding.
    #[inline]
    pub const fn root(size: Vec2i) -> Self {
        Self { real_position: Vec2i::ZERO, scaled_size: size, padding: Edges::ZERO }
    }

    #[inline]
    pub fn of(resolved: &Resolved, padding: Edges) -> Self {
        Self { real_position: resolved.real_position, scaled_size: resolved.scaled_size, padding }
    }
}

/// Cached output of [`resolve_node`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolved {
    /// Model matrix: unit or pixel mesh space to canvas space.
    pub matrix: Mat4,
    /// Size after stretching, before `scale`.
    pub size: Vec2i,
    pub scaled_size: Vec2i,
    /// Top-left corner in canvas space, ignoring rotation.
    pub real_position: Vec2i,
}

impl Default for Resolved {
    fn default() -> Self {
        Self { matrix: Mat4::IDENTITY, size: Vec2i::ZERO, scaled_size: Vec2i::ZERO, real_position: Vec2i::ZERO }
    }
}

impl Resolved {
    /// Axis-aligned canvas rect; rotation is not applied.
    #[inline]
    pub fn rect(&self) -> Rect {
        Rect::from_pixels(self.real_position, self.scaled_size)
    }
}

// ── resolution ────────────────────────────────────────────────────────────

struct Axis {
    position: i32,
    size: i32,
    scale: f32,
    pivot: f32,
    anchor_min: f32,
    anchor_max: f32,
    margin: (i32, i32),
    parent_position: i32,
    parent_size: i32,
    padding: (i32, i32),
}

/// `(size, scaled_size, real_position)` on one axis.
fn resolve_axis(a: Axis) -> (i32, i32, i32) {
    let span = a.anchor_max - a.anchor_min;
    if span.abs() > ANCHOR_EPSILON {
        let region = a.parent_size - a.padding.0 - a.padding.1;
        let low = a.anchor_min.min(a.anchor_max);

        let size = ((span.abs() * region as f32).round() as i32 - a.margin.0 - a.margin.1).max(0);
        let scaled = (size as f32 * a.scale).round() as i32;
        let real = a.parent_position + a.position + a.padding.0 + (region as f32 * low).round() as i32 + a.margin.0
            - (a.pivot * scaled as f32).round() as i32;
        (size, scaled, real)
    } else {
        let scaled = (a.size as f32 * a.scale).round() as i32;
        let real = a.parent_position + a.position + (a.parent_size as f32 * a.anchor_min).round() as i32
            - (a.pivot * scaled as f32).round() as i32;
        (a.size, scaled, real)
    }
}

/// Resolves one element against its parent's frame.
///
/// Depends only on `inputs` and `parent`. Rounding is half away from zero.
pub fn resolve_node(inputs: &LayoutInputs, parent: &ParentFrame) -> Resolved {
    let (margin_near, margin_far) = (inputs.margin.near(), inputs.margin.far());
    let (pad_near, pad_far) = (parent.padding.near(), parent.padding.far());

    let (w, sw, x) = resolve_axis(Axis {
        position: inputs.position.x,
        size: inputs.size.x,
        scale: inputs.scale.x,
        pivot: inputs.pivot.x,
        anchor_min: inputs.anchor_min.x,
        anchor_max: inputs.anchor_max.x,
        margin: (margin_near.0, margin_far.0),
        parent_position: parent.real_position.x,
        parent_size: parent.scaled_size.x,
        padding: (pad_near.0, pad_far.0),
    });
    let (h, sh, y) = resolve_axis(Axis {
        position: inputs.position.y,
        size: inputs.size.y,
        scale: inputs.scale.y,
        pivot: inputs.pivot.y,
        anchor_min: inputs.anchor_min.y,
        anchor_max: inputs.anchor_max.y,
        margin: (margin_near.1, margin_far.1),
        parent_position: parent.real_position.y,
        parent_size: parent.scaled_size.y,
        padding: (pad_near.1, pad_far.1),
    });

    let scaled_size = Vec2i::new(sw, sh);
    let real_position = Vec2i::new(x, y);

    let pivot = Vec3::new(inputs.pivot.x * sw as f32, inputs.pivot.y * sh as f32, 0.0);
    let mesh_scale = if inputs.scale_with_size {
        Vec3::new(sw as f32, sh as f32, 1.0)
    } else {
        Vec3::new(inputs.scale.x, inputs.scale.y, 1.0)
    };
    let origin = Vec3::new(x as f32, y as f32, 0.0);

    let matrix = Mat4::from_translation(origin + pivot)
        * Mat4::from_rotation_z(inputs.rotation.to_radians())
        * Mat4::from_translation(-pivot)
        * Mat4::from_scale(mesh_scale);

    Resolved { matrix, size: Vec2i::new(w, h), scaled_size, real_position }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent(x: i32, y: i32, w: i32, h: i32) -> ParentFrame {
        ParentFrame { real_position: Vec2i::new(x, y), scaled_size: Vec2i::new(w, h), padding: Edges::ZERO }
    }

    fn stretched(margin: Edges) -> LayoutInputs {
        LayoutInputs { anchor_max: Vec2::ONE, margin, ..LayoutInputs::default() }
    }

    fn transform(m: Mat4, x: f32, y: f32) -> (f32, f32) {
        let p = m.transform_point3(Vec3::new(x, y, 0.0));
        (p.x, p.y)
    }

    // ── Edges ─────────────────────────────────────────────────────────────

    #[test]
    fn edges_totals() {
        let e = Edges::new(1, 2, 3, 4);
        assert_eq!(e.h(), 6);
        assert_eq!(e.v(), 4);
        assert_eq!(Edges::symmetric(5, 7), Edges::new(5, 7, 5, 7));
        assert_eq!(Edges::horizontal(3).v(), 0);
    }

    // ── stretching ────────────────────────────────────────────────────────

    #[test]
    fn full_stretch_subtracts_margins() {
        let r = resolve_node(&stretched(Edges::all(10)), &parent(40, 30, 200, 100));
        assert_eq!(r.size, Vec2i::new(180, 80));
        assert_eq!(r.scaled_size, Vec2i::new(180, 80));
        assert_eq!(r.real_position, Vec2i::new(50, 40));
    }

    #[test]
    fn partial_stretch_uses_anchor_fraction() {
        let inputs = LayoutInputs {
            anchor_min: Vec2::new(0.25, 0.0),
            anchor_max: Vec2::new(0.75, 0.0),
            margin: Edges::horizontal(5),
            size: Vec2i::new(999, 20),
            ..LayoutInputs::default()
        };
        let r = resolve_node(&inputs, &parent(0, 0, 300, 100));
        // round(0.5 * 300) - 10 on x; y keeps its authored size.
        assert_eq!(r.size, Vec2i::new(140, 20));
        assert_eq!(r.real_position, Vec2i::new(75 + 5, 0));
    }

    #[test]
    fn stretch_never_goes_negative() {
        let r = resolve_node(&stretched(Edges::all(80)), &parent(0, 0, 100, 100));
        assert_eq!(r.size, Vec2i::ZERO);
    }

    #[test]
    fn parent_padding_shrinks_the_region() {
        let mut p = parent(10, 10, 100, 60);
        p.padding = Edges::new(4, 6, 8, 2);
        let r = resolve_node(&stretched(Edges::ZERO), &p);
        assert_eq!(r.size, Vec2i::new(92, 48));
        assert_eq!(r.real_position, Vec2i::new(12, 14));
    }

    #[test]
    fn nearly_equal_anchors_are_fixed() {
        let inputs = LayoutInputs {
            anchor_min: Vec2::splat(0.5),
            anchor_max: Vec2::splat(0.5 + ANCHOR_EPSILON / 2.0),
            size: Vec2i::new(30, 30),
            margin: Edges::all(10),
            ..LayoutInputs::default()
        };
        let r = resolve_node(&inputs, &parent(0, 0, 100, 100));
        assert_eq!(r.size, Vec2i::new(30, 30));
        assert_eq!(r.real_position, Vec2i::new(50, 50));
    }

    // ── fixed ─────────────────────────────────────────────────────────────

    #[test]
    fn pivot_centres_on_anchor() {
        let inputs = LayoutInputs {
            size: Vec2i::new(50, 20),
            pivot: Vec2::splat(0.5),
            anchor_min: Vec2::splat(0.5),
            anchor_max: Vec2::splat(0.5),
            ..LayoutInputs::default()
        };
        let r = resolve_node(&inputs, &parent(0, 0, 200, 100));
        assert_eq!(r.real_position, Vec2i::new(75, 40));
    }

    #[test]
    fn scale_rounds_the_scaled_size() {
        let inputs = LayoutInputs { size: Vec2i::new(10, 3), scale: Vec2::new(2.0, 1.5), ..LayoutInputs::default() };
        let r = resolve_node(&inputs, &parent(0, 0, 0, 0));
        assert_eq!(r.size, Vec2i::new(10, 3));
        // 4.5 rounds away from zero.
        assert_eq!(r.scaled_size, Vec2i::new(20, 5));
    }

    #[test]
    fn position_offsets_from_anchor() {
        let inputs = LayoutInputs {
            position: Vec2i::new(-5, 7),
            anchor_min: Vec2::new(1.0, 0.0),
            anchor_max: Vec2::new(1.0, 0.0),
            ..LayoutInputs::default()
        };
        let r = resolve_node(&inputs, &parent(3, 4, 100, 100));
        assert_eq!(r.real_position, Vec2i::new(98, 11));
    }

    // ── matrix ────────────────────────────────────────────────────────────

    #[test]
    fn unit_mesh_maps_onto_resolved_rect() {
        let inputs = LayoutInputs { position: Vec2i::new(10, 20), size: Vec2i::new(30, 40), ..LayoutInputs::default() };
        let r = resolve_node(&inputs, &parent(0, 0, 0, 0));
        assert_eq!(transform(r.matrix, 0.0, 0.0), (10.0, 20.0));
        assert_eq!(transform(r.matrix, 1.0, 1.0), (40.0, 60.0));
        assert_eq!(r.rect(), Rect::new(10.0, 20.0, 30.0, 40.0));
    }

    #[test]
    fn pixel_mesh_scales_by_scale_only() {
        let inputs = LayoutInputs {
            position: Vec2i::new(10, 0),
            size: Vec2i::new(30, 40),
            scale: Vec2::splat(2.0),
            scale_with_size: false,
            ..LayoutInputs::default()
        };
        let r = resolve_node(&inputs, &parent(0, 0, 0, 0));
        assert_eq!(transform(r.matrix, 5.0, 5.0), (20.0, 10.0));
    }

    #[test]
    fn rotation_turns_around_pivot_but_keeps_rect() {
        let inputs = LayoutInputs {
            size: Vec2i::new(20, 20),
            pivot: Vec2::splat(0.5),
            rotation: 90.0,
            ..LayoutInputs::default()
        };
        let r = resolve_node(&inputs, &parent(0, 0, 0, 0));
        assert_eq!(r.real_position, Vec2i::new(-10, -10));

        // The pivot stays put; the top-left corner swings to the top-right.
        let (cx, cy) = transform(r.matrix, 0.5, 0.5);
        assert!(cx.abs() < 1e-4 && cy.abs() < 1e-4);
        let (x, y) = transform(r.matrix, 0.0, 0.0);
        assert!((x - 10.0).abs() < 1e-4 && (y + 10.0).abs() < 1e-4);
    }
}
