use std::any::Any;

use tessel_engine::coords::{Rect, Vec2};
use tessel_engine::paint::Color;

use crate::behavior::{Behavior, BehaviorCtx};
use crate::error::UiError;
use crate::layout::Edges;
use crate::tree::{ElementId, UiTree};

use super::panel::Panel;
use super::{Placement, WidgetCtx};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    fn of(self, v: Vec2) -> f32 {
        match self {
            Axis::Horizontal => v.x,
            Axis::Vertical => v.y,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Drag {
    /// Pointer coordinate along the axis when the drag started.
    grab: f32,
    /// Cursor position when the drag started.
    start: f32,
}

/// A track with a draggable thumb over a range of `content_length` units.
///
/// The thumb covers `cursor_ratio` of the track; the cursor is the content
/// offset of the thumb's leading edge and runs from 0 to
/// `content_length - content_length * cursor_ratio`.
///
/// Attach it to the track element; the thumb is a child whose anchors the
/// scrollbar rewrites every frame.
#[derive(Debug, Clone)]
pub struct ScrollBar {
    axis: Axis,
    thumb: ElementId,
    content_length: f32,
    ratio: f32,
    cursor: f32,
    drag: Option<Drag>,
}

impl ScrollBar {
    pub fn new(axis: Axis, thumb: ElementId) -> Self {
        Self { axis, thumb, content_length: 0.0, ratio: 1.0, cursor: 0.0, drag: None }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn thumb(&self) -> ElementId {
        self.thumb
    }

    pub fn content_length(&self) -> f32 {
        self.content_length
    }

    pub fn set_content_length(&mut self, length: f32) {
        self.content_length = length.max(0.0);
        self.set_cursor_position(self.cursor);
    }

    pub fn cursor_ratio(&self) -> f32 {
        self.ratio
    }

    /// Visible fraction of the content, clamped to `0..=1`.
    pub fn set_cursor_ratio(&mut self, ratio: f32) {
        self.ratio = ratio.clamp(0.0, 1.0);
        self.set_cursor_position(self.cursor);
    }

    pub fn max_cursor_position(&self) -> f32 {
        (self.content_length - self.content_length * self.ratio).max(0.0)
    }

    pub fn cursor_position(&self) -> f32 {
        self.cursor
    }

    /// Sets the cursor, clamped to `0..=max_cursor_position()`.
    pub fn set_cursor_position(&mut self, position: f32) {
        self.cursor = position.clamp(0.0, self.max_cursor_position());
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Thumb span as `(start, end)` fractions of the track.
    pub fn thumb_span(&self) -> (f32, f32) {
        if self.content_length <= 0.0 {
            return (0.0, 1.0);
        }
        let start = self.cursor / self.content_length;
        (start, (start + self.ratio).min(1.0))
    }

    /// Stretches the thumb over its span along the axis and across the
    /// whole track on the other.
    pub fn sync_thumb(&self, tree: &mut UiTree) -> Result<(), UiError> {
        let (start, end) = self.thumb_span();
        let (min, max) = match self.axis {
            Axis::Horizontal => (Vec2::new(start, 0.0), Vec2::new(end, 1.0)),
            Axis::Vertical => (Vec2::new(0.0, start), Vec2::new(1.0, end)),
        };
        tree.set_anchors(self.thumb, min, max)
    }

    /// Content units per track pixel.
    fn units_per_pixel(&self, track: Rect) -> f32 {
        let length = self.axis.of(track.size);
        if length > 0.0 { self.content_length / length } else { 0.0 }
    }

    /// Creates a track panel with a thumb panel inside and attaches the
    /// scrollbar to the track. Returns the track.
    pub fn build(
        cx: &mut WidgetCtx<'_>,
        parent: ElementId,
        axis: Axis,
        placement: Placement,
        track_color: Color,
        thumb_color: Color,
    ) -> Result<ElementId, UiError> {
        let track = Panel::new(track_color).name("scrollbar").place(placement).build(cx, parent)?;
        let thumb = Panel::new(thumb_color).name("scrollbar thumb").place(Placement::stretch(Edges::ZERO)).build(cx, track)?;
        let bar = ScrollBar::new(axis, thumb);
        bar.sync_thumb(cx.tree)?;
        cx.tree.set_behavior(track, bar)?;
        Ok(track)
    }
}

impl Behavior for ScrollBar {
    fn update(&mut self, ctx: &mut BehaviorCtx<'_>) -> Result<(), UiError> {
        let input = ctx.input;
        let track = ctx.tree.rect(ctx.element)?;
        let per_pixel = self.units_per_pixel(track);

        if input.just_pressed {
            if let Some(p) = input.pointer_in(track) {
                let along = self.axis.of(p);
                if !ctx.tree.contains_point(self.thumb, p)? {
                    // Centre the thumb under the pointer, then drag from there.
                    let visible = self.content_length * self.ratio;
                    self.set_cursor_position((along - self.axis.of(track.origin)) * per_pixel - visible / 2.0);
                }
                self.drag = Some(Drag { grab: along, start: self.cursor });
            }
        }

        match (self.drag, input.pointer) {
            (Some(_), _) if !input.pressed || input.just_released => self.drag = None,
            (Some(drag), Some(p)) => self.set_cursor_position(drag.start + (self.axis.of(p) - drag.grab) * per_pixel),
            _ => {}
        }

        self.sync_thumb(ctx.tree)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_engine::coords::Vec2i;
    use tessel_engine::gpu::GraphicsDevice;

    use crate::input::UiInput;
    use crate::widgets::UiPrograms;

    fn bar() -> ScrollBar {
        let mut tree = UiTree::new();
        ScrollBar::new(Axis::Vertical, tree.create("thumb"))
    }

    fn run(tree: &mut UiTree, track: ElementId, input: UiInput) {
        let mut behavior = tree.take_behavior(track).unwrap();
        behavior.update(&mut BehaviorCtx { tree: &mut *tree, element: track, input: &input }).unwrap();
        tree.restore_behavior(track, behavior);
    }

    // ── cursor ────────────────────────────────────────────────────────────

    #[test]
    fn cursor_clamps_to_visible_fraction() {
        let mut bar = bar();
        bar.set_content_length(500.0);
        bar.set_cursor_ratio(0.2);
        assert_eq!(bar.max_cursor_position(), 400.0);

        bar.set_cursor_position(1000.0);
        assert_eq!(bar.cursor_position(), 400.0);
        bar.set_cursor_position(-3.0);
        assert_eq!(bar.cursor_position(), 0.0);
    }

    #[test]
    fn shrinking_content_pulls_cursor_back() {
        let mut bar = bar();
        bar.set_content_length(500.0);
        bar.set_cursor_ratio(0.2);
        bar.set_cursor_position(400.0);
        bar.set_content_length(250.0);
        assert_eq!(bar.cursor_position(), 200.0);
        bar.set_cursor_ratio(1.0);
        assert_eq!(bar.cursor_position(), 0.0);
        assert_eq!(bar.thumb_span(), (0.0, 1.0));
    }

    // ── dragging ──────────────────────────────────────────────────────────

    #[test]
    fn dragging_the_thumb_moves_the_cursor() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let programs = UiPrograms::compile(&mut dev).unwrap();
        let mut tree = UiTree::new();
        let root = tree.create("root");

        let mut cx = WidgetCtx::new(&mut tree, &mut dev, &programs);
        let placement = Placement::fixed(Vec2i::new(0, 0), Vec2i::new(10, 100));
        let track = ScrollBar::build(&mut cx, root, Axis::Vertical, placement, Color::BLACK, Color::WHITE).unwrap();
        {
            let bar = tree.behavior_mut::<ScrollBar>(track).unwrap();
            bar.set_content_length(500.0);
            bar.set_cursor_ratio(0.2);
        }
        run(&mut tree, track, UiInput::default());
        let thumb = tree.behavior::<ScrollBar>(track).unwrap().thumb();
        assert_eq!(tree.scaled_size(thumb).unwrap(), Vec2i::new(10, 20));

        let at = |y: f32| Some(Vec2::new(5.0, y));
        run(&mut tree, track, UiInput { pointer: at(10.0), pressed: true, just_pressed: true, ..UiInput::default() });
        assert!(tree.behavior::<ScrollBar>(track).unwrap().is_dragging());

        // 30px of track is 150 content units.
        run(&mut tree, track, UiInput { pointer: at(40.0), pressed: true, ..UiInput::default() });
        assert_eq!(tree.behavior::<ScrollBar>(track).unwrap().cursor_position(), 150.0);
        assert_eq!(tree.real_position(thumb).unwrap(), Vec2i::new(0, 30));

        run(&mut tree, track, UiInput { pointer: at(40.0), just_released: true, ..UiInput::default() });
        assert!(!tree.behavior::<ScrollBar>(track).unwrap().is_dragging());

        tree.destroy(&mut dev, root);
        programs.dispose(&mut dev);
    }

    #[test]
    fn pressing_the_track_centres_the_thumb() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let programs = UiPrograms::compile(&mut dev).unwrap();
        let mut tree = UiTree::new();
        let root = tree.create("root");

        let mut cx = WidgetCtx::new(&mut tree, &mut dev, &programs);
        let placement = Placement::fixed(Vec2i::new(0, 0), Vec2i::new(100, 10));
        let track = ScrollBar::build(&mut cx, root, Axis::Horizontal, placement, Color::BLACK, Color::WHITE).unwrap();
        {
            let bar = tree.behavior_mut::<ScrollBar>(track).unwrap();
            bar.set_content_length(1000.0);
            bar.set_cursor_ratio(0.1);
        }
        run(&mut tree, track, UiInput::default());
        run(
            &mut tree,
            track,
            UiInput { pointer: Some(Vec2::new(50.0, 5.0)), pressed: true, just_pressed: true, ..UiInput::default() },
        );
        // 50px is 500 units; half the visible 100 units back.
        assert_eq!(tree.behavior::<ScrollBar>(track).unwrap().cursor_position(), 450.0);

        tree.destroy(&mut dev, root);
        programs.dispose(&mut dev);
    }
}
