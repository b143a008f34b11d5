use std::any::Any;

use tessel_engine::coords::{Vec2, Vec2i};
use tessel_engine::paint::Color;

use crate::behavior::{Behavior, BehaviorCtx};
use crate::error::UiError;
use crate::layout::Edges;
use crate::tree::ElementId;

use super::mask::Mask;
use super::scrollbar::{Axis, ScrollBar};
use super::{Placement, WidgetCtx};

/// Width of the vertical bar [`ScrollView::build`] adds.
pub const SCROLLBAR_WIDTH: i32 = 8;

/// Vertical scrolling for a masked viewport.
///
/// Attached to the viewport element. Each frame it measures the content
/// element, feeds the lengths to the optional [`ScrollBar`], applies wheel
/// input while the pointer is over the viewport and moves the content up by
/// the scroll offset.
#[derive(Debug, Clone)]
pub struct ScrollView {
    content: ElementId,
    bar: Option<ElementId>,
    offset: f32,
    /// Multiplier for wheel pixels.
    wheel_speed: f32,
}

/// Elements created by [`ScrollView::build`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ScrollViewParts {
    pub viewport: ElementId,
    /// Parent for the scrolled children. Its height is the scroll range.
    pub content: ElementId,
    pub bar: ElementId,
}

impl ScrollView {
    pub fn new(content: ElementId, bar: Option<ElementId>) -> Self {
        Self { content, bar, offset: 0.0, wheel_speed: 1.0 }
    }

    pub fn wheel_speed(mut self, speed: f32) -> Self {
        self.wheel_speed = speed;
        self
    }

    pub fn content(&self) -> ElementId {
        self.content
    }

    /// Pixels the content is scrolled up by.
    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn scroll_to(&mut self, offset: f32) {
        self.offset = offset.max(0.0);
    }

    /// Builds a masked viewport holding a content element of
    /// `content_height` and a bar along its right edge.
    pub fn build(
        cx: &mut WidgetCtx<'_>,
        parent: ElementId,
        placement: Placement,
        content_height: i32,
        background: Color,
        thumb: Color,
    ) -> Result<ScrollViewParts, UiError> {
        let viewport = Mask::new().name("scroll view").background(background).place(placement).build(cx, parent)?;

        let content = cx.tree.create("scroll content");
        let content_placement = Placement { size: Vec2i::new(0, content_height), ..Placement::default() }
            .anchors(Vec2::ZERO, Vec2::new(1.0, 0.0))
            .margin(Edges { right: SCROLLBAR_WIDTH, ..Edges::ZERO });
        cx.attach(content, viewport, content_placement)?;

        let bar_placement = Placement::stretch(Edges::ZERO)
            .anchors(Vec2::new(1.0, 0.0), Vec2::new(1.0, 1.0))
            .pivot(Vec2::new(1.0, 0.0));
        let bar_placement = Placement { size: Vec2i::new(SCROLLBAR_WIDTH, 0), ..bar_placement };
        let bar = ScrollBar::build(cx, viewport, Axis::Vertical, bar_placement, background, thumb)?;

        cx.tree.set_behavior(viewport, ScrollView::new(content, Some(bar)))?;
        Ok(ScrollViewParts { viewport, content, bar })
    }
}

impl Behavior for ScrollView {
    fn update(&mut self, ctx: &mut BehaviorCtx<'_>) -> Result<(), UiError> {
        let viewport = ctx.tree.rect(ctx.element)?;
        let content_height = ctx.tree.scaled_size(self.content)?.y as f32;
        let visible = viewport.size.y;
        let max_offset = (content_height - visible).max(0.0);

        let mut offset = self.offset;
        let bar = match self.bar {
            Some(id) => ctx.tree.behavior_mut::<ScrollBar>(id),
            None => None,
        };
        if let Some(bar) = &bar {
            if bar.is_dragging() {
                offset = bar.cursor_position();
            }
        }
        if ctx.input.pointer_in(viewport).is_some() {
            offset -= ctx.input.wheel.y * self.wheel_speed;
        }
        offset = offset.clamp(0.0, max_offset);

        if let Some(bar) = bar {
            bar.set_content_length(content_height);
            bar.set_cursor_ratio(if content_height > 0.0 { visible / content_height } else { 1.0 });
            bar.set_cursor_position(offset);
        }
        self.offset = offset;

        let x = ctx.tree.element(self.content)?.inputs().position.x;
        ctx.tree.set_position(self.content, Vec2i::new(x, -(offset.round() as i32)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
