use std::any::Any;

use crate::error::UiError;
use crate::input::UiInput;
use crate::tree::{ElementId, UiTree};

/// Per-frame logic attached to an element (drag handling, scrolling, ...).
///
/// The canvas runs behaviours of active elements once per frame in draw
/// order. While a behaviour runs it is detached from its element, so it may
/// freely mutate the tree, including its own element.
pub trait Behavior: Any {
    fn update(&mut self, ctx: &mut BehaviorCtx<'_>) -> Result<(), UiError>;

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// What a running behaviour can see.
pub struct BehaviorCtx<'a> {
    pub tree: &'a mut UiTree,
    /// The element the behaviour is attached to.
    pub element: ElementId,
    pub input: &'a UiInput,
}
