//! Pointer input.
//!
//! The public API does not expose winit types; the runtime translates platform
//! events into [`InputEvent`]s through `platform::winit`. Keyboard, modifier
//! and text input are not tracked.

mod frame;
pub(crate) mod platform;
mod state;
mod types;

pub use frame::InputFrame;
pub use state::InputState;
pub use types::{InputEvent, MouseButton, MouseButtonState, MouseWheelDelta};
