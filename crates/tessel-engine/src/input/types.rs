use crate::coords::Vec2;

/// Mouse button identifier. Extra buttons keep the platform's index.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseButtonState {
    Pressed,
    Released,
}

/// Mouse wheel delta. `Line` comes from notched wheels, `Pixel` from touchpads.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseWheelDelta {
    Line { x: f32, y: f32 },
    Pixel { x: f32, y: f32 },
}

impl MouseWheelDelta {
    /// Logical pixels scrolled, with one line counting as `line_height`.
    pub fn to_pixels(self, line_height: f32) -> Vec2 {
        match self {
            MouseWheelDelta::Line { x, y } => Vec2::new(x, y) * line_height,
            MouseWheelDelta::Pixel { x, y } => Vec2::new(x, y),
        }
    }
}

/// Pointer events in logical pixels, independent of the windowing backend.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    PointerMoved(Vec2),
    /// `position` is the last known pointer position.
    PointerButton { button: MouseButton, state: MouseButtonState, position: Vec2 },
    MouseWheel(MouseWheelDelta),
    PointerLeft,
    Focused(bool),
}
