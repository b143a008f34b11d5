use std::collections::HashSet;

use crate::coords::Vec2;

use super::types::{InputEvent, MouseButton};

/// Line height used to convert notched wheel input into pixels.
pub const WHEEL_LINE_PX: f32 = 40.0;

/// Per-frame input deltas.
///
/// `InputState` holds what is currently down; `InputFrame` holds what changed
/// since the last frame. The runtime clears it after each `on_frame`.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Raw events in arrival order.
    pub events: Vec<InputEvent>,
    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,
    /// Accumulated wheel scroll in logical pixels.
    pub wheel: Vec2,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.wheel = Vec2::ZERO;
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        if let InputEvent::MouseWheel(delta) = ev {
            self.wheel += delta.to_pixels(WHEEL_LINE_PX);
        }
        self.events.push(ev);
    }

    pub fn pressed(&self, button: MouseButton) -> bool {
        self.buttons_pressed.contains(&button)
    }

    pub fn released(&self, button: MouseButton) -> bool {
        self.buttons_released.contains(&button)
    }
}
