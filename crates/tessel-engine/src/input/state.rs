use std::collections::HashSet;

use crate::coords::Vec2;

use super::frame::InputFrame;
use super::types::{InputEvent, MouseButton, MouseButtonState};

/// Current pointer state for a single window.
#[derive(Debug, Default)]
pub struct InputState {
    pub focused: bool,
    /// Pointer position in logical pixels; `None` once the pointer leaves.
    pub pointer_pos: Option<Vec2>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies `ev` to the current state and records transitions in `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match ev {
            InputEvent::Focused(f) => {
                self.focused = f;
                if !f {
                    // Releases are not delivered to unfocused windows.
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved(p) => self.pointer_pos = Some(p),
            InputEvent::PointerLeft => self.pointer_pos = None,

            InputEvent::PointerButton { button, state, position } => {
                self.pointer_pos = Some(position);
                match state {
                    MouseButtonState::Pressed => {
                        if self.buttons_down.insert(button) {
                            frame.buttons_pressed.insert(button);
                        }
                    }
                    MouseButtonState::Released => {
                        if self.buttons_down.remove(&button) {
                            frame.buttons_released.insert(button);
                        }
                    }
                }
            }

            InputEvent::MouseWheel(_) => {}
        }

        frame.push_event(ev);
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::MouseWheelDelta;
    use crate::input::frame::WHEEL_LINE_PX;

    fn press(button: MouseButton, state: MouseButtonState) -> InputEvent {
        InputEvent::PointerButton { button, state, position: Vec2::new(5.0, 6.0) }
    }

    // ── buttons ───────────────────────────────────────────────────────────

    #[test]
    fn press_and_release_are_recorded_once() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();

        state.apply_event(&mut frame, press(MouseButton::Left, MouseButtonState::Pressed));
        state.apply_event(&mut frame, press(MouseButton::Left, MouseButtonState::Pressed));
        assert!(frame.pressed(MouseButton::Left));
        assert!(state.button_down(MouseButton::Left));
        assert_eq!(state.pointer_pos, Some(Vec2::new(5.0, 6.0)));

        frame.clear();
        state.apply_event(&mut frame, press(MouseButton::Left, MouseButtonState::Released));
        assert!(frame.released(MouseButton::Left));
        assert!(!state.button_down(MouseButton::Left));
    }

    #[test]
    fn focus_loss_clears_held_buttons() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, press(MouseButton::Right, MouseButtonState::Pressed));
        state.apply_event(&mut frame, InputEvent::Focused(false));
        assert!(state.buttons_down.is_empty());
    }

    // ── pointer / wheel ───────────────────────────────────────────────────

    #[test]
    fn pointer_left_forgets_position() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::PointerMoved(Vec2::new(1.0, 2.0)));
        state.apply_event(&mut frame, InputEvent::PointerLeft);
        assert_eq!(state.pointer_pos, None);
        assert_eq!(frame.events.len(), 2);
    }

    #[test]
    fn wheel_accumulates_in_pixels() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::MouseWheel(MouseWheelDelta::Line { x: 0.0, y: -1.0 }));
        state.apply_event(&mut frame, InputEvent::MouseWheel(MouseWheelDelta::Pixel { x: 3.0, y: 5.0 }));
        assert_eq!(frame.wheel, Vec2::new(3.0, 5.0 - WHEEL_LINE_PX));
        frame.clear();
        assert_eq!(frame.wheel, Vec2::ZERO);
    }
}
