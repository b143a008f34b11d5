use tessel_engine::coords::Vec2;
use tessel_engine::input::{InputFrame, InputState, MouseButton};

/// Snapshot of pointer input for one UI frame, in canvas space.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UiInput {
    /// `None` while the pointer is outside the window.
    pub pointer: Option<Vec2>,
    /// `true` while the primary button is held down.
    pub pressed: bool,
    /// `true` for exactly one frame when the primary button goes down.
    pub just_pressed: bool,
    /// `true` for exactly one frame when the primary button is released.
    pub just_released: bool,
    /// Wheel scroll this frame in pixels. Positive y rolls away from the
    /// user, towards the top of the content.
    pub wheel: Vec2,
}

impl UiInput {
    /// Reads the engine's pointer state, dividing positions by `zoom` to get
    /// canvas coordinates.
    pub fn from_engine(state: &InputState, frame: &InputFrame, zoom: f32) -> Self {
        let zoom = if zoom > 0.0 { zoom } else { 1.0 };
        Self {
            pointer: state.pointer_pos.map(|p| p / zoom),
            pressed: state.button_down(MouseButton::Left),
            just_pressed: frame.pressed(MouseButton::Left),
            just_released: frame.released(MouseButton::Left),
            wheel: frame.wheel,
        }
    }

    /// Pointer position if it lies inside `rect`.
    pub fn pointer_in(&self, rect: tessel_engine::coords::Rect) -> Option<Vec2> {
        self.pointer.filter(|p| rect.contains(*p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_engine::coords::Rect;
    use tessel_engine::input::{InputEvent, MouseButtonState, MouseWheelDelta};

    #[test]
    fn reads_primary_button_transitions() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(&mut frame, InputEvent::PointerMoved(Vec2::new(40.0, 20.0)));
        state.apply_event(
            &mut frame,
            InputEvent::PointerButton {
                button: MouseButton::Left,
                state: MouseButtonState::Pressed,
                position: Vec2::new(40.0, 20.0),
            },
        );
        frame.push_event(InputEvent::MouseWheel(MouseWheelDelta::Pixel { x: 0.0, y: 12.0 }));

        let input = UiInput::from_engine(&state, &frame, 2.0);
        assert_eq!(input.pointer, Some(Vec2::new(20.0, 10.0)));
        assert!(input.pressed && input.just_pressed && !input.just_released);
        assert_eq!(input.wheel, Vec2::new(0.0, 12.0));
        assert!(input.pointer_in(Rect::new(0.0, 0.0, 30.0, 30.0)).is_some());
        assert!(input.pointer_in(Rect::new(25.0, 0.0, 30.0, 30.0)).is_none());
    }

    #[test]
    fn right_button_is_ignored() {
        let mut state = InputState::default();
        let mut frame = InputFrame::default();
        state.apply_event(
            &mut frame,
            InputEvent::PointerButton {
                button: MouseButton::Right,
                state: MouseButtonState::Pressed,
                position: Vec2::ZERO,
            },
        );
        let input = UiInput::from_engine(&state, &frame, 1.0);
        assert!(!input.pressed && !input.just_pressed);
    }
}
