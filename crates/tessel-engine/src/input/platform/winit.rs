use winit::event::{ElementState, MouseButton as WinitButton, MouseScrollDelta, WindowEvent};
use winit::window::Window;

use crate::coords::Vec2;
use crate::input::{InputEvent, InputState, MouseButton, MouseButtonState, MouseWheelDelta};

/// Maps the pointer-related subset of winit's window events; everything else
/// is `None`.
pub(crate) fn translate_window_event(window: &Window, state: &InputState, event: &WindowEvent) -> Option<InputEvent> {
    let scale = window.scale_factor();
    let logical = |x: f64, y: f64| Vec2::new((x / scale) as f32, (y / scale) as f32);

    let ev = match event {
        WindowEvent::CursorMoved { position, .. } => InputEvent::PointerMoved(logical(position.x, position.y)),
        WindowEvent::CursorLeft { .. } => InputEvent::PointerLeft,
        WindowEvent::Focused(focused) => InputEvent::Focused(*focused),
        WindowEvent::MouseInput { state: pressed, button, .. } => InputEvent::PointerButton {
            button: button_of(*button),
            state: match pressed {
                ElementState::Pressed => MouseButtonState::Pressed,
                ElementState::Released => MouseButtonState::Released,
            },
            // winit 0.30 has no cursor query
            position: state.pointer_pos.unwrap_or(Vec2::ZERO),
        },
        WindowEvent::MouseWheel { delta: MouseScrollDelta::LineDelta(x, y), .. } => {
            InputEvent::MouseWheel(MouseWheelDelta::Line { x: *x, y: *y })
        }
        WindowEvent::MouseWheel { delta: MouseScrollDelta::PixelDelta(p), .. } => {
            let p = logical(p.x, p.y);
            InputEvent::MouseWheel(MouseWheelDelta::Pixel { x: p.x, y: p.y })
        }
        _ => return None,
    };
    Some(ev)
}

fn button_of(b: WinitButton) -> MouseButton {
    match b {
        WinitButton::Left => MouseButton::Left,
        WinitButton::Right => MouseButton::Right,
        WinitButton::Middle => MouseButton::Middle,
        WinitButton::Back => MouseButton::Other(3),
        WinitButton::Forward => MouseButton::Other(4),
        WinitButton::Other(n) => MouseButton::Other(n),
    }
}
