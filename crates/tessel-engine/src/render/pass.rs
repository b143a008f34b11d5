//! Pipeline state shared by every draw the wgpu backend encodes.

use crate::coords::{Rect, Viewport};

pub(crate) fn premul_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState { color: component, alpha: component }
}

pub(crate) fn triangle_list() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// Logical clip rect to physical `(x, y, w, h)` scissor arguments, clamped to
/// the viewport. `None` clip means the full viewport; a zero-area result
/// returns `None` and the draw must be skipped.
pub(crate) fn logical_clip_to_scissor(clip: Option<Rect>, viewport: Viewport) -> Option<(u32, u32, u32, u32)> {
    let scale = viewport.scale_factor;
    let (vw, vh) = viewport.physical_size();
    let (vw, vh) = (vw.max(1), vh.max(1));

    let (x, y, w, h) = match clip {
        None => (0, 0, vw, vh),
        Some(r) => {
            let to_px = |v: f32, max: u32| ((v * scale).max(0.0) as u32).min(max);
            let x = to_px(r.origin.x, vw);
            let y = to_px(r.origin.y, vh);
            let x2 = to_px(r.origin.x + r.size.x, vw);
            let y2 = to_px(r.origin.y + r.size.y, vh);
            (x, y, x2.saturating_sub(x), y2.saturating_sub(y))
        }
    };

    if w == 0 || h == 0 { None } else { Some((x, y, w, h)) }
}
