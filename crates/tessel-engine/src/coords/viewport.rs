/// Viewport size in logical pixels plus the window's DPI scale.
///
/// The canvas projection maps `[0, width] x [0, height]` to clip space; the
/// scale factor converts logical scissor rects to physical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
    pub scale_factor: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 0.0, height: 0.0, scale_factor: 1.0 }
    }
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height, scale_factor: 1.0 }
    }

    #[inline]
    pub const fn with_scale_factor(mut self, scale_factor: f32) -> Self {
        self.scale_factor = scale_factor;
        self
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0 && self.height > 0.0 && self.width.is_finite() && self.height.is_finite()
    }

    #[inline]
    pub fn physical_size(self) -> (u32, u32) {
        (
            (self.width * self.scale_factor).round().max(0.0) as u32,
            (self.height * self.scale_factor).round().max(0.0) as u32,
        )
    }
}
