//! Coordinate and geometry types shared by the GPU layer, text and UI.
//!
//! Canonical CPU space:
//! - Logical pixels (DPI-aware)
//! - Origin top-left
//! - +X right, +Y down
//!
//! Layout works in whole pixels (`Vec2i`); meshes and hit-testing use `Vec2`.
//! Matrices are `glam::Mat4` in column-vector form.

mod color;
mod rect;
mod vec2;
mod vec2i;
mod viewport;

pub use color::ColorRgba;
pub use rect::Rect;
pub use vec2::Vec2;
pub use vec2i::Vec2i;
pub use viewport::Viewport;
