//! Colour model for tints and clear colours.
//!
//! Tints are premultiplied; the built-in shaders multiply sampled texels and
//! vertex colours by the tint uniform and blend with premultiplied alpha.

pub mod color;

pub use color::Color;
