//! Fonts, glyph atlases and text meshes.
//!
//! A [`Font`] rasterizes its charset once per pixel size into a
//! [`FontBitmap`]: one RGBA atlas texture (white, alpha = coverage) plus a
//! per-character [`Glyph`] table. [`layout_text`] turns a string into quad
//! geometry against that table.

mod atlas;
mod error;
mod font;
mod layout;
mod raster;

pub use atlas::{pack_glyphs, Glyph, PackedAtlas};
pub use error::TextError;
pub use font::{Font, FontBitmap, FontConfig, SPACE_ADVANCE_FALLBACK};
pub use layout::{layout_text, TextMesh};
pub use raster::{FontdueRasterizer, GlyphRasterizer, RasterizedGlyph};
