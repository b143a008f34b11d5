use super::TextError;

/// One glyph's coverage bitmap and metrics, in pixels.
///
/// `top_bearing` is the distance from the baseline up to the bitmap's top
/// row; `bearing_x` from the pen to its left column.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedGlyph {
    pub width: u32,
    pub height: u32,
    pub bearing_x: i32,
    pub top_bearing: i32,
    /// Horizontal advance from pen to next pen.
    pub advance: f32,
    /// `width * height` coverage bytes, row-major, top row first.
    pub coverage: Vec<u8>,
}

/// Source of glyph bitmaps for atlas packing.
pub trait GlyphRasterizer {
    fn has_glyph(&self, ch: char) -> bool;
    fn rasterize(&self, ch: char, px: f32) -> RasterizedGlyph;
    /// The font's own space advance, when it defines one.
    fn space_advance(&self, px: f32) -> Option<f32>;
}

/// `fontdue`-backed rasterizer.
pub struct FontdueRasterizer {
    font: fontdue::Font,
}

impl FontdueRasterizer {
    /// Parses a TrueType or OpenType font.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TextError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| TextError::FontLoad(e.to_string()))?;
        Ok(Self { font })
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn has_glyph(&self, ch: char) -> bool {
        self.font.lookup_glyph_index(ch) != 0
    }

    fn rasterize(&self, ch: char, px: f32) -> RasterizedGlyph {
        let (metrics, coverage) = self.font.rasterize(ch, px);
        RasterizedGlyph {
            width: metrics.width as u32,
            height: metrics.height as u32,
            bearing_x: metrics.xmin,
            top_bearing: metrics.ymin + metrics.height as i32,
            advance: metrics.advance_width,
            coverage,
        }
    }

    fn space_advance(&self, px: f32) -> Option<f32> {
        self.has_glyph(' ').then(|| self.font.metrics(' ', px).advance_width)
    }
}
