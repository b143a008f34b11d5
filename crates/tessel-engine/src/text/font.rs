use std::collections::BTreeMap;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::rc::Rc;

use crate::coords::Vec2;
use crate::gpu::{GraphicsDevice, Texture};

use super::{FontdueRasterizer, Glyph, GlyphRasterizer, TextError, TextMesh, layout_text, pack_glyphs};

/// Space advance, as a fraction of the pixel size, for fonts without one.
pub const SPACE_ADVANCE_FALLBACK: f32 = 0.25;

/// Which characters a font bakes and how.
#[derive(Debug, Clone)]
pub struct FontConfig {
    pub charset: Vec<char>,
    /// Gap in pixels around every glyph in the atlas.
    pub padding: u32,
    pub space_advance_fallback: f32,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            charset: (' '..='~').collect(),
            padding: 1,
            space_advance_fallback: SPACE_ADVANCE_FALLBACK,
        }
    }
}

/// One pixel size of a font: atlas texture plus glyph table.
///
/// UVs never change for the bitmap's lifetime.
#[derive(Debug)]
pub struct FontBitmap {
    pixel_size: f32,
    atlas: Rc<Texture>,
    glyphs: BTreeMap<char, Glyph>,
    ascent: f32,
    line_height: f32,
    space_advance: f32,
}

impl FontBitmap {
    pub fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    pub fn atlas(&self) -> &Rc<Texture> {
        &self.atlas
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    pub fn glyphs(&self) -> &BTreeMap<char, Glyph> {
        &self.glyphs
    }

    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn space_advance(&self) -> f32 {
        self.space_advance
    }

    pub fn layout(&self, text: &str) -> Result<TextMesh, TextError> {
        layout_text(&self.glyphs, self.line_height, self.space_advance, text)
    }

    pub fn measure(&self, text: &str) -> Result<Vec2, TextError> {
        self.layout(text).map(|mesh| mesh.size)
    }
}

/// A font face and the bitmaps generated from it, one per pixel size.
pub struct Font {
    rasterizer: Box<dyn GlyphRasterizer>,
    config: FontConfig,
    bitmaps: HashMap<u32, FontBitmap>,
}

impl Font {
    /// Parses font bytes with the default charset.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TextError> {
        Ok(Self::with_rasterizer(FontdueRasterizer::from_bytes(bytes)?, FontConfig::default()))
    }

    pub fn with_rasterizer(rasterizer: impl GlyphRasterizer + 'static, config: FontConfig) -> Self {
        Self { rasterizer: Box::new(rasterizer), config, bitmaps: HashMap::new() }
    }

    pub fn config(&self) -> &FontConfig {
        &self.config
    }

    /// Bakes the charset at `pixel_size` into an `atlas_dimension²` texture,
    /// or returns the bitmap already baked for that size.
    pub fn generate_bitmap(
        &mut self,
        dev: &mut GraphicsDevice,
        pixel_size: f32,
        atlas_dimension: u32,
    ) -> Result<&FontBitmap, TextError> {
        match self.bitmaps.entry(pixel_size.to_bits()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let packed =
                    pack_glyphs(self.rasterizer.as_ref(), &self.config, pixel_size, atlas_dimension, atlas_dimension)?;
                let atlas = Texture::from_rgba(dev, packed.width, packed.height, &packed.pixels)?;
                log::debug!("font bitmap {pixel_size}px ready: line height {}", packed.line_height);

                Ok(entry.insert(FontBitmap {
                    pixel_size,
                    atlas: Rc::new(atlas),
                    glyphs: packed.glyphs,
                    ascent: packed.ascent,
                    line_height: packed.line_height,
                    space_advance: packed.space_advance,
                }))
            }
        }
    }

    pub fn bitmap(&self, pixel_size: f32) -> Option<&FontBitmap> {
        self.bitmaps.get(&pixel_size.to_bits())
    }

    /// Releases every atlas texture. Calling again is a no-op.
    pub fn dispose(&mut self, dev: &mut GraphicsDevice) {
        for (_, bitmap) in self.bitmaps.drain() {
            bitmap.atlas.dispose(dev);
        }
    }
}

impl std::fmt::Debug for Font {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Font")
            .field("charset", &self.config.charset.len())
            .field("bitmaps", &self.bitmaps.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::HandleKind;
    use crate::text::RasterizedGlyph;

    /// `A`: bearing 2, 10×12; `B`: bearing 3, 9×12. Both advance 12 from the pen.
    struct TwoLetters;

    impl GlyphRasterizer for TwoLetters {
        fn has_glyph(&self, ch: char) -> bool {
            matches!(ch, 'A' | 'B')
        }

        fn rasterize(&self, ch: char, _px: f32) -> RasterizedGlyph {
            let (width, bearing_x) = if ch == 'A' { (10, 2) } else { (9, 3) };
            RasterizedGlyph {
                width,
                height: 12,
                bearing_x,
                top_bearing: 12,
                advance: 12.0,
                coverage: vec![255; width as usize * 12],
            }
        }

        fn space_advance(&self, _px: f32) -> Option<f32> {
            None
        }
    }

    fn font() -> Font {
        Font::with_rasterizer(TwoLetters, FontConfig { charset: vec![' ', 'A', 'B'], ..FontConfig::default() })
    }

    // ── bitmaps ───────────────────────────────────────────────────────────

    #[test]
    fn bitmap_is_cached_per_pixel_size() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let mut font = font();
        assert!(font.bitmap(16.0).is_none());

        font.generate_bitmap(&mut dev, 16.0, 64).unwrap();
        font.generate_bitmap(&mut dev, 16.0, 64).unwrap();
        assert_eq!(dev.live_resources(HandleKind::Texture), 1);

        font.generate_bitmap(&mut dev, 24.0, 64).unwrap();
        assert_eq!(dev.live_resources(HandleKind::Texture), 2);
        assert_eq!(font.bitmap(24.0).unwrap().pixel_size(), 24.0);

        font.dispose(&mut dev);
        font.dispose(&mut dev);
        assert_eq!(dev.live_resources(HandleKind::Texture), 0);
    }

    #[test]
    fn atlas_texture_holds_packed_pixels() {
        let (mut dev, probe) = GraphicsDevice::headless();
        let mut font = font();
        let bitmap = font.generate_bitmap(&mut dev, 16.0, 32).unwrap();

        let pixels = probe.texture_pixels(bitmap.atlas().handle().unwrap()).unwrap();
        let a = bitmap.glyph('A').unwrap().uv;
        let (x, y) = ((a.origin.x * 32.0) as usize, (a.origin.y * 32.0) as usize);
        assert_eq!(pixels[(y * 32 + x) * 4 + 3], 255);
        font.dispose(&mut dev);
    }

    // ── measuring ─────────────────────────────────────────────────────────

    #[test]
    fn two_letter_label_measures_pen_extent() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let mut font = font();
        let bitmap = font.generate_bitmap(&mut dev, 16.0, 64).unwrap();

        assert_eq!(bitmap.glyph('A').unwrap().advance, 10.0);
        assert_eq!(bitmap.glyph('B').unwrap().advance, 9.0);
        assert_eq!(bitmap.measure("AB").unwrap(), Vec2::new(21.0, bitmap.line_height()));
        assert_eq!(bitmap.space_advance(), 16.0 * SPACE_ADVANCE_FALLBACK);
        font.dispose(&mut dev);
    }

    #[test]
    fn atlas_too_small_reports_full() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let mut font = font();
        let err = font.generate_bitmap(&mut dev, 16.0, 8).unwrap_err();
        assert!(matches!(err, TextError::AtlasFull { .. }));
        assert_eq!(dev.live_resources(HandleKind::Texture), 0);
    }

    #[test]
    fn bad_font_bytes_fail_to_load() {
        assert!(matches!(Font::from_bytes(b"not a font"), Err(TextError::FontLoad(_))));
    }
}
