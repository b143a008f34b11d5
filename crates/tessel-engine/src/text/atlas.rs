use std::collections::BTreeMap;

use crate::coords::{Rect, Vec2};

use super::{FontConfig, GlyphRasterizer, RasterizedGlyph, TextError};

/// Placement of one character in a font bitmap, in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Glyph {
    /// Top-left of the quad relative to the pen and the line top:
    /// `x` is the left bearing, `y` is `ascent - top_bearing`.
    pub offset: Vec2,
    pub size: Vec2,
    /// Atlas-normalized rectangle.
    pub uv: Rect,
    /// `(left bearing, top bearing)` as rasterized.
    pub bearing: Vec2,
    /// Pen advance after this glyph's left edge.
    pub advance: f32,
}

/// Result of packing a charset: the RGBA atlas image and its glyph table.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedAtlas {
    pub width: u32,
    pub height: u32,
    /// Straight-alpha RGBA8: white, alpha = coverage.
    pub pixels: Vec<u8>,
    pub glyphs: BTreeMap<char, Glyph>,
    pub ascent: f32,
    pub descent: f32,
    pub line_height: f32,
    pub space_advance: f32,
}

struct Placed {
    ch: char,
    raster: RasterizedGlyph,
    x: u32,
    y: u32,
}

/// Rasterizes `config.charset` at `px` and packs it row by row into a
/// `width × height` atlas.
///
/// The cursor starts at `(padding, padding)` and wraps to a new row when a
/// glyph would cross the right edge. Glyphs are never clipped: one that still
/// does not fit fails the whole pack. Space gets an advance but no bitmap.
pub fn pack_glyphs(
    rasterizer: &dyn GlyphRasterizer,
    config: &FontConfig,
    px: f32,
    width: u32,
    height: u32,
) -> Result<PackedAtlas, TextError> {
    let padding = config.padding;
    let mut pixels = vec![0u8; width as usize * height as usize * 4];
    let mut placed: Vec<Placed> = Vec::new();

    let (mut x, mut y, mut row_height) = (padding, padding, 0u32);
    for ch in config.charset.iter().copied() {
        if ch == ' ' {
            continue;
        }
        if !rasterizer.has_glyph(ch) {
            return Err(TextError::MissingGlyph(ch));
        }
        let raster = rasterizer.rasterize(ch, px);
        let (w, h) = (raster.width, raster.height);

        if x + w > width {
            x = padding;
            y += row_height + padding;
            row_height = 0;
        }
        if w > width.saturating_sub(padding) || y + h > height {
            return Err(TextError::AtlasFull { ch, width: w, height: h, atlas_width: width, atlas_height: height });
        }

        for row in 0..h as usize {
            for col in 0..w as usize {
                let alpha = raster.coverage.get(row * w as usize + col).copied().unwrap_or(0);
                let at = ((y as usize + row) * width as usize + x as usize + col) * 4;
                pixels[at..at + 4].copy_from_slice(&[255, 255, 255, alpha]);
            }
        }

        placed.push(Placed { ch, raster, x, y });
        x += w + padding;
        row_height = row_height.max(h);
    }

    let ascent = placed.iter().map(|p| p.raster.top_bearing).max().unwrap_or(0).max(0) as f32;
    let descent = placed
        .iter()
        .map(|p| p.raster.height as i32 - p.raster.top_bearing)
        .max()
        .unwrap_or(0)
        .max(0) as f32;

    let (aw, ah) = (width as f32, height as f32);
    let glyphs = placed
        .into_iter()
        .map(|p| {
            let r = &p.raster;
            let size = Vec2::new(r.width as f32, r.height as f32);
            let glyph = Glyph {
                offset: Vec2::new(r.bearing_x as f32, ascent - r.top_bearing as f32),
                size,
                uv: Rect::new(p.x as f32 / aw, p.y as f32 / ah, size.x / aw, size.y / ah),
                bearing: Vec2::new(r.bearing_x as f32, r.top_bearing as f32),
                advance: (r.advance - r.bearing_x as f32).max(size.x),
            };
            (p.ch, glyph)
        })
        .collect::<BTreeMap<_, _>>();

    let space_advance = rasterizer
        .space_advance(px)
        .unwrap_or(config.space_advance_fallback * px);

    log::debug!(
        "packed {} glyphs at {px}px into {width}x{height} (rows end at y={})",
        glyphs.len(),
        y + row_height
    );

    Ok(PackedAtlas {
        width,
        height,
        pixels,
        glyphs,
        ascent,
        descent,
        line_height: ascent + descent,
        space_advance,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::text::SPACE_ADVANCE_FALLBACK;

    /// Solid boxes with fixed metrics.
    struct Boxes {
        glyphs: HashMap<char, (u32, u32, i32, i32, f32)>,
        space: Option<f32>,
    }

    impl Boxes {
        fn new(entries: &[(char, u32, u32, i32, i32, f32)]) -> Self {
            let glyphs = entries.iter().map(|&(c, w, h, bx, top, adv)| (c, (w, h, bx, top, adv))).collect();
            Self { glyphs, space: Some(4.0) }
        }
    }

    impl GlyphRasterizer for Boxes {
        fn has_glyph(&self, ch: char) -> bool {
            self.glyphs.contains_key(&ch)
        }

        fn rasterize(&self, ch: char, _px: f32) -> RasterizedGlyph {
            let (width, height, bearing_x, top_bearing, advance) = self.glyphs[&ch];
            RasterizedGlyph {
                width,
                height,
                bearing_x,
                top_bearing,
                advance,
                coverage: vec![200; (width * height) as usize],
            }
        }

        fn space_advance(&self, _px: f32) -> Option<f32> {
            self.space
        }
    }

    fn config(charset: &str) -> FontConfig {
        FontConfig { charset: charset.chars().collect(), ..FontConfig::default() }
    }

    // ── packing ───────────────────────────────────────────────────────────

    #[test]
    fn glyphs_pack_left_to_right_with_padding() {
        let r = Boxes::new(&[('a', 4, 5, 0, 5, 5.0), ('b', 3, 6, 1, 6, 5.0)]);
        let atlas = pack_glyphs(&r, &config("ab"), 16.0, 16, 16).unwrap();

        assert_eq!(atlas.glyphs[&'a'].uv, Rect::new(1.0 / 16.0, 1.0 / 16.0, 4.0 / 16.0, 5.0 / 16.0));
        assert_eq!(atlas.glyphs[&'b'].uv.origin, Vec2::new(6.0 / 16.0, 1.0 / 16.0));

        let texel = |x: usize, y: usize| &atlas.pixels[(y * 16 + x) * 4..(y * 16 + x) * 4 + 4];
        assert_eq!(texel(1, 1), [255, 255, 255, 200]);
        assert_eq!(texel(0, 0), [0, 0, 0, 0]);
        assert_eq!(texel(5, 1), [0, 0, 0, 0]);
    }

    #[test]
    fn row_wraps_when_glyph_crosses_right_edge() {
        let r = Boxes::new(&[('a', 6, 4, 0, 4, 6.0), ('b', 6, 7, 0, 7, 6.0), ('c', 6, 2, 0, 2, 6.0)]);
        let atlas = pack_glyphs(&r, &config("abc"), 16.0, 16, 32).unwrap();

        // a at x=1, b at x=8; c would end at 21 > 16 so it starts the next row
        // below the tallest glyph (b, 7px) plus padding.
        assert_eq!(atlas.glyphs[&'c'].uv.origin, Vec2::new(1.0 / 16.0, 9.0 / 32.0));
    }

    #[test]
    fn oversized_glyph_fails_instead_of_clipping() {
        let r = Boxes::new(&[('a', 4, 20, 0, 20, 4.0)]);
        let err = pack_glyphs(&r, &config("a"), 16.0, 16, 16).unwrap_err();
        assert!(matches!(err, TextError::AtlasFull { ch: 'a', .. }));

        let wide = Boxes::new(&[('w', 16, 2, 0, 2, 16.0)]);
        assert!(matches!(pack_glyphs(&wide, &config("w"), 16.0, 16, 16), Err(TextError::AtlasFull { .. })));
    }

    #[test]
    fn missing_glyph_fails() {
        let r = Boxes::new(&[('a', 2, 2, 0, 2, 2.0)]);
        let err = pack_glyphs(&r, &config("az"), 16.0, 16, 16).unwrap_err();
        assert!(matches!(err, TextError::MissingGlyph('z')));
    }

    #[test]
    fn packing_is_deterministic() {
        let r = Boxes::new(&[('a', 4, 5, 0, 5, 5.0), ('b', 3, 6, 1, 6, 5.0), ('c', 7, 3, 0, 3, 8.0)]);
        let first = pack_glyphs(&r, &config("abc"), 16.0, 16, 16).unwrap();
        let second = pack_glyphs(&r, &config("abc"), 16.0, 16, 16).unwrap();
        assert_eq!(first, second);
    }

    // ── metrics ───────────────────────────────────────────────────────────

    #[test]
    fn baseline_aligns_glyph_tops() {
        // 'g' descends 3px below the baseline.
        let r = Boxes::new(&[('A', 10, 12, 2, 12, 12.0), ('g', 8, 10, 1, 7, 9.0)]);
        let atlas = pack_glyphs(&r, &config("Ag"), 16.0, 64, 64).unwrap();

        assert_eq!(atlas.ascent, 12.0);
        assert_eq!(atlas.descent, 3.0);
        assert_eq!(atlas.line_height, 15.0);
        assert_eq!(atlas.glyphs[&'A'].offset, Vec2::new(2.0, 0.0));
        assert_eq!(atlas.glyphs[&'g'].offset, Vec2::new(1.0, 5.0));
        assert_eq!(atlas.glyphs[&'A'].advance, 10.0);
    }

    #[test]
    fn space_has_advance_but_no_bitmap() {
        let r = Boxes::new(&[('a', 2, 2, 0, 2, 2.0)]);
        let atlas = pack_glyphs(&r, &config(" a"), 20.0, 16, 16).unwrap();
        assert!(!atlas.glyphs.contains_key(&' '));
        assert_eq!(atlas.space_advance, 4.0);

        let mut fallback = Boxes::new(&[('a', 2, 2, 0, 2, 2.0)]);
        fallback.space = None;
        let atlas = pack_glyphs(&fallback, &config(" a"), 20.0, 16, 16).unwrap();
        assert_eq!(atlas.space_advance, 20.0 * SPACE_ADVANCE_FALLBACK);
    }
}
