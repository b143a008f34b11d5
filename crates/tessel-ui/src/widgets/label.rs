use tessel_engine::coords::{Vec2, Vec2i};
use tessel_engine::gpu::GraphicsDevice;
use tessel_engine::material::Material;
use tessel_engine::paint::Color;
use tessel_engine::render::builtin::uniforms;
use tessel_engine::text::FontBitmap;

use crate::error::UiError;
use crate::tree::{ElementId, UiTree};

use super::{Placement, WidgetCtx};

/// A single- or multi-line string drawn from a font bitmap.
///
/// The mesh is laid out in pixels, so the element does not scale it by its
/// size; instead the element's size is set to the measured text size.
#[derive(Debug, Clone)]
pub struct Label {
    name: String,
    text: String,
    color: Color,
    position: Vec2i,
    pivot: Vec2,
    anchor: Vec2,
}

impl Label {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            name: "label".to_string(),
            text: text.into(),
            color: Color::WHITE,
            position: Vec2i::ZERO,
            pivot: Vec2::ZERO,
            anchor: Vec2::ZERO,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn position(mut self, position: Vec2i) -> Self {
        self.position = position;
        self
    }

    /// Point within the parent the label hangs from, and the point of the
    /// label that sits on it.
    pub fn align(mut self, anchor: Vec2, pivot: Vec2) -> Self {
        self.anchor = anchor;
        self.pivot = pivot;
        self
    }

    pub fn build(self, cx: &mut WidgetCtx<'_>, bitmap: &FontBitmap, parent: ElementId) -> Result<ElementId, UiError> {
        let text = bitmap.layout(&self.text)?;
        let size = text.size.round_to_i();

        let mut material = Material::new(cx.programs.text.clone());
        material.set_texture(uniforms::MAIN_TEXTURE, bitmap.atlas().clone());

        let placement = Placement { position: self.position, size, pivot: self.pivot, ..Placement::default() }
            .anchors(self.anchor, self.anchor);
        let id = cx.spawn_drawable(&self.name, parent, placement, text.into_mesh(), material, self.color)?;
        cx.tree.set_scale_with_size(id, false)?;
        Ok(id)
    }

    /// Re-lays `id`'s mesh for `text` and resizes the element to fit.
    ///
    /// On a missing character nothing changes.
    pub fn set_text(
        tree: &mut UiTree,
        dev: &mut GraphicsDevice,
        bitmap: &FontBitmap,
        id: ElementId,
        text: &str,
    ) -> Result<(), UiError> {
        let laid_out = bitmap.layout(text)?;
        let size = laid_out.size.round_to_i();

        if let Some(payload) = tree.payload_mut(id)? {
            let mut mesh = laid_out.into_mesh();
            mesh.apply(dev)?;
            payload.mesh.dispose(dev);
            payload.mesh = mesh;
        }
        tree.set_size(id, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_engine::gpu::HandleKind;
    use tessel_engine::text::{Font, FontConfig, GlyphRasterizer, RasterizedGlyph};

    use crate::widgets::UiPrograms;

    /// `A`: bearing 2, 10×12; `B`: bearing 3, 9×12.
    struct TwoLetters;

    impl GlyphRasterizer for TwoLetters {
        fn has_glyph(&self, ch: char) -> bool {
            matches!(ch, 'A' | 'B')
        }

        fn rasterize(&self, ch: char, _px: f32) -> RasterizedGlyph {
            let (width, bearing_x) = if ch == 'A' { (10, 2) } else { (9, 3) };
            RasterizedGlyph { width, height: 12, bearing_x, top_bearing: 12, advance: 12.0, coverage: vec![255; width as usize * 12] }
        }

        fn space_advance(&self, _px: f32) -> Option<f32> {
            Some(5.0)
        }
    }

    fn font() -> Font {
        Font::with_rasterizer(TwoLetters, FontConfig { charset: vec![' ', 'A', 'B'], ..FontConfig::default() })
    }

    #[test]
    fn label_sizes_to_its_text() {
        let (mut dev, _probe) = GraphicsDevice::headless();
        let programs = UiPrograms::compile(&mut dev).unwrap();
        let mut font = font();
        let bitmap = font.generate_bitmap(&mut dev, 16.0, 64).unwrap();
        let mut tree = UiTree::new();
        let root = tree.create("root");

        let mut cx = WidgetCtx::new(&mut tree, &mut dev, &programs);
        let id = Label::new("AB").build(&mut cx, bitmap, root).unwrap();

        let line = bitmap.line_height() as i32;
        assert_eq!(tree.element(id).unwrap().inputs().size, Vec2i::new(21, line));
        assert!(!tree.element(id).unwrap().inputs().scale_with_size);

        Label::set_text(&mut tree, &mut dev, bitmap, id, "A B").unwrap();
        // 2 + 10 (A) + 5 (space) + 9 (B)
        assert_eq!(tree.element(id).unwrap().inputs().size, Vec2i::new(26, line));
        assert_eq!(dev.live_resources(HandleKind::VertexArray), 1);

        assert!(Label::set_text(&mut tree, &mut dev, bitmap, id, "AZ").is_err());
        assert_eq!(tree.element(id).unwrap().inputs().size, Vec2i::new(26, line));

        // The atlas belongs to the font, so destroying the label keeps it.
        tree.destroy(&mut dev, root);
        assert_eq!(dev.live_resources(HandleKind::Texture), 1);
        font.dispose(&mut dev);
        programs.dispose(&mut dev);
    }
}
