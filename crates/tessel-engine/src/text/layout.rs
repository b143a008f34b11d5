use std::collections::BTreeMap;

use crate::coords::{Rect, Vec2};
use crate::mesh::Mesh;

use super::{Glyph, TextError};

/// Quad geometry for a string, in pixels relative to the text's top-left.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextMesh {
    pub vertices: Vec<Vec2>,
    pub uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    /// `(widest pen extent, lines × line_height)`.
    pub size: Vec2,
}

impl TextMesh {
    /// Moves the geometry into an unapplied [`Mesh`].
    pub fn into_mesh(self) -> Mesh {
        let mut mesh = Mesh::new();
        mesh.set_vertices(self.vertices);
        mesh.set_uvs(self.uvs);
        mesh.set_indices(self.indices);
        mesh
    }
}

fn corners(r: Rect) -> [Vec2; 4] {
    let (min, max) = (r.min(), r.max());
    [min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)]
}

/// Lays `text` out on one or more lines.
///
/// Each line's pen starts at its first glyph's left bearing. Every non-space
/// glyph emits one quad at the pen, shifted down by its offset from the line
/// top; the pen then moves by the glyph's advance (space: `space_advance`).
/// `'\n'` starts a new line. Any other character missing from `glyphs`
/// fails the whole string.
pub fn layout_text(
    glyphs: &BTreeMap<char, Glyph>,
    line_height: f32,
    space_advance: f32,
    text: &str,
) -> Result<TextMesh, TextError> {
    let mut mesh = TextMesh::default();
    let mut width = 0.0f32;

    for (line_index, line) in text.split('\n').enumerate() {
        let top = line_index as f32 * line_height;
        let mut pen: Option<f32> = None;

        for ch in line.chars() {
            if ch == ' ' {
                *pen.get_or_insert(0.0) += space_advance;
                continue;
            }
            let glyph = glyphs.get(&ch).ok_or(TextError::CharacterNotFound(ch))?;
            let x = *pen.get_or_insert(glyph.offset.x);

            let base = mesh.vertices.len() as u32;
            let quad = Rect::new(x, top + glyph.offset.y, glyph.size.x, glyph.size.y);
            mesh.vertices.extend(corners(quad));
            mesh.uvs.extend(corners(glyph.uv));
            mesh.indices.extend([0, 1, 2, 0, 2, 3].map(|i| base + i));

            pen = Some(x + glyph.advance);
        }

        width = width.max(pen.unwrap_or(0.0));
        mesh.size = Vec2::new(width, top + line_height);
    }

    Ok(mesh)
}
