//! CPU-side geometry and its GPU upload.
//!
//! A [`Mesh`] holds parallel vertex arrays; [`Mesh::apply`] interleaves them
//! into one vertex blob (see [`build_vertex_blob`]) and replaces the mesh's
//! buffers and vertex array on the device.

use thiserror::Error;

use crate::coords::{ColorRgba, Rect, Vec2};
use crate::gpu::{
    Buffer, BufferKind, GpuError, GraphicsDevice, ScalarType, Semantic, VertexArray, VertexAttribute, VertexLayout,
};

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("{attribute} has {actual} entries for {expected} vertices")]
    LengthMismatch { attribute: &'static str, expected: usize, actual: usize },

    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("{0} indices do not form whole triangles")]
    IndexCount(usize),

    #[error("vertex blob write of {len} bytes at {offset} overflows {capacity} bytes")]
    BlobOverflow { offset: usize, len: usize, capacity: usize },

    #[error("vertex layout attribute {0:?} cannot be filled from mesh data")]
    UnsupportedAttribute(VertexAttribute),

    #[error("mesh has not been applied")]
    NotApplied,

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

#[derive(Debug)]
struct MeshGpu {
    vertices: Buffer,
    indices: Buffer,
    vertex_array: VertexArray,
}

impl MeshGpu {
    fn dispose(mut self, dev: &mut GraphicsDevice) {
        self.vertex_array.dispose(dev);
        self.vertices.dispose(dev);
        self.indices.dispose(dev);
    }
}

/// Indexed triangle list with optional per-vertex UVs and colours.
///
/// `uvs` and `colors` must each be empty or exactly vertex-count long.
#[derive(Debug, Default)]
pub struct Mesh {
    vertices: Vec<Vec2>,
    indices: Vec<u32>,
    uvs: Vec<Vec2>,
    colors: Vec<ColorRgba>,
    bounds: Rect,
    gpu: Option<MeshGpu>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unapplied quad covering `rect`, sampling `uv`.
    pub fn quad(rect: Rect, uv: Rect) -> Self {
        let mut mesh = Self::new();
        mesh.set_quad(rect, uv);
        mesh
    }

    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn uvs(&self) -> &[Vec2] {
        &self.uvs
    }

    pub fn colors(&self) -> &[ColorRgba] {
        &self.colors
    }

    pub fn set_vertices(&mut self, vertices: Vec<Vec2>) {
        self.vertices = vertices;
    }

    pub fn set_indices(&mut self, indices: Vec<u32>) {
        self.indices = indices;
    }

    pub fn set_uvs(&mut self, uvs: Vec<Vec2>) {
        self.uvs = uvs;
    }

    pub fn set_colors(&mut self, colors: Vec<ColorRgba>) {
        self.colors = colors;
    }

    /// Replaces the geometry with one quad (two triangles, clockwise from
    /// the top-left corner). Colours are cleared.
    pub fn set_quad(&mut self, rect: Rect, uv: Rect) {
        let corners = |r: Rect| {
            let (min, max) = (r.min(), r.max());
            vec![min, Vec2::new(max.x, min.y), max, Vec2::new(min.x, max.y)]
        };
        self.vertices = corners(rect);
        self.uvs = corners(uv);
        self.indices = vec![0, 1, 2, 0, 2, 3];
        self.colors.clear();
    }

    /// Drops the CPU arrays. GPU resources stay until the next `apply` or `dispose`.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.uvs.clear();
        self.colors.clear();
    }

    /// Layout of the blob `apply` would build: position, then colour and UV
    /// when present.
    pub fn layout(&self) -> VertexLayout {
        let mut layout = VertexLayout::new().with(VertexAttribute::new(Semantic::Position, 2, ScalarType::F32));
        if !self.colors.is_empty() {
            layout.push(VertexAttribute::new(Semantic::Color, 4, ScalarType::F32));
        }
        if !self.uvs.is_empty() {
            layout.push(VertexAttribute::new(Semantic::TexCoord, 2, ScalarType::F32));
        }
        layout
    }

    /// Bounds of the vertices as of the last `apply`.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn is_applied(&self) -> bool {
        self.gpu.is_some()
    }

    /// Whether the last `apply` produced something to draw.
    pub fn is_drawable(&self) -> bool {
        self.gpu.as_ref().is_some_and(|g| g.vertex_array.index_count() > 0)
    }

    pub fn vertex_array(&self) -> Result<&VertexArray, MeshError> {
        self.gpu.as_ref().map(|g| &g.vertex_array).ok_or(MeshError::NotApplied)
    }

    /// Validates the arrays and uploads them, releasing any previous GPU
    /// resources first. An empty mesh applies cleanly but is not drawable.
    pub fn apply(&mut self, dev: &mut GraphicsDevice) -> Result<(), MeshError> {
        let n = self.vertices.len();
        for (attribute, len) in [("uvs", self.uvs.len()), ("colors", self.colors.len())] {
            if len != 0 && len != n {
                return Err(MeshError::LengthMismatch { attribute, expected: n, actual: len });
            }
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::IndexCount(self.indices.len()));
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i as usize >= n) {
            return Err(MeshError::IndexOutOfRange { index, vertex_count: n });
        }

        if let Some(old) = self.gpu.take() {
            old.dispose(dev);
        }
        self.bounds = Rect::bounding(&self.vertices);

        if n == 0 || self.indices.is_empty() {
            return Ok(());
        }

        let layout = self.layout();
        let blob = build_vertex_blob(&layout, &self.vertices, &self.colors, &self.uvs)?;

        let mut vertices = Buffer::new(dev, BufferKind::Vertex, &blob)?;
        let mut indices = match Buffer::new(dev, BufferKind::Index, bytemuck::cast_slice(&self.indices)) {
            Ok(b) => b,
            Err(e) => {
                vertices.dispose(dev);
                return Err(e.into());
            }
        };
        let vertex_array = match VertexArray::new(dev, layout, &vertices, &indices, self.indices.len() as u32) {
            Ok(v) => v,
            Err(e) => {
                vertices.dispose(dev);
                indices.dispose(dev);
                return Err(e.into());
            }
        };

        log::debug!("mesh applied: {n} vertices, {} indices", self.indices.len());
        self.gpu = Some(MeshGpu { vertices, indices, vertex_array });
        Ok(())
    }

    /// Releases GPU resources. Calling again is a no-op.
    pub fn dispose(&mut self, dev: &mut GraphicsDevice) {
        if let Some(gpu) = self.gpu.take() {
            gpu.dispose(dev);
        }
    }
}

/// Interleaves mesh arrays following `layout`.
///
/// Every attribute must be `f32` with the component count of its source
/// (position 2, colour 4, UV 2). Writes are checked against the
/// `vertex_count × stride` allocation.
pub fn build_vertex_blob(
    layout: &VertexLayout,
    vertices: &[Vec2],
    colors: &[ColorRgba],
    uvs: &[Vec2],
) -> Result<Vec<u8>, MeshError> {
    for attr in layout.attributes() {
        let (components, source_len, name) = match attr.semantic {
            Semantic::Position => (2, vertices.len(), "vertices"),
            Semantic::Color => (4, colors.len(), "colors"),
            Semantic::TexCoord => (2, uvs.len(), "uvs"),
        };
        if attr.scalar != ScalarType::F32 || attr.count != components {
            return Err(MeshError::UnsupportedAttribute(*attr));
        }
        if source_len != vertices.len() {
            return Err(MeshError::LengthMismatch { attribute: name, expected: vertices.len(), actual: source_len });
        }
    }

    let capacity = vertices.len() * layout.stride() as usize;
    let mut blob = vec![0u8; capacity];
    let mut cursor = 0usize;
    let mut write = |floats: &[f32]| -> Result<(), MeshError> {
        let bytes: &[u8] = bytemuck::cast_slice(floats);
        let end = cursor + bytes.len();
        if end > capacity {
            return Err(MeshError::BlobOverflow { offset: cursor, len: bytes.len(), capacity });
        }
        blob[cursor..end].copy_from_slice(bytes);
        cursor = end;
        Ok(())
    };

    for i in 0..vertices.len() {
        for attr in layout.attributes() {
            match attr.semantic {
                Semantic::Position => write(&vertices[i].to_array())?,
                Semantic::Color => write(&colors[i].to_array())?,
                Semantic::TexCoord => write(&uvs[i].to_array())?,
            }
        }
    }

    Ok(blob)
}
