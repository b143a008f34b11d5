use crate::coords::{Rect, Viewport};
use crate::render::{RenderCtx, RenderTarget};

use super::{CompiledProgram, GpuError, HandleKind, RawHandle, VertexLayout};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Uniform,
    Storage,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum FilterMode {
    Nearest,
    Linear,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum WrapMode {
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

/// Sampling state carried by each texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SamplerState {
    pub min_filter: FilterMode,
    pub mag_filter: FilterMode,
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
}

impl Default for SamplerState {
    fn default() -> Self {
        Self {
            min_filter: FilterMode::Linear,
            mag_filter: FilterMode::Linear,
            wrap_u: WrapMode::ClampToEdge,
            wrap_v: WrapMode::ClampToEdge,
        }
    }
}

/// Texel rectangle inside a texture.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl TextureRegion {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    #[inline]
    pub const fn full(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    pub(crate) fn fits(&self, width: u32, height: u32) -> bool {
        self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height)
    }
}

/// A texture bound to one of a program's texture slots for a draw.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TextureBinding {
    pub binding: u32,
    pub sampler_binding: Option<u32>,
    /// `None` when nothing was assigned; backends substitute opaque white.
    pub texture: Option<RawHandle>,
}

/// One indexed draw, fully resolved on the CPU side.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub program: RawHandle,
    pub vertex_array: RawHandle,
    pub index_count: u32,
    /// Snapshot of the program's uniform block.
    pub uniforms: Vec<u8>,
    pub textures: Vec<TextureBinding>,
    /// Logical-pixel clip; `None` draws unclipped.
    pub scissor: Option<Rect>,
}

/// The graphics API seam.
///
/// Wrappers never talk to a backend directly; they go through
/// `GraphicsDevice`, which validates arguments, elides redundant binds and
/// counts live resources. Backends may therefore trust ranges and kinds.
pub trait GpuBackend {
    fn name(&self) -> &'static str;

    fn create_buffer(&mut self, kind: BufferKind, contents: &[u8]) -> Result<RawHandle, GpuError>;
    fn write_buffer(&mut self, buffer: RawHandle, offset: u64, data: &[u8]) -> Result<(), GpuError>;

    fn create_texture(&mut self, width: u32, height: u32, sampler: SamplerState) -> Result<RawHandle, GpuError>;
    /// `pixels` is tightly packed RGBA8 covering `region`.
    fn write_texture(&mut self, texture: RawHandle, region: TextureRegion, pixels: &[u8]) -> Result<(), GpuError>;
    fn set_sampler(&mut self, texture: RawHandle, sampler: SamplerState) -> Result<(), GpuError>;

    fn create_program(&mut self, program: &CompiledProgram) -> Result<RawHandle, GpuError>;
    fn create_vertex_array(
        &mut self,
        layout: &VertexLayout,
        vertices: RawHandle,
        indices: RawHandle,
    ) -> Result<RawHandle, GpuError>;

    fn bind(&mut self, kind: HandleKind, handle: RawHandle);
    fn release(&mut self, kind: HandleKind, handle: RawHandle);

    /// Starts recording a frame; draws recorded before this are discarded.
    fn begin_frame(&mut self, viewport: Viewport);
    fn draw(&mut self, call: DrawCall) -> Result<(), GpuError>;

    /// Encodes every draw recorded since `begin_frame` into `target`.
    /// Backends that do not present anything keep the default.
    fn encode_frame(&mut self, ctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) -> Result<(), GpuError> {
        let _ = (ctx, target);
        Ok(())
    }
}
