//! GPU resource layer.
//!
//! Thin owning wrappers (`Buffer`, `VertexArray`, `Program`, `Texture`) over
//! opaque backend handles. All of them go through one [`GraphicsDevice`] per
//! graphics context, which owns the bound-handle cache, live-resource
//! counters and the deferred command queue.
//!
//! Backends:
//! - [`WgpuBackend`]: records draws and encodes them into a frame's render pass.
//! - [`HeadlessBackend`]: records calls, used by tests and tools.
//!
//! Disposal is explicit (`dispose(&mut GraphicsDevice)`) and idempotent;
//! dropping an undisposed wrapper logs a warning in debug builds.

mod backend;
mod buffer;
mod device;
mod error;
mod handle;
mod headless;
mod program;
mod queue;
mod reflect;
mod texture;
mod vertex;
mod wgpu_backend;

pub use backend::{
    BufferKind, DrawCall, FilterMode, GpuBackend, SamplerState, TextureBinding, TextureRegion, WrapMode,
};
pub use buffer::Buffer;
pub use device::GraphicsDevice;
pub use error::{GpuError, ShaderStage};
pub use handle::{BindStats, HandleKind, RawHandle};
pub use headless::{BackendCall, HeadlessBackend, HeadlessProbe};
pub use program::{Program, ProgramSource, UniformError, UniformValue};
pub use queue::{Command, CommandSender};
pub use reflect::{CompiledProgram, CompiledStage, ProgramLayout, TextureSlot, UniformBlock, UniformMember, UniformType};
pub use texture::Texture;
pub use vertex::{ScalarType, Semantic, VertexArray, VertexAttribute, VertexLayout};
pub use wgpu_backend::WgpuBackend;
