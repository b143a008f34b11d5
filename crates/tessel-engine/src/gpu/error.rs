use std::fmt;

use thiserror::Error;

use super::{BufferKind, HandleKind, TextureRegion};

/// Pipeline stage a shader diagnostic belongs to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("{0} used after dispose")]
    Disposed(HandleKind),

    /// `log` is the compiler diagnostic, verbatim.
    #[error("{stage} shader of program `{label}` failed to compile:\n{log}")]
    ShaderCompile { label: String, stage: ShaderStage, log: String },

    #[error("program `{label}` failed to link: {reason}")]
    ShaderLink { label: String, reason: String },

    #[error("{kind} write of {len} bytes at offset {offset} overruns its {capacity} bytes")]
    OutOfRange { kind: HandleKind, offset: u64, len: u64, capacity: u64 },

    #[error("expected a {expected:?} buffer, got a {actual:?} buffer")]
    WrongBufferKind { expected: BufferKind, actual: BufferKind },

    #[error("vertex layout mismatch: {0}")]
    LayoutMismatch(String),

    #[error("no GPU vertex format for {count} x {scalar} (normalized: {normalized})")]
    UnsupportedVertexFormat { count: u8, scalar: &'static str, normalized: bool },

    #[error("pixel data is {actual} bytes, expected {expected}")]
    PixelDataSize { expected: usize, actual: usize },

    #[error("region {region:?} lies outside the {width}x{height} texture")]
    RegionOutOfBounds { region: TextureRegion, width: u32, height: u32 },

    #[error("unknown {0} handle {1}")]
    UnknownHandle(HandleKind, u64),

    #[error("backend error: {0}")]
    Backend(String),
}

impl GpuError {
    pub(crate) fn link(label: &str, reason: impl Into<String>) -> Self {
        GpuError::ShaderLink { label: label.to_string(), reason: reason.into() }
    }
}
