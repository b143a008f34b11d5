//! Frame-level rendering glue.
//!
//! `RenderCtx`/`RenderTarget` carry one frame's encoder and view into the
//! wgpu backend. `builtin` holds the WGSL programs the UI layer draws with.
//!
//! Convention:
//! - CPU geometry is in logical pixels (top-left origin, +Y down).
//! - Vertex shaders multiply by a `transform` uniform (projection x model).

pub mod builtin;
mod ctx;
pub(crate) mod pass;

pub use ctx::{RenderCtx, RenderTarget};
