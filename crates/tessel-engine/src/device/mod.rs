//! Window surface + wgpu device management.
//!
//! Creates the Instance/Adapter/Device/Queue for a window, keeps the surface
//! configured across resizes and hands out one encoder per frame. The
//! resource layer in `gpu` only ever sees cloned `Device`/`Queue` handles.

mod error;
mod frame;
mod gpu;
mod init;
mod surface;

pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
