//! The winit event loop and the single window it drives.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
