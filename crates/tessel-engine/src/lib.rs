//! Tessel engine crate.
//!
//! Platform and GPU runtime pieces used by `tessel-ui`: the window runtime
//! and surface, the GPU resource layer with its deferred command queue, and
//! the mesh, material and text building blocks drawn through it.

pub mod coords;
pub mod core;
pub mod device;
pub mod gpu;
pub mod input;
pub mod logging;
pub mod material;
pub mod mesh;
pub mod paint;
pub mod render;
pub mod text;
pub mod time;
pub mod window;
