//! Built-in WGSL programs.
//!
//! Every program declares one `DrawUniforms { transform, tint }` block at
//! binding 0; textured programs add `main_texture` / `main_texture_sampler`.
//! Vertex inputs use the fixed semantic locations of `gpu::Semantic`.

use crate::gpu::ProgramSource;

/// Flat fill with the tint colour. Inputs: position.
pub const SOLID: ProgramSource<'static> =
    ProgramSource::single("solid", include_str!("shaders/solid.wgsl"));

/// RGBA texture modulated by the tint. Inputs: position, texcoord.
pub const SPRITE: ProgramSource<'static> =
    ProgramSource::single("sprite", include_str!("shaders/sprite.wgsl"));

/// Coverage atlas (alpha channel) filled with the tint. Inputs: position, texcoord.
pub const TEXT: ProgramSource<'static> =
    ProgramSource::single("text", include_str!("shaders/text.wgsl"));

/// Per-vertex colour modulated by the tint. Inputs: position, colour.
pub const VERTEX_COLOR: ProgramSource<'static> =
    ProgramSource::single("vertex_color", include_str!("shaders/vertex_color.wgsl"));

/// Uniform names the built-in programs share.
pub mod uniforms {
    pub const TRANSFORM: &str = "transform";
    pub const TINT: &str = "tint";
    pub const MAIN_TEXTURE: &str = "main_texture";
}
