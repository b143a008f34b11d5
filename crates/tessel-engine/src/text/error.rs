use thiserror::Error;

use crate::gpu::GpuError;

#[derive(Debug, Error)]
pub enum TextError {
    #[error("font has no glyph for {0:?}")]
    MissingGlyph(char),

    #[error("glyph {ch:?} ({width}x{height}) does not fit the {atlas_width}x{atlas_height} atlas")]
    AtlasFull { ch: char, width: u32, height: u32, atlas_width: u32, atlas_height: u32 },

    #[error("{0:?} is not in the font bitmap")]
    CharacterNotFound(char),

    #[error("failed to load font: {0}")]
    FontLoad(String),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}
