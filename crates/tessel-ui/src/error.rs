use thiserror::Error;

use tessel_engine::gpu::{GpuError, UniformError};
use tessel_engine::material::MaterialError;
use tessel_engine::mesh::MeshError;
use tessel_engine::text::TextError;

use crate::tree::ElementId;

#[derive(Debug, Error)]
pub enum UiError {
    #[error("element {0} was destroyed")]
    StaleElement(ElementId),

    #[error("adding {child} under {parent} would create a cycle")]
    Cycle { parent: ElementId, child: ElementId },

    #[error("{child} is not a child of {parent}")]
    NotAChild { parent: ElementId, child: ElementId },

    #[error(transparent)]
    Gpu(#[from] GpuError),

    #[error(transparent)]
    Uniform(#[from] UniformError),

    #[error(transparent)]
    Material(#[from] MaterialError),

    #[error(transparent)]
    Mesh(#[from] MeshError),

    #[error(transparent)]
    Text(#[from] TextError),

    /// A deferred GPU command failed while draining.
    #[error(transparent)]
    Command(#[from] anyhow::Error),
}
