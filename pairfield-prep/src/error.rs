//! Error types for scene preparation.

use crate::resolve::SceneKey;
use crate::surface::SampleError;
use pairfield_data::{MeshError, RegionFileError};
use std::path::PathBuf;
use thiserror::Error;

/// Normalization or sampling hit geometry with no usable extent.
#[derive(Debug, Error)]
#[error("degenerate geometry: {0}")]
pub struct DegenerateGeometry(pub String);

/// Failure writing an artifact.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode {path}: {reason}")]
    Encode { path: PathBuf, reason: String },
}

/// A configuration value that fails validation.
#[derive(Debug, Error)]
#[error("invalid configuration value `{field}`: {reason}")]
pub struct InvalidConfig {
    pub field: String,
    pub reason: String,
}

impl InvalidConfig {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors that end the processing of one scene.
///
/// None of these abort a batch; the runner logs them with the scene key and
/// moves on.
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("scene {key} is missing mesh for object {missing_index}")]
    MissingPairedMesh { key: SceneKey, missing_index: usize },

    #[error(transparent)]
    DegenerateGeometry(#[from] DegenerateGeometry),

    #[error("invalid interaction region: {0}")]
    InvalidRegionFile(#[from] RegionFileError),

    #[error("failed to write artifacts: {0}")]
    IoWrite(#[from] PersistError),

    #[error("failed to load mesh: {0}")]
    MeshLoad(#[from] MeshError),

    #[error("surface sampling failed for object {object}: {source}")]
    SurfaceSample {
        object: usize,
        #[source]
        source: SampleError,
    },

    #[error("failed to claim scene {key}: {source}")]
    Claim {
        key: SceneKey,
        #[source]
        source: std::io::Error,
    },
}

impl SceneError {
    /// Stable label used in logs and batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            SceneError::MissingPairedMesh { .. } => "MissingPairedMeshError",
            SceneError::DegenerateGeometry(_) => "DegenerateGeometryError",
            SceneError::InvalidRegionFile(_) => "InvalidRegionFileError",
            SceneError::IoWrite(_) => "IOWriteError",
            SceneError::MeshLoad(_) => "MeshLoadError",
            SceneError::SurfaceSample { .. } => "SurfaceSampleError",
            SceneError::Claim { .. } => "ClaimError",
        }
    }
}
