//! Error types for mesh and region-file loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading a mesh.
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("unsupported mesh format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("face {face} references vertex {vertex}, mesh has {vertex_count} vertices")]
    InvalidFace {
        face: usize,
        vertex: i64,
        vertex_count: usize,
    },
}

impl MeshError {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MeshError::Parse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

/// Errors reading an interaction-region file.
#[derive(Debug, Error)]
pub enum RegionFileError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed region file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}
