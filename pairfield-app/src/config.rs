//! Run configuration loaded from JSON.

use pairfield_prep::{
    FilenamePattern, InvalidConfig, OutputLayout, PipelineConfig, QueryConfig, SurfaceConfig,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that stop a run before any scene is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Invalid(#[from] InvalidConfig),
}

fn default_workers() -> usize {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Meshes at `{mesh_dir}/{category}/{scene}_{0|1}.{off|ply}`.
    pub mesh_dir: PathBuf,
    /// Interaction boxes at `{region_dir}/{category}/{scene}.txt`.
    pub region_dir: PathBuf,
    pub pcd_dir: PathBuf,
    pub sdf_dir: PathBuf,
    pub categories: Vec<String>,
    #[serde(default)]
    pub mesh_filename_pattern: Option<String>,
    pub surface: SurfaceConfig,
    pub query: QueryConfig,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Share claims between processes through marker files here.
    #[serde(default)]
    pub claim_dir: Option<PathBuf>,
    #[serde(default)]
    pub ibs_threshold: Option<f64>,
    #[serde(default = "default_true")]
    pub write_transform: bool,
}

impl RunConfig {
    /// Read, parse and validate the config at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: RunConfig = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.categories.is_empty() {
            return Err(InvalidConfig::new("categories", "must list at least one category"));
        }
        for category in &self.categories {
            if category.is_empty() || category.contains(['/', '\\']) || category == ".." {
                return Err(InvalidConfig::new(
                    "categories",
                    format!("`{category}` is not a plain directory name"),
                ));
            }
        }
        self.surface.validate()?;
        self.query.validate()?;
        if self.workers == 0 {
            return Err(InvalidConfig::new("workers", "must be at least 1"));
        }
        if let Some(threshold) = self.ibs_threshold {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(InvalidConfig::new("ibs_threshold", "must be finite and positive"));
            }
        }
        self.filename_pattern()?;
        Ok(())
    }

    pub fn filename_pattern(&self) -> Result<FilenamePattern, InvalidConfig> {
        FilenamePattern::new(
            self.mesh_filename_pattern
                .as_deref()
                .unwrap_or(FilenamePattern::DEFAULT),
        )
    }

    pub fn category_dir(&self, category: &str) -> PathBuf {
        self.mesh_dir.join(category)
    }

    /// Scene-level settings for a run with the given seed.
    pub fn pipeline_config(&self, seed: u64) -> PipelineConfig {
        PipelineConfig {
            surface: self.surface.clone(),
            query: self.query.clone(),
            region_dir: self.region_dir.clone(),
            layout: OutputLayout::new(&self.pcd_dir, &self.sdf_dir),
            seed,
            ibs_threshold: self.ibs_threshold,
            write_summary: self.write_transform,
        }
    }
}
