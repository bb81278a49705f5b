//! Sampling configuration records.
//!
//! These are deserialized once per run and validated before any scene is
//! touched; the pipeline only ever sees validated, immutable values.

use crate::error::InvalidConfig;
use crate::regions::Region;
use serde::Deserialize;

/// How surface points are drawn from a mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceMethod {
    /// Area-weighted uniform sampling.
    #[default]
    Uniform,
    /// Oversample, then keep a farthest-point subset for even spacing.
    Even,
}

/// Per-axis distribution used inside a sampling box.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    /// Uniform over `[min, max]`.
    #[default]
    Uniform,
    /// Normal centered on the box with `(max - min) / 6` standard deviation.
    Normal,
}

fn default_init_factor() -> usize {
    10
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SurfaceConfig {
    /// Points sampled on each object's surface.
    pub points: usize,
    #[serde(default)]
    pub method: SurfaceMethod,
    /// Oversampling factor for [`SurfaceMethod::Even`].
    #[serde(default = "default_init_factor")]
    pub init_factor: usize,
}

impl SurfaceConfig {
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.points == 0 {
            return Err(InvalidConfig::new("surface.points", "must be positive"));
        }
        if self.init_factor == 0 {
            return Err(InvalidConfig::new("surface.init_factor", "must be at least 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    /// Fraction of `query.points` drawn from this region. Not normalized
    /// against the other regions.
    pub proportion: f64,
    /// Factor applied to both box corners before sampling.
    pub scale: f64,
    /// Overrides `query.distribution` for this region.
    #[serde(default)]
    pub distribution: Option<Distribution>,
}

impl RegionConfig {
    fn validate(&self, name: &str) -> Result<(), InvalidConfig> {
        if !self.proportion.is_finite() {
            return Err(InvalidConfig::new(
                format!("query.regions.{name}.proportion"),
                "must be finite",
            ));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(InvalidConfig::new(
                format!("query.regions.{name}.scale"),
                "must be finite and positive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionsConfig {
    pub object1: RegionConfig,
    pub object2: RegionConfig,
    pub interaction: RegionConfig,
}

impl RegionsConfig {
    pub fn get(&self, region: Region) -> &RegionConfig {
        match region {
            Region::Object1 => &self.object1,
            Region::Object2 => &self.object2,
            Region::Interaction => &self.interaction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Target total N; realized totals follow the per-region rounding.
    pub points: usize,
    pub distribution: Distribution,
    pub regions: RegionsConfig,
}

impl QueryConfig {
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.points == 0 {
            return Err(InvalidConfig::new("query.points", "must be positive"));
        }
        for region in Region::ALL {
            self.regions.get(region).validate(region.name())?;
        }
        Ok(())
    }

    /// Distribution in effect for `region`.
    pub fn distribution_for(&self, region: Region) -> Distribution {
        self.regions
            .get(region)
            .distribution
            .unwrap_or(self.distribution)
    }
}
