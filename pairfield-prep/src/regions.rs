//! Stratified query-point sampling over three boxes.
//!
//! Each region gets `round(N * proportion)` points, independently of the
//! other regions. Proportions are never renormalized, so the realized total
//! can differ from N; that keeps every region's count a function of its own
//! proportion only.

use crate::config::{Distribution, QueryConfig};
use crate::error::DegenerateGeometry;
use glam::DVec3;
use pairfield_data::Aabb;
use rand::{Rng, RngCore};
use rand_distr::{Distribution as _, StandardNormal};
use serde::Serialize;
use tracing::debug;

/// Sampling regions, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Region {
    Object1,
    Object2,
    Interaction,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::Object1, Region::Object2, Region::Interaction];

    pub fn name(self) -> &'static str {
        match self {
            Region::Object1 => "object1",
            Region::Object2 => "object2",
            Region::Interaction => "interaction",
        }
    }

    fn slot(self) -> usize {
        match self {
            Region::Object1 => 0,
            Region::Object2 => 1,
            Region::Interaction => 2,
        }
    }
}

/// One region ready for sampling: its already-scaled box, its share of N
/// and the per-axis distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionSpec {
    pub region: Region,
    pub aabb: Aabb,
    pub proportion: f64,
    pub distribution: Distribution,
}

impl RegionSpec {
    /// Build the three specs from unscaled boxes, applying each region's
    /// scale factor to its box corners.
    ///
    /// Fails when a scaled box has a non-finite extent on any axis, since no
    /// distribution can be drawn over it.
    pub fn from_config(
        config: &QueryConfig,
        object1: Aabb,
        object2: Aabb,
        interaction: Aabb,
    ) -> Result<[RegionSpec; 3], DegenerateGeometry> {
        let boxes = [object1, object2, interaction];
        let specs = Region::ALL.map(|region| {
            let rc = config.regions.get(region);
            RegionSpec {
                region,
                aabb: boxes[region.slot()].scaled(rc.scale),
                proportion: rc.proportion,
                distribution: config.distribution_for(region),
            }
        });
        for spec in &specs {
            if !spec.aabb.extent().is_finite() {
                return Err(DegenerateGeometry(format!(
                    "{} box {} .. {} has a non-finite extent",
                    spec.region.name(),
                    spec.aabb.min,
                    spec.aabb.max
                )));
            }
        }
        Ok(specs)
    }
}

/// Realized count for one region; non-positive results become zero.
pub fn region_point_count(total: usize, proportion: f64) -> usize {
    let count = (total as f64 * proportion).round();
    if count.is_finite() && count > 0.0 {
        count as usize
    } else {
        0
    }
}

/// Per-region counts as written next to a scene's artifacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegionCounts {
    pub object1: usize,
    pub object2: usize,
    pub interaction: usize,
}

impl RegionCounts {
    pub fn get(&self, region: Region) -> usize {
        match region {
            Region::Object1 => self.object1,
            Region::Object2 => self.object2,
            Region::Interaction => self.interaction,
        }
    }

    fn set(&mut self, region: Region, count: usize) {
        match region {
            Region::Object1 => self.object1 = count,
            Region::Object2 => self.object2 = count,
            Region::Interaction => self.interaction = count,
        }
    }

    pub fn total(&self) -> usize {
        self.object1 + self.object2 + self.interaction
    }
}

/// Concatenated query points, object 1 first, then object 2, then the
/// interaction region.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StratifiedSamples {
    pub points: Vec<DVec3>,
    pub counts: RegionCounts,
}

impl StratifiedSamples {
    /// Points drawn from `region`.
    pub fn region_points(&self, region: Region) -> &[DVec3] {
        let start: usize = Region::ALL
            .iter()
            .take_while(|r| **r != region)
            .map(|r| self.counts.get(*r))
            .sum();
        &self.points[start..start + self.counts.get(region)]
    }
}

/// Draw the stratified query set for `total` target points.
pub fn sample_regions(
    specs: &[RegionSpec],
    total: usize,
    rng: &mut dyn RngCore,
) -> StratifiedSamples {
    let mut samples = StratifiedSamples::default();
    for spec in specs {
        let count = region_point_count(total, spec.proportion);
        let start = samples.points.len();
        samples.points.resize(start + count, DVec3::ZERO);
        let block = &mut samples.points[start..];
        // one axis at a time, each axis drawn independently
        for axis in 0..3 {
            let lo = spec.aabb.min[axis];
            let hi = spec.aabb.max[axis];
            for p in block.iter_mut() {
                p[axis] = draw(spec.distribution, lo, hi, rng);
            }
        }
        samples.counts.set(spec.region, count);
        debug!(
            region = spec.region.name(),
            count,
            proportion = spec.proportion,
            "Sampled region"
        );
    }
    samples
}

fn draw(distribution: Distribution, lo: f64, hi: f64, rng: &mut dyn RngCore) -> f64 {
    match distribution {
        Distribution::Uniform => rng.random_range(lo..=hi),
        Distribution::Normal => {
            let mean = lo + 0.5 * (hi - lo);
            let std_dev = (hi - lo) / 6.0;
            let z: f64 = StandardNormal.sample(rng);
            mean + std_dev * z
        }
    }
}
