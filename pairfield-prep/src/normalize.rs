//! Joint normalization of the two objects of a scene.
//!
//! Both surface clouds, and every query point derived from the scene, go
//! through the same transform so distances stay comparable across samples.

use crate::error::DegenerateGeometry;
use glam::DVec3;
use serde::Serialize;

/// `p' = (p - centroid) / scale`, shared by everything in one scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizationTransform {
    pub centroid: [f64; 3],
    pub scale: f64,
}

impl NormalizationTransform {
    /// Centroid of the concatenated point sets and the largest distance from
    /// it, so the normalized union fits the unit sphere.
    pub fn compute(a: &[DVec3], b: &[DVec3]) -> Result<Self, DegenerateGeometry> {
        let n = a.len() + b.len();
        if n == 0 {
            return Err(DegenerateGeometry("no surface points to normalize".into()));
        }
        let sum: DVec3 = a.iter().chain(b).copied().sum();
        let centroid = sum / n as f64;
        let scale = a
            .iter()
            .chain(b)
            .map(|p| (*p - centroid).length())
            .fold(0.0, f64::max);
        if !scale.is_finite() || scale <= 0.0 {
            return Err(DegenerateGeometry(format!(
                "normalization scale is {scale} over {n} points"
            )));
        }
        Ok(Self {
            centroid: centroid.to_array(),
            scale,
        })
    }

    pub fn centroid(&self) -> DVec3 {
        DVec3::from_array(self.centroid)
    }

    pub fn apply_point(&self, p: DVec3) -> DVec3 {
        (p - self.centroid()) / self.scale
    }

    pub fn apply(&self, points: &[DVec3]) -> Vec<DVec3> {
        let centroid = self.centroid();
        points.iter().map(|p| (*p - centroid) / self.scale).collect()
    }

    /// Map a normalized point back to original mesh coordinates.
    pub fn invert_point(&self, p: DVec3) -> DVec3 {
        p * self.scale + self.centroid()
    }
}
