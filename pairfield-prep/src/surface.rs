//! Surface sampling and mesh access.
//!
//! Both are collaborator interfaces: the pipeline only needs "give me the
//! mesh behind this path" and "give me `count` points on this mesh". The
//! implementations here cover real files; tests plug in synthetic ones.

use crate::config::{SurfaceConfig, SurfaceMethod};
use glam::DVec3;
use pairfield_data::{MeshError, TriangleMesh, load_mesh};
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::{Rng, RngCore};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Errors from surface samplers.
#[derive(Debug, Error)]
pub enum SampleError {
    #[error("mesh has no triangles")]
    NoTriangles,

    #[error("mesh surface area is zero")]
    ZeroArea,
}

/// Produces points approximately uniformly distributed on a mesh surface.
pub trait SurfaceSampler: Send + Sync {
    fn sample(
        &self,
        mesh: &TriangleMesh,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<DVec3>, SampleError>;
}

/// Loads the mesh behind a path.
pub trait MeshSource: Send + Sync {
    fn load(&self, path: &Path) -> Result<TriangleMesh, MeshError>;
}

/// Reads meshes from disk by extension (OFF or PLY).
#[derive(Debug, Clone, Copy, Default)]
pub struct FileMeshSource;

impl MeshSource for FileMeshSource {
    fn load(&self, path: &Path) -> Result<TriangleMesh, MeshError> {
        load_mesh(path)
    }
}

/// Area-weighted sampler: pick a triangle with probability proportional to
/// its area, then a uniform point inside it.
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformSurfaceSampler;

impl UniformSurfaceSampler {
    fn triangle_weights(mesh: &TriangleMesh) -> Result<WeightedIndex<f64>, SampleError> {
        if mesh.triangles.is_empty() {
            return Err(SampleError::NoTriangles);
        }
        let areas = (0..mesh.triangles.len()).map(|i| {
            let area = mesh.triangle(i).map_or(0.0, |t| t.area());
            if area.is_finite() { area } else { 0.0 }
        });
        WeightedIndex::new(areas).map_err(|_| SampleError::ZeroArea)
    }
}

impl SurfaceSampler for UniformSurfaceSampler {
    fn sample(
        &self,
        mesh: &TriangleMesh,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<DVec3>, SampleError> {
        let weights = Self::triangle_weights(mesh)?;
        let mut points = Vec::with_capacity(count);
        while points.len() < count {
            let Some(tri) = mesh.triangle(weights.sample(rng)) else {
                continue;
            };
            let u = rng.random::<f64>();
            let v = rng.random::<f64>();
            points.push(tri.point_from_unit(u, v));
        }
        Ok(points)
    }
}

/// Even-spacing sampler: draw `init_factor * count` uniform candidates, then
/// greedily keep the candidate farthest from everything kept so far.
#[derive(Debug, Clone, Copy)]
pub struct EvenSurfaceSampler {
    pub init_factor: usize,
}

impl SurfaceSampler for EvenSurfaceSampler {
    fn sample(
        &self,
        mesh: &TriangleMesh,
        count: usize,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<DVec3>, SampleError> {
        let candidates =
            UniformSurfaceSampler.sample(mesh, count * self.init_factor.max(1), rng)?;
        let selected = farthest_point_subset(&candidates, count);
        debug!(
            "Kept {} of {} surface candidates",
            selected.len(),
            candidates.len()
        );
        Ok(selected)
    }
}

/// Greedy farthest-point selection, starting from the first candidate.
pub fn farthest_point_subset(candidates: &[DVec3], count: usize) -> Vec<DVec3> {
    if count >= candidates.len() {
        return candidates.to_vec();
    }
    let mut selected = Vec::with_capacity(count);
    let mut min_dist2 = vec![f64::INFINITY; candidates.len()];
    let mut next = 0;
    while selected.len() < count {
        let chosen = candidates[next];
        selected.push(chosen);
        let mut best = (f64::NEG_INFINITY, next);
        for (i, c) in candidates.iter().enumerate() {
            let d2 = c.distance_squared(chosen);
            if d2 < min_dist2[i] {
                min_dist2[i] = d2;
            }
            if min_dist2[i] > best.0 {
                best = (min_dist2[i], i);
            }
        }
        next = best.1;
    }
    selected
}

/// Sampler selected by the surface configuration.
pub fn sampler_for(config: &SurfaceConfig) -> Box<dyn SurfaceSampler> {
    match config.method {
        SurfaceMethod::Uniform => Box::new(UniformSurfaceSampler),
        SurfaceMethod::Even => Box::new(EvenSurfaceSampler {
            init_factor: config.init_factor,
        }),
    }
}
