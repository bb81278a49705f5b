//! Pairfield Prep Crate
//!
//! Turns two interacting meshes and a ground-truth interaction box into
//! training data for paired unsigned distance fields: jointly normalized
//! surface point clouds plus stratified query points labeled with their
//! distance to each surface.
//!
//! ## Modules
//!
//! - [`resolve`]: Grouping mesh files into scenes and claiming them
//! - [`surface`]: Mesh access and surface sampling collaborators
//! - [`normalize`]: Shared centroid/scale transform for both objects
//! - [`regions`]: Stratified query sampling over object and interaction boxes
//! - [`distance`]: k-d tree and distance-field evaluation
//! - [`persist`]: Output layout and atomic artifact writes
//! - [`pipeline`]: Per-scene driver and batch runner

pub mod config;
pub mod distance;
pub mod error;
pub mod normalize;
pub mod persist;
pub mod pipeline;
pub mod regions;
pub mod resolve;
pub mod surface;

#[cfg(test)]
mod test_support;

pub use config::{Distribution, QueryConfig, RegionConfig, RegionsConfig, SurfaceConfig, SurfaceMethod};
pub use distance::{SurfaceIndex, evaluate_distance_field};
pub use error::{DegenerateGeometry, InvalidConfig, PersistError, SceneError};
pub use normalize::NormalizationTransform;
pub use persist::OutputLayout;
pub use pipeline::{BatchReport, PipelineConfig, SceneFailure, ScenePipeline, run_batch};
pub use regions::{Region, RegionCounts, RegionSpec, sample_regions};
pub use resolve::{
    ClaimStore, FilenamePattern, InMemoryClaimStore, MarkerClaimStore, PairResolver, SceneEntry,
    SceneKey, list_mesh_files,
};
pub use surface::{MeshSource, SurfaceSampler, sampler_for};
