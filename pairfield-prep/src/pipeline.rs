//! Per-scene preparation and the batch runner.
//!
//! One scene goes: region file, meshes, surface samples, joint transform,
//! boxes from the original meshes, stratified queries in original space,
//! normalized queries, distances, artifacts. Nothing is written until every
//! computation for the scene has succeeded.

use crate::config::{QueryConfig, SurfaceConfig};
use crate::distance::evaluate_distance_field;
use crate::error::{DegenerateGeometry, SceneError};
use crate::normalize::NormalizationTransform;
use crate::persist::{OutputLayout, write_distance_field, write_json, write_point_cloud};
use crate::regions::{RegionCounts, RegionSpec, sample_regions};
use crate::resolve::{ClaimStore, SceneEntry, SceneKey};
use crate::surface::{FileMeshSource, MeshSource, SurfaceSampler, sampler_for};
use glam::DVec3;
use pairfield_data::{Aabb, DistanceRecord, TriangleMesh};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// Validated inputs shared by every scene of a run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub surface: SurfaceConfig,
    pub query: QueryConfig,
    /// Interaction-region files live at `{region_dir}/{category}/{scene}.txt`.
    pub region_dir: PathBuf,
    pub layout: OutputLayout,
    /// Run seed; each scene derives its own from this and its key.
    pub seed: u64,
    /// Export query points with `|d1 - d2|` below this as the interaction
    /// surface.
    pub ibs_threshold: Option<f64>,
    /// Write the `_transform.json` summary next to the distance field.
    pub write_summary: bool,
}

/// Everything computed for one scene, in the normalized frame.
#[derive(Debug, Clone)]
pub struct SceneArtifacts {
    pub surfaces: [Vec<DVec3>; 2],
    pub records: Vec<DistanceRecord>,
    pub transform: NormalizationTransform,
    pub counts: RegionCounts,
    pub seed: u64,
}

impl SceneArtifacts {
    /// Query points lying between the two surfaces, within `threshold`.
    pub fn interaction_surface(&self, threshold: f64) -> Vec<DVec3> {
        self.records
            .iter()
            .filter(|r| (r.d1 - r.d2).abs() < threshold)
            .map(|r| r.position)
            .collect()
    }
}

/// Sidecar written next to a scene's distance field.
#[derive(Debug, Serialize)]
struct SceneSummary<'a> {
    category: &'a str,
    scene: &'a str,
    seed: u64,
    transform: NormalizationTransform,
    surface_points: [usize; 2],
    region_counts: RegionCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    ibs_points: Option<usize>,
}

/// Outcome of a successfully written scene.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneReport {
    pub key: SceneKey,
    pub counts: RegionCounts,
    pub ibs_points: Option<usize>,
}

/// Scene preparation with pluggable mesh access and surface sampling.
pub struct ScenePipeline {
    config: PipelineConfig,
    sampler: Box<dyn SurfaceSampler>,
    meshes: Box<dyn MeshSource>,
}

impl ScenePipeline {
    /// Pipeline reading meshes from disk with the configured sampler.
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            sampler: sampler_for(&config.surface),
            meshes: Box::new(FileMeshSource),
            config,
        }
    }

    pub fn with_sampler(mut self, sampler: impl SurfaceSampler + 'static) -> Self {
        self.sampler = Box::new(sampler);
        self
    }

    pub fn with_mesh_source(mut self, meshes: impl MeshSource + 'static) -> Self {
        self.meshes = Box::new(meshes);
        self
    }

    pub fn region_path(&self, key: &SceneKey) -> PathBuf {
        self.config
            .region_dir
            .join(&key.category)
            .join(format!("{}.txt", key.scene))
    }

    /// Compute a scene's artifacts without touching the output directories.
    pub fn prepare(&self, entry: &SceneEntry) -> Result<SceneArtifacts, SceneError> {
        let key = &entry.key;
        let interaction = Aabb::from_region_file(self.region_path(key))?;

        let mesh1 = self.meshes.load(&entry.meshes[0])?;
        let mesh2 = self.meshes.load(&entry.meshes[1])?;

        let seed = scene_seed(self.config.seed, key);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let count = self.config.surface.points;
        let raw1 = self
            .sampler
            .sample(&mesh1, count, &mut rng)
            .map_err(|source| SceneError::SurfaceSample { object: 0, source })?;
        let raw2 = self
            .sampler
            .sample(&mesh2, count, &mut rng)
            .map_err(|source| SceneError::SurfaceSample { object: 1, source })?;

        let transform = NormalizationTransform::compute(&raw1, &raw2)?;
        debug!(
            centroid = ?transform.centroid,
            scale = transform.scale,
            "Computed joint normalization"
        );
        let surfaces = [transform.apply(&raw1), transform.apply(&raw2)];

        let specs = RegionSpec::from_config(
            &self.config.query,
            mesh_bounds(&mesh1, 0)?,
            mesh_bounds(&mesh2, 1)?,
            interaction,
        )?;
        let samples = sample_regions(&specs, self.config.query.points, &mut rng);
        let queries = transform.apply(&samples.points);
        let records = evaluate_distance_field(&queries, &surfaces[0], &surfaces[1]);

        Ok(SceneArtifacts {
            surfaces,
            records,
            transform,
            counts: samples.counts,
            seed,
        })
    }

    /// Write all artifacts of a prepared scene.
    pub fn write(&self, key: &SceneKey, artifacts: &SceneArtifacts) -> Result<SceneReport, SceneError> {
        let layout = &self.config.layout;
        for (object, surface) in artifacts.surfaces.iter().enumerate() {
            write_point_cloud(&layout.point_cloud_path(key, object), surface)?;
        }
        write_distance_field(&layout.distance_field_path(key), &artifacts.records)?;

        let ibs_points = match self.config.ibs_threshold {
            Some(threshold) => {
                let points = artifacts.interaction_surface(threshold);
                write_point_cloud(&layout.ibs_path(key), &points)?;
                Some(points.len())
            }
            None => None,
        };

        if self.config.write_summary {
            let summary = SceneSummary {
                category: &key.category,
                scene: &key.scene,
                seed: artifacts.seed,
                transform: artifacts.transform,
                surface_points: [artifacts.surfaces[0].len(), artifacts.surfaces[1].len()],
                region_counts: artifacts.counts,
                ibs_points,
            };
            write_json(&layout.summary_path(key), &summary)?;
        }

        Ok(SceneReport {
            key: key.clone(),
            counts: artifacts.counts,
            ibs_points,
        })
    }

    /// Prepare and write one scene.
    #[instrument(skip_all, fields(category = %entry.key.category, scene = %entry.key.scene))]
    pub fn process(&self, entry: &SceneEntry) -> Result<SceneReport, SceneError> {
        let artifacts = self.prepare(entry)?;
        let report = self.write(&entry.key, &artifacts)?;
        info!(
            records = artifacts.records.len(),
            object1 = report.counts.object1,
            object2 = report.counts.object2,
            interaction = report.counts.interaction,
            "Scene written"
        );
        Ok(report)
    }
}

fn mesh_bounds(mesh: &TriangleMesh, object: usize) -> Result<Aabb, DegenerateGeometry> {
    Aabb::from_mesh(mesh).ok_or_else(|| DegenerateGeometry(format!("mesh {object} has no vertices")))
}

/// Per-scene RNG seed: the run seed mixed with a 64-bit FNV-1a hash of the
/// scene key, independent of processing order.
pub fn scene_seed(run_seed: u64, key: &SceneKey) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    run_seed
        .to_le_bytes()
        .iter()
        .chain(key.category.as_bytes())
        .chain(b"/")
        .chain(key.scene.as_bytes())
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

/// A scene that could not be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneFailure {
    /// `category/scene`.
    pub scene: String,
    pub kind: &'static str,
    pub message: String,
}

/// Summary of a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub written: Vec<SceneReport>,
    pub failed: Vec<SceneFailure>,
    pub already_claimed: Vec<SceneKey>,
}

impl BatchReport {
    pub fn merge(&mut self, other: BatchReport) {
        self.written.extend(other.written);
        self.failed.extend(other.failed);
        self.already_claimed.extend(other.already_claimed);
    }

    fn record(&mut self, outcome: SceneOutcome) {
        match outcome {
            SceneOutcome::Written(report) => self.written.push(report),
            SceneOutcome::Failed(failure) => self.failed.push(failure),
            SceneOutcome::AlreadyClaimed(key) => self.already_claimed.push(key),
        }
    }
}

enum SceneOutcome {
    Written(SceneReport),
    Failed(SceneFailure),
    AlreadyClaimed(SceneKey),
}

/// Claim and process every scene in `scenes`. Failures are logged and
/// collected; they never stop the batch.
///
/// With `workers > 1` scenes run on a dedicated rayon pool of that size.
pub fn run_batch<I>(
    pipeline: &ScenePipeline,
    claims: &dyn ClaimStore,
    scenes: I,
    workers: usize,
) -> BatchReport
where
    I: IntoIterator<Item = Result<SceneEntry, SceneError>>,
{
    let mut report = BatchReport::default();
    if workers <= 1 {
        for item in scenes {
            report.record(run_scene(pipeline, claims, item));
        }
        return report;
    }

    let items: Vec<_> = scenes.into_iter().collect();
    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => {
            let outcomes: Vec<SceneOutcome> = pool.install(|| {
                items
                    .into_par_iter()
                    .map(|item| run_scene(pipeline, claims, item))
                    .collect()
            });
            for outcome in outcomes {
                report.record(outcome);
            }
        }
        Err(e) => {
            warn!("Failed to build worker pool, running sequentially: {}", e);
            for item in items {
                report.record(run_scene(pipeline, claims, item));
            }
        }
    }
    report
}

fn run_scene(
    pipeline: &ScenePipeline,
    claims: &dyn ClaimStore,
    item: Result<SceneEntry, SceneError>,
) -> SceneOutcome {
    let entry = match item {
        Ok(entry) => entry,
        Err(err) => {
            let scene = match &err {
                SceneError::MissingPairedMesh { key, .. } => key.to_string(),
                _ => String::from("?"),
            };
            return failed(scene, err);
        }
    };

    match claims.claim(&entry.key) {
        Ok(true) => {}
        Ok(false) => {
            debug!(scene = %entry.key, "Scene already claimed, skipping");
            return SceneOutcome::AlreadyClaimed(entry.key);
        }
        Err(source) => {
            let scene = entry.key.to_string();
            return failed(
                scene,
                SceneError::Claim {
                    key: entry.key,
                    source,
                },
            );
        }
    }

    match pipeline.process(&entry) {
        Ok(report) => SceneOutcome::Written(report),
        Err(err) => failed(entry.key.to_string(), err),
    }
}

fn failed(scene: String, err: SceneError) -> SceneOutcome {
    warn!(scene = %scene, kind = err.kind(), "Scene failed: {}", err);
    SceneOutcome::Failed(SceneFailure {
        scene,
        kind: err.kind(),
        message: err.to_string(),
    })
}
