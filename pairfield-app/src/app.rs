//! Batch run setup with builder pattern.

use crate::config::{ConfigError, RunConfig};
use pairfield_prep::{
    BatchReport, ClaimStore, InMemoryClaimStore, MarkerClaimStore, PairResolver, ScenePipeline,
    list_mesh_files, run_batch,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// Logging configuration.
pub struct LoggingConfig {
    pub level: String,
    pub enable_tracy: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            enable_tracy: false,
        }
    }
}

/// Builder for configuring and running a preparation batch.
pub struct AppBuilder {
    config_path: PathBuf,
    seed: Option<u64>,
    workers: Option<usize>,
    logging: Option<LoggingConfig>,
}

impl AppBuilder {
    /// Create a new AppBuilder reading `config/pairfield.json`.
    pub fn new() -> Self {
        Self {
            config_path: PathBuf::from("config/pairfield.json"),
            seed: None,
            workers: None,
            logging: Some(LoggingConfig::default()),
        }
    }

    /// Set the JSON config path.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Override the config's seed.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed.or(self.seed);
        self
    }

    /// Override the config's worker count.
    pub fn with_workers(mut self, workers: Option<usize>) -> Self {
        self.workers = workers.or(self.workers);
        self
    }

    /// Configure logging.
    pub fn with_logging(mut self, config: LoggingConfig) -> Self {
        self.logging = Some(config);
        self
    }

    /// Leave the global subscriber alone (for embedding and tests).
    pub fn without_logging(mut self) -> Self {
        self.logging = None;
        self
    }

    /// Load the configuration and process every category.
    ///
    /// Only configuration problems are errors; scene failures end up in the
    /// returned report.
    pub fn run(self) -> Result<BatchReport, ConfigError> {
        if let Some(logging) = &self.logging {
            init_logging(logging);
        }

        let mut config = RunConfig::load(&self.config_path)?;
        if let Some(workers) = self.workers {
            if workers == 0 {
                return Err(pairfield_prep::InvalidConfig::new("workers", "must be at least 1").into());
            }
            config.workers = workers;
        }
        let seed = match self.seed.or(config.seed) {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>();
                info!(seed, "No seed configured, drew one");
                seed
            }
        };
        info!(
            config = %self.config_path.display(),
            seed,
            workers = config.workers,
            categories = config.categories.len(),
            "Starting batch"
        );

        let resolver = PairResolver::new(config.filename_pattern()?);
        let pipeline = ScenePipeline::new(config.pipeline_config(seed));
        let claims: Box<dyn ClaimStore> = match &config.claim_dir {
            Some(dir) => Box::new(MarkerClaimStore::new(dir)),
            None => Box::new(InMemoryClaimStore::new()),
        };

        let mut report = BatchReport::default();
        for category in &config.categories {
            let dir = config.category_dir(category);
            let files = match list_mesh_files(&dir) {
                Ok(files) => files,
                Err(e) => {
                    warn!(category = %category, dir = %dir.display(), "Skipping category: {}", e);
                    continue;
                }
            };
            let scenes = resolver.resolve(category, &dir, files);
            info!(category = %category, scenes = scenes.scene_count(), "Processing category");
            report.merge(run_batch(&pipeline, claims.as_ref(), scenes, config.workers));
        }

        info!(
            written = report.written.len(),
            failed = report.failed.len(),
            already_claimed = report.already_claimed.len(),
            "Batch finished"
        );
        for failure in &report.failed {
            warn!(scene = %failure.scene, kind = failure.kind, "Failed scene");
        }
        Ok(report)
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn init_logging(logging: &LoggingConfig) {
    #[cfg(feature = "tracy")]
    {
        if logging.enable_tracy {
            use tracing_subscriber::Layer;
            use tracing_subscriber::layer::SubscriberExt;
            use tracing_subscriber::util::SubscriberInitExt;
            let _ = tracing_subscriber::registry()
                .with(tracing_tracy::TracyLayer::default())
                .with(
                    tracing_subscriber::fmt::layer().with_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env()
                            .unwrap_or_else(|_| logging.level.clone().into()),
                    ),
                )
                .try_init();
            return;
        }
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level)),
        )
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use ndarray_npy::NpzReader;
    use pairfield_data::load_points_from_ply;
    use std::fs;
    use std::path::Path;

    /// Cube as OFF text, minimum corner at `(x, 0, 0)`, quad faces.
    fn cube_off(x: f64) -> String {
        let mut text = String::from("OFF\n8 6 0\n");
        for k in 0..2 {
            for j in 0..2 {
                for i in 0..2 {
                    text.push_str(&format!("{} {} {}\n", x + i as f64, j, k));
                }
            }
        }
        for face in [
            [0, 2, 3, 1],
            [4, 5, 7, 6],
            [0, 1, 5, 4],
            [2, 6, 7, 3],
            [0, 4, 6, 2],
            [1, 3, 7, 5],
        ] {
            text.push_str(&format!("4 {} {} {} {}\n", face[0], face[1], face[2], face[3]));
        }
        text
    }

    fn write_config(root: &Path, extra: &str) -> PathBuf {
        let config = format!(
            r#"{{
                "mesh_dir": "{root}/mesh",
                "region_dir": "{root}/region",
                "pcd_dir": "{root}/pcd",
                "sdf_dir": "{root}/sdf",
                "categories": ["mug", "absent"],
                "surface": {{ "points": 128 }},
                "query": {{
                    "points": 200,
                    "distribution": "normal",
                    "regions": {{
                        "object1": {{ "proportion": 0.4, "scale": 1.0 }},
                        "object2": {{ "proportion": 0.4, "scale": 1.0 }},
                        "interaction": {{ "proportion": 0.3, "scale": 1.0, "distribution": "uniform" }}
                    }}
                }}{extra}
            }}"#,
            root = root.display()
        );
        let path = root.join("pairfield.json");
        fs::write(&path, config).unwrap();
        path
    }

    fn write_dataset(root: &Path) {
        let mesh = root.join("mesh/mug");
        let region = root.join("region/mug");
        fs::create_dir_all(&mesh).unwrap();
        fs::create_dir_all(&region).unwrap();
        fs::write(mesh.join("pair_0.off"), cube_off(0.0)).unwrap();
        fs::write(mesh.join("pair_1.off"), cube_off(1.5)).unwrap();
        fs::write(mesh.join("lonely_0.off"), cube_off(0.0)).unwrap();
        fs::write(mesh.join("notes.txt"), "not a mesh").unwrap();
        fs::write(region.join("pair.txt"), "0.9 0 0\n1.6 1 1\n").unwrap();
    }

    #[test]
    fn test_run_end_to_end() {
        let root = tempfile::tempdir().unwrap();
        write_dataset(root.path());
        let config = write_config(root.path(), r#", "seed": 3, "ibs_threshold": 0.05"#);

        let report = AppBuilder::new()
            .without_logging()
            .with_config_path(&config)
            .run()
            .unwrap();

        assert_eq!(report.written.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].scene, "mug/lonely");
        assert_eq!(report.failed[0].kind, "MissingPairedMeshError");

        let sdf = root.path().join("sdf/mug");
        let mut npz = NpzReader::new(fs::File::open(sdf.join("pair.npz")).unwrap()).unwrap();
        let data: Array2<f64> = npz.by_name("data").unwrap();
        assert_eq!(data.shape(), &[220, 5]);
        assert!(sdf.join("pair_transform.json").is_file());
        assert!(sdf.join("pair_ibs.ply").is_file());

        let cloud = load_points_from_ply(root.path().join("pcd/mug/pair_1.ply")).unwrap();
        assert_eq!(cloud.len(), 128);
    }

    #[test]
    fn test_rerun_overwrites_identically() {
        let root = tempfile::tempdir().unwrap();
        write_dataset(root.path());
        let config = write_config(root.path(), r#", "seed": 11"#);
        let cloud = root.path().join("pcd/mug/pair_0.ply");

        AppBuilder::new().without_logging().with_config_path(&config).run().unwrap();
        let first = fs::read(&cloud).unwrap();
        AppBuilder::new().without_logging().with_config_path(&config).run().unwrap();
        assert_eq!(fs::read(&cloud).unwrap(), first);

        let entries: Vec<_> = fs::read_dir(root.path().join("pcd/mug")).unwrap().collect();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_marker_claims_skip_second_run() {
        let root = tempfile::tempdir().unwrap();
        write_dataset(root.path());
        let extra = format!(r#", "claim_dir": "{}/claims""#, root.path().display());
        let config = write_config(root.path(), &extra);

        let first = AppBuilder::new().without_logging().with_config_path(&config).run().unwrap();
        assert_eq!(first.written.len(), 1);
        let second = AppBuilder::new()
            .without_logging()
            .with_config_path(&config)
            .with_workers(Some(2))
            .run()
            .unwrap();
        assert!(second.written.is_empty());
        assert_eq!(second.already_claimed.len(), 1);
    }

    #[test]
    fn test_config_errors_are_fatal() {
        let root = tempfile::tempdir().unwrap();
        let result = AppBuilder::new()
            .without_logging()
            .with_config_path(root.path().join("nope.json"))
            .run();
        assert!(matches!(result, Err(ConfigError::Io { .. })));

        let config = write_config(root.path(), "");
        let result = AppBuilder::new()
            .without_logging()
            .with_config_path(&config)
            .with_workers(Some(0))
            .run();
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }
}
