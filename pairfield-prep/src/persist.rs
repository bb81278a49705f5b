//! On-disk artifact layout and all-or-nothing writes.
//!
//! Every artifact is written to a temporary file next to its destination and
//! renamed over it, so an existing file is either fully replaced or left
//! untouched. Directories are created on demand and may already exist.

use crate::error::PersistError;
use crate::resolve::SceneKey;
use glam::DVec3;
use ndarray::Array2;
use ndarray_npy::NpzWriter;
use pairfield_data::{DistanceRecord, write_points_ply};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the array inside a distance-field `.npz`.
pub const DISTANCE_FIELD_ARRAY: &str = "data";

/// Where a scene's artifacts live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub pcd_dir: PathBuf,
    pub sdf_dir: PathBuf,
}

impl OutputLayout {
    pub fn new(pcd_dir: impl Into<PathBuf>, sdf_dir: impl Into<PathBuf>) -> Self {
        Self {
            pcd_dir: pcd_dir.into(),
            sdf_dir: sdf_dir.into(),
        }
    }

    /// `{pcd_dir}/{category}/{scene}_{object}.ply`
    pub fn point_cloud_path(&self, key: &SceneKey, object: usize) -> PathBuf {
        self.pcd_dir
            .join(&key.category)
            .join(format!("{}_{}.ply", key.scene, object))
    }

    /// `{sdf_dir}/{category}/{scene}.npz`
    pub fn distance_field_path(&self, key: &SceneKey) -> PathBuf {
        self.sdf_dir
            .join(&key.category)
            .join(format!("{}.npz", key.scene))
    }

    /// `{sdf_dir}/{category}/{scene}_transform.json`
    pub fn summary_path(&self, key: &SceneKey) -> PathBuf {
        self.sdf_dir
            .join(&key.category)
            .join(format!("{}_transform.json", key.scene))
    }

    /// `{sdf_dir}/{category}/{scene}_ibs.ply`
    pub fn ibs_path(&self, key: &SceneKey) -> PathBuf {
        self.sdf_dir
            .join(&key.category)
            .join(format!("{}_ibs.ply", key.scene))
    }
}

/// Write `points` as a PLY point cloud, replacing any existing file.
pub fn write_point_cloud(path: &Path, points: &[DVec3]) -> Result<(), PersistError> {
    write_atomic(path, |file| {
        write_points_ply(BufWriter::new(file), points).map_err(|source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        })
    })?;
    debug!(path = %path.display(), points = points.len(), "Wrote point cloud");
    Ok(())
}

/// Write `records` as an `(M, 5)` float64 array named `data` in an `.npz`,
/// replacing any existing file. Columns are x, y, z, d1, d2.
pub fn write_distance_field(path: &Path, records: &[DistanceRecord]) -> Result<(), PersistError> {
    let encode = |reason: String| PersistError::Encode {
        path: path.to_path_buf(),
        reason,
    };
    let flat: Vec<f64> = records.iter().flat_map(DistanceRecord::to_row).collect();
    let array = Array2::from_shape_vec((records.len(), 5), flat).map_err(|e| encode(e.to_string()))?;

    write_atomic(path, |file| {
        let mut npz = NpzWriter::new(file);
        npz.add_array(DISTANCE_FIELD_ARRAY, &array)
            .map_err(|e| encode(e.to_string()))?;
        npz.finish().map_err(|e| encode(e.to_string()))?;
        Ok(())
    })?;
    debug!(path = %path.display(), rows = records.len(), "Wrote distance field");
    Ok(())
}

/// Write `value` as pretty-printed JSON, replacing any existing file.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    write_atomic(path, |file| {
        let mut w = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut w, value).map_err(|e| PersistError::Encode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        writeln!(w)
            .and_then(|_| w.flush())
            .map_err(|source| PersistError::Io {
                path: path.to_path_buf(),
                source,
            })
    })
}

/// Run `write` against a temporary file in the destination directory, then
/// rename it over `path`. On any error the temporary file is removed and
/// `path` is left as it was.
fn write_atomic<F>(path: &Path, write: F) -> Result<(), PersistError>
where
    F: FnOnce(&mut File) -> Result<(), PersistError>,
{
    let io_err = |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(io_err)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".pairfield-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .map_err(io_err)?;
    write(tmp.as_file_mut())?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray_npy::NpzReader;
    use pairfield_data::load_points_from_ply;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        names
    }

    fn read_field(path: &Path) -> Array2<f64> {
        let mut npz = NpzReader::new(File::open(path).unwrap()).unwrap();
        npz.by_name(DISTANCE_FIELD_ARRAY).unwrap()
    }

    #[test]
    fn test_layout_paths() {
        let layout = OutputLayout::new("/out/pcd", "/out/sdf");
        let key = SceneKey::new("mug", "scene_7");
        assert_eq!(layout.point_cloud_path(&key, 1), PathBuf::from("/out/pcd/mug/scene_7_1.ply"));
        assert_eq!(layout.distance_field_path(&key), PathBuf::from("/out/sdf/mug/scene_7.npz"));
        assert_eq!(
            layout.summary_path(&key),
            PathBuf::from("/out/sdf/mug/scene_7_transform.json")
        );
        assert_eq!(layout.ibs_path(&key), PathBuf::from("/out/sdf/mug/scene_7_ibs.ply"));
    }

    #[test]
    fn test_point_cloud_creates_dirs_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/cloud.ply");
        let points = vec![DVec3::new(0.1, -0.2, 0.3), DVec3::new(1.0, 0.0, -1.0)];
        write_point_cloud(&path, &points).unwrap();
        assert_eq!(load_points_from_ply(&path).unwrap(), points);
    }

    #[test]
    fn test_point_cloud_overwrite_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.ply");
        write_point_cloud(&path, &[DVec3::ONE; 10]).unwrap();
        let points = vec![DVec3::X, DVec3::Y];
        write_point_cloud(&path, &points).unwrap();
        let first = fs::read(&path).unwrap();
        write_point_cloud(&path, &points).unwrap();
        assert_eq!(fs::read(&path).unwrap(), first);
        assert_eq!(dir_entries(dir.path()), vec!["cloud.ply"]);
        assert_eq!(load_points_from_ply(&path).unwrap(), points);
    }

    #[test]
    fn test_distance_field_shape_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mug/s.npz");
        let records = vec![
            DistanceRecord::new(DVec3::new(1.0, 2.0, 3.0), 0.5, 0.25),
            DistanceRecord::new(DVec3::new(-1.0, 0.0, 0.5), 0.0, 2.0),
        ];
        write_distance_field(&path, &records).unwrap();
        let data = read_field(&path);
        assert_eq!(data.shape(), &[2, 5]);
        assert_eq!(data.row(0).to_vec(), vec![1.0, 2.0, 3.0, 0.5, 0.25]);
        assert_eq!(data.row(1).to_vec(), vec![-1.0, 0.0, 0.5, 0.0, 2.0]);
    }

    #[test]
    fn test_distance_field_overwrite_leaves_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.npz");
        let record = DistanceRecord::new(DVec3::ZERO, 1.0, 1.0);
        write_distance_field(&path, &vec![record; 8]).unwrap();
        write_distance_field(&path, &[record]).unwrap();
        assert_eq!(dir_entries(dir.path()), vec!["s.npz"]);
        assert_eq!(read_field(&path).nrows(), 1);
    }

    #[test]
    fn test_empty_distance_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.npz");
        write_distance_field(&path, &[]).unwrap();
        assert_eq!(read_field(&path).shape(), &[0, 5]);
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keep.json");
        write_json(&path, &serde_json::json!({ "v": 1 })).unwrap();
        let before = fs::read(&path).unwrap();

        let result = write_atomic(&path, |_| {
            Err(PersistError::Encode {
                path: path.clone(),
                reason: "boom".into(),
            })
        });
        assert!(result.is_err());
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(dir_entries(dir.path()), vec!["keep.json"]);
    }

    #[test]
    fn test_write_json_pretty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.json");
        write_json(&path, &serde_json::json!({ "scale": 2.0 })).unwrap();
        let back: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(back["scale"], 2.0);
    }
}
