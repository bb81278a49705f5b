//! Axis-aligned bounding boxes for meshes and interaction regions.

use crate::error::RegionFileError;
use crate::types::TriangleMesh;
use glam::DVec3;
use std::path::Path;
use tracing::debug;

/// Axis-aligned box in original mesh coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    /// Componentwise bounds of a point set, `None` when empty.
    pub fn from_points(points: &[DVec3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self { min, max })
    }

    /// Bounds of a mesh's vertices, `None` for a mesh without vertices.
    pub fn from_mesh(mesh: &TriangleMesh) -> Option<Self> {
        Self::from_points(&mesh.vertices)
    }

    /// Read an interaction-region file: two lines, each three
    /// whitespace-separated floats, min bound first.
    pub fn from_region_file(path: impl AsRef<Path>) -> Result<Self, RegionFileError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RegionFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let aabb = Self::parse_region(&text).map_err(|reason| RegionFileError::Malformed {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!(path = %path.display(), ?aabb, "Loaded interaction region");
        Ok(aabb)
    }

    /// Parse the textual region format. Blank lines are ignored.
    pub fn parse_region(text: &str) -> Result<Self, String> {
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.len() != 2 {
            return Err(format!("expected 2 bound lines, found {}", lines.len()));
        }
        let min = parse_vec3(lines[0]).map_err(|e| format!("min bound: {e}"))?;
        let max = parse_vec3(lines[1]).map_err(|e| format!("max bound: {e}"))?;
        if min.cmpgt(max).any() {
            return Err(format!("min bound {min} exceeds max bound {max}"));
        }
        Ok(Self { min, max })
    }

    /// Multiply both corners by `factor`.
    ///
    /// Scaling is about the coordinate origin, not the box center, so a box
    /// away from the origin also moves. Dataset compatibility depends on this.
    pub fn scaled(&self, factor: f64) -> Self {
        let a = self.min * factor;
        let b = self.max * factor;
        // a negative factor swaps the corners
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn extent(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn contains(&self, p: DVec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

fn parse_vec3(line: &str) -> Result<DVec3, String> {
    let values = line
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f64>()
                .map_err(|_| format!("'{tok}' is not a number"))
                .and_then(|v| {
                    if v.is_finite() {
                        Ok(v)
                    } else {
                        Err(format!("'{tok}' is not finite"))
                    }
                })
        })
        .collect::<Result<Vec<f64>, String>>()?;
    match values.as_slice() {
        [x, y, z] => Ok(DVec3::new(*x, *y, *z)),
        other => Err(format!("expected 3 values, found {}", other.len())),
    }
}
