//! PLY file loading functions

use crate::error::MeshError;
use crate::mesh::triangulate_polygon;
use crate::types::TriangleMesh;
use glam::DVec3;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

// Face structure for PLY files
#[derive(Deserialize, Debug)]
struct PlyFace {
    #[serde(alias = "vertex_index")]
    vertex_indices: Vec<i64>,
}

// PLY file structure
#[derive(Deserialize, Debug)]
struct PlyFile {
    #[serde(rename = "vertex")]
    vertex: Vec<HashMap<String, JsonValue>>,
    #[serde(default, rename = "face")]
    face: Vec<PlyFace>,
}

fn read_ply_file(path: &Path) -> Result<PlyFile, MeshError> {
    let file = File::open(path).map_err(|source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    serde_ply::from_reader(reader).map_err(|e| {
        warn!("Failed to parse PLY file: {}", e);
        MeshError::parse(path, format!("PLY parsing error: {e}"))
    })
}

fn get_f64(prop: Option<&JsonValue>) -> Option<f64> {
    prop.and_then(|v| match v {
        JsonValue::Number(n) => n.as_f64(),
        _ => None,
    })
}

fn vertex_positions(path: &Path, ply: &PlyFile) -> Result<Vec<DVec3>, MeshError> {
    let mut positions = Vec::with_capacity(ply.vertex.len());
    for (i, vertex) in ply.vertex.iter().enumerate() {
        let x = get_f64(vertex.get("x"))
            .ok_or_else(|| MeshError::parse(path, format!("missing 'x' at vertex {i}")))?;
        let y = get_f64(vertex.get("y"))
            .ok_or_else(|| MeshError::parse(path, format!("missing 'y' at vertex {i}")))?;
        let z = get_f64(vertex.get("z"))
            .ok_or_else(|| MeshError::parse(path, format!("missing 'z' at vertex {i}")))?;
        positions.push(DVec3::new(x, y, z));
    }
    Ok(positions)
}

/// Load a triangle mesh from a PLY file.
///
/// Polygonal faces are fan-triangulated.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_mesh_from_ply(path: impl AsRef<Path>) -> Result<TriangleMesh, MeshError> {
    let path = path.as_ref();
    let ply = read_ply_file(path)?;
    let vertices = vertex_positions(path, &ply)?;

    let mut triangles = Vec::with_capacity(ply.face.len());
    for (i, face) in ply.face.iter().enumerate() {
        triangulate_polygon(i, &face.vertex_indices, vertices.len(), &mut triangles)?;
    }

    debug!(
        "PLY mesh parsed: {} vertices, {} triangles",
        vertices.len(),
        triangles.len()
    );
    Ok(TriangleMesh::new(vertices, triangles))
}

/// Load only the vertex positions of a PLY file, e.g. a point cloud.
pub fn load_points_from_ply(path: impl AsRef<Path>) -> Result<Vec<DVec3>, MeshError> {
    let path = path.as_ref();
    let ply = read_ply_file(path)?;
    vertex_positions(path, &ply)
}
