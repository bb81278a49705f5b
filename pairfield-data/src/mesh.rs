//! Format-independent mesh loading.

use crate::error::MeshError;
use crate::off::load_mesh_from_off;
use crate::ply::load_mesh_from_ply;
use crate::types::TriangleMesh;
use std::path::Path;
use tracing::info;

/// Mesh file formats understood by [`load_mesh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    Off,
    Ply,
}

impl MeshFormat {
    /// Detect the format from a file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "off" => Some(MeshFormat::Off),
            "ply" => Some(MeshFormat::Ply),
            _ => None,
        }
    }
}

/// Load a triangle mesh, dispatching on the file extension.
pub fn load_mesh(path: impl AsRef<Path>) -> Result<TriangleMesh, MeshError> {
    let path = path.as_ref();
    let mesh = match MeshFormat::from_path(path) {
        Some(MeshFormat::Off) => load_mesh_from_off(path)?,
        Some(MeshFormat::Ply) => load_mesh_from_ply(path)?,
        None => return Err(MeshError::UnsupportedFormat(path.to_path_buf())),
    };
    info!(
        "Loaded mesh {}: {} vertices, {} triangles",
        path.display(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Fan-triangulate one polygon and append the triangles to `out`.
///
/// Every index is checked against `vertex_count`. Polygons with fewer than
/// three corners contribute nothing.
pub(crate) fn triangulate_polygon(
    face: usize,
    indices: &[i64],
    vertex_count: usize,
    out: &mut Vec<[u32; 3]>,
) -> Result<(), MeshError> {
    let mut checked = Vec::with_capacity(indices.len());
    for &vertex in indices {
        if vertex < 0 || vertex as usize >= vertex_count || vertex > u32::MAX as i64 {
            return Err(MeshError::InvalidFace {
                face,
                vertex,
                vertex_count,
            });
        }
        checked.push(vertex as u32);
    }
    for k in 1..checked.len().saturating_sub(1) {
        out.push([checked[0], checked[k], checked[k + 1]]);
    }
    Ok(())
}
