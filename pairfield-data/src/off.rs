//! Object File Format (OFF) mesh loading.
//!
//! Layout: an `OFF` header line, a counts line `vertices faces edges`, one
//! line per vertex (`x y z`, trailing values ignored) and one line per face
//! (`n i0 .. in-1`, trailing color values ignored). `#` starts a comment.
//! Some exporters glue the counts onto the header (`OFF8 6 0`); that form is
//! accepted too.

use crate::error::MeshError;
use crate::mesh::triangulate_polygon;
use crate::types::TriangleMesh;
use glam::DVec3;
use std::path::Path;
use tracing::debug;

/// Load a triangle mesh from an OFF file.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn load_mesh_from_off(path: impl AsRef<Path>) -> Result<TriangleMesh, MeshError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| MeshError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mesh = parse_off(&text).map_err(|e| match e {
        MeshError::Parse { reason, .. } => MeshError::parse(path, reason),
        other => other,
    })?;
    debug!(
        "OFF mesh parsed: {} vertices, {} triangles",
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Parse OFF text into a triangle mesh.
pub fn parse_off(text: &str) -> Result<TriangleMesh, MeshError> {
    let fail = |reason: String| MeshError::parse("<off>", reason);

    let mut lines = text
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty());

    let header = lines.next().ok_or_else(|| fail("empty file".into()))?;
    let rest = header
        .strip_prefix("OFF")
        .ok_or_else(|| fail(format!("expected OFF header, found '{header}'")))?
        .trim();
    let counts_line = if rest.is_empty() {
        lines.next().ok_or_else(|| fail("missing counts line".into()))?
    } else {
        rest
    };

    let counts = counts_line
        .split_whitespace()
        .map(|t| t.parse::<usize>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| fail(format!("invalid counts line '{counts_line}'")))?;
    let (n_vertices, n_faces) = match counts.as_slice() {
        [v, f] | [v, f, _] => (*v, *f),
        _ => return Err(fail(format!("invalid counts line '{counts_line}'"))),
    };

    let mut vertices = Vec::with_capacity(n_vertices);
    for i in 0..n_vertices {
        let line = lines
            .next()
            .ok_or_else(|| fail(format!("expected {n_vertices} vertices, found {i}")))?;
        let coords = line
            .split_whitespace()
            .take(3)
            .map(|t| t.parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| fail(format!("invalid vertex line '{line}'")))?;
        match coords.as_slice() {
            [x, y, z] if x.is_finite() && y.is_finite() && z.is_finite() => {
                vertices.push(DVec3::new(*x, *y, *z))
            }
            _ => return Err(fail(format!("invalid vertex line '{line}'"))),
        }
    }

    let mut triangles = Vec::with_capacity(n_faces);
    for i in 0..n_faces {
        let line = lines
            .next()
            .ok_or_else(|| fail(format!("expected {n_faces} faces, found {i}")))?;
        let mut tokens = line.split_whitespace();
        let n = tokens
            .next()
            .and_then(|t| t.parse::<usize>().ok())
            .ok_or_else(|| fail(format!("invalid face line '{line}'")))?;
        let indices = tokens
            .take(n)
            .map(|t| t.parse::<i64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| fail(format!("invalid face line '{line}'")))?;
        if indices.len() != n {
            return Err(fail(format!("face {i} lists fewer than {n} indices")));
        }
        triangulate_polygon(i, &indices, vertices.len(), &mut triangles)?;
    }

    Ok(TriangleMesh::new(vertices, triangles))
}
