//! Synthetic geometry shared by unit tests.

use glam::DVec3;
use pairfield_data::TriangleMesh;

/// Axis-aligned cube spanning `[0, 1]^3`, outward-facing triangles.
pub fn unit_cube() -> TriangleMesh {
    cube(DVec3::ZERO, 1.0)
}

/// Axis-aligned cube with its minimum corner at `origin`.
pub fn cube(origin: DVec3, size: f64) -> TriangleMesh {
    let v = |x: f64, y: f64, z: f64| origin + DVec3::new(x, y, z) * size;
    TriangleMesh::new(
        vec![
            v(0.0, 0.0, 0.0),
            v(1.0, 0.0, 0.0),
            v(1.0, 1.0, 0.0),
            v(0.0, 1.0, 0.0),
            v(0.0, 0.0, 1.0),
            v(1.0, 0.0, 1.0),
            v(1.0, 1.0, 1.0),
            v(0.0, 1.0, 1.0),
        ],
        vec![
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [1, 2, 6],
            [1, 6, 5],
            [2, 3, 7],
            [2, 7, 6],
            [3, 0, 4],
            [3, 4, 7],
        ],
    )
}
