//! Core data types for meshes and distance-field samples.
//!
//! These are CPU-side representations shared by the loaders and the
//! preparation pipeline. All coordinates are double precision.

use glam::DVec3;

/// An indexed triangle mesh.
///
/// Vertices are kept in original mesh coordinates; nothing in the pipeline
/// mutates a mesh after loading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<DVec3>,
    /// Triangle vertex indices into `vertices`.
    pub triangles: Vec<[u32; 3]>,
}

impl TriangleMesh {
    /// Create a mesh from vertices and triangle indices.
    pub fn new(vertices: Vec<DVec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Resolve the `index`-th triangle to its corner positions.
    ///
    /// Returns `None` when the triangle or one of its vertices is out of range.
    pub fn triangle(&self, index: usize) -> Option<Triangle> {
        let [a, b, c] = *self.triangles.get(index)?;
        Some(Triangle::new(
            *self.vertices.get(a as usize)?,
            *self.vertices.get(b as usize)?,
            *self.vertices.get(c as usize)?,
        ))
    }
}

/// A triangle given by its three corner positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub v0: DVec3,
    pub v1: DVec3,
    pub v2: DVec3,
}

impl Triangle {
    pub fn new(v0: DVec3, v1: DVec3, v2: DVec3) -> Self {
        Self { v0, v1, v2 }
    }

    /// Compute the normal of the triangle (not normalized).
    pub fn normal(&self) -> DVec3 {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        e1.cross(e2)
    }

    /// Compute the area of the triangle.
    pub fn area(&self) -> f64 {
        self.normal().length() * 0.5
    }

    /// Map two unit-interval variates to a point uniformly distributed over
    /// the triangle.
    pub fn point_from_unit(&self, u: f64, v: f64) -> DVec3 {
        let su = u.sqrt();
        let a = 1.0 - su;
        let b = su * (1.0 - v);
        let c = su * v;
        self.v0 * a + self.v1 * b + self.v2 * c
    }
}

/// One labeled query point: position in the normalized frame plus unsigned
/// distances to the first and second object's surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceRecord {
    pub position: DVec3,
    pub d1: f64,
    pub d2: f64,
}

impl DistanceRecord {
    pub fn new(position: DVec3, d1: f64, d2: f64) -> Self {
        Self { position, d1, d2 }
    }

    /// Row layout used by the on-disk array: `[x, y, z, d1, d2]`.
    pub fn to_row(&self) -> [f64; 5] {
        [
            self.position.x,
            self.position.y,
            self.position.z,
            self.d1,
            self.d2,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_right_triangle() -> Triangle {
        Triangle::new(DVec3::ZERO, DVec3::X, DVec3::Y)
    }

    #[test]
    fn test_triangle_area() {
        assert!((unit_right_triangle().area() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_point_from_unit_stays_inside() {
        let t = unit_right_triangle();
        for i in 0..=10 {
            for j in 0..=10 {
                let p = t.point_from_unit(i as f64 / 10.0, j as f64 / 10.0);
                assert!(p.x >= -1e-12 && p.y >= -1e-12);
                assert!(p.x + p.y <= 1.0 + 1e-12);
                assert_eq!(p.z, 0.0);
            }
        }
    }

    #[test]
    fn test_point_from_unit_corners() {
        let t = unit_right_triangle();
        assert_eq!(t.point_from_unit(0.0, 0.0), DVec3::ZERO);
        assert_eq!(t.point_from_unit(1.0, 0.0), DVec3::X);
        assert_eq!(t.point_from_unit(1.0, 1.0), DVec3::Y);
    }

    #[test]
    fn test_mesh_triangle_out_of_range() {
        let mesh = TriangleMesh::new(vec![DVec3::ZERO, DVec3::X], vec![[0, 1, 2]]);
        assert!(mesh.triangle(0).is_none());
        assert!(mesh.triangle(1).is_none());
    }

    #[test]
    fn test_mesh_triangle_resolves_corners() {
        let mesh = TriangleMesh::new(
            vec![DVec3::ZERO, DVec3::X, DVec3::Y, DVec3::new(1.0, 1.0, 0.0)],
            vec![[0, 1, 2], [1, 3, 2]],
        );
        let t = mesh.triangle(1).unwrap();
        assert_eq!(t, Triangle::new(DVec3::X, DVec3::new(1.0, 1.0, 0.0), DVec3::Y));
        assert!((t.area() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_record_row_layout() {
        let r = DistanceRecord::new(DVec3::new(1.0, 2.0, 3.0), 0.25, 0.5);
        assert_eq!(r.to_row(), [1.0, 2.0, 3.0, 0.25, 0.5]);
    }
}
