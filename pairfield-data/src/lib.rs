//! Pairfield Data Crate
//!
//! Geometry types and file formats for paired-object dataset preparation:
//! triangle meshes (OFF and PLY), point-cloud PLY output, axis-aligned
//! bounding boxes and the interaction-region text format.

pub mod bounds;
pub mod error;
pub mod mesh;
pub mod off;
pub mod ply;
pub mod types;

pub use bounds::Aabb;
pub use error::{MeshError, RegionFileError};
pub use mesh::{MeshFormat, load_mesh};
pub use ply::{load_points_from_ply, write_points_ply};
pub use types::{DistanceRecord, Triangle, TriangleMesh};
