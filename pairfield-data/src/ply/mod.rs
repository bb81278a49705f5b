//! PLY file loading and writing

mod loader;
mod writer;

pub use loader::{load_mesh_from_ply, load_points_from_ply};
pub use writer::write_points_ply;
