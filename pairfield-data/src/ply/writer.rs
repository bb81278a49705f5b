//! ASCII PLY point-cloud writer

use glam::DVec3;
use std::io::{self, Write};

/// Write `points` as an ASCII PLY vertex list with double-precision
/// coordinates.
pub fn write_points_ply<W: Write>(mut w: W, points: &[DVec3]) -> io::Result<()> {
    writeln!(w, "ply")?;
    writeln!(w, "format ascii 1.0")?;
    writeln!(w, "element vertex {}", points.len())?;
    writeln!(w, "property double x")?;
    writeln!(w, "property double y")?;
    writeln!(w, "property double z")?;
    writeln!(w, "end_header")?;
    for p in points {
        writeln!(w, "{} {} {}", p.x, p.y, p.z)?;
    }
    w.flush()
}
