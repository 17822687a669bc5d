//! XYZ-format serialization of selected frames.

use crate::dump::Frame;

/// Deterministic output file name for a frame.
pub fn output_filename(timestep: i64) -> String {
    format!("output_timestep_{}.xyz", timestep)
}


/// Serialize one frame as XYZ text.
///
/// The count line reflects the atoms actually collected, which can fall
/// short of the declared count when the dump was truncated. The comment line
/// carries the timestep, the source file name and the six box bounds; bounds
/// and coordinates are printed with 6 decimal digits.
pub fn format_frame(frame: &Frame, source: &str) -> String {
    let b = &frame.bounds;

    let mut out = format!("{}\n", frame.atoms.len());
    out += &format!(
        "Timestep {} from {} box {:.6} {:.6} {:.6} {:.6} {:.6} {:.6}\n",
        frame.timestep, source, b.xlo, b.xhi, b.ylo, b.yhi, b.zlo, b.zhi,
    );
    for atom in frame.atoms.iter() {
        let [x, y, z] = atom.position;
        out += &format!("{} {:.6} {:.6} {:.6}\n", atom.species, x, y, z);
    }

    out
}
