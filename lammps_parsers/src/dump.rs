//! Vocabulary and field-level parsing for LAMMPS text dumps with scaled
//! coordinates (`dump ... atom` style, periodic box).

use std::ffi::OsStr;
use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use shared::{
    bail,
    Context,
    Result,
};

/// Section markers, matched against whitespace-trimmed lines by exact
/// equality. Dumps with other column sets or box-bounds styles are not
/// recognized.
pub const TIMESTEP_TAG:   &str = "ITEM: TIMESTEP";
pub const NATOMS_TAG:     &str = "ITEM: NUMBER OF ATOMS";
pub const BOX_BOUNDS_TAG: &str = "ITEM: BOX BOUNDS pp pp pp";
pub const ATOMS_TAG:      &str = "ITEM: ATOMS id type xs ys zs";


/// Lower/upper extent of the simulation cell on each axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxBounds {
    pub xlo: f64,
    pub xhi: f64,
    pub ylo: f64,
    pub yhi: f64,
    pub zlo: f64,
    pub zhi: f64,
}


impl BoxBounds {
    /// Map scaled (fractional) coordinates to Cartesian ones, each axis
    /// independently. Scaled values outside `[0, 1]` land outside the box
    /// and are not clamped.
    pub fn to_cartesian(&self, xs: f64, ys: f64, zs: f64) -> [f64; 3] {
        [
            self.xlo + xs * (self.xhi - self.xlo),
            self.ylo + ys * (self.yhi - self.ylo),
            self.zlo + zs * (self.zhi - self.zlo),
        ]
    }
}


/// One atom record, already converted to Cartesian coordinates. The per-atom
/// id field is checked during parsing but not retained.
#[derive(Clone, Debug, PartialEq)]
pub struct Atom {
    pub species:  i32,
    pub position: [f64; 3],
}


/// One timestep snapshot. `natoms` is the declared count; `atoms` holds what
/// was actually collected, in input order.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub timestep: i64,
    pub natoms:   usize,
    pub bounds:   BoxBounds,
    pub atoms:    Vec<Atom>,
}


/// Parse one box-bounds line into its `(lo, hi)` pair.
///
/// Every whitespace-separated field must parse as a float and at least two
/// must be present; fields past the second are ignored.
pub fn parse_bounds_line(line: &str) -> Option<(f64, f64)> {
    let mut values = Vec::new();
    for field in line.split_whitespace() {
        values.push(field.parse::<f64>().ok()?);
    }
    if values.len() < 2 {
        return None;
    }
    Some((values[0], values[1]))
}


/// Parse the `id type xs ys zs` head of an atom record. The caller has
/// already checked that at least 5 fields are present.
pub fn parse_atom_fields(fields: &[&str]) -> Option<(i32, f64, f64, f64)> {
    let _id     = fields[0].parse::<i64>().ok()?;
    let species = fields[1].parse::<i32>().ok()?;
    let xs      = fields[2].parse::<f64>().ok()?;
    let ys      = fields[3].parse::<f64>().ok()?;
    let zs      = fields[4].parse::<f64>().ok()?;
    Some((species, xs, ys, zs))
}


/// Read a dump file into memory, gunzipping `*.gz` transparently.
pub fn read_dump<P>(path: P) -> Result<String>
where P: AsRef<Path> {
    let path = path.as_ref();
    if !path.is_file() {
        bail!("Dump file {:?} not available.", path);
    }

    if path.extension() == Some(OsStr::new("gz")) {
        let f = fs::File::open(path)?;
        let mut text = String::new();
        GzDecoder::new(f)
            .read_to_string(&mut text)
            .with_context(|| format!("Failed to decompress {:?}", path))?;
        Ok(text)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}
