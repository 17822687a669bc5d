//! Conversion of a trajectory dump into per-frame XYZ records.
//!
//! One forward pass over the dump text: section markers fill a frame
//! accumulator, and every completion trigger (blank line, next
//! `ITEM: TIMESTEP`, end of input) evaluates the accumulated frame against
//! the selection policy exactly once.

use std::collections::BTreeSet;
use std::panic::{
    self,
    AssertUnwindSafe,
};

use itertools::Itertools;
use shared::LineCursor;

use crate::dump::{
    self,
    Atom,
    BoxBounds,
    Frame,
};
use crate::xyz;


/// Which timesteps to keep: the closed range `[start, end]`, strided by
/// `interval` relative to `start`.
///
/// Callers are expected to hand in `start <= end` and `interval >= 1`; the
/// converter applies the policy as given.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SelectionPolicy {
    pub start:    i64,
    pub end:      i64,
    pub interval: i64,
}


impl SelectionPolicy {
    pub fn contains(&self, timestep: i64) -> bool {
        self.start <= timestep && timestep <= self.end
    }

    pub fn selects(&self, timestep: i64) -> bool {
        self.contains(timestep) && (timestep - self.start) % self.interval == 0
    }
}


/// One generated XYZ file: name and full content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputRecord {
    pub filename: String,
    pub content:  String,
}


/// Everything one conversion run produces. `log` is always populated, even
/// when no files were generated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Conversion {
    pub outputs: Vec<OutputRecord>,
    pub log:     String,
}


pub struct TrajectoryConverter<'a> {
    source: &'a str,
    policy: SelectionPolicy,
}


impl<'a> TrajectoryConverter<'a> {
    /// `source` is the display name of the dump, echoed into each XYZ
    /// comment line.
    pub fn new(source: &'a str, policy: SelectionPolicy) -> Self {
        Self { source, policy }
    }

    /// Run the conversion. This never panics past its boundary: anything the
    /// scan cannot handle becomes a final `Unexpected error:` log line, and
    /// records produced before that point are returned as-is.
    pub fn convert(&self, text: &str) -> Conversion {
        let mut scan = Scan::new(self.source, self.policy);

        let end = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut cursor = LineCursor::new(text);
            scan.run(&mut cursor)
        }));

        match end {
            Ok(ScanEnd::Finished) | Ok(ScanEnd::Fatal) => scan.summarize(),
            Ok(ScanEnd::Unexpected(msg)) => {
                scan.log.push(format!("Unexpected error: {}", msg));
            }
            Err(payload) => {
                scan.log.push(format!("Unexpected error: {}", panic_message(payload.as_ref())));
            }
        }

        let Scan { outputs, log, .. } = scan;
        Conversion { outputs, log: log.finish() }
    }
}


fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        String::from("unknown failure")
    }
}


/// How a scan over the input ended.
enum ScanEnd {
    /// Input exhausted, last in-progress frame flushed.
    Finished,
    /// Fatal parse error, already logged with its line number. The
    /// in-progress frame is dropped; earlier emissions stay.
    Fatal,
    /// Invariant breach the scan cannot attribute to a single line.
    Unexpected(String),
}


/// Accumulator for the frame currently being read. `natoms` and `bounds`
/// keep their most recently declared values across frames; `atoms` and
/// `in_progress` are cleared by every completion check.
#[derive(Default)]
struct FrameState {
    timestep:    Option<i64>,
    natoms:      usize,
    bounds:      Option<BoxBounds>,
    atoms:       Vec<Atom>,
    in_progress: bool,
}


#[derive(Default)]
struct RunLog {
    lines: Vec<String>,
}


impl RunLog {
    fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}


struct Scan<'a> {
    source:   &'a str,
    policy:   SelectionPolicy,
    state:    FrameState,
    outputs:  Vec<OutputRecord>,
    in_range: Vec<i64>,
    selected: Vec<i64>,
    log:      RunLog,
}


impl<'a> Scan<'a> {
    fn new(source: &'a str, policy: SelectionPolicy) -> Self {
        Self {
            source,
            policy,
            state: FrameState::default(),
            outputs: Vec::new(),
            in_range: Vec::new(),
            selected: Vec::new(),
            log: RunLog::default(),
        }
    }

    /// Single pass over the input. The input running out inside a section
    /// truncates that section without error; a fatal parse error stops the
    /// scan with the in-progress frame unflushed.
    fn run(&mut self, cursor: &mut LineCursor<'_>) -> ScanEnd {
        'scan: while let Some(line) = cursor.next_line() {
            if line.is_empty() {
                self.finalize_frame();
                continue;
            }

            if line == dump::TIMESTEP_TAG {
                self.finalize_frame();

                let Some(value) = cursor.next_line() else { break };
                let Ok(timestep) = value.parse::<i64>() else {
                    self.log.push(format!(
                        "Error: Invalid timestep value at line {}",
                        cursor.line_number()
                    ));
                    return ScanEnd::Fatal;
                };
                self.state.timestep = Some(timestep);
                self.state.atoms.clear();
                self.state.in_progress = false;
            } else if line == dump::NATOMS_TAG {
                let Some(value) = cursor.next_line() else { break };
                let Ok(natoms) = value.parse::<usize>() else {
                    self.log.push(format!(
                        "Error: Invalid number of atoms at line {}",
                        cursor.line_number()
                    ));
                    return ScanEnd::Fatal;
                };
                self.state.natoms = natoms;
            } else if line == dump::BOX_BOUNDS_TAG {
                let mut pairs = [(0.0, 0.0); 3];
                for pair in pairs.iter_mut() {
                    let Some(value) = cursor.next_line() else { break 'scan };
                    let Some(parsed) = dump::parse_bounds_line(value) else {
                        self.log.push(format!(
                            "Error: Invalid box bounds at line {}",
                            cursor.line_number()
                        ));
                        return ScanEnd::Fatal;
                    };
                    *pair = parsed;
                }
                self.state.bounds = Some(BoxBounds {
                    xlo: pairs[0].0, xhi: pairs[0].1,
                    ylo: pairs[1].0, yhi: pairs[1].1,
                    zlo: pairs[2].0, zhi: pairs[2].1,
                });
            } else if line == dump::ATOMS_TAG {
                let Some(bounds) = self.state.bounds else {
                    return ScanEnd::Unexpected(
                        "atom section encountered before any box bounds".to_string(),
                    );
                };

                self.state.in_progress = true;
                for _ in 0..self.state.natoms {
                    let Some(record) = cursor.next_line() else { break 'scan };
                    let fields = record.split_whitespace().collect::<Vec<_>>();
                    if fields.len() < 5 {
                        self.log.push(format!(
                            "Error: Incomplete atom data at line {}",
                            cursor.line_number()
                        ));
                        continue;
                    }
                    let Some((species, xs, ys, zs)) = dump::parse_atom_fields(&fields) else {
                        self.log.push(format!(
                            "Error: Invalid atom data at line {}",
                            cursor.line_number()
                        ));
                        continue;
                    };
                    self.state.atoms.push(Atom {
                        species,
                        position: bounds.to_cartesian(xs, ys, zs),
                    });
                }
            }
        }

        self.finalize_frame();
        ScanEnd::Finished
    }

    /// Evaluate the accumulated frame against the policy, at most once.
    ///
    /// Fires on blank lines, on each new `ITEM: TIMESTEP` marker and at end
    /// of input. Clearing `atoms` and `in_progress` here is what keeps a
    /// frame from being emitted twice when several trigger points walk over
    /// the same accumulated state.
    fn finalize_frame(&mut self) {
        if !self.state.in_progress || self.state.atoms.is_empty() {
            return;
        }
        let Some(timestep) = self.state.timestep else {
            return;
        };

        if self.policy.contains(timestep) {
            self.in_range.push(timestep);

            if self.policy.selects(timestep) {
                if let Some(bounds) = self.state.bounds {
                    let frame = Frame {
                        timestep,
                        natoms: self.state.natoms,
                        bounds,
                        atoms: std::mem::take(&mut self.state.atoms),
                    };
                    self.selected.push(timestep);
                    self.outputs.push(OutputRecord {
                        filename: xyz::output_filename(timestep),
                        content: xyz::format_frame(&frame, self.source),
                    });
                }
            }
        }

        self.state.atoms.clear();
        self.state.in_progress = false;
    }

    fn summarize(&mut self) {
        if self.outputs.is_empty() {
            self.log.push("No XYZ files were generated.");
        } else {
            for output in self.outputs.iter() {
                self.log.lines.push(format!("Processed: {}", output.filename));
            }
        }

        let distinct = self.in_range.iter().copied().collect::<BTreeSet<_>>();

        self.log.push("");
        self.log.push("Summary:");
        self.log.push(format!(
            "Timestep range: {} to {}",
            self.policy.start, self.policy.end
        ));
        self.log.push(format!("Interval: Every {} timesteps", self.policy.interval));

        if !distinct.is_empty() {
            self.log.push(format!("Timesteps found in range: {}", distinct.len()));
        }

        if !self.selected.is_empty() {
            self.log.push(format!(
                "Generated XYZ files for timesteps: [{}]",
                self.selected.iter().join(", ")
            ));
            self.log.push(format!("Total files generated: {}", self.outputs.len()));
        } else if !distinct.is_empty() {
            self.log.push("No timesteps matched the interval criteria.");
            self.log.push(format!(
                "Available timesteps in range: [{}]",
                distinct.iter().join(", ")
            ));
            self.log.push("Try using a smaller interval value.");
        } else {
            self.log.push(format!(
                "No timesteps found in the range {} to {}.",
                self.policy.start, self.policy.end
            ));
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn policy(start: i64, end: i64, interval: i64) -> SelectionPolicy {
        SelectionPolicy { start, end, interval }
    }

    fn convert(text: &str, policy: SelectionPolicy) -> Conversion {
        TrajectoryConverter::new("test.dump", policy).convert(text)
    }

    /// One frame with the canonical 10 x 10 x 2 box used across these tests.
    fn frame_text(timestep: i64, atoms: &[&str]) -> String {
        let mut text = String::new();
        text += "ITEM: TIMESTEP\n";
        text += &format!("{}\n", timestep);
        text += "ITEM: NUMBER OF ATOMS\n";
        text += &format!("{}\n", atoms.len());
        text += "ITEM: BOX BOUNDS pp pp pp\n";
        text += "0.0 10.0\n";
        text += "-5.0 5.0\n";
        text += "2.0 4.0\n";
        text += "ITEM: ATOMS id type xs ys zs\n";
        for atom in atoms {
            text += atom;
            text += "\n";
        }
        text
    }

    #[test]
    fn test_policy_selection_boundaries() {
        let p = policy(10, 30, 10);
        assert!(p.selects(10));
        assert!(p.selects(20));
        assert!(p.selects(30));
        assert!(p.contains(19) && !p.selects(19));
        assert!(!p.contains(9));
        assert!(!p.contains(31));
    }

    #[test]
    fn test_two_frames_both_selected() {
        let text = frame_text(100, &["1 1 0.0 0.0 0.0"]) + &frame_text(200, &["1 1 0.5 0.5 0.5"]);
        let conversion = convert(&text, policy(100, 200, 100));

        assert_eq!(conversion.outputs.len(), 2);
        assert_eq!(conversion.outputs[0].filename, "output_timestep_100.xyz");
        assert_eq!(conversion.outputs[1].filename, "output_timestep_200.xyz");
        assert!(conversion.log.contains("Total files generated: 2"));
        assert!(conversion.log.contains("Generated XYZ files for timesteps: [100, 200]"));
    }

    #[test]
    fn test_interval_excludes_second_frame() {
        let text = frame_text(100, &["1 1 0.0 0.0 0.0"]) + &frame_text(200, &["1 1 0.5 0.5 0.5"]);
        let conversion = convert(&text, policy(100, 200, 200));

        assert_eq!(conversion.outputs.len(), 1);
        assert_eq!(conversion.outputs[0].filename, "output_timestep_100.xyz");
        // timestep 200 is in range but (200 - 100) % 200 != 0
        assert!(conversion.log.contains("Timesteps found in range: 2"));
        assert!(conversion.log.contains("Total files generated: 1"));
    }

    #[test]
    fn test_selection_at_range_boundaries() {
        let text = frame_text(9, &["1 1 0.1 0.1 0.1"])
            + &frame_text(10, &["1 1 0.1 0.1 0.1"])
            + &frame_text(19, &["1 1 0.1 0.1 0.1"])
            + &frame_text(20, &["1 1 0.1 0.1 0.1"])
            + &frame_text(30, &["1 1 0.1 0.1 0.1"])
            + &frame_text(31, &["1 1 0.1 0.1 0.1"]);
        let conversion = convert(&text, policy(10, 30, 10));

        let names = conversion
            .outputs
            .iter()
            .map(|o| o.filename.as_str())
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "output_timestep_10.xyz",
                "output_timestep_20.xyz",
                "output_timestep_30.xyz",
            ]
        );
        assert!(conversion.log.contains("Timesteps found in range: 4"));
    }

    #[test]
    fn test_coordinate_conversion() {
        let atoms = ["1 7 0.0 0.0 0.0", "2 7 1.0 1.0 1.0", "3 7 0.5 0.5 0.5"];
        let conversion = convert(&frame_text(0, &atoms), policy(0, 0, 1));

        assert_eq!(conversion.outputs.len(), 1);
        let lines = conversion.outputs[0].content.lines().collect::<Vec<_>>();
        assert_eq!(lines[0], "3");
        assert_eq!(
            lines[1],
            "Timestep 0 from test.dump box 0.000000 10.000000 -5.000000 5.000000 2.000000 4.000000"
        );
        assert_eq!(lines[2], "7 0.000000 -5.000000 2.000000");
        assert_eq!(lines[3], "7 10.000000 5.000000 4.000000");
        assert_eq!(lines[4], "7 5.000000 0.000000 3.000000");
    }

    #[test]
    fn test_at_most_once_emission() {
        // blank line closes the first frame; the TIMESTEP marker right after
        // must not evaluate the same accumulated state again
        let text = frame_text(100, &["1 1 0.1 0.1 0.1"])
            + "\n"
            + &frame_text(200, &["1 1 0.2 0.2 0.2"])
            + "\n\n";
        let conversion = convert(&text, policy(100, 200, 100));

        assert_eq!(conversion.outputs.len(), 2);
        assert!(conversion.log.contains("Timesteps found in range: 2"));
        assert!(conversion.log.contains("Total files generated: 2"));
    }

    #[test]
    fn test_malformed_atom_record_is_skipped() {
        let atoms = ["1 2 0.1 0.1 0.1", "2 2 abc 0.5 0.5", "3 2 0.2 0.2 0.2"];
        let conversion = convert(&frame_text(0, &atoms), policy(0, 0, 1));

        assert!(conversion.log.contains("Error: Invalid atom data at line 11"));
        assert_eq!(conversion.outputs.len(), 1);
        assert!(conversion.outputs[0].content.starts_with("2\n"));
    }

    #[test]
    fn test_short_atom_record_is_skipped() {
        let atoms = ["1 2 0.5 0.5", "2 2 0.2 0.2 0.2"];
        let conversion = convert(&frame_text(0, &atoms), policy(0, 0, 1));

        assert!(conversion.log.contains("Error: Incomplete atom data at line 10"));
        assert_eq!(conversion.outputs.len(), 1);
        assert!(conversion.outputs[0].content.starts_with("1\n"));
    }

    #[test]
    fn test_invalid_timestep_is_fatal() {
        let conversion = convert("ITEM: TIMESTEP\nabc\n", policy(0, 100, 1));

        assert!(conversion.outputs.is_empty());
        assert!(conversion.log.contains("Error: Invalid timestep value at line 2"));
        assert!(conversion.log.contains("No XYZ files were generated."));
    }

    #[test]
    fn test_fatal_error_keeps_prior_outputs() {
        let text = frame_text(100, &["1 1 0.1 0.1 0.1"]) + "ITEM: TIMESTEP\nxyz\n";
        let conversion = convert(&text, policy(0, 1000, 1));

        assert_eq!(conversion.outputs.len(), 1);
        assert_eq!(conversion.outputs[0].filename, "output_timestep_100.xyz");
        assert!(conversion.log.contains("Error: Invalid timestep value at line 12"));
    }

    #[test]
    fn test_invalid_atom_count_is_fatal() {
        let conversion = convert("ITEM: NUMBER OF ATOMS\nfoo\n", policy(0, 100, 1));
        assert!(conversion.log.contains("Error: Invalid number of atoms at line 2"));
        assert!(conversion.outputs.is_empty());
    }

    #[test]
    fn test_invalid_box_bounds_is_fatal() {
        let text = "ITEM: BOX BOUNDS pp pp pp\n0.0 10.0\n0.0 bad\n0.0 10.0\n";
        let conversion = convert(text, policy(0, 100, 1));
        assert!(conversion.log.contains("Error: Invalid box bounds at line 3"));
        assert!(conversion.outputs.is_empty());
    }

    #[test]
    fn test_truncated_atom_block() {
        // declares 3 atoms, input ends after 2
        let mut text = frame_text(0, &["1 1 0.1 0.1 0.1", "2 1 0.2 0.2 0.2"]);
        text = text.replace("ITEM: NUMBER OF ATOMS\n2\n", "ITEM: NUMBER OF ATOMS\n3\n");
        let conversion = convert(&text, policy(0, 0, 1));

        assert_eq!(conversion.outputs.len(), 1);
        assert!(conversion.outputs[0].content.starts_with("2\n"));
        assert!(!conversion.log.contains("Error:"));
    }

    #[test]
    fn test_atom_section_before_bounds_is_unexpected() {
        let text = "ITEM: TIMESTEP\n0\nITEM: NUMBER OF ATOMS\n1\n\
                    ITEM: ATOMS id type xs ys zs\n1 1 0.1 0.1 0.1\n";
        let conversion = convert(text, policy(0, 0, 1));

        assert!(conversion.outputs.is_empty());
        assert!(conversion.log.contains("Unexpected error:"));
    }

    #[test]
    fn test_nothing_in_range() {
        let text = frame_text(100, &["1 1 0.1 0.1 0.1"]) + &frame_text(200, &["1 1 0.1 0.1 0.1"]);
        let conversion = convert(&text, policy(300, 400, 1));

        assert!(conversion.outputs.is_empty());
        assert!(conversion.log.contains("No timesteps found in the range 300 to 400."));
    }

    #[test]
    fn test_nothing_matches_interval() {
        let text = frame_text(100, &["1 1 0.1 0.1 0.1"]) + &frame_text(150, &["1 1 0.1 0.1 0.1"]);
        let conversion = convert(&text, policy(99, 200, 7));

        assert!(conversion.outputs.is_empty());
        assert!(conversion.log.contains("No timesteps matched the interval criteria."));
        assert!(conversion.log.contains("Available timesteps in range: [100, 150]"));
        assert!(conversion.log.contains("Try using a smaller interval value."));
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let text = frame_text(100, &["1 1 0.1 0.2 0.3"]) + &frame_text(200, &["2 2 0.4 0.5 0.6"]);
        let p = policy(100, 200, 50);

        let first = convert(&text, p);
        let second = convert(&text, p);
        assert_eq!(first, second);
    }

    #[test]
    fn test_header_count_matches_declared_when_complete() {
        let atoms = ["1 1 0.1 0.1 0.1", "2 1 0.2 0.2 0.2", "3 1 0.3 0.3 0.3"];
        let conversion = convert(&frame_text(0, &atoms), policy(0, 0, 1));
        assert!(conversion.outputs[0].content.starts_with("3\n"));
    }
}
