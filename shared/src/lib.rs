pub use anyhow::{
    self,
    Result,
    Context,
    bail,
    ensure,
};
pub use log::{
    self,
    warn,
    info,
    debug,
    error,
};


/// Forward-only cursor over the lines of a text buffer.
///
/// Every yielded line is whitespace-trimmed, and the cursor remembers the
/// 1-based number of the line it yielded last, so callers can report
/// positions without carrying indices around. Exhaustion is an explicit,
/// queryable condition rather than an out-of-bounds access.
pub struct LineCursor<'a> {
    lines: Vec<&'a str>,
    pos:   usize,
}


impl<'a> LineCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().collect(),
            pos: 0,
        }
    }

    /// Yield the next line, trimmed, or `None` once the input is exhausted.
    pub fn next_line(&mut self) -> Option<&'a str> {
        let line = self.lines.get(self.pos)?;
        self.pos += 1;
        Some(line.trim())
    }

    /// 1-based number of the most recently yielded line, 0 before the first.
    pub fn line_number(&self) -> usize {
        self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.lines.len()
    }
}
