//! The location-symbol resolver collaborator.
//!
//! Maps a `location_code` back to source coordinates, reading a small
//! sidecar debug-info file the trace producer writes alongside the trace
//! itself. The engine never sees this table — it only ever operates on the
//! opaque `u64` codes.

use std::collections::HashMap;
use std::io::BufRead;

use anyhow::{Context, Result};

/// A resolved call-site location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub filename: String,
    pub line: u32,
    pub start_char: u32,
    pub end_char: u32,
    pub defname: String,
}

/// `location_code -> Location`, populated once at startup.
#[derive(Debug, Default)]
pub struct SymbolTable {
    locations: HashMap<u64, Location>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            locations: HashMap::new(),
        }
    }

    /// Parses one `location_code filename:line:start_char-end_char defname`
    /// record per line.
    pub fn load(reader: impl BufRead) -> Result<Self> {
        let mut table = SymbolTable::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("reading symbol table line {lineno}"))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            table.add_line(line).with_context(|| {
                format!("parsing symbol table line {lineno}: {line:?}")
            })?;
        }
        Ok(table)
    }

    fn add_line(&mut self, line: &str) -> Result<()> {
        let mut parts = line.splitn(3, ' ');
        let code: u64 = parts
            .next()
            .context("missing location_code field")?
            .parse()
            .context("location_code is not a u64")?;
        let coords = parts.next().context("missing coordinates field")?;
        let defname = parts.next().unwrap_or("<unknown>").to_string();

        let (filename, rest) = coords
            .rsplit_once(':')
            .context("coordinates missing ':line:start-end'")?;
        let (line_str, span) = rest
            .split_once(':')
            .context("coordinates missing 'start-end' span")?;
        let (start_str, end_str) = span
            .split_once('-')
            .context("coordinates missing 'start-end' separator")?;

        self.locations.insert(
            code,
            Location {
                filename: filename.to_string(),
                line: line_str.parse().context("line is not a u32")?,
                start_char: start_str.parse().context("start_char is not a u32")?,
                end_char: end_str.parse().context("end_char is not a u32")?,
                defname,
            },
        );
        Ok(())
    }

    pub fn resolve(&self, code: u64) -> Option<&Location> {
        self.locations.get(&code)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_well_formed_records() {
        let data = "7 src/main.rs:10:4-12 compute_total\n# a comment\n\n8 src/lib.rs:1:0-3 main\n";
        let table = SymbolTable::load(Cursor::new(data)).unwrap();
        assert_eq!(table.len(), 2);
        let loc = table.resolve(7).unwrap();
        assert_eq!(loc.filename, "src/main.rs");
        assert_eq!(loc.line, 10);
        assert_eq!(loc.defname, "compute_total");
    }

    #[test]
    fn rejects_malformed_coordinates() {
        let data = "7 not-coordinates-at-all\n";
        assert!(SymbolTable::load(Cursor::new(data)).is_err());
    }
}
