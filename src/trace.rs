//! The trace-file reader collaborator.
//!
//! Turns a stream of allocation records into the `(common_prefix, extension,
//! count)` triples `crate::core::Engine::insert` expects. Never touches the
//! engine's invariants directly — it only ever produces plain data.

use std::io::{BufRead, Read};

use anyhow::{bail, Context, Result};

use crate::core::SeenSet;

/// One allocation-sampling record, ready to hand to `Engine::insert`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub common_prefix: u32,
    pub extension: Vec<u64>,
    pub count: i64,
}

/// Reads the line-oriented text trace format: one record per line,
/// `nsamples backtrace_len loc0 loc1 ... locN`; lines starting with `#` are
/// ignored promote/collect events.
pub struct TraceReader<R> {
    lines: R,
    seen: SeenSet<u64>,
    previous: Vec<u64>,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        TraceReader {
            lines: reader,
            seen: SeenSet::new(),
            previous: Vec::new(),
        }
    }

    /// Reads and parses the next record, skipping ignored event lines.
    /// Returns `Ok(None)` at end of input.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self
                .lines
                .read_line(&mut line)
                .context("reading trace line")?;
            if n == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return self.parse_record(trimmed).map(Some);
        }
    }

    fn parse_record(&mut self, line: &str) -> Result<Record> {
        let mut fields = line.split_whitespace();
        let nsamples: i64 = fields
            .next()
            .context("record missing nsamples field")?
            .parse()
            .context("nsamples is not an integer")?;
        let backtrace_len: usize = fields
            .next()
            .context("record missing backtrace_len field")?
            .parse()
            .context("backtrace_len is not an integer")?;

        let mut backtrace = Vec::with_capacity(backtrace_len);
        for i in 0..backtrace_len {
            let code: u64 = fields
                .next()
                .with_context(|| format!("record missing backtrace location {i}"))?
                .parse()
                .with_context(|| format!("backtrace location {i} is not a u64"))?;
            backtrace.push(code);
        }

        Ok(self.advance(backtrace, nsamples))
    }

    /// Diffs `backtrace` against the previously inserted one, rewinds the
    /// seen-set stack to the shared prefix, and records the new frames.
    fn advance(&mut self, backtrace: Vec<u64>, count: i64) -> Record {
        let common_prefix = self
            .previous
            .iter()
            .zip(backtrace.iter())
            .take_while(|(a, b)| a == b)
            .count();

        self.seen.pop_until(common_prefix);
        for (depth, &code) in backtrace.iter().enumerate().skip(common_prefix) {
            self.seen.push(depth);
            self.seen.add(code);
        }

        let extension = backtrace[common_prefix..].to_vec();
        self.previous = backtrace;

        Record {
            common_prefix: common_prefix as u32,
            extension,
            count,
        }
    }
}

/// A minimal varint-framed binary trace reader, for the `ctf`-style wire
/// format: each record is `varint(nsamples) varint(backtrace_len)
/// varint(loc)*backtrace_len`, with no event framing (ignored events are
/// not representable in this format).
#[cfg(feature = "ctf")]
pub struct CtfTraceReader<R> {
    bytes: R,
    seen: SeenSet<u64>,
    previous: Vec<u64>,
}

#[cfg(feature = "ctf")]
impl<R: Read> CtfTraceReader<R> {
    pub fn new(reader: R) -> Self {
        CtfTraceReader {
            bytes: reader,
            seen: SeenSet::new(),
            previous: Vec::new(),
        }
    }

    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let nsamples = match read_varint(&mut self.bytes)? {
            Some(v) => v as i64,
            None => return Ok(None),
        };
        let backtrace_len = read_varint(&mut self.bytes)?
            .context("ctf trace truncated after nsamples")? as usize;
        let mut backtrace = Vec::with_capacity(backtrace_len);
        for i in 0..backtrace_len {
            let code = read_varint(&mut self.bytes)?
                .with_context(|| format!("ctf trace truncated at backtrace location {i}"))?;
            backtrace.push(code);
        }

        let common_prefix = self
            .previous
            .iter()
            .zip(backtrace.iter())
            .take_while(|(a, b)| a == b)
            .count();
        self.seen.pop_until(common_prefix);
        for (depth, &code) in backtrace.iter().enumerate().skip(common_prefix) {
            self.seen.push(depth);
            self.seen.add(code);
        }
        let extension = backtrace[common_prefix..].to_vec();
        self.previous = backtrace;

        Ok(Some(Record {
            common_prefix: common_prefix as u32,
            extension,
            count: nsamples,
        }))
    }
}

/// Reads a single LEB128-encoded unsigned varint, `Ok(None)` only if the
/// stream ends exactly on a frame boundary (zero bytes read for the first
/// byte); a partial varint is an error.
#[cfg(feature = "ctf")]
fn read_varint(mut r: impl Read) -> Result<Option<u64>> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut first = true;
    loop {
        let mut byte = [0u8; 1];
        let n = r.read(&mut byte).context("reading varint byte")?;
        if n == 0 {
            if first {
                return Ok(None);
            }
            bail!("truncated varint");
        }
        first = false;
        value |= ((byte[0] & 0x7f) as u64) << shift;
        if byte[0] & 0x80 == 0 {
            return Ok(Some(value));
        }
        shift += 7;
        if shift >= 64 {
            bail!("varint too long");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn single_record_has_empty_common_prefix() {
        let mut reader = TraceReader::new(Cursor::new("1 3 10 20 30\n"));
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.common_prefix, 0);
        assert_eq!(record.extension, vec![10, 20, 30]);
        assert_eq!(record.count, 1);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn shares_prefix_with_previous_record() {
        let mut reader = TraceReader::new(Cursor::new("5 3 10 20 30\n5 3 10 20 40\n"));
        reader.next_record().unwrap().unwrap();
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.common_prefix, 2);
        assert_eq!(record.extension, vec![40]);
    }

    #[test]
    fn skips_comment_and_blank_lines() {
        let mut reader = TraceReader::new(Cursor::new("# promote\n\n1 1 99\n"));
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.extension, vec![99]);
    }
}
