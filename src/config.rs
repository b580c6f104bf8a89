//! Typed, validated configuration assembled from CLI flags.

use anyhow::{bail, Result};

/// Default lossy-counting error bound when the caller doesn't override it.
pub const DEFAULT_ERROR: f64 = 0.01;

/// Default reporting frequency threshold.
pub const DEFAULT_FREQUENCY: f64 = 0.03;

/// Word size in bytes used to convert sample counts into byte estimates in
/// the reporter. Never consulted by `crate::core` — the core only ever
/// counts samples.
pub const DEFAULT_WORDSIZE: u64 = 8;

/// How many rows of `output()` to print, truncated after sorting by
/// descending `light`.
pub const DEFAULT_TOP_N: usize = 32;

/// Validated, ready-to-run configuration for the `hitterpatch` binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub trace_path: std::path::PathBuf,
    pub frequency: f64,
    pub error: f64,
    pub wordsize: u64,
    pub top_n: usize,
    pub symbols_path: Option<std::path::PathBuf>,
}

impl Config {
    /// Validates the numeric ranges the engine's preconditions require,
    /// returning a user-facing error (not a panic) on failure — this runs
    /// before any `Engine` is created, so these are the only argument
    /// errors a user ever sees.
    pub fn validate(
        trace_path: std::path::PathBuf,
        frequency: f64,
        error: f64,
        wordsize: u64,
        top_n: usize,
        symbols_path: Option<std::path::PathBuf>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&frequency) {
            bail!("frequency must lie in [0, 1], got {frequency}");
        }
        if !(error > 0.0 && error < 1.0) {
            bail!("error must lie in (0, 1), got {error}");
        }
        if wordsize == 0 {
            bail!("wordsize must be non-zero");
        }
        Ok(Config {
            trace_path,
            frequency,
            error,
            wordsize,
            top_n,
            symbols_path,
        })
    }
}
