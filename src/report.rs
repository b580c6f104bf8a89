//! Turns an `OutputReport` into the human-readable table printed to stdout.

use std::io::Write;

use anyhow::Result;

use crate::core::{HeavyHitter, OutputReport, Symbol};

/// Run metadata the reporter needs but the engine never sees.
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub executable: String,
    pub pid: u32,
    pub sample_rate: f64,
    pub wordsize: u64,
}

/// One table row, with the sample counts converted to an estimated byte
/// volume using `ReportMeta::sample_rate` and `ReportMeta::wordsize`.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub label: String,
    pub light_bytes: f64,
    pub total_bytes: f64,
    pub upper_bytes: f64,
}

fn to_bytes(samples: i64, meta: &ReportMeta) -> f64 {
    samples as f64 / meta.sample_rate * meta.wordsize as f64
}

/// Renders the top `top_n` heavy hitters, sorted by descending `light`
/// weight (ties broken by declaration order, since `output()` already
/// sorted that way), as a plain-text table.
pub fn render<X: Symbol + std::fmt::Display>(
    report: &OutputReport<X>,
    meta: &ReportMeta,
    top_n: usize,
    mut out: impl Write,
) -> Result<()> {
    writeln!(
        out,
        "hitterpatch: {} (pid {}), {} samples observed",
        meta.executable, meta.pid, report.grand_total
    )?;
    writeln!(out, "{:>12} {:>12} {:>12}  allocation site chain", "light", "total", "upper")?;

    for row in rows(report, meta).into_iter().take(top_n) {
        writeln!(
            out,
            "{:>12.0} {:>12.0} {:>12.0}  {}",
            row.light_bytes, row.total_bytes, row.upper_bytes, row.label
        )?;
    }
    Ok(())
}

/// Converts an `OutputReport`'s items into display-ready rows, without
/// truncating or doing any I/O — kept separate from `render` so tests can
/// check the numbers without parsing text.
pub fn rows<X: Symbol + std::fmt::Display>(
    report: &OutputReport<X>,
    meta: &ReportMeta,
) -> Vec<ReportRow> {
    report
        .items
        .iter()
        .map(|item| to_row(item, meta))
        .collect()
}

fn to_row<X: Symbol + std::fmt::Display>(item: &HeavyHitter<X>, meta: &ReportMeta) -> ReportRow {
    ReportRow {
        label: item
            .label
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" -> "),
        light_bytes: to_bytes(item.light, meta),
        total_bytes: to_bytes(item.total, meta),
        upper_bytes: to_bytes(item.upper, meta),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> ReportMeta {
        ReportMeta {
            executable: "demo".to_string(),
            pid: 1234,
            sample_rate: 1.0,
            wordsize: 8,
        }
    }

    #[test]
    fn converts_samples_to_bytes() {
        let report = OutputReport {
            items: vec![HeavyHitter {
                label: vec![1u64, 2, 3],
                light: 10,
                total: 20,
                upper: 25,
            }],
            grand_total: 20,
        };
        let rows = rows(&report, &meta());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].light_bytes, 80.0);
        assert_eq!(rows[0].total_bytes, 160.0);
        assert_eq!(rows[0].label, "1 -> 2 -> 3");
    }

    #[test]
    fn render_truncates_to_top_n() {
        let report = OutputReport {
            items: (0..5)
                .map(|i| HeavyHitter {
                    label: vec![i as u64],
                    light: 10 - i as i64,
                    total: 10 - i as i64,
                    upper: 10 - i as i64,
                })
                .collect(),
            grand_total: 50,
        };
        let mut buf = Vec::new();
        render(&report, &meta(), 2, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 4);
    }
}
