//! Command-line front end: reads an allocation trace, feeds it through the
//! heavy-hitter engine, and prints the top allocation-site chains.

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, Level};

use hitterpatch::config::{Config, DEFAULT_ERROR, DEFAULT_FREQUENCY, DEFAULT_TOP_N, DEFAULT_WORDSIZE};
use hitterpatch::core::Engine;
use hitterpatch::report::{self, ReportMeta};
use hitterpatch::symbols::SymbolTable;
use hitterpatch::trace::TraceReader;

#[derive(Parser)]
#[command(name = "hitterpatch")]
#[command(about = "Streaming approximate heavy-hitter report over an allocation trace")]
struct Cli {
    /// Path to the trace file
    trace_file: PathBuf,

    /// Minimum fraction of total samples an allocation site chain must reach
    /// to be reported
    #[arg(default_value_t = DEFAULT_FREQUENCY)]
    frequency: f64,

    /// Lossy-counting error bound; smaller is more accurate and uses more
    /// memory
    #[arg(default_value_t = DEFAULT_ERROR)]
    error: f64,

    /// Bytes per allocated word, used to convert sample counts to bytes
    #[arg(long, default_value_t = DEFAULT_WORDSIZE)]
    wordsize: u64,

    /// How many rows to print
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    top_n: usize,

    /// Optional sidecar file mapping location codes to source coordinates
    #[arg(long)]
    symbols: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let config = Config::validate(
        cli.trace_file,
        cli.frequency,
        cli.error,
        cli.wordsize,
        cli.top_n,
        cli.symbols,
    )?;

    run(config)
}

fn run(config: Config) -> Result<()> {
    info!(path = %config.trace_path.display(), "opening trace file");
    let file = File::open(&config.trace_path)
        .with_context(|| format!("opening trace file {:?}", config.trace_path))?;
    let mut reader = TraceReader::new(BufReader::new(file));

    let symbols = match &config.symbols_path {
        Some(path) => {
            let f = File::open(path).with_context(|| format!("opening symbol table {path:?}"))?;
            let table = SymbolTable::load(BufReader::new(f))
                .with_context(|| format!("parsing symbol table {path:?}"))?;
            debug!(entries = table.len(), "loaded symbol table");
            Some(table)
        }
        None => None,
    };

    let mut engine = Engine::<u64>::create(config.error);
    let mut records = 0u64;
    while let Some(record) = reader.next_record()? {
        engine
            .insert(record.common_prefix, &record.extension, record.count)
            .context("inserting trace record into heavy-hitter engine")?;
        records += 1;
    }
    info!(records, "finished reading trace");

    let report = engine.output(config.frequency);

    let meta = ReportMeta {
        executable: config
            .trace_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "<unknown>".to_string()),
        pid: 0,
        sample_rate: 1.0,
        wordsize: config.wordsize,
    };

    if let Some(table) = &symbols {
        for item in &report.items {
            for code in &item.label {
                if table.resolve(*code).is_none() {
                    debug!(code, "no symbol table entry for location code");
                }
            }
        }
    }

    let stdout = std::io::stdout();
    report::render(&report, &meta, config.top_n, stdout.lock())?;

    Ok(())
}
