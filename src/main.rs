use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use rs_1brc_stats::report::render_brc;
use rs_1brc_stats::{Config, Engine, LinePolicy, ReadStrategy, Report};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Write results.json and print a summary.
    Json,
    /// Print `{name=min/mean/max, ...}` on stdout.
    Brc,
}

#[derive(Debug, Parser)]
#[command(version, about = "Per-key min/max/mean over a `key;value` measurements file")]
struct Args {
    /// Measurements file, one `key;value` per line
    input: PathBuf,

    /// Worker threads (defaults to available parallelism)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    workers: Option<u64>,

    /// Smallest nominal chunk in bytes
    #[arg(long, default_value_t = rs_1brc_stats::MIN_CHUNK_SIZE, value_parser = clap::value_parser!(u64).range(1..))]
    min_chunk_size: u64,

    /// Skip malformed lines instead of aborting
    #[arg(long)]
    lenient: bool,

    /// Read the input through a memory map
    #[arg(long)]
    mmap: bool,

    /// Where to write the JSON report
    #[arg(short, long, default_value = "results.json")]
    output: PathBuf,

    /// Stations shown in the range summary
    #[arg(long, default_value_t = 5)]
    top: usize,

    #[arg(long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::default()
            .with_min_chunk_size(self.min_chunk_size)
            .with_policy(if self.lenient { LinePolicy::Lenient } else { LinePolicy::Strict })
            .with_read(if self.mmap { ReadStrategy::Mmap } else { ReadStrategy::Pread });
        if let Some(workers) = self.workers {
            config = config.with_workers(workers as usize);
        }
        config
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .with_thread_names(verbose >= 2)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);
    debug!(?args, "parsed arguments");

    let engine = Engine::new(args.config()).context("invalid configuration")?;
    let outcome = engine
        .run(&args.input)
        .with_context(|| format!("failed to process {}", args.input.display()))?;
    let report = Report::new(&outcome.table, outcome.file_size, outcome.elapsed);

    match args.format {
        Format::Brc => println!("{}", render_brc(&report.stations)),
        Format::Json => {
            report
                .write_json(&args.output)
                .with_context(|| format!("failed to write {}", args.output.display()))?;
            println!();
            print!("{}", report.summary(args.top));
            if outcome.skipped > 0 {
                println!("\nSkipped {} malformed lines", outcome.skipped);
            }
            println!("\nFull results have been written to {}", args.output.display());
        }
    }
    info!(lines = outcome.lines, chunks = outcome.chunks, "done");
    Ok(())
}
