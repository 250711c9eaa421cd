// src/main.rs

mod accumulator;
mod aggregate;
mod cli;
mod competitors;
mod config;
mod events;
mod model;
mod source;
mod stats;

use aggregate::Aggregator;
use anyhow::Context;
use clap::Parser;
use cli::Args;
use config::Config;
use model::Competitor;
use source::Workbook;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bmx_standings=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let start_time = Instant::now();

    let config = Config::load(args.config.as_deref())?;
    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let mut aggregator = Aggregator::new(config);

    if let Some(seed) = &args.seed {
        aggregator.seed(load_seed(seed)?);
    }

    if let Some(path) = &args.workbook {
        match Workbook::open(path) {
            Ok(mut workbook) => aggregator.ingest_workbook(&mut workbook),
            Err(e) => tracing::warn!("Skipping workbook: {}", e),
        }
    }

    if let Some(root) = &args.results {
        if let Err(e) = aggregator.ingest_results_dir(root) {
            tracing::warn!("Skipping result files: {}", e);
        }
    }

    let totals = aggregator.totals();
    let competitors = aggregator.finish();
    tracing::info!(
        competitors = competitors.len(),
        sources = totals.sources,
        failed_sources = totals.failed_sources,
        rows = totals.rows_applied,
        skipped_rows = totals.rows_skipped,
        results = totals.entries,
        "Aggregation finished in {:.2?}",
        start_time.elapsed()
    );

    write_output(&competitors, args.output.as_deref(), args.pretty)?;
    Ok(())
}

fn load_seed(path: &Path) -> anyhow::Result<Vec<Competitor>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Cannot read seed {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid seed {}", path.display()))
}

fn write_output(competitors: &[Competitor], output: Option<&Path>, pretty: bool) -> anyhow::Result<()> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Cannot create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    if pretty {
        serde_json::to_writer_pretty(&mut writer, competitors)?;
    } else {
        serde_json::to_writer(&mut writer, competitors)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
