// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Aggregate race results into career standings", long_about = None)]
#[command(group(clap::ArgGroup::new("inputs").required(true).multiple(true).args(["results", "workbook", "seed"])))]
pub struct Args {
    /// Root of the per-season result directories (`<root>/<year>/<Event>Day <N>.csv`)
    #[arg(short, long)]
    pub results: Option<PathBuf>,

    /// Spreadsheet workbook with one sheet per season
    #[arg(short, long)]
    pub workbook: Option<PathBuf>,

    /// JSON competitor list to start from (same shape as the output)
    #[arg(short, long)]
    pub seed: Option<PathBuf>,

    /// Where to write the JSON standings; stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TOML file overriding layout, category and matching settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Worker threads for parsing; defaults to one per core
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}
