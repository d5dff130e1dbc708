use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

/// Forest-road enrichment CLI (argument schema only)
#[derive(Parser, Debug)]
#[command(name = "skogsveg", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Enrich a road feature collection with environmental attributes
    Enrich(EnrichArgs),
}

#[derive(Args, Debug)]
pub struct EnrichArgs {
    /// Input feature collection (GeoJSON); "-" reads stdin
    #[arg(value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Request date (ISO 8601 date or date-time)
    #[arg(short, long)]
    pub time: String,

    /// Directory holding the deposit and fjord shapefile datasets
    #[arg(long, default_value = "data", value_hint = ValueHint::DirPath)]
    pub data_dir: PathBuf,

    /// Output file (stdout if omitted)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Abandon enrichment after this many seconds
    #[arg(long)]
    pub deadline: Option<u64>,
}
