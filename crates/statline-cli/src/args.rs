// Command-line argument definitions for the `statline` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use statline_core::report::SortOrder;
use statline_core::{PositionGroup, Sport};

/// Normalize player season statistics into 40-99 VOR ratings.
#[derive(Debug, Parser)]
#[command(name = "statline", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding config/engine.toml
    #[arg(long, global = true, env = "STATLINE_DIR", default_value = ".")]
    pub base_dir: PathBuf,

    /// Override [rating] active_threshold for this run
    #[arg(long, global = true)]
    pub active_threshold: Option<f64>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rate every player in a snapshot and write the rated records as JSON
    Rate(RateArgs),

    /// Per-group distribution report
    Report(ReportArgs),

    /// Filtered leaderboard of rated players
    Top(TopArgs),

    /// Term-by-term breakdown of one player's raw score and rating
    Explain(ExplainArgs),

    /// Write config/engine.toml with the built-in defaults
    Init,
}

#[derive(Debug, Args)]
pub struct SnapshotArg {
    /// Snapshot file (.json or .csv)
    pub snapshot: PathBuf,
}

#[derive(Debug, Args)]
pub struct RateArgs {
    #[command(flatten)]
    pub input: SnapshotArg,

    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compact single-line JSON
    #[arg(long)]
    pub compact: bool,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub input: SnapshotArg,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TopArgs {
    #[command(flatten)]
    pub input: SnapshotArg,

    /// NBA or NFL
    #[arg(long)]
    pub sport: Option<Sport>,

    /// Position group label, e.g. NFL_QB
    #[arg(long, value_parser = parse_group)]
    pub group: Option<PositionGroup>,

    /// Team code
    #[arg(long)]
    pub team: Option<String>,

    /// Case-insensitive name substring
    #[arg(long)]
    pub name: Option<String>,

    #[arg(long, value_enum, default_value_t = SortArg::Rating)]
    pub sort: SortArg,

    #[arg(short = 'n', long, default_value_t = 25)]
    pub limit: usize,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub input: SnapshotArg,

    /// Player id
    pub id: String,

    /// Emit JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortArg {
    Rating,
    Name,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Rating => SortOrder::Rating,
            SortArg::Name => SortOrder::Name,
        }
    }
}

fn parse_group(s: &str) -> Result<PositionGroup, String> {
    PositionGroup::from_label(s).ok_or_else(|| {
        let labels: Vec<_> = PositionGroup::ALL.iter().map(|g| g.label()).collect();
        format!("unknown position group `{s}` (expected one of {})", labels.join(", "))
    })
}
