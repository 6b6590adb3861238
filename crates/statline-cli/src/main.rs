// Statline command-line entry point.
//
// Every snapshot command follows the same sequence:
// 1. Initialize tracing (stderr, so stdout stays clean for JSON)
// 2. Load config/engine.toml, apply command-line overrides, validate
// 3. Open the snapshot file and run the full rating pass
// 4. Render the requested view

mod args;

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use args::{Cli, Commands, ExplainArgs, RateArgs, ReportArgs, TopArgs};
use statline_core::config::{self, EngineConfig};
use statline_core::rating::compute_zscore;
use statline_core::report::{distribution_report, leaderboard, LeaderboardFilter};
use statline_core::scoring::{self, ScoreBreakdown};
use statline_core::{load_and_rate, FileSnapshot, RatedPlayer, RatedSnapshot};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match &cli.command {
        Commands::Init => init_config(&cli.base_dir),
        Commands::Rate(args) => {
            let snapshot = load_snapshot(&cli, &args.input.snapshot).await?;
            write_rated(&snapshot, args)
        }
        Commands::Report(args) => {
            let snapshot = load_snapshot(&cli, &args.input.snapshot).await?;
            print_report(&snapshot, args)
        }
        Commands::Top(args) => {
            let snapshot = load_snapshot(&cli, &args.input.snapshot).await?;
            print_top(&snapshot, args)
        }
        Commands::Explain(args) => {
            let snapshot = load_snapshot(&cli, &args.input.snapshot).await?;
            print_explanation(&snapshot, args)
        }
    }
}

// ---------------------------------------------------------------------------
// Setup
// ---------------------------------------------------------------------------

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let default_filter = if verbose {
        "statline=debug,statline_core=debug,warn"
    } else {
        "statline=info,statline_core=info,warn"
    };

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}

fn load_engine_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let mut engine_config =
        config::load_config_from(&cli.base_dir).context("failed to load configuration")?;
    if let Some(threshold) = cli.active_threshold {
        engine_config.rating.active_threshold = threshold;
        config::validate(&engine_config).context("invalid --active-threshold")?;
    }
    Ok(engine_config)
}

async fn load_snapshot(cli: &Cli, path: &Path) -> anyhow::Result<RatedSnapshot> {
    let engine_config = load_engine_config(cli)?;
    let source = FileSnapshot::open(path)
        .with_context(|| format!("failed to open snapshot {}", path.display()))?;
    info!("Snapshot opened: {} records in {}", source.len(), path.display());

    load_and_rate(&source, &engine_config)
        .await
        .with_context(|| format!("failed to rate snapshot {}", path.display()))
}

fn init_config(base_dir: &Path) -> anyhow::Result<()> {
    let path = config::write_default_config(base_dir).context("failed to write default config")?;
    info!("Wrote default config to {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// Envelope for `statline rate`.
#[derive(Debug, Serialize)]
struct RatedOutput<'a> {
    generated_at: String,
    formula_version: u32,
    players: &'a [RatedPlayer],
}

fn write_rated(snapshot: &RatedSnapshot, args: &RateArgs) -> anyhow::Result<()> {
    let output = RatedOutput {
        generated_at: chrono::Utc::now().to_rfc3339(),
        formula_version: snapshot.formula_version,
        players: &snapshot.players,
    };

    match &args.output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            write_json(std::io::BufWriter::new(file), &output, args.compact)?;
            info!("Wrote {} rated players to {}", snapshot.len(), path.display());
        }
        None => write_json(std::io::stdout().lock(), &output, args.compact)?,
    }
    Ok(())
}

fn write_json<W: Write, T: Serialize>(mut writer: W, value: &T, compact: bool) -> anyhow::Result<()> {
    if compact {
        serde_json::to_writer(&mut writer, value)?;
    } else {
        serde_json::to_writer_pretty(&mut writer, value)?;
    }
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

fn print_report(snapshot: &RatedSnapshot, args: &ReportArgs) -> anyhow::Result<()> {
    let report = distribution_report(snapshot);
    if args.json {
        write_json(std::io::stdout().lock(), &report, false)
    } else {
        print!("{report}");
        Ok(())
    }
}

fn print_top(snapshot: &RatedSnapshot, args: &TopArgs) -> anyhow::Result<()> {
    let filter = LeaderboardFilter {
        sport: args.sport,
        group: args.group,
        team: args.team.clone(),
        name: args.name.clone(),
        sort: args.sort.into(),
        limit: Some(args.limit),
    };
    let board = leaderboard(&snapshot.players, &filter);

    if args.json {
        return write_json(std::io::stdout().lock(), &board, false);
    }

    let mut out = std::io::stdout().lock();
    for (rank, player) in board.iter().enumerate() {
        writeln!(
            out,
            "{:>4}. {:>2}  {:<10} {:<28} {}",
            rank + 1,
            player.rating,
            player.group.label(),
            player.record.display_name(),
            player.record.teams.first().map(String::as_str).unwrap_or("FA"),
        )?;
    }
    Ok(())
}

/// `statline explain` output.
#[derive(Debug, Serialize)]
struct Explanation<'a> {
    id: &'a str,
    name: &'a str,
    breakdown: ScoreBreakdown,
    mean: Option<f64>,
    stddev: Option<f64>,
    z_score: Option<f64>,
    rating: u8,
}

fn print_explanation(snapshot: &RatedSnapshot, args: &ExplainArgs) -> anyhow::Result<()> {
    let Some(player) = snapshot.find(&args.id) else {
        bail!("no player with id `{}` in snapshot", args.id);
    };

    let record = &player.record;
    let breakdown = scoring::explain(&record.stats, record.sport, player.group);
    let distribution = snapshot.distributions.distribution(player.group);
    let explanation = Explanation {
        id: &record.id,
        name: record.display_name(),
        mean: distribution.map(|d| d.mean),
        stddev: distribution.map(|d| d.stddev),
        z_score: distribution.map(|d| compute_zscore(breakdown.raw_score, &d)),
        breakdown,
        rating: player.rating,
    };

    if args.json {
        return write_json(std::io::stdout().lock(), &explanation, false);
    }

    let mut out = std::io::stdout().lock();
    writeln!(
        out,
        "{} ({}) {} formula v{}",
        explanation.name, explanation.id, explanation.breakdown.group, explanation.breakdown.formula_version
    )?;
    for term in &explanation.breakdown.contributions {
        if term.value != 0.0 {
            writeln!(out, "  {:<32} {:>10.2}", term.label, term.value)?;
        }
    }
    writeln!(out, "  {:<32} {:>10.2}", "raw score", explanation.breakdown.raw_score)?;
    if let (Some(mean), Some(stddev), Some(z)) = (explanation.mean, explanation.stddev, explanation.z_score) {
        writeln!(out, "  group mean {mean:.2}, stddev {stddev:.2}, z {z:.2}")?;
    }
    writeln!(out, "  rating {}", explanation.rating)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use statline_core::{rate_snapshot, PlayerRecord, Sport, StatLine};

    #[test]
    fn rated_output_carries_version_and_ratings() {
        let records = vec![
            PlayerRecord::new("a", Sport::Basketball, Some("G"), StatLine::from_pairs(&[("ppg", 10.0)])),
            PlayerRecord::new("b", Sport::Basketball, Some("F"), StatLine::from_pairs(&[("ppg", 30.0)])),
        ];
        let snapshot = rate_snapshot(records, &Default::default()).unwrap();
        let output = RatedOutput {
            generated_at: "2024-01-01T00:00:00+00:00".into(),
            formula_version: snapshot.formula_version,
            players: &snapshot.players,
        };

        let mut buf = Vec::new();
        write_json(&mut buf, &output, true).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(value["formula_version"], snapshot.formula_version);
        assert_eq!(value["players"][0]["id"], "a");
        assert_eq!(value["players"][0]["rating"], 65);
        assert_eq!(value["players"][1]["rating"], 85);
    }
}
