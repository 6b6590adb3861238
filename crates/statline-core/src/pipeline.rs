// Batch pipeline: classify and score every record, estimate group
// distributions, then normalize. Always recomputed from scratch.

use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::config::{EngineConfig, RatingConfig};
use crate::distribution::{analyze, DistributionMap};
use crate::model::{PlayerRecord, RatedPlayer, ScoredPlayer};
use crate::position::classify;
use crate::rating::{rate, RATING_FLOOR};
use crate::scoring::{raw_score, FORMULA_VERSION};
use crate::snapshot::{collect_snapshot, SnapshotError, SnapshotSource};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("snapshot contained no player records")]
    EmptySnapshot,

    #[error("rating task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result of one full rating pass.
#[derive(Debug, Clone, Serialize)]
pub struct RatedSnapshot {
    pub formula_version: u32,
    pub distributions: DistributionMap,
    pub players: Vec<RatedPlayer>,
}

impl RatedSnapshot {
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn find(&self, id: &str) -> Option<&RatedPlayer> {
        self.players.iter().find(|p| p.record.id == id)
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Classify and score a single record.
pub fn score_record(record: PlayerRecord) -> ScoredPlayer {
    let group = classify(record.sport, record.position.as_deref());
    let raw_score = raw_score(&record.stats, record.sport, group);
    ScoredPlayer {
        record,
        group,
        raw_score,
    }
}

/// Score every record in parallel. Output order matches input order.
pub fn score_records(records: Vec<PlayerRecord>) -> Vec<ScoredPlayer> {
    records.into_par_iter().map(score_record).collect()
}

/// Normalize every scored player against a finished distribution map.
pub fn rate_players(scored: Vec<ScoredPlayer>, distributions: &DistributionMap) -> Vec<RatedPlayer> {
    scored
        .into_par_iter()
        .map(|player| {
            let rating = rate(&player, distributions);
            RatedPlayer {
                record: player.record,
                rating,
                group: player.group,
                raw_score: player.raw_score,
            }
        })
        .collect()
}

/// Run the whole transformation over an in-memory snapshot.
pub fn rate_snapshot(
    records: Vec<PlayerRecord>,
    config: &RatingConfig,
) -> Result<RatedSnapshot, EngineError> {
    if records.is_empty() {
        return Err(EngineError::EmptySnapshot);
    }

    let scored = score_records(records);
    let distributions = analyze(&scored, config.active_threshold);
    let players = rate_players(scored, &distributions);

    let floored = players.iter().filter(|p| p.rating == RATING_FLOOR).count();
    info!(
        "rated {} players across {} groups ({} at floor, formula v{})",
        players.len(),
        distributions.len(),
        floored,
        FORMULA_VERSION
    );

    Ok(RatedSnapshot {
        formula_version: FORMULA_VERSION,
        distributions,
        players,
    })
}

/// Load the full snapshot from `source`, then rate it.
///
/// Nothing is rated until every page has arrived; a failed or timed-out load
/// returns the error and no partial result. The CPU-bound rating pass runs on
/// the blocking pool so async workers stay free.
pub async fn load_and_rate(
    source: &dyn SnapshotSource,
    config: &EngineConfig,
) -> Result<RatedSnapshot, EngineError> {
    let records = collect_snapshot(source, &config.snapshot).await?;
    let rating = config.rating.clone();
    tokio::task::spawn_blocking(move || rate_snapshot(records, &rating)).await?
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Sport, StatLine};
    use crate::position::PositionGroup;
    use crate::snapshot::MemorySnapshot;

    fn nba(id: &str, ppg: f64) -> PlayerRecord {
        PlayerRecord::new(id, Sport::Basketball, Some("G"), StatLine::from_pairs(&[("ppg", ppg)]))
    }

    fn lineman(id: &str, games: f64) -> PlayerRecord {
        PlayerRecord::new(id, Sport::Football, Some("OT"), StatLine::from_pairs(&[("gamesPlayed", games)]))
    }

    #[test]
    fn empty_snapshot_is_an_error() {
        let err = rate_snapshot(Vec::new(), &RatingConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::EmptySnapshot));
    }

    #[test]
    fn score_record_classifies_and_scores() {
        let scored = score_record(lineman("ol", 16.0));
        assert_eq!(scored.group, PositionGroup::OffensiveLine);
        assert!((scored.raw_score - 160.0).abs() < 1e-9);
    }

    #[test]
    fn scoring_preserves_input_order() {
        let records: Vec<_> = (0..200).map(|i| nba(&format!("p{i}"), i as f64)).collect();
        let scored = score_records(records);
        for (i, player) in scored.iter().enumerate() {
            assert_eq!(player.record.id, format!("p{i}"));
        }
    }

    #[test]
    fn identical_linemen_all_rate_seventy_five() {
        let records: Vec<_> = (0..5).map(|i| lineman(&format!("ol{i}"), 16.0)).collect();
        let snapshot = rate_snapshot(records, &RatingConfig::default()).unwrap();
        assert!(snapshot.players.iter().all(|p| p.rating == 75));
        let ol = snapshot.distributions.get(PositionGroup::OffensiveLine).unwrap();
        assert_eq!(ol.distribution.stddev, 0.0);
    }

    #[test]
    fn inactive_players_floor_without_moving_the_mean() {
        let records = vec![nba("a", 10.0), nba("b", 20.0), nba("c", 30.0), nba("bench", 0.0)];
        let snapshot = rate_snapshot(records, &RatingConfig::default()).unwrap();
        let dist = snapshot.distributions.get(PositionGroup::Basketball).unwrap();
        assert_eq!(dist.total, 4);
        assert_eq!(dist.active, 3);
        assert!((dist.distribution.mean - 20.0).abs() < 1e-9);
        assert_eq!(snapshot.find("b").unwrap().rating, 75);
        assert_eq!(snapshot.find("bench").unwrap().rating, 40);
    }

    #[test]
    fn unclassified_football_player_rates_in_other() {
        let records = vec![PlayerRecord::new(
            "mystery",
            Sport::Football,
            Some("WIZARD"),
            StatLine::from_pairs(&[("gamesPlayed", 5.0)]),
        )];
        let snapshot = rate_snapshot(records, &RatingConfig::default()).unwrap();
        let player = &snapshot.players[0];
        assert_eq!(player.group, PositionGroup::Other);
        // Sole active member of its group sits at the mean.
        assert_eq!(player.rating, 75);
    }

    #[test]
    fn higher_threshold_shrinks_the_sample() {
        let records = vec![nba("a", 1.0), nba("b", 10.0), nba("c", 20.0)];
        let config = RatingConfig {
            active_threshold: 5.0,
        };
        let snapshot = rate_snapshot(records, &config).unwrap();
        let dist = snapshot.distributions.get(PositionGroup::Basketball).unwrap();
        assert_eq!(dist.active, 2);
        assert!((dist.distribution.mean - 15.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn load_and_rate_from_memory_source() {
        let source = MemorySnapshot::new(vec![nba("a", 10.0), nba("b", 30.0)]);
        let mut config = EngineConfig::default();
        config.snapshot.page_size = 1;
        let snapshot = load_and_rate(&source, &config).await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.formula_version, FORMULA_VERSION);
        // mean 20, stddev 10
        assert_eq!(snapshot.find("a").unwrap().rating, 65);
        assert_eq!(snapshot.find("b").unwrap().rating, 85);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn load_and_rate_leaves_the_runtime_responsive() {
        let records: Vec<_> = (0..5_000).map(|i| nba(&format!("p{i}"), (i % 40) as f64)).collect();
        let source = MemorySnapshot::new(records);

        let ticker = tokio::spawn(async {
            for _ in 0..10 {
                tokio::task::yield_now().await;
            }
            true
        });
        let snapshot = load_and_rate(&source, &EngineConfig::default()).await.unwrap();
        assert!(ticker.await.unwrap());

        assert_eq!(snapshot.len(), 5_000);
        assert_eq!(snapshot.players[0].record.id, "p0");
        assert_eq!(snapshot.players[4_999].record.id, "p4999");
        assert!(snapshot.players.iter().all(|p| (40..=99).contains(&p.rating)));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn load_and_rate_on_a_single_threaded_runtime() {
        let source = MemorySnapshot::new(vec![nba("a", 10.0), nba("b", 30.0)]);
        let snapshot = load_and_rate(&source, &EngineConfig::default()).await.unwrap();
        assert_eq!(snapshot.find("a").unwrap().rating, 65);
        assert_eq!(snapshot.find("b").unwrap().rating, 85);
    }

    #[tokio::test]
    async fn load_and_rate_empty_source_is_an_error() {
        let source = MemorySnapshot::new(Vec::new());
        let err = load_and_rate(&source, &EngineConfig::default()).await.unwrap_err();
        assert!(matches!(err, EngineError::EmptySnapshot));
    }
}
