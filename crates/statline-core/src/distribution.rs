// Per-group raw score distributions, estimated over active players only.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use crate::model::ScoredPlayer;
use crate::position::PositionGroup;

/// Raw score a player must strictly exceed to count towards their group's
/// distribution. Rostered-but-unused players sit at or near zero and would
/// otherwise drag the group mean down.
pub const DEFAULT_ACTIVE_THRESHOLD: f64 = 0.5;

/// Used for any group with no active players.
pub const FALLBACK_DISTRIBUTION: Distribution = Distribution {
    mean: 10.0,
    stddev: 1.0,
};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Mean and population standard deviation of a group's raw scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Distribution {
    pub mean: f64,
    pub stddev: f64,
}

/// A group's distribution together with the counts behind it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GroupDistribution {
    #[serde(flatten)]
    pub distribution: Distribution,
    /// Players in the group.
    pub total: usize,
    /// Players above the active threshold (the estimation sample).
    pub active: usize,
    /// True when no player qualified and the fallback was applied.
    pub fallback: bool,
}

/// Distributions for every group present in a snapshot. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DistributionMap(BTreeMap<PositionGroup, GroupDistribution>);

impl DistributionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a group's distribution directly, bypassing estimation.
    pub fn insert(&mut self, group: PositionGroup, distribution: Distribution) {
        self.0.insert(
            group,
            GroupDistribution {
                distribution,
                total: 0,
                active: 0,
                fallback: false,
            },
        );
    }

    pub fn get(&self, group: PositionGroup) -> Option<&GroupDistribution> {
        self.0.get(&group)
    }

    pub fn distribution(&self, group: PositionGroup) -> Option<Distribution> {
        self.0.get(&group).map(|g| g.distribution)
    }

    /// Groups in their canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (PositionGroup, &GroupDistribution)> {
        self.0.iter().map(|(g, d)| (*g, d))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

/// Mean and population standard deviation (N denominator) of `values`.
///
/// Returns `None` for an empty slice. Values are summed in ascending order so
/// the result is bit-identical however the input happens to be ordered.
pub fn compute_distribution(values: &[f64]) -> Option<Distribution> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = sorted.len() as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(Distribution {
        mean,
        stddev: variance.sqrt(),
    })
}

/// Build the distribution map for a fully scored snapshot.
///
/// Each group present in `scored` gets an entry. Only raw scores strictly
/// above `active_threshold` feed the estimate; groups where nobody qualifies
/// get [`FALLBACK_DISTRIBUTION`].
pub fn analyze(scored: &[ScoredPlayer], active_threshold: f64) -> DistributionMap {
    let mut buckets: BTreeMap<PositionGroup, (usize, Vec<f64>)> = BTreeMap::new();
    for player in scored {
        let (total, active) = buckets.entry(player.group).or_default();
        *total += 1;
        if player.raw_score > active_threshold {
            active.push(player.raw_score);
        }
    }

    let mut map = BTreeMap::new();
    for (group, (total, active)) in buckets {
        let entry = match compute_distribution(&active) {
            Some(distribution) => {
                debug!(
                    "{group}: mean {:.2}, stddev {:.2} over {} of {} players",
                    distribution.mean,
                    distribution.stddev,
                    active.len(),
                    total
                );
                GroupDistribution {
                    distribution,
                    total,
                    active: active.len(),
                    fallback: false,
                }
            }
            None => {
                warn!(
                    "{group}: none of {total} players above active threshold {active_threshold}, using fallback distribution"
                );
                GroupDistribution {
                    distribution: FALLBACK_DISTRIBUTION,
                    total,
                    active: 0,
                    fallback: true,
                }
            }
        };
        map.insert(group, entry);
    }
    DistributionMap(map)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlayerRecord, StatLine};

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn scored(id: &str, group: PositionGroup, raw_score: f64) -> ScoredPlayer {
        ScoredPlayer {
            record: PlayerRecord::new(id, group.sport(), None, StatLine::new()),
            group,
            raw_score,
        }
    }

    #[test]
    fn known_values() {
        // Mean 5, population variance 32/8 = 4, stddev 2.
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let d = compute_distribution(&values).unwrap();
        assert!(approx_eq(d.mean, 5.0, 1e-10));
        assert!(approx_eq(d.stddev, 2.0, 1e-10));
    }

    #[test]
    fn single_value_has_zero_stddev() {
        let d = compute_distribution(&[42.0]).unwrap();
        assert!(approx_eq(d.mean, 42.0, 1e-10));
        assert_eq!(d.stddev, 0.0);
    }

    #[test]
    fn empty_has_no_distribution() {
        assert!(compute_distribution(&[]).is_none());
    }

    #[test]
    fn order_does_not_change_bits() {
        let a = [0.1, 0.7, 1e9, 3.3, 2.2, 1e-3];
        let mut b = a;
        b.reverse();
        let da = compute_distribution(&a).unwrap();
        let db = compute_distribution(&b).unwrap();
        assert_eq!(da.mean.to_bits(), db.mean.to_bits());
        assert_eq!(da.stddev.to_bits(), db.stddev.to_bits());
    }

    #[test]
    fn inactive_players_are_excluded() {
        let players = vec![
            scored("a", PositionGroup::Quarterback, 100.0),
            scored("b", PositionGroup::Quarterback, 200.0),
            scored("c", PositionGroup::Quarterback, 0.0),
            scored("d", PositionGroup::Quarterback, 0.5),
        ];
        let map = analyze(&players, DEFAULT_ACTIVE_THRESHOLD);
        let qb = map.get(PositionGroup::Quarterback).unwrap();
        assert_eq!(qb.total, 4);
        assert_eq!(qb.active, 2);
        assert!(!qb.fallback);
        assert!(approx_eq(qb.distribution.mean, 150.0, 1e-10));
        assert!(approx_eq(qb.distribution.stddev, 50.0, 1e-10));
    }

    #[test]
    fn group_with_no_active_players_falls_back() {
        let players = vec![
            scored("a", PositionGroup::LongSnapper, 0.0),
            scored("b", PositionGroup::LongSnapper, 0.2),
        ];
        let map = analyze(&players, DEFAULT_ACTIVE_THRESHOLD);
        let ls = map.get(PositionGroup::LongSnapper).unwrap();
        assert!(ls.fallback);
        assert_eq!(ls.total, 2);
        assert_eq!(ls.active, 0);
        assert_eq!(ls.distribution, FALLBACK_DISTRIBUTION);
    }

    #[test]
    fn groups_are_independent() {
        let players = vec![
            scored("qb", PositionGroup::Quarterback, 300.0),
            scored("k1", PositionGroup::Kicker, 80.0),
            scored("k2", PositionGroup::Kicker, 100.0),
        ];
        let map = analyze(&players, DEFAULT_ACTIVE_THRESHOLD);
        assert_eq!(map.len(), 2);
        assert!(approx_eq(map.distribution(PositionGroup::Kicker).unwrap().mean, 90.0, 1e-10));
        assert!(approx_eq(map.distribution(PositionGroup::Quarterback).unwrap().mean, 300.0, 1e-10));
        assert!(map.get(PositionGroup::Punter).is_none());
    }

    #[test]
    fn single_active_player_is_finite() {
        let players = vec![scored("only", PositionGroup::Fullback, 37.5)];
        let d = analyze(&players, DEFAULT_ACTIVE_THRESHOLD)
            .distribution(PositionGroup::Fullback)
            .unwrap();
        assert!(d.mean.is_finite());
        assert!(d.stddev.is_finite());
        assert_eq!(d.stddev, 0.0);
    }

    #[test]
    fn map_serializes_by_group_label() {
        let mut map = DistributionMap::new();
        map.insert(PositionGroup::Basketball, Distribution { mean: 20.0, stddev: 5.0 });
        let value = serde_json::to_value(&map).unwrap();
        assert_eq!(value["NBA"]["mean"], 20.0);
        assert_eq!(value["NBA"]["stddev"], 5.0);
        assert_eq!(value["NBA"]["fallback"], false);
    }

    #[test]
    fn empty_snapshot_gives_empty_map() {
        let map = analyze(&[], DEFAULT_ACTIVE_THRESHOLD);
        assert!(map.is_empty());
    }
}
