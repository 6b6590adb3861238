// Rating normalization: raw score -> z-score within its group -> 40..=99.

use tracing::warn;

use crate::distribution::{Distribution, DistributionMap};
use crate::model::ScoredPlayer;

/// Rating of a player exactly at the group mean.
pub const RATING_CENTER: f64 = 75.0;
/// Rating points per standard deviation.
pub const POINTS_PER_STDDEV: f64 = 10.0;
pub const RATING_FLOOR: u8 = 40;
pub const RATING_CEILING: u8 = 99;

/// Raw scores at or below this are inactive and always get the floor.
pub const INACTIVE_EPSILON: f64 = 0.1;

/// Standard deviations below this are treated as zero.
const STDEV_EPSILON: f64 = 1e-9;

/// z-score of `raw_score` against `distribution`.
///
/// A zero (or vanishing) standard deviation divides by 1 instead, so a group
/// where everyone scored the same centres on the mean rather than faulting.
pub fn compute_zscore(raw_score: f64, distribution: &Distribution) -> f64 {
    let divisor = if distribution.stddev < STDEV_EPSILON {
        1.0
    } else {
        distribution.stddev
    };
    (raw_score - distribution.mean) / divisor
}

/// Map a raw score onto the bounded rating scale.
///
/// `round(75 + 10z)`, clamped to `[40, 99]`. Inactive players
/// (`raw_score <= 0.1`) get 40 whatever the z-score says.
pub fn normalize(raw_score: f64, distribution: &Distribution) -> u8 {
    if raw_score <= INACTIVE_EPSILON {
        return RATING_FLOOR;
    }
    let z = compute_zscore(raw_score, distribution);
    let scaled = (RATING_CENTER + z * POINTS_PER_STDDEV).round();
    if scaled.is_nan() {
        return RATING_FLOOR;
    }
    scaled.clamp(RATING_FLOOR as f64, RATING_CEILING as f64) as u8
}

/// Rate a scored player against the snapshot's distributions.
///
/// A group missing from the map gets the floor and a warning.
pub fn rate(player: &ScoredPlayer, distributions: &DistributionMap) -> u8 {
    match distributions.distribution(player.group) {
        Some(distribution) => normalize(player.raw_score, &distribution),
        None => {
            warn!(
                "no distribution for group {} (player {}), assigning floor rating",
                player.group, player.record.id
            );
            RATING_FLOOR
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
