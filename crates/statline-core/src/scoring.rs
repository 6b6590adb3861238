// Raw production score: one declarative weight table per position group.
//
// Every (sport, group) pair maps to a fixed list of terms. The weights are
// part of the observable contract: changing any of them changes ratings, so
// the table carries a version number that travels with rated output.

use serde::Serialize;

use crate::model::{Sport, StatLine};
use crate::position::PositionGroup;

/// Version of the weight table below. Bump on any weight change.
pub const FORMULA_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Terms
// ---------------------------------------------------------------------------

/// One additive component of a raw score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Term {
    /// `sum(fields) * weight`. Negative weights are penalties.
    Weighted {
        label: &'static str,
        fields: &'static [&'static str],
        weight: f64,
    },
    /// `sum(fields) / unit`, e.g. one point per 25 passing yards.
    PerUnit {
        label: &'static str,
        fields: &'static [&'static str],
        unit: f64,
    },
    /// `max(attempts - made, 0) * weight`.
    Shortfall {
        label: &'static str,
        attempts: &'static str,
        made: &'static str,
        weight: f64,
    },
    /// Flat `bonus` when `field` is strictly above `above`.
    Bonus {
        label: &'static str,
        field: &'static str,
        above: f64,
        bonus: f64,
    },
}

const fn times(label: &'static str, fields: &'static [&'static str], weight: f64) -> Term {
    Term::Weighted {
        label,
        fields,
        weight,
    }
}

const fn per(label: &'static str, fields: &'static [&'static str], unit: f64) -> Term {
    Term::PerUnit {
        label,
        fields,
        unit,
    }
}

impl Term {
    pub fn label(&self) -> &'static str {
        match *self {
            Term::Weighted { label, .. }
            | Term::PerUnit { label, .. }
            | Term::Shortfall { label, .. }
            | Term::Bonus { label, .. } => label,
        }
    }

    /// Contribution of this term for the given stat line.
    pub fn evaluate(&self, stats: &StatLine) -> f64 {
        match *self {
            Term::Weighted { fields, weight, .. } => stats.sum(fields) * weight,
            Term::PerUnit { fields, unit, .. } => stats.sum(fields) / unit,
            Term::Shortfall {
                attempts,
                made,
                weight,
                ..
            } => (stats.get(attempts) - stats.get(made)).max(0.0) * weight,
            Term::Bonus {
                field, above, bonus, ..
            } => {
                if stats.get(field) > above {
                    bonus
                } else {
                    0.0
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Weight table
// ---------------------------------------------------------------------------

const FUMBLES: &[&str] = &["rushingFumbles", "receivingFumbles"];

const BASKETBALL: &[Term] = &[
    times("points", &["ppg"], 1.0),
    times("rebounds", &["rpg"], 1.2),
    times("assists", &["apg"], 1.5),
    times("steals", &["stl"], 2.0),
    times("blocks", &["blk"], 2.0),
    times("turnovers", &["turnovers"], -1.0),
    Term::Bonus {
        label: "shooting efficiency",
        field: "fgPct",
        above: 50.0,
        bonus: 2.0,
    },
];

const QUARTERBACK: &[Term] = &[
    per("passing yards", &["passingYards"], 25.0),
    times("passing touchdowns", &["passingTouchdowns"], 4.0),
    times("interceptions thrown", &["passingInts"], -2.0),
    times("sacks taken", &["passingSacks"], -0.5),
    per("rushing yards", &["rushingYards"], 10.0),
    times("rushing touchdowns", &["rushingTouchdowns"], 6.0),
    times("fumbles", FUMBLES, -2.0),
];

const RUNNING_BACK: &[Term] = &[
    per("rushing yards", &["rushingYards"], 10.0),
    times("rushing touchdowns", &["rushingTouchdowns"], 6.0),
    per("receiving yards", &["receivingYards"], 10.0),
    times("receiving touchdowns", &["receivingTouchdowns"], 6.0),
    times("receptions", &["receptions"], 0.5),
    times("fumbles", FUMBLES, -2.0),
];

/// Shared by wide receivers and tight ends; the groups stay separate for
/// normalization.
const RECEIVER: &[Term] = &[
    per("receiving yards", &["receivingYards"], 10.0),
    times("receiving touchdowns", &["receivingTouchdowns"], 6.0),
    times("receptions", &["receptions"], 1.0),
    times("fumbles", FUMBLES, -2.0),
];

const LINEBACKER: &[Term] = &[
    times("tackles", &["tackles"], 1.5),
    times("sacks", &["sacks"], 4.0),
    times("interceptions", &["defInterceptions"], 5.0),
    times("forced fumbles", &["fumblesForced"], 3.0),
];

const CORNERBACK: &[Term] = &[
    times("tackles", &["tackles"], 1.0),
    times("interceptions", &["defInterceptions"], 6.0),
    times("interception return touchdowns", &["intTouchdowns"], 6.0),
    times("passes defended", &["passesDefended"], 3.0),
];

const SAFETY: &[Term] = &[
    times("tackles", &["tackles"], 1.2),
    times("interceptions", &["defInterceptions"], 6.0),
    times("sacks", &["sacks"], 3.0),
];

const DEFENSIVE_END: &[Term] = &[
    times("sacks", &["sacks"], 5.0),
    times("tackles", &["tackles"], 1.0),
    times("forced fumbles", &["fumblesForced"], 4.0),
];

/// Counting stats are scarce on the interior, so each event weighs more.
const DEFENSIVE_TACKLE: &[Term] = &[
    times("tackles", &["tackles"], 2.0),
    times("sacks", &["sacks"], 6.0),
];

/// No counting stats exist for linemen; games played is the reliability proxy.
const OFFENSIVE_LINE: &[Term] = &[times("games played", &["gamesPlayed"], 10.0)];

const KICKER: &[Term] = &[
    times("field goals made", &["fieldGoalsMade"], 3.0),
    Term::Shortfall {
        label: "field goals missed",
        attempts: "fieldGoalsAtt",
        made: "fieldGoalsMade",
        weight: -1.0,
    },
];

const PUNTER: &[Term] = &[
    times("punts", &["punts"], 1.0),
    times("games played", &["gamesPlayed"], 2.0),
];

const FULLBACK: &[Term] = &[
    times("games played", &["gamesPlayed"], 5.0),
    times("scrimmage yards", &["rushingYards", "receivingYards"], 1.0),
    times("receptions", &["receptions"], 2.0),
    times("scrimmage touchdowns", &["rushingTouchdowns", "receivingTouchdowns"], 10.0),
];

const LONG_SNAPPER: &[Term] = &[
    times("games played", &["gamesPlayed"], 8.0),
    times("tackles", &["tackles"], 5.0),
];

const OTHER: &[Term] = &[times("games played", &["gamesPlayed"], 2.0)];

/// Added to every football player regardless of group.
const SPECIAL_TEAMS: &[Term] = &[
    per("return yards", &["kickReturnYards", "puntReturnYards"], 20.0),
    times(
        "return touchdowns",
        &["kickReturnTouchdowns", "puntReturnTouchdowns"],
        6.0,
    ),
];

/// Group-specific terms for a position group.
pub fn formula_for(group: PositionGroup) -> &'static [Term] {
    match group {
        PositionGroup::Basketball => BASKETBALL,
        PositionGroup::Quarterback => QUARTERBACK,
        PositionGroup::RunningBack => RUNNING_BACK,
        PositionGroup::WideReceiver | PositionGroup::TightEnd => RECEIVER,
        PositionGroup::Linebacker => LINEBACKER,
        PositionGroup::Cornerback => CORNERBACK,
        PositionGroup::Safety => SAFETY,
        PositionGroup::DefensiveEnd => DEFENSIVE_END,
        PositionGroup::DefensiveTackle => DEFENSIVE_TACKLE,
        PositionGroup::OffensiveLine => OFFENSIVE_LINE,
        PositionGroup::Kicker => KICKER,
        PositionGroup::Punter => PUNTER,
        PositionGroup::Fullback => FULLBACK,
        PositionGroup::LongSnapper => LONG_SNAPPER,
        PositionGroup::Other => OTHER,
    }
}

/// All terms that apply to a (sport, group) pair, in evaluation order.
pub fn terms_for(sport: Sport, group: PositionGroup) -> impl Iterator<Item = &'static Term> {
    let bonus: &'static [Term] = match sport {
        Sport::Football => SPECIAL_TEAMS,
        Sport::Basketball => &[],
    };
    formula_for(group).iter().chain(bonus.iter())
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Raw production score, floored at zero.
///
/// Heavy penalty terms can drive the sum negative; those players score 0.
/// A sum that overflows to a non-finite value also scores 0.
pub fn raw_score(stats: &StatLine, sport: Sport, group: PositionGroup) -> f64 {
    let total: f64 = terms_for(sport, group).map(|t| t.evaluate(stats)).sum();
    clamp_raw(total)
}

fn clamp_raw(total: f64) -> f64 {
    if total.is_finite() {
        total.max(0.0)
    } else {
        0.0
    }
}

/// A single term's share of a raw score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermContribution {
    pub label: &'static str,
    pub value: f64,
}

/// Term-by-term audit of a raw score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub formula_version: u32,
    pub group: PositionGroup,
    pub contributions: Vec<TermContribution>,
    /// Sum of contributions before the zero floor.
    pub unclamped: f64,
    pub raw_score: f64,
}

/// Evaluate every term separately. `raw_score` matches [`raw_score`].
pub fn explain(stats: &StatLine, sport: Sport, group: PositionGroup) -> ScoreBreakdown {
    let contributions: Vec<TermContribution> = terms_for(sport, group)
        .map(|t| TermContribution {
            label: t.label(),
            value: t.evaluate(stats),
        })
        .collect();
    let unclamped: f64 = contributions.iter().map(|c| c.value).sum();
    ScoreBreakdown {
        formula_version: FORMULA_VERSION,
        group,
        contributions,
        unclamped,
        raw_score: clamp_raw(unclamped),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
