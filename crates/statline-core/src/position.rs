// Position classification: (sport, free-text label) -> canonical group.
//
// Football labels are matched against one ordered rule table. Earlier rules
// win, so specialists and defense are checked before the skill positions.
// Short abbreviations only ever match as whole labels; substring matching is
// reserved for verbose titles that cannot collide with an abbreviation
// ("CORNERBACK" contains "RB", which must never reach the running backs).

use std::fmt;

use serde::{Serialize, Serializer};

use crate::model::Sport;

// ---------------------------------------------------------------------------
// Position groups
// ---------------------------------------------------------------------------

/// Canonical bucket that scopes statistical comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PositionGroup {
    Basketball,
    Quarterback,
    RunningBack,
    WideReceiver,
    TightEnd,
    Linebacker,
    DefensiveTackle,
    DefensiveEnd,
    Cornerback,
    Safety,
    OffensiveLine,
    Kicker,
    Punter,
    Fullback,
    LongSnapper,
    Other,
}

impl PositionGroup {
    /// Every group, in display order.
    pub const ALL: [PositionGroup; 16] = [
        PositionGroup::Basketball,
        PositionGroup::Quarterback,
        PositionGroup::RunningBack,
        PositionGroup::WideReceiver,
        PositionGroup::TightEnd,
        PositionGroup::Linebacker,
        PositionGroup::DefensiveTackle,
        PositionGroup::DefensiveEnd,
        PositionGroup::Cornerback,
        PositionGroup::Safety,
        PositionGroup::OffensiveLine,
        PositionGroup::Kicker,
        PositionGroup::Punter,
        PositionGroup::Fullback,
        PositionGroup::LongSnapper,
        PositionGroup::Other,
    ];

    /// Stable short label (`NBA`, `NFL_QB`, ...).
    pub fn label(&self) -> &'static str {
        match self {
            PositionGroup::Basketball => "NBA",
            PositionGroup::Quarterback => "NFL_QB",
            PositionGroup::RunningBack => "NFL_RB",
            PositionGroup::WideReceiver => "NFL_WR",
            PositionGroup::TightEnd => "NFL_TE",
            PositionGroup::Linebacker => "NFL_LB",
            PositionGroup::DefensiveTackle => "NFL_DT",
            PositionGroup::DefensiveEnd => "NFL_DE",
            PositionGroup::Cornerback => "NFL_CB",
            PositionGroup::Safety => "NFL_S",
            PositionGroup::OffensiveLine => "NFL_OL",
            PositionGroup::Kicker => "NFL_K",
            PositionGroup::Punter => "NFL_P",
            PositionGroup::Fullback => "NFL_FB",
            PositionGroup::LongSnapper => "NFL_LS",
            PositionGroup::Other => "NFL_OTHER",
        }
    }

    /// Parse a label produced by [`PositionGroup::label`], case-insensitively.
    pub fn from_label(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        Self::ALL.into_iter().find(|g| g.label() == upper)
    }

    pub fn sport(&self) -> Sport {
        match self {
            PositionGroup::Basketball => Sport::Basketball,
            _ => Sport::Football,
        }
    }
}

impl Serialize for PositionGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl fmt::Display for PositionGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Rule table
// ---------------------------------------------------------------------------

/// One entry of the ordered football rule table.
struct PositionRule {
    group: PositionGroup,
    /// Whole-label matches after normalization.
    exact: &'static [&'static str],
    /// Verbose titles matched anywhere in the label.
    titles: &'static [&'static str],
}

impl PositionRule {
    fn matches(&self, label: &str) -> bool {
        self.exact.contains(&label) || self.titles.iter().any(|t| label.contains(t))
    }
}

/// Football precedence, first match wins: specialists, offensive line,
/// defense, skill positions. Anything left over is `Other`.
const FOOTBALL_RULES: &[PositionRule] = &[
    // Specialists
    PositionRule {
        group: PositionGroup::LongSnapper,
        exact: &["LS", "LONG SNAPPER", "SNAPPER"],
        titles: &["LONG SNAPPER"],
    },
    PositionRule {
        group: PositionGroup::Fullback,
        exact: &["FB", "FULLBACK", "FULL BACK"],
        titles: &[],
    },
    PositionRule {
        group: PositionGroup::Punter,
        exact: &["P", "PUNTER"],
        titles: &["PUNTER"],
    },
    PositionRule {
        group: PositionGroup::Kicker,
        exact: &["K", "PK", "KICKER", "PLACE KICKER", "PLACEKICKER"],
        titles: &["KICKER"],
    },
    // Offensive line
    PositionRule {
        group: PositionGroup::OffensiveLine,
        exact: &[
            "OL", "OT", "OG", "C", "T", "G", "LT", "RT", "LG", "RG", "TACKLE", "GUARD", "CENTER",
            "OFFENSIVE TACKLE", "OFFENSIVE GUARD", "OFFENSIVE LINE", "OFFENSIVE LINEMAN",
        ],
        titles: &["OFFENSIVE TACKLE", "OFFENSIVE GUARD", "OFFENSIVE LINE"],
    },
    // Defense
    PositionRule {
        group: PositionGroup::Linebacker,
        exact: &["LB", "ILB", "OLB", "MLB", "WLB", "SLB", "LINEBACKER"],
        titles: &["LINEBACKER"],
    },
    PositionRule {
        group: PositionGroup::DefensiveTackle,
        exact: &["DT", "NT", "DL", "DEFENSIVE TACKLE", "NOSE TACKLE", "DEFENSIVE LINEMAN"],
        titles: &["DEFENSIVE TACKLE", "NOSE TACKLE"],
    },
    PositionRule {
        group: PositionGroup::DefensiveEnd,
        exact: &["DE", "EDGE", "LEO", "RUSH", "DEFENSIVE END"],
        titles: &["DEFENSIVE END"],
    },
    PositionRule {
        group: PositionGroup::Cornerback,
        exact: &["CB", "DB", "CORNER", "CORNERBACK", "DEFENSIVE BACK"],
        titles: &["CORNERBACK"],
    },
    PositionRule {
        group: PositionGroup::Safety,
        exact: &["S", "FS", "SS", "SAF", "SAFETY", "FREE SAFETY", "STRONG SAFETY"],
        titles: &["SAFETY"],
    },
    // Skill positions
    PositionRule {
        group: PositionGroup::Quarterback,
        exact: &["QB", "QUARTERBACK"],
        titles: &["QUARTERBACK"],
    },
    PositionRule {
        group: PositionGroup::RunningBack,
        exact: &["RB", "HB", "TB", "RUNNING BACK", "HALFBACK", "TAILBACK"],
        titles: &["RUNNING BACK"],
    },
    PositionRule {
        group: PositionGroup::WideReceiver,
        exact: &["WR", "SE", "FL", "WIDE RECEIVER", "RECEIVER", "SLOT RECEIVER"],
        titles: &["WIDE RECEIVER"],
    },
    PositionRule {
        group: PositionGroup::TightEnd,
        exact: &["TE", "TIGHT END"],
        titles: &["TIGHT END"],
    },
];

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Canonical form of a raw label: trimmed, uppercased, `-`/`_` treated as
/// spaces, runs of whitespace collapsed.
pub fn normalize_label(raw: &str) -> String {
    raw.to_uppercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Map a record's sport and raw position label to its position group.
///
/// Never fails: missing or unrecognized football labels land in
/// [`PositionGroup::Other`]. Basketball is a single group whatever the label.
pub fn classify(sport: Sport, raw_position: Option<&str>) -> PositionGroup {
    match sport {
        Sport::Basketball => PositionGroup::Basketball,
        Sport::Football => {
            let label = raw_position.map(normalize_label).unwrap_or_default();
            if label.is_empty() {
                return PositionGroup::Other;
            }
            FOOTBALL_RULES
                .iter()
                .find(|rule| rule.matches(&label))
                .map(|rule| rule.group)
                .unwrap_or(PositionGroup::Other)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn nfl(label: &str) -> PositionGroup {
        classify(Sport::Football, Some(label))
    }

    #[test]
    fn basketball_is_one_group() {
        for label in ["PG", "C", "Forward", "", "anything"] {
            assert_eq!(classify(Sport::Basketball, Some(label)), PositionGroup::Basketball);
        }
        assert_eq!(classify(Sport::Basketball, None), PositionGroup::Basketball);
    }

    #[test]
    fn normalization_trims_and_uppercases() {
        assert_eq!(normalize_label("  defensive   end "), "DEFENSIVE END");
        assert_eq!(normalize_label("long-snapper"), "LONG SNAPPER");
        assert_eq!(normalize_label("Place_Kicker"), "PLACE KICKER");
    }

    #[test]
    fn cornerback_with_whitespace_and_case() {
        assert_eq!(nfl(" cornerback "), PositionGroup::Cornerback);
        assert_eq!(nfl("CORNERBACK"), PositionGroup::Cornerback);
        assert_eq!(nfl("Cornerback"), nfl("CORNERBACK"));
    }

    #[test]
    fn cornerback_never_matches_running_back() {
        // "CORNERBACK" contains "RB"; "CB" contains "B".
        assert_ne!(nfl("CORNERBACK"), PositionGroup::RunningBack);
        assert_eq!(nfl("CB"), PositionGroup::Cornerback);
        assert_eq!(nfl("DB"), PositionGroup::Cornerback);
    }

    #[test]
    fn linebacker_titles_are_not_backs() {
        assert_eq!(nfl("OUTSIDE LINEBACKER"), PositionGroup::Linebacker);
        assert_eq!(nfl("Inside Linebacker"), PositionGroup::Linebacker);
        assert_eq!(nfl("OLB"), PositionGroup::Linebacker);
    }

    #[test]
    fn specialists_win_over_everything() {
        assert_eq!(nfl("LS"), PositionGroup::LongSnapper);
        assert_eq!(nfl("Long Snapper"), PositionGroup::LongSnapper);
        assert_eq!(nfl("FB"), PositionGroup::Fullback);
        assert_eq!(nfl("Fullback"), PositionGroup::Fullback);
        assert_eq!(nfl("P"), PositionGroup::Punter);
        assert_eq!(nfl("Punter"), PositionGroup::Punter);
        assert_eq!(nfl("K"), PositionGroup::Kicker);
        assert_eq!(nfl("PK"), PositionGroup::Kicker);
        assert_eq!(nfl("Place Kicker"), PositionGroup::Kicker);
        assert_eq!(nfl("PLACEKICKER"), PositionGroup::Kicker);
    }

    #[test]
    fn offensive_line_exact_set() {
        for label in ["OT", "OG", "C", "OL", "T", "G", "Tackle", "Guard", "Center", "Offensive Tackle"] {
            assert_eq!(nfl(label), PositionGroup::OffensiveLine, "label {label}");
        }
    }

    #[test]
    fn defensive_line_split() {
        assert_eq!(nfl("DT"), PositionGroup::DefensiveTackle);
        assert_eq!(nfl("Nose Tackle"), PositionGroup::DefensiveTackle);
        assert_eq!(nfl("Defensive Tackle"), PositionGroup::DefensiveTackle);
        assert_eq!(nfl("DE"), PositionGroup::DefensiveEnd);
        assert_eq!(nfl("EDGE"), PositionGroup::DefensiveEnd);
        assert_eq!(nfl("Defensive End"), PositionGroup::DefensiveEnd);
    }

    #[test]
    fn generic_defensive_line_rates_with_tackles() {
        assert_eq!(nfl("DL"), PositionGroup::DefensiveTackle);
        assert_eq!(nfl("Defensive Lineman"), PositionGroup::DefensiveTackle);
    }

    #[test]
    fn defensive_tackle_is_not_offensive_line() {
        // Plain "TACKLE" is offensive line; the verbose defensive title is not.
        assert_eq!(nfl("TACKLE"), PositionGroup::OffensiveLine);
        assert_eq!(nfl("DEFENSIVE TACKLE"), PositionGroup::DefensiveTackle);
    }

    #[test]
    fn safeties() {
        for label in ["S", "FS", "SS", "Safety", "Free Safety", "Strong Safety"] {
            assert_eq!(nfl(label), PositionGroup::Safety, "label {label}");
        }
    }

    #[test]
    fn skill_positions() {
        assert_eq!(nfl("QB"), PositionGroup::Quarterback);
        assert_eq!(nfl("Quarterback"), PositionGroup::Quarterback);
        assert_eq!(nfl("RB"), PositionGroup::RunningBack);
        assert_eq!(nfl("Halfback"), PositionGroup::RunningBack);
        assert_eq!(nfl("Running Back"), PositionGroup::RunningBack);
        assert_eq!(nfl("WR"), PositionGroup::WideReceiver);
        assert_eq!(nfl("Wide Receiver"), PositionGroup::WideReceiver);
        assert_eq!(nfl("TE"), PositionGroup::TightEnd);
        assert_eq!(nfl("Tight End"), PositionGroup::TightEnd);
    }

    #[test]
    fn unknown_and_missing_labels_are_other() {
        assert_eq!(nfl("Unknown"), PositionGroup::Other);
        assert_eq!(nfl("B"), PositionGroup::Other);
        assert_eq!(nfl(""), PositionGroup::Other);
        assert_eq!(nfl("   "), PositionGroup::Other);
        assert_eq!(classify(Sport::Football, None), PositionGroup::Other);
    }

    #[test]
    fn labels_round_trip() {
        for group in PositionGroup::ALL {
            assert_eq!(PositionGroup::from_label(group.label()), Some(group));
        }
        assert_eq!(PositionGroup::from_label("nfl_qb"), Some(PositionGroup::Quarterback));
        assert_eq!(PositionGroup::from_label("NFL_XX"), None);
    }
}
