// Read-only views over a rated snapshot: per-group distribution report and
// a filtered leaderboard.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::model::{RatedPlayer, Sport};
use crate::pipeline::RatedSnapshot;
use crate::position::PositionGroup;

/// Players listed at each end of a group in the distribution report.
pub const REPORT_EXTREMES: usize = 3;

// ---------------------------------------------------------------------------
// Ordering
// ---------------------------------------------------------------------------

/// Rating descending, then raw score descending, then id. Total order.
pub fn by_rating_desc(a: &RatedPlayer, b: &RatedPlayer) -> Ordering {
    b.rating
        .cmp(&a.rating)
        .then_with(|| b.raw_score.total_cmp(&a.raw_score))
        .then_with(|| a.record.id.cmp(&b.record.id))
}

fn by_name(a: &RatedPlayer, b: &RatedPlayer) -> Ordering {
    a.record
        .display_name()
        .to_lowercase()
        .cmp(&b.record.display_name().to_lowercase())
        .then_with(|| a.record.id.cmp(&b.record.id))
}

// ---------------------------------------------------------------------------
// Distribution report
// ---------------------------------------------------------------------------

/// Rating buckets used for at-a-glance spread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierCounts {
    /// 90 and above.
    pub elite: usize,
    /// 80 to 89.
    pub strong: usize,
    /// Below 80.
    pub rest: usize,
}

impl TierCounts {
    fn add(&mut self, rating: u8) {
        match rating {
            90..=u8::MAX => self.elite += 1,
            80..=89 => self.strong += 1,
            _ => self.rest += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerLine {
    pub id: String,
    pub name: String,
    pub rating: u8,
    pub raw_score: f64,
}

impl From<&RatedPlayer> for PlayerLine {
    fn from(p: &RatedPlayer) -> Self {
        Self {
            id: p.record.id.clone(),
            name: p.record.display_name().to_string(),
            rating: p.rating,
            raw_score: p.raw_score,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub group: PositionGroup,
    pub total: usize,
    pub active: usize,
    pub mean: f64,
    pub stddev: f64,
    pub fallback: bool,
    pub tiers: TierCounts,
    pub top: Vec<PlayerLine>,
    pub bottom: Vec<PlayerLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionReport {
    pub formula_version: u32,
    pub players: usize,
    pub groups: Vec<GroupReport>,
}

/// Summarize every group in the snapshot, in canonical group order.
pub fn distribution_report(snapshot: &RatedSnapshot) -> DistributionReport {
    let groups = snapshot
        .distributions
        .iter()
        .map(|(group, dist)| {
            let mut members: Vec<&RatedPlayer> =
                snapshot.players.iter().filter(|p| p.group == group).collect();
            members.sort_by(|a, b| by_rating_desc(a, b));

            let mut tiers = TierCounts::default();
            for p in &members {
                tiers.add(p.rating);
            }

            // Bottom entries come only from players not already listed at the top.
            let split = REPORT_EXTREMES.min(members.len());
            let top = members[..split].iter().map(|p| PlayerLine::from(*p)).collect();
            let bottom = members[split..]
                .iter()
                .rev()
                .take(REPORT_EXTREMES)
                .map(|p| PlayerLine::from(*p))
                .collect();

            GroupReport {
                group,
                total: dist.total,
                active: dist.active,
                mean: dist.distribution.mean,
                stddev: dist.distribution.stddev,
                fallback: dist.fallback,
                tiers,
                top,
                bottom,
            }
        })
        .collect();

    DistributionReport {
        formula_version: snapshot.formula_version,
        players: snapshot.players.len(),
        groups,
    }
}

impl fmt::Display for DistributionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "VOR distribution report: {} players, formula v{}",
            self.players, self.formula_version
        )?;
        for group in &self.groups {
            writeln!(f)?;
            write!(f, "{group}")?;
        }
        Ok(())
    }
}

impl fmt::Display for GroupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10} {:>5} players, {:>5} active  mean {:>8.2}  stddev {:>8.2}{}",
            self.group.label(),
            self.total,
            self.active,
            self.mean,
            self.stddev,
            if self.fallback { "  (fallback)" } else { "" }
        )?;
        writeln!(
            f,
            "  tiers: 90+ {}  80-89 {}  <80 {}",
            self.tiers.elite, self.tiers.strong, self.tiers.rest
        )?;
        for (title, lines) in [("top", &self.top), ("bottom", &self.bottom)] {
            if lines.is_empty() {
                continue;
            }
            writeln!(f, "  {title}:")?;
            for line in lines {
                writeln!(f, "    {:>2}  {:>9.2}  {}", line.rating, line.raw_score, line.name)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Rating,
    Name,
}

/// Leaderboard filters. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardFilter {
    pub sport: Option<Sport>,
    pub group: Option<PositionGroup>,
    /// Exact team code, case-insensitive.
    pub team: Option<String>,
    /// Case-insensitive substring of the display name.
    pub name: Option<String>,
    pub sort: SortOrder,
    pub limit: Option<usize>,
}

impl LeaderboardFilter {
    fn accepts(&self, player: &RatedPlayer) -> bool {
        if self.sport.is_some_and(|s| s != player.record.sport) {
            return false;
        }
        if self.group.is_some_and(|g| g != player.group) {
            return false;
        }
        if let Some(team) = &self.team {
            if !player.record.teams.iter().any(|t| t.eq_ignore_ascii_case(team)) {
                return false;
            }
        }
        if let Some(query) = &self.name {
            let query = query.to_lowercase();
            if !player.record.display_name().to_lowercase().contains(&query) {
                return false;
            }
        }
        true
    }
}

/// Filter, sort and truncate the rated players.
pub fn leaderboard<'a>(players: &'a [RatedPlayer], filter: &LeaderboardFilter) -> Vec<&'a RatedPlayer> {
    let mut selected: Vec<&RatedPlayer> = players.iter().filter(|p| filter.accepts(p)).collect();
    match filter.sort {
        SortOrder::Rating => selected.sort_by(|a, b| by_rating_desc(a, b)),
        SortOrder::Name => selected.sort_by(|a, b| by_name(a, b)),
    }
    if let Some(limit) = filter.limit {
        selected.truncate(limit);
    }
    selected
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
