// Player records as supplied by a snapshot source, and the rated output.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::position::PositionGroup;

// ---------------------------------------------------------------------------
// Sport
// ---------------------------------------------------------------------------

/// League a record belongs to. Scoring and classification branch on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum Sport {
    Basketball,
    Football,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown sport `{0}`")]
pub struct UnknownSport(pub String);

impl Sport {
    /// Wire label used by the upstream data provider.
    pub fn label(&self) -> &'static str {
        match self {
            Sport::Basketball => "NBA",
            Sport::Football => "NFL",
        }
    }
}

impl FromStr for Sport {
    type Err = UnknownSport;

    /// Accepts the league abbreviations as well as the long names, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NBA" | "BASKETBALL" => Ok(Sport::Basketball),
            "NFL" | "FOOTBALL" => Ok(Sport::Football),
            _ => Err(UnknownSport(s.to_string())),
        }
    }
}

impl TryFrom<String> for Sport {
    type Error = UnknownSport;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for Sport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Stat line
// ---------------------------------------------------------------------------

/// Sparse map of named season statistics.
///
/// Values arrive as numbers, numeric strings (`"12.5"`, `"0.0"`), nulls or
/// arbitrary junk (`"00:00"`). Reads never fail: anything that does not parse
/// to a finite number reads as `0.0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatLine(BTreeMap<String, Value>);

impl StatLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stat line from numeric pairs.
    pub fn from_pairs(pairs: &[(&str, f64)]) -> Self {
        let mut line = Self::new();
        for (key, value) in pairs {
            line.insert(*key, *value);
        }
        line
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Read a stat as `f64`, defaulting to `0.0`.
    pub fn get(&self, key: &str) -> f64 {
        self.0.get(key).map(parse_stat).unwrap_or(0.0)
    }

    /// Sum of several stats, each read with [`StatLine::get`].
    pub fn sum(&self, keys: &[&str]) -> f64 {
        keys.iter().map(|k| self.get(k)).sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn parse_stat(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite()).unwrap_or(0.0)
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One player as loaded from the snapshot. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub sport: Sport,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub teams: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: StatLine,
}

impl PlayerRecord {
    pub fn new(id: impl Into<String>, sport: Sport, position: Option<&str>, stats: StatLine) -> Self {
        Self {
            id: id.into(),
            name: None,
            sport,
            position: position.map(str::to_string),
            teams: Vec::new(),
            stats,
        }
    }

    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// A record after classification and raw scoring, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPlayer {
    pub record: PlayerRecord,
    pub group: PositionGroup,
    pub raw_score: f64,
}

/// Final output: the original record plus its VOR rating.
///
/// Only `rating` is added to the serialized form. `group` and `raw_score`
/// stay in memory for reports and explanations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatedPlayer {
    #[serde(flatten)]
    pub record: PlayerRecord,
    pub rating: u8,
    #[serde(skip)]
    pub group: PositionGroup,
    #[serde(skip)]
    pub raw_score: f64,
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
