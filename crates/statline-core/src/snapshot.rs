// Snapshot sources: where player records come from, and paginated loading.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SnapshotConfig;
use crate::model::{PlayerRecord, Sport, StatLine};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse JSON snapshot {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("failed to parse CSV snapshot {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("unsupported snapshot format for {path} (expected .json or .csv)")]
    UnsupportedFormat { path: String },

    #[error("snapshot source error: {0}")]
    Source(String),

    #[error("page at offset {offset} failed after {attempts} attempt(s): {last_error}")]
    PageFailed {
        offset: usize,
        attempts: u32,
        #[source]
        last_error: Box<SnapshotError>,
    },

    #[error("snapshot load did not finish within {0:?}")]
    TimedOut(Duration),
}

// ---------------------------------------------------------------------------
// Source trait
// ---------------------------------------------------------------------------

/// A paginated supply of player records.
///
/// `fetch_page` returns up to `limit` records starting at `offset`; an empty
/// page means the snapshot is exhausted. Implementations may fail
/// transiently, [`collect_snapshot`] retries each page.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<PlayerRecord>, SnapshotError>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshot {
    records: Vec<PlayerRecord>,
    label: String,
}

impl MemorySnapshot {
    pub fn new(records: Vec<PlayerRecord>) -> Self {
        Self {
            records,
            label: "in-memory snapshot".into(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl SnapshotSource for MemorySnapshot {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<PlayerRecord>, SnapshotError> {
        Ok(self.records.iter().skip(offset).take(limit).cloned().collect())
    }

    fn describe(&self) -> String {
        format!("{} ({} records)", self.label, self.records.len())
    }
}

/// A JSON or CSV export on disk, parsed up front and served in pages.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    inner: MemorySnapshot,
}

impl FileSnapshot {
    /// Open a snapshot file, choosing the parser from the extension.
    pub fn open(path: &Path) -> Result<Self, SnapshotError> {
        let display = path.display().to_string();
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let records = match extension.as_deref() {
            Some("json") => load_json_snapshot(path)?,
            Some("csv") => load_csv_snapshot(path)?,
            _ => return Err(SnapshotError::UnsupportedFormat { path: display }),
        };

        Ok(Self {
            inner: MemorySnapshot {
                records,
                label: display,
            },
        })
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshot {
    async fn fetch_page(&self, offset: usize, limit: usize) -> Result<Vec<PlayerRecord>, SnapshotError> {
        self.inner.fetch_page(offset, limit).await
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

// ---------------------------------------------------------------------------
// Paginated loading
// ---------------------------------------------------------------------------

/// Pull every record from `source`, one page at a time, until an empty page.
///
/// Each page is retried up to `max_retries` times with doubling backoff. The
/// whole load is bounded by `load_timeout_secs`.
pub async fn collect_snapshot(
    source: &dyn SnapshotSource,
    config: &SnapshotConfig,
) -> Result<Vec<PlayerRecord>, SnapshotError> {
    let limit = config.load_timeout();
    match tokio::time::timeout(limit, collect_pages(source, config)).await {
        Ok(result) => result,
        Err(_) => {
            warn!("loading {} timed out after {:?}", source.describe(), limit);
            Err(SnapshotError::TimedOut(limit))
        }
    }
}

async fn collect_pages(
    source: &dyn SnapshotSource,
    config: &SnapshotConfig,
) -> Result<Vec<PlayerRecord>, SnapshotError> {
    let mut records = Vec::new();
    let mut offset = 0;
    loop {
        let page = fetch_with_retry(source, offset, config).await?;
        if page.is_empty() {
            break;
        }
        debug!("fetched {} records at offset {}", page.len(), offset);
        // Advance by what was returned: a source may cap pages below the
        // requested size.
        offset += page.len();
        records.extend(page);
    }
    info!("loaded {} records from {}", records.len(), source.describe());
    Ok(records)
}

async fn fetch_with_retry(
    source: &dyn SnapshotSource,
    offset: usize,
    config: &SnapshotConfig,
) -> Result<Vec<PlayerRecord>, SnapshotError> {
    let mut attempt = 0;
    loop {
        match source.fetch_page(offset, config.page_size).await {
            Ok(page) => return Ok(page),
            Err(e) if attempt < config.max_retries => {
                attempt += 1;
                let delay = config.backoff(attempt);
                warn!(
                    "page at offset {} failed ({}), retry {}/{} in {:?}",
                    offset, e, attempt, config.max_retries, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                return Err(SnapshotError::PageFailed {
                    offset,
                    attempts: attempt + 1,
                    last_error: Box::new(e),
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Reader-based parsers
// ---------------------------------------------------------------------------

/// Parse a JSON export: either a bare array of records or an object with a
/// `players` array. Malformed records are skipped with a warning.
pub fn records_from_json_reader<R: Read>(rdr: R) -> Result<Vec<PlayerRecord>, serde_json::Error> {
    let document: Value = serde_json::from_reader(rdr)?;
    let items = match document {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("players") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(serde::de::Error::custom(
                    "expected an array of players or an object with a `players` array",
                ))
            }
        },
        _ => {
            return Err(serde::de::Error::custom(
                "expected an array of players or an object with a `players` array",
            ))
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<PlayerRecord>(item) {
            Ok(record) => records.push(record),
            Err(e) => warn!("skipping malformed player record #{}: {}", index, e),
        }
    }
    Ok(records)
}

/// Parse a CSV export. `id`, `name`, `sport`, `position` and `team` are
/// record fields; every other non-empty column is a stat.
pub fn records_from_csv_reader<R: Read>(rdr: R) -> Result<Vec<PlayerRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut records = Vec::new();
    for (index, result) in reader.deserialize::<HashMap<String, String>>().enumerate() {
        match result {
            Ok(row) => match record_from_row(row) {
                Ok(record) => records.push(record),
                Err(reason) => warn!("skipping CSV row {}: {}", index + 1, reason),
            },
            Err(e) => warn!("skipping malformed CSV row: {}", e),
        }
    }
    Ok(records)
}

fn record_from_row(mut row: HashMap<String, String>) -> Result<PlayerRecord, String> {
    let mut take = |key: &str| {
        row.remove(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let id = take("id").ok_or("missing id")?;
    let sport: Sport = take("sport")
        .ok_or_else(|| format!("player {id}: missing sport"))?
        .parse()
        .map_err(|e| format!("player {id}: {e}"))?;
    let name = take("name");
    let position = take("position");
    let teams = take("team")
        .map(|t| t.split('|').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    let mut stats = StatLine::new();
    for (key, value) in row {
        let value = value.trim();
        if !value.is_empty() {
            stats.insert(key, value);
        }
    }

    Ok(PlayerRecord {
        id,
        name,
        sport,
        position,
        teams,
        stats,
    })
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

pub fn load_json_snapshot(path: &Path) -> Result<Vec<PlayerRecord>, SnapshotError> {
    let file = std::fs::File::open(path).map_err(|e| SnapshotError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    records_from_json_reader(std::io::BufReader::new(file)).map_err(|e| SnapshotError::Json {
        path: path.display().to_string(),
        source: e,
    })
}

pub fn load_csv_snapshot(path: &Path) -> Result<Vec<PlayerRecord>, SnapshotError> {
    let file = std::fs::File::open(path).map_err(|e| SnapshotError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    records_from_csv_reader(file).map_err(|e| SnapshotError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
