// Library root: the rating engine's modules, re-exported for the CLI,
// integration tests and embedding callers.

pub mod config;
pub mod distribution;
pub mod model;
pub mod pipeline;
pub mod position;
pub mod rating;
pub mod report;
pub mod scoring;
pub mod snapshot;

pub use config::EngineConfig;
pub use model::{PlayerRecord, RatedPlayer, Sport, StatLine};
pub use pipeline::{load_and_rate, rate_snapshot, EngineError, RatedSnapshot};
pub use position::{classify, PositionGroup};
pub use snapshot::{FileSnapshot, MemorySnapshot, SnapshotError, SnapshotSource};
