// ABOUTME: Latest-row replication pipeline for one pair of endpoints
// ABOUTME: extract -> transform -> apply, driven in both directions by PairSynchronizer

pub mod applier;
pub mod extractor;
pub mod pair;
pub mod transform;

pub use applier::apply;
pub use extractor::{extract_latest, latest_row_query, Row};
pub use pair::{DirectionOutcome, PairOutcome, PairSynchronizer, SyncPhase};
pub use transform::{
    build_statements, build_statements_with, build_update, build_update_with, classify, ColumnRule,
    DEFAULT_DATE_FUNCTION,
};

/// Session date format set before extraction and used to re-parse dates on the peer.
pub const SESSION_DATE_FORMAT: &str = "yyyy-mm-dd hh24:mi:ss";

/// Monotonically increasing column that identifies a table's latest row.
pub const INDEX_COLUMN: &str = "RINDEX";
