//! Error types for decoding the record feed.

use thiserror::Error;

use crate::items::Kind;

/// A feed line that could not be turned into a record
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("invalid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("malformed {kind} record: {source}")]
    Shape {
        kind: Kind,
        #[source]
        source: serde_json::Error,
    },
}
