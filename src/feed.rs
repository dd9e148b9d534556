//! JSON-lines record feed produced by the extractor.
//!
//! Each line holds one object tagged with its `"kind"`. Lines that carry no
//! record (blank, `null`, `{}`) or name a kind with no mapping are skipped
//! without error; lines that name a known kind but do not fit its shape are
//! reported as [`RecordError`].

use serde_json::Value;
use tracing::debug;

use crate::error::RecordError;
use crate::items::{Item, Kind};

/// Decode one feed line.
///
/// Returns `Ok(None)` for lines that carry nothing to persist.
pub fn decode_line(line: &str) -> Result<Option<Item>, RecordError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(line).map_err(RecordError::Json)?;
    let kind = match &value {
        Value::Object(map) if map.is_empty() => return Ok(None),
        Value::Object(map) => match map.get("kind").and_then(Value::as_str) {
            Some(name) => Kind::from_name(name),
            None => None,
        },
        _ => return Ok(None),
    };

    let Some(kind) = kind else {
        debug!("No model mapping for record, skipping: {}", line);
        return Ok(None);
    };

    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| RecordError::Shape { kind, source })
}
