// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Additive merge of JSON attribute objects stored in an annotation

use crate::error::{OutfitterError, Result};
use serde_json::{Map, Value};
use tracing::debug;

/// Merge `incoming` into `existing`, both JSON objects serialized as strings.
///
/// Keys only in `existing` are kept, keys in both take the incoming value.
/// An absent or malformed `existing` counts as an empty object; a malformed
/// `incoming` is rejected. Repeating a merge yields byte-identical output.
pub fn merge(existing: Option<&str>, incoming: &str) -> Result<String> {
    let incoming = match serde_json::from_str::<Value>(incoming) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            return Err(OutfitterError::MalformedAttributes(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
        Err(e) => return Err(OutfitterError::MalformedAttributes(e.to_string())),
    };

    let mut merged = existing.map(parse_existing).unwrap_or_default();
    debug!("merging {:?} into {:?}", incoming, merged);
    merged.extend(incoming);

    Ok(Value::Object(merged).to_string())
}

fn parse_existing(raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => {
            debug!("ignoring malformed existing annotation {:?}", raw);
            Map::new()
        }
    }
}
