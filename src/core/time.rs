//! Timestamps, event ids and the JSON command envelope.

use serde_json::{Map, Value as JsonValue, json};
use std::time::{SystemTime, UNIX_EPOCH};

pub const ENVELOPE_VERSION: &str = "1.0.0";

/// Seconds since the unix epoch followed by `Z`, e.g. `1771220592Z`.
pub fn now_epoch_z() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{secs}Z")
}

/// Sortable unique id for audit events and envelopes.
pub fn new_event_id() -> String {
    ulid::Ulid::new().to_string()
}

/// Wrap a command result: fixed header fields, then the keys of `extra`.
///
/// A key in `extra` that collides with a header field replaces it.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut envelope = Map::new();
    envelope.insert("envelope_version".into(), json!(ENVELOPE_VERSION));
    envelope.insert("ts".into(), json!(now_epoch_z()));
    envelope.insert("event_id".into(), json!(new_event_id()));
    envelope.insert("cmd".into(), json!(cmd));
    envelope.insert("status".into(), json!(status));
    if let JsonValue::Object(fields) = extra {
        envelope.extend(fields);
    }
    JsonValue::Object(envelope)
}
