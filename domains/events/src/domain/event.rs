//! Event envelope types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;

/// An accepted, immutable event — one row of the authoritative log.
///
/// `(application_id, sequence_number)` is unique and dense from 1 within an
/// application. `created_at` is server-assigned Unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub application_id: String,
    pub sequence_number: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub creator_public_key: String,
    pub version: i64,
    pub created_at: i64,
    pub data: Json<Map<String, Value>>,
}

/// An event as submitted to the pipeline, before sequencing.
///
/// The creator is always stamped by the caller (session identity on the
/// client path, the acting identity on the server-produced path) — never
/// trusted from the wire payload.
#[derive(Debug, Clone)]
pub struct SubmittedEvent {
    pub id: String,
    pub event_type: String,
    pub creator_public_key: String,
    pub version: i64,
    pub data: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let mut data = Map::new();
        data.insert("applicationId".to_string(), Value::String("app-1".into()));

        let event = Event {
            id: "evt-1".to_string(),
            application_id: "app-1".to_string(),
            sequence_number: 3,
            event_type: "application_data_changed".to_string(),
            creator_public_key: "PK".to_string(),
            version: 1,
            created_at: 1_700_000_000,
            data: Json(data),
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "application_data_changed");
        assert_eq!(json["applicationId"], "app-1");
        assert_eq!(json["sequenceNumber"], 3);
        assert_eq!(json["data"]["applicationId"], "app-1");
        assert!(json.get("event_type").is_none());
    }
}
