//! Event payload validation and hub delivery semantics

use serde_json::{json, Map, Value};
use sqlx::types::Json;
use std::sync::Arc;

use statesync_events::{Event, EventPayload, EventSink, NoopSink};
use statesync_realtime::{Hub, HubSink, OutboundFrame};

fn data(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

fn event(id: &str, app: &str, creator: &str, seq: i64) -> Event {
    Event {
        id: id.to_string(),
        application_id: app.to_string(),
        sequence_number: seq,
        event_type: "application_data_changed".to_string(),
        creator_public_key: creator.to_string(),
        version: 1,
        created_at: 1_750_000_000,
        data: Json(data(json!({"applicationId": app}))),
    }
}

#[test]
fn test_every_known_event_type_parses() {
    let cases: Vec<(&str, Value)> = vec![
        (
            "member_added",
            json!({"applicationId": "a", "memberPublicKey": "pk", "memberName": "n", "role": "member"}),
        ),
        (
            "member_removed",
            json!({"applicationId": "a", "memberPublicKey": "pk"}),
        ),
        (
            "member_role_changed",
            json!({"applicationId": "a", "memberPublicKey": "pk", "oldRole": "member", "newRole": "admin"}),
        ),
        ("application_data_changed", json!({"applicationId": "a"})),
        ("application_deleted", json!({"applicationId": "a"})),
        (
            "invite_revoked",
            json!({"applicationId": "a", "inviteId": "inv"}),
        ),
        (
            "component_data_changed",
            json!({"applicationId": "a", "componentId": "c", "changedFields": {"f": {"newValue": 1}}}),
        ),
        (
            "application_after_edit_mode_changed",
            json!({"applicationId": "a", "changes": [
                {"changeType": "component_group_added", "entityId": "g", "name": "G", "index": 0}
            ]}),
        ),
    ];

    for (event_type, payload) in cases {
        let parsed = EventPayload::parse(event_type, &data(payload));
        assert!(parsed.is_ok(), "{} should parse: {:?}", event_type, parsed.err());
        assert_eq!(parsed.unwrap().application_id(), "a");
    }
}

#[test]
fn test_required_fields_are_enforced_per_type() {
    // Missing the type-specific required field fails each time
    let cases: Vec<(&str, Value)> = vec![
        ("member_added", json!({"applicationId": "a", "memberName": "n", "role": "member"})),
        ("member_removed", json!({"applicationId": "a"})),
        ("member_role_changed", json!({"applicationId": "a", "memberPublicKey": "pk", "newRole": "admin"})),
        ("application_data_changed", json!({})),
        ("invite_revoked", json!({"applicationId": "a"})),
        ("component_data_changed", json!({"applicationId": "a", "changedFields": {}})),
    ];

    for (event_type, payload) in cases {
        assert!(
            EventPayload::parse(event_type, &data(payload)).is_err(),
            "{} should reject incomplete data",
            event_type
        );
    }
}

#[test]
fn test_unknown_event_type_is_rejected() {
    assert!(EventPayload::parse("member_teleported", &Map::new()).is_err());
}

#[tokio::test]
async fn test_broadcast_skips_originator_across_their_connections() {
    // Scenario: U-A holds two connections, U-B one; all subscribed.
    let hub = Hub::new();
    let (a1, mut rx_a1) = hub.register("PK-A").await;
    let (a2, mut rx_a2) = hub.register("PK-A").await;
    let (b, mut rx_b) = hub.register("PK-B").await;
    for id in [a1, a2, b] {
        hub.subscribe(id, "app-1").await;
    }

    hub.broadcast("app-1", &event("evt-1", "app-1", "PK-A", 1)).await;

    assert!(rx_a1.try_recv().is_err(), "originator connection 1 muted");
    assert!(rx_a2.try_recv().is_err(), "originator connection 2 muted");

    match rx_b.try_recv() {
        Ok(OutboundFrame::Events { events }) => {
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].id, "evt-1");
        }
        other => panic!("U-B should receive one events frame, got {:?}", other.is_ok()),
    }
    assert!(rx_b.try_recv().is_err(), "exactly one frame");
}

#[tokio::test]
async fn test_hub_sink_routes_by_application() {
    let hub = Arc::new(Hub::new());
    let sink = HubSink(hub.clone());

    let (id_one, mut rx_one) = hub.register("PK-1").await;
    let (id_two, mut rx_two) = hub.register("PK-2").await;
    hub.subscribe(id_one, "app-1").await;
    hub.subscribe(id_two, "app-2").await;

    sink.publish(&event("evt-1", "app-1", "PK-X", 1)).await;

    assert!(rx_one.try_recv().is_ok(), "app-1 subscriber delivered");
    assert!(rx_two.try_recv().is_err(), "app-2 subscriber untouched");
}

#[tokio::test]
async fn test_noop_sink_is_inert() {
    // The pipeline must tolerate a sink that goes nowhere
    NoopSink.publish(&event("evt-1", "app-1", "PK-X", 1)).await;
}
