//! Typed event payloads
//!
//! The event `type` string selects a concrete payload schema; parsing into
//! these variants IS the validation stage. Every struct keeps an open
//! `extra` map so unknown fields survive a round-trip, but unknown event
//! *types* fail outright.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use statesync_applications::MemberRole;
use statesync_common::{Error, Result};

/// Old/new value pair for a changed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    #[serde(default)]
    pub old_value: Option<Value>,
    #[serde(default)]
    pub new_value: Option<Value>,
}

/// Dispatch kind for a single edit-mode change item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditModeChangeType {
    ComponentAdded,
    ComponentRemoved,
    ComponentReordered,
    ComponentDataChanged,
    ComponentGroupAdded,
    ComponentGroupRemoved,
    ComponentGroupReordered,
}

/// One entry of an `application_after_edit_mode_changed` batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditModeChange {
    pub change_type: EditModeChangeType,
    #[serde(default)]
    pub entity_type: Option<String>,
    pub entity_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub index: Option<i32>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
    #[serde(default)]
    pub changed_fields: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberAddedData {
    pub application_id: String,
    pub member_public_key: String,
    pub member_name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MemberAddedData {
    /// Role the projection applies; defaults to plain `member`.
    pub fn member_role(&self) -> MemberRole {
        self.role
            .as_deref()
            .and_then(MemberRole::parse)
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRemovedData {
    pub application_id: String,
    pub member_public_key: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRoleChangedData {
    pub application_id: String,
    pub member_public_key: String,
    pub old_role: String,
    pub new_role: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDataChangedData {
    pub application_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDeletedData {
    pub application_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InviteRevokedData {
    pub application_id: String,
    pub invite_id: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDataChangedData {
    pub application_id: String,
    pub component_id: String,
    pub changed_fields: Map<String, Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ComponentDataChangedData {
    /// The new values to merge into the component's data map. Fields whose
    /// change record carries no `newValue` are skipped.
    pub fn new_values(&self) -> Map<String, Value> {
        extract_new_values(&self.changed_fields)
    }
}

/// Pull the `newValue` of every field-change record out of a raw
/// `changedFields` map. Entries without a `newValue` are skipped.
pub fn extract_new_values(changed_fields: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = Map::new();
    for (field, change) in changed_fields {
        let parsed: Option<FieldChange> = serde_json::from_value(change.clone()).ok();
        if let Some(FieldChange {
            new_value: Some(value),
            ..
        }) = parsed
        {
            merged.insert(field.clone(), value);
        }
    }
    merged
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AfterEditModeChangedData {
    pub application_id: String,
    pub changes: Vec<EditModeChange>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Every event type the pipeline understands
#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    MemberAdded(MemberAddedData),
    MemberRemoved(MemberRemovedData),
    MemberRoleChanged(MemberRoleChangedData),
    ApplicationDataChanged(ApplicationDataChangedData),
    ApplicationDeleted(ApplicationDeletedData),
    InviteRevoked(InviteRevokedData),
    ComponentDataChanged(ComponentDataChangedData),
    AfterEditModeChanged(AfterEditModeChangedData),
}

pub const MEMBER_ADDED: &str = "member_added";
pub const MEMBER_REMOVED: &str = "member_removed";
pub const MEMBER_ROLE_CHANGED: &str = "member_role_changed";
pub const APPLICATION_DATA_CHANGED: &str = "application_data_changed";
pub const APPLICATION_DELETED: &str = "application_deleted";
pub const INVITE_REVOKED: &str = "invite_revoked";
pub const COMPONENT_DATA_CHANGED: &str = "component_data_changed";
pub const APPLICATION_AFTER_EDIT_MODE_CHANGED: &str = "application_after_edit_mode_changed";

fn parse_data<T: serde::de::DeserializeOwned>(event_type: &str, data: &Map<String, Value>) -> Result<T> {
    serde_json::from_value(Value::Object(data.clone())).map_err(|e| {
        Error::Validation(format!("Invalid {} payload: {}", event_type, e))
    })
}

fn require_non_empty(event_type: &str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!(
            "{} requires a non-empty {}",
            event_type, field
        )));
    }
    Ok(())
}

impl EventPayload {
    /// Parse and validate an event's data map against its declared type.
    pub fn parse(event_type: &str, data: &Map<String, Value>) -> Result<Self> {
        match event_type {
            MEMBER_ADDED => {
                let payload: MemberAddedData = parse_data(event_type, data)?;
                require_non_empty(event_type, "applicationId", &payload.application_id)?;
                require_non_empty(event_type, "memberPublicKey", &payload.member_public_key)?;
                require_non_empty(event_type, "memberName", &payload.member_name)?;
                let role = payload
                    .role
                    .as_deref()
                    .ok_or_else(|| {
                        Error::Validation("member_added requires a role".to_string())
                    })?;
                if MemberRole::parse(role).is_none() {
                    return Err(Error::Validation(format!("Unknown member role: {}", role)));
                }
                Ok(EventPayload::MemberAdded(payload))
            }
            MEMBER_REMOVED => {
                let payload: MemberRemovedData = parse_data(event_type, data)?;
                require_non_empty(event_type, "applicationId", &payload.application_id)?;
                require_non_empty(event_type, "memberPublicKey", &payload.member_public_key)?;
                Ok(EventPayload::MemberRemoved(payload))
            }
            MEMBER_ROLE_CHANGED => {
                let payload: MemberRoleChangedData = parse_data(event_type, data)?;
                require_non_empty(event_type, "applicationId", &payload.application_id)?;
                require_non_empty(event_type, "memberPublicKey", &payload.member_public_key)?;
                require_non_empty(event_type, "oldRole", &payload.old_role)?;
                require_non_empty(event_type, "newRole", &payload.new_role)?;
                if MemberRole::parse(&payload.new_role).is_none() {
                    return Err(Error::Validation(format!(
                        "Unknown member role: {}",
                        payload.new_role
                    )));
                }
                Ok(EventPayload::MemberRoleChanged(payload))
            }
            APPLICATION_DATA_CHANGED => {
                let payload: ApplicationDataChangedData = parse_data(event_type, data)?;
                require_non_empty(event_type, "applicationId", &payload.application_id)?;
                Ok(EventPayload::ApplicationDataChanged(payload))
            }
            APPLICATION_DELETED => {
                let payload: ApplicationDeletedData = parse_data(event_type, data)?;
                require_non_empty(event_type, "applicationId", &payload.application_id)?;
                Ok(EventPayload::ApplicationDeleted(payload))
            }
            INVITE_REVOKED => {
                let payload: InviteRevokedData = parse_data(event_type, data)?;
                require_non_empty(event_type, "applicationId", &payload.application_id)?;
                require_non_empty(event_type, "inviteId", &payload.invite_id)?;
                Ok(EventPayload::InviteRevoked(payload))
            }
            COMPONENT_DATA_CHANGED => {
                let payload: ComponentDataChangedData = parse_data(event_type, data)?;
                require_non_empty(event_type, "applicationId", &payload.application_id)?;
                require_non_empty(event_type, "componentId", &payload.component_id)?;
                Ok(EventPayload::ComponentDataChanged(payload))
            }
            APPLICATION_AFTER_EDIT_MODE_CHANGED => {
                let payload: AfterEditModeChangedData = parse_data(event_type, data)?;
                require_non_empty(event_type, "applicationId", &payload.application_id)?;
                for change in &payload.changes {
                    require_non_empty(event_type, "entityId", &change.entity_id)?;
                }
                Ok(EventPayload::AfterEditModeChanged(payload))
            }
            other => Err(Error::Validation(format!("Unknown event type: {}", other))),
        }
    }

    /// The application this event belongs to.
    pub fn application_id(&self) -> &str {
        match self {
            EventPayload::MemberAdded(p) => &p.application_id,
            EventPayload::MemberRemoved(p) => &p.application_id,
            EventPayload::MemberRoleChanged(p) => &p.application_id,
            EventPayload::ApplicationDataChanged(p) => &p.application_id,
            EventPayload::ApplicationDeleted(p) => &p.application_id,
            EventPayload::InviteRevoked(p) => &p.application_id,
            EventPayload::ComponentDataChanged(p) => &p.application_id,
            EventPayload::AfterEditModeChanged(p) => &p.application_id,
        }
    }
}
