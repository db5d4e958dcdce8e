//! Stage 4: projection
//!
//! Applies an accepted event to derived application state. By the time a
//! projection runs the event is already durable; a failure here is logged by
//! the pipeline and the request still succeeds.

use statesync_applications::{ApplicationsRepositories, MemberRole};
use statesync_common::{Error, Result};

use crate::domain::event::Event;
use crate::domain::payload::{
    extract_new_values, EditModeChange, EditModeChangeType, EventPayload,
};

#[derive(Clone)]
pub struct Projector {
    apps: ApplicationsRepositories,
}

impl Projector {
    pub fn new(apps: ApplicationsRepositories) -> Self {
        Self { apps }
    }

    pub async fn apply(&self, event: &Event, payload: &EventPayload) -> Result<()> {
        match payload {
            EventPayload::MemberAdded(data) => {
                self.apps
                    .members
                    .insert(
                        &data.application_id,
                        &data.member_public_key,
                        &data.member_name,
                        data.member_role(),
                        None,
                    )
                    .await?;
                Ok(())
            }

            EventPayload::MemberRemoved(data) => {
                self.apps
                    .members
                    .delete(&data.application_id, &data.member_public_key)
                    .await
            }

            EventPayload::MemberRoleChanged(data) => {
                let new_role = MemberRole::parse(&data.new_role).ok_or_else(|| {
                    Error::Validation(format!("Unknown member role: {}", data.new_role))
                })?;
                self.apps
                    .members
                    .update_role(&data.application_id, &data.member_public_key, new_role)
                    .await?;
                Ok(())
            }

            EventPayload::ApplicationDeleted(data) => {
                self.apps.applications.delete(&data.application_id).await?;
                Ok(())
            }

            EventPayload::ComponentDataChanged(data) => {
                self.apps
                    .components
                    .merge_component_data(
                        &data.application_id,
                        &data.component_id,
                        &data.new_values(),
                    )
                    .await?;
                self.apps.applications.touch(&data.application_id).await
            }

            EventPayload::AfterEditModeChanged(data) => {
                // Items run in order; one failure never stops the rest
                for change in &data.changes {
                    if let Err(e) = self.apply_change(&data.application_id, change).await {
                        tracing::error!(
                            event_id = %event.id,
                            application_id = %data.application_id,
                            entity_id = %change.entity_id,
                            change_type = ?change.change_type,
                            error = %e,
                            "Edit-mode change projection failed"
                        );
                    }
                }
                self.apps.applications.touch(&data.application_id).await
            }

            // Purely informational; the log is the effect
            EventPayload::ApplicationDataChanged(_) | EventPayload::InviteRevoked(_) => Ok(()),
        }
    }

    async fn apply_change(&self, application_id: &str, change: &EditModeChange) -> Result<()> {
        match change.change_type {
            EditModeChangeType::ComponentGroupAdded => {
                self.apps
                    .components
                    .insert_group(
                        application_id,
                        &change.entity_id,
                        change.name.as_deref().unwrap_or(""),
                        change.index.unwrap_or(0),
                    )
                    .await?;
                Ok(())
            }
            EditModeChangeType::ComponentGroupRemoved => {
                self.apps
                    .components
                    .remove_group(application_id, &change.entity_id)
                    .await
            }
            EditModeChangeType::ComponentGroupReordered => {
                let index = change.index.ok_or_else(|| {
                    Error::Validation("component_group_reordered requires an index".to_string())
                })?;
                self.apps
                    .components
                    .reorder_group(application_id, &change.entity_id, index)
                    .await
            }
            EditModeChangeType::ComponentAdded => {
                let group_id = change.group_id.as_deref().ok_or_else(|| {
                    Error::Validation("component_added requires a groupId".to_string())
                })?;
                self.apps
                    .components
                    .insert_component(
                        application_id,
                        group_id,
                        &change.entity_id,
                        change.name.as_deref().unwrap_or(""),
                        change.index.unwrap_or(0),
                        change.data.clone().unwrap_or_default(),
                    )
                    .await?;
                Ok(())
            }
            EditModeChangeType::ComponentRemoved => {
                self.apps
                    .components
                    .remove_component(application_id, &change.entity_id)
                    .await
            }
            EditModeChangeType::ComponentReordered => {
                let index = change.index.ok_or_else(|| {
                    Error::Validation("component_reordered requires an index".to_string())
                })?;
                self.apps
                    .components
                    .reorder_component(application_id, &change.entity_id, index)
                    .await
            }
            EditModeChangeType::ComponentDataChanged => {
                let changed_fields = change.changed_fields.as_ref().ok_or_else(|| {
                    Error::Validation(
                        "component_data_changed requires changedFields".to_string(),
                    )
                })?;
                self.apps
                    .components
                    .merge_component_data(
                        application_id,
                        &change.entity_id,
                        &extract_new_values(changed_fields),
                    )
                    .await?;
                Ok(())
            }
        }
    }
}
