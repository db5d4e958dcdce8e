//! Stage 2: authorization
//!
//! The submitter must be a member of the target application; some types are
//! further restricted by member role. `member_added` is deliberately open to
//! any member — the invitation protocol is the real gatekeeper for joins.

use statesync_applications::{ApplicationsRepositories, Member};
use statesync_common::Error as CommonError;

use crate::domain::event::SubmittedEvent;
use crate::domain::payload::EventPayload;
use crate::pipeline::PipelineError;

pub async fn authorize(
    apps: &ApplicationsRepositories,
    submitted: &SubmittedEvent,
    payload: &EventPayload,
) -> Result<(), PipelineError> {
    let application_id = payload.application_id();

    let application = apps
        .applications
        .get(application_id)
        .await
        .map_err(PipelineError::from)?;
    if application.is_none() {
        return Err(PipelineError::from(CommonError::NotFound(
            "Application not found".to_string(),
        )));
    }

    let member = apps
        .members
        .get_by_public_key(application_id, &submitted.creator_public_key)
        .await
        .map_err(PipelineError::from)?
        .ok_or_else(|| {
            PipelineError::Unauthorized("Not a member of this application".to_string())
        })?;

    match payload {
        // Owner-only mutations
        EventPayload::ApplicationDeleted(_)
        | EventPayload::MemberRoleChanged(_)
        | EventPayload::InviteRevoked(_) => require_owner(&member),

        // Self-leave, or the owner removing anyone
        EventPayload::MemberRemoved(data) => {
            if data.member_public_key == submitted.creator_public_key {
                Ok(())
            } else {
                require_owner(&member)
            }
        }

        // Any member; the invitation protocol gates real joins
        EventPayload::MemberAdded(_)
        | EventPayload::ApplicationDataChanged(_)
        | EventPayload::ComponentDataChanged(_)
        | EventPayload::AfterEditModeChanged(_) => Ok(()),
    }
}

fn require_owner(member: &Member) -> Result<(), PipelineError> {
    if member.role.is_owner() {
        Ok(())
    } else {
        Err(PipelineError::Unauthorized(
            "This event type requires the owner role".to_string(),
        ))
    }
}
