//! Domain entities for the invitations domain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use statesync_applications::MemberRole;

/// Invitation row. Lifetime lives in the signed token (`exp`), not here;
/// revocation is the hard delete of this row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Invitation {
    pub id: String,
    pub application_id: String,
    pub created_by_public_key: String,
    pub granted_role: MemberRole,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub created_at: DateTime<Utc>,
}

/// One recorded consumption of an invitation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InvitationUse {
    pub id: String,
    pub invitation_id: String,
    pub user_public_key: String,
    pub used_at: DateTime<Utc>,
}

/// Derived invitation state. `Active` is the only non-terminal state; time,
/// exhaustion, and revocation are all one-way doors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationState {
    Active,
    Expired,
    Exhausted,
    Revoked,
}

impl InvitationState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, InvitationState::Active)
    }
}

impl Invitation {
    /// All uses spent? Unbounded when `max_uses` is unset.
    pub fn is_exhausted(&self) -> bool {
        self.max_uses
            .map(|max| self.used_count >= max)
            .unwrap_or(false)
    }

    /// Derive the state from the row plus the token's expiry verdict.
    /// (A revoked invitation has no row, so `Revoked` is derived by the
    /// caller from the failed load, never from here.)
    pub fn state(&self, token_expired: bool) -> InvitationState {
        if token_expired {
            InvitationState::Expired
        } else if self.is_exhausted() {
            InvitationState::Exhausted
        } else {
            InvitationState::Active
        }
    }

    pub fn is_valid(&self, token_expired: bool) -> bool {
        self.state(token_expired) == InvitationState::Active
    }
}
