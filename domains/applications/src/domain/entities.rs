//! Domain entities for the applications domain
//!
//! An application is a multi-member tenant owning an ordered tree of
//! component groups and components plus a membership roster. Entity ids are
//! client-chosen opaque strings; only member rows get server-minted ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::types::Json;

use statesync_common::{Error, Result};

/// Per-application member role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "member_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Owner,
    Admin,
    #[default]
    Member,
    Viewer,
}

impl MemberRole {
    pub fn is_owner(&self) -> bool {
        matches!(self, MemberRole::Owner)
    }

    /// Roster sort rank: owner first, viewers last
    pub fn rank(&self) -> i32 {
        match self {
            MemberRole::Owner => 0,
            MemberRole::Admin => 1,
            MemberRole::Member => 2,
            MemberRole::Viewer => 3,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(MemberRole::Owner),
            "admin" => Some(MemberRole::Admin),
            "member" => Some(MemberRole::Member),
            "viewer" => Some(MemberRole::Viewer),
            _ => None,
        }
    }
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemberRole::Owner => write!(f, "owner"),
            MemberRole::Admin => write!(f, "admin"),
            MemberRole::Member => write!(f, "member"),
            MemberRole::Viewer => write!(f, "viewer"),
        }
    }
}

/// Application (tenant) entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    /// Fingerprint of the server key clients should pin
    pub server_key_fingerprint: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ordered child of an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ComponentGroup {
    pub id: String,
    pub application_id: String,
    pub name: String,
    pub position: i32,
}

/// Ordered child of a component group with a free-form data map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: String,
    pub group_id: String,
    pub application_id: String,
    pub name: String,
    pub position: i32,
    pub data: Json<Map<String, Value>>,
}

/// Link between a user (by public key) and an application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub application_id: String,
    pub public_key: String,
    pub name: String,
    pub role: MemberRole,
    /// Raw bytes stay out of JSON; the roster endpoint re-encodes as base64
    #[serde(skip_serializing, default)]
    pub avatar: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

/// A component group with its ordered components
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentGroupFull {
    #[serde(flatten)]
    pub group: ComponentGroup,
    pub components: Vec<Component>,
}

/// Full read of an application: ordered tree plus roster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicationFull {
    #[serde(flatten)]
    pub application: Application,
    pub groups: Vec<ComponentGroupFull>,
    pub members: Vec<Member>,
}

/// Validated member input for application registration
#[derive(Debug, Clone)]
pub struct NewMember {
    pub id: String,
    pub public_key: String,
    pub name: String,
    pub role: MemberRole,
    pub avatar: Option<Vec<u8>>,
}

/// Validated input for registering an application
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub members: Vec<NewMember>,
}

impl NewApplication {
    /// Validate registration input. The roster invariant — exactly one
    /// member with role `owner` — is enforced here, before anything is
    /// written.
    pub fn new(
        id: String,
        name: String,
        icon: Option<String>,
        members: Vec<NewMember>,
    ) -> Result<Self> {
        if id.trim().is_empty() {
            return Err(Error::Validation(
                "Application id must not be empty".to_string(),
            ));
        }
        if name.trim().is_empty() || name.len() > 100 {
            return Err(Error::Validation(
                "Application name must be 1-100 characters".to_string(),
            ));
        }
        if members.is_empty() {
            return Err(Error::Validation(
                "Application requires at least one member".to_string(),
            ));
        }
        for member in &members {
            if member.id.trim().is_empty()
                || member.public_key.trim().is_empty()
                || member.name.trim().is_empty()
            {
                return Err(Error::Validation(
                    "Member id, publicKey, and name must not be empty".to_string(),
                ));
            }
        }

        let owner_count = members.iter().filter(|m| m.role.is_owner()).count();
        if owner_count != 1 {
            return Err(Error::Validation(format!(
                "Application requires exactly one owner, got {}",
                owner_count
            )));
        }

        Ok(Self {
            id,
            name,
            icon,
            members,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, role: MemberRole) -> NewMember {
        NewMember {
            id: id.to_string(),
            public_key: format!("PK-{}", id),
            name: format!("user {}", id),
            role,
            avatar: None,
        }
    }

    #[test]
    fn test_role_rank_orders_owner_first() {
        assert!(MemberRole::Owner.rank() < MemberRole::Admin.rank());
        assert!(MemberRole::Admin.rank() < MemberRole::Member.rank());
        assert!(MemberRole::Member.rank() < MemberRole::Viewer.rank());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(MemberRole::parse("owner"), Some(MemberRole::Owner));
        assert_eq!(MemberRole::parse("viewer"), Some(MemberRole::Viewer));
        assert_eq!(MemberRole::parse("superuser"), None);
    }

    #[test]
    fn test_registration_requires_exactly_one_owner() {
        let no_owner = NewApplication::new(
            "app-1".to_string(),
            "Test".to_string(),
            None,
            vec![member("m-1", MemberRole::Member)],
        );
        assert!(no_owner.is_err());

        let two_owners = NewApplication::new(
            "app-1".to_string(),
            "Test".to_string(),
            None,
            vec![member("m-1", MemberRole::Owner), member("m-2", MemberRole::Owner)],
        );
        assert!(two_owners.is_err());

        let one_owner = NewApplication::new(
            "app-1".to_string(),
            "Test".to_string(),
            None,
            vec![member("m-1", MemberRole::Owner), member("m-2", MemberRole::Member)],
        );
        assert!(one_owner.is_ok());
    }

    #[test]
    fn test_registration_rejects_empty_fields() {
        assert!(NewApplication::new(
            "".to_string(),
            "Test".to_string(),
            None,
            vec![member("m-1", MemberRole::Owner)],
        )
        .is_err());

        let mut bad_member = member("m-1", MemberRole::Owner);
        bad_member.public_key = String::new();
        assert!(NewApplication::new(
            "app-1".to_string(),
            "Test".to_string(),
            None,
            vec![bad_member],
        )
        .is_err());
    }
}
