//! Invitation token lifecycle across the keys and invitations crates

mod common;

use common::{EXTERNAL_URL, MASTER_PASSWORD};

use chrono::Utc;
use statesync_applications::MemberRole;
use statesync_invitations::{
    mint_invite_token, verify_invite_token, Invitation, InvitationState,
};
use statesync_keys::ServerKeys;

fn keys() -> ServerKeys {
    ServerKeys::derive(MASTER_PASSWORD, EXTERNAL_URL).unwrap()
}

fn row(max_uses: Option<i32>, used_count: i32) -> Invitation {
    Invitation {
        id: "inv-1".to_string(),
        application_id: "app-1".to_string(),
        created_by_public_key: "PK-O".to_string(),
        granted_role: MemberRole::Member,
        max_uses,
        used_count,
        created_at: Utc::now(),
    }
}

#[test]
fn test_token_carries_grant_and_issuer() {
    let keys = keys();
    let (token, _) = mint_invite_token(
        &keys,
        "inv-1",
        "app-1",
        MemberRole::Admin,
        EXTERNAL_URL,
        Some(24),
    )
    .unwrap();

    let claims = verify_invite_token(&keys, &token).unwrap();
    assert_eq!(claims.invite_id, "inv-1");
    assert_eq!(claims.application_id, "app-1");
    assert_eq!(claims.role, MemberRole::Admin);
    assert_eq!(claims.issuer_url, EXTERNAL_URL);
    assert!(!claims.is_expired());
}

#[test]
fn test_tampered_token_is_rejected() {
    let keys = keys();
    let (token, _) = mint_invite_token(
        &keys,
        "inv-1",
        "app-1",
        MemberRole::Member,
        EXTERNAL_URL,
        None,
    )
    .unwrap();

    let mut tampered = token.clone();
    tampered.replace_range(token.len() - 4.., "AAAA");
    assert!(verify_invite_token(&keys, &tampered).is_err());
}

#[test]
fn test_zero_hour_token_expires_at_issue() {
    // expiresInHours = 0 is an intentional "expired token" for exercising
    // client expiry handling
    let keys = keys();
    let (token, exp) = mint_invite_token(
        &keys,
        "inv-1",
        "app-1",
        MemberRole::Member,
        EXTERNAL_URL,
        Some(0),
    )
    .unwrap();

    assert!(exp.is_some());
    let claims = verify_invite_token(&keys, &token).unwrap();
    assert!(claims.is_expired());

    // And an expired token pushes the invitation into a terminal state
    let invitation = row(Some(5), 0);
    assert_eq!(invitation.state(true), InvitationState::Expired);
    assert!(!invitation.is_valid(true));
}

#[test]
fn test_exhaustion_is_terminal_and_unbounded_is_not() {
    let bounded = row(Some(2), 2);
    assert_eq!(bounded.state(false), InvitationState::Exhausted);
    assert!(!bounded.is_valid(false));

    let unbounded = row(None, 500);
    assert_eq!(unbounded.state(false), InvitationState::Active);
    assert!(unbounded.is_valid(false));
}

#[test]
fn test_state_transitions_are_one_way() {
    for state in [
        InvitationState::Expired,
        InvitationState::Exhausted,
        InvitationState::Revoked,
    ] {
        assert!(state.is_terminal());
    }
    assert!(!InvitationState::Active.is_terminal());
}
