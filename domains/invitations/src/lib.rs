//! Invitations domain: signed, bounded-use credentials minting memberships
//!
//! An invitation is the only sanctioned way into an application. The owner
//! mints a server-signed token; anyone presenting it can inspect it, check
//! their own eligibility, and join — which produces a `member_added` event
//! through the pipeline's server-produced path.

pub mod api;
pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{Invitation, InvitationState, InvitationUse};
pub use domain::token::{mint_invite_token, verify_invite_token, InviteTokenClaims};

// Re-export repository types
pub use repository::InvitationRepository;

// Re-export API types
pub use api::routes;
pub use api::InvitationsState;
