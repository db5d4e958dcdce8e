//! Repository implementations for the invitations domain

pub mod invitations;

pub use invitations::InvitationRepository;
