//! Applications domain: tenants, component trees, and membership rosters

pub mod api;
pub mod domain;
pub mod repository;

// Re-export domain types at the crate root for convenience
pub use domain::entities::{
    Application, ApplicationFull, Component, ComponentGroup, ComponentGroupFull, Member,
    MemberRole, NewApplication, NewMember,
};

// Re-export repository types
pub use repository::{
    ApplicationRepository, ApplicationsRepositories, ComponentRepository, MemberRepository,
};

// Re-export API types
pub use api::routes;
pub use api::ApplicationsState;
