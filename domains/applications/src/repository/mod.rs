//! Repository implementations for the applications domain

pub mod applications;
pub mod components;
pub mod members;

use sqlx::PgPool;

pub use applications::ApplicationRepository;
pub use components::ComponentRepository;
pub use members::MemberRepository;

/// Combined repository access for the applications domain
#[derive(Clone)]
pub struct ApplicationsRepositories {
    pub applications: ApplicationRepository,
    pub members: MemberRepository,
    pub components: ComponentRepository,
}

impl ApplicationsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            applications: ApplicationRepository::new(pool.clone()),
            members: MemberRepository::new(pool.clone()),
            components: ComponentRepository::new(pool),
        }
    }
}
