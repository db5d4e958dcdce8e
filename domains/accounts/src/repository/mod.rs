//! Repository implementations for the accounts domain

pub mod setup;
pub mod users;

use sqlx::PgPool;

pub use setup::SetupRepository;
pub use users::UserRepository;

/// Combined repository access for the accounts domain
#[derive(Clone)]
pub struct AccountsRepositories {
    pub users: UserRepository,
    pub setup: SetupRepository,
}

impl AccountsRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            setup: SetupRepository::new(pool),
        }
    }
}
