//! Statesync application composition root
//!
//! Derives the server key material, wires every domain's state, registers
//! the subscription hub as the pipeline's publish sink, and composes the
//! domain routers into a single application.

pub mod status;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use statesync_accounts::api::AccountsConfig;
use statesync_accounts::{AccountsRepositories, AccountsState, ChallengeStore};
use statesync_applications::{ApplicationsRepositories, ApplicationsState};
use statesync_auth::AuthBackend;
use statesync_common::Config;
use statesync_events::{
    EventLogRepository, EventPipeline, EventsState, RetentionSweeper,
};
use statesync_invitations::InvitationsState;
use statesync_keys::ServerKeys;
use statesync_realtime::{Hub, HubSink, RealtimeState};

use crate::status::StatusState;

/// A composed application: the router plus the background task handles the
/// binary needs for a clean shutdown.
pub struct App {
    pub router: Router,
    pub sweeper: JoinHandle<()>,
    pub shutdown: watch::Sender<bool>,
}

/// Create the main application with all routes and background tasks
pub async fn create_app(config: Config, pool: PgPool) -> Result<App, anyhow::Error> {
    // Deterministic key material; fatal if the inputs are missing
    let keys = Arc::new(ServerKeys::derive(
        &config.master_password,
        &config.external_url,
    )?);
    store_server_keys(&pool, &keys, &config.master_password).await?;

    // Repositories
    let accounts_repos = AccountsRepositories::new(pool.clone());
    let apps_repos = ApplicationsRepositories::new(pool.clone());
    let event_log = EventLogRepository::new(pool.clone());

    // Auth backend shared by every domain
    let auth = AuthBackend::new(pool.clone(), keys.clone());

    // Subscription hub, wired into the pipeline as its publish sink
    let hub = Arc::new(Hub::new());
    let pipeline = Arc::new(EventPipeline::new(
        event_log.clone(),
        apps_repos.clone(),
        Arc::new(HubSink(hub.clone())),
    ));

    // Retention sweeper
    let (shutdown, shutdown_rx) = watch::channel(false);
    let sweeper = RetentionSweeper::new(
        event_log.clone(),
        config.event_retention_days,
        config.sweep_hour_local,
    )
    .spawn(shutdown_rx);

    // Domain states
    let accounts_state = AccountsState {
        repos: accounts_repos.clone(),
        auth: auth.clone(),
        keys: keys.clone(),
        challenges: Arc::new(ChallengeStore::new(config.challenge_ttl_sec)),
        config: AccountsConfig {
            master_password: config.master_password.clone(),
            jwt_expiration_hours: config.jwt_expiration_hours,
            challenge_ttl_sec: config.challenge_ttl_sec,
            registration_token_ttl_sec: config.registration_token_ttl_sec,
        },
    };

    let applications_state = ApplicationsState {
        repos: apps_repos.clone(),
        auth: auth.clone(),
        server_key_fingerprint: keys.fingerprint().to_string(),
    };

    let events_state = EventsState {
        pipeline: pipeline.clone(),
        auth: auth.clone(),
    };

    let realtime_state = RealtimeState {
        hub: hub.clone(),
        auth: auth.clone(),
        members: apps_repos.members.clone(),
    };

    let invitations_state = InvitationsState {
        invitations: statesync_invitations::InvitationRepository::new(pool.clone()),
        apps: apps_repos.clone(),
        users: accounts_repos.users.clone(),
        pipeline,
        keys,
        auth: auth.clone(),
        external_url: config.external_url.clone(),
    };

    let status_state = StatusState {
        pool,
        auth,
        users: accounts_repos.users,
        setup: accounts_repos.setup,
        applications: apps_repos.applications,
        event_log,
        hub,
    };

    // Build router — compose domain routers with shared infrastructure routes
    let router = Router::new()
        .route("/health", axum::routing::get(status::health))
        .merge(status::routes().with_state(status_state))
        .merge(statesync_accounts::routes().with_state(accounts_state))
        .merge(statesync_applications::routes().with_state(applications_state))
        .merge(statesync_events::routes().with_state(events_state))
        .merge(statesync_realtime::routes().with_state(realtime_state))
        .merge(statesync_invitations::routes().with_state(invitations_state))
        .layer(cors_layer(&config));

    Ok(App {
        router,
        sweeper,
        shutdown,
    })
}

/// Run pending database migrations.
pub async fn migrate(pool: &PgPool) -> Result<(), anyhow::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Keep a sealed copy of the keypair alongside its fingerprint so operators
/// can audit which key a deployment pins without re-deriving it.
async fn store_server_keys(
    pool: &PgPool,
    keys: &ServerKeys,
    master_password: &str,
) -> Result<(), anyhow::Error> {
    let sealed = statesync_keys::seal(keys.private_key_pem().as_bytes(), master_password)
        .map_err(|e| anyhow::anyhow!("Failed to seal server key: {}", e))?;

    sqlx::query(
        r#"
        INSERT INTO server_keys (fingerprint, public_key_pem, sealed_private_key, created_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (fingerprint) DO NOTHING
        "#,
    )
    .bind(keys.fingerprint())
    .bind(keys.public_key_pem())
    .bind(sealed)
    .execute(pool)
    .await?;

    Ok(())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
