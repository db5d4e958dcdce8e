//! The `/ws` upgrade endpoint

use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, FromRef, Query, State},
    http::header::AUTHORIZATION,
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;

use statesync_auth::{jwt::extract_bearer_token, AuthBackend, AuthError};
use statesync_applications::MemberRepository;

use crate::connection::{serve_connection, MAX_FRAME_BYTES};
use crate::hub::Hub;

/// Application state for the realtime domain
#[derive(Clone)]
pub struct RealtimeState {
    pub hub: Arc<Hub>,
    pub auth: AuthBackend,
    pub members: MemberRepository,
}

impl FromRef<RealtimeState> for AuthBackend {
    fn from_ref(state: &RealtimeState) -> Self {
        state.auth.clone()
    }
}

/// Query parameters for the upgrade request
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Session token; browsers cannot set headers on websocket handshakes
    pub token: Option<String>,
}

/// Upgrade to the event stream
///
/// **GET /ws** — session via `?token=` or bearer header
pub async fn ws_handler(
    State(state): State<RealtimeState>,
    Query(query): Query<WsQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let token = match query.token {
        Some(token) => token,
        None => {
            let Some(header) = headers.get(AUTHORIZATION) else {
                return AuthError::MissingAuthorization.into_response();
            };
            match extract_bearer_token(header) {
                Ok(token) => token,
                Err(e) => return e.into_response(),
            }
        }
    };

    let auth_context = match state.auth.authenticate_session(&token).await {
        Ok(context) => context,
        Err(e) => return e.into_response(),
    };

    let hub = state.hub.clone();
    let members = state.members.clone();
    let user_public_key = auth_context.user.public_key;

    ws.max_frame_size(MAX_FRAME_BYTES)
        .max_message_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| serve_connection(hub, members, socket, user_public_key))
}

/// Create the realtime routes
pub fn routes() -> Router<RealtimeState> {
    Router::new().route("/ws", get(ws_handler))
}
