//! Per-connection socket pump
//!
//! One writer task drains the hub send queue and carries the 30-second ping
//! cadence; the reader loop runs inline under a 60-second liveness deadline
//! that any inbound frame resets. Whichever side ends first, unregistering
//! closes the send queue, which in turn ends the writer.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};

use statesync_applications::MemberRepository;
use statesync_common::truncate_key;

use crate::hub::Hub;
use crate::protocol::{InboundFrame, OutboundFrame};

/// Server ping cadence
pub const PING_INTERVAL: Duration = Duration::from_secs(30);
/// A connection with no inbound traffic for this long is closed
pub const PONG_WAIT: Duration = Duration::from_secs(60);
/// Read-side frame size cap
pub const MAX_FRAME_BYTES: usize = 512 * 1024;

/// Drive one authenticated websocket connection until either side ends.
pub async fn serve_connection(
    hub: Arc<Hub>,
    members: MemberRepository,
    socket: WebSocket,
    user_public_key: String,
) {
    let (connection_id, mut outbound) = hub.register(&user_public_key).await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    hub.send_to(
        connection_id,
        OutboundFrame::Connected {
            user_public_key: user_public_key.clone(),
        },
    )
    .await;

    // Writer: drains the send queue, interleaves protocol-level pings
    let writer = tokio::spawn(async move {
        let mut ping = tokio::time::interval(PING_INTERVAL);
        ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ping.tick().await; // the first tick completes immediately

        loop {
            tokio::select! {
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    let Ok(text) = serde_json::to_string(&frame) else { continue };
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = ping.tick() => {
                    if ws_tx.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_tx.close().await;
    });

    // Reader: inline, deadline-guarded
    loop {
        let message = match tokio::time::timeout(PONG_WAIT, ws_rx.next()).await {
            Err(_) => {
                tracing::debug!(
                    connection_id,
                    user = %truncate_key(&user_public_key),
                    "Liveness deadline expired"
                );
                break;
            }
            Ok(None) | Ok(Some(Err(_))) => break,
            Ok(Some(Ok(message))) => message,
        };

        match message {
            Message::Text(text) => {
                match serde_json::from_str::<InboundFrame>(text.as_str()) {
                    Ok(frame) => {
                        handle_frame(&hub, &members, connection_id, &user_public_key, frame).await
                    }
                    Err(_) => {
                        hub.send_to(
                            connection_id,
                            OutboundFrame::Error {
                                error: "unrecognized frame".to_string(),
                            },
                        )
                        .await;
                    }
                }
            }
            Message::Close(_) => break,
            // Pings are answered by the protocol layer; pongs and binary
            // frames just reset the deadline by arriving
            _ => {}
        }
    }

    // Single teardown: removes the connection from every index and closes
    // the send queue, which ends the writer
    hub.unregister(connection_id).await;
    writer.abort();
}

async fn handle_frame(
    hub: &Hub,
    members: &MemberRepository,
    connection_id: u64,
    user_public_key: &str,
    frame: InboundFrame,
) {
    match frame {
        InboundFrame::Subscribe { application_id } => {
            // Only roster members may watch an application's stream
            match members.is_member(&application_id, user_public_key).await {
                Ok(true) => hub.subscribe(connection_id, &application_id).await,
                Ok(false) => {
                    hub.send_to(
                        connection_id,
                        OutboundFrame::Error {
                            error: format!("not a member of {}", application_id),
                        },
                    )
                    .await;
                }
                Err(e) => {
                    tracing::error!(connection_id, error = %e, "Subscribe membership check failed");
                    hub.send_to(
                        connection_id,
                        OutboundFrame::Error {
                            error: "subscription failed".to_string(),
                        },
                    )
                    .await;
                }
            }
        }
        InboundFrame::Unsubscribe { application_id } => {
            hub.unsubscribe(connection_id, &application_id).await;
        }
        InboundFrame::Ping => {
            hub.send_to(connection_id, OutboundFrame::Pong).await;
        }
    }
}
