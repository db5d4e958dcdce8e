//! The subscription hub
//!
//! Three indexes behind one reader-writer lock: the connection set, the
//! per-user list, and the per-application subscriber list. Registrar
//! operations take the write lock; broadcast snapshots sender handles under
//! the read lock and releases it before any enqueue, so a slow subscriber
//! can never stall the registrar or other deliveries.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::RwLock;

use statesync_common::truncate_key;
use statesync_events::{Event, EventSink};

use crate::protocol::OutboundFrame;

/// Bounded per-connection send queue
pub const SEND_QUEUE_CAPACITY: usize = 256;

#[derive(Debug)]
struct ConnectionEntry {
    user_public_key: String,
    sender: mpsc::Sender<OutboundFrame>,
    subscriptions: HashSet<String>,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<u64, ConnectionEntry>,
    by_user: HashMap<String, Vec<u64>>,
    by_app: HashMap<String, Vec<u64>>,
}

/// In-process router from accepted events to live subscribers
pub struct Hub {
    state: RwLock<HubState>,
    next_connection_id: AtomicU64,
    dropped_deliveries: AtomicU64,
}

impl Hub {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HubState::default()),
            next_connection_id: AtomicU64::new(1),
            dropped_deliveries: AtomicU64::new(0),
        }
    }

    /// Register a connection for a user. Returns the connection id and the
    /// receiving end of its send queue (owned by the writer pump).
    pub async fn register(&self, user_public_key: &str) -> (u64, mpsc::Receiver<OutboundFrame>) {
        let id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(SEND_QUEUE_CAPACITY);

        let mut state = self.state.write().await;
        state.connections.insert(
            id,
            ConnectionEntry {
                user_public_key: user_public_key.to_string(),
                sender,
                subscriptions: HashSet::new(),
            },
        );
        state
            .by_user
            .entry(user_public_key.to_string())
            .or_default()
            .push(id);

        tracing::debug!(
            connection_id = id,
            user = %truncate_key(user_public_key),
            "Connection registered"
        );
        (id, receiver)
    }

    /// Remove a connection from all three indexes and close its send queue.
    /// Safe to call more than once; the second call finds nothing.
    pub async fn unregister(&self, connection_id: u64) {
        let mut state = self.state.write().await;
        let Some(entry) = state.connections.remove(&connection_id) else {
            return;
        };

        if let Some(ids) = state.by_user.get_mut(&entry.user_public_key) {
            ids.retain(|&id| id != connection_id);
            if ids.is_empty() {
                state.by_user.remove(&entry.user_public_key);
            }
        }
        for application_id in &entry.subscriptions {
            if let Some(ids) = state.by_app.get_mut(application_id) {
                ids.retain(|&id| id != connection_id);
                if ids.is_empty() {
                    state.by_app.remove(application_id);
                }
            }
        }
        // Dropping `entry.sender` here closes the queue and ends the writer

        tracing::debug!(connection_id, "Connection unregistered");
    }

    /// Subscribe a connection to an application's events. Subscribing twice
    /// is a no-op.
    pub async fn subscribe(&self, connection_id: u64, application_id: &str) {
        let mut state = self.state.write().await;
        let Some(entry) = state.connections.get_mut(&connection_id) else {
            return;
        };
        if entry.subscriptions.insert(application_id.to_string()) {
            state
                .by_app
                .entry(application_id.to_string())
                .or_default()
                .push(connection_id);
        }
    }

    /// Drop a connection's subscription to an application.
    pub async fn unsubscribe(&self, connection_id: u64, application_id: &str) {
        let mut state = self.state.write().await;
        let Some(entry) = state.connections.get_mut(&connection_id) else {
            return;
        };
        if entry.subscriptions.remove(application_id) {
            if let Some(ids) = state.by_app.get_mut(application_id) {
                ids.retain(|&id| id != connection_id);
                if ids.is_empty() {
                    state.by_app.remove(application_id);
                }
            }
        }
    }

    /// Deliver an event to every subscriber of its application except
    /// connections owned by the event's creator. A full send queue drops
    /// that one delivery; the client resyncs via the cursor read.
    pub async fn broadcast(&self, application_id: &str, event: &Event) {
        // Snapshot under the read lock, release before enqueueing
        let targets: Vec<(u64, String, mpsc::Sender<OutboundFrame>)> = {
            let state = self.state.read().await;
            let Some(subscriber_ids) = state.by_app.get(application_id) else {
                return;
            };
            subscriber_ids
                .iter()
                .filter_map(|id| {
                    state.connections.get(id).map(|entry| {
                        (*id, entry.user_public_key.clone(), entry.sender.clone())
                    })
                })
                .collect()
        };

        let frame = OutboundFrame::Events {
            events: vec![event.clone()],
        };

        for (connection_id, user_public_key, sender) in targets {
            // Originator suppression: every connection of the creator is
            // skipped, not just the submitting one
            if user_public_key == event.creator_public_key {
                continue;
            }

            match sender.try_send(frame.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    let total = self.dropped_deliveries.fetch_add(1, Ordering::Relaxed) + 1;
                    tracing::warn!(
                        connection_id,
                        event_id = %event.id,
                        application_id = %application_id,
                        dropped_total = total,
                        "Send queue full; delivery dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    // Connection is tearing down; unregister will clean up
                }
            }
        }
    }

    /// Send a frame to one connection (pong, error replies).
    pub async fn send_to(&self, connection_id: u64, frame: OutboundFrame) {
        let sender = {
            let state = self.state.read().await;
            state
                .connections
                .get(&connection_id)
                .map(|entry| entry.sender.clone())
        };
        if let Some(sender) = sender {
            if sender.try_send(frame).is_err() {
                tracing::debug!(connection_id, "Direct send dropped");
            }
        }
    }

    /// Total deliveries dropped to full queues since boot.
    pub fn dropped_deliveries(&self) -> u64 {
        self.dropped_deliveries.load(Ordering::Relaxed)
    }

    /// Live connection count.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter wiring the hub into the event pipeline's publish stage.
pub struct HubSink(pub Arc<Hub>);

#[async_trait]
impl EventSink for HubSink {
    async fn publish(&self, event: &Event) {
        self.0.broadcast(&event.application_id, event).await;
    }
}
