//! Per-transport registry of live client sessions
//!
//! A session maps a generated client id to the sending half of an unbounded
//! channel. The binding that owns the connection drains the receiving half into
//! its own framing (SSE, WebSocket frames, raw socket writes), so every write
//! for one client is serialized through a single task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::mcp::rpc::{encode, Response};

/// Event name used when a response is pushed to every session.
pub const BROADCAST_EVENT: &str = "mcp-message";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No active stream found for client: {0}")]
    NotFound(String),
    #[error("stream closed for client: {0}")]
    Closed(String),
}

/// One framed message queued for a client: an event name plus its JSON payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundEvent {
    pub name: String,
    pub data: String,
}

impl OutboundEvent {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

pub type EventSink = mpsc::UnboundedSender<OutboundEvent>;
pub type EventStream = mpsc::UnboundedReceiver<OutboundEvent>;

#[derive(Debug)]
struct Session {
    sink: EventSink,
    created_at: Instant,
    token: u64,
}

#[derive(Clone)]
pub struct SessionRegistry {
    label: &'static str,
    sessions: Arc<DashMap<String, Session>>,
    next_token: Arc<AtomicU64>,
}

/// Removes its session when dropped, on every exit path of the owning connection.
#[must_use = "dropping the guard unregisters the session"]
pub struct SessionGuard {
    registry: SessionRegistry,
    client_id: String,
    token: u64,
}

impl SessionGuard {
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// True once a later `register` for the same client id replaced this session.
    pub fn is_superseded(&self) -> bool {
        self.registry
            .sessions
            .get(&self.client_id)
            .is_some_and(|session| session.token != self.token)
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.release(&self.client_id, self.token);
    }
}

impl SessionRegistry {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            sessions: Arc::new(DashMap::new()),
            next_token: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Registers a fresh channel for `client_id`, replacing any previous session.
    pub fn register(&self, client_id: impl Into<String>) -> (SessionGuard, EventStream) {
        let client_id = client_id.into();
        let (sink, stream) = mpsc::unbounded_channel();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);

        let replaced = self.sessions.insert(
            client_id.clone(),
            Session {
                sink,
                created_at: Instant::now(),
                token,
            },
        );
        if replaced.is_some() {
            warn!(transport = self.label, client_id = %client_id, "session replaced");
        }
        info!(transport = self.label, client_id = %client_id, "session registered");

        let guard = SessionGuard {
            registry: self.clone(),
            client_id,
            token,
        };
        (guard, stream)
    }

    pub fn lookup(&self, client_id: &str) -> Result<EventSink, SessionError> {
        self.sessions
            .get(client_id)
            .map(|session| session.sink.clone())
            .ok_or_else(|| SessionError::NotFound(client_id.to_string()))
    }

    pub fn unregister(&self, client_id: &str) {
        if let Some((_, session)) = self.sessions.remove(client_id) {
            info!(
                transport = self.label,
                client_id,
                age_ms = session.created_at.elapsed().as_millis() as u64,
                "session unregistered"
            );
        }
    }

    fn release(&self, client_id: &str, token: u64) {
        if let Some((_, session)) = self
            .sessions
            .remove_if(client_id, |_, session| session.token == token)
        {
            info!(
                transport = self.label,
                client_id,
                age_ms = session.created_at.elapsed().as_millis() as u64,
                "session unregistered"
            );
        }
    }

    pub fn send(&self, client_id: &str, event: OutboundEvent) -> Result<(), SessionError> {
        self.lookup(client_id)?
            .send(event)
            .map_err(|_| SessionError::Closed(client_id.to_string()))
    }

    /// Best-effort delivery to every session; returns how many accepted the event.
    pub fn broadcast(&self, response: &Response) -> usize {
        let data = encode(response);
        let sinks: Vec<(String, EventSink)> = self
            .sessions
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().sink.clone()))
            .collect();

        let mut delivered = 0;
        for (client_id, sink) in sinks {
            match sink.send(OutboundEvent::new(BROADCAST_EVENT, data.clone())) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    warn!(transport = self.label, client_id = %client_id, "broadcast delivery failed")
                }
            }
        }

        debug!(transport = self.label, delivered, "broadcast complete");
        delivered
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn client_ids(&self) -> Vec<String> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Lifecycle of a single connection; transitions only move forward.
#[derive(Debug)]
pub struct ConnectionLifecycle {
    transport: &'static str,
    client_id: String,
    state: ConnectionState,
}

impl ConnectionLifecycle {
    pub fn new(transport: &'static str, client_id: impl Into<String>) -> Self {
        Self {
            transport,
            client_id: client_id.into(),
            state: ConnectionState::Connecting,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns false (and leaves the state unchanged) for a backwards transition.
    pub fn advance(&mut self, next: ConnectionState) -> bool {
        if next <= self.state {
            return false;
        }

        debug!(
            transport = self.transport,
            client_id = %self.client_id,
            from = ?self.state,
            to = ?next,
            "connection state changed"
        );
        self.state = next;
        true
    }
}

impl Drop for ConnectionLifecycle {
    fn drop(&mut self) {
        if self.state != ConnectionState::Closed {
            self.advance(ConnectionState::Closed);
        }
    }
}
