//! Session registry for logged-in map clients
//!
//! This module owns the server-side state of every client that has logged in:
//! - Session identifier allocation (monotonic, never reused)
//! - Last reported position and last activity time
//! - Per-session pending queues of marker changes awaiting the next poll
//!
//! The registry holds no policy. Fan-out and queue compaction rules live in the
//! synchronization engine; this type only stores and hands out sessions.

use livemap_shared::{MarkerId, Position, SessionId};
use log::info;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Server-side state of one logged-in client
#[derive(Debug)]
pub struct Session {
    /// Unique session identifier assigned by the server
    pub id: SessionId,
    /// Display name given at login; not unique across sessions
    pub name: String,
    /// Last position reported by the client, if any
    pub last_position: Option<Position>,
    /// Last time this session polled or mutated shared state
    pub last_activity: Instant,
    /// Markers created since the last poll, in creation order
    pub pending_new: Vec<MarkerId>,
    /// Markers removed after this session had already been told about them
    pub pending_removed: Vec<MarkerId>,
}

impl Session {
    /// Creates a session with no position and empty queues, active now
    pub fn new(id: SessionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            last_position: None,
            last_activity: Instant::now(),
            pending_new: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    /// Marks the session as active right now
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Returns true if the session has been idle for strictly longer than `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }

    /// Takes both pending queues, leaving them empty
    pub fn drain_pending(&mut self) -> (Vec<MarkerId>, Vec<MarkerId>) {
        (
            std::mem::take(&mut self.pending_new),
            std::mem::take(&mut self.pending_removed),
        )
    }
}

/// All live sessions, keyed and iterated by ascending identifier
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: BTreeMap<SessionId, Session>,
    /// Last identifier handed out; the next session gets this plus one
    current_session_id: SessionId,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a new identifier and registers a fresh session under it
    ///
    /// Returns `None` once the counter is at its maximum.
    pub fn create(&mut self, name: impl Into<String>) -> Option<SessionId> {
        let session_id = self.current_session_id.checked_add(1)?;
        self.current_session_id = session_id;

        let session = Session::new(session_id, name);
        info!("Session {} logged in as {:?}", session_id, session.name);
        self.sessions.insert(session_id, session);

        Some(session_id)
    }

    pub fn get(&self, session_id: SessionId) -> Option<&Session> {
        self.sessions.get(&session_id)
    }

    pub fn get_mut(&mut self, session_id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&session_id)
    }

    /// Removes a session, returning false if it was already gone
    pub fn remove(&mut self, session_id: SessionId) -> bool {
        if let Some(session) = self.sessions.remove(&session_id) {
            info!("Session {} ({:?}) closed", session.id, session.name);
            true
        } else {
            false
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    /// Evicts every session idle for longer than `timeout`
    ///
    /// Returns the evicted identifiers in ascending order.
    pub fn remove_timed_out(&mut self, timeout: Duration) -> Vec<SessionId> {
        let timed_out: Vec<SessionId> = self
            .sessions
            .values()
            .filter(|session| session.is_timed_out(timeout))
            .map(|session| session.id)
            .collect();

        for session_id in &timed_out {
            self.remove(*session_id);
        }

        timed_out
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
