//! Synchronization engine: the shared map state and every operation on it
//!
//! [`MapState`] bundles the session registry and the marker store and implements
//! the operations clients can invoke (login, poll, move, add marker, remove
//! marker) plus the maintenance operations used by background tasks (reap idle
//! sessions, take a snapshot).
//!
//! [`SyncEngine`] is the shareable handle. It wraps one `MapState` behind a
//! single mutex, so every request handler and background task observes and
//! mutates the registry and store as one consistent unit.
//!
//! Marker changes fan out at mutation time: adding a marker appends its
//! identifier to every live session's pending-new queue, and removing one either
//! withdraws it from a session's pending-new queue (the session never learns it
//! existed) or appends it to the session's pending-removed queue. A poll drains
//! both queues, so each change is delivered to a session at most once.

use crate::error::{SnapshotError, SyncError, SyncResult};
use crate::marker_store::MarkerStore;
use crate::session::SessionRegistry;
use livemap_shared::{LoginResponse, MarkerId, Position, SessionId, Snapshot, UpdateResponse};
use log::debug;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Session registry and marker store, mutated only through the operations below
#[derive(Debug, Default)]
pub struct MapState {
    sessions: SessionRegistry,
    markers: MarkerStore,
}

impl MapState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from persisted markers with no sessions
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            sessions: SessionRegistry::new(),
            markers: MarkerStore::from_snapshot(snapshot),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn markers(&self) -> &MarkerStore {
        &self.markers
    }

    /// Registers a new session and returns it together with every stored marker
    pub fn login(&mut self, user_name: impl Into<String>) -> SyncResult<LoginResponse> {
        let session_id = self
            .sessions
            .create(user_name)
            .ok_or(SyncError::SessionIdsExhausted)?;

        Ok(LoginResponse {
            session_id,
            markers: self.markers.all(),
        })
    }

    /// Builds the session's incremental update and drains its pending queues
    ///
    /// Queued markers that no longer exist are skipped. Other sessions appear in
    /// `user_positions` only once they have reported a position; when names
    /// collide the session with the lowest identifier wins.
    pub fn poll(&mut self, session_id: SessionId) -> SyncResult<UpdateResponse> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(SyncError::UnknownSession(session_id))?;

        session.touch();
        let (pending_new, pending_removed) = session.drain_pending();

        let new_markers = pending_new
            .into_iter()
            .filter_map(|marker_id| self.markers.get(marker_id).cloned())
            .collect();

        let mut user_positions = BTreeMap::new();
        for other in self.sessions.iter() {
            if other.id == session_id {
                continue;
            }

            if let Some(position) = other.last_position {
                user_positions.entry(other.name.clone()).or_insert(position);
            }
        }

        Ok(UpdateResponse {
            new_markers,
            removed_markers: pending_removed,
            user_positions,
        })
    }

    /// Overwrites the session's last known position
    pub fn update_position(&mut self, session_id: SessionId, position: Position) -> SyncResult<()> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(SyncError::UnknownSession(session_id))?;

        session.touch();
        session.last_position = Some(position);

        Ok(())
    }

    /// Creates a marker authored by the session and queues it for every live session
    pub fn add_marker(&mut self, session_id: SessionId, position: Position) -> SyncResult<MarkerId> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(SyncError::UnknownSession(session_id))?;

        session.touch();
        let author = session.name.clone();

        let marker_id = self
            .markers
            .create(author, position)
            .ok_or(SyncError::MarkerIdsExhausted)?;

        for session in self.sessions.iter_mut() {
            session.pending_new.push(marker_id);
        }

        debug!("Session {} added marker {}", session_id, marker_id);
        Ok(marker_id)
    }

    /// Deletes a marker and tells every session that has already seen it
    ///
    /// A session still holding the marker in its pending-new queue has it
    /// withdrawn instead, so it is never told to remove a marker it never saw.
    pub fn remove_marker(&mut self, session_id: SessionId, marker_id: MarkerId) -> SyncResult<()> {
        let session = self
            .sessions
            .get_mut(session_id)
            .ok_or(SyncError::UnknownSession(session_id))?;

        session.touch();

        if self.markers.remove(marker_id).is_none() {
            return Err(SyncError::UnknownMarker(marker_id));
        }

        for session in self.sessions.iter_mut() {
            match session.pending_new.iter().position(|id| *id == marker_id) {
                Some(index) => {
                    session.pending_new.remove(index);
                }
                None => session.pending_removed.push(marker_id),
            }
        }

        debug!("Session {} removed marker {}", session_id, marker_id);
        Ok(())
    }

    /// Evicts sessions idle for longer than `timeout`
    pub fn reap_idle_sessions(&mut self, timeout: Duration) -> Vec<SessionId> {
        self.sessions.remove_timed_out(timeout)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.markers.to_snapshot()
    }
}

/// Cloneable handle to the shared [`MapState`]
///
/// Each method holds the lock for exactly the duration of one operation.
#[derive(Debug, Clone, Default)]
pub struct SyncEngine {
    state: Arc<Mutex<MapState>>,
}

impl SyncEngine {
    pub fn new(state: MapState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub async fn login(&self, user_name: impl Into<String>) -> SyncResult<LoginResponse> {
        self.state.lock().await.login(user_name)
    }

    pub async fn poll(&self, session_id: SessionId) -> SyncResult<UpdateResponse> {
        self.state.lock().await.poll(session_id)
    }

    pub async fn update_position(&self, session_id: SessionId, position: Position) -> SyncResult<()> {
        self.state.lock().await.update_position(session_id, position)
    }

    pub async fn add_marker(&self, session_id: SessionId, position: Position) -> SyncResult<MarkerId> {
        self.state.lock().await.add_marker(session_id, position)
    }

    pub async fn remove_marker(&self, session_id: SessionId, marker_id: MarkerId) -> SyncResult<()> {
        self.state.lock().await.remove_marker(session_id, marker_id)
    }

    pub async fn reap_idle_sessions(&self, timeout: Duration) -> Vec<SessionId> {
        self.state.lock().await.reap_idle_sessions(timeout)
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.state.lock().await.snapshot()
    }

    /// Serializes the marker store while holding the lock
    ///
    /// The returned bytes are a consistent point-in-time image; writing them
    /// out happens after the lock is released.
    pub async fn encode_snapshot(&self) -> Result<Vec<u8>, SnapshotError> {
        let state = self.state.lock().await;
        crate::snapshot::encode(&state.snapshot())
    }

    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions().len()
    }
}
