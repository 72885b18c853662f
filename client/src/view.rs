//! Client-side mirror of the shared map
//!
//! The mirror starts from the full marker list returned by login and is kept
//! current by applying each poll's deltas. Other users' positions are replaced
//! wholesale on every poll, since the server always sends the complete set.

use livemap_shared::{LoginResponse, Marker, MarkerId, Position, SessionId, UpdateResponse};
use std::collections::BTreeMap;

/// What a single poll changed in the mirror
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ViewChanges {
    pub added: Vec<MarkerId>,
    pub removed: Vec<MarkerId>,
}

impl ViewChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MapView {
    session_id: Option<SessionId>,
    markers: BTreeMap<MarkerId, Marker>,
    user_positions: BTreeMap<String, Position>,
}

impl MapView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole mirror with a fresh login snapshot
    pub fn apply_login(&mut self, response: LoginResponse) {
        self.session_id = Some(response.session_id);
        self.markers = response
            .markers
            .into_iter()
            .map(|marker| (marker.id, marker))
            .collect();
        self.user_positions.clear();
    }

    pub fn apply_update(&mut self, update: &UpdateResponse) -> ViewChanges {
        let mut changes = ViewChanges::default();

        for marker in &update.new_markers {
            if self.markers.insert(marker.id, marker.clone()).is_none() {
                changes.added.push(marker.id);
            }
        }

        for marker_id in &update.removed_markers {
            if self.markers.remove(marker_id).is_some() {
                changes.removed.push(*marker_id);
            }
        }

        self.user_positions = update.user_positions.clone();
        changes
    }

    /// Forgets the session, e.g. after the server dropped a poll
    pub fn reset(&mut self) {
        self.session_id = None;
        self.markers.clear();
        self.user_positions.clear();
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    pub fn marker(&self, marker_id: MarkerId) -> Option<&Marker> {
        self.markers.get(&marker_id)
    }

    pub fn user_positions(&self) -> &BTreeMap<String, Position> {
        &self.user_positions
    }
}
