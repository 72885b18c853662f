//! Marker storage and identifier allocation

use livemap_shared::{Marker, MarkerId, Position, Snapshot};
use log::warn;
use std::collections::BTreeMap;

/// All live markers, keyed and iterated by ascending identifier
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MarkerStore {
    markers: BTreeMap<MarkerId, Marker>,
    /// Last identifier handed out; survives removals and restarts
    current_marker_id: MarkerId,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from a persisted snapshot
    ///
    /// The counter is raised to the highest stored identifier if the snapshot
    /// claims a lower one, so new markers can never collide with stored ones.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let mut current_marker_id = snapshot.current_marker_id;
        let mut markers = BTreeMap::new();

        for marker in snapshot.markers {
            if marker.id > current_marker_id {
                warn!(
                    "Snapshot marker {} is above CurrentMarkerId {}, raising counter",
                    marker.id, current_marker_id
                );
                current_marker_id = marker.id;
            }
            markers.insert(marker.id, marker);
        }

        Self {
            markers,
            current_marker_id,
        }
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            current_marker_id: self.current_marker_id,
            markers: self.all(),
        }
    }

    /// Allocates the next identifier and stores a new marker under it
    ///
    /// Returns `None` without storing anything once the counter is at its maximum.
    pub fn create(&mut self, author: impl Into<String>, position: Position) -> Option<MarkerId> {
        let marker_id = self.current_marker_id.checked_add(1)?;
        self.current_marker_id = marker_id;

        self.markers
            .insert(marker_id, Marker::new(marker_id, author, position));

        Some(marker_id)
    }

    pub fn get(&self, marker_id: MarkerId) -> Option<&Marker> {
        self.markers.get(&marker_id)
    }

    pub fn contains(&self, marker_id: MarkerId) -> bool {
        self.markers.contains_key(&marker_id)
    }

    pub fn remove(&mut self, marker_id: MarkerId) -> Option<Marker> {
        self.markers.remove(&marker_id)
    }

    /// Every live marker, cloned, in ascending identifier order
    pub fn all(&self) -> Vec<Marker> {
        self.markers.values().cloned().collect()
    }

    pub fn current_marker_id(&self) -> MarkerId {
        self.current_marker_id
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> Position {
        Position::new(52.52, 13.405)
    }

    #[test]
    fn test_create_assigns_increasing_ids() {
        let mut store = MarkerStore::new();

        assert_eq!(store.create("alice", pos()), Some(1));
        assert_eq!(store.create("bob", pos()), Some(2));
        assert_eq!(store.len(), 2);
        assert_eq!(store.current_marker_id(), 2);
    }

    #[test]
    fn test_ids_not_reused_after_removal() {
        let mut store = MarkerStore::new();

        let first = store.create("alice", pos()).unwrap();
        let second = store.create("alice", pos()).unwrap();
        assert!(store.remove(second).is_some());
        assert!(store.remove(first).is_some());

        assert!(store.is_empty());
        assert_eq!(store.create("alice", pos()), Some(3));
    }

    #[test]
    fn test_marker_fields() {
        let mut store = MarkerStore::new();
        let id = store.create("carol", Position::new(1.5, -2.5)).unwrap();

        let marker = store.get(id).unwrap();
        assert_eq!(marker.id, id);
        assert_eq!(marker.author, "carol");
        assert_eq!(marker.position, Position::new(1.5, -2.5));
    }

    #[test]
    fn test_remove_missing_marker() {
        let mut store = MarkerStore::new();
        assert!(store.remove(42).is_none());
        assert!(!store.contains(42));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut store = MarkerStore::new();
        store.create("alice", pos());
        let removed = store.create("bob", pos()).unwrap();
        store.create("carol", Position::new(0.0, 0.0));
        store.remove(removed);

        let reloaded = MarkerStore::from_snapshot(store.to_snapshot());

        assert_eq!(reloaded, store);
        assert_eq!(reloaded.current_marker_id(), 3);
    }

    #[test]
    fn test_from_snapshot_raises_stale_counter() {
        let snapshot = Snapshot {
            current_marker_id: 2,
            markers: vec![Marker::new(5, "dave", pos())],
        };

        let mut store = MarkerStore::from_snapshot(snapshot);

        assert_eq!(store.current_marker_id(), 5);
        assert_eq!(store.create("erin", pos()), Some(6));
    }

    #[test]
    fn test_create_refuses_when_counter_exhausted() {
        let snapshot = Snapshot {
            current_marker_id: MarkerId::MAX,
            markers: vec![Marker::new(MarkerId::MAX, "frank", pos())],
        };
        let mut store = MarkerStore::from_snapshot(snapshot);

        assert_eq!(store.create("grace", pos()), None);
        assert_eq!(store.current_marker_id(), MarkerId::MAX);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(MarkerId::MAX).unwrap().author, "frank");
    }
}
