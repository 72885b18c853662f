//! # Live Map Server Library
//!
//! This library provides the shared-state backend for a collaborative live map.
//! Clients log in, report their positions, add and remove map markers, and poll
//! periodically for changes made by everyone else. The server is the single
//! source of truth; clients never talk to each other directly.
//!
//! ## Core Responsibilities
//!
//! ### Session Tracking
//! Every login creates a session with a server-assigned identifier. Sessions
//! carry the user's display name, their last reported position and two pending
//! queues of marker changes that have not yet been delivered. A session that
//! stops polling is evicted after a fixed timeout.
//!
//! ### Marker Storage
//! Markers are immutable records of an author and a position. Identifiers come
//! from a counter that is never rewound, not even across restarts, so a marker
//! identifier is never reused.
//!
//! ### Differential Synchronization
//! Marker changes fan out to every live session's pending queues at the moment
//! they happen. A poll drains the caller's queues and also reports the positions
//! of all other sessions. Updates are delivered at most once; a client that
//! loses a poll response loses those updates.
//!
//! ## Architecture Design
//!
//! ### One Exclusivity Domain
//! The session registry and marker store live together in one
//! [`engine::MapState`] behind a single mutex owned by [`engine::SyncEngine`].
//! Request handlers and the background tasks all go through the same engine
//! methods, so nothing ever observes a half-applied change.
//!
//! ### Background Tasks
//! Two long-lived tasks run alongside the HTTP server:
//! - **Session Reaper**: evicts sessions idle past the timeout
//! - **Snapshot Writer**: serializes the marker store under the lock and
//!   replaces the snapshot file on disk
//!
//! ### Silent Failure
//! Malformed requests and references to unknown sessions or markers are
//! dropped without an error status. Clients treat an empty response as a lost
//! session and log in again.
//!
//! ## Module Organization
//!
//! - `session`: session records and the registry
//! - `marker_store`: marker records and identifier allocation
//! - `engine`: the synchronization operations and the shared engine handle
//! - `snapshot`: snapshot loading and atomic replacement
//! - `network`: HTTP routes and the [`Server`] that ties everything together
//! - `config`: [`ServerConfig`] with timing and path settings
//! - `error`: error types
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use livemap_server::{Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ServerConfig::new("0.0.0.0:8080".parse()?).with_snapshot_path("./save.json");
//!
//!     // Loads the snapshot, binds the socket, then serves requests while the
//!     // reaper and snapshot writer run in the background
//!     Server::new(config).await?.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod marker_store;
pub mod network;
pub mod session;
pub mod snapshot;

pub use config::ServerConfig;
pub use engine::{MapState, SyncEngine};
pub use error::{ServerError, SnapshotError, SyncError, SyncResult};
pub use network::{router, Server};
