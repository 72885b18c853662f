//! # Live Map Client Library
//!
//! Headless client for the live map server. It speaks the same JSON routes as
//! the bundled web page and keeps a local mirror of the shared map.
//!
//! ## Synchronization Model
//!
//! The server never pushes. The client logs in once to receive every existing
//! marker, then polls at a fixed interval. Each poll returns the markers added
//! and removed since the previous poll plus the current position of every other
//! user that has reported one.
//!
//! Updates are delivered at most once. If the server answers a poll with an
//! empty body the session has expired (or never existed), so the client drops
//! its mirror and logs in again, which yields a fresh full snapshot.
//!
//! ## Module Organization
//!
//! - `network`: [`MapClient`] for the individual routes and [`Client`], the
//!   polling loop with automatic re-login
//! - `view`: [`MapView`], the local mirror of markers and user positions
//! - `error`: [`ClientError`]
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use livemap_client::{Client, MapClient};
//! use livemap_shared::Position;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let api = MapClient::new("http://127.0.0.1:8080");
//!     let mut client = Client::new(api, "alice", Duration::from_secs(1))
//!         .with_position(Position::new(52.52, 13.405));
//!
//!     client.run().await;
//! }
//! ```

pub mod error;
pub mod network;
pub mod view;

pub use error::{ClientError, ClientResult};
pub use network::{Client, MapClient};
pub use view::{MapView, ViewChanges};
