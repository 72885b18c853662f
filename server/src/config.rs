//! Server configuration

use livemap_shared::{
    DEFAULT_PORT, DEFAULT_SNAPSHOT_PATH, REAP_INTERVAL, SESSION_TIMEOUT, SNAPSHOT_INTERVAL,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the map server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// Marker snapshot file
    pub snapshot_path: PathBuf,
    /// Idle time after which a session is evicted
    pub session_timeout: Duration,
    /// How often the reaper looks for idle sessions
    pub reap_interval: Duration,
    /// How often the marker store is written to disk
    pub snapshot_interval: Duration,
}

impl ServerConfig {
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            session_timeout: SESSION_TIMEOUT,
            reap_interval: REAP_INTERVAL,
            snapshot_interval: SNAPSHOT_INTERVAL,
        }
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    pub fn with_snapshot_interval(mut self, interval: Duration) -> Self {
        self.snapshot_interval = interval;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))
    }
}
