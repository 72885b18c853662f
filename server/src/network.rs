//! HTTP transport and background task coordination
//!
//! Each route decodes a JSON body, runs one engine operation and encodes the
//! result. Malformed bodies and refused operations are dropped silently: the
//! client gets a 200 with an empty body and no hint as to why.

use crate::config::ServerConfig;
use crate::engine::{MapState, SyncEngine};
use crate::error::{ServerError, SnapshotError, SyncResult};
use crate::snapshot;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use livemap_shared::{
    AddMarkerRequest, LoginRequest, RemoveMarkerRequest, UpdatePositionRequest, UpdateRequest,
};
use log::{debug, error, info};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

const SITE_HTML: &str = include_str!("../assets/index.html");

/// Builds the router for every route the map client uses
pub fn router(engine: SyncEngine) -> Router {
    Router::new()
        .route("/login", any(handle_login))
        .route("/update", any(handle_update))
        .route("/update_position", any(handle_update_position))
        .route("/add_marker", any(handle_add_marker))
        .route("/remove_marker", any(handle_remove_marker))
        .route("/", any(handle_site))
        .fallback(handle_site)
        .with_state(engine)
}

async fn handle_login(State(engine): State<SyncEngine>, body: Bytes) -> Response {
    let Some(request) = decode::<LoginRequest>("/login", &body) else {
        return dropped();
    };

    match engine.login(request.user_name).await {
        Ok(response) => encode(&response),
        Err(e) => {
            debug!("Dropped /login: {}", e);
            dropped()
        }
    }
}

async fn handle_update(State(engine): State<SyncEngine>, body: Bytes) -> Response {
    let Some(request) = decode::<UpdateRequest>("/update", &body) else {
        return dropped();
    };

    match engine.poll(request.session_id).await {
        Ok(update) => encode(&update),
        Err(e) => {
            debug!("Dropped /update: {}", e);
            dropped()
        }
    }
}

async fn handle_update_position(State(engine): State<SyncEngine>, body: Bytes) -> Response {
    let Some(request) = decode::<UpdatePositionRequest>("/update_position", &body) else {
        return dropped();
    };

    let result = engine
        .update_position(request.session_id, request.position)
        .await;
    acknowledge("/update_position", result)
}

async fn handle_add_marker(State(engine): State<SyncEngine>, body: Bytes) -> Response {
    let Some(request) = decode::<AddMarkerRequest>("/add_marker", &body) else {
        return dropped();
    };

    let result = engine.add_marker(request.session_id, request.position).await;
    acknowledge("/add_marker", result)
}

async fn handle_remove_marker(State(engine): State<SyncEngine>, body: Bytes) -> Response {
    let Some(request) = decode::<RemoveMarkerRequest>("/remove_marker", &body) else {
        return dropped();
    };

    let result = engine
        .remove_marker(request.session_id, request.marker_id)
        .await;
    acknowledge("/remove_marker", result)
}

async fn handle_site() -> Html<&'static str> {
    Html(SITE_HTML)
}

/// Decodes a request body; a literal `null` decodes like an empty object
fn decode<T: DeserializeOwned + Default>(route: &str, body: &[u8]) -> Option<T> {
    match serde_json::from_slice::<Option<T>>(body) {
        Ok(request) => Some(request.unwrap_or_default()),
        Err(e) => {
            debug!("Dropped {}: malformed body: {}", route, e);
            None
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Response {
    match serde_json::to_vec(value) {
        Ok(data) => ([(header::CONTENT_TYPE, "application/json")], data).into_response(),
        Err(e) => {
            error!("Failed to encode response: {}", e);
            dropped()
        }
    }
}

fn acknowledge<T>(route: &str, result: SyncResult<T>) -> Response {
    if let Err(e) = result {
        debug!("Dropped {}: {}", route, e);
    }
    dropped()
}

/// Empty 200, used both for acknowledgements and for refused requests
fn dropped() -> Response {
    ().into_response()
}

/// Encodes the marker store under the engine lock, then replaces the file
pub async fn save_snapshot(engine: &SyncEngine, path: &Path) -> Result<(), SnapshotError> {
    let data = engine.encode_snapshot().await?;
    snapshot::write(path, &data).await
}

/// Map server: shared engine, listening socket and background tasks
pub struct Server {
    listener: TcpListener,
    engine: SyncEngine,
    config: ServerConfig,
}

impl Server {
    /// Loads the marker snapshot and binds the listening socket
    ///
    /// A snapshot that exists but cannot be read or parsed is fatal.
    pub async fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let state = match snapshot::load(&config.snapshot_path)? {
            Some(snapshot) => MapState::from_snapshot(snapshot),
            None => MapState::new(),
        };

        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.bind_addr,
                source,
            })?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            engine: SyncEngine::new(state),
            config,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn engine(&self) -> SyncEngine {
        self.engine.clone()
    }

    /// Spawns task that evicts idle sessions
    fn spawn_session_reaper(&self) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let timeout = self.config.session_timeout;
        let period = self.config.reap_interval;

        tokio::spawn(async move {
            let mut interval = interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;

                let reaped = engine.reap_idle_sessions(timeout).await;
                if !reaped.is_empty() {
                    debug!("Reaped {} idle sessions: {:?}", reaped.len(), reaped);
                }
            }
        })
    }

    /// Spawns task that periodically rewrites the marker snapshot
    fn spawn_snapshot_writer(&self) -> JoinHandle<()> {
        let engine = self.engine.clone();
        let path = self.config.snapshot_path.clone();
        let period = self.config.snapshot_interval;

        tokio::spawn(async move {
            let mut interval = interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            // Skip the first tick since it fires immediately
            interval.tick().await;

            loop {
                interval.tick().await;

                if let Err(e) = save_snapshot(&engine, &path).await {
                    error!("Failed to save snapshot: {}", e);
                }
            }
        })
    }

    /// Starts the background tasks and serves HTTP until the listener fails
    ///
    /// Dropping the returned future stops the background tasks as well.
    pub async fn run(self) -> Result<(), ServerError> {
        let _reaper = AbortOnDrop(self.spawn_session_reaper());
        let _writer = AbortOnDrop(self.spawn_snapshot_writer());

        info!("Server started successfully");
        axum::serve(self.listener, router(self.engine)).await?;

        Ok(())
    }
}

struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use livemap_shared::{LoginResponse, Snapshot, UpdateResponse};
    use tempfile::tempdir;
    use tower::ServiceExt;

    async fn call(app: &Router, path: &str, body: &str) -> (StatusCode, Vec<u8>) {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        (status, bytes.to_vec())
    }

    async fn login(app: &Router, name: &str) -> LoginResponse {
        let body = format!(r#"{{"userName":"{name}"}}"#);
        let (_, bytes) = call(app, "/login", &body).await;
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_login_route() {
        let app = router(SyncEngine::default());

        let (status, bytes) = call(&app, "/login", r#"{"userName":"alice"}"#).await;
        assert_eq!(status, StatusCode::OK);

        let response: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(response["sessionId"], 1);
        assert_eq!(response["markers"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_malformed_body_is_dropped() {
        let app = router(SyncEngine::default());

        for path in ["/login", "/update", "/update_position", "/add_marker", "/remove_marker"] {
            let (status, bytes) = call(&app, path, "not json").await;
            assert_eq!(status, StatusCode::OK);
            assert!(bytes.is_empty(), "{path} should drop malformed input");
        }
    }

    #[tokio::test]
    async fn test_unknown_session_is_dropped() {
        let app = router(SyncEngine::default());

        let (status, bytes) = call(&app, "/update", r#"{"sessionId":42}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_marker_flow_over_routes() {
        let engine = SyncEngine::default();
        let app = router(engine.clone());

        let alice = login(&app, "alice").await.session_id;
        let bob = login(&app, "bob").await.session_id;

        let body = format!(
            r#"{{"sessionId":{alice},"position":{{"latitude":1.25,"longitude":2.5}}}}"#
        );
        let (_, bytes) = call(&app, "/add_marker", &body).await;
        assert!(bytes.is_empty());

        let body = format!(r#"{{"sessionId":{bob}}}"#);
        let (_, bytes) = call(&app, "/update", &body).await;
        let update: UpdateResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(update.new_markers.len(), 1);
        assert_eq!(update.new_markers[0].author, "alice");

        let marker_id = update.new_markers[0].id;
        let body = format!(r#"{{"sessionId":{bob},"markerId":{marker_id}}}"#);
        call(&app, "/remove_marker", &body).await;

        let body = format!(r#"{{"sessionId":{bob}}}"#);
        let (_, bytes) = call(&app, "/update", &body).await;
        let update: UpdateResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(update.removed_markers, vec![marker_id]);

        assert!(engine.snapshot().await.markers.is_empty());
    }

    #[tokio::test]
    async fn test_null_login_uses_empty_name() {
        let engine = SyncEngine::default();
        let app = router(engine.clone());

        for body in ["null", r#"{"userName":null}"#] {
            let (status, bytes) = call(&app, "/login", body).await;
            assert_eq!(status, StatusCode::OK);
            let response: LoginResponse = serde_json::from_slice(&bytes).unwrap();
            assert!(response.markers.is_empty());
        }

        assert_eq!(engine.session_count().await, 2);
    }

    #[tokio::test]
    async fn test_partial_position_is_zero_filled() {
        let engine = SyncEngine::default();
        let app = router(engine.clone());
        let alice = login(&app, "alice").await.session_id;

        let body = format!(r#"{{"sessionId":{alice},"position":{{"latitude":1.0}}}}"#);
        call(&app, "/add_marker", &body).await;

        let markers = engine.snapshot().await.markers;
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].position, livemap_shared::Position::new(1.0, 0.0));
    }

    #[tokio::test]
    async fn test_exhausted_marker_counter_drops_add() {
        let snapshot = Snapshot {
            current_marker_id: livemap_shared::MarkerId::MAX,
            markers: Vec::new(),
        };
        let engine = SyncEngine::new(MapState::from_snapshot(snapshot));
        let app = router(engine.clone());
        let alice = login(&app, "alice").await.session_id;

        let body = format!(
            r#"{{"sessionId":{alice},"position":{{"latitude":1.0,"longitude":1.0}}}}"#
        );
        let (status, bytes) = call(&app, "/add_marker", &body).await;
        assert_eq!(status, StatusCode::OK);
        assert!(bytes.is_empty());

        let snapshot = engine.snapshot().await;
        assert!(snapshot.markers.is_empty());
        assert_eq!(snapshot.current_marker_id, livemap_shared::MarkerId::MAX);

        let body = format!(r#"{{"sessionId":{alice}}}"#);
        let (_, bytes) = call(&app, "/update", &body).await;
        let update: UpdateResponse = serde_json::from_slice(&bytes).unwrap();
        assert!(update.new_markers.is_empty());
    }

    #[tokio::test]
    async fn test_update_response_field_names() {
        let app = router(SyncEngine::default());
        let alice = login(&app, "alice").await.session_id;
        let bob = login(&app, "bob").await.session_id;

        let body = format!(
            r#"{{"sessionId":{bob},"position":{{"latitude":3.0,"longitude":4.0}}}}"#
        );
        call(&app, "/update_position", &body).await;

        let body = format!(r#"{{"sessionId":{alice}}}"#);
        let (_, bytes) = call(&app, "/update", &body).await;
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["newMarkers"], serde_json::json!([]));
        assert_eq!(value["removedMarkers"], serde_json::json!([]));
        assert_eq!(value["userPositions"]["bob"]["latitude"], 3.0);
        assert_eq!(value["userPositions"]["bob"]["longitude"], 4.0);
    }

    #[tokio::test]
    async fn test_site_is_served_at_root_and_fallback() {
        let app = router(SyncEngine::default());

        let request = Request::builder().uri("/").body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), SITE_HTML.as_bytes());

        let (status, bytes) = call(&app, "/some/other/path", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(bytes, SITE_HTML.as_bytes());
    }

    #[tokio::test]
    async fn test_server_loads_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        std::fs::write(
            &path,
            br#"{"CurrentMarkerId":7,"markers":[{"id":7,"author":"x","position":{"latitude":0,"longitude":0}}]}"#,
        )
        .unwrap();

        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_snapshot_path(&path);
        let server = Server::new(config).await.unwrap();

        let snapshot = server.engine().snapshot().await;
        assert_eq!(snapshot.current_marker_id, 7);
        assert_eq!(snapshot.markers.len(), 1);
    }

    #[tokio::test]
    async fn test_server_refuses_malformed_snapshot() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        std::fs::write(&path, b"[1, 2, 3]").unwrap();

        let config = ServerConfig::new("127.0.0.1:0".parse().unwrap()).with_snapshot_path(&path);
        let result = Server::new(config).await;

        assert!(matches!(result, Err(ServerError::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_server_reports_bind_failure() {
        let dir = tempdir().unwrap();
        let first = Server::new(
            ServerConfig::new("127.0.0.1:0".parse().unwrap())
                .with_snapshot_path(dir.path().join("a.json")),
        )
        .await
        .unwrap();

        let taken = first.local_addr().unwrap();
        let result = Server::new(
            ServerConfig::new(taken).with_snapshot_path(dir.path().join("b.json")),
        )
        .await;

        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_save_snapshot_writes_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("save.json");
        let engine = SyncEngine::default();
        let alice = engine.login("alice").await.unwrap().session_id;
        engine
            .add_marker(alice, livemap_shared::Position::new(1.0, 1.0))
            .await
            .unwrap();

        save_snapshot(&engine, &path).await.unwrap();

        let written: Snapshot = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written, engine.snapshot().await);
    }
}
