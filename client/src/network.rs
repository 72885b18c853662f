use crate::error::{ClientError, ClientResult};
use crate::view::MapView;
use livemap_shared::{
    AddMarkerRequest, LoginRequest, LoginResponse, MarkerId, Position, RemoveMarkerRequest,
    SessionId, UpdatePositionRequest, UpdateRequest, UpdateResponse,
};
use log::{debug, error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Thin wrapper over the server's JSON routes
#[derive(Debug, Clone)]
pub struct MapClient {
    http: reqwest::Client,
    base_url: String,
}

impl MapClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> ClientResult<Vec<u8>> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.bytes().await?.to_vec())
    }

    /// Posts `body` and decodes the reply; an empty reply means the request was dropped
    async fn request<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> ClientResult<R> {
        let data = self.post(path, body).await?;
        if data.is_empty() {
            return Err(ClientError::Dropped);
        }

        Ok(serde_json::from_slice(&data)?)
    }

    pub async fn login(&self, user_name: &str) -> ClientResult<LoginResponse> {
        let body = LoginRequest {
            user_name: user_name.to_string(),
        };
        self.request("/login", &body).await
    }

    pub async fn poll(&self, session_id: SessionId) -> ClientResult<UpdateResponse> {
        self.request("/update", &UpdateRequest { session_id }).await
    }

    // The mutating routes never answer with a body, so a dropped request
    // cannot be told apart from a successful one here.

    pub async fn update_position(&self, session_id: SessionId, position: Position) -> ClientResult<()> {
        let body = UpdatePositionRequest {
            session_id,
            position,
        };
        self.post("/update_position", &body).await.map(drop)
    }

    pub async fn add_marker(&self, session_id: SessionId, position: Position) -> ClientResult<()> {
        let body = AddMarkerRequest {
            session_id,
            position,
        };
        self.post("/add_marker", &body).await.map(drop)
    }

    pub async fn remove_marker(&self, session_id: SessionId, marker_id: MarkerId) -> ClientResult<()> {
        let body = RemoveMarkerRequest {
            session_id,
            marker_id,
        };
        self.post("/remove_marker", &body).await.map(drop)
    }
}

/// Polling client that keeps a [`MapView`] in sync and logs in again when its
/// session is lost
pub struct Client {
    api: MapClient,
    view: MapView,
    user_name: String,
    poll_interval: Duration,
    position: Option<Position>,
    mark_on_login: bool,
}

impl Client {
    pub fn new(api: MapClient, user_name: impl Into<String>, poll_interval: Duration) -> Self {
        Client {
            api,
            view: MapView::new(),
            user_name: user_name.into(),
            poll_interval,
            position: None,
            mark_on_login: false,
        }
    }

    /// Reports `position` before every poll
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Drops a marker at the reported position after the first login
    pub fn with_marker(mut self) -> Self {
        self.mark_on_login = true;
        self
    }

    pub fn view(&self) -> &MapView {
        &self.view
    }

    async fn login(&mut self) -> ClientResult<SessionId> {
        let response = self.api.login(&self.user_name).await?;
        let session_id = response.session_id;
        info!(
            "Logged in as {:?} (session {}, {} markers)",
            self.user_name,
            session_id,
            response.markers.len()
        );
        self.view.apply_login(response);

        if self.mark_on_login {
            if let Some(position) = self.position {
                self.api.add_marker(session_id, position).await?;
                self.mark_on_login = false;
            }
        }

        Ok(session_id)
    }

    /// One poll cycle: log in if needed, report position, apply the update
    pub async fn tick(&mut self) -> ClientResult<()> {
        let session_id = match self.view.session_id() {
            Some(session_id) => session_id,
            None => self.login().await?,
        };

        if let Some(position) = self.position {
            self.api.update_position(session_id, position).await?;
        }

        match self.api.poll(session_id).await {
            Ok(update) => {
                let changes = self.view.apply_update(&update);
                for marker_id in &changes.added {
                    if let Some(marker) = self.view.marker(*marker_id) {
                        info!(
                            "Marker {} added by {:?} at ({:.5}, {:.5})",
                            marker.id, marker.author, marker.position.latitude, marker.position.longitude
                        );
                    }
                }
                for marker_id in &changes.removed {
                    info!("Marker {} removed", marker_id);
                }
                debug!("{} other users visible", self.view.user_positions().len());
                Ok(())
            }
            Err(ClientError::Dropped) => {
                warn!("Session {} lost, logging in again", session_id);
                self.view.reset();
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Polls forever at the configured interval
    pub async fn run(&mut self) {
        let mut interval = interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if let Err(e) = self.tick().await {
                error!("Poll failed: {}", e);
            }
        }
    }
}
