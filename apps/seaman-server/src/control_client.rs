//! Client for the production-control service.
//!
//! [`ControlPlane`] is what the broadcast handlers depend on;
//! [`HttpControlPlane`] binds it to the service's HTTP/JSON API:
//!
//! | operation            | request                                      |
//! |----------------------|----------------------------------------------|
//! | `list_tracks`        | `GET /tracks`                                |
//! | `enable_automation`  | `PUT /tracks/{id}/automation {"enabled":true}` |
//! | `disable_automation` | `PUT /tracks/{id}/automation {"enabled":false}` |
//! | `move_scene_to_next` | `POST /tracks/{id}/scene/next`               |

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::ControlConfig;
use crate::error::ServerError;

/// A broadcast track as reported by the control service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Track {
    pub id: i32,
    pub name: String,
}

/// Operations on the production-control service.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Lists all tracks.
    async fn list_tracks(&self) -> Result<Vec<Track>, ServerError>;

    /// Turns automation on; returns the track name.
    async fn enable_automation(&self, track_id: i32) -> Result<String, ServerError>;

    /// Turns automation off; returns the track name.
    async fn disable_automation(&self, track_id: i32) -> Result<String, ServerError>;

    /// Advances the track to its next scene.
    async fn move_scene_to_next(&self, track_id: i32) -> Result<(), ServerError>;
}

#[derive(Debug, Deserialize)]
struct TrackList {
    tracks: Vec<Track>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AutomationResponse {
    track_name: String,
}

/// HTTP binding of [`ControlPlane`].
#[derive(Debug, Clone)]
pub struct HttpControlPlane {
    http: reqwest::Client,
    base_url: String,
}

impl HttpControlPlane {
    /// Builds a client whose requests time out after `config.timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` if the HTTP client cannot be built.
    pub fn new(config: &ControlConfig) -> Result<Self, ServerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServerError::Config(format!("Cannot build control client: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(
        &self,
        what: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ServerError> {
        let resp = request
            .send()
            .await
            .map_err(|e| ServerError::Remote(format!("{what}: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ServerError::Remote(format!("{what}: HTTP {status}: {body}")));
        }
        Ok(resp)
    }

    async fn switch_automation(&self, track_id: i32, enabled: bool) -> Result<String, ServerError> {
        let what = format!("PUT /tracks/{track_id}/automation");
        debug!(track_id, enabled, "Switching track automation");
        let request = self
            .http
            .put(self.url(&format!("/tracks/{track_id}/automation")))
            .json(&serde_json::json!({ "enabled": enabled }));
        let resp: AutomationResponse = self
            .send(&what, request)
            .await?
            .json()
            .await
            .map_err(|e| ServerError::Remote(format!("{what}: bad response: {e}")))?;
        Ok(resp.track_name)
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn list_tracks(&self) -> Result<Vec<Track>, ServerError> {
        debug!("Listing tracks");
        let list: TrackList = self
            .send("GET /tracks", self.http.get(self.url("/tracks")))
            .await?
            .json()
            .await
            .map_err(|e| ServerError::Remote(format!("GET /tracks: bad response: {e}")))?;
        Ok(list.tracks)
    }

    async fn enable_automation(&self, track_id: i32) -> Result<String, ServerError> {
        self.switch_automation(track_id, true).await
    }

    async fn disable_automation(&self, track_id: i32) -> Result<String, ServerError> {
        self.switch_automation(track_id, false).await
    }

    async fn move_scene_to_next(&self, track_id: i32) -> Result<(), ServerError> {
        debug!(track_id, "Moving scene to next");
        let path = format!("/tracks/{track_id}/scene/next");
        self.send(&format!("POST {path}"), self.http.post(self.url(&path)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory control plane for handler tests.

    use std::sync::Mutex;

    use super::*;

    /// Records calls; fails every call when `failing` is set.
    #[derive(Debug, Default)]
    pub struct MockControlPlane {
        pub tracks: Vec<Track>,
        pub failing: bool,
        calls: Mutex<Vec<String>>,
    }

    impl MockControlPlane {
        pub fn with_tracks(tracks: Vec<Track>) -> Self {
            Self {
                tracks,
                ..Self::default()
            }
        }

        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().expect("lock").clone()
        }

        fn record(&self, call: String) -> Result<(), ServerError> {
            self.calls.lock().expect("lock").push(call.clone());
            if self.failing {
                return Err(ServerError::Remote(format!("{call}: connection refused")));
            }
            Ok(())
        }

        fn name_of(&self, track_id: i32) -> String {
            self.tracks
                .iter()
                .find(|t| t.id == track_id)
                .map(|t| t.name.clone())
                .unwrap_or_else(|| format!("track-{track_id}"))
        }
    }

    #[async_trait]
    impl ControlPlane for MockControlPlane {
        async fn list_tracks(&self) -> Result<Vec<Track>, ServerError> {
            self.record("list_tracks".into())?;
            Ok(self.tracks.clone())
        }

        async fn enable_automation(&self, track_id: i32) -> Result<String, ServerError> {
            self.record(format!("enable_automation {track_id}"))?;
            Ok(self.name_of(track_id))
        }

        async fn disable_automation(&self, track_id: i32) -> Result<String, ServerError> {
            self.record(format!("disable_automation {track_id}"))?;
            Ok(self.name_of(track_id))
        }

        async fn move_scene_to_next(&self, track_id: i32) -> Result<(), ServerError> {
            self.record(format!("move_scene_to_next {track_id}"))
        }
    }
}
