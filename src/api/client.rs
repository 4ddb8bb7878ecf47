//! HTTP client for the chip lookup and session tracking endpoints

use super::types::{ChipPlaylist, ChipUid, SessionReport};
use async_trait::async_trait;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("kidsplay/", env!("CARGO_PKG_VERSION"));
pub const API_TIMEOUT_SECS: u64 = 10;

/// Errors talking to the backend
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure (DNS, refused connection, timeout)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The backend does not know this chip
    #[error("Chip not found: {0}")]
    ChipNotFound(ChipUid),

    /// Non-2xx status other than 404
    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Client initialization failed: {0}")]
    InitializationError(String),
}

/// Resolves a chip into its playlist
#[async_trait]
pub trait PlaylistApi: Send + Sync + 'static {
    async fn scan_chip(&self, chip_uid: &ChipUid) -> Result<ChipPlaylist, ApiError>;
}

/// Receives fire-and-forget session-end notifications
#[async_trait]
pub trait SessionTracker: Send + Sync + 'static {
    async fn report_session_end(&self, report: &SessionReport) -> Result<(), ApiError>;
}

/// Connection settings for [`HttpApiClient`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Device token sent as `Authorization: Bearer <token>`
    pub auth_token: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api".to_string(),
            timeout_secs: API_TIMEOUT_SECS,
            auth_token: None,
        }
    }
}

pub struct HttpApiClient {
    http_client: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| ApiError::InitializationError(e.to_string()))?;

        let base_url = Url::parse(&settings.base_url).map_err(|e| {
            ApiError::InitializationError(format!("Invalid base URL {}: {}", settings.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InitializationError(format!(
                "Base URL {} cannot take a path",
                settings.base_url
            )));
        }

        info!("API client targeting {}", base_url);
        Ok(Self {
            http_client,
            base_url,
            auth_token: settings.auth_token.clone(),
        })
    }

    /// Appends `segments` to the base path, each one percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InitializationError(format!("{} cannot take a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// The chip id always ends up as exactly one segment under `nfc/scan`
    fn scan_url(&self, chip_uid: &ChipUid) -> Result<Url, ApiError> {
        let uid = chip_uid.as_str();
        // Dot segments would be resolved away instead of encoded
        if uid.is_empty() || uid.chars().all(|c| c == '.') {
            return Err(ApiError::ChipNotFound(chip_uid.clone()));
        }
        self.endpoint(&["nfc", "scan", uid])
    }

    fn session_end_url(&self) -> Result<Url, ApiError> {
        self.endpoint(&["sessions", "end"])
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl PlaylistApi for HttpApiClient {
    async fn scan_chip(&self, chip_uid: &ChipUid) -> Result<ChipPlaylist, ApiError> {
        let url = self.scan_url(chip_uid)?;
        debug!(chip = %chip_uid, url = %url, "Resolving chip playlist");

        let response = self
            .authorize(self.http_client.get(url))
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ApiError::ChipNotFound(chip_uid.clone()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status.as_u16(), error_text));
        }

        let playlist: ChipPlaylist = response
            .json()
            .await
            .map_err(|e| ApiError::ParseError(e.to_string()))?;

        debug!(
            chip = %chip_uid,
            videos = playlist.videos.len(),
            "Chip playlist resolved"
        );
        Ok(playlist)
    }
}

#[async_trait]
impl SessionTracker for HttpApiClient {
    async fn report_session_end(&self, report: &SessionReport) -> Result<(), ApiError> {
        let url = self.session_end_url()?;
        debug!(chip = %report.chip_uid, url = %url, "Reporting session end");

        let response = self
            .authorize(self.http_client.post(url))
            .json(report)
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status.as_u16(), error_text));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn client(base_url: &str) -> HttpApiClient {
        HttpApiClient::new(&ApiSettings {
            base_url: base_url.to_string(),
            timeout_secs: 2,
            auth_token: None,
        })
        .unwrap()
    }

    #[test]
    fn urls_are_built_without_double_slashes() {
        let client = client("https://kids.example/api/");

        assert_eq!(
            client.scan_url(&ChipUid::new("TEST123")).unwrap().as_str(),
            "https://kids.example/api/nfc/scan/TEST123"
        );
        assert_eq!(
            client.session_end_url().unwrap().as_str(),
            "https://kids.example/api/sessions/end"
        );
    }

    #[test]
    fn chip_uid_stays_inside_its_path_segment() {
        let client = client("https://kids.example/api");

        let url = client.scan_url(&ChipUid::new("A/B?x#y")).unwrap();
        assert_eq!(url.path(), "/api/nfc/scan/A%2FB%3Fx%23y");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);

        let url = client
            .scan_url(&ChipUid::new("../../ADMIN/USERS?X=1"))
            .unwrap();
        assert!(url.path().starts_with("/api/nfc/scan/"), "{}", url);
        assert_eq!(url.path_segments().map(|s| s.count()), Some(4));
        assert_eq!(url.query(), None);
    }

    #[test]
    fn dot_only_chip_uid_is_never_looked_up() {
        let client = client("https://kids.example/api");
        for uid in ["", ".", ".."] {
            assert!(matches!(
                client.scan_url(&ChipUid::new(uid)),
                Err(ApiError::ChipNotFound(_))
            ));
        }
    }

    #[test]
    fn garbage_base_url_fails_initialization() {
        let result = HttpApiClient::new(&ApiSettings {
            base_url: "not a url".to_string(),
            ..ApiSettings::default()
        });
        assert!(matches!(result, Err(ApiError::InitializationError(_))));
    }

    #[tokio::test]
    async fn lookup_request_targets_the_scan_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buffer = vec![0u8; 4096];
            let read = stream.read(&mut buffer).await.unwrap();
            let request = String::from_utf8_lossy(&buffer[..read]).to_string();
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            request
        });

        let client = client(&format!("http://{}/api", address));
        let result = client
            .scan_chip(&ChipUid::new("../../ADMIN/USERS?X=1"))
            .await;
        assert!(matches!(result, Err(ApiError::ChipNotFound(_))));

        let request = server.await.unwrap();
        let request_line = request.lines().next().unwrap();
        assert!(
            request_line.starts_with("GET /api/nfc/scan/"),
            "unexpected request {}",
            request_line
        );
        assert!(!request_line.contains('?'), "unexpected request {}", request_line);
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_network_error() {
        // Bind then release a port so nothing is listening on it
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let client = client(&format!("http://{}", address));
        let result = client.scan_chip(&ChipUid::new("TEST123")).await;
        assert!(matches!(result, Err(ApiError::NetworkError(_))));
    }
}
