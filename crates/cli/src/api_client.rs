use radar_core::FrameNumber;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// Why a request to the frame server did not succeed.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The server answered with a non-success status.
    #[error("server responded with {status}")]
    Response { status: StatusCode, body: String },

    /// The request went out but no response came back.
    #[error("no response from server: {0}")]
    NoResponse(#[source] reqwest::Error),

    /// The request could not be built.
    #[error("could not set up request: {0}")]
    Setup(String),

    /// The server answered but the body was not what we expected.
    #[error("unexpected response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl UploadError {
    fn from_send(err: reqwest::Error) -> Self {
        if err.is_builder() {
            UploadError::Setup(err.to_string())
        } else {
            UploadError::NoResponse(err)
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, UploadError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| UploadError::Setup(format!("invalid server URL {base_url:?}: {e}")))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(UploadError::Setup(format!(
                "unsupported URL scheme {:?}",
                base_url.scheme()
            )));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("radar-upload/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::Setup(e.to_string()))?;
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> Result<Url, UploadError> {
        self.base_url
            .join(path)
            .map_err(|e| UploadError::Setup(format!("failed to build API URL: {e}")))
    }

    async fn send_text(&self, req: reqwest::RequestBuilder) -> Result<String, UploadError> {
        let response = req.send().await.map_err(UploadError::from_send)?;
        let status = response.status();
        let body = response.text().await.map_err(UploadError::NoResponse)?;
        if !status.is_success() {
            return Err(UploadError::Response { status, body });
        }
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, UploadError> {
        let body = self.send_text(req).await?;
        serde_json::from_str(&body).map_err(UploadError::Decode)
    }

    /// Ask the server to ingest its frames directory. Returns the plain-text summary.
    pub async fn upload(&self) -> Result<String, UploadError> {
        let url = self.url("/upload")?;
        self.send_text(self.http.post(url)).await
    }

    pub async fn list_frames(
        &self,
        page: Option<u64>,
        limit: Option<u32>,
    ) -> Result<FramePage, UploadError> {
        let mut url = self.url("/frames")?;
        if let Some(page) = page {
            url.query_pairs_mut().append_pair("page", &page.to_string());
        }
        if let Some(limit) = limit {
            url.query_pairs_mut()
                .append_pair("limit", &limit.to_string());
        }
        self.send_json(self.http.get(url)).await
    }

    pub async fn health(&self) -> Result<HealthResponse, UploadError> {
        let url = self.url("/health")?;
        self.send_json(self.http.get(url)).await
    }
}

// =============================================================================
// Response types (mirrored from server handlers)
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct FrameSummary {
    pub frame_number: FrameNumber,
    pub data: String,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FramePage {
    pub frames: Vec<FrameSummary>,
    pub current_page: u64,
    pub total_frames: u64,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
