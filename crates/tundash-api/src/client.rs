// Dashboard backend HTTP client
//
// Wraps `reqwest::Client` with URL construction under the `/api/` prefix,
// status checking, and JSON decoding. One method per backend endpoint;
// no state is held beyond the HTTP clients themselves.

use reqwest::header::ACCEPT;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::logs::{LogFrameStream, decode_frames};
use crate::models::{ConfigDocument, FirewallRules, StatusResponse};
use crate::transport::TransportConfig;

/// Raw HTTP client for the dashboard backend.
///
/// All methods return decoded payloads; non-success statuses surface as
/// [`Error::Status`] with the response body attached.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a client from a `TransportConfig`.
    ///
    /// `base_url` is the dashboard root (e.g. `http://10.0.0.5:8080`); the
    /// `/api/` prefix is added per request.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            stream_http: transport.build_stream_client()?,
            base_url,
        })
    }

    /// Create a client around a pre-built `reqwest::Client`, used for both
    /// calls and the log stream.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            stream_http: http.clone(),
            http,
            base_url,
        }
    }

    /// The dashboard base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/api/{path}`, keeping any path prefix on the base URL.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, Error> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        Ok(base.join(&format!("api/{path}"))?)
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// `GET /api/config`
    pub async fn get_config(&self) -> Result<ConfigDocument, Error> {
        self.get_json("config").await
    }

    /// `POST /api/config` with the full document.
    pub async fn save_config(&self, document: &ConfigDocument) -> Result<(), Error> {
        self.post_json("config", document).await
    }

    /// `GET /api/status`
    pub async fn get_status(&self) -> Result<StatusResponse, Error> {
        self.get_json("status").await
    }

    /// `POST /api/action/restart` with no body.
    pub async fn restart(&self) -> Result<(), Error> {
        let url = self.api_url("action/restart")?;
        debug!("POST {}", url);

        let resp = self.http.post(url).send().await?;
        check_status(resp).await.map(drop)
    }

    /// `GET /api/iptables`
    pub async fn get_firewall_rules(&self) -> Result<FirewallRules, Error> {
        self.get_json("iptables").await
    }

    /// `GET /api/logs`, returning the decoded frame stream.
    ///
    /// The returned stream ends with an [`Error::Stream`] item if the
    /// connection drops, or ends cleanly if the server closes it.
    pub async fn open_log_stream(&self) -> Result<LogFrameStream, Error> {
        let url = self.api_url("logs")?;
        debug!("GET {} (stream)", url);

        let resp = self
            .stream_http
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await?;
        let resp = check_status(resp).await?;

        Ok(decode_frames(resp.bytes_stream()))
    }

    // ── Request helpers ──────────────────────────────────────────────

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = self.api_url(path)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        let resp = check_status(resp).await?;
        let body = resp.text().await?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    async fn post_json(&self, path: &str, body: &impl Serialize) -> Result<(), Error> {
        let url = self.api_url(path)?;
        debug!("POST {}", url);

        let resp = self.http.post(url).json(body).send().await?;
        check_status(resp).await.map(drop)
    }
}

/// Pass 2xx responses through; turn anything else into [`Error::Status`].
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(Error::Status {
        status: status.as_u16(),
        body: body.trim().to_owned(),
    })
}
