// ── Backend seam ──
//
// Every component talks to the dashboard backend through `Backend`, so
// the reconciliation logic can run against a simulated transport in
// tests. `HttpBackend` is the production implementation over ApiClient.

use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;
use futures_util::StreamExt;
use tundash_api::models::ConfigDocument;
use tundash_api::transport::{TlsMode, TransportConfig};
use tundash_api::{ApiClient, LogFrame};

use crate::config::{DashboardConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{Configuration, FirewallRules, StatusSnapshot};

/// Frames from the log stream, with errors already in core terms.
pub type LogFrames = Pin<Box<dyn Stream<Item = Result<LogFrame, CoreError>> + Send>>;

/// The remote side of the dashboard.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch the current remote configuration.
    async fn fetch_config(&self) -> Result<Configuration, CoreError>;

    /// Replace the remote configuration with `config`.
    async fn push_config(&self, config: &Configuration) -> Result<(), CoreError>;

    /// Fetch process status and diagnostics.
    async fn fetch_status(&self) -> Result<StatusSnapshot, CoreError>;

    /// Ask the backend to re-apply its configuration.
    async fn restart(&self) -> Result<(), CoreError>;

    /// Open the server-push log stream.
    async fn open_logs(&self) -> Result<LogFrames, CoreError>;

    /// List raw firewall rules.
    async fn firewall_rules(&self) -> Result<FirewallRules, CoreError> {
        Err(CoreError::Internal(
            "firewall rule listing is not available on this backend".into(),
        ))
    }
}

// ── HttpBackend ──────────────────────────────────────────────────────

/// [`Backend`] over the dashboard's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: ApiClient,
}

impl HttpBackend {
    pub fn new(config: &DashboardConfig) -> Result<Self, CoreError> {
        let transport = build_transport(config);
        let client = ApiClient::new(config.url.clone(), &transport)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_config(&self) -> Result<Configuration, CoreError> {
        Ok(Configuration::from(self.client.get_config().await?))
    }

    async fn push_config(&self, config: &Configuration) -> Result<(), CoreError> {
        let document = ConfigDocument::from(config);
        Ok(self.client.save_config(&document).await?)
    }

    async fn fetch_status(&self) -> Result<StatusSnapshot, CoreError> {
        Ok(StatusSnapshot::from(self.client.get_status().await?))
    }

    async fn restart(&self) -> Result<(), CoreError> {
        Ok(self.client.restart().await?)
    }

    async fn open_logs(&self) -> Result<LogFrames, CoreError> {
        let frames = self.client.open_log_stream().await?;
        Ok(Box::pin(frames.map(|frame| frame.map_err(CoreError::from))))
    }

    async fn firewall_rules(&self) -> Result<FirewallRules, CoreError> {
        Ok(FirewallRules::from(self.client.get_firewall_rules().await?))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn build_transport(config: &DashboardConfig) -> TransportConfig {
    TransportConfig {
        tls: match &config.tls {
            TlsVerification::SystemDefaults => TlsMode::System,
            TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
            TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
        },
        timeout: config.timeout,
        ..TransportConfig::default()
    }
}
