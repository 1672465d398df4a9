// ── Configuration store ──
//
// Holds the canonical local copy of the remote configuration. Every
// edit is a fetch-mutate-push cycle against the *remote* document, not
// the cache, followed by a reload. Concurrent commits resolve as
// last-write-wins: the later push replaces the earlier one wholesale.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::CoreError;
use crate::model::Configuration;
use crate::stream::Subscription;

pub struct ConfigStore {
    backend: Arc<dyn Backend>,
    current: watch::Sender<Arc<Configuration>>,
    revision: AtomicU64,
    closed: AtomicBool,
}

impl ConfigStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let (current, _) = watch::channel(Arc::new(Configuration::default()));
        Self {
            backend,
            current,
            revision: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// The current local copy.
    pub fn snapshot(&self) -> Arc<Configuration> {
        self.current.borrow().clone()
    }

    /// Subscribe to replacements of the local copy.
    pub fn subscribe(&self) -> Subscription<Configuration> {
        Subscription::new(self.current.subscribe())
    }

    /// Number of times the local copy has been replaced. Zero until the
    /// first successful load.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // ── Remote round trips ───────────────────────────────────────────

    /// Fetch the remote configuration and replace the local copy.
    ///
    /// On failure the previous copy is kept and the error returned.
    pub async fn load(&self) -> Result<Arc<Configuration>, CoreError> {
        let config = self.backend.fetch_config().await.inspect_err(|e| {
            warn!(error = %e, "configuration load failed");
        })?;

        if let Err(e) = config.validate_unique_ids() {
            warn!(error = %e, "remote configuration has duplicate instance ids");
        }

        Ok(self.publish(config))
    }

    /// Run one fetch-mutate-push cycle with an infallible mutator.
    pub async fn commit<F>(&self, mutator: F) -> Result<Arc<Configuration>, CoreError>
    where
        F: FnOnce(&mut Configuration) + Send,
    {
        self.try_commit(|config| {
            mutator(config);
            Ok(())
        })
        .await
    }

    /// Run one fetch-mutate-push cycle.
    ///
    /// Re-fetches the remote document, applies `mutator`, pushes the
    /// result and reloads. Nothing is pushed if the fetch or the mutator
    /// fails, or if the result has an instance in the wrong role list.
    /// Returns the configuration now held locally.
    pub async fn try_commit<F>(&self, mutator: F) -> Result<Arc<Configuration>, CoreError>
    where
        F: FnOnce(&mut Configuration) -> Result<(), CoreError> + Send,
    {
        let mut config = self.backend.fetch_config().await?;
        mutator(&mut config)?;
        self.push_and_reload(config).await
    }

    /// Replace the remote configuration with an empty one.
    pub async fn reset(&self) -> Result<Arc<Configuration>, CoreError> {
        info!("resetting remote configuration");
        self.push_and_reload(Configuration::default()).await
    }

    /// Stop publishing. In-flight commits still push, but their reload
    /// and notification are skipped.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    // ── Internals ────────────────────────────────────────────────────

    async fn push_and_reload(&self, config: Configuration) -> Result<Arc<Configuration>, CoreError> {
        config.validate_roles()?;
        self.backend.push_config(&config).await?;

        if self.is_closed() {
            debug!("store closed, discarding commit result");
            return Ok(Arc::new(config));
        }

        match self.backend.fetch_config().await {
            Ok(fresh) => Ok(self.publish(fresh)),
            Err(e) => {
                // The push landed; the pushed document is the best copy we have.
                warn!(error = %e, "reload after commit failed, keeping pushed copy");
                Ok(self.publish(config))
            }
        }
    }

    fn publish(&self, config: Configuration) -> Arc<Configuration> {
        let config = Arc::new(config);
        if self.is_closed() {
            return config;
        }
        self.revision.fetch_add(1, Ordering::AcqRel);
        self.current.send_replace(config.clone());
        debug!(
            revision = self.revision(),
            instances = config.len(),
            "configuration replaced"
        );
        config
    }
}
