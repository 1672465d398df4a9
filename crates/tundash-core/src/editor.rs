// ── Instance editor ──
//
// Add/edit/delete/enable workflow for tunnel instances. Each operation
// is exactly one ConfigStore commit. Enable changes may be followed by
// a restart, which only runs after the commit succeeded and whose
// failure is reported separately from the commit.

use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::CoreError;
use crate::model::{
    AdvancedOptions, Configuration, Endpoint, InstanceId, LogLevel, Port, TunnelInstance,
    Variant,
};
use crate::store::ConfigStore;

// ── Inputs ───────────────────────────────────────────────────────────

/// Fields for a new instance. `local_addr` only applies to clients.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceDraft {
    /// Explicit id. A fresh one is minted when `None`.
    pub id: Option<InstanceId>,
    pub alias: String,
    pub enabled: bool,
    pub local_addr: String,
    pub local_port: Option<u16>,
    pub remote_addr: String,
    pub remote_port: Option<u16>,
    pub tun_local: String,
    pub tun_peer: String,
    pub advanced: AdvancedOptions,
}

impl InstanceDraft {
    fn into_instance(self, variant: Variant, id: InstanceId) -> Result<TunnelInstance, CoreError> {
        validate_port("local_port", self.local_port)?;
        validate_port("remote_port", self.remote_port)?;

        let endpoint = match variant {
            Variant::Client => Endpoint::Client {
                local_addr: self.local_addr,
                local_port: self.local_port.into(),
                remote_addr: self.remote_addr,
                remote_port: self.remote_port.into(),
            },
            Variant::Server => {
                if !self.local_addr.trim().is_empty() {
                    return Err(CoreError::VariantMismatch {
                        field: "local_addr".into(),
                        variant,
                    });
                }
                Endpoint::Server {
                    local_port: self.local_port.into(),
                    remote_addr: self.remote_addr,
                    remote_port: self.remote_port.into(),
                }
            }
        };

        Ok(TunnelInstance {
            id,
            alias: self.alias,
            enabled: self.enabled,
            endpoint,
            tun_local: self.tun_local,
            tun_peer: self.tun_peer,
            advanced: self.advanced,
            extra: serde_json::Map::new(),
        })
    }
}

/// Partial update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstancePatch {
    pub alias: Option<String>,
    pub enabled: Option<bool>,
    pub local_addr: Option<String>,
    pub local_port: Option<u16>,
    pub remote_addr: Option<String>,
    pub remote_port: Option<u16>,
    pub tun_local: Option<String>,
    pub tun_peer: Option<String>,
    pub tun_name: Option<String>,
    pub tun_local_ipv6: Option<String>,
    pub tun_peer_ipv6: Option<String>,
    pub handshake_file: Option<String>,
    pub ipv4_only: Option<bool>,
}

impl InstancePatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to `instance`. Validates before touching anything.
    pub fn apply(self, instance: &mut TunnelInstance) -> Result<(), CoreError> {
        validate_port("local_port", self.local_port)?;
        validate_port("remote_port", self.remote_port)?;
        if self.local_addr.is_some() && instance.variant() == Variant::Server {
            return Err(CoreError::VariantMismatch {
                field: "local_addr".into(),
                variant: Variant::Server,
            });
        }

        match &mut instance.endpoint {
            Endpoint::Client {
                local_addr,
                local_port,
                remote_addr,
                remote_port,
            } => {
                set(local_addr, self.local_addr);
                set_port(local_port, self.local_port);
                set(remote_addr, self.remote_addr);
                set_port(remote_port, self.remote_port);
            }
            Endpoint::Server {
                local_port,
                remote_addr,
                remote_port,
            } => {
                set_port(local_port, self.local_port);
                set(remote_addr, self.remote_addr);
                set_port(remote_port, self.remote_port);
            }
        }

        set(&mut instance.alias, self.alias);
        set(&mut instance.enabled, self.enabled);
        set(&mut instance.tun_local, self.tun_local);
        set(&mut instance.tun_peer, self.tun_peer);

        let advanced = &mut instance.advanced;
        set(&mut advanced.tun_name, self.tun_name);
        set(&mut advanced.tun_local_ipv6, self.tun_local_ipv6);
        set(&mut advanced.tun_peer_ipv6, self.tun_peer_ipv6);
        set(&mut advanced.handshake_file, self.handshake_file);
        set(&mut advanced.ipv4_only, self.ipv4_only);
        Ok(())
    }
}

/// Service-wide settings update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneralPatch {
    pub enabled: Option<bool>,
    pub log_level: Option<LogLevel>,
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn set_port(slot: &mut Port, value: Option<u16>) {
    if let Some(port) = value {
        *slot = Port::from(port);
    }
}

fn validate_port(field: &str, port: Option<u16>) -> Result<(), CoreError> {
    if port == Some(0) {
        return Err(CoreError::validation(field, "port must be between 1 and 65535"));
    }
    Ok(())
}

// ── Outcomes ─────────────────────────────────────────────────────────

/// Whether the configuration was re-applied after a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyState {
    NotRequested,
    Applied,
    /// Saved but not applied.
    Failed(CoreError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EditOutcome {
    /// The configuration held locally after the commit.
    pub configuration: Arc<Configuration>,
    pub apply: ApplyState,
}

// ── InstanceEditor ───────────────────────────────────────────────────

pub struct InstanceEditor {
    store: Arc<ConfigStore>,
    backend: Arc<dyn Backend>,
    restart_on_toggle: bool,
}

impl InstanceEditor {
    pub fn new(store: Arc<ConfigStore>, backend: Arc<dyn Backend>, restart_on_toggle: bool) -> Self {
        Self {
            store,
            backend,
            restart_on_toggle,
        }
    }

    /// Append a new instance to the end of its list.
    pub async fn add(&self, variant: Variant, draft: InstanceDraft) -> Result<InstanceId, CoreError> {
        let id = draft.id.clone().unwrap_or_else(InstanceId::generate);
        if id.is_empty() {
            return Err(CoreError::validation("id", "must not be empty"));
        }
        let instance = draft.into_instance(variant, id.clone())?;

        self.store
            .try_commit(|config| {
                if config.contains(&instance.id) {
                    return Err(CoreError::DuplicateInstanceId {
                        id: instance.id.to_string(),
                    });
                }
                config.list_mut(variant).push(instance);
                Ok(())
            })
            .await?;

        info!(%id, %variant, "tunnel instance added");
        Ok(id)
    }

    /// Patch an existing instance. Unknown ids fail without pushing.
    pub async fn update(
        &self,
        id: &InstanceId,
        patch: InstancePatch,
    ) -> Result<Arc<Configuration>, CoreError> {
        self.store
            .try_commit(|config| {
                let instance = config
                    .instance_mut(id)
                    .ok_or_else(|| not_found(id))?;
                patch.apply(instance)
            })
            .await
    }

    /// Remove an instance. Removing an unknown id commits the document
    /// unchanged.
    pub async fn remove(&self, id: &InstanceId) -> Result<Arc<Configuration>, CoreError> {
        self.store
            .commit(|config| {
                if config.remove(id).is_none() {
                    info!(%id, "remove of unknown instance, committing unchanged");
                }
            })
            .await
    }

    pub async fn set_enabled(&self, id: &InstanceId, enabled: bool) -> Result<EditOutcome, CoreError> {
        let configuration = self
            .store
            .try_commit(|config| {
                let instance = config
                    .instance_mut(id)
                    .ok_or_else(|| not_found(id))?;
                instance.enabled = enabled;
                Ok(())
            })
            .await?;
        Ok(self.apply_after_toggle(configuration).await)
    }

    /// Flip `enabled` on the remote copy.
    pub async fn toggle(&self, id: &InstanceId) -> Result<EditOutcome, CoreError> {
        let configuration = self
            .store
            .try_commit(|config| {
                let instance = config
                    .instance_mut(id)
                    .ok_or_else(|| not_found(id))?;
                instance.enabled = !instance.enabled;
                Ok(())
            })
            .await?;
        Ok(self.apply_after_toggle(configuration).await)
    }

    /// Update the service master switch and log level. A master switch
    /// change is followed by a restart like an instance toggle.
    pub async fn set_general(&self, patch: GeneralPatch) -> Result<EditOutcome, CoreError> {
        let switches = patch.enabled.is_some();
        let configuration = self
            .store
            .commit(|config| {
                set(&mut config.general.enabled, patch.enabled);
                set(&mut config.general.log_level, patch.log_level);
            })
            .await?;

        if switches {
            Ok(self.apply_after_toggle(configuration).await)
        } else {
            Ok(EditOutcome {
                configuration,
                apply: ApplyState::NotRequested,
            })
        }
    }

    /// Ask the backend to re-apply its configuration.
    pub async fn restart(&self) -> Result<(), CoreError> {
        self.backend.restart().await
    }

    async fn apply_after_toggle(&self, configuration: Arc<Configuration>) -> EditOutcome {
        let apply = if self.restart_on_toggle {
            match self.backend.restart().await {
                Ok(()) => ApplyState::Applied,
                Err(e) => {
                    warn!(error = %e, "configuration saved but restart failed");
                    ApplyState::Failed(e)
                }
            }
        } else {
            ApplyState::NotRequested
        };

        EditOutcome {
            configuration,
            apply,
        }
    }
}

fn not_found(id: &InstanceId) -> CoreError {
    CoreError::InstanceNotFound { id: id.to_string() }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::{MemoryBackend, client, server};
    use pretty_assertions::assert_eq;

    fn editor(backend: &Arc<MemoryBackend>, restart: bool) -> InstanceEditor {
        let store = Arc::new(ConfigStore::new(backend.clone()));
        InstanceEditor::new(store, backend.clone(), restart)
    }

    fn seeded() -> Arc<MemoryBackend> {
        Arc::new(MemoryBackend::with_config(Configuration {
            clients: vec![client("c1", true)],
            servers: vec![server("s1", true), server("s2", true)],
            ..Configuration::default()
        }))
    }

    #[tokio::test]
    async fn set_enabled_changes_only_that_flag() {
        let backend = seeded();
        let before = backend.remote();

        let outcome = editor(&backend, false)
            .set_enabled(&"s1".into(), false)
            .await
            .unwrap();

        let pushed = backend.pushes();
        assert_eq!(pushed.len(), 1);
        let mut expected = before;
        expected.servers[0].enabled = false;
        assert_eq!(pushed[0], expected);
        assert_eq!(outcome.apply, ApplyState::NotRequested);
        assert_eq!(backend.restart_count(), 0);
    }

    #[tokio::test]
    async fn remove_of_unknown_id_commits_unchanged() {
        let backend = seeded();
        let before = backend.remote();

        editor(&backend, false)
            .remove(&"missing-id".into())
            .await
            .unwrap();

        assert_eq!(backend.pushes(), vec![before]);
    }

    #[tokio::test]
    async fn remove_shifts_following_entries() {
        let backend = seeded();
        let config = editor(&backend, false).remove(&"s1".into()).await.unwrap();
        let ids: Vec<_> = config.servers.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["s2"]);
    }

    #[tokio::test]
    async fn add_appends_with_fresh_id() {
        let backend = seeded();
        let draft = InstanceDraft {
            alias: "new".into(),
            enabled: true,
            local_port: Some(5000),
            remote_addr: "10.0.0.2".into(),
            remote_port: Some(51821),
            ..InstanceDraft::default()
        };

        let id = editor(&backend, false).add(Variant::Server, draft).await.unwrap();

        let remote = backend.remote();
        assert_eq!(remote.servers.len(), 3);
        assert_eq!(remote.servers[2].id, id);
        assert_eq!(remote.servers[2].endpoint.local_port().number(), Some(5000));
        assert!(!["c1", "s1", "s2"].contains(&id.as_str()));
    }

    #[tokio::test]
    async fn add_rejects_duplicate_and_mismatched_fields() {
        let backend = seeded();
        let editor = editor(&backend, false);

        let duplicate = InstanceDraft {
            id: Some("c1".into()),
            ..InstanceDraft::default()
        };
        assert_eq!(
            editor.add(Variant::Server, duplicate).await.unwrap_err(),
            CoreError::DuplicateInstanceId { id: "c1".into() }
        );

        let mismatched = InstanceDraft {
            local_addr: "127.0.0.1".into(),
            ..InstanceDraft::default()
        };
        assert!(matches!(
            editor.add(Variant::Server, mismatched).await.unwrap_err(),
            CoreError::VariantMismatch { .. }
        ));
        assert_eq!(backend.push_count(), 0);
    }

    #[tokio::test]
    async fn update_unknown_id_pushes_nothing() {
        let backend = seeded();
        let patch = InstancePatch {
            alias: Some("x".into()),
            ..InstancePatch::default()
        };

        let err = editor(&backend, false)
            .update(&"nope".into(), patch)
            .await
            .unwrap_err();
        assert_eq!(err, CoreError::InstanceNotFound { id: "nope".into() });
        assert_eq!(backend.push_count(), 0);
    }

    #[tokio::test]
    async fn update_patches_only_given_fields() {
        let backend = seeded();
        let patch = InstancePatch {
            remote_port: Some(6000),
            tun_name: Some("tun7".into()),
            ..InstancePatch::default()
        };

        let config = editor(&backend, false)
            .update(&"c1".into(), patch)
            .await
            .unwrap();

        let c1 = config.instance(&"c1".into()).unwrap();
        assert_eq!(c1.endpoint.remote_port().number(), Some(6000));
        assert_eq!(c1.endpoint.local_port().number(), Some(1234));
        assert_eq!(c1.advanced.tun_name, "tun7");
        assert_eq!(c1.alias, "C1");
    }

    #[tokio::test]
    async fn update_rejects_local_addr_on_server() {
        let backend = seeded();
        let patch = InstancePatch {
            local_addr: Some("0.0.0.0".into()),
            ..InstancePatch::default()
        };
        let err = editor(&backend, false)
            .update(&"s1".into(), patch)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::VariantMismatch {
                field: "local_addr".into(),
                variant: Variant::Server
            }
        );
    }

    #[tokio::test]
    async fn toggle_restarts_after_commit() {
        let backend = seeded();
        let outcome = editor(&backend, true).toggle(&"s2".into()).await.unwrap();

        assert_eq!(outcome.apply, ApplyState::Applied);
        assert!(!outcome.configuration.instance(&"s2".into()).unwrap().enabled);
        assert_eq!(backend.restart_count(), 1);
    }

    #[tokio::test]
    async fn restart_failure_is_saved_but_not_applied() {
        let backend = seeded();
        backend.fail_restart(true);

        let outcome = editor(&backend, true)
            .set_enabled(&"s1".into(), false)
            .await
            .unwrap();

        assert!(matches!(outcome.apply, ApplyState::Failed(_)));
        assert!(!backend.remote().servers[0].enabled);
    }

    #[tokio::test]
    async fn failed_commit_never_restarts() {
        let backend = seeded();
        backend.fail_fetches(true);

        assert!(editor(&backend, true).toggle(&"s1".into()).await.is_err());
        assert_eq!(backend.restart_count(), 0);
    }

    #[tokio::test]
    async fn general_settings_update() {
        let backend = seeded();
        let outcome = editor(&backend, true)
            .set_general(GeneralPatch {
                log_level: Some(LogLevel::Debug),
                ..GeneralPatch::default()
            })
            .await
            .unwrap();

        assert_eq!(outcome.apply, ApplyState::NotRequested);
        assert_eq!(backend.remote().general.log_level, LogLevel::Debug);
        assert_eq!(backend.restart_count(), 0);
    }

    #[test]
    fn zero_port_is_invalid() {
        let mut instance = server("s1", true);
        let err = InstancePatch {
            local_port: Some(0),
            ..InstancePatch::default()
        }
        .apply(&mut instance)
        .unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert_eq!(instance, server("s1", true));
    }
}
