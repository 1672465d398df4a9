// ── Configuration document ──
//
// The locally held copy of the backend's configuration. Clients and
// servers are kept in display order; ids are unique across both lists.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::instance::{InstanceId, TunnelInstance, Variant};
use crate::error::CoreError;

// ── LogLevel ────────────────────────────────────────────────────────

/// Phantun log level. Unknown values from the backend are carried as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
    Other(String),
}

impl LogLevel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
            Self::Other(s) => s,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "" | "info" => Self::Info,
            "error" => Self::Error,
            "warn" | "warning" => Self::Warn,
            "debug" => Self::Debug,
            "trace" => Self::Trace,
            _ => Self::Other(s.trim().to_owned()),
        })
    }
}

impl Serialize for LogLevel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ── GeneralSettings ─────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeneralSettings {
    /// Service master switch.
    pub enabled: bool,
    pub log_level: LogLevel,
    #[serde(skip)]
    pub extra: Map<String, Value>,
}

// ── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Configuration {
    pub general: GeneralSettings,
    pub clients: Vec<TunnelInstance>,
    pub servers: Vec<TunnelInstance>,
    #[serde(skip)]
    pub extra: Map<String, Value>,
}

impl Configuration {
    /// All instances, clients first, each list in display order.
    pub fn instances(&self) -> impl Iterator<Item = &TunnelInstance> {
        self.clients.iter().chain(self.servers.iter())
    }

    pub fn instance(&self, id: &InstanceId) -> Option<&TunnelInstance> {
        self.instances().find(|i| &i.id == id)
    }

    pub fn instance_mut(&mut self, id: &InstanceId) -> Option<&mut TunnelInstance> {
        self.clients
            .iter_mut()
            .chain(self.servers.iter_mut())
            .find(|i| &i.id == id)
    }

    pub fn contains(&self, id: &InstanceId) -> bool {
        self.instance(id).is_some()
    }

    /// Which list holds `id`, and at which index.
    pub fn position(&self, id: &InstanceId) -> Option<(Variant, usize)> {
        if let Some(idx) = self.clients.iter().position(|i| &i.id == id) {
            return Some((Variant::Client, idx));
        }
        self.servers
            .iter()
            .position(|i| &i.id == id)
            .map(|idx| (Variant::Server, idx))
    }

    pub fn list(&self, variant: Variant) -> &[TunnelInstance] {
        match variant {
            Variant::Client => &self.clients,
            Variant::Server => &self.servers,
        }
    }

    pub fn list_mut(&mut self, variant: Variant) -> &mut Vec<TunnelInstance> {
        match variant {
            Variant::Client => &mut self.clients,
            Variant::Server => &mut self.servers,
        }
    }

    /// Remove an instance, shifting later entries up. Returns the removed
    /// instance, or `None` if the id is unknown.
    pub fn remove(&mut self, id: &InstanceId) -> Option<TunnelInstance> {
        let (variant, idx) = self.position(id)?;
        Some(self.list_mut(variant).remove(idx))
    }

    pub fn len(&self) -> usize {
        self.clients.len() + self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty() && self.servers.is_empty()
    }

    pub fn validate_unique_ids(&self) -> Result<(), CoreError> {
        let mut seen = HashSet::new();
        for instance in self.instances() {
            if !seen.insert(&instance.id) {
                return Err(CoreError::DuplicateInstanceId {
                    id: instance.id.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Every instance sits in the list matching its role.
    pub fn validate_roles(&self) -> Result<(), CoreError> {
        for variant in [Variant::Client, Variant::Server] {
            if let Some(misplaced) = self.list(variant).iter().find(|i| i.variant() != variant) {
                return Err(CoreError::VariantMismatch {
                    field: format!("{variant}s"),
                    variant: misplaced.variant(),
                });
            }
        }
        Ok(())
    }
}
