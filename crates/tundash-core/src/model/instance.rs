// ── Tunnel instances ──
//
// A tunnel instance is one phantun client or server process entry.
// The role-specific endpoint fields live in `Endpoint`, so an instance
// cannot change variant after creation without being rebuilt.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use uuid::Uuid;

// ── InstanceId ──────────────────────────────────────────────────────

/// Stable identifier of a tunnel instance, unique across clients and
/// servers. Assigned once at creation and never reused. The default is
/// the empty id, which no stored instance carries.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct InstanceId(String);

impl InstanceId {
    /// Mint a fresh random id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InstanceId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_owned()))
    }
}

impl From<String> for InstanceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl AsRef<str> for InstanceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ── Variant ─────────────────────────────────────────────────────────

/// Tunnel role. Fixed for the lifetime of an instance.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Client,
    Server,
}

// ── Port ────────────────────────────────────────────────────────────

/// A port field exactly as the backend stored it.
///
/// The backend keeps ports as free-form text and never validates them,
/// so the raw JSON value is kept. A field nobody edits goes back out
/// byte-identical, including text that is not a port number. Ports set
/// from this crate use the backend's string form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Port(Option<Value>);

impl Port {
    pub(crate) fn from_wire(raw: Option<Value>) -> Self {
        Self(raw)
    }

    pub(crate) fn to_wire(&self) -> Option<Value> {
        self.0.clone()
    }

    /// Numeric value, when the stored value is a valid port.
    pub fn number(&self) -> Option<u16> {
        match &self.0 {
            Some(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Some(Value::String(text)) => text.trim().parse().ok(),
            _ => None,
        }
    }

    /// Missing, `null` or blank.
    pub fn is_unset(&self) -> bool {
        match &self.0 {
            None | Some(Value::Null) => true,
            Some(Value::String(text)) => text.trim().is_empty(),
            Some(_) => false,
        }
    }

    /// Set to something that is not a port number.
    pub fn is_invalid(&self) -> bool {
        !self.is_unset() && self.number().is_none()
    }
}

impl From<u16> for Port {
    fn from(port: u16) -> Self {
        Self(Some(Value::String(port.to_string())))
    }
}

impl From<Option<u16>> for Port {
    fn from(port: Option<u16>) -> Self {
        port.map_or_else(Self::default, Self::from)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(Value::String(text)) => f.write_str(text.trim()),
            Some(Value::Null) | None => Ok(()),
            Some(other) => write!(f, "{other}"),
        }
    }
}

impl Serialize for Port {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.number() {
            Some(port) => serializer.serialize_u16(port),
            None if self.is_unset() => serializer.serialize_none(),
            None => serializer.collect_str(self),
        }
    }
}

// ── Endpoint ────────────────────────────────────────────────────────

/// Role-specific addressing.
///
/// A client listens on `local_addr:local_port` and dials the phantun
/// server at `remote_addr:remote_port`. A server listens on `local_port`
/// and forwards to `remote_addr:remote_port`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum Endpoint {
    Client {
        local_addr: String,
        local_port: Port,
        remote_addr: String,
        remote_port: Port,
    },
    Server {
        local_port: Port,
        remote_addr: String,
        remote_port: Port,
    },
}

impl Endpoint {
    pub fn variant(&self) -> Variant {
        match self {
            Self::Client { .. } => Variant::Client,
            Self::Server { .. } => Variant::Server,
        }
    }

    /// Listen address. Servers have none.
    pub fn local_addr(&self) -> Option<&str> {
        match self {
            Self::Client { local_addr, .. } => Some(local_addr),
            Self::Server { .. } => None,
        }
    }

    pub fn local_port(&self) -> &Port {
        match self {
            Self::Client { local_port, .. } | Self::Server { local_port, .. } => local_port,
        }
    }

    pub fn remote_addr(&self) -> &str {
        match self {
            Self::Client { remote_addr, .. } | Self::Server { remote_addr, .. } => remote_addr,
        }
    }

    pub fn remote_port(&self) -> &Port {
        match self {
            Self::Client { remote_port, .. } | Self::Server { remote_port, .. } => remote_port,
        }
    }
}

// ── AdvancedOptions ─────────────────────────────────────────────────

/// Optional TUN tuning. Empty strings mean "use the phantun default".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AdvancedOptions {
    pub tun_name: String,
    pub tun_local_ipv6: String,
    pub tun_peer_ipv6: String,
    pub handshake_file: String,
    pub ipv4_only: bool,
}

// ── TunnelInstance ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TunnelInstance {
    pub id: InstanceId,
    /// Display name, may be empty.
    pub alias: String,
    pub enabled: bool,
    #[serde(flatten)]
    pub endpoint: Endpoint,
    pub tun_local: String,
    pub tun_peer: String,
    pub advanced: AdvancedOptions,
    /// Fields the backend sent that this crate does not model. Written
    /// back untouched on every push.
    #[serde(skip)]
    pub extra: Map<String, Value>,
}

impl TunnelInstance {
    pub fn variant(&self) -> Variant {
        self.endpoint.variant()
    }

    /// Alias if set, otherwise the id.
    pub fn display_name(&self) -> &str {
        if self.alias.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.alias
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = InstanceId::generate();
        let b = InstanceId::generate();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn variant_parses_case_insensitively() {
        assert_eq!("Server".parse::<Variant>().ok(), Some(Variant::Server));
        assert_eq!(Variant::Client.to_string(), "client");
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let instance = TunnelInstance {
            id: "s1".into(),
            alias: "  ".into(),
            enabled: true,
            endpoint: Endpoint::Server {
                local_port: Port::from(4567),
                remote_addr: "10.0.0.1".into(),
                remote_port: Port::from(51820),
            },
            tun_local: String::new(),
            tun_peer: String::new(),
            advanced: AdvancedOptions::default(),
            extra: Map::new(),
        };
        assert_eq!(instance.display_name(), "s1");
        assert_eq!(instance.endpoint.local_addr(), None);
        assert_eq!(instance.endpoint.remote_port().number(), Some(51820));
    }

    #[test]
    fn port_keeps_raw_value() {
        let text = Port::from_wire(Some(Value::String("4567".into())));
        assert_eq!(text.number(), Some(4567));
        assert_eq!(text.to_wire(), Some(Value::String("4567".into())));

        let number = Port::from_wire(Some(Value::from(51820)));
        assert_eq!(number.number(), Some(51820));
        assert_eq!(number.to_wire(), Some(Value::from(51820)));

        let junk = Port::from_wire(Some(Value::String("abc".into())));
        assert!(junk.is_invalid());
        assert_eq!(junk.number(), None);
        assert_eq!(junk.to_string(), "abc");

        let blank = Port::from_wire(Some(Value::String(String::new())));
        assert!(blank.is_unset());
        assert!(!blank.is_invalid());
        assert_eq!(Port::from(None), Port::default());
        assert_eq!(Port::from(80).to_wire(), Some(Value::String("80".into())));
    }

    #[test]
    fn port_serializes_as_number_or_raw_text() {
        let json = |port: Port| serde_json::to_value(port).unwrap();
        assert_eq!(json(Port::from(4567)), serde_json::json!(4567));
        assert_eq!(json(Port::default()), Value::Null);
        assert_eq!(
            json(Port::from_wire(Some(Value::from(70000)))),
            serde_json::json!("70000")
        );
    }
}
