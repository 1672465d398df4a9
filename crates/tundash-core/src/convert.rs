// ── Wire-to-domain conversions ──
//
// Bridges tundash-api's JSON models into the canonical domain types and
// back. Unknown wire fields ride along in `extra` so a configuration
// pushed after an edit carries everything the backend sent.

use tundash_api::models::{
    BinariesEntry, ClientEntry, ConfigDocument, DiagnosticsEntry, FirewallRules as WireRules,
    GeneralSection, InterfaceEntry, IptablesEntry, LogRecord, ProcessEntry, ServerEntry,
    StatusResponse, TunnelFields,
};

use crate::model::{
    AdvancedOptions, BinaryInfo, Configuration, Diagnostics, Endpoint, FirewallCounters,
    FirewallRules, GeneralSettings, LogEntry, Port, ProcessStatus, StatusSnapshot, SYSTEM_SOURCE,
    TunInterface, TunnelInstance,
};

/// Marker the backend uses for a binary it could not find.
const MISSING_BINARY: &str = "missing";

// ── Configuration ────────────────────────────────────────────────────

impl From<ConfigDocument> for Configuration {
    fn from(doc: ConfigDocument) -> Self {
        Self {
            general: GeneralSettings {
                enabled: doc.general.enabled,
                log_level: doc.general.log_level.parse().unwrap_or_default(),
                extra: doc.general.extra,
            },
            clients: doc.clients.into_iter().map(TunnelInstance::from).collect(),
            servers: doc.servers.into_iter().map(TunnelInstance::from).collect(),
            extra: doc.extra,
        }
    }
}

impl From<&Configuration> for ConfigDocument {
    fn from(config: &Configuration) -> Self {
        Self {
            general: GeneralSection {
                enabled: config.general.enabled,
                log_level: config.general.log_level.to_string(),
                extra: config.general.extra.clone(),
            },
            clients: config.clients.iter().filter_map(client_entry).collect(),
            servers: config.servers.iter().filter_map(server_entry).collect(),
            extra: config.extra.clone(),
        }
    }
}

impl From<ClientEntry> for TunnelInstance {
    fn from(e: ClientEntry) -> Self {
        let (tun_local, tun_peer, advanced, extra) = split_tunnel(e.tunnel);
        Self {
            endpoint: Endpoint::Client {
                local_addr: e.local_addr,
                local_port: port(&e.id, "local_port", e.local_port),
                remote_addr: e.remote_addr,
                remote_port: port(&e.id, "remote_port", e.remote_port),
            },
            id: e.id.into(),
            alias: e.alias,
            enabled: e.enabled,
            tun_local,
            tun_peer,
            advanced,
            extra,
        }
    }
}

impl From<ServerEntry> for TunnelInstance {
    fn from(e: ServerEntry) -> Self {
        let (tun_local, tun_peer, advanced, extra) = split_tunnel(e.tunnel);
        Self {
            endpoint: Endpoint::Server {
                local_port: port(&e.id, "local_port", e.local_port),
                remote_addr: e.remote_addr,
                remote_port: port(&e.id, "remote_port", e.remote_port),
            },
            id: e.id.into(),
            alias: e.alias,
            enabled: e.enabled,
            tun_local,
            tun_peer,
            advanced,
            extra,
        }
    }
}

/// Ports the backend cannot have validated are kept verbatim.
fn port(id: &str, field: &str, raw: Option<serde_json::Value>) -> Port {
    let port = Port::from_wire(raw);
    if port.is_invalid() {
        tracing::warn!(id, field, value = %port, "port is not a number, keeping it as stored");
    }
    port
}

fn split_tunnel(
    t: TunnelFields,
) -> (
    String,
    String,
    AdvancedOptions,
    serde_json::Map<String, serde_json::Value>,
) {
    let advanced = AdvancedOptions {
        tun_name: t.tun_name,
        tun_local_ipv6: t.tun_local_ipv6,
        tun_peer_ipv6: t.tun_peer_ipv6,
        handshake_file: t.handshake_file,
        ipv4_only: t.ipv4_only,
    };
    (t.tun_local, t.tun_peer, advanced, t.extra)
}

fn tunnel_fields(instance: &TunnelInstance) -> TunnelFields {
    let a = &instance.advanced;
    TunnelFields {
        tun_local: instance.tun_local.clone(),
        tun_peer: instance.tun_peer.clone(),
        tun_name: a.tun_name.clone(),
        tun_local_ipv6: a.tun_local_ipv6.clone(),
        tun_peer_ipv6: a.tun_peer_ipv6.clone(),
        handshake_file: a.handshake_file.clone(),
        ipv4_only: a.ipv4_only,
        extra: instance.extra.clone(),
    }
}

/// Only client-role instances produce client entries. Commits reject a
/// misplaced instance before converting, so one reaching here is skipped.
fn client_entry(instance: &TunnelInstance) -> Option<ClientEntry> {
    let Endpoint::Client {
        local_addr,
        local_port,
        remote_addr,
        remote_port,
    } = &instance.endpoint
    else {
        tracing::warn!(id = %instance.id, "server instance found in client list, skipping");
        return None;
    };

    Some(ClientEntry {
        id: instance.id.to_string(),
        alias: instance.alias.clone(),
        enabled: instance.enabled,
        local_addr: local_addr.clone(),
        local_port: local_port.to_wire(),
        remote_addr: remote_addr.clone(),
        remote_port: remote_port.to_wire(),
        tunnel: tunnel_fields(instance),
    })
}

fn server_entry(instance: &TunnelInstance) -> Option<ServerEntry> {
    let Endpoint::Server {
        local_port,
        remote_addr,
        remote_port,
    } = &instance.endpoint
    else {
        tracing::warn!(id = %instance.id, "client instance found in server list, skipping");
        return None;
    };

    Some(ServerEntry {
        id: instance.id.to_string(),
        alias: instance.alias.clone(),
        enabled: instance.enabled,
        local_port: local_port.to_wire(),
        remote_addr: remote_addr.clone(),
        remote_port: remote_port.to_wire(),
        tunnel: tunnel_fields(instance),
    })
}

// ── Status ───────────────────────────────────────────────────────────

impl From<StatusResponse> for StatusSnapshot {
    fn from(resp: StatusResponse) -> Self {
        let processes = resp
            .processes
            .into_iter()
            .map(|p| {
                let status = ProcessStatus::from(p);
                (status.id.clone(), status)
            })
            .collect();

        Self {
            processes,
            diagnostics: resp.diagnostics.map(Diagnostics::from).unwrap_or_default(),
            service_enabled: resp.enabled,
            fetched_at: None,
        }
    }
}

impl From<ProcessEntry> for ProcessStatus {
    fn from(p: ProcessEntry) -> Self {
        Self {
            id: p.id.into(),
            alias: p.alias,
            variant: p.kind.and_then(|k| k.parse().ok()),
            running: p.running,
            pid: p.pid.filter(|pid| *pid > 0),
            local: non_empty(p.local),
            remote: non_empty(p.remote),
            tun_local: non_empty(p.tun_local),
            tun_peer: non_empty(p.tun_peer),
        }
    }
}

impl From<DiagnosticsEntry> for Diagnostics {
    fn from(d: DiagnosticsEntry) -> Self {
        Self {
            binaries: d.binaries.map(BinaryInfo::from),
            interfaces: d.interfaces.into_iter().map(TunInterface::from).collect(),
            firewall: d.iptables.map(FirewallCounters::from),
        }
    }
}

impl From<BinariesEntry> for BinaryInfo {
    fn from(b: BinariesEntry) -> Self {
        let client = present(b.client);
        let server = present(b.server);
        let ok = b
            .ok
            .unwrap_or_else(|| client.is_some() && server.is_some());
        Self { client, server, ok }
    }
}

impl From<InterfaceEntry> for TunInterface {
    fn from(i: InterfaceEntry) -> Self {
        Self {
            name: i.name,
            status: i.status,
            addrs: i.addrs,
        }
    }
}

impl From<IptablesEntry> for FirewallCounters {
    fn from(entry: IptablesEntry) -> Self {
        match entry {
            IptablesEntry::Counters(c) => Self::Counts {
                masquerade: c.masquerade,
                dnat: c.dnat,
                total: c.total,
            },
            IptablesEntry::Raw(text) => Self::Raw(text),
        }
    }
}

impl From<WireRules> for FirewallRules {
    fn from(r: WireRules) -> Self {
        Self {
            raw: r.raw,
            rules: r.rules,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn present(value: Option<String>) -> Option<String> {
    non_empty(value).filter(|v| v != MISSING_BINARY)
}

// ── Log records ──────────────────────────────────────────────────────

/// Parse one raw record from the log stream.
///
/// Returns `None` for anything that is not a JSON object carrying
/// `content` (or the older `message`).
pub fn parse_log_record(text: &str) -> Option<LogEntry> {
    let record: LogRecord = serde_json::from_str(text).ok()?;
    let content = record.content?;
    Some(LogEntry {
        timestamp: record.timestamp,
        source: non_empty(record.process_id).unwrap_or_else(|| SYSTEM_SOURCE.to_owned()),
        stream: non_empty(record.stream),
        content,
    })
}
