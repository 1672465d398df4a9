// ── Topology rendering ──
//
// `render` is a pure function of (configuration, status snapshot) to a
// renderable graph: one row per instance, each a four-node chain from
// the local endpoint through the TUN pair to the remote endpoint.
// `TopologyView` remembers the last graph so a surface only restarts
// the link animations that actually changed.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use strum::Display;

use crate::model::{
    Configuration, Endpoint, InstanceId, Port, ProcessStatus, StatusSnapshot, TunnelInstance,
    Variant,
};

/// Label used when neither status nor configuration has a value.
pub const PLACEHOLDER: &str = "-";

/// Listen address shown for servers, which bind all interfaces.
const SERVER_LISTEN_ADDR: &str = "0.0.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    LocalEndpoint,
    TunnelLocal,
    TunnelTransport,
    RemoteEndpoint,
}

/// Where a node label came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelSource {
    Live,
    Configured,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyNode {
    pub kind: NodeKind,
    pub label: String,
    pub source: LabelSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopologyLink {
    pub from: NodeKind,
    pub to: NodeKind,
    pub animated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopologyRow {
    pub id: InstanceId,
    pub variant: Variant,
    /// `"SERVER: alias"` style heading.
    pub title: String,
    pub enabled: bool,
    pub running: bool,
    /// Enabled and reported running. Only active rows animate.
    pub active: bool,
    pub pid: Option<u32>,
    pub nodes: [TopologyNode; 4],
    pub links: [TopologyLink; 3],
}

impl TopologyRow {
    pub fn node(&self, kind: NodeKind) -> &TopologyNode {
        match kind {
            NodeKind::LocalEndpoint => &self.nodes[0],
            NodeKind::TunnelLocal => &self.nodes[1],
            NodeKind::TunnelTransport => &self.nodes[2],
            NodeKind::RemoteEndpoint => &self.nodes[3],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopologyGraph {
    /// Clients first, then servers, each in configuration order.
    pub rows: Vec<TopologyRow>,
}

impl TopologyGraph {
    pub fn row(&self, id: &InstanceId) -> Option<&TopologyRow> {
        self.rows.iter().find(|r| &r.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.rows.iter().filter(|r| r.active).count()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ── Rendering ────────────────────────────────────────────────────────

/// Derive the topology graph. Pure: identical inputs give identical output.
pub fn render(config: &Configuration, status: &StatusSnapshot) -> TopologyGraph {
    TopologyGraph {
        rows: config
            .instances()
            .map(|instance| render_row(instance, status.get(&instance.id)))
            .collect(),
    }
}

fn render_row(instance: &TunnelInstance, status: Option<&ProcessStatus>) -> TopologyRow {
    let running = status.is_some_and(|s| s.running);
    let active = instance.enabled && running;

    let local_configured = match &instance.endpoint {
        Endpoint::Client {
            local_addr,
            local_port,
            ..
        } => endpoint_label(local_addr, local_port),
        Endpoint::Server { local_port, .. } => endpoint_label(SERVER_LISTEN_ADDR, local_port),
    };
    let remote_configured = endpoint_label(
        instance.endpoint.remote_addr(),
        instance.endpoint.remote_port(),
    );

    let nodes = [
        node(
            NodeKind::LocalEndpoint,
            status.and_then(|s| s.local.clone()),
            local_configured,
        ),
        node(
            NodeKind::TunnelLocal,
            status.and_then(|s| s.tun_local.clone()),
            non_empty(&instance.tun_local),
        ),
        node(
            NodeKind::TunnelTransport,
            status.and_then(|s| s.tun_peer.clone()),
            non_empty(&instance.tun_peer),
        ),
        node(
            NodeKind::RemoteEndpoint,
            status.and_then(|s| s.remote.clone()),
            remote_configured,
        ),
    ];

    let link = |from, to| TopologyLink {
        from,
        to,
        animated: active,
    };

    TopologyRow {
        id: instance.id.clone(),
        variant: instance.variant(),
        title: format!(
            "{}: {}",
            instance.variant().to_string().to_uppercase(),
            instance.display_name()
        ),
        enabled: instance.enabled,
        running,
        active,
        pid: status.and_then(|s| s.pid),
        nodes,
        links: [
            link(NodeKind::LocalEndpoint, NodeKind::TunnelLocal),
            link(NodeKind::TunnelLocal, NodeKind::TunnelTransport),
            link(NodeKind::TunnelTransport, NodeKind::RemoteEndpoint),
        ],
    }
}

/// Live value, then configured value, then the placeholder.
fn node(kind: NodeKind, live: Option<String>, configured: Option<String>) -> TopologyNode {
    let (label, source) = match (live.filter(|v| !v.trim().is_empty()), configured) {
        (Some(v), _) => (v, LabelSource::Live),
        (None, Some(v)) => (v, LabelSource::Configured),
        (None, None) => (PLACEHOLDER.to_owned(), LabelSource::Placeholder),
    };
    TopologyNode {
        kind,
        label,
        source,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_owned())
}

/// `host:port`, bracketing bare IPv6 hosts. A missing host yields nothing;
/// a missing port yields the host alone.
fn endpoint_label(addr: &str, port: &Port) -> Option<String> {
    let host = non_empty(addr)?;
    Some(if port.is_unset() {
        host
    } else if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    })
}

// ── Animation tracking ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationTransition {
    Started,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationChange {
    pub id: InstanceId,
    pub transition: AnimationTransition,
}

/// Holds the last rendered graph.
pub struct TopologyView {
    last: ArcSwap<TopologyGraph>,
}

impl Default for TopologyView {
    fn default() -> Self {
        Self::new()
    }
}

impl TopologyView {
    pub fn new() -> Self {
        Self {
            last: ArcSwap::from_pointee(TopologyGraph::default()),
        }
    }

    pub fn current(&self) -> Arc<TopologyGraph> {
        self.last.load_full()
    }

    /// Store `graph` as the current graph and report rows whose animation
    /// state changed. Rows that disappeared while active report `Stopped`.
    pub fn update(&self, graph: Arc<TopologyGraph>) -> Vec<AnimationChange> {
        let previous = self.last.swap(graph.clone());
        animation_changes(&previous, &graph)
    }
}

fn animation_changes(previous: &TopologyGraph, next: &TopologyGraph) -> Vec<AnimationChange> {
    let was_active: HashMap<&InstanceId, bool> =
        previous.rows.iter().map(|r| (&r.id, r.active)).collect();

    let mut changes: Vec<AnimationChange> = next
        .rows
        .iter()
        .filter_map(|row| {
            let before = was_active.get(&row.id).copied().unwrap_or(false);
            let transition = match (before, row.active) {
                (false, true) => AnimationTransition::Started,
                (true, false) => AnimationTransition::Stopped,
                _ => return None,
            };
            Some(AnimationChange {
                id: row.id.clone(),
                transition,
            })
        })
        .collect();

    changes.extend(
        previous
            .rows
            .iter()
            .filter(|r| r.active && next.row(&r.id).is_none())
            .map(|r| AnimationChange {
                id: r.id.clone(),
                transition: AnimationTransition::Stopped,
            }),
    );
    changes
}
