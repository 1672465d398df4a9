//! Text rendering of the tunnel topology graph.

use owo_colors::OwoColorize;
use tundash_core::{Dashboard, LabelSource, TopologyGraph, TopologyNode, TopologyRow};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn label(node: &TopologyNode, color: bool) -> String {
    match node.source {
        LabelSource::Placeholder => output::dim_text(&node.label, color),
        LabelSource::Live | LabelSource::Configured => node.label.clone(),
    }
}

fn arrow(active: bool, color: bool) -> String {
    match (active, color) {
        (true, true) => " ==> ".green().to_string(),
        (true, false) => " ==> ".into(),
        (false, true) => " --> ".dimmed().to_string(),
        (false, false) => " --> ".into(),
    }
}

fn row_text(row: &TopologyRow, color: bool) -> String {
    let state = if row.enabled {
        output::state_badge(row.running, color)
    } else {
        output::dim_text("disabled", color)
    };
    let pid = row.pid.map(|p| format!(" pid {p}")).unwrap_or_default();

    let chain = row
        .nodes
        .iter()
        .map(|n| label(n, color))
        .collect::<Vec<_>>()
        .join(&arrow(row.active, color));

    format!("{} [{state}{pid}]\n  {chain}", row.title)
}

fn graph_text(graph: &TopologyGraph, color: bool) -> String {
    if graph.is_empty() {
        return output::dim_text("No tunnel instances configured", color);
    }
    graph
        .rows
        .iter()
        .map(|r| row_text(r, color))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn handle(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let graph = dashboard.topology_snapshot();
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        graph.as_ref(),
        |g| graph_text(g, color),
        |g| {
            g.rows
                .iter()
                .filter(|r| r.active)
                .map(|r| r.id.to_string())
                .collect::<Vec<_>>()
                .join("\n")
        },
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tundash_core::{
        Configuration, Endpoint, Port, ProcessStatus, StatusSnapshot, TunnelInstance, topology,
    };

    fn client(id: &str, enabled: bool) -> TunnelInstance {
        TunnelInstance {
            id: id.into(),
            alias: "home".into(),
            enabled,
            endpoint: Endpoint::Client {
                local_addr: "127.0.0.1".into(),
                local_port: Port::from(1234),
                remote_addr: "vps.example".into(),
                remote_port: Port::from(4567),
            },
            tun_local: "192.168.200.1".into(),
            tun_peer: "192.168.200.2".into(),
            advanced: Default::default(),
            extra: Default::default(),
        }
    }

    #[test]
    fn active_row_uses_thick_arrows() {
        let config = Configuration {
            clients: vec![client("c1", true)],
            ..Configuration::default()
        };
        let mut status = StatusSnapshot::default();
        status.processes.insert(
            "c1".into(),
            ProcessStatus {
                id: "c1".into(),
                running: true,
                pid: Some(42),
                ..ProcessStatus::default()
            },
        );

        let text = graph_text(&topology::render(&config, &status), false);
        assert_eq!(
            text,
            "CLIENT: home [running pid 42]\n  \
             127.0.0.1:1234 ==> 192.168.200.1 ==> 192.168.200.2 ==> vps.example:4567"
        );
    }

    #[test]
    fn disabled_row_is_marked() {
        let config = Configuration {
            clients: vec![client("c1", false)],
            ..Configuration::default()
        };
        let text = graph_text(&topology::render(&config, &StatusSnapshot::default()), false);
        assert!(text.starts_with("CLIENT: home [disabled]"));
        assert!(text.contains(" --> "));
    }

    #[test]
    fn empty_graph_has_a_message() {
        assert_eq!(
            graph_text(&TopologyGraph::default(), false),
            "No tunnel instances configured"
        );
    }
}
