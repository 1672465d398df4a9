//! Process status and diagnostics views.

use std::fmt::Write as _;

use tabled::Tabled;
use tundash_core::{Dashboard, Diagnostics, FirewallCounters, ProcessStatus, TunInterface};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Status ───────────────────────────────────────────────────────────

#[derive(Tabled)]
struct ProcessRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Type")]
    variant: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "PID")]
    pid: String,
    #[tabled(rename = "Local")]
    local: String,
    #[tabled(rename = "Remote")]
    remote: String,
}

fn process_row(p: &ProcessStatus, color: bool) -> ProcessRow {
    let opt = |v: Option<&str>| util::or_dash(v.unwrap_or_default());
    ProcessRow {
        id: p.id.to_string(),
        alias: util::or_dash(&p.alias),
        variant: p.variant.map(|v| v.to_string()).unwrap_or_default(),
        state: output::state_badge(p.running, color),
        pid: p.pid.map(|pid| pid.to_string()).unwrap_or_default(),
        local: opt(p.local.as_deref()),
        remote: opt(p.remote.as_deref()),
    }
}

pub fn handle_status(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = util::require_status(dashboard)?;
    let color = output::should_color(&global.color);
    let processes: Vec<&ProcessStatus> = snapshot.processes.values().collect();

    let mut out = output::render_list(
        &global.output,
        &processes,
        |p| process_row(p, color),
        |p| p.id.to_string(),
    );

    if matches!(global.output, OutputFormat::Table) {
        let summary = snapshot.summary();
        let _ = write!(out, "\n{}/{} running", summary.running, summary.total);
        if snapshot.service_enabled == Some(false) {
            out.push_str(&output::dim_text(" (service disabled)", color));
        }
    }
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Diagnostics ──────────────────────────────────────────────────────

fn presence(hash: Option<&str>, color: bool) -> String {
    match hash {
        Some(hash) => format!("found ({hash})"),
        None => output::error_text("missing", color),
    }
}

fn interface_line(iface: &TunInterface, color: bool) -> String {
    let state = if iface.is_up() {
        iface.status.clone()
    } else {
        output::error_text(&iface.status, color)
    };
    let addrs = if iface.addrs.is_empty() {
        "-".to_owned()
    } else {
        iface.addrs.join(", ")
    };
    format!("  {:<12} {:<6} {addrs}", iface.name, state)
}

fn diagnostics_detail(diag: &Diagnostics, color: bool) -> String {
    let mut lines = Vec::new();

    lines.push("Binaries".to_owned());
    match &diag.binaries {
        Some(bin) => {
            lines.push(format!("  client:  {}", presence(bin.client.as_deref(), color)));
            lines.push(format!("  server:  {}", presence(bin.server.as_deref(), color)));
        }
        None => lines.push(output::dim_text("  unavailable", color)),
    }

    lines.push("Interfaces".to_owned());
    if diag.interfaces.is_empty() {
        lines.push(output::dim_text("  none", color));
    }
    lines.extend(diag.interfaces.iter().map(|i| interface_line(i, color)));

    lines.push("Firewall".to_owned());
    match &diag.firewall {
        Some(FirewallCounters::Counts {
            masquerade,
            dnat,
            total,
        }) => lines.push(format!(
            "  {total} rules ({masquerade} masquerade, {dnat} dnat)"
        )),
        Some(FirewallCounters::Raw(raw)) => {
            lines.extend(raw.lines().map(|l| format!("  {l}")));
        }
        None => lines.push(output::dim_text("  unavailable", color)),
    }

    lines.join("\n")
}

pub fn handle_diagnostics(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let snapshot = util::require_status(dashboard)?;
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        &snapshot.diagnostics,
        |d| diagnostics_detail(d, color),
        |d| {
            d.interfaces
                .iter()
                .map(|i| i.name.clone())
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
    use tundash_core::BinaryInfo;

    #[test]
    fn diagnostics_marks_missing_binaries() {
        let diag = Diagnostics {
            binaries: Some(BinaryInfo {
                client: Some("abc123".into()),
                server: None,
                ok: false,
            }),
            interfaces: vec![TunInterface {
                name: "tun0".into(),
                status: "UP".into(),
                addrs: vec!["192.168.200.1/30".into()],
            }],
            firewall: Some(FirewallCounters::Counts {
                masquerade: 1,
                dnat: 2,
                total: 3,
            }),
        };

        let text = diagnostics_detail(&diag, false);
        assert!(text.contains("client:  found (abc123)"));
        assert!(text.contains("server:  missing"));
        assert!(text.contains("tun0"));
        assert!(text.contains("192.168.200.1/30"));
        assert!(text.contains("3 rules (1 masquerade, 2 dnat)"));
    }

    #[test]
    fn empty_diagnostics_render_placeholders() {
        let text = diagnostics_detail(&Diagnostics::default(), false);
        assert_eq!(
            text,
            "Binaries\n  unavailable\nInterfaces\n  none\nFirewall\n  unavailable"
        );
    }
}
