//! Tunnel instance command handlers.

use serde::Serialize;
use tabled::Tabled;
use tundash_core::{
    AdvancedOptions, Command as CoreCommand, CommandResult, Dashboard, InstanceDraft, InstanceId,
    InstancePatch, StatusSnapshot, TunnelInstance, Variant,
};

use crate::cli::{
    AddVariant, GlobalOpts, InstanceFields, InstancesArgs, InstancesCommand, NewInstanceArgs,
};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct InstanceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "Type")]
    variant: String,
    #[tabled(rename = "Enabled")]
    enabled: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "PID")]
    pid: String,
    #[tabled(rename = "Local")]
    local: String,
    #[tabled(rename = "Remote")]
    remote: String,
    #[tabled(rename = "Tunnel")]
    tunnel: String,
}

/// An instance joined with its last reported process status.
#[derive(Serialize)]
struct InstanceWithStatus<'a> {
    #[serde(flatten)]
    instance: &'a TunnelInstance,
    running: bool,
    pid: Option<u32>,
}

impl<'a> InstanceWithStatus<'a> {
    fn new(instance: &'a TunnelInstance, status: &StatusSnapshot) -> Self {
        let process = status.get(&instance.id);
        Self {
            instance,
            running: process.is_some_and(|p| p.running),
            pid: process.and_then(|p| p.pid),
        }
    }

    fn row(&self, color: bool) -> InstanceRow {
        let i = self.instance;
        let local = match i.endpoint.local_addr() {
            Some(addr) if !addr.is_empty() => {
                format!("{addr}:{}", util::port_or_dash(i.endpoint.local_port()))
            }
            _ => format!(":{}", util::port_or_dash(i.endpoint.local_port())),
        };
        InstanceRow {
            id: i.id.to_string(),
            alias: util::or_dash(&i.alias),
            variant: i.variant().to_string(),
            enabled: output::enabled_badge(i.enabled, color),
            state: output::state_badge(self.running, color),
            pid: self.pid.map(|p| p.to_string()).unwrap_or_default(),
            local,
            remote: format!(
                "{}:{}",
                util::or_dash(i.endpoint.remote_addr()),
                util::port_or_dash(i.endpoint.remote_port())
            ),
            tunnel: format!("{} -> {}", util::or_dash(&i.tun_local), util::or_dash(&i.tun_peer)),
        }
    }
}

fn detail(view: &InstanceWithStatus<'_>) -> String {
    let i = view.instance;
    let mut lines = vec![
        format!("ID:          {}", i.id),
        format!("Alias:       {}", util::or_dash(&i.alias)),
        format!("Type:        {}", i.variant()),
        format!("Enabled:     {}", i.enabled),
        format!("Running:     {}", view.running),
        format!("PID:         {}", view.pid.map_or_else(|| "-".into(), |p| p.to_string())),
    ];
    if let Some(addr) = i.endpoint.local_addr() {
        lines.push(format!("Local addr:  {}", util::or_dash(addr)));
    }
    lines.extend([
        format!("Local port:  {}", util::port_or_dash(i.endpoint.local_port())),
        format!("Remote addr: {}", util::or_dash(i.endpoint.remote_addr())),
        format!("Remote port: {}", util::port_or_dash(i.endpoint.remote_port())),
        format!("TUN local:   {}", util::or_dash(&i.tun_local)),
        format!("TUN peer:    {}", util::or_dash(&i.tun_peer)),
    ]);

    let a = &i.advanced;
    for (label, value) in [
        ("TUN name:    ", &a.tun_name),
        ("TUN local6:  ", &a.tun_local_ipv6),
        ("TUN peer6:   ", &a.tun_peer_ipv6),
        ("Handshake:   ", &a.handshake_file),
    ] {
        if !value.is_empty() {
            lines.push(format!("{label}{value}"));
        }
    }
    if a.ipv4_only {
        lines.push("IPv4 only:   true".into());
    }
    lines.join("\n")
}

// ── Argument mapping ────────────────────────────────────────────────

fn draft_from(args: NewInstanceArgs) -> InstanceDraft {
    let f = args.fields;
    InstanceDraft {
        id: args.id.map(InstanceId::from),
        alias: f.alias.unwrap_or_default(),
        enabled: !args.disabled,
        local_addr: f.local_addr.unwrap_or_default(),
        local_port: f.local_port,
        remote_addr: f.remote_addr.unwrap_or_default(),
        remote_port: f.remote_port,
        tun_local: f.tun_local.unwrap_or_default(),
        tun_peer: f.tun_peer.unwrap_or_default(),
        advanced: AdvancedOptions {
            tun_name: f.tun_name.unwrap_or_default(),
            tun_local_ipv6: f.tun_local_ipv6.unwrap_or_default(),
            tun_peer_ipv6: f.tun_peer_ipv6.unwrap_or_default(),
            handshake_file: f.handshake_file.unwrap_or_default(),
            ipv4_only: f.ipv4_only.unwrap_or(false),
        },
    }
}

fn patch_from(f: InstanceFields) -> InstancePatch {
    InstancePatch {
        alias: f.alias,
        enabled: None,
        local_addr: f.local_addr,
        local_port: f.local_port,
        remote_addr: f.remote_addr,
        remote_port: f.remote_port,
        tun_local: f.tun_local,
        tun_peer: f.tun_peer,
        tun_name: f.tun_name,
        tun_local_ipv6: f.tun_local_ipv6,
        tun_peer_ipv6: f.tun_peer_ipv6,
        handshake_file: f.handshake_file,
        ipv4_only: f.ipv4_only,
    }
}

fn unexpected(result: &CommandResult) -> CliError {
    CliError::Internal(format!("unexpected command result: {result:?}"))
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub async fn handle(
    dashboard: &Dashboard,
    args: InstancesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    match args.command {
        InstancesCommand::List => {
            let config = dashboard.store().snapshot();
            let status = dashboard.poller().snapshot();
            let views: Vec<InstanceWithStatus<'_>> = config
                .instances()
                .map(|i| InstanceWithStatus::new(i, &status))
                .collect();
            let out = output::render_list(
                &global.output,
                &views,
                |v| v.row(color),
                |v| v.instance.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InstancesCommand::Get { id } => {
            let instance = util::find_instance(dashboard, &id)?;
            let status = dashboard.poller().snapshot();
            let view = InstanceWithStatus::new(&instance, &status);
            let out = output::render_single(&global.output, &view, detail, |v| {
                v.instance.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        InstancesCommand::Add(add) => {
            let (variant, new) = match add.variant {
                AddVariant::Client(new) => (Variant::Client, new),
                AddVariant::Server(new) => (Variant::Server, new),
            };
            let result = dashboard
                .execute(CoreCommand::AddInstance {
                    variant,
                    draft: draft_from(new),
                })
                .await?;
            let CommandResult::Added(id) = result else {
                return Err(unexpected(&result));
            };
            output::print_output(id.as_str(), global.quiet);
            Ok(())
        }

        InstancesCommand::Update { id, fields } => {
            let patch = patch_from(fields);
            if patch.is_empty() {
                return Err(CliError::Validation {
                    field: "fields".into(),
                    reason: "nothing to update, pass at least one field flag".into(),
                });
            }
            dashboard
                .execute(CoreCommand::UpdateInstance {
                    id: id.as_str().into(),
                    patch,
                })
                .await?;
            if !global.quiet {
                eprintln!("Instance {id} updated");
            }
            Ok(())
        }

        InstancesCommand::Remove { id } => {
            if !util::confirm(&format!("Remove instance {id}?"), "instances remove", global.yes)? {
                return Ok(());
            }
            dashboard
                .execute(CoreCommand::RemoveInstance {
                    id: id.as_str().into(),
                })
                .await?;
            if !global.quiet {
                eprintln!("Instance {id} removed");
            }
            Ok(())
        }

        InstancesCommand::Enable { id, .. } => set_enabled(dashboard, &id, true, global).await,
        InstancesCommand::Disable { id, .. } => set_enabled(dashboard, &id, false, global).await,

        InstancesCommand::Toggle { id, .. } => {
            let result = dashboard
                .execute(CoreCommand::ToggleInstance {
                    id: id.as_str().into(),
                })
                .await?;
            let CommandResult::Edited(outcome) = result else {
                return Err(unexpected(&result));
            };
            let enabled = outcome
                .configuration
                .instance(&InstanceId::from(id.as_str()))
                .is_some_and(|i| i.enabled);
            let state = if enabled { "enabled" } else { "disabled" };
            util::finish_edit(&outcome, &format!("Instance {id} {state}"), global.quiet)
        }
    }
}

async fn set_enabled(
    dashboard: &Dashboard,
    id: &str,
    enabled: bool,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let result = dashboard
        .execute(CoreCommand::SetEnabled {
            id: id.into(),
            enabled,
        })
        .await?;
    let CommandResult::Edited(outcome) = result else {
        return Err(unexpected(&result));
    };
    let state = if enabled { "enabled" } else { "disabled" };
    util::finish_edit(&outcome, &format!("Instance {id} {state}"), global.quiet)
}
