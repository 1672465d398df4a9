//! Service-wide settings: master switch and log level.

use serde::Serialize;
use tundash_core::{Command as CoreCommand, CommandResult, Dashboard, GeneralPatch, LogLevel, StatusSummary};

use crate::cli::{GeneralArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct GeneralView {
    enabled: bool,
    log_level: LogLevel,
    instances: usize,
    #[serde(flatten)]
    summary: StatusSummary,
}

fn detail(view: &GeneralView, color: bool) -> String {
    [
        format!("Service:    {}", output::enabled_badge(view.enabled, color)),
        format!("Log level:  {}", view.log_level),
        format!("Instances:  {}", view.instances),
        format!(
            "Running:    {}/{}",
            view.summary.running, view.summary.total
        ),
    ]
    .join("\n")
}

pub async fn handle(
    dashboard: &Dashboard,
    args: GeneralArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let patch = GeneralPatch {
        enabled: match (args.enable, args.disable) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        },
        log_level: args.log_level,
    };

    // No flags: show the current settings.
    if patch.enabled.is_none() && patch.log_level.is_none() {
        let config = dashboard.store().snapshot();
        let view = GeneralView {
            enabled: config.general.enabled,
            log_level: config.general.log_level.clone(),
            instances: config.len(),
            summary: dashboard.poller().snapshot().summary(),
        };
        let color = output::should_color(&global.color);
        let out = output::render_single(
            &global.output,
            &view,
            |v| detail(v, color),
            |v| v.enabled.to_string(),
        );
        output::print_output(&out, global.quiet);
        return Ok(());
    }

    let result = dashboard.execute(CoreCommand::SetGeneral(patch)).await?;
    let CommandResult::Edited(outcome) = result else {
        return Err(CliError::Internal(format!(
            "unexpected command result: {result:?}"
        )));
    };
    let general = &outcome.configuration.general;
    let state = if general.enabled { "enabled" } else { "disabled" };
    super::util::finish_edit(
        &outcome,
        &format!("Service {state}, log level {}", general.log_level),
        global.quiet,
    )
}
