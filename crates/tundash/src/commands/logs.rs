//! Process log output: a buffered tail, or a live follow.

use std::sync::Arc;
use std::time::Duration;

use owo_colors::OwoColorize;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::Instant;
use tundash_core::{Command as CoreCommand, Dashboard, LogEntry, StreamState};

use crate::cli::{GlobalOpts, LogsArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

fn matches_source(entry: &LogEntry, source: Option<&str>) -> bool {
    source.is_none_or(|s| entry.source == s)
}

fn format_line(entry: &LogEntry, color: bool) -> String {
    let ts = entry
        .timestamp
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".into());
    let prefix = format!("{ts} {:<12}", entry.source);
    let prefix = output::dim_text(&prefix, color);
    if entry.is_stderr() && color {
        format!("{prefix} {}", entry.content.red())
    } else {
        format!("{prefix} {}", entry.content)
    }
}

fn serialization_failed(e: impl std::fmt::Display) -> CliError {
    CliError::Internal(format!("log serialization failed: {e}"))
}

/// One entry as a standalone line in the selected format.
fn render_entry(
    entry: &LogEntry,
    format: &OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            serde_json::to_string(entry).map_err(serialization_failed)?
        }
        OutputFormat::Plain => entry.content.clone(),
        OutputFormat::Table | OutputFormat::Yaml => format_line(entry, color),
    })
}

/// The buffered entries matching `source`, last `tail` of them, rendered.
fn render_tail(
    entries: &[&LogEntry],
    tail: usize,
    format: &OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    let tail = &entries[entries.len().saturating_sub(tail)..];
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(tail).map_err(serialization_failed),
        OutputFormat::JsonCompact => serde_json::to_string(tail).map_err(serialization_failed),
        OutputFormat::Yaml => serde_yaml::to_string(tail).map_err(serialization_failed),
        OutputFormat::Table | OutputFormat::Plain => Ok(tail
            .iter()
            .map(|e| render_entry(e, format, color))
            .collect::<Result<Vec<_>, _>>()?
            .join("\n")),
    }
}

pub async fn handle(
    dashboard: &Dashboard,
    args: LogsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Subscribe before connecting so the backlog is not missed.
    let mut appended = dashboard.logs().subscribe_appended();
    let mut state = dashboard.logs().subscribe_state();
    dashboard.execute(CoreCommand::ConnectLogs).await?;

    let color = output::should_color(&global.color);
    let source = args.source.as_deref();

    if args.follow {
        return follow(&mut appended, &mut state, source, global, color).await;
    }

    // Read until the backlog goes quiet or the overall deadline passes,
    // then print its tail.
    let settle = Duration::from_millis(args.settle_ms);
    let deadline = Instant::now() + Duration::from_millis(args.max_wait_ms);
    loop {
        let quiet_at = (Instant::now() + settle).min(deadline);
        match tokio::time::timeout_at(quiet_at, appended.recv()).await {
            Ok(Ok(_) | Err(RecvError::Lagged(_))) => {}
            Ok(Err(RecvError::Closed)) | Err(_) => break,
        }
    }

    let lines = dashboard.logs().lines();
    let selected: Vec<&LogEntry> = lines
        .iter()
        .map(Arc::as_ref)
        .filter(|e| matches_source(e, source))
        .collect();
    let out = render_tail(&selected, args.tail, &global.output, color)?;
    output::print_output(&out, global.quiet);

    let dropped = dashboard.logs().dropped_records();
    if dropped > 0 && !global.quiet {
        eprintln!("{dropped} malformed log records skipped");
    }

    // A stream that died before delivering anything is an error; one that
    // ended after the backlog is not.
    match dashboard.logs().state() {
        StreamState::Down { reason } if selected.is_empty() => {
            Err(CliError::LogStream { reason })
        }
        _ => Ok(()),
    }
}

async fn follow(
    appended: &mut tokio::sync::broadcast::Receiver<Arc<LogEntry>>,
    state: &mut tokio::sync::watch::Receiver<StreamState>,
    source: Option<&str>,
    global: &GlobalOpts,
    color: bool,
) -> Result<(), CliError> {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),

            entry = appended.recv() => match entry {
                Ok(entry) => {
                    if matches_source(&entry, source) {
                        let line = render_entry(&entry, &global.output, color)?;
                        output::print_output(&line, global.quiet);
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "output fell behind the log stream");
                }
                Err(RecvError::Closed) => return Ok(()),
            },

            changed = state.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = state.borrow_and_update().clone();
                if let StreamState::Down { reason } = current {
                    return Err(CliError::LogStream { reason });
                }
            }
        }
    }
}
