//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Confirm, Input};
use tundash_config::{self as config, Config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{active_profile_name, available_profiles};
use crate::error::CliError;
use crate::output;

// ── Helpers ─────────────────────────────────────────────────────────

fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let d = &cfg.defaults;
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", d.output);
    let _ = writeln!(out, "color = \"{}\"", d.color);
    let _ = writeln!(out, "insecure = {}", d.insecure);
    let _ = writeln!(out, "timeout = {}", d.timeout);
    let _ = writeln!(out, "poll_interval_ms = {}", d.poll_interval_ms);
    let _ = writeln!(out, "log_capacity = {}", d.log_capacity);
    let _ = writeln!(out, "autoscroll_threshold_px = {}", d.autoscroll_threshold_px);
    let _ = writeln!(out, "restart_on_toggle = {}", d.restart_on_toggle);

    for name in cfg.profile_names() {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "url = \"{}\"", p.url);
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(ms) = p.poll_interval_ms {
            let _ = writeln!(out, "poll_interval_ms = {ms}");
        }
        if let Some(cap) = p.log_capacity {
            let _ = writeln!(out, "log_capacity = {cap}");
        }
        if let Some(px) = p.autoscroll_threshold_px {
            let _ = writeln!(out, "autoscroll_threshold_px = {px}");
        }
        if let Some(restart) = p.restart_on_toggle {
            let _ = writeln!(out, "restart_on_toggle = {restart}");
        }
    }

    out.trim_end().to_owned()
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let path = config::config_path();
            eprintln!("tundash configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default(config::DEFAULT_PROFILE.into())
                .interact_text()
                .map_err(prompt_err)?;

            let url: String = Input::new()
                .with_prompt("Dashboard URL")
                .default("http://127.0.0.1:8080".into())
                .validate_with(|input: &String| {
                    config::parse_url(input).map(|_| ()).map_err(|e| e.to_string())
                })
                .interact_text()
                .map_err(prompt_err)?;

            let insecure = url.starts_with("https://")
                && Confirm::new()
                    .with_prompt("Accept self-signed certificates?")
                    .default(false)
                    .interact()
                    .map_err(prompt_err)?;

            // Keep any profiles already on disk.
            let mut cfg = config::load_config_or_default();
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    url,
                    insecure: insecure.then_some(true),
                    ..Profile::default()
                },
            );
            cfg.default_profile = Some(profile_name.clone());

            let written = config::save_config(&cfg)?;
            eprintln!("\nConfiguration written to {}", written.display());
            eprintln!("  Active profile: {profile_name}");
            eprintln!("\n  Test it: tundash status");
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = output::render_single(&global.output, &cfg, format_config, |c| {
                active_profile_name(global, c)
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        // ── Profiles ────────────────────────────────────────────────
        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: tundash config init");
                return Ok(());
            }
            let active = active_profile_name(global, &cfg);
            let lines: Vec<String> = cfg
                .profile_names()
                .into_iter()
                .map(|name| {
                    if name == active {
                        format!("{name} *")
                    } else {
                        name.to_owned()
                    }
                })
                .collect();
            output::print_output(&lines.join("\n"), global.quiet);
            Ok(())
        }

        // ── Use <name> ─────────────────────────────────────────────
        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();

            if !cfg.profiles.contains_key(&name) {
                return Err(CliError::ProfileNotFound {
                    available: available_profiles(&cfg),
                    name,
                });
            }

            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_lists_profiles_sorted_with_overrides_only() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "lab".into(),
            Profile {
                url: "http://10.0.0.9:8080".into(),
                timeout: Some(5),
                ..Profile::default()
            },
        );
        cfg.profiles.insert(
            "edge".into(),
            Profile {
                url: "https://edge.lan".into(),
                insecure: Some(true),
                ..Profile::default()
            },
        );

        let text = format_config(&cfg);
        let edge = text.find("[profiles.edge]");
        let lab = text.find("[profiles.lab]");
        assert!(edge.is_some() && lab.is_some());
        assert!(edge < lab);
        assert!(text.contains("url = \"https://edge.lan\"\ninsecure = true"));
        assert!(text.contains("url = \"http://10.0.0.9:8080\"\ntimeout = 5"));
        assert!(text.starts_with("default_profile = \"default\""));
    }
}
