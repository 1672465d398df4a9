//! Resolution of the active profile plus CLI flag overrides into a
//! `DashboardConfig`.

use tundash_config::{Config, Profile, config_path, load_config, profile_to_dashboard_config};
use tundash_core::DashboardConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Name of the profile selected by `--profile`, the config file, or the
/// built-in default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| tundash_config::DEFAULT_PROFILE.into())
}

/// Build a `DashboardConfig` from the config file, profile, and CLI overrides.
pub fn build_dashboard_config(global: &GlobalOpts) -> Result<DashboardConfig, CliError> {
    let cfg = load_config()?;
    resolve(global, &cfg)
}

fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<DashboardConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        // An explicitly requested profile must exist.
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(cfg),
            });
        }
        None => Profile::default(),
    };

    if let Some(ref url) = global.url {
        profile.url.clone_from(url);
    }
    if profile.url.trim().is_empty() {
        return Err(CliError::NoConfig {
            path: config_path().display().to_string(),
        });
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if global.timeout.is_some() {
        profile.timeout = global.timeout;
    }

    Ok(profile_to_dashboard_config(&profile, &cfg.defaults)?)
}

pub fn available_profiles(cfg: &Config) -> String {
    let names = cfg.profile_names();
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}
