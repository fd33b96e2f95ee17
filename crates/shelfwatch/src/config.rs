//! CLI configuration: a thin wrapper around `shelfwatch_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--url, --token, --insecure, --timeout, --recent-sessions) and fills
//! the display options from `[defaults]`.

use std::time::Duration;

use clap::ValueEnum;
use secrecy::SecretString;

use shelfwatch_config::{Profile, profile_to_server_config, resolve_token, tls_mode};
use shelfwatch_core::ServerConfig;
use shelfwatch_core::config::DEFAULT_SESSION_IDLE;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use shelfwatch_config::{Config, config_path, load_config, load_config_or_default};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Settle `--output` and `--color`: flag or env first, then the config
/// file's `[defaults]`.
pub fn resolve_display_opts(global: &mut GlobalOpts) -> Result<(), CliError> {
    let defaults = load_config_or_default().defaults;
    global.output = match global.output_flag {
        Some(ref format) => format.clone(),
        None => parse_default("output", &defaults.output)?,
    };
    global.color = match global.color_flag {
        Some(ref mode) => mode.clone(),
        None => parse_default("color", &defaults.color)?,
    };
    Ok(())
}

fn parse_default<T: ValueEnum>(field: &str, value: &str) -> Result<T, CliError> {
    T::from_str(value, true).map_err(|reason| CliError::Validation {
        field: format!("defaults.{field}"),
        reason,
    })
}

/// Build a `ServerConfig` from the config file, profile, and CLI overrides.
///
/// Flags win over the profile. Without a matching profile, `--url` and
/// `--token` alone are enough.
pub fn resolve_server_config(global: &GlobalOpts) -> Result<ServerConfig, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let (profile, token) = match cfg.profiles.get(&profile_name) {
        Some(profile) => {
            let token = match global.token {
                Some(ref token) => SecretString::from(token.clone()),
                None => resolve_token(profile, &profile_name)?,
            };
            (profile.clone(), token)
        }
        None => {
            // An explicitly named profile must exist.
            if global.profile.is_some() && global.url.is_none() {
                return Err(CliError::ProfileNotFound {
                    name: profile_name,
                    available: available_profiles(&cfg),
                });
            }
            let url = global.url.clone().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            let token = global
                .token
                .clone()
                .map(SecretString::from)
                .ok_or(CliError::NoCredentials {
                    profile: profile_name,
                })?;
            (
                Profile {
                    url,
                    ..Profile::default()
                },
                token,
            )
        }
    };

    let mut server = profile_to_server_config(&profile, &cfg.defaults, token)?;
    if let Some(ref url) = global.url {
        server.url = shelfwatch_config::parse_server_url(url)?;
    }
    if global.insecure {
        server.tls = tls_mode(true, None);
    }
    if let Some(secs) = global.timeout {
        if secs == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be a positive number of seconds".into(),
            });
        }
        server.timeout = Duration::from_secs(secs);
    }
    if global.recent_sessions && server.session_idle.is_none() {
        server.session_idle = Some(DEFAULT_SESSION_IDLE);
    }
    Ok(server)
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        return "(none)".into();
    }
    cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
}
