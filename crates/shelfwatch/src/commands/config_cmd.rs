//! Config subcommand handlers.

use shelfwatch_config::store_token;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Map an interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn render_toml(cfg: &Config) -> String {
    toml::to_string_pretty(cfg).unwrap_or_else(|e| format!("# serialization failed: {e}"))
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = config::load_config()?.redacted();
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => render_toml(&cfg),
                ref format => output::render_single(format, &cfg, render_toml, render_toml),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetToken { value } => {
            let cfg = config::load_config_or_default();
            let profile = config::active_profile_name(global, &cfg);
            let token = match value {
                Some(token) => token,
                None => rpassword::prompt_password(format!("Token for '{profile}': "))
                    .map_err(prompt_err)?,
            };
            if token.trim().is_empty() {
                return Err(CliError::Validation {
                    field: "token".into(),
                    reason: "must not be empty".into(),
                });
            }
            store_token(&profile, token.trim())?;
            if !global.quiet {
                eprintln!("Token stored in the system keyring for profile '{profile}'");
            }
            Ok(())
        }
    }
}
