//! CLI error types with miette diagnostics.
//!
//! Maps core, transport, and config errors into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use shelfwatch_config::ConfigError;
use shelfwatch_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const NOT_READY: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not reach server at {url}: {reason}")]
    #[diagnostic(
        code(shelfwatch::connection_failed),
        help(
            "Check that the server is running and reachable.\n\
             Try: shelfwatch ping --url <URL>"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to {url} timed out after {seconds}s")]
    #[diagnostic(
        code(shelfwatch::timeout),
        help("Increase the timeout with --timeout or check server responsiveness.")
    )]
    Timeout { url: String, seconds: u64 },

    #[error("Server not ready: {reason}")]
    #[diagnostic(
        code(shelfwatch::not_ready),
        help("No field could be fetched on the first cycle. Retry once the server is up.")
    )]
    NotReady { reason: String },

    // ── Authentication ───────────────────────────────────────────────

    #[error("Authentication failed (HTTP {status})")]
    #[diagnostic(
        code(shelfwatch::auth_failed),
        help(
            "Verify the API token. Admin tokens are required to list users.\n\
             Store a new one with: shelfwatch config set-token [--profile <NAME>]\n\
             Or pass it with --token."
        )
    )]
    AuthFailed { status: u16 },

    #[error("No token configured for profile '{profile}'")]
    #[diagnostic(
        code(shelfwatch::no_credentials),
        help(
            "Store one with: shelfwatch config set-token\n\
             Or set the SHELFWATCH_TOKEN environment variable."
        )
    )]
    NoCredentials { profile: String },

    // ── API ──────────────────────────────────────────────────────────

    #[error("{kind}: {message}")]
    #[diagnostic(code(shelfwatch::api_error))]
    ApiError { kind: String, message: String },

    #[error("Refresh of '{field}' failed unexpectedly: {message}")]
    #[diagnostic(
        code(shelfwatch::unexpected),
        help("This failure is outside the handled error classes. Re-run with -vv for details.")
    )]
    Unexpected { field: String, message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(shelfwatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(shelfwatch::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No server configured")]
    #[diagnostic(
        code(shelfwatch::no_config),
        help(
            "Pass --url and --token, or add a profile to the config file.\n\
             Expected at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(shelfwatch::config))]
    Config(Box<ConfigError>),

    // ── IO / Serialization ────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotReady { .. } => exit_code::NOT_READY,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::Validation { .. } | Self::ProfileNotFound { .. } | Self::NoConfig { .. } => {
                exit_code::USAGE
            }
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<shelfwatch_api::Error> for CliError {
    fn from(err: shelfwatch_api::Error) -> Self {
        use shelfwatch_api::Error as Api;
        match err {
            Api::Timeout { url, timeout_secs } => Self::Timeout {
                url,
                seconds: timeout_secs,
            },
            Api::Connection { url, reason } => Self::ConnectionFailed { url, reason },
            Api::HttpStatus { status, .. } if matches!(status, 401 | 403) => {
                Self::AuthFailed { status }
            }
            other => Self::ApiError {
                kind: other.kind().to_string(),
                message: other.to_string(),
            },
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotReady { reason } => Self::NotReady { reason },
            CoreError::Unexpected { field, source } => Self::Unexpected {
                field,
                message: source.to_string(),
            },
            CoreError::Api(e) => e.into(),
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::Shutdown => Self::ApiError {
                kind: "shutdown".into(),
                message: "polling was stopped".into(),
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(Box::new(other)),
        }
    }
}
