// ── Runtime server configuration ──
//
// These types describe *how* to poll one Audiobookshelf server.
// They carry credential data and polling tuning, but never touch disk.
// The CLI constructs a `ServerConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

use shelfwatch_api::TlsMode;
use shelfwatch_api::transport::DEFAULT_TIMEOUT;

use crate::error::CoreError;

/// Default poll interval.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(300);

/// Default idle threshold for the "recent sessions" variant.
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(120);

/// Account the integration itself logs in as. Never counted as active.
pub const DEFAULT_SERVICE_ACCOUNT: &str = "hass";

/// Configuration for polling a single server.
///
/// Built once by the caller and passed explicitly to the coordinator.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server base URL (e.g., `https://books.example.com`).
    pub url: Url,
    /// Bearer token.
    pub token: SecretString,
    /// How often a refresh cycle runs.
    pub scan_interval: Duration,
    /// Per-call HTTP timeout.
    pub timeout: Duration,
    /// TLS verification strategy.
    pub tls: TlsMode,
    /// Username excluded from the active-user count.
    pub service_account: String,
    /// Also exclude the user whose token equals ours.
    pub exclude_own_token: bool,
    /// `None` counts every open session; `Some` only sessions updated within
    /// this window.
    pub session_idle: Option<Duration>,
}

impl ServerConfig {
    /// Config with defaults for everything except the server and token.
    pub fn new(url: Url, token: SecretString) -> Self {
        Self {
            url,
            token,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            tls: TlsMode::default(),
            service_account: DEFAULT_SERVICE_ACCOUNT.into(),
            exclude_own_token: true,
            session_idle: None,
        }
    }

    /// Reject settings the coordinator cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.scan_interval.is_zero() {
            return Err(CoreError::Config {
                message: "scan interval must be a positive number of seconds".into(),
            });
        }
        if self.timeout.is_zero() {
            return Err(CoreError::Config {
                message: "timeout must be a positive number of seconds".into(),
            });
        }
        if !matches!(self.url.scheme(), "http" | "https") {
            return Err(CoreError::Config {
                message: format!("unsupported URL scheme '{}'", self.url.scheme()),
            });
        }
        Ok(())
    }

    pub(crate) fn transport(&self) -> shelfwatch_api::TransportConfig {
        shelfwatch_api::TransportConfig {
            tls: self.tls.clone(),
            timeout: self.timeout,
        }
    }
}
