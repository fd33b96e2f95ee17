// Transport configuration for building reqwest::Client instances.
//
// The client owns TLS and timeout policy here so `ApiClient::new` and the
// CLI credential probe build identical clients.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::Error;

/// Per-call timeout applied when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("shelfwatch/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Use the system certificate store.
    #[default]
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (self-signed servers on a LAN).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::System,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    ///
    /// Failures here are configuration problems (unreadable CA file, broken
    /// TLS backend) and are reported as [`Error::Unknown`] against the
    /// certificate path, since no request has been attempted yet.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let location = path.display().to_string();
                let cert_pem = std::fs::read(path).map_err(|e| Error::Unknown {
                    url: location.clone(),
                    message: format!("failed to read CA cert: {e}"),
                })?;
                let cert = reqwest::Certificate::from_pem(&cert_pem).map_err(|e| Error::Unknown {
                    url: location,
                    message: format!("invalid CA cert: {e}"),
                })?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder.build().map_err(|e| Error::Unknown {
            url: String::new(),
            message: format!("failed to build HTTP client: {e}"),
        })
    }

    /// Timeout in whole seconds, for error reporting.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout.as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_ten_seconds() {
        let cfg = TransportConfig::default();
        assert_eq!(cfg.timeout_secs(), 10);
        assert_eq!(cfg.tls, TlsMode::System);
    }

    #[test]
    fn missing_ca_file_is_reported() {
        let cfg = TransportConfig {
            tls: TlsMode::CustomCa(PathBuf::from("/nonexistent/shelfwatch-ca.pem")),
            timeout: DEFAULT_TIMEOUT,
        };
        let err = cfg.build_client().err();
        assert!(
            matches!(err, Some(Error::Unknown { ref message, .. }) if message.contains("CA cert")),
            "unexpected result: {err:?}"
        );
    }
}
