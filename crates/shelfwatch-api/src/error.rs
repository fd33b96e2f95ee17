use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Top-level error type for the `shelfwatch-api` crate.
///
/// Every variant carries the target URL so a failure can be logged and
/// stored without holding on to the underlying `reqwest` error. The type is
/// `Clone` because the coordinator records failures inside snapshots and
/// replays memoized failures to every field sharing an endpoint.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    // ── Transient ───────────────────────────────────────────────────
    /// The request did not complete within the per-call timeout.
    #[error("Request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// DNS failure, refused connection, reset socket.
    #[error("Cannot connect to {url}: {reason}")]
    Connection { url: String, reason: String },

    // ── Server / shape mismatch ─────────────────────────────────────
    /// The body was not JSON, or not the JSON shape we expected.
    #[error("Cannot parse response from {url}: {message}")]
    Parse { url: String, message: String },

    /// Non-2xx response.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    // ── Everything else ─────────────────────────────────────────────
    /// A condition outside the modeled taxonomy. Callers must surface it.
    #[error("Unexpected failure talking to {url}: {message}")]
    Unknown { url: String, message: String },
}

/// Zero-data mirror of [`Error`] variants.
///
/// Lets consumers branch on the failure class without matching message text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    ConnectionFailure,
    ParseError,
    HttpStatusError,
    UnknownFailure,
}

impl FailureKind {
    /// Timeouts and connection failures are expected to clear on the next poll.
    pub fn is_transient(self) -> bool {
        matches!(self, Self::Timeout | Self::ConnectionFailure)
    }

    /// Only unmodeled failures are allowed to abort a refresh cycle.
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::UnknownFailure)
    }
}

impl Error {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Connection { .. } => FailureKind::ConnectionFailure,
            Self::Parse { .. } => FailureKind::ParseError,
            Self::HttpStatus { .. } => FailureKind::HttpStatusError,
            Self::Unknown { .. } => FailureKind::UnknownFailure,
        }
    }

    /// Returns `true` if this is a transient error worth retrying on the next poll.
    pub fn is_transient(&self) -> bool {
        self.kind().is_transient()
    }

    /// Returns `true` if this error signals a condition outside the taxonomy.
    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }

    /// Returns `true` if the server rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::HttpStatus { status: 401 | 403, .. })
    }

    /// The URL the failing request targeted.
    pub fn url(&self) -> &str {
        match self {
            Self::Timeout { url, .. }
            | Self::Connection { url, .. }
            | Self::Parse { url, .. }
            | Self::HttpStatus { url, .. }
            | Self::Unknown { url, .. } => url,
        }
    }

    /// Translate a `reqwest` failure into the taxonomy.
    pub(crate) fn from_reqwest(url: &str, err: &reqwest::Error, timeout_secs: u64) -> Self {
        let url = url.to_owned();
        if err.is_timeout() {
            Self::Timeout { url, timeout_secs }
        } else if err.is_connect() || err.is_request() || err.is_body() {
            Self::Connection {
                url,
                reason: err.to_string(),
            }
        } else if err.is_decode() {
            Self::Parse {
                url,
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::HttpStatus {
                url,
                status: status.as_u16(),
            }
        } else {
            Self::Unknown {
                url,
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_split_transient_from_fatal() {
        let timeout = Error::Timeout {
            url: "http://abs/ping".into(),
            timeout_secs: 10,
        };
        let parse = Error::Parse {
            url: "http://abs/api/users".into(),
            message: "expected value".into(),
        };
        let unknown = Error::Unknown {
            url: "http://abs/api/users".into(),
            message: "boom".into(),
        };

        assert!(timeout.is_transient());
        assert!(!timeout.is_fatal());
        assert!(!parse.is_transient());
        assert!(!parse.is_fatal());
        assert!(unknown.is_fatal());
        assert_eq!(parse.url(), "http://abs/api/users");
    }

    #[test]
    fn failure_kind_names_are_snake_case() {
        assert_eq!(FailureKind::ConnectionFailure.to_string(), "connection_failure");
        assert_eq!(
            "http_status_error".parse::<FailureKind>().ok(),
            Some(FailureKind::HttpStatusError)
        );
    }

    #[test]
    fn unauthorized_is_a_status_error() {
        let err = Error::HttpStatus {
            url: "http://abs/api/users".into(),
            status: 401,
        };
        assert!(err.is_unauthorized());
        assert_eq!(err.kind(), FailureKind::HttpStatusError);
    }
}
