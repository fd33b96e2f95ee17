// Audiobookshelf HTTP client
//
// Wraps `reqwest::Client` with bearer-token auth, base-URL joining, a hard
// per-call timeout, and translation of every failure into `Error`. Endpoint
// methods live in `endpoints.rs` as inherent methods so this module stays
// focused on transport mechanics.

use std::time::Duration;

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};
use url::Url;

use crate::error::{Error, FailureKind};
use crate::transport::TransportConfig;

const BODY_PREVIEW_CHARS: usize = 200;

/// Raw HTTP client for an Audiobookshelf server.
///
/// Holds the base URL and bearer token for one server. No retries are
/// attempted; a failed call is reported once and the caller decides what
/// happens next.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
    timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client that owns its own `reqwest::Client`.
    pub fn new(
        base_url: Url,
        token: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, token, transport.timeout))
    }

    /// Create a client around a pre-built, shared `reqwest::Client`.
    ///
    /// The timeout is enforced per call regardless of how `http` was built.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        token: SecretString,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            base_url,
            token,
            timeout,
        }
    }

    /// The server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The bearer token this client authenticates with.
    pub fn token(&self) -> &SecretString {
        &self.token
    }

    /// The per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Join an endpoint path onto the base URL, keeping any sub-path the
    /// server is mounted under (e.g. `https://host/abs` + `api/users`).
    pub fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let full = format!("{base}/{path}");
        Url::parse(&full).map_err(|e| Error::Unknown {
            url: full.clone(),
            message: format!("invalid request URL: {e}"),
        })
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a request and decode the JSON body.
    ///
    /// An empty successful body decodes as `Value::Null`. Every failure is
    /// logged with its URL and kind before it is returned.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, Error> {
        let result = match self.url(path) {
            Ok(url) => self.execute(method, url, body).await,
            Err(e) => Err(e),
        };
        if let Err(ref e) = result {
            log_failure(e);
        }
        result
    }

    /// Send a GET request and decode the body into `T`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let value = self.request(Method::GET, path, None).await?;
        serde_json::from_value(value).map_err(|e| {
            let err = Error::Parse {
                url: self
                    .url(path)
                    .map_or_else(|_| path.to_owned(), |u| u.to_string()),
                message: format!("unexpected shape: {e}"),
            };
            log_failure(&err);
            err
        })
    }

    async fn execute(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Value, Error> {
        let url_str = url.to_string();
        let timeout_secs = self.timeout.as_secs();
        debug!(%method, url = %url_str, "sending request");

        let mut builder = self
            .http
            .request(method, url)
            .bearer_auth(self.token.expose_secret());
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let exchange = async {
            let resp = builder
                .send()
                .await
                .map_err(|e| Error::from_reqwest(&url_str, &e, timeout_secs))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(Error::HttpStatus {
                    url: url_str.clone(),
                    status: status.as_u16(),
                });
            }

            resp.text()
                .await
                .map_err(|e| Error::from_reqwest(&url_str, &e, timeout_secs))
        };

        let text = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| Error::Timeout {
                url: url_str.clone(),
                timeout_secs,
            })??;

        decode_body(&url_str, &text)
    }
}

/// Decode a response body, tolerating an empty body on success.
fn decode_body(url: &str, body: &str) -> Result<Value, Error> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| {
        let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
        Error::Parse {
            url: url.to_owned(),
            message: format!("{e} (body preview: {preview:?})"),
        }
    })
}

/// Log line for each failure kind.
fn failure_message(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Timeout => "timeout fetching information",
        FailureKind::ConnectionFailure => "error fetching information",
        FailureKind::ParseError => "error parsing information",
        FailureKind::HttpStatusError => "unexpected HTTP status",
        FailureKind::UnknownFailure => "unexpected failure",
    }
}

fn log_failure(err: &Error) {
    let kind: FailureKind = err.kind();
    let message = failure_message(kind);
    if kind.is_transient() {
        warn!(url = err.url(), %kind, error = %err, "{message}");
    } else {
        error!(url = err.url(), %kind, error = %err, "{message}");
    }
}
