//! Gist lookup over HTTP.
//!
//! The resolver turns a [`Reference`] into the gist service's JSON embed
//! description:
//! - Builds `<host>/<identifier>.json[?file=<filename>]`
//! - Issues exactly one GET through an [`HttpClient`]
//! - Classifies every failure into a [`FetchError`]
//!
//! [`UreqClient`] is the default network primitive; hosts with their own
//! network layer implement [`HttpClient`] instead.

use std::sync::Arc;
use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use ureq::Agent;

use crate::consts::{DEFAULT_GIST_HOST, DEFAULT_TIMEOUT};
use crate::reference::Reference;

/// Characters escaped in the `file` query value (everything but RFC 3986
/// unreserved characters).
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Status and body of an HTTP response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
}

/// Network-level failure (DNS, connect, timeout, unreadable body).
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Network primitive used by the resolver.
pub trait HttpClient: Send + Sync {
    /// Perform a GET request.
    ///
    /// Non-success statuses are returned as responses, not errors.
    fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, TransportError>;
}

/// [`HttpClient`] backed by a pooled `ureq` agent.
pub struct UreqClient {
    agent: Agent,
}

impl UreqClient {
    /// Create a client whose requests time out after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: create_agent(timeout),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl HttpClient for UreqClient {
    fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, TransportError> {
        let response = self
            .agent
            .get(url)
            .header("Accept", accept)
            .call()
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| TransportError(e.to_string()))?;

        Ok(HttpResponse { status, body })
    }
}

/// Create HTTP agent with the specified timeout.
///
/// Status codes are not turned into errors so the resolver can tell a
/// rejected request from a transport fault.
fn create_agent(timeout: Duration) -> Agent {
    Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build()
        .into()
}

/// Decoded embed description of one gist.
///
/// Only `div` and `stylesheet` drive rendering; the remaining fields are
/// carried along as metadata.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct RemoteDocument {
    /// Rendered HTML fragment.
    #[serde(rename = "div")]
    pub markup: String,
    /// Stylesheet URL the fragment expects.
    pub stylesheet: String,
    /// Gist description as entered by its owner.
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the gist is listed publicly.
    #[serde(default)]
    pub public: Option<bool>,
    /// Creation timestamp as sent by the service.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Names of the files in the gist.
    #[serde(default)]
    pub files: Option<Vec<String>>,
    /// Login of the gist owner.
    #[serde(default)]
    pub owner: Option<String>,
}

/// Why a gist could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The service answered with a non-success status.
    #[error("remote rejected request (HTTP {status})")]
    Rejected { status: u16 },
    /// The body was not the expected JSON.
    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The request never completed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Resolves references against the gist service.
#[derive(Clone)]
pub struct Resolver {
    base_url: String,
    client: Arc<dyn HttpClient>,
}

impl Resolver {
    /// Create a resolver for `base_url` (e.g. `"https://gist.github.com"`).
    pub fn new(base_url: impl Into<String>, client: Arc<dyn HttpClient>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { base_url, client }
    }

    /// Resolver for the public gist service using [`UreqClient`].
    #[must_use]
    pub fn github() -> Self {
        Self::new(DEFAULT_GIST_HOST, Arc::new(UreqClient::default()))
    }

    /// Lookup URL for `reference`.
    pub fn lookup_url(&self, reference: &Reference) -> String {
        let mut url = format!("{}/{}.json", self.base_url, reference.identifier());
        if let Some(filename) = reference.filename() {
            url.push_str("?file=");
            url.extend(utf8_percent_encode(filename, QUERY_VALUE));
        }
        url
    }

    /// Fetch and decode the gist behind `reference`.
    ///
    /// Performs a single request; no retries.
    pub fn resolve(&self, reference: &Reference) -> Result<RemoteDocument, FetchError> {
        let url = self.lookup_url(reference);
        tracing::debug!(url = %url, "Fetching gist");

        let response = self.client.get(&url, "application/json")?;

        if !(200..300).contains(&response.status) {
            return Err(FetchError::Rejected {
                status: response.status,
            });
        }

        let document = serde_json::from_str(&response.body)?;
        Ok(document)
    }
}
