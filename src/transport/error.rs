// ABOUTME: Transport error types with SNAFU pattern.
// ABOUTME: Surfaces timeouts as a typed variant instead of message text.

use snafu::Snafu;

use crate::components::PackageError;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum TransportError {
    #[snafu(display("request to {url} failed: {source}"))]
    Http { url: String, source: reqwest::Error },

    #[snafu(display("request to {url} returned HTTP {status}: {body}"))]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[snafu(display("request to {url} timed out"))]
    Timeout { url: String },

    #[snafu(display("could not decode response from {url}: {source}"))]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[snafu(display("unexpected response from {url}: {message}"))]
    Protocol { url: String, message: String },

    #[snafu(display("failed to package components: {source}"))]
    Package { source: PackageError },

    #[snafu(display("invalid org connection: {message}"))]
    Connection { message: String },
}

impl TransportError {
    /// Build from a reqwest error, classifying client timeouts.
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            TransportError::Timeout {
                url: url.to_string(),
            }
        } else {
            TransportError::Http {
                url: url.to_string(),
                source,
            }
        }
    }

    /// Whether the transport gave up waiting. Polling treats this as recoverable.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}
