//! Error types for the eqdb data client.

use thiserror::Error;

/// Failures of the data service that make a lookup unusable.
///
/// "Not found" is not represented here: the client returns an empty or
/// `None` result for 404s and empty result sets.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Still rate limited after the configured number of retries
    #[error("rate limited by {url} after {attempts} attempts")]
    RateLimited { url: String, attempts: u32 },

    /// Server error or unexpected client error status
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// Timeout, refused connection, broken body
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Body was not valid JSON
    #[error("malformed JSON from {url}: {source}")]
    MalformedJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON that does not carry the fields we need
    #[error("unexpected response shape from {url}: {message}")]
    UnexpectedShape { url: String, message: String },
}

impl ClientError {
    /// HTTP status associated with the failure, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            Self::MalformedJson { .. } | Self::UnexpectedShape { .. } => None,
        }
    }
}
