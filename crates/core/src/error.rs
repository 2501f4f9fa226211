use reqwest::StatusCode;
use thiserror::Error;

/// The primary (live API) request did not produce a usable JSON body.
///
/// This is the error callers of `FallbackClient::fetch_json` observe whenever
/// the snapshot fallback cannot answer either.
#[derive(Debug, Error)]
#[error("live request to {url} failed ({kind}): {detail}")]
pub struct LiveRequestFailed {
    pub url: String,
    pub kind: LiveFailureKind,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveFailureKind {
    Status(StatusCode),
    Transport,
    Decode,
}

impl std::fmt::Display for LiveFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiveFailureKind::Status(status) => write!(f, "HTTP {status}"),
            LiveFailureKind::Transport => f.write_str("transport"),
            LiveFailureKind::Decode => f.write_str("decode"),
        }
    }
}

/// The static snapshot could not be fetched or is not JSON.
#[derive(Debug, Error)]
#[error("snapshot unavailable at {location}: {reason}")]
pub struct SnapshotUnavailable {
    pub location: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("no snapshot route for {0}")]
    NoRouteMatch(String),

    #[error("failed to encode route response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why the snapshot fallback declined to answer. Never surfaced to callers of
/// the fallback client; they get the original [`LiveRequestFailed`] instead.
#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("path {0} is not an API path")]
    NotApiPath(String),

    #[error(transparent)]
    Snapshot(#[from] SnapshotUnavailable),

    #[error(transparent)]
    Route(#[from] RouteError),
}
