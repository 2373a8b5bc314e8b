use thiserror::Error;

/// Classified failure from a registry fetch.
///
/// Callers treat these as data: `NotFound` is final, `Network` may be
/// retried later by the caller, `Parse` means the registry answered but
/// the payload shape was unexpected.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("package not found: {0}")]
    NotFound(String),

    #[error("unexpected registry payload: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
