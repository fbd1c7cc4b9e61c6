use thiserror::Error;

/// Errors surfaced by the playlist parser.
///
/// Malformed playlist lines never produce an error: they are skipped or
/// given fallback values. The only failure is input that is not text at all.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid argument: playlist input is not valid UTF-8 text ({0})")]
    InvalidArgument(#[from] std::str::Utf8Error),
}

/// Errors from fetching a remote playlist.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid playlist URL: {0}")]
    InvalidUrl(String),

    #[error("Playlist not found (404). Check the URL.")]
    NotFound,

    #[error("Access denied (403). The playlist may require authentication.")]
    Forbidden,

    #[error("Too many requests (429). The playlist server is rate limiting.")]
    RateLimited,

    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("Playlist too large: {size_mb:.1}MB (limit {limit_mb}MB)")]
    TooLarge { size_mb: f64, limit_mb: usize },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl FetchError {
    /// Whether the request is worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::RateLimited | FetchError::Network(_))
    }
}
