use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
/// Errors returned by this crate.
pub enum SvnError {
    /// The provided repository URL is syntactically invalid or unsupported.
    #[error("invalid repository url: {0}")]
    InvalidUrl(String),
    /// A listing entry or the local path it maps to is invalid or unsafe.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// A filesystem operation (directory creation, file write, rename) failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// The HTTP request could not be completed (DNS, TLS, connection reset, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The redirect chain reached the configured bound before a final response.
    #[error("too many redirects: {redirects} >= {limit}")]
    TooManyRedirects {
        /// Number of redirects followed when the fetch gave up.
        redirects: usize,
        /// The configured redirect bound.
        limit: usize,
    },
    /// A redirect response carried no usable `Location` header.
    #[error("invalid redirect: {0}")]
    InvalidRedirect(String),
    /// The server rejected the credentials (`401` or `403`).
    #[error("auth failed for {url}: HTTP {status}")]
    AuthFailed {
        /// URL of the final (post-redirect) request.
        url: String,
        /// HTTP status code returned by the server.
        status: u16,
    },
    /// The server answered a listing or file request with a non-success status.
    #[error("unexpected HTTP {status} for {url}")]
    HttpStatus {
        /// URL of the final (post-redirect) request.
        url: String,
        /// HTTP status code returned by the server.
        status: u16,
    },
    /// A directory listing declared a body larger than the configured limit.
    #[error("listing at {url} is {length} bytes, exceeds limit {limit}")]
    ListingTooLarge {
        /// URL of the listing.
        url: String,
        /// Declared `Content-Length`.
        length: u64,
        /// Configured maximum listing size.
        limit: usize,
    },
    /// The checkout was cancelled or its deadline elapsed.
    #[error("checkout cancelled")]
    Cancelled,
}

impl SvnError {
    /// Returns `true` for transport failures that are worth retrying.
    ///
    /// Redirect loops and HTTP status failures are never retryable.
    pub fn is_transient(&self) -> bool {
        match self {
            SvnError::Transport(err) => err.is_connect() || err.is_timeout() || err.is_request(),
            _ => false,
        }
    }
}
