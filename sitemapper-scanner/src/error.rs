use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Unexpected status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Parse error: {0}")]
    ParseError(String),

    /// Returned by loaders that observe shutdown themselves. Workers stop
    /// on it instead of recording the page as a failed leaf. `HttpLoader`
    /// never returns it; dropping its future is enough to abort a fetch.
    #[error("Fetch cancelled")]
    Cancelled,
}

impl ScanError {
    /// Cancellation is a shutdown signal rather than a page failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
