use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP layer failed: transport error, non-success status, or a
    /// body read that died mid-stream. All of these advance the retry
    /// loop the same way.
    #[error("request failed")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Every mirror and every retry was used up. Carries the last
    /// underlying failure.
    #[error("all download attempts failed after {attempts} tries")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },

    /// The caller cancelled the fetch.
    #[error("download cancelled")]
    Cancelled,

    /// The HTTP client itself could not be constructed.
    #[error("failed to build HTTP client")]
    Client(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, FetchError>;
