use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport failure or non-success status
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something that is not the expected JSON
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Empty response: bad request, or the session has expired
    #[error("request dropped by server")]
    Dropped,
}
