/// Shared error type used by the registry client and config loading.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("{0} not found")]
    NotFound(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error means the requested entity does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
