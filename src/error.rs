use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("not found")]
    NotFound,

    #[error("already exists")]
    AlreadyExists,

    #[error("admission denied: {0}")]
    AdmissionDenied(String),

    #[error("remote authority error: {0}")]
    Remote(String),

    #[error("synchronization timed out after {0:?}")]
    SyncTimeout(std::time::Duration),

    #[error("synchronization already in progress")]
    SyncInProgress,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid token format")]
    InvalidTokenFormat,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Remote(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
