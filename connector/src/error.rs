use crate::core::session::SessionError;
use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

/// Error type for the shield connector
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Relayer error: {0}")]
    Relayer(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Invalid handle: {0}")]
    InvalidHandle(String),

    #[error("Invalid amount: {0}")]
    Amount(#[from] shield_protocol::AmountError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl<T> From<SendError<T>> for Error {
    fn from(e: SendError<T>) -> Self {
        Error::Channel(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Relayer(e.to_string())
    }
}

/// Result type for the shield connector
pub type Result<T> = std::result::Result<T, Error>;
