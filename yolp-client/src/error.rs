//! Error types for the client application.

use crate::config::ConfigError;
use crate::session::SessionError;
use yolp_core::ClientError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to initialize logging: {0}")]
    Telemetry(String),
    #[error("{0}")]
    Usage(String),
}

pub type AppResult<T> = Result<T, AppError>;
