//! Error types for VyuhaNav.

use thiserror::Error;

/// VyuhaNav error type
#[derive(Error, Debug)]
pub enum NavError {
    #[error("Connection failed: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Solve failed: {0}")]
    Solve(#[from] vyuha_map::SolveError),

    #[error("Route error: {0}")]
    Route(String),
}

impl From<toml::de::Error> for NavError {
    fn from(e: toml::de::Error) -> Self {
        NavError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NavError>;
