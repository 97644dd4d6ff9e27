//! Error types for the cover engine

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoverError {
    #[error("Invalid color component: {channel} = {value} (expected 0-255)")]
    InvalidColorComponent { channel: char, value: i64 },

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unknown swatch: {0}")]
    UnknownSwatch(String),

    #[error("Duplicate region token: {0}")]
    DuplicateRegionToken(String),

    #[error("Template already holds {0} pages")]
    PageLimitExceeded(usize),

    #[error("Cannot {action} a template in state {state}")]
    InvalidState { action: &'static str, state: String },

    #[error("Invalid page range: {0}")]
    InvalidPageRange(String),

    #[error("Preflight failed: {0}")]
    PreflightFailed(String),

    #[error("Template written by engine {0}, current is {1}")]
    EngineVersionMismatch(String, String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CoverResult<T> = Result<T, CoverError>;
