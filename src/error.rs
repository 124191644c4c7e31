//! Error type shared by the store, the valuation pass and the import path
//!
//! Recoverable listing problems (unparseable notes, unknown currencies,
//! undefined statistics) never surface here. They are reported through
//! `Option` or outcome enums and logged at debug level.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid listing data: {0}")]
    InvalidListing(String),
}

pub type Result<T> = std::result::Result<T, ValuationError>;
