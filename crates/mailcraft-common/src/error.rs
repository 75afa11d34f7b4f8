//! Error types for mailcraft

use thiserror::Error;

/// Main error type for mailcraft
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("SMTP error: {0}")]
    Smtp(String),

    #[error("POP3 error: {0}")]
    Pop3(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for mailcraft
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Encoding(_) => "ENCODING_ERROR",
            Error::Smtp(_) => "SMTP_ERROR",
            Error::Pop3(_) => "POP3_ERROR",
            Error::Parse(_) => "PARSE_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Other(_) => "INTERNAL_ERROR",
        }
    }
}
