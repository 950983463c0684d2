//! Error types for the OIDC policy core

use std::io;

use thiserror::Error;

use crate::validator::ValidationReport;

/// Result type alias for the OIDC policy core
pub type Result<T> = std::result::Result<T, Error>;

/// OIDC policy core errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded or decoded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration was decoded but failed validation
    #[error("Configuration invalid: {} error(s)", .0.errors().len())]
    Validation(ValidationReport),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// The validation report carried by [`Error::Validation`], if any.
    #[must_use]
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Validation(report) => Some(report),
            _ => None,
        }
    }
}
