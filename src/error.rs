use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DiveError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid api root: {0}")]
    InvalidApiRoot(String),

    #[error("backend request failed: {0}")]
    Http(String),

    #[error("backend returned status {status}: {message}")]
    BackendStatus { status: u16, message: String },

    #[error("failed to decode backend response: {0}")]
    Decode(String),

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    #[error("unknown model type: {0}")]
    UnknownModelType(String),

    #[error("unknown mutation: {0}")]
    UnknownMutation(String),

    #[error("mutation {mutation} is not visible from the root scope")]
    PrivateMutation { mutation: String },

    #[error("payload does not match mutation {0}")]
    PayloadMismatch(String),

    #[error("invalid JSON payload: {0}")]
    InvalidPayload(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
