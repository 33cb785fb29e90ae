use std::path::PathBuf;

use thiserror::Error;

/// Fatal pipeline failures. Shape ambiguity and unmapped labels are not
/// errors; they are reported through logging and report counters.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("source file not readable: {path}")]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed payload: {detail}")]
    MalformedPayload { detail: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl NormalizeError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedPayload {
            detail: detail.into(),
        }
    }
}
