//! Error types for the transcoder module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while piping audio through the transcoder.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Transcoder binary not found.
    #[error("Transcoder unavailable: {path} not found")]
    Unavailable { path: PathBuf },

    /// Transcoder exited with a non-zero status.
    #[error("Transcoder failed: {diagnostic}")]
    Failed {
        diagnostic: String,
        exit_code: Option<i32>,
    },

    /// Upstream extractor exited with a non-zero status.
    #[error("Extractor failed: {diagnostic}")]
    ExtractorFailed {
        diagnostic: String,
        exit_code: Option<i32>,
    },

    /// Conversion settings the transcoder cannot honor.
    #[error("Invalid options: {reason}")]
    InvalidOptions { reason: String },

    /// The caller's sink rejected a write.
    #[error("Output sink rejected write: {0}")]
    Sink(#[source] std::io::Error),

    /// I/O error while driving the processes.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Conversion was cancelled.
    #[error("Conversion cancelled")]
    Cancelled,
}

impl TranscodeError {
    /// Creates a failure from captured diagnostic text, falling back to the
    /// exit status when the process printed nothing.
    pub fn failed(stderr: &str, exit_code: Option<i32>) -> Self {
        Self::Failed {
            diagnostic: diagnostic_or_status("transcoder", stderr, exit_code),
            exit_code,
        }
    }

    /// Same as [`TranscodeError::failed`] for the upstream extractor.
    pub fn extractor_failed(stderr: &str, exit_code: Option<i32>) -> Self {
        Self::ExtractorFailed {
            diagnostic: diagnostic_or_status("extractor", stderr, exit_code),
            exit_code,
        }
    }

    /// Creates a new invalid options error.
    pub fn invalid_options(reason: impl Into<String>) -> Self {
        Self::InvalidOptions {
            reason: reason.into(),
        }
    }
}

fn diagnostic_or_status(process: &str, stderr: &str, exit_code: Option<i32>) -> String {
    let trimmed = stderr.trim();
    if !trimmed.is_empty() {
        return trimmed.to_string();
    }
    match exit_code {
        Some(code) => format!("{} exited with code {}", process, code),
        None => format!("{} terminated by signal", process),
    }
}
