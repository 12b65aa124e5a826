//! Error types for video sources.

use thiserror::Error;

/// Errors raised while resolving a video or downloading its payload.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The input did not contain a video identifier.
    #[error("Not a video reference: {0}")]
    InvalidReference(String),

    /// Video removed, private, or otherwise not found.
    #[error("Video not found: {0}")]
    NotFound(String),

    /// The service refused playback (age restriction, login required, ...).
    #[error("Video {id} is not playable: {status} ({reason})")]
    Unplayable {
        id: String,
        status: String,
        reason: String,
    },

    /// API returned an error status.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// The catalog has no usable audio track.
    #[error("No audio formats available")]
    NoAudioFormat,
}

impl FetchError {
    /// Whether this error came from the network layer rather than the video itself.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Http(_) | Self::ApiError { .. })
    }
}
