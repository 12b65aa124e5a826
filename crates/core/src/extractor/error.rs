//! Error types for the extraction pipeline.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::transcoder::TranscodeError;
use crate::video::FetchError;

/// One complete attempt path of the extraction backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// External downloader piped into the transcoder.
    Preferred,
    /// Native fetch library with a transient file.
    Fallback,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Preferred => f.write_str("preferred"),
            Tier::Fallback => f.write_str("fallback"),
        }
    }
}

/// Errors returned by a conversion.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Metadata could not be resolved (network, removed/private video, or
    /// an input without a video identifier).
    #[error("Metadata unavailable for {reference}: {reason}")]
    MetadataUnavailable { reference: String, reason: String },

    /// The catalog has no usable audio track.
    #[error("No audio format available")]
    NoAudioFormat,

    /// Tool missing, extractor exited non-zero, or the download failed.
    #[error("{tier} extraction failed: {cause}")]
    Extraction { tier: Tier, cause: String },

    /// Transcoder exited non-zero.
    #[error("{tier} transcode failed: {diagnostic}")]
    Transcode { tier: Tier, diagnostic: String },

    /// Transcoder binary not found.
    #[error("Transcoder unavailable: {path} not found")]
    TranscoderUnavailable { path: PathBuf },

    /// Both tiers failed.
    #[error("All extraction tiers failed (preferred: {preferred}; fallback: {fallback})")]
    AllTiersFailed {
        preferred: Box<ConversionError>,
        fallback: Box<ConversionError>,
    },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    #[error("Conversion cancelled")]
    Cancelled,

    /// The caller's sink rejected a write.
    #[error("Output sink rejected write: {0}")]
    Sink(#[source] std::io::Error),
}

impl ConversionError {
    /// Maps a coordinator error raised while running `tier`.
    pub fn from_transcode(tier: Tier, err: TranscodeError) -> Self {
        match err {
            TranscodeError::Unavailable { path } => Self::TranscoderUnavailable { path },
            TranscodeError::Failed { diagnostic, .. } => Self::Transcode { tier, diagnostic },
            TranscodeError::ExtractorFailed { diagnostic, .. } => Self::Extraction {
                tier,
                cause: diagnostic,
            },
            TranscodeError::InvalidOptions { reason } => Self::InvalidOptions(reason),
            TranscodeError::Sink(e) => Self::Sink(e),
            TranscodeError::Io(e) => Self::Extraction {
                tier,
                cause: e.to_string(),
            },
            TranscodeError::Cancelled => Self::Cancelled,
        }
    }

    /// Maps a failure to resolve `reference` through a video source.
    pub fn metadata_unavailable(reference: impl fmt::Display, err: FetchError) -> Self {
        match err {
            FetchError::NoAudioFormat => Self::NoAudioFormat,
            other => Self::MetadataUnavailable {
                reference: reference.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// Creates an extraction failure for `tier`.
    pub fn extraction(tier: Tier, cause: impl fmt::Display) -> Self {
        Self::Extraction {
            tier,
            cause: cause.to_string(),
        }
    }

    /// Errors that end the conversion without trying another tier.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Sink(_) | Self::InvalidOptions(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether the transcoder was missing, in any tier.
    pub fn is_transcoder_unavailable(&self) -> bool {
        match self {
            Self::TranscoderUnavailable { .. } => true,
            Self::AllTiersFailed {
                preferred,
                fallback,
            } => preferred.is_transcoder_unavailable() || fallback.is_transcoder_unavailable(),
            _ => false,
        }
    }

    /// Whether the error means the requested video could not be found or
    /// resolved, as opposed to a failure of the pipeline itself.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::MetadataUnavailable { .. } | Self::NoAudioFormat => true,
            Self::AllTiersFailed { fallback, .. } => fallback.is_not_found(),
            _ => false,
        }
    }
}
