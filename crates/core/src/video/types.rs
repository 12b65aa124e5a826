//! Types describing a remote video and its available audio encodings.

use serde::{Deserialize, Serialize};

/// Immutable snapshot of a video's descriptive metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub author: String,
    /// Human-readable duration, e.g. `3m33s`.
    pub duration: String,
    pub id: String,
}

/// One entry of a video's encodings catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormatDescriptor {
    /// Remote format tag.
    pub itag: u32,
    /// Bits per second as advertised by the catalog.
    pub bitrate: u64,
    /// Empty for adaptive/audio-only encodings, e.g. `720p` otherwise.
    pub quality_label: String,
    /// Container/codec hint, e.g. `audio/webm; codecs="opus"`.
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_channels: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
    /// Direct media URL for the payload.
    pub url: String,
}

impl AudioFormatDescriptor {
    /// Audio-only encodings advertise an `audio/*` MIME type.
    pub fn is_audio_only(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    pub fn has_audio_channels(&self) -> bool {
        self.audio_channels.is_some_and(|channels| channels > 0)
    }

    pub fn is_labeled(&self) -> bool {
        !self.quality_label.is_empty()
    }

    /// Container part of the MIME type (`webm` for `audio/webm; codecs=...`).
    pub fn container(&self) -> Option<&str> {
        let essence = self.mime_type.split(';').next()?.trim();
        essence.split_once('/').map(|(_, subtype)| subtype)
    }
}

/// A fetched video: metadata plus its encodings catalog.
#[derive(Debug, Clone)]
pub struct Video {
    pub metadata: VideoMetadata,
    pub formats: Vec<AudioFormatDescriptor>,
}

/// Formats whole seconds the way a duration is usually spelled out:
/// `45s`, `3m33s`, `1h0m5s`.
pub fn format_duration(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h{}m{}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
