//! Conversion options and their defaults.

use serde::{Deserialize, Serialize};

use super::error::TranscodeError;

/// Fully populated conversion settings handed to the transcoder.
///
/// `ResolvedOptions::default()` is the single source of fallback values; the
/// server and CLI may replace it with the `[conversion]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedOptions {
    /// Resample target in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,
    /// 1 for mono, 2 for stereo.
    #[serde(default = "default_channel_count")]
    pub channel_count: u8,
    /// Encoded bitrate token, e.g. `64k`.
    #[serde(default = "default_bitrate")]
    pub bitrate: String,
    /// Output container/codec token, e.g. `mp3`.
    #[serde(default = "default_output_format")]
    pub output_format: String,
}

fn default_sample_rate() -> u32 {
    22050
}

fn default_channel_count() -> u8 {
    1
}

fn default_bitrate() -> String {
    "64k".to_string()
}

fn default_output_format() -> String {
    "mp3".to_string()
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate(),
            channel_count: default_channel_count(),
            bitrate: default_bitrate(),
            output_format: default_output_format(),
        }
    }
}

impl ResolvedOptions {
    /// Rejects settings the transcoder cannot honor.
    pub fn validate(&self) -> Result<(), TranscodeError> {
        if self.sample_rate_hz == 0 {
            return Err(TranscodeError::invalid_options("sample rate must be positive"));
        }
        if !matches!(self.channel_count, 1 | 2) {
            return Err(TranscodeError::invalid_options(format!(
                "channel count must be 1 or 2, got {}",
                self.channel_count
            )));
        }
        if self.bitrate.trim().is_empty() {
            return Err(TranscodeError::invalid_options("bitrate must not be empty"));
        }
        if self.output_format.trim().is_empty() {
            return Err(TranscodeError::invalid_options("output format must not be empty"));
        }
        Ok(())
    }

    /// File extension for the output format.
    pub fn file_extension(&self) -> &str {
        match self.output_format.as_str() {
            "adts" => "aac",
            "ipod" => "m4a",
            "oga" => "ogg",
            other => other,
        }
    }

    /// MIME type for the output format.
    pub fn mime_type(&self) -> &'static str {
        match self.output_format.as_str() {
            "mp3" => "audio/mpeg",
            "adts" | "aac" => "audio/aac",
            "ipod" | "mp4" | "m4a" => "audio/mp4",
            "ogg" | "oga" | "opus" => "audio/ogg",
            "wav" => "audio/wav",
            "flac" => "audio/flac",
            _ => "application/octet-stream",
        }
    }
}

/// Caller-supplied partial options. Unset fields fall back to the defaults
/// passed to [`ConversionOptions::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate_hz: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_count: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,
}

impl ConversionOptions {
    /// Sets the encoded bitrate.
    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = Some(bitrate.into());
        self
    }

    /// Sets the resample target.
    pub fn with_sample_rate(mut self, sample_rate_hz: u32) -> Self {
        self.sample_rate_hz = Some(sample_rate_hz);
        self
    }

    /// Sets the channel count.
    pub fn with_channels(mut self, channel_count: u8) -> Self {
        self.channel_count = Some(channel_count);
        self
    }

    /// Sets the output container/codec token.
    pub fn with_format(mut self, output_format: impl Into<String>) -> Self {
        self.output_format = Some(output_format.into());
        self
    }

    /// Merges these options over `defaults`. Zero and empty values count as
    /// unset.
    pub fn resolve(&self, defaults: &ResolvedOptions) -> ResolvedOptions {
        ResolvedOptions {
            sample_rate_hz: self
                .sample_rate_hz
                .filter(|rate| *rate != 0)
                .unwrap_or(defaults.sample_rate_hz),
            channel_count: self
                .channel_count
                .filter(|channels| *channels != 0)
                .unwrap_or(defaults.channel_count),
            bitrate: self
                .bitrate
                .clone()
                .filter(|bitrate| !bitrate.is_empty())
                .unwrap_or_else(|| defaults.bitrate.clone()),
            output_format: self
                .output_format
                .clone()
                .filter(|format| !format.is_empty())
                .unwrap_or_else(|| defaults.output_format.clone()),
        }
    }
}
