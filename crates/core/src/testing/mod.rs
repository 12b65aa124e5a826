//! Testing utilities and mock implementations.
//!
//! This module provides a mock [`VideoSource`](crate::video::VideoSource)
//! and fake external tools, allowing the full pipeline to be exercised
//! without network access, ffmpeg, or yt-dlp.
//!
//! # Example
//!
//! ```rust,ignore
//! use ytaudio_core::testing::{fake_tools, fixtures, MockVideoSource};
//!
//! let source = MockVideoSource::new();
//! source.set_video(fixtures::video("dQw4w9WgXcQ", "Song")).await;
//!
//! let ffmpeg = fake_tools::install(dir.path(), "ffmpeg", fake_tools::FakeTool::CatTranscoder);
//! ```

#[cfg(unix)]
pub mod fake_tools;
mod mock_video_source;

pub use mock_video_source::MockVideoSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::video::{format_duration, AudioFormatDescriptor, Video, VideoMetadata};

    /// Create an audio-only (adaptive) format.
    pub fn audio_format(itag: u32, bitrate: u64, quality_label: &str) -> AudioFormatDescriptor {
        AudioFormatDescriptor {
            itag,
            bitrate,
            quality_label: quality_label.to_string(),
            mime_type: "audio/webm; codecs=\"opus\"".to_string(),
            audio_channels: Some(2),
            content_length: Some(1024 * 1024),
            url: format!("https://media.example/videoplayback?itag={}", itag),
        }
    }

    /// Create a muxed audio+video format.
    pub fn muxed_format(itag: u32, bitrate: u64, quality_label: &str) -> AudioFormatDescriptor {
        AudioFormatDescriptor {
            itag,
            bitrate,
            quality_label: quality_label.to_string(),
            mime_type: "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"".to_string(),
            audio_channels: Some(2),
            content_length: None,
            url: format!("https://media.example/videoplayback?itag={}", itag),
        }
    }

    /// Create a video with a realistic catalog: one muxed format and three
    /// adaptive audio tracks, the smallest being itag 249.
    pub fn video(id: &str, title: &str) -> Video {
        let mut m4a = audio_format(140, 130_000, "");
        m4a.mime_type = "audio/mp4; codecs=\"mp4a.40.2\"".to_string();

        Video {
            metadata: VideoMetadata {
                title: title.to_string(),
                author: "Test Channel".to_string(),
                duration: format_duration(213),
                id: id.to_string(),
            },
            formats: vec![
                muxed_format(18, 503_000, "360p"),
                m4a,
                audio_format(251, 135_000, ""),
                audio_format(249, 50_000, ""),
            ],
        }
    }
}
