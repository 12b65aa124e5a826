//! Video references, metadata, and audio format selection.
//!
//! This module holds the pure parts of the pipeline:
//!
//! - [`normalize`] turns a bare id or watch URL into a [`VideoReference`]
//! - [`select_best_audio_format`] picks one encoding out of a catalog
//! - [`sanitize_filename`] derives a filesystem-safe name from a title
//!
//! plus the [`VideoSource`] trait implemented by native fetch backends.

mod error;
mod format_selector;
mod reference;
mod source;
mod types;

pub use error::FetchError;
pub use format_selector::select_best_audio_format;
pub use reference::{is_video_id, normalize, VideoReference, WATCH_URL_PREFIX};
pub use source::{ByteStream, VideoSource};
pub use types::{format_duration, AudioFormatDescriptor, Video, VideoMetadata};

/// Characters that are invalid in file names on at least one common platform.
const INVALID_FILENAME_CHARS: [char; 9] = ['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Replaces every invalid filename character with `_`, one for one.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if INVALID_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
