//! Video reference normalization.
//!
//! Callers hand us either a bare video identifier or a full watch URL, often
//! with playlist or tracking parameters attached. Everything downstream works
//! on a [`VideoReference`], which renders as the canonical watch URL.

use std::fmt;

use once_cell::sync::Lazy;
use regex_lite::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};

/// Base of every canonical watch URL.
pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

static VIDEO_ID_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("video id pattern is valid"));

/// Canonical reference to a single video.
///
/// Holds the 11-character identifier when one could be extracted. Otherwise
/// the caller's input is kept verbatim so resolution can fail with a useful
/// message later on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VideoReference {
    id: Option<String>,
    url: String,
}

impl VideoReference {
    fn from_id(id: &str) -> Self {
        Self {
            id: Some(id.to_string()),
            url: format!("{}{}", WATCH_URL_PREFIX, id),
        }
    }

    fn unresolved(input: &str) -> Self {
        Self {
            id: None,
            url: input.to_string(),
        }
    }

    /// The video identifier, if the input carried one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Canonical watch URL, or the original input when no id was found.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn is_resolved(&self) -> bool {
        self.id.is_some()
    }
}

impl fmt::Display for VideoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// Whether `input` already has the shape of a bare video identifier.
pub fn is_video_id(input: &str) -> bool {
    VIDEO_ID_SHAPE.is_match(input)
}

/// Normalizes a bare id or watch URL into a [`VideoReference`].
///
/// Only the `v` query parameter survives; playlist indexes and other
/// parameters are dropped. Never fails: input without an identifier comes
/// back unchanged.
pub fn normalize(input: &str) -> VideoReference {
    if is_video_id(input) {
        return VideoReference::from_id(input);
    }

    let Ok(url) = Url::parse(input) else {
        return VideoReference::unresolved(input);
    };

    match url.query_pairs().find(|(key, _)| key == "v") {
        Some((_, id)) if !id.is_empty() => VideoReference::from_id(&id),
        _ => VideoReference::unresolved(input),
    }
}
