//! Configuration for the preferred (external downloader) tier.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the external downloader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloaderConfig {
    /// Path to the yt-dlp binary, or a bare name looked up on `PATH`.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Format selector passed with `-f`.
    #[serde(default = "default_format_selector")]
    pub format_selector: String,

    /// Additional arguments inserted before the output flag.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_format_selector() -> String {
    "bestaudio[ext=m4a]/bestaudio".to_string()
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            format_selector: default_format_selector(),
            extra_args: Vec::new(),
        }
    }
}

impl DownloaderConfig {
    /// Creates a new config with a custom yt-dlp path.
    pub fn with_path(ytdlp_path: impl Into<PathBuf>) -> Self {
        Self {
            ytdlp_path: ytdlp_path.into(),
            ..Default::default()
        }
    }
}
