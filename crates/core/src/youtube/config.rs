//! Configuration for the native fetch backend.

use serde::{Deserialize, Serialize};

/// Default player endpoint.
pub const DEFAULT_PLAYER_URL: &str = "https://www.youtube.com/youtubei/v1/player?prettyPrint=false";

/// HTTP settings for [`InnerTubeSource`](super::InnerTubeSource).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Size of each ranged payload request. The media servers throttle long
    /// single transfers, so payloads are fetched in pieces.
    #[serde(default = "default_chunk_size")]
    pub chunk_size_bytes: u64,

    /// User-Agent for payload downloads.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Player API endpoint.
    #[serde(default = "default_player_url")]
    pub player_url: String,
}

fn default_timeout() -> u64 {
    30
}

fn default_chunk_size() -> u64 {
    10 * 1024 * 1024 // 10 MiB
}

fn default_user_agent() -> String {
    format!("ytaudio/{}", env!("CARGO_PKG_VERSION"))
}

fn default_player_url() -> String {
    DEFAULT_PLAYER_URL.to_string()
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            chunk_size_bytes: default_chunk_size(),
            user_agent: default_user_agent(),
            player_url: default_player_url(),
        }
    }
}
