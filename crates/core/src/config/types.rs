use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::extractor::DownloaderConfig;
use crate::transcoder::{ResolvedOptions, TranscoderConfig};
use crate::youtube::FetchConfig;

/// Root configuration
///
/// Every section is optional; an empty file yields [`Config::default`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub downloader: DownloaderConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Defaults for every conversion option a request leaves unset.
    #[serde(default)]
    pub conversion: ResolvedOptions,
    /// Directory for transient download files.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            downloader: DownloaderConfig::default(),
            transcoder: TranscoderConfig::default(),
            fetch: FetchConfig::default(),
            conversion: ResolvedOptions::default(),
            temp_dir: default_temp_dir(),
        }
    }
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir()
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.conversion, ResolvedOptions::default());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
temp_dir = "/var/tmp/ytaudio"

[server]
host = "127.0.0.1"
port = 9000

[downloader]
ytdlp_path = "/usr/local/bin/yt-dlp"

[transcoder]
ffmpeg_path = "/usr/bin/ffmpeg"
kill_grace_secs = 2

[fetch]
chunk_size_bytes = 1048576

[conversion]
bitrate = "128k"
channel_count = 2
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.downloader.ytdlp_path, PathBuf::from("/usr/local/bin/yt-dlp"));
        assert_eq!(config.transcoder.ffmpeg_path, PathBuf::from("/usr/bin/ffmpeg"));
        assert_eq!(config.transcoder.kill_grace_secs, 2);
        assert_eq!(config.fetch.chunk_size_bytes, 1_048_576);
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.conversion.bitrate, "128k");
        assert_eq!(config.conversion.channel_count, 2);
        assert_eq!(config.conversion.sample_rate_hz, 22050);
        assert_eq!(config.temp_dir, PathBuf::from("/var/tmp/ytaudio"));
    }
}
