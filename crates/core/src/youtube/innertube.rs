//! Player API client.
//!
//! The player endpoint returns metadata plus the encodings catalog in one
//! call. Mobile client profiles get direct (unciphered) media URLs, so the
//! profiles are tried in order until one answers with a playable response.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use super::config::FetchConfig;
use crate::video::{
    format_duration, AudioFormatDescriptor, ByteStream, FetchError, Video, VideoMetadata,
    VideoReference, VideoSource,
};

/// A client identity presented to the player API.
#[derive(Debug, Clone, Copy)]
pub struct ClientProfile {
    pub name: &'static str,
    pub version: &'static str,
    pub device_make: &'static str,
    pub device_model: &'static str,
    pub os_name: &'static str,
    pub os_version: &'static str,
    pub user_agent: &'static str,
    pub android_sdk_version: Option<u32>,
}

pub const IOS_CLIENT: ClientProfile = ClientProfile {
    name: "IOS",
    version: "21.02.3",
    device_make: "Apple",
    device_model: "iPhone16,2",
    os_name: "iPhone",
    os_version: "18.1.0.22B83",
    user_agent: "com.google.ios.youtube/21.02.3 (iPhone16,2; U; CPU iOS 18_1_0 like Mac OS X;)",
    android_sdk_version: None,
};

pub const ANDROID_CLIENT: ClientProfile = ClientProfile {
    name: "ANDROID",
    version: "19.44.38",
    device_make: "Google",
    device_model: "Pixel 8",
    os_name: "Android",
    os_version: "14",
    user_agent: "com.google.android.youtube/19.44.38 (Linux; U; Android 14; en_US; Pixel 8) gzip",
    android_sdk_version: Some(34),
};

/// Profiles tried by [`InnerTubeSource::new`], in order.
pub const DEFAULT_CLIENTS: [ClientProfile; 2] = [IOS_CLIENT, ANDROID_CLIENT];

/// Native [`VideoSource`] backed by the player API.
pub struct InnerTubeSource {
    client: Client,
    config: FetchConfig,
    clients: Vec<ClientProfile>,
}

impl InnerTubeSource {
    /// Creates a source trying the default client profiles.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        Self::with_clients(config, DEFAULT_CLIENTS.to_vec())
    }

    /// Creates a source trying `clients` in order.
    pub fn with_clients(config: FetchConfig, clients: Vec<ClientProfile>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            clients,
        })
    }

    async fn player(&self, video_id: &str, profile: &ClientProfile) -> Result<Video, FetchError> {
        debug!("Player request for {} as {} {}", video_id, profile.name, profile.version);

        let response = self
            .client
            .post(&self.config.player_url)
            .header(reqwest::header::USER_AGENT, profile.user_agent)
            .json(&player_request_body(video_id, profile))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let body: PlayerResponse = response.json().await.map_err(|e| {
            FetchError::ParseError(format!("Failed to parse player response: {}", e))
        })?;

        video_from_player_response(video_id, body)
    }
}

#[async_trait]
impl VideoSource for InnerTubeSource {
    fn name(&self) -> &str {
        "innertube"
    }

    async fn fetch_video(&self, reference: &VideoReference) -> Result<Video, FetchError> {
        let video_id = reference
            .id()
            .ok_or_else(|| FetchError::InvalidReference(reference.to_string()))?;

        let mut last_error = None;
        for profile in &self.clients {
            match self.player(video_id, profile).await {
                Ok(video) => return Ok(video),
                // No other profile will find a missing video
                Err(e @ FetchError::NotFound(_)) => return Err(e),
                Err(e) => {
                    warn!("Player request as {} failed: {}", profile.name, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FetchError::ParseError("no client profiles configured".to_string())
        }))
    }

    async fn open_stream(&self, format: &AudioFormatDescriptor) -> Result<ByteStream, FetchError> {
        match format.content_length {
            Some(total) => {
                let client = self.client.clone();
                let base_url = format.url.clone();
                let ranges = chunk_ranges(total, self.config.chunk_size_bytes);
                debug!("Downloading itag {} in {} chunks", format.itag, ranges.len());

                let stream = futures::stream::iter(ranges).then(move |(start, end)| {
                    let client = client.clone();
                    let url = ranged_url(&base_url, start, end);
                    async move { fetch_chunk(&client, &url).await }
                });
                Ok(stream.boxed())
            }
            None => {
                let response = self.client.get(&format.url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(FetchError::ApiError {
                        status: status.as_u16(),
                        message: format!("payload request for itag {} rejected", format.itag),
                    });
                }
                Ok(response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(FetchError::from))
                    .boxed())
            }
        }
    }
}

async fn fetch_chunk(client: &Client, url: &str) -> Result<bytes::Bytes, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::ApiError {
            status: status.as_u16(),
            message: "ranged payload request rejected".to_string(),
        });
    }
    Ok(response.bytes().await?)
}

/// Splits `total` bytes into inclusive `(start, end)` ranges of at most
/// `chunk_size` bytes.
pub fn chunk_ranges(total: u64, chunk_size: u64) -> Vec<(u64, u64)> {
    let chunk_size = chunk_size.max(1);
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < total {
        let end = start.saturating_add(chunk_size).min(total) - 1;
        ranges.push((start, end));
        start = end + 1;
    }
    ranges
}

fn ranged_url(base: &str, start: u64, end: u64) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}range={}-{}", base, separator, start, end)
}

fn player_request_body(video_id: &str, profile: &ClientProfile) -> serde_json::Value {
    let mut client = json!({
        "clientName": profile.name,
        "clientVersion": profile.version,
        "deviceMake": profile.device_make,
        "deviceModel": profile.device_model,
        "osName": profile.os_name,
        "osVersion": profile.os_version,
        "hl": "en",
        "gl": "US",
        "timeZone": "UTC",
        "utcOffsetMinutes": 0,
    });
    if let Some(sdk) = profile.android_sdk_version {
        client["androidSdkVersion"] = json!(sdk);
    }

    json!({
        "videoId": video_id,
        "context": { "client": client },
        "contentCheckOk": true,
        "racyCheckOk": true,
    })
}

// Player API response (the parts we use)

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    playability_status: Option<PlayabilityStatus>,
    streaming_data: Option<StreamingData>,
    video_details: Option<VideoDetails>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingData {
    #[serde(default)]
    formats: Vec<RawFormat>,
    #[serde(default)]
    adaptive_formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFormat {
    itag: u32,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    bitrate: u64,
    #[serde(default)]
    quality_label: Option<String>,
    #[serde(default)]
    audio_channels: Option<u8>,
    #[serde(default)]
    content_length: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoDetails {
    video_id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    length_seconds: Option<String>,
}

fn video_from_player_response(video_id: &str, response: PlayerResponse) -> Result<Video, FetchError> {
    let playability = response
        .playability_status
        .ok_or_else(|| FetchError::ParseError("missing playabilityStatus".to_string()))?;

    match playability.status.as_str() {
        "OK" => {}
        "ERROR" => {
            return Err(FetchError::NotFound(
                playability.reason.unwrap_or_else(|| video_id.to_string()),
            ))
        }
        _ => {
            return Err(FetchError::Unplayable {
                id: video_id.to_string(),
                status: playability.status,
                reason: playability.reason.unwrap_or_default(),
            })
        }
    }

    let details = response
        .video_details
        .ok_or_else(|| FetchError::ParseError("missing videoDetails".to_string()))?;
    let streaming = response
        .streaming_data
        .ok_or_else(|| FetchError::ParseError("missing streamingData".to_string()))?;

    let length_secs = details
        .length_seconds
        .as_deref()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    // Ciphered formats carry no direct url and are skipped
    let formats = streaming
        .formats
        .into_iter()
        .chain(streaming.adaptive_formats)
        .filter_map(|raw| {
            let url = raw.url?;
            Some(AudioFormatDescriptor {
                itag: raw.itag,
                bitrate: raw.bitrate,
                quality_label: raw.quality_label.unwrap_or_default(),
                mime_type: raw.mime_type,
                audio_channels: raw.audio_channels,
                content_length: raw.content_length.and_then(|s| s.parse().ok()),
                url,
            })
        })
        .collect();

    Ok(Video {
        metadata: VideoMetadata {
            title: details.title,
            author: details.author,
            duration: format_duration(length_secs),
            id: details.video_id,
        },
        formats,
    })
}
