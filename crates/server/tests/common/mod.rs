//! Common test utilities for in-process API testing.
//!
//! The fixture builds the real router around an [`AudioService`] whose
//! external tools are fake shell scripts and whose native source is a
//! [`MockVideoSource`], so no network or real ffmpeg is needed.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use ytaudio_core::{
    testing::{
        fake_tools::{self, FakeTool},
        MockVideoSource,
    },
    AudioService, Config, DownloaderConfig, ResolvedOptions, TranscoderConfig,
};
use ytaudio_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use ytaudio_core::testing::fixtures;

pub const VIDEO_ID: &str = "dQw4w9WgXcQ";

/// Tool setup for a fixture. `None` leaves the tool uninstalled.
pub struct TestConfig {
    pub ytdlp: Option<FakeTool>,
    pub ffmpeg: Option<FakeTool>,
}

impl Default for TestConfig {
    /// Downloader missing, so every conversion goes through the mock source.
    fn default() -> Self {
        Self {
            ytdlp: None,
            ffmpeg: Some(FakeTool::CatTranscoder),
        }
    }
}

pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock native source - configure videos and payloads
    pub source: Arc<MockVideoSource>,
    /// Holds the fake tools
    pub tools_dir: TempDir,
    /// Transient download directory
    pub scratch_dir: TempDir,
}

/// Response with a JSON body
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

/// Response with a raw body
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `Err` when the body stream was aborted.
    pub body: Result<Vec<u8>, String>,
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    pub async fn with_config(test_config: TestConfig) -> Self {
        let tools_dir = TempDir::new().expect("Failed to create tools dir");
        let scratch_dir = TempDir::new().expect("Failed to create scratch dir");

        let ytdlp_path = match test_config.ytdlp {
            Some(tool) => fake_tools::install(tools_dir.path(), "yt-dlp", tool),
            None => tools_dir.path().join("yt-dlp"),
        };
        let ffmpeg_path = match test_config.ffmpeg {
            Some(tool) => fake_tools::install(tools_dir.path(), "ffmpeg", tool),
            None => tools_dir.path().join("ffmpeg"),
        };

        let source = Arc::new(MockVideoSource::new());
        source
            .set_video(fixtures::video(VIDEO_ID, "Never Gonna Give You Up"))
            .await;
        source.set_payload(b"native payload".to_vec()).await;

        let mut config = Config::default();
        config.server.host = std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
        config.downloader = DownloaderConfig::with_path(ytdlp_path);
        config.transcoder = TranscoderConfig::with_path(ffmpeg_path);
        config.transcoder.kill_grace_secs = 2;
        config.temp_dir = scratch_dir.path().to_path_buf();

        let service = AudioService::new(
            source.clone(),
            config.downloader.clone(),
            config.transcoder.clone(),
            config.temp_dir.clone(),
            ResolvedOptions::default(),
        );

        let state = Arc::new(AppState::new(config, service));
        let router = create_router(state);

        Self {
            router,
            source,
            tools_dir,
            scratch_dir,
        }
    }

    /// Send a GET request and parse the JSON body.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let raw = self.send(request).await;
        let body = match raw.body {
            Ok(bytes) if !bytes.is_empty() => {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            }
            _ => Value::Null,
        };

        TestResponse {
            status: raw.status,
            body,
        }
    }

    /// Send a GET request and keep the raw body.
    pub async fn get_raw(&self, path: &str) -> RawResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// POST url-encoded form fields.
    pub async fn post_form(&self, path: &str, fields: &[(&str, &str)]) -> RawResponse {
        let body = fields
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> RawResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .into_body()
            .collect()
            .await
            .map(|collected| collected.to_bytes().to_vec())
            .map_err(|e| e.to_string());

        RawResponse {
            status,
            headers,
            body,
        }
    }

    pub fn scratch_is_empty(&self) -> bool {
        std::fs::read_dir(self.scratch_dir.path())
            .unwrap()
            .next()
            .is_none()
    }
}

impl RawResponse {
    pub fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn json(&self) -> Value {
        self.body
            .as_ref()
            .ok()
            .and_then(|bytes| serde_json::from_slice(bytes).ok())
            .unwrap_or(Value::Null)
    }
}
