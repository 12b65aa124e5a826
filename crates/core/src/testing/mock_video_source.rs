//! Mock video source for testing.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::video::{
    AudioFormatDescriptor, ByteStream, FetchError, Video, VideoReference, VideoSource,
};

/// Size of the chunks the payload is delivered in.
const PAYLOAD_CHUNK_SIZE: usize = 4096;

/// How the payload stream ends once the configured bytes were delivered.
#[derive(Debug)]
enum StreamEnd {
    Complete,
    Fail(FetchError),
    Stall,
}

/// Mock implementation of the VideoSource trait.
///
/// Provides controllable behavior for testing:
/// - Serve configured videos by id
/// - Deliver a fixed payload for any format
/// - Fail the next fetch, or the payload stream after it delivered its bytes
/// - Record fetched ids and streamed itags for assertions
///
/// # Example
///
/// ```rust,ignore
/// use ytaudio_core::testing::{fixtures, MockVideoSource};
///
/// let source = MockVideoSource::new();
/// source.set_video(fixtures::video("dQw4w9WgXcQ", "Song")).await;
/// source.set_payload(b"audio".to_vec()).await;
///
/// // Hand it to an AudioService...
///
/// assert_eq!(source.recorded_fetches().await, vec!["dQw4w9WgXcQ"]);
/// ```
#[derive(Debug)]
pub struct MockVideoSource {
    /// Videos by id.
    videos: Arc<RwLock<HashMap<String, Video>>>,
    /// Bytes delivered by every stream.
    payload: Arc<RwLock<Vec<u8>>>,
    /// What happens after the payload.
    stream_end: Arc<RwLock<StreamEnd>>,
    /// If set, the next fetch will fail with this error.
    next_error: Arc<RwLock<Option<FetchError>>>,
    /// Ids passed to fetch_video.
    fetches: Arc<RwLock<Vec<String>>>,
    /// Itags passed to open_stream.
    streams: Arc<RwLock<Vec<u32>>>,
}

impl Default for MockVideoSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockVideoSource {
    /// Create a new mock source serving no videos.
    pub fn new() -> Self {
        Self {
            videos: Arc::new(RwLock::new(HashMap::new())),
            payload: Arc::new(RwLock::new(Vec::new())),
            stream_end: Arc::new(RwLock::new(StreamEnd::Complete)),
            next_error: Arc::new(RwLock::new(None)),
            fetches: Arc::new(RwLock::new(Vec::new())),
            streams: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Serve `video` for its id.
    pub async fn set_video(&self, video: Video) {
        self.videos
            .write()
            .await
            .insert(video.metadata.id.clone(), video);
    }

    /// Set the bytes every payload stream delivers.
    pub async fn set_payload(&self, payload: Vec<u8>) {
        *self.payload.write().await = payload;
    }

    /// Make payload streams fail with `error` after delivering the payload.
    pub async fn fail_stream_after_payload(&self, error: FetchError) {
        *self.stream_end.write().await = StreamEnd::Fail(error);
    }

    /// Make payload streams never finish after delivering the payload.
    pub async fn stall_stream_after_payload(&self) {
        *self.stream_end.write().await = StreamEnd::Stall;
    }

    /// Configure the next fetch to fail with the given error.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Get all ids passed to fetch_video.
    pub async fn recorded_fetches(&self) -> Vec<String> {
        self.fetches.read().await.clone()
    }

    /// Get all itags passed to open_stream.
    pub async fn recorded_streams(&self) -> Vec<u32> {
        self.streams.read().await.clone()
    }
}

#[async_trait]
impl VideoSource for MockVideoSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_video(&self, reference: &VideoReference) -> Result<Video, FetchError> {
        let id = reference.id().unwrap_or(reference.url()).to_string();
        self.fetches.write().await.push(id.clone());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        self.videos
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(FetchError::NotFound(id))
    }

    async fn open_stream(&self, format: &AudioFormatDescriptor) -> Result<ByteStream, FetchError> {
        self.streams.write().await.push(format.itag);

        let chunks: Vec<Result<Bytes, FetchError>> = self
            .payload
            .read()
            .await
            .chunks(PAYLOAD_CHUNK_SIZE)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        let body = futures::stream::iter(chunks);

        // The configured ending applies to one stream only
        let end = std::mem::replace(&mut *self.stream_end.write().await, StreamEnd::Complete);
        Ok(match end {
            StreamEnd::Complete => body.boxed(),
            StreamEnd::Fail(err) => body.chain(futures::stream::once(async move { Err(err) })).boxed(),
            StreamEnd::Stall => body.chain(futures::stream::pending()).boxed(),
        })
    }
}
