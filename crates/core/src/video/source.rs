//! The seam between the pipeline and a native video fetch backend.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;

use super::error::FetchError;
use super::reference::VideoReference;
use super::types::{AudioFormatDescriptor, Video};

/// Payload bytes of one format, delivered as they arrive.
pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// A backend able to resolve videos and download their encodings without
/// any external tool.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Returns the name of this source (for logging).
    fn name(&self) -> &str;

    /// Fetches metadata and the encodings catalog of a video.
    async fn fetch_video(&self, reference: &VideoReference) -> Result<Video, FetchError>;

    /// Opens a streaming download of one format's payload.
    async fn open_stream(&self, format: &AudioFormatDescriptor) -> Result<ByteStream, FetchError>;
}
