//! The conversion service used by the server and the CLI.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::extractor::{
    ConversionError, DownloaderConfig, ExtractionBackend, NativeExtractor, YtDlpExtractor,
};
use crate::tools::find_executable;
use crate::transcoder::{ConversionOptions, ResolvedOptions, Transcoder, TranscoderConfig};
use crate::video::{
    normalize, sanitize_filename, FetchError, VideoMetadata, VideoReference, VideoSource,
};
use crate::youtube::InnerTubeSource;

/// Buffered conversion output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// Sanitized title plus the output format's extension.
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Resolves videos and converts their audio.
///
/// Holds no per-conversion state; concurrent calls share nothing but the
/// HTTP client inside the video source.
#[derive(Clone)]
pub struct AudioService {
    source: Arc<dyn VideoSource>,
    backend: ExtractionBackend,
    defaults: ResolvedOptions,
}

impl AudioService {
    pub fn new(
        source: Arc<dyn VideoSource>,
        downloader: DownloaderConfig,
        transcoder: TranscoderConfig,
        temp_dir: impl Into<PathBuf>,
        defaults: ResolvedOptions,
    ) -> Self {
        let backend = ExtractionBackend::new(
            YtDlpExtractor::new(downloader),
            NativeExtractor::new(source.clone(), temp_dir),
            Transcoder::new(transcoder),
        );
        Self {
            source,
            backend,
            defaults,
        }
    }

    /// Builds the service described by `config`, with the player API as
    /// the native source.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        let source = InnerTubeSource::new(config.fetch.clone())?;
        Ok(Self::new(
            Arc::new(source),
            config.downloader.clone(),
            config.transcoder.clone(),
            config.temp_dir.clone(),
            config.conversion.clone(),
        ))
    }

    /// Options used for every unset field of a request.
    pub fn defaults(&self) -> &ResolvedOptions {
        &self.defaults
    }

    /// Merges `options` over this service's defaults.
    pub fn resolve_options(&self, options: &ConversionOptions) -> ResolvedOptions {
        options.resolve(&self.defaults)
    }

    /// Resolves metadata for `input` without downloading any media.
    pub async fn video_info(&self, input: &str) -> Result<VideoMetadata, ConversionError> {
        let reference = normalize(input);
        if !reference.is_resolved() {
            return Err(ConversionError::MetadataUnavailable {
                reference: reference.to_string(),
                reason: "no video identifier found".to_string(),
            });
        }

        let video = self
            .source
            .fetch_video(&reference)
            .await
            .map_err(|e| ConversionError::MetadataUnavailable {
                reference: reference.to_string(),
                reason: e.to_string(),
            })?;

        Ok(video.metadata)
    }

    /// Fails fast when the transcoder is not installed, before any network
    /// access or output.
    pub fn check_transcoder(&self) -> Result<PathBuf, ConversionError> {
        let path = &self.backend.transcoder().config().ffmpeg_path;
        find_executable(path).ok_or_else(|| ConversionError::TranscoderUnavailable {
            path: path.clone(),
        })
    }

    /// Streams the converted audio of `input` into `sink`. Returns the number
    /// of bytes written. On error the sink's contents must be discarded.
    ///
    /// A preferred-tier failure after output reached `sink` is not retried
    /// with the fallback; use [`AudioService::convert`] when every failure
    /// should fall back.
    pub async fn convert_to_writer<W>(
        &self,
        input: &str,
        sink: &mut W,
        options: &ConversionOptions,
        cancel: &CancellationToken,
    ) -> Result<u64, ConversionError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let reference = normalize(input);
        let resolved = self.resolve_options(options);
        log_start(&reference, &resolved);

        self.backend
            .extract(&reference, sink, &resolved, cancel)
            .await
    }

    /// Converts `input` into an in-memory buffer named after the video.
    pub async fn convert(
        &self,
        input: &str,
        options: &ConversionOptions,
        cancel: &CancellationToken,
    ) -> Result<ConversionResult, ConversionError> {
        let metadata = self.video_info(input).await?;
        let reference = normalize(input);
        let resolved = self.resolve_options(options);
        log_start(&reference, &resolved);

        let bytes = self
            .backend
            .extract_buffered(&reference, &resolved, cancel)
            .await?;

        Ok(ConversionResult {
            filename: output_filename(&metadata.title, &resolved),
            bytes,
        })
    }
}

fn log_start(reference: &VideoReference, options: &ResolvedOptions) {
    info!(
        reference = %reference,
        bitrate = %options.bitrate,
        sample_rate = options.sample_rate_hz,
        channels = options.channel_count,
        format = %options.output_format,
        "Starting conversion"
    );
}

/// Filesystem-safe output name for a video titled `title`.
pub fn output_filename(title: &str, options: &ResolvedOptions) -> String {
    format!("{}.{}", sanitize_filename(title), options.file_extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockVideoSource};

    fn service(source: Arc<MockVideoSource>) -> AudioService {
        AudioService::new(
            source,
            DownloaderConfig::default(),
            TranscoderConfig::default(),
            std::env::temp_dir(),
            ResolvedOptions::default(),
        )
    }

    #[test]
    fn test_output_filename() {
        let mp3 = ResolvedOptions::default();
        assert_eq!(output_filename("My/Video: Title?", &mp3), "My_Video_ Title_.mp3");

        let aac = ResolvedOptions {
            output_format: "adts".to_string(),
            ..Default::default()
        };
        assert_eq!(output_filename("Song", &aac), "Song.aac");
    }

    #[test]
    fn test_check_transcoder_missing() {
        let service = AudioService::new(
            Arc::new(MockVideoSource::new()),
            DownloaderConfig::default(),
            TranscoderConfig::with_path("/nonexistent/ffmpeg"),
            std::env::temp_dir(),
            ResolvedOptions::default(),
        );

        let err = service.check_transcoder().unwrap_err();
        assert!(matches!(err, ConversionError::TranscoderUnavailable { .. }));
        assert!(err.is_transcoder_unavailable());
    }

    #[tokio::test]
    async fn test_video_info() {
        let source = Arc::new(MockVideoSource::new());
        source
            .set_video(fixtures::video("dQw4w9WgXcQ", "Never Gonna Give You Up"))
            .await;

        let metadata = service(source.clone())
            .video_info("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL1&index=3")
            .await
            .unwrap();

        assert_eq!(metadata.title, "Never Gonna Give You Up");
        assert_eq!(metadata.id, "dQw4w9WgXcQ");
        assert_eq!(source.recorded_fetches().await, vec!["dQw4w9WgXcQ"]);
        // Metadata only, nothing downloaded
        assert!(source.recorded_streams().await.is_empty());
    }

    #[tokio::test]
    async fn test_video_info_invalid_reference() {
        let source = Arc::new(MockVideoSource::new());

        let err = service(source.clone())
            .video_info("https://example.com/not-a-video")
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::MetadataUnavailable { .. }));
        assert!(source.recorded_fetches().await.is_empty());
    }

    #[tokio::test]
    async fn test_video_info_source_failure() {
        let source = Arc::new(MockVideoSource::new());
        source
            .set_next_error(FetchError::Unplayable {
                id: "dQw4w9WgXcQ".to_string(),
                status: "LOGIN_REQUIRED".to_string(),
                reason: "Private video".to_string(),
            })
            .await;

        let err = service(source)
            .video_info("dQw4w9WgXcQ")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert!(err.to_string().contains("Private video"));
    }

    #[test]
    fn test_resolve_options_uses_service_defaults() {
        let defaults = ResolvedOptions {
            sample_rate_hz: 44100,
            channel_count: 2,
            bitrate: "128k".to_string(),
            output_format: "mp3".to_string(),
        };
        let service = AudioService::new(
            Arc::new(MockVideoSource::new()),
            DownloaderConfig::default(),
            TranscoderConfig::default(),
            std::env::temp_dir(),
            defaults.clone(),
        );

        let resolved = service.resolve_options(&ConversionOptions::default().with_bitrate("96k"));
        assert_eq!(resolved.bitrate, "96k");
        assert_eq!(resolved.sample_rate_hz, 44100);
        assert_eq!(service.defaults(), &defaults);
    }
}
