//! Fallback tier: native fetch into a transient file, then transcode.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tempfile::NamedTempFile;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::error::{ConversionError, Tier};
use crate::transcoder::{ResolvedOptions, TranscodeInput, Transcoder};
use crate::video::{select_best_audio_format, AudioFormatDescriptor, VideoReference, VideoSource};

/// Prefix of transient download files.
pub const TEMP_FILE_PREFIX: &str = "ytaudio-";

/// Resolves the video through a [`VideoSource`], materializes the selected
/// audio track on disk, and transcodes from there.
///
/// The remote service frequently rejects long-lived streaming reads, so the
/// payload is fully downloaded before ffmpeg sees it.
#[derive(Clone)]
pub struct NativeExtractor {
    source: Arc<dyn VideoSource>,
    temp_dir: PathBuf,
}

impl NativeExtractor {
    pub fn new(source: Arc<dyn VideoSource>, temp_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            temp_dir: temp_dir.into(),
        }
    }

    pub fn source(&self) -> &Arc<dyn VideoSource> {
        &self.source
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Extracts `reference` into `sink`. Returns the number of bytes written.
    pub async fn run<W>(
        &self,
        reference: &VideoReference,
        transcoder: &Transcoder,
        options: &ResolvedOptions,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<u64, ConversionError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        transcoder
            .locate()
            .map_err(|e| ConversionError::from_transcode(Tier::Fallback, e))?;

        if !reference.is_resolved() {
            return Err(ConversionError::MetadataUnavailable {
                reference: reference.to_string(),
                reason: "no video identifier found".to_string(),
            });
        }

        let video = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConversionError::Cancelled),
            result = self.source.fetch_video(reference) => result
                .map_err(|e| ConversionError::metadata_unavailable(reference, e))?,
        };

        let format = select_best_audio_format(&video.formats)
            .map_err(|_| ConversionError::NoAudioFormat)?;
        info!(
            reference = %reference,
            source = self.source.name(),
            itag = format.itag,
            bitrate = format.bitrate,
            "Extracting '{}' natively",
            video.metadata.title
        );

        // Removed when dropped, on every path out of this function
        let temp_file = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .suffix(".tmp")
            .tempfile_in(&self.temp_dir)
            .map_err(|e| ConversionError::extraction(Tier::Fallback, e))?;

        let downloaded = self.download(format, &temp_file, cancel).await?;
        debug!(
            "Downloaded {} bytes to {}",
            downloaded,
            temp_file.path().display()
        );

        transcoder
            .pipe(
                TranscodeInput::File(temp_file.path().to_path_buf()),
                options,
                sink,
                cancel,
            )
            .await
            .map_err(|e| ConversionError::from_transcode(Tier::Fallback, e))
    }

    async fn download(
        &self,
        format: &AudioFormatDescriptor,
        temp_file: &NamedTempFile,
        cancel: &CancellationToken,
    ) -> Result<u64, ConversionError> {
        let mut stream = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConversionError::Cancelled),
            result = self.source.open_stream(format) => result
                .map_err(|e| ConversionError::extraction(Tier::Fallback, e))?,
        };

        let handle = temp_file
            .as_file()
            .try_clone()
            .map_err(|e| ConversionError::extraction(Tier::Fallback, e))?;
        let mut file = tokio::fs::File::from_std(handle);
        let mut total = 0u64;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(ConversionError::Cancelled),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    file.write_all(&chunk)
                        .await
                        .map_err(|e| ConversionError::extraction(Tier::Fallback, e))?;
                    total += chunk.len() as u64;
                }
                Some(Err(e)) => return Err(ConversionError::extraction(Tier::Fallback, e)),
                None => break,
            }
        }

        file.flush()
            .await
            .map_err(|e| ConversionError::extraction(Tier::Fallback, e))?;

        Ok(total)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockVideoSource};
    use crate::transcoder::TranscoderConfig;
    use crate::video::{normalize, FetchError};
    use tempfile::TempDir;

    fn leftover_temp_files(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(TEMP_FILE_PREFIX))
            .count()
    }

    #[tokio::test]
    async fn test_unresolved_reference_is_metadata_unavailable() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(MockVideoSource::new());
        let extractor = NativeExtractor::new(source.clone(), temp.path());
        // The transcoder lookup happens first; any executable will do
        let transcoder = Transcoder::new(TranscoderConfig::with_path("sh"));

        let err = extractor
            .run(
                &normalize("not a video"),
                &transcoder,
                &ResolvedOptions::default(),
                &mut Vec::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::MetadataUnavailable { .. }));
        assert!(source.recorded_fetches().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_transcoder_skips_network() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(MockVideoSource::new());
        let extractor = NativeExtractor::new(source.clone(), temp.path());
        let transcoder =
            Transcoder::new(TranscoderConfig::with_path(temp.path().join("no-ffmpeg")));

        let err = extractor
            .run(
                &normalize("dQw4w9WgXcQ"),
                &transcoder,
                &ResolvedOptions::default(),
                &mut Vec::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(err.is_transcoder_unavailable());
        assert!(source.recorded_fetches().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_catalog_is_no_audio_format() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(MockVideoSource::new());
        let mut video = fixtures::video("dQw4w9WgXcQ", "Song");
        video.formats.clear();
        source.set_video(video).await;
        let extractor = NativeExtractor::new(source, temp.path());
        let transcoder = Transcoder::new(TranscoderConfig::with_path("sh"));

        let err = extractor
            .run(
                &normalize("dQw4w9WgXcQ"),
                &transcoder,
                &ResolvedOptions::default(),
                &mut Vec::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ConversionError::NoAudioFormat));
        assert_eq!(leftover_temp_files(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_download_failure_removes_temp_file() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(MockVideoSource::new());
        source.set_video(fixtures::video("dQw4w9WgXcQ", "Song")).await;
        source.set_payload(b"first chunk".to_vec()).await;
        source
            .fail_stream_after_payload(FetchError::ApiError {
                status: 403,
                message: "Forbidden".to_string(),
            })
            .await;
        let extractor = NativeExtractor::new(source, temp.path());
        let transcoder = Transcoder::new(TranscoderConfig::with_path("sh"));

        let err = extractor
            .run(
                &normalize("dQw4w9WgXcQ"),
                &transcoder,
                &ResolvedOptions::default(),
                &mut Vec::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ConversionError::Extraction {
                tier: Tier::Fallback,
                ..
            }
        ));
        assert!(err.to_string().contains("403"));
        assert_eq!(leftover_temp_files(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_fetch() {
        let temp = TempDir::new().unwrap();
        let source = Arc::new(MockVideoSource::new());
        source.set_video(fixtures::video("dQw4w9WgXcQ", "Song")).await;
        let extractor = NativeExtractor::new(source, temp.path());
        let transcoder = Transcoder::new(TranscoderConfig::with_path("sh"));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = extractor
            .run(
                &normalize("dQw4w9WgXcQ"),
                &transcoder,
                &ResolvedOptions::default(),
                &mut Vec::new(),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(leftover_temp_files(temp.path()), 0);
    }
}
