//! Tiered extraction backend.

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::ConversionError;
use super::native::NativeExtractor;
use super::sink::CountingWriter;
use super::tier::TierState;
use super::ytdlp::YtDlpExtractor;
use crate::transcoder::{ResolvedOptions, Transcoder};
use crate::video::VideoReference;

/// Tries the external downloader first and the native fetch path second.
#[derive(Clone)]
pub struct ExtractionBackend {
    preferred: YtDlpExtractor,
    fallback: NativeExtractor,
    transcoder: Transcoder,
}

impl ExtractionBackend {
    pub fn new(preferred: YtDlpExtractor, fallback: NativeExtractor, transcoder: Transcoder) -> Self {
        Self {
            preferred,
            fallback,
            transcoder,
        }
    }

    pub fn transcoder(&self) -> &Transcoder {
        &self.transcoder
    }

    pub fn fallback(&self) -> &NativeExtractor {
        &self.fallback
    }

    /// Extracts the audio of `reference` into `sink`, transcoded per
    /// `options`. Returns the number of bytes written.
    ///
    /// Bytes written to `sink` cannot be taken back, so a preferred-tier
    /// failure after output reached the sink is final. On error the sink's
    /// contents must be discarded.
    pub async fn extract<W>(
        &self,
        reference: &VideoReference,
        sink: &mut W,
        options: &ResolvedOptions,
        cancel: &CancellationToken,
    ) -> Result<u64, ConversionError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        self.run_tiers(reference, sink, options, cancel, |_| false)
            .await
    }

    /// Extracts the audio of `reference` into memory.
    ///
    /// The buffer is private to the call, so partial preferred-tier output
    /// is dropped and the fallback always gets its turn.
    pub async fn extract_buffered(
        &self,
        reference: &VideoReference,
        options: &ResolvedOptions,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, ConversionError> {
        let mut buffer = Vec::new();
        self.run_tiers(reference, &mut buffer, options, cancel, |buffer: &mut Vec<u8>| {
            buffer.clear();
            true
        })
        .await?;
        Ok(buffer)
    }

    /// Drives the tier state machine. `rewind` is called on the sink when
    /// the preferred tier failed after writing output; returning `true`
    /// means that output was discarded and is no longer committed.
    async fn run_tiers<W, R>(
        &self,
        reference: &VideoReference,
        sink: &mut W,
        options: &ResolvedOptions,
        cancel: &CancellationToken,
        rewind: R,
    ) -> Result<u64, ConversionError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
        R: FnOnce(&mut W) -> bool + Send,
    {
        options
            .validate()
            .map_err(|e| ConversionError::InvalidOptions(e.to_string()))?;

        let mut rewind = Some(rewind);
        let mut state = TierState::TryPreferred;

        loop {
            state = match state {
                TierState::TryPreferred => {
                    let mut counting = CountingWriter::new(&mut *sink);
                    let result = self
                        .preferred
                        .run(reference, &self.transcoder, options, &mut counting, cancel)
                        .await;
                    let mut committed = counting.bytes_written();

                    if committed > 0 && result.is_err() {
                        if let Some(rewind) = rewind.take() {
                            if rewind(&mut *sink) {
                                debug!(
                                    reference = %reference,
                                    discarded = committed,
                                    "Discarded partial preferred output"
                                );
                                committed = 0;
                            }
                        }
                    }

                    TierState::after_preferred(result, committed)
                }
                TierState::TryFallback { preferred_error } => {
                    warn!(
                        reference = %reference,
                        "Preferred extraction failed, falling back: {}", preferred_error
                    );
                    let result = self
                        .fallback
                        .run(reference, &self.transcoder, options, &mut *sink, cancel)
                        .await;
                    TierState::after_fallback(preferred_error, result)
                }
                TierState::Done { bytes_written } => {
                    info!(reference = %reference, bytes_written, "Extraction complete");
                    return Ok(bytes_written);
                }
                TierState::Failed(err) => return Err(err),
            };
        }
    }
}
