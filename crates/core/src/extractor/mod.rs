//! Extraction backend.
//!
//! Audio is extracted by one of two tiers, tried in order:
//!
//! 1. [`YtDlpExtractor`]: the external `yt-dlp` tool, its stdout piped
//!    straight into the transcoder.
//! 2. [`NativeExtractor`]: a [`VideoSource`](crate::video::VideoSource)
//!    resolves the catalog, the selected track is downloaded to a transient
//!    file, and the transcoder reads from that file.
//!
//! [`ExtractionBackend`] sequences the tiers through the [`TierState`]
//! machine. A preferred-tier failure is logged and swallowed unless it is a
//! cancellation, a sink error, or output already reached the sink.

mod backend;
mod config;
mod error;
mod native;
mod sink;
mod tier;
mod ytdlp;

pub use backend::ExtractionBackend;
pub use config::DownloaderConfig;
pub use error::{ConversionError, Tier};
pub use native::{NativeExtractor, TEMP_FILE_PREFIX};
pub use sink::CountingWriter;
pub use tier::TierState;
pub use ytdlp::YtDlpExtractor;
