//! Transcoder module for turning raw audio streams into the requested format.
//!
//! The [`Transcoder`] drives an external ffmpeg process. Its input is either a
//! file on disk or the stdout of an already running extractor, in which case
//! both processes are supervised together: bytes flow from the extractor
//! straight into ffmpeg, the encoded output is copied into the caller's sink,
//! and every process is killed when the conversion is cancelled or fails.
//!
//! # Example
//!
//! ```ignore
//! use ytaudio_core::transcoder::{ResolvedOptions, TranscodeInput, Transcoder};
//! use tokio_util::sync::CancellationToken;
//!
//! let transcoder = Transcoder::with_defaults();
//! let mut out = tokio::fs::File::create("out.mp3").await?;
//! let written = transcoder
//!     .pipe(
//!         TranscodeInput::File("input.webm".into()),
//!         &ResolvedOptions::default(),
//!         &mut out,
//!         &CancellationToken::new(),
//!     )
//!     .await?;
//! ```

mod config;
mod error;
mod ffmpeg;
mod options;

pub use config::TranscoderConfig;
pub use error::TranscodeError;
pub use ffmpeg::{TranscodeInput, Transcoder};
pub use options::{ConversionOptions, ResolvedOptions};
