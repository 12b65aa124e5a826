//! Preferred tier: yt-dlp piped straight into the transcoder.

use std::process::Stdio;

use tokio::io::AsyncWrite;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::config::DownloaderConfig;
use super::error::{ConversionError, Tier};
use crate::tools::find_executable;
use crate::transcoder::{ResolvedOptions, TranscodeInput, Transcoder};
use crate::video::VideoReference;

/// Runs the external downloader and streams its output through the
/// transcoder without touching the disk.
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    config: DownloaderConfig,
}

impl YtDlpExtractor {
    pub fn new(config: DownloaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Builds yt-dlp arguments that write the best audio-only stream of
    /// `url` to stdout.
    pub fn build_args(&self, url: &str) -> Vec<String> {
        let mut args = vec![
            "--no-warnings".to_string(),
            "--quiet".to_string(),
            "--no-playlist".to_string(),
            "-f".to_string(),
            self.config.format_selector.clone(),
        ];

        args.extend(self.config.extra_args.iter().cloned());

        args.extend([
            "-o".to_string(),
            "-".to_string(),
            // Unnormalized input is passed through as-is; never let it parse as a flag
            "--".to_string(),
            url.to_string(),
        ]);

        args
    }

    /// Extracts `reference` into `sink`. Returns the number of bytes written.
    ///
    /// The transcoder is located before the downloader, so a missing ffmpeg
    /// is reported as such even when yt-dlp is absent too.
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
            .map_err(|e| ConversionError::from_transcode(Tier::Preferred, e))?;

        let program = find_executable(&self.config.ytdlp_path).ok_or_else(|| {
            ConversionError::extraction(
                Tier::Preferred,
                format!("{} not found on PATH", self.config.ytdlp_path.display()),
            )
        })?;

        if cancel.is_cancelled() {
            return Err(ConversionError::Cancelled);
        }

        let args = self.build_args(reference.url());
        debug!("Spawning extractor: {} {}", program.display(), args.join(" "));

        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ConversionError::extraction(Tier::Preferred, e))?;

        info!(reference = %reference, "Extracting with {}", program.display());

        transcoder
            .pipe(TranscodeInput::Upstream(child), options, sink, cancel)
            .await
            .map_err(|e| ConversionError::from_transcode(Tier::Preferred, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::normalize;

    #[test]
    fn test_build_args() {
        let extractor = YtDlpExtractor::new(DownloaderConfig::default());
        let reference = normalize("dQw4w9WgXcQ");

        assert_eq!(
            extractor.build_args(reference.url()),
            vec![
                "--no-warnings",
                "--quiet",
                "--no-playlist",
                "-f",
                "bestaudio[ext=m4a]/bestaudio",
                "-o",
                "-",
                "--",
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            ]
        );
    }

    #[test]
    fn test_build_args_keeps_flag_like_input_positional() {
        let mut config = DownloaderConfig::default();
        config.extra_args = vec!["--force-ipv4".to_string()];
        let extractor = YtDlpExtractor::new(config);

        let args = extractor.build_args("--exec=rm");
        let separator = args.iter().position(|a| a == "--").unwrap();
        assert_eq!(args[separator + 1], "--exec=rm");
        assert!(args.iter().position(|a| a == "--force-ipv4").unwrap() < separator);
    }
}
