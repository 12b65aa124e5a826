//! FFmpeg-based transcoder and the stream coordination around it.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::TranscoderConfig;
use super::error::TranscodeError;
use super::options::ResolvedOptions;
use crate::tools::find_executable;

/// Size of the buffer used to move transcoder output into the sink.
const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Where the transcoder reads its input from.
#[derive(Debug)]
pub enum TranscodeInput {
    /// A running extractor whose stdout is piped. Its stdout becomes the
    /// transcoder's stdin; the process is waited on (or killed) together with
    /// the transcoder. Spawn it with `kill_on_drop(true)`.
    Upstream(Child),
    /// A file on disk.
    File(PathBuf),
}

/// FFmpeg-based transcoder.
#[derive(Debug, Clone)]
pub struct Transcoder {
    config: TranscoderConfig,
}

impl Transcoder {
    /// Creates a new transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    pub fn config(&self) -> &TranscoderConfig {
        &self.config
    }

    /// Resolves the ffmpeg executable, failing when it is not installed.
    pub fn locate(&self) -> Result<PathBuf, TranscodeError> {
        find_executable(&self.config.ffmpeg_path).ok_or_else(|| TranscodeError::Unavailable {
            path: self.config.ffmpeg_path.clone(),
        })
    }

    /// Builds ffmpeg arguments reading `input` and writing the encoded
    /// stream to stdout.
    pub fn build_args(&self, input: &str, options: &ResolvedOptions) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-i".to_string(),
            input.to_string(),
            // Drop any video stream
            "-vn".to_string(),
            "-ar".to_string(),
            options.sample_rate_hz.to_string(),
            "-ac".to_string(),
            options.channel_count.to_string(),
            "-b:a".to_string(),
            options.bitrate.clone(),
            "-f".to_string(),
            options.output_format.clone(),
        ];

        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // Output
        args.push("-".to_string());

        args
    }

    /// Transcodes `input` into `sink`.
    ///
    /// The transcoder and the upstream extractor (if any) run concurrently and
    /// both must exit cleanly. On cancellation, a sink error, or any other
    /// failure, every live process is killed before returning. Returns the
    /// number of bytes written to the sink.
    pub async fn pipe<W>(
        &self,
        input: TranscodeInput,
        options: &ResolvedOptions,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<u64, TranscodeError>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let (mut upstream, input_arg, stdin) = match input {
            TranscodeInput::Upstream(mut child) => {
                let stdout = child.stdout.take().ok_or_else(|| {
                    TranscodeError::Io(std::io::Error::other("extractor stdout is not piped"))
                })?;
                let stdin: Stdio = stdout.try_into()?;
                (Some(child), "pipe:0".to_string(), stdin)
            }
            TranscodeInput::File(path) => {
                (None, path.to_string_lossy().into_owned(), Stdio::null())
            }
        };

        let prepared = options.validate().and_then(|_| {
            if cancel.is_cancelled() {
                return Err(TranscodeError::Cancelled);
            }
            self.locate()
        });
        let program = match prepared {
            Ok(program) => program,
            Err(err) => {
                if let Some(child) = upstream.as_mut() {
                    reap(child, self.kill_grace()).await;
                }
                return Err(err);
            }
        };

        let args = self.build_args(&input_arg, options);
        debug!("Spawning transcoder: {} {}", program.display(), args.join(" "));

        // The command owns our copy of the pipe's read end; drop it right
        // after spawning so the extractor sees EPIPE if the transcoder dies.
        let spawned = {
            let mut command = Command::new(&program);
            command
                .args(&args)
                .stdin(stdin)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            command.spawn()
        };
        let mut transcoder = match spawned {
            Ok(child) => child,
            Err(e) => {
                if let Some(child) = upstream.as_mut() {
                    reap(child, self.kill_grace()).await;
                }
                return Err(if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::Unavailable {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                });
            }
        };

        let mut stdout = transcoder
            .stdout
            .take()
            .ok_or_else(|| TranscodeError::Io(std::io::Error::other("stdout not captured")))?;
        let transcoder_stderr = transcoder.stderr.take().map(spawn_stderr_reader);
        let upstream_stderr = upstream
            .as_mut()
            .and_then(|child| child.stderr.take())
            .map(spawn_stderr_reader);

        let work = async {
            tokio::try_join!(
                async {
                    let written = copy_to_sink(&mut stdout, sink).await?;
                    let status = transcoder.wait().await?;
                    Ok::<(u64, ExitStatus), TranscodeError>((written, status))
                },
                async {
                    match upstream.as_mut() {
                        Some(child) => Ok::<Option<ExitStatus>, TranscodeError>(Some(
                            child.wait().await?,
                        )),
                        None => Ok(None),
                    }
                },
            )
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(TranscodeError::Cancelled),
            result = work => result,
        };

        let ((written, transcoder_status), upstream_status) = match outcome {
            Ok(statuses) => statuses,
            Err(err) => {
                if matches!(err, TranscodeError::Cancelled) {
                    debug!("Transcode cancelled, terminating processes");
                } else {
                    warn!("Transcode aborted: {}", err);
                }
                reap(&mut transcoder, self.kill_grace()).await;
                if let Some(child) = upstream.as_mut() {
                    reap(child, self.kill_grace()).await;
                }
                abort_reader(transcoder_stderr);
                abort_reader(upstream_stderr);
                return Err(err);
            }
        };

        let transcoder_diagnostic = collect_reader(transcoder_stderr).await;
        let upstream_diagnostic = collect_reader(upstream_stderr).await;

        if !transcoder_status.success() {
            return Err(TranscodeError::failed(
                &transcoder_diagnostic,
                transcoder_status.code(),
            ));
        }

        if let Some(status) = upstream_status {
            if !status.success() {
                return Err(TranscodeError::extractor_failed(
                    &upstream_diagnostic,
                    status.code(),
                ));
            }
        }

        debug!("Transcoded {} bytes", written);
        Ok(written)
    }

    fn kill_grace(&self) -> Duration {
        Duration::from_secs(self.config.kill_grace_secs)
    }
}

/// Kills `child` and waits a bounded time for it to be reaped.
async fn reap(child: &mut Child, grace: Duration) {
    if let Err(e) = child.start_kill() {
        // Already exited and reaped
        debug!("start_kill: {}", e);
    }
    if timeout(grace, child.wait()).await.is_err() {
        warn!("Process did not exit within {:?} after kill", grace);
    }
}

async fn copy_to_sink<R, W>(reader: &mut R, sink: &mut W) -> Result<u64, TranscodeError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n])
            .await
            .map_err(TranscodeError::Sink)?;
        written += n as u64;
    }

    sink.flush().await.map_err(TranscodeError::Sink)?;
    Ok(written)
}

fn spawn_stderr_reader<R>(mut stream: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Err(e) = stream.read_to_end(&mut buf).await {
            debug!("Failed to read process stderr: {}", e);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

async fn collect_reader(reader: Option<JoinHandle<String>>) -> String {
    match reader {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}

fn abort_reader(reader: Option<JoinHandle<String>>) {
    if let Some(handle) = reader {
        handle.abort();
    }
}


#[cfg(all(test, unix))]
mod process_tests {
    use super::*;
    use crate::testing::fake_tools::{self, FakeTool};
    use std::time::Instant;
    use tempfile::TempDir;

    fn transcoder_at(path: PathBuf) -> Transcoder {
        let mut config = TranscoderConfig::with_path(path);
        config.kill_grace_secs = 2;
        Transcoder::new(config)
    }

    fn spawn_upstream(script: &str) -> Child {
        Command::new("sh")
            .arg("-c")
            .arg(script)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .unwrap()
    }

    #[tokio::test]
    async fn test_pipe_from_file() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = fake_tools::install(dir.path(), "ffmpeg", FakeTool::CatTranscoder);
        let input = dir.path().join("input.webm");
        std::fs::write(&input, b"fake audio payload").unwrap();

        let mut sink = Vec::new();
        let written = transcoder_at(ffmpeg)
            .pipe(
                TranscodeInput::File(input),
                &ResolvedOptions::default(),
                &mut sink,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(sink, b"fake audio payload");
        assert_eq!(written, sink.len() as u64);
    }

    #[tokio::test]
    async fn test_pipe_from_upstream_process() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = fake_tools::install(dir.path(), "ffmpeg", FakeTool::CatTranscoder);
        let upstream = spawn_upstream("printf 'streamed bytes'");

        let mut sink = Vec::new();
        transcoder_at(ffmpeg)
            .pipe(
                TranscodeInput::Upstream(upstream),
                &ResolvedOptions::default(),
                &mut sink,
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(sink, b"streamed bytes");
    }

    #[tokio::test]
    async fn test_transcoder_failure_surfaces_trimmed_stderr() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = fake_tools::install(
            dir.path(),
            "ffmpeg",
            FakeTool::Failing {
                stderr: "  pipe:0: Invalid data found when processing input  ",
                code: 1,
            },
        );
        let input = dir.path().join("input.webm");
        std::fs::write(&input, b"x").unwrap();

        let err = transcoder_at(ffmpeg)
            .pipe(
                TranscodeInput::File(input),
                &ResolvedOptions::default(),
                &mut Vec::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            TranscodeError::Failed {
                diagnostic,
                exit_code,
            } => {
                assert_eq!(diagnostic, "pipe:0: Invalid data found when processing input");
                assert_eq!(exit_code, Some(1));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_silent_failure_reports_exit_code() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = fake_tools::install(
            dir.path(),
            "ffmpeg",
            FakeTool::Failing { stderr: "", code: 3 },
        );
        let input = dir.path().join("input.webm");
        std::fs::write(&input, b"x").unwrap();

        let err = transcoder_at(ffmpeg)
            .pipe(
                TranscodeInput::File(input),
                &ResolvedOptions::default(),
                &mut Vec::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Transcoder failed: transcoder exited with code 3");
    }

    #[tokio::test]
    async fn test_extractor_failure_fails_clean_transcode() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = fake_tools::install(dir.path(), "ffmpeg", FakeTool::CatTranscoder);
        let upstream = spawn_upstream("printf partial; echo 'HTTP Error 403: Forbidden' >&2; exit 1");

        let err = transcoder_at(ffmpeg)
            .pipe(
                TranscodeInput::Upstream(upstream),
                &ResolvedOptions::default(),
                &mut Vec::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            TranscodeError::ExtractorFailed { diagnostic, .. } => {
                assert_eq!(diagnostic, "HTTP Error 403: Forbidden");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_transcoder_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("input.webm");
        std::fs::write(&input, b"x").unwrap();

        let err = transcoder_at(dir.path().join("no-such-ffmpeg"))
            .pipe(
                TranscodeInput::File(input),
                &ResolvedOptions::default(),
                &mut Vec::new(),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TranscodeError::Unavailable { .. }));
    }

    #[tokio::test]
    async fn test_cancellation_terminates_both_processes() {
        let dir = TempDir::new().unwrap();
        let pid_file = dir.path().join("ffmpeg.pid");
        let ffmpeg = fake_tools::install_hanging_with_pid_file(dir.path(), "ffmpeg", &pid_file);
        let upstream = spawn_upstream("exec sleep 30");
        let upstream_pid = upstream.id().unwrap();

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = transcoder_at(ffmpeg)
            .pipe(
                TranscodeInput::Upstream(upstream),
                &ResolvedOptions::default(),
                &mut Vec::new(),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TranscodeError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));

        let transcoder_pid = fake_tools::read_pid(&pid_file).unwrap();
        assert!(!fake_tools::process_alive(upstream_pid));
        assert!(!fake_tools::process_alive(transcoder_pid));
    }

    #[tokio::test]
    async fn test_already_cancelled_does_not_spawn() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = fake_tools::install(dir.path(), "ffmpeg", FakeTool::CatTranscoder);
        let input = dir.path().join("input.webm");
        std::fs::write(&input, b"x").unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut sink = Vec::new();
        let err = transcoder_at(ffmpeg)
            .pipe(
                TranscodeInput::File(input),
                &ResolvedOptions::default(),
                &mut sink,
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TranscodeError::Cancelled));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_sink_error_is_propagated() {
        let dir = TempDir::new().unwrap();
        let ffmpeg = fake_tools::install(dir.path(), "ffmpeg", FakeTool::CatTranscoder);
        let input = dir.path().join("input.webm");
        std::fs::write(&input, b"payload the sink will refuse").unwrap();

        let mut sink = tokio_test::io::Builder::new()
            .write_error(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "client went away",
            ))
            .build();

        let err = transcoder_at(ffmpeg)
            .pipe(
                TranscodeInput::File(input),
                &ResolvedOptions::default(),
                &mut sink,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        match err {
            TranscodeError::Sink(io) => assert_eq!(io.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
