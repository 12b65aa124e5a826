use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ytaudio_core::{
    load_config, load_config_from_env, output_filename, validate_config, AudioService, Config,
    ConversionOptions,
};

const CLI_AFTER_HELP: &str = "Examples:\n  ytaudio https://youtube.com/watch?v=...\n  ytaudio -o mysong.mp3 https://youtube.com/watch?v=...\n  ytaudio -b 128k -c 2 https://youtube.com/watch?v=...\n  ytaudio -i https://youtube.com/watch?v=...";

#[derive(Debug, Parser)]
#[command(
    name = "ytaudio",
    version,
    about = "Download a YouTube video's audio as a compressed audio file",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Video URL or bare video identifier.
    url: String,

    /// Output filename (default: sanitized video title).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Audio bitrate, e.g. 64k, 128k, 192k [default: 64k].
    #[arg(short, long)]
    bitrate: Option<String>,

    /// Sample rate in Hz, e.g. 22050, 44100 [default: 22050].
    #[arg(short = 'r', long)]
    sample_rate: Option<u32>,

    /// Audio channels: 1 for mono, 2 for stereo [default: 1].
    #[arg(short, long)]
    channels: Option<u8>,

    /// Output format token passed to ffmpeg [default: mp3].
    #[arg(short, long)]
    format: Option<String>,

    /// Show video info only, don't download.
    #[arg(short, long)]
    info: bool,

    /// Config file; defaults and YTAUDIO_* environment variables otherwise.
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    /// Flags given on the command line; the rest come from the config.
    fn conversion_options(&self) -> ConversionOptions {
        ConversionOptions {
            sample_rate_hz: self.sample_rate,
            channel_count: self.channels,
            bitrate: self.bitrate.clone(),
            output_format: self.format.clone(),
        }
    }

    fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("Failed to load config from {:?}", path))?,
            None => load_config_from_env().context("Failed to load config from environment")?,
        };
        validate_config(&config).context("Configuration validation failed")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // Logs go to stderr so stdout stays readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = cli.load_config()?;
    let service = AudioService::from_config(&config).context("Failed to create audio service")?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted, cancelling...");
            trigger.cancel();
        }
    });

    let metadata = service
        .video_info(&cli.url)
        .await
        .context("Error getting video info")?;

    println!("Title:    {}", metadata.title);
    println!("Author:   {}", metadata.author);
    println!("Duration: {}", metadata.duration);

    if cli.info {
        return Ok(());
    }

    let options = cli.conversion_options();
    let resolved = service.resolve_options(&options);
    resolved
        .validate()
        .context("Invalid conversion options")?;

    let path = cli
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(output_filename(&metadata.title, &resolved)));
    let mut file = create_output(&path).await?;

    println!("Output:   {}", path.display());
    println!(
        "Bitrate:  {}, Sample Rate: {} Hz, Channels: {}",
        resolved.bitrate, resolved.sample_rate_hz, resolved.channel_count
    );
    println!("Downloading...");

    let converted = service
        .convert_to_writer(&cli.url, &mut file, &options, &cancel)
        .await;
    let finished = match converted {
        Ok(_) => file.flush().await.context("Error writing output"),
        Err(e) => Err(anyhow::Error::new(e).context("Error downloading")),
    };

    if let Err(e) = finished {
        drop(file);
        if let Err(remove_err) = tokio::fs::remove_file(&path).await {
            tracing::warn!(path = %path.display(), error = %remove_err, "Failed to remove partial output");
        }
        return Err(e);
    }

    println!("Done!");
    Ok(())
}

/// Creates `path`, refusing to replace an existing file.
async fn create_output(path: &Path) -> Result<tokio::fs::File> {
    match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            bail!("file '{}' already exists", path.display())
        }
        Err(e) => {
            Err(e).with_context(|| format!("Error creating file '{}'", path.display()))
        }
    }
}
