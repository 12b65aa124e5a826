pub mod config;
pub mod extractor;
pub mod service;
pub mod testing;
pub mod tools;
pub mod transcoder;
pub mod video;
pub mod youtube;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, ServerConfig,
};
pub use extractor::{ConversionError, DownloaderConfig, Tier};
pub use service::{output_filename, AudioService, ConversionResult};
pub use transcoder::{ConversionOptions, ResolvedOptions, TranscodeError, TranscoderConfig};
pub use video::{
    normalize, sanitize_filename, select_best_audio_format, AudioFormatDescriptor, FetchError,
    VideoMetadata, VideoReference, VideoSource,
};
pub use youtube::{FetchConfig, InnerTubeSource};
