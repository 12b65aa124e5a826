//! Native fetch backend for YouTube.
//!
//! [`InnerTubeSource`] talks to the player API directly over HTTP and needs
//! no external tool. It serves metadata queries and the fallback extraction
//! tier.

mod config;
mod innertube;

pub use config::{FetchConfig, DEFAULT_PLAYER_URL};
pub use innertube::{
    chunk_ranges, ClientProfile, InnerTubeSource, ANDROID_CLIENT, DEFAULT_CLIENTS, IOS_CLIENT,
};
