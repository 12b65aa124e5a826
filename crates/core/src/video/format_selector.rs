//! Audio format selection.
//!
//! The extracted audio is always re-encoded at a fixed target bitrate, so the
//! cheapest adaptive track to download is the best one to pick.

use super::error::FetchError;
use super::types::AudioFormatDescriptor;

/// Picks exactly one encoding to extract from `catalog`.
///
/// Audio-only entries are preferred; entries merely carrying audio channels
/// are considered only when no audio-only entry exists. Among unlabeled
/// (adaptive) entries the lowest bitrate wins, ties going to the first seen.
/// Without any unlabeled entry the first candidate in catalog order is used.
pub fn select_best_audio_format(
    catalog: &[AudioFormatDescriptor],
) -> Result<&AudioFormatDescriptor, FetchError> {
    let mut candidates: Vec<&AudioFormatDescriptor> =
        catalog.iter().filter(|f| f.is_audio_only()).collect();
    if candidates.is_empty() {
        candidates = catalog.iter().filter(|f| f.has_audio_channels()).collect();
    }

    let first = *candidates.first().ok_or(FetchError::NoAudioFormat)?;

    let mut best: Option<&AudioFormatDescriptor> = None;
    for format in candidates.iter().copied().filter(|f| !f.is_labeled()) {
        match best {
            Some(current) if format.bitrate >= current.bitrate => {}
            _ => best = Some(format),
        }
    }

    Ok(best.unwrap_or(first))
}
