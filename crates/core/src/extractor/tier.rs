//! The tier state machine.
//!
//! ```text
//! TryPreferred --ok--> Done
//!      |  \--cancelled / sink error / output already committed--> Failed
//!      v
//! TryFallback --ok--> Done
//!      \--err--> Failed(AllTiersFailed)
//! ```
//!
//! Transitions are pure so each edge can be tested without spawning anything.

use super::error::ConversionError;

/// Where the backend is in its attempt sequence.
#[derive(Debug)]
pub enum TierState {
    TryPreferred,
    TryFallback { preferred_error: ConversionError },
    Done { bytes_written: u64 },
    Failed(ConversionError),
}

impl TierState {
    /// Next state after the preferred tier returned `result`, leaving
    /// `bytes_committed` bytes in the caller's sink.
    ///
    /// Committed output cannot be retracted and another tier would append a
    /// second stream to it, so the preferred failure becomes final. Output
    /// the caller already discarded counts as zero.
    pub fn after_preferred(result: Result<u64, ConversionError>, bytes_committed: u64) -> Self {
        match result {
            Ok(bytes_written) => Self::Done { bytes_written },
            Err(err) if err.is_terminal() || bytes_committed > 0 => Self::Failed(err),
            Err(preferred_error) => Self::TryFallback { preferred_error },
        }
    }

    /// Next state after the fallback tier returned `result`.
    pub fn after_fallback(
        preferred_error: ConversionError,
        result: Result<u64, ConversionError>,
    ) -> Self {
        match result {
            Ok(bytes_written) => Self::Done { bytes_written },
            Err(err) if err.is_terminal() => Self::Failed(err),
            Err(fallback_error) => Self::Failed(ConversionError::AllTiersFailed {
                preferred: Box::new(preferred_error),
                fallback: Box::new(fallback_error),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Failed(_))
    }
}
