//! Marker data loading errors.
//!
//! Structural problems with a marker source abort the load call with a
//! [`LoadError`]. Per-line problems in attachment configuration are not
//! errors at all: they are logged and skipped.

use thiserror::Error;

/// Errors raised while loading marker data.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The source is not a marker format this crate can read.
    #[error("unrecognized marker format: {source_name}")]
    UnrecognizedFormat {
        /// The offending file name or description.
        source_name: String,
    },

    /// The marker data's frame rate does not match the world timestep.
    #[error("marker frame rate {source_hz} Hz does not match world rate {world_hz} Hz")]
    FrameRateMismatch {
        /// The source data's frame rate.
        source_hz: f64,
        /// The rate implied by the world timestep.
        world_hz: f64,
    },

    /// A data row could not be parsed.
    #[error("malformed marker data at line {line}: {reason}")]
    MalformedRow {
        /// One-based source line number.
        line: usize,
        /// What went wrong.
        reason: String,
    },

    /// An underlying I/O failure.
    #[error("marker I/O error")]
    Io(#[from] std::io::Error),
}

impl LoadError {
    /// Unrecognized source format.
    #[must_use]
    pub fn unrecognized_format(source_name: impl Into<String>) -> Self {
        Self::UnrecognizedFormat {
            source_name: source_name.into(),
        }
    }

    /// Frame-rate mismatch.
    #[must_use]
    pub const fn frame_rate_mismatch(source_hz: f64, world_hz: f64) -> Self {
        Self::FrameRateMismatch { source_hz, world_hz }
    }

    /// Unparseable row.
    #[must_use]
    pub fn malformed_row(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRow {
            line,
            reason: reason.into(),
        }
    }
}

/// Result alias for marker loading.
pub type Result<T> = core::result::Result<T, LoadError>;
