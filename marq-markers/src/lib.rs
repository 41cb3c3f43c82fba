//! Motion-capture marker tracks and per-frame spring attachments.
//!
//! Two halves:
//!
//! - [`MarkerTrack`] is the immutable time series of marker observations,
//!   loaded from CSV (or any [`MarkerData`] producer), unit-normalized and
//!   validated against the world timestep at construction.
//! - [`AttachmentManager`] owns one kinematic proxy body per marker channel
//!   and runs the per-frame spring lifecycle: [`detach`], [`reposition`],
//!   [`attach`], plus the [`rms_distance`] settling metric.
//!
//! [`detach`]: AttachmentManager::detach
//! [`reposition`]: AttachmentManager::reposition
//! [`attach`]: AttachmentManager::attach
//! [`rms_distance`]: AttachmentManager::rms_distance

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]

mod attachment;
mod error;
mod track;

pub use attachment::{AttachmentManager, DEFAULT_CFM, DEFAULT_ERP, PROXY_RADIUS};
pub use error::{LoadError, Result};
pub use track::{load_csv, load_markers, LinearUnit, MarkerData, MarkerSample, MarkerTrack};
