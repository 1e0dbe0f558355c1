#![forbid(unsafe_code)]

//! Test harness for Verdant map layers.
//!
//! - [`RecordingSurface`] - a [`verdant_backend::MapSurface`] that records
//!   calls, tracks the attached set, and flags misuse
//! - [`fixtures`] - builders for trees, clusters, and sensors

pub mod fixtures;
pub mod recording;

pub use recording::{MarkerState, RecordingSurface, SurfaceCall};
