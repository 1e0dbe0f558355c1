#![forbid(unsafe_code)]

//! Verdant Map
//!
//! Keeps the pins on a map surface in step with a data set and the visible
//! viewport.
//!
//! # Key Components
//!
//! - [`MarkerList`] - Sync engine: reconciles a [`MarkerRegistry`] against data and bounds
//! - [`ThrottleGate`] - Leading-edge rate limit for pan reconciliation
//! - [`ViewportTracker`] - Center/zoom/size state and the bounds derived from it
//! - [`IconCache`] - Memoized tree, cluster, and route icons
//! - [`TreesAndClusters`] - Zoom-dependent switch between the tree and cluster layers
//! - [`CameraController`] - Debounced persistence of the camera after drag/zoom
//! - [`MapConfig`] - Tunables as data
//! - [`MapSession`] - Layers, camera, and clock of one mounted map
//!
//! # How it fits in the system
//! Hosts implement [`verdant_backend::MapSurface`] for their map widget, feed
//! records from `verdant-core` into layers, and forward
//! [`verdant_backend::MapEvent`]s with a timestamp from a
//! [`verdant_backend::MapClock`]. Everything runs synchronously on the
//! caller's thread.

pub mod camera;
pub mod clock;
pub mod config;
pub mod icons;
pub mod layers;
pub mod registry;
pub mod session;
pub mod source;
pub mod sync;
pub mod throttle;
pub mod viewport;

pub use camera::{CameraController, Debouncer, MapCamera, ViewCommit, ViewQueryError};
pub use clock::{ManualClock, MonotonicClock};
pub use config::{ConfigError, MapConfig};
pub use icons::IconCache;
pub use layers::{
    ClusterFilter, ClusterLayer, DEFAULT_ZOOM_THRESHOLD, SensorLayer, TreeFilter, TreeLayer,
    TreesAndClusters, VisibleLayer,
};
pub use registry::{MarkerEntry, MarkerHandle, MarkerIds, MarkerRegistry};
pub use session::MapSession;
pub use source::{ClickHandler, IconSource, TooltipContent, TooltipSource};
pub use sync::{EventOutcome, MarkerList, SyncStats};
pub use throttle::{DEFAULT_THROTTLE, ThrottleGate, ThrottleStats};
pub use viewport::{ViewportSize, ViewportTracker};
