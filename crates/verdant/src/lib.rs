#![forbid(unsafe_code)]

//! Verdant public facade crate.
//!
//! Re-exports the map surface boundary, the domain records, and the marker
//! layers from the internal crates, and offers a prelude for hosts that
//! embed a Verdant map.
//!
//! ```rust,ignore
//! use verdant::prelude::*;
//!
//! let config = MapConfig::default().validated()?;
//! let mut session = MapSession::new(&config, MonotonicClock::new());
//! session.layers_mut().set_trees(trees, &mut surface);
//! ```

// --- Core re-exports -------------------------------------------------------

pub use verdant_core::domain::{
    PlacedCluster, Region, Sensor, SensorStatus, Tree, TreeCluster, WateringStatus,
};
pub use verdant_core::entity::{EntityKey, Located, default_key};
pub use verdant_core::geometry::{LatLng, LatLngBounds};
pub use verdant_core::icon::{Icon, IconAnchor};

// --- Backend re-exports ----------------------------------------------------

pub use verdant_backend::{
    MapClock, MapEvent, MapSurface, MarkerId, MarkerSpec, Tooltip, TooltipDirection,
    TooltipOptions,
};

// --- Map re-exports --------------------------------------------------------

pub use verdant_map::{
    CameraController, ClusterFilter, ClusterLayer, ConfigError, EventOutcome, IconCache,
    IconSource, ManualClock, MapCamera, MapConfig, MapSession, MarkerList, MonotonicClock,
    SensorLayer, TooltipSource, TreeFilter, TreeLayer, TreesAndClusters, ViewCommit, ViewQueryError,
    ViewportSize, ViewportTracker, VisibleLayer,
};

#[cfg(feature = "tracing-subscriber")]
pub mod logging;

// --- Errors ---------------------------------------------------------------

/// Top-level error type for Verdant hosts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O failure reading configuration.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A persisted view could not be parsed from the URL.
    #[error(transparent)]
    ViewQuery(#[from] ViewQueryError),
    /// The global log subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Standard result type for Verdant APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// Restore the camera from a URL query, falling back to `config` when the
/// query carries no view.
///
/// A query that names a view but cannot be parsed is an error; a query
/// without `lat`, `lng`, and `zoom` is not.
pub fn camera_from_query(config: &MapConfig, query: &str) -> Result<MapCamera> {
    let mut camera = config.to_camera();
    match ViewCommit::from_query(query) {
        Ok(view) => camera.apply(&view),
        Err(ViewQueryError::Missing(key)) => {
            tracing::debug!(missing = key, "no persisted view; using configured camera");
        }
        Err(err) => return Err(err.into()),
    }
    Ok(camera)
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        EntityKey, Error, EventOutcome, LatLng, LatLngBounds, MapClock, MapConfig, MapEvent,
        MapSession, MapSurface, MonotonicClock, Result, Sensor, Tree, TreeCluster, ViewCommit,
        ViewportTracker,
    };

    pub use crate::{backend, core, map};
}

pub use verdant_backend as backend;
pub use verdant_core as core;
pub use verdant_map as map;
