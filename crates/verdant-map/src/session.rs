#![forbid(unsafe_code)]

//! One mounted map: layers, camera, and clock wired together.
//!
//! [`MapSession`] is what a host embeds next to its map widget. It stamps
//! every forwarded event with the session clock, routes it to the tree or
//! cluster half, the sensor layer, and the camera controller, and exposes
//! [`MapSession::tick`] for the host's timer to flush debounced camera
//! commits.
//!
//! ```rust,ignore
//! let mut session = MapSession::new(&config, MonotonicClock::new());
//! session.layers_mut().set_trees(trees, &mut surface);
//! // widget callbacks:
//! session.handle_event(MapEvent::Move, &mut surface);
//! // host timer:
//! if let Some(view) = session.tick() {
//!     router.replace_query(&view.merge_into_query(router.query()));
//! }
//! ```

use std::rc::Rc;

use tracing::info;
use verdant_backend::{MapClock, MapEvent, MapSurface};

use crate::camera::{CameraController, ViewCommit};
use crate::clock::MonotonicClock;
use crate::config::MapConfig;
use crate::icons::IconCache;
use crate::layers::{SensorLayer, TreesAndClusters};
use crate::sync::EventOutcome;

/// Layers, camera, and clock of one mounted map.
pub struct MapSession<C = MonotonicClock> {
    clock: C,
    icons: Rc<IconCache>,
    layers: TreesAndClusters,
    sensors: SensorLayer,
    camera: CameraController,
}

impl<C: MapClock> MapSession<C> {
    /// Build a session from `config`. The config is taken as is; call
    /// [`MapConfig::validated`] first to reject bad values.
    #[must_use]
    pub fn new(config: &MapConfig, clock: C) -> Self {
        let icons = Rc::new(IconCache::new());
        let camera = config.to_camera();
        let mut layers = TreesAndClusters::new(
            Rc::clone(&icons),
            config.layers.zoom_threshold,
            camera.zoom,
        );
        layers.set_throttle(config.throttle());
        let mut sensors = SensorLayer::new(&icons);
        sensors.list_mut().share_marker_ids(layers.marker_ids());
        sensors.list_mut().set_throttle(config.throttle());
        info!(
            zoom = camera.zoom,
            threshold = config.layers.zoom_threshold,
            throttle_ms = config.sync.throttle_ms,
            debounce_ms = config.camera.debounce_ms,
            "map session created"
        );
        Self {
            clock,
            icons,
            layers,
            sensors,
            camera: CameraController::new(camera, config.debounce()),
        }
    }

    pub fn icons(&self) -> &Rc<IconCache> {
        &self.icons
    }

    pub fn layers(&self) -> &TreesAndClusters {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut TreesAndClusters {
        &mut self.layers
    }

    pub fn sensors(&self) -> &SensorLayer {
        &self.sensors
    }

    pub fn sensors_mut(&mut self) -> &mut SensorLayer {
        &mut self.sensors
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Forward a widget event.
    ///
    /// Returns what the marker layers did with it; the camera controller
    /// sees every event regardless.
    pub fn handle_event<S: MapSurface + ?Sized>(
        &mut self,
        event: MapEvent,
        surface: &mut S,
    ) -> EventOutcome {
        let now = self.clock.now_mono();
        self.camera.handle_event(event, now, &*surface);
        let outcome = self.layers.handle_event(event, now, surface);
        let sensors = self.sensors.list_mut().handle_event(event, now, surface);
        match (outcome, sensors) {
            (EventOutcome::Clicked, _) | (_, EventOutcome::Clicked) => EventOutcome::Clicked,
            (EventOutcome::Reconciled, _) | (_, EventOutcome::Reconciled) => {
                EventOutcome::Reconciled
            }
            (EventOutcome::Throttled, _) | (_, EventOutcome::Throttled) => EventOutcome::Throttled,
            _ => EventOutcome::Ignored,
        }
    }

    /// Flush a due camera commit.
    pub fn tick(&mut self) -> Option<ViewCommit> {
        let now = self.clock.now_mono();
        self.camera.poll(now)
    }

    /// Remove every marker and drop any pending commit.
    pub fn unmount<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        self.layers.clear(surface);
        self.sensors.list_mut().clear(surface);
        self.camera.shutdown();
        info!("map session unmounted");
    }
}

impl<C> std::fmt::Debug for MapSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapSession")
            .field("visible", &self.layers.visible())
            .field("zoom", &self.layers.zoom())
            .field("sensors", &self.sensors.list().len())
            .field("camera", self.camera.camera())
            .finish()
    }
}
