#![forbid(unsafe_code)]

//! Map camera state and its debounced persistence.
//!
//! The host persists the camera into the page's query string so a reload or
//! a shared link restores the same view. Writing it on every drag or zoom
//! step would flood navigation history, so [`CameraController`] feeds each
//! `DragEnd`/`ZoomEnd` into a trailing-edge [`Debouncer`] and only commits
//! once the map has been still for the quiet period.

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace};
use url::form_urlencoded;
use verdant_backend::{MapEvent, MapSurface};
use verdant_core::geometry::{LatLng, LatLngBounds};

use crate::viewport::{ViewportSize, ViewportTracker};

/// Initial map center (Flensburg).
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: 54.792_277_136_221_905,
    lng: 9.435_806_074_532_68,
};
pub const DEFAULT_ZOOM: f64 = 13.0;
pub const DEFAULT_MIN_ZOOM: f64 = 13.0;
pub const DEFAULT_MAX_ZOOM: f64 = 18.0;
/// Quiet period before a camera change is committed.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Persisted camera state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapCamera {
    pub center: LatLng,
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub max_bounds: Option<LatLngBounds>,
}

impl Default for MapCamera {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: DEFAULT_ZOOM,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            max_bounds: None,
        }
    }
}

impl MapCamera {
    /// Restrict panning to a `[south, west, north, east]` box.
    #[must_use]
    pub fn with_max_bounds(mut self, bbox: [f64; 4]) -> Self {
        self.max_bounds = Some(LatLngBounds::from_bbox(bbox));
        self
    }

    /// Take over a committed view. Zoom is clamped to the camera's limits.
    pub fn apply(&mut self, commit: &ViewCommit) {
        self.center = LatLng::new(commit.lat, commit.lng);
        self.zoom = commit.zoom.clamp(self.min_zoom, self.max_zoom);
    }

    /// Current view as a commit.
    pub fn commit(&self) -> ViewCommit {
        ViewCommit {
            lat: self.center.lat,
            lng: self.center.lng,
            zoom: self.zoom,
        }
    }

    /// A viewport tracker starting at this camera for a container of `size`.
    pub fn viewport(&self, size: ViewportSize) -> ViewportTracker {
        let tracker = ViewportTracker::new(self.center, self.zoom, size)
            .with_zoom_limits(self.min_zoom, self.max_zoom);
        match self.max_bounds {
            Some(bounds) => tracker.with_max_bounds(bounds),
            None => tracker,
        }
    }
}

/// Trailing-edge debouncer over an external clock.
///
/// `schedule` replaces the pending value and restarts the quiet period;
/// `poll` hands the value out once the period has elapsed with no newer
/// schedule.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(Duration, T)>,
}

impl<T> Debouncer<T> {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Deadlines past `Duration::MAX` saturate there.
    pub fn schedule(&mut self, value: T, now: Duration) {
        if self.pending.is_some() {
            trace!("debounce restarted");
        }
        self.pending = Some((now.saturating_add(self.delay), value));
    }

    /// Take the pending value if its deadline has passed.
    pub fn poll(&mut self, now: Duration) -> Option<T> {
        match &self.pending {
            Some((deadline, _)) if now >= *deadline => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    /// When the pending value becomes due.
    pub fn deadline(&self) -> Option<Duration> {
        self.pending.as_ref().map(|(deadline, _)| *deadline)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending value, returning it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(_, v)| v)
    }
}

impl<T> Default for Debouncer<T> {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

/// Errors parsing a view from a query string.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewQueryError {
    #[error("missing query parameter `{0}`")]
    Missing(&'static str),
    #[error("query parameter `{key}` is not a number: {value:?}")]
    Invalid { key: &'static str, value: String },
    #[error("query parameter `{key}` out of range: {value}")]
    OutOfRange { key: &'static str, value: f64 },
}

/// A view to persist: where the map is looking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCommit {
    pub lat: f64,
    pub lng: f64,
    pub zoom: f64,
}

const VIEW_KEYS: [&str; 3] = ["lat", "lng", "zoom"];

impl ViewCommit {
    /// `lat=..&lng=..&zoom=..`
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        self.append_to(&mut query);
        query.finish()
    }

    /// Write this view into an existing query string, keeping unrelated
    /// parameters in their original order.
    ///
    /// The result is re-encoded as `application/x-www-form-urlencoded`, so a
    /// bare `flag` comes back as `flag=`.
    pub fn merge_into_query(&self, query: &str) -> String {
        let mut merged = form_urlencoded::Serializer::new(String::new());
        for (key, value) in parse_pairs(query) {
            if !VIEW_KEYS.contains(&&*key) {
                merged.append_pair(&key, &value);
            }
        }
        self.append_to(&mut merged);
        merged.finish()
    }

    /// Parse `lat`, `lng`, and `zoom` out of a query string.
    ///
    /// Keys and values are percent-decoded and `+` reads as a space. Unrelated
    /// parameters are ignored, a leading `?` is accepted, and the last
    /// occurrence of a repeated key wins.
    pub fn from_query(query: &str) -> Result<Self, ViewQueryError> {
        let mut values: [Option<Cow<'_, str>>; 3] = [None, None, None];
        for (key, value) in parse_pairs(query) {
            if let Some(slot) = VIEW_KEYS.iter().position(|k| *k == key) {
                values[slot] = Some(value);
            }
        }
        let number = |slot: usize| -> Result<f64, ViewQueryError> {
            let key = VIEW_KEYS[slot];
            let raw = values[slot].as_deref().ok_or(ViewQueryError::Missing(key))?;
            let value: f64 = raw.parse().map_err(|_| ViewQueryError::Invalid {
                key,
                value: raw.to_owned(),
            })?;
            if value.is_finite() {
                Ok(value)
            } else {
                Err(ViewQueryError::OutOfRange { key, value })
            }
        };
        let lat = number(0)?;
        let lng = number(1)?;
        let zoom = number(2)?;
        if !(-90.0..=90.0).contains(&lat) {
            return Err(ViewQueryError::OutOfRange { key: "lat", value: lat });
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(ViewQueryError::OutOfRange { key: "lng", value: lng });
        }
        if zoom < 0.0 {
            return Err(ViewQueryError::OutOfRange { key: "zoom", value: zoom });
        }
        Ok(Self { lat, lng, zoom })
    }

    fn append_to(&self, query: &mut form_urlencoded::Serializer<'_, String>) {
        query
            .append_pair("lat", &self.lat.to_string())
            .append_pair("lng", &self.lng.to_string())
            .append_pair("zoom", &self.zoom.to_string());
    }
}

fn parse_pairs(query: &str) -> form_urlencoded::Parse<'_> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
}

impl fmt::Display for ViewCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lat={}&lng={}&zoom={}", self.lat, self.lng, self.zoom)
    }
}

/// Watches drag/zoom ends and commits the settled view.
#[derive(Debug, Clone)]
pub struct CameraController {
    camera: MapCamera,
    debouncer: Debouncer<ViewCommit>,
    commits: u64,
}

impl CameraController {
    #[must_use]
    pub fn new(camera: MapCamera, debounce: Duration) -> Self {
        Self {
            camera,
            debouncer: Debouncer::new(debounce),
            commits: 0,
        }
    }

    pub fn camera(&self) -> &MapCamera {
        &self.camera
    }

    /// Schedule a commit for `DragEnd`/`ZoomEnd`.
    ///
    /// Returns whether a commit was scheduled. Other events, and events from
    /// a surface that cannot report its view, are ignored.
    pub fn handle_event<S: MapSurface + ?Sized>(
        &mut self,
        event: MapEvent,
        now: Duration,
        surface: &S,
    ) -> bool {
        if !matches!(event, MapEvent::DragEnd | MapEvent::ZoomEnd) {
            return false;
        }
        let (Some(center), Some(zoom)) = (surface.center(), surface.zoom()) else {
            return false;
        };
        self.debouncer.schedule(
            ViewCommit {
                lat: center.lat,
                lng: center.lng,
                zoom,
            },
            now,
        );
        true
    }

    /// Commit the pending view if the quiet period is over.
    ///
    /// The camera takes the view over and the commit is returned for the host
    /// to persist.
    pub fn poll(&mut self, now: Duration) -> Option<ViewCommit> {
        let commit = self.debouncer.poll(now)?;
        self.camera.apply(&commit);
        self.commits += 1;
        debug!(lat = commit.lat, lng = commit.lng, zoom = commit.zoom, "camera committed");
        Some(commit)
    }

    pub fn pending_deadline(&self) -> Option<Duration> {
        self.debouncer.deadline()
    }

    /// Number of commits so far.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Drop any pending commit (unmount).
    pub fn shutdown(&mut self) {
        if self.debouncer.cancel().is_some() {
            trace!("pending camera commit dropped");
        }
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(MapCamera::default(), DEFAULT_DEBOUNCE)
    }
}
