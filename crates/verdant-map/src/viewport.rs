#![forbid(unsafe_code)]

//! Viewport tracking: pan/zoom state and the visible bounds derived from it.
//!
//! # Design
//!
//! [`ViewportTracker`] keeps the center, zoom, and pixel size of the map
//! container and derives the visible [`LatLngBounds`] through the Web
//! Mercator projection, the way tile-based map widgets compute them. Every
//! state change bumps a version counter so hosts can cheaply tell whether
//! bounds need to be re-read.
//!
//! Zoom is clamped to `[min_zoom, max_zoom]`. When max bounds are set the
//! center is clamped into them; the visible area may still extend past the
//! edge at low zoom.

use verdant_core::geometry::{LatLng, LatLngBounds, Point};

/// Pixel dimensions of the map container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl ViewportSize {
    #[inline]
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Pan/zoom state of one map.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportTracker {
    center: LatLng,
    zoom: f64,
    size: ViewportSize,
    min_zoom: f64,
    max_zoom: f64,
    max_bounds: Option<LatLngBounds>,
    version: u64,
}

impl ViewportTracker {
    /// Create a tracker with unrestricted zoom (0..=22) and no max bounds.
    #[must_use]
    pub fn new(center: LatLng, zoom: f64, size: ViewportSize) -> Self {
        Self {
            center,
            zoom,
            size,
            min_zoom: 0.0,
            max_zoom: 22.0,
            max_bounds: None,
            version: 0,
        }
    }

    /// Restrict zoom to `[min, max]` and clamp the current zoom.
    #[must_use]
    pub fn with_zoom_limits(mut self, min: f64, max: f64) -> Self {
        self.min_zoom = min.min(max);
        self.max_zoom = max.max(min);
        self.zoom = self.clamp_zoom(self.zoom);
        self
    }

    /// Keep the center inside `bounds`.
    #[must_use]
    pub fn with_max_bounds(mut self, bounds: LatLngBounds) -> Self {
        self.max_bounds = Some(bounds);
        self.center = bounds.clamp(self.center);
        self
    }

    pub fn center(&self) -> LatLng {
        self.center
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    pub fn max_bounds(&self) -> Option<LatLngBounds> {
        self.max_bounds
    }

    /// Incremented on every change to center, zoom, or size.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The visible rectangle.
    ///
    /// An empty container yields degenerate bounds at the center.
    pub fn bounds(&self) -> LatLngBounds {
        if self.size.is_empty() {
            return LatLngBounds::new(self.center, self.center);
        }
        let c = self.center.project(self.zoom);
        let half_w = self.size.width / 2.0;
        let half_h = self.size.height / 2.0;
        let south_west = LatLng::unproject(Point::new(c.x - half_w, c.y + half_h), self.zoom);
        let north_east = LatLng::unproject(Point::new(c.x + half_w, c.y - half_h), self.zoom);
        LatLngBounds::new(south_west, north_east)
    }

    /// Move the center. Returns whether anything changed.
    pub fn pan_to(&mut self, center: LatLng) -> bool {
        let center = match self.max_bounds {
            Some(bounds) => bounds.clamp(center),
            None => center,
        };
        if center == self.center {
            return false;
        }
        self.center = center;
        self.version += 1;
        true
    }

    /// Move the center by a pixel offset at the current zoom.
    ///
    /// Positive `dx` pans east, positive `dy` pans south.
    pub fn pan_by(&mut self, dx: f64, dy: f64) -> bool {
        let projected = self.center.project(self.zoom).offset(dx, dy);
        self.pan_to(LatLng::unproject(projected, self.zoom))
    }

    /// Change zoom, clamped to the configured limits.
    pub fn zoom_to(&mut self, zoom: f64) -> bool {
        let zoom = self.clamp_zoom(zoom);
        if zoom == self.zoom {
            return false;
        }
        self.zoom = zoom;
        self.version += 1;
        true
    }

    /// Set center and zoom together.
    pub fn set_view(&mut self, center: LatLng, zoom: f64) -> bool {
        let moved = self.pan_to(center);
        let zoomed = self.zoom_to(zoom);
        moved || zoomed
    }

    /// Change the container size.
    pub fn resize(&mut self, size: ViewportSize) -> bool {
        if size == self.size {
            return false;
        }
        self.size = size;
        self.version += 1;
        true
    }

    fn clamp_zoom(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}
