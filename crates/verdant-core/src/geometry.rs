#![forbid(unsafe_code)]

//! Geographic primitives.
//!
//! Coordinates are WGS84 degrees. Bounds are axis-aligned in latitude and
//! longitude and never wrap the antimeridian; a municipal map never needs it.
//!
//! Pixel coordinates use the Web Mercator projection with [`TILE_SIZE`]
//! pixel tiles, origin at the top-left of the world at the given zoom.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Edge length of one map tile in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Latitude limit of the Web Mercator projection.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_6;

/// A geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude in degrees, positive north.
    pub lat: f64,
    /// Longitude in degrees, positive east.
    pub lng: f64,
}

impl LatLng {
    /// Create a new position.
    #[inline]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Whether both components are finite and inside the WGS84 ranges.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Project onto the pixel plane at `zoom`.
    pub fn project(&self, zoom: f64) -> Point {
        let scale = world_size(zoom);
        let lat = self
            .lat
            .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
            .to_radians();
        let x = scale * (self.lng + 180.0) / 360.0;
        let y = scale * (0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI));
        Point::new(x, y)
    }

    /// Inverse of [`LatLng::project`].
    pub fn unproject(point: Point, zoom: f64) -> Self {
        let scale = world_size(zoom);
        let lng = point.x / scale * 360.0 - 180.0;
        let n = PI - 2.0 * PI * point.y / scale;
        let lat = n.sinh().atan().to_degrees();
        Self::new(lat, lng)
    }
}

impl From<(f64, f64)> for LatLng {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self::new(lat, lng)
    }
}

/// A point on the projected pixel plane.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Width of the whole world in pixels at `zoom`.
#[inline]
pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

/// A latitude/longitude rectangle.
///
/// # Invariants
///
/// `south_west.lat <= north_east.lat` and `south_west.lng <= north_east.lng`.
/// Constructors normalize their corners, so any two points produce a valid
/// rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    south_west: LatLng,
    north_east: LatLng,
}

impl LatLngBounds {
    /// Create bounds spanning two arbitrary corners.
    pub fn new(a: LatLng, b: LatLng) -> Self {
        Self {
            south_west: LatLng::new(a.lat.min(b.lat), a.lng.min(b.lng)),
            north_east: LatLng::new(a.lat.max(b.lat), a.lng.max(b.lng)),
        }
    }

    /// Create bounds from a `[south, west, north, east]` bounding box.
    pub fn from_bbox(bbox: [f64; 4]) -> Self {
        let [south, west, north, east] = bbox;
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    /// Smallest bounds containing every point, or `None` for an empty input.
    pub fn from_points(points: impl IntoIterator<Item = LatLng>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first, first);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    #[inline]
    pub const fn south_west(&self) -> LatLng {
        self.south_west
    }

    #[inline]
    pub const fn north_east(&self) -> LatLng {
        self.north_east
    }

    #[inline]
    pub const fn south(&self) -> f64 {
        self.south_west.lat
    }

    #[inline]
    pub const fn west(&self) -> f64 {
        self.south_west.lng
    }

    #[inline]
    pub const fn north(&self) -> f64 {
        self.north_east.lat
    }

    #[inline]
    pub const fn east(&self) -> f64 {
        self.north_east.lng
    }

    /// The `[south, west, north, east]` bounding box.
    pub const fn to_bbox(&self) -> [f64; 4] {
        [self.south(), self.west(), self.north(), self.east()]
    }

    /// Geometric center.
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south() + self.north()) / 2.0,
            (self.west() + self.east()) / 2.0,
        )
    }

    /// Check if a position is inside the bounds. Edges are inclusive.
    #[inline]
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat >= self.south()
            && point.lat <= self.north()
            && point.lng >= self.west()
            && point.lng <= self.east()
    }

    /// Check if `other` lies entirely inside these bounds.
    pub fn contains_bounds(&self, other: &LatLngBounds) -> bool {
        self.contains(other.south_west) && self.contains(other.north_east)
    }

    /// Check if the two rectangles share at least one point.
    pub fn intersects(&self, other: &LatLngBounds) -> bool {
        other.north() >= self.south()
            && other.south() <= self.north()
            && other.east() >= self.west()
            && other.west() <= self.east()
    }

    /// Grow the bounds to include `point`.
    pub fn extend(&mut self, point: LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    /// Grow each side by `ratio` of the current span.
    pub fn pad(&self, ratio: f64) -> Self {
        let dlat = (self.north() - self.south()) * ratio;
        let dlng = (self.east() - self.west()) * ratio;
        Self::new(
            LatLng::new(self.south() - dlat, self.west() - dlng),
            LatLng::new(self.north() + dlat, self.east() + dlng),
        )
    }

    /// Move `point` to the nearest position inside the bounds.
    pub fn clamp(&self, point: LatLng) -> LatLng {
        LatLng::new(
            point.lat.clamp(self.south(), self.north()),
            point.lng.clamp(self.west(), self.east()),
        )
    }
}
