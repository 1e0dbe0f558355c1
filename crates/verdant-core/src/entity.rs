#![forbid(unsafe_code)]

//! Located entities and marker identity.
//!
//! Anything that can be pinned on the map implements [`Located`]. Markers
//! are keyed by [`EntityKey`]: either the record's own identifier or, when
//! the caller supplies no key function, [`default_key`], which derives a
//! composite key from the coordinates.

use std::fmt;

use crate::geometry::LatLng;

/// A record exposing a latitude/longitude pair.
pub trait Located {
    /// Latitude in degrees.
    fn latitude(&self) -> f64;

    /// Longitude in degrees.
    fn longitude(&self) -> f64;

    /// Both coordinates as a [`LatLng`].
    fn position(&self) -> LatLng {
        LatLng::new(self.latitude(), self.longitude())
    }
}

impl Located for LatLng {
    fn latitude(&self) -> f64 {
        self.lat
    }

    fn longitude(&self) -> f64 {
        self.lng
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn latitude(&self) -> f64 {
        (**self).latitude()
    }

    fn longitude(&self) -> f64 {
        (**self).longitude()
    }
}

/// Identity of a marker within one marker list.
///
/// Numeric database ids and textual ids (sensor serials, composite
/// coordinate keys) share one key space per list, but never compare equal
/// to each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    /// Numeric identifier.
    Id(i64),
    /// Textual identifier.
    Text(String),
}

impl From<i64> for EntityKey {
    fn from(id: i64) -> Self {
        Self::Id(id)
    }
}

impl From<i32> for EntityKey {
    fn from(id: i32) -> Self {
        Self::Id(i64::from(id))
    }
}

impl From<String> for EntityKey {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for EntityKey {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// Composite key `"{latitude}-{longitude}"`.
///
/// Two records at the same coordinates collapse onto one marker.
pub fn default_key<T: Located + ?Sized>(item: &T) -> EntityKey {
    EntityKey::Text(format!("{}-{}", item.latitude(), item.longitude()))
}
