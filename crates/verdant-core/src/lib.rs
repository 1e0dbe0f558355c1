#![forbid(unsafe_code)]

//! Core: geometry, located entities, and the domain records shown on the map.
//!
//! # Role in Verdant
//! `verdant-core` is the data layer. It owns the geographic primitives
//! ([`LatLng`], [`LatLngBounds`], the Web Mercator projection), the
//! [`Located`] trait every markable record implements, marker identity
//! ([`EntityKey`]), and the immutable [`Icon`] value handed to map surfaces.
//!
//! # How it fits in the system
//! `verdant-backend` defines the map surface boundary in terms of these
//! types, and `verdant-map` reconciles marker registries over them. Nothing
//! here performs I/O or holds mutable state.

pub mod domain;
pub mod entity;
pub mod geometry;
pub mod icon;

pub use domain::{PlacedCluster, Region, Sensor, SensorStatus, Tree, TreeCluster, WateringStatus};
pub use entity::{EntityKey, Located, default_key};
pub use geometry::{LatLng, LatLngBounds, Point, TILE_SIZE};
pub use icon::{Icon, IconAnchor};
