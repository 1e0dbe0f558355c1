#![forbid(unsafe_code)]

//! Property tests for geographic primitives.
//!
//! Validates:
//! - Bounds built from any point set contain every point.
//! - Clamping always yields a contained point.
//! - Projection and unprojection agree within the Mercator latitude range.

use proptest::prelude::*;
use verdant_core::geometry::MAX_MERCATOR_LATITUDE;
use verdant_core::{LatLng, LatLngBounds};

fn latlng_strategy() -> impl Strategy<Value = LatLng> {
    (-89.0f64..89.0, -179.0f64..179.0).prop_map(|(lat, lng)| LatLng::new(lat, lng))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn bounds_from_points_contain_all(points in prop::collection::vec(latlng_strategy(), 1..40)) {
        let bounds = LatLngBounds::from_points(points.iter().copied()).unwrap();
        for p in &points {
            prop_assert!(bounds.contains(*p), "{p:?} outside {bounds:?}");
        }
    }

    #[test]
    fn clamp_is_contained(a in latlng_strategy(), b in latlng_strategy(), p in latlng_strategy()) {
        let bounds = LatLngBounds::new(a, b);
        prop_assert!(bounds.contains(bounds.clamp(p)));
    }

    #[test]
    fn projection_round_trips(
        lat in -(MAX_MERCATOR_LATITUDE - 1.0)..(MAX_MERCATOR_LATITUDE - 1.0),
        lng in -179.0f64..179.0,
        zoom in 0.0f64..20.0,
    ) {
        let p = LatLng::new(lat, lng);
        let back = LatLng::unproject(p.project(zoom), zoom);
        prop_assert!((back.lat - lat).abs() < 1e-7);
        prop_assert!((back.lng - lng).abs() < 1e-7);
    }
}
