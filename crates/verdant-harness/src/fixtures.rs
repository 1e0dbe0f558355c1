#![forbid(unsafe_code)]

//! Record builders for tests.

use verdant_core::domain::{Region, Sensor, SensorStatus, Tree, TreeCluster, WateringStatus};
use verdant_core::geometry::LatLng;

/// A tree with status `Good` at `(lat, lng)`, numbered after its id.
pub fn tree(id: i64, lat: f64, lng: f64) -> Tree {
    Tree {
        id,
        number: format!("T-{id:04}"),
        species: "Tilia cordata".to_owned(),
        latitude: lat,
        longitude: lng,
        planting_year: Some(2015),
        watering_status: WateringStatus::Good,
        tree_cluster_id: None,
        sensor_id: None,
    }
}

pub fn tree_with_status(id: i64, lat: f64, lng: f64, status: WateringStatus) -> Tree {
    Tree {
        watering_status: status,
        ..tree(id, lat, lng)
    }
}

/// A located cluster of `tree_count` trees in region "Mitte".
pub fn cluster(id: i64, lat: f64, lng: f64, tree_count: usize) -> TreeCluster {
    TreeCluster {
        id,
        name: format!("Gruppe {id}"),
        latitude: Some(lat),
        longitude: Some(lng),
        tree_ids: Some((1..=tree_count as i64).map(|t| id * 1_000 + t).collect()),
        watering_status: WateringStatus::Moderate,
        region: Some(Region {
            id: 1,
            name: "Mitte".to_owned(),
        }),
    }
}

/// A cluster that has not been placed on the map yet.
pub fn unplaced_cluster(id: i64) -> TreeCluster {
    TreeCluster {
        latitude: None,
        longitude: None,
        ..cluster(id, 0.0, 0.0, 0)
    }
}

pub fn sensor(id: &str, lat: f64, lng: f64) -> Sensor {
    Sensor {
        id: id.to_owned(),
        latitude: lat,
        longitude: lng,
        status: SensorStatus::Online,
    }
}

/// `cols * rows` trees on a regular grid starting at `origin`, ids from 1.
///
/// Rows step north, columns step east.
pub fn tree_grid(origin: LatLng, cols: usize, rows: usize, step: f64) -> Vec<Tree> {
    let mut trees = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            let id = (row * cols + col + 1) as i64;
            trees.push(tree(
                id,
                origin.lat + row as f64 * step,
                origin.lng + col as f64 * step,
            ));
        }
    }
    trees
}
