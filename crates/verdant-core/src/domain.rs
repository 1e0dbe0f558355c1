#![forbid(unsafe_code)]

//! Domain records rendered as map markers.
//!
//! Field names follow the backend JSON (`camelCase`). Unknown status strings
//! decode to the `Unknown` variant rather than failing the whole payload.

use serde::{Deserialize, Serialize};

use crate::entity::Located;
use crate::geometry::LatLng;

/// Watering state of a tree or a tree cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum WateringStatus {
    #[serde(rename = "good")]
    Good,
    #[serde(rename = "moderate")]
    Moderate,
    #[serde(rename = "bad")]
    Bad,
    #[serde(rename = "just watered")]
    JustWatered,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl WateringStatus {
    /// All variants in display order.
    pub const ALL: [Self; 5] = [
        Self::Good,
        Self::Moderate,
        Self::Bad,
        Self::JustWatered,
        Self::Unknown,
    ];

    /// Marker fill colour.
    pub const fn color(self) -> &'static str {
        match self {
            Self::Good => "#4C7741",
            Self::Moderate => "#E9A23B",
            Self::Bad => "#C43F3F",
            Self::JustWatered => "#3D8EDB",
            Self::Unknown => "#A5A5A5",
        }
    }

    /// Wire value as used by the backend and in filter query parameters.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Moderate => "moderate",
            Self::Bad => "bad",
            Self::JustWatered => "just watered",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a wire value. Anything unrecognised is `Unknown`.
    pub fn parse(value: &str) -> Self {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .unwrap_or(Self::Unknown)
    }
}

impl From<String> for WateringStatus {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

/// Connection state of a sensor kit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum SensorStatus {
    #[serde(rename = "online")]
    Online,
    #[serde(rename = "offline")]
    Offline,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl From<String> for SensorStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "online" => Self::Online,
            "offline" => Self::Offline,
            _ => Self::Unknown,
        }
    }
}

/// A single tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tree {
    pub id: i64,
    /// Human-facing tree number; used as the marker tooltip.
    pub number: String,
    #[serde(default)]
    pub species: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub planting_year: Option<i32>,
    #[serde(default)]
    pub watering_status: WateringStatus,
    #[serde(default)]
    pub tree_cluster_id: Option<i64>,
    #[serde(default)]
    pub sensor_id: Option<String>,
}

impl Located for Tree {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Administrative region a cluster belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: i64,
    pub name: String,
}

/// An irrigation group of trees as returned by the cluster list endpoint.
///
/// Location and tree membership are optional: a freshly created cluster has
/// neither until trees are assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeCluster {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub tree_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub watering_status: WateringStatus,
    #[serde(default)]
    pub region: Option<Region>,
}

impl TreeCluster {
    /// Convert into a markable cluster.
    ///
    /// Returns `None` when latitude, longitude, or tree membership is missing.
    pub fn placed(self) -> Option<PlacedCluster> {
        let (Some(lat), Some(lng)) = (self.latitude, self.longitude) else {
            return None;
        };
        let tree_count = self.tree_ids.as_ref()?.len();
        Some(PlacedCluster {
            position: LatLng::new(lat, lng),
            tree_count,
            cluster: self,
        })
    }

    /// Region name, if assigned.
    pub fn region_name(&self) -> Option<&str> {
        self.region.as_ref().map(|r| r.name.as_str())
    }
}

/// A [`TreeCluster`] known to have a location and a tree list.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedCluster {
    pub cluster: TreeCluster,
    pub position: LatLng,
    pub tree_count: usize,
}

impl Located for PlacedCluster {
    fn latitude(&self) -> f64 {
        self.position.lat
    }

    fn longitude(&self) -> f64 {
        self.position.lng
    }
}

/// A sensor kit mounted near a tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sensor {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub status: SensorStatus,
}

impl Located for Sensor {
    fn latitude(&self) -> f64 {
        self.latitude
    }

    fn longitude(&self) -> f64 {
        self.longitude
    }
}
