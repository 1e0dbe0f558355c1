#![forbid(unsafe_code)]

//! A [`MapSurface`] that records every call.
//!
//! [`RecordingSurface`] stands in for a real map widget. It reports whatever
//! bounds, zoom, and center the test sets, tracks which markers are attached,
//! and keeps an ordered log of [`SurfaceCall`]s. Misuse that a real widget
//! would choke on (attaching a marker twice, detaching one that is not on
//! the map) is recorded as a violation instead of panicking, so a test can
//! report every problem at once through [`RecordingSurface::assert_clean`].
//!
//! The log can be rendered as JSONL and reduced to a `blake3:` checksum for
//! golden comparisons.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::json;
use verdant_backend::{MapSurface, MarkerId, MarkerSpec};
use verdant_core::geometry::{LatLng, LatLngBounds};
use verdant_core::icon::Icon;

/// Checksum prefix used in golden logs.
const CHECKSUM_PREFIX: &str = "blake3:";

/// One call made against the surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCall {
    Attach {
        id: MarkerId,
        position: LatLng,
        icon: String,
        tooltip: Option<String>,
    },
    Detach {
        id: MarkerId,
    },
    SetIcon {
        id: MarkerId,
        icon: String,
    },
    SetPosition {
        id: MarkerId,
        position: LatLng,
    },
}

impl SurfaceCall {
    pub fn id(&self) -> MarkerId {
        match self {
            Self::Attach { id, .. }
            | Self::Detach { id }
            | Self::SetIcon { id, .. }
            | Self::SetPosition { id, .. } => *id,
        }
    }

    /// Short name of the call kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Attach { .. } => "attach",
            Self::Detach { .. } => "detach",
            Self::SetIcon { .. } => "set_icon",
            Self::SetPosition { .. } => "set_position",
        }
    }

    /// Stable JSON form for logs.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Attach {
                id,
                position,
                icon,
                tooltip,
            } => json!({
                "call": "attach",
                "id": id.get(),
                "lat": position.lat,
                "lng": position.lng,
                "icon": icon,
                "tooltip": tooltip,
            }),
            Self::Detach { id } => json!({ "call": "detach", "id": id.get() }),
            Self::SetIcon { id, icon } => json!({ "call": "set_icon", "id": id.get(), "icon": icon }),
            Self::SetPosition { id, position } => json!({
                "call": "set_position",
                "id": id.get(),
                "lat": position.lat,
                "lng": position.lng,
            }),
        }
    }
}

/// What the surface knows about one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerState {
    pub position: LatLng,
    pub icon: String,
    pub tooltip: Option<String>,
    pub attached: bool,
}

/// Recording stand-in for a map widget.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    bounds: Option<LatLngBounds>,
    zoom: Option<f64>,
    center: Option<LatLng>,
    markers: BTreeMap<MarkerId, MarkerState>,
    calls: Vec<SurfaceCall>,
    violations: Vec<String>,
}

impl RecordingSurface {
    /// An unmounted surface: no bounds, zoom, or center.
    #[must_use]
    pub fn unmounted() -> Self {
        Self::default()
    }

    /// A mounted surface showing `bounds` at `zoom`.
    #[must_use]
    pub fn showing(bounds: LatLngBounds, zoom: f64) -> Self {
        let mut surface = Self::default();
        surface.set_view(bounds.center(), zoom, bounds);
        surface
    }

    /// A mounted surface showing a `[south, west, north, east]` box.
    #[must_use]
    pub fn showing_bbox(bbox: [f64; 4], zoom: f64) -> Self {
        Self::showing(LatLngBounds::from_bbox(bbox), zoom)
    }

    /// Move the view. Does not notify anyone; tests follow up with an event.
    pub fn set_view(&mut self, center: LatLng, zoom: f64, bounds: LatLngBounds) {
        self.center = Some(center);
        self.zoom = Some(zoom);
        self.bounds = Some(bounds);
    }

    pub fn set_bounds(&mut self, bounds: LatLngBounds) {
        self.bounds = Some(bounds);
        self.center = Some(bounds.center());
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = Some(zoom);
    }

    /// Simulate the widget being torn down.
    pub fn unmount(&mut self) {
        self.bounds = None;
        self.zoom = None;
        self.center = None;
    }

    pub fn calls(&self) -> &[SurfaceCall] {
        &self.calls
    }

    /// Take the call log, leaving it empty.
    pub fn take_calls(&mut self) -> Vec<SurfaceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of logged calls of `kind` (`"attach"`, `"detach"`, ...).
    pub fn count(&self, kind: &str) -> usize {
        self.calls.iter().filter(|c| c.kind() == kind).count()
    }

    pub fn marker(&self, id: MarkerId) -> Option<&MarkerState> {
        self.markers.get(&id)
    }

    pub fn is_attached(&self, id: MarkerId) -> bool {
        self.markers.get(&id).is_some_and(|m| m.attached)
    }

    /// Ids of attached markers in ascending order.
    pub fn attached(&self) -> Vec<MarkerId> {
        self.markers
            .iter()
            .filter(|(_, m)| m.attached)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn attached_len(&self) -> usize {
        self.markers.values().filter(|m| m.attached).count()
    }

    /// Icon keys of attached markers, in marker id order.
    pub fn attached_icons(&self) -> Vec<&str> {
        self.markers
            .values()
            .filter(|m| m.attached)
            .map(|m| m.icon.as_str())
            .collect()
    }

    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// Panic listing every recorded violation, if any.
    #[track_caller]
    pub fn assert_clean(&self) {
        assert!(
            self.violations.is_empty(),
            "surface misuse:\n  {}",
            self.violations.join("\n  ")
        );
    }

    /// The call log as JSONL.
    pub fn jsonl(&self) -> String {
        let mut out = String::new();
        for call in &self.calls {
            let _ = writeln!(out, "{}", call.to_json());
        }
        out
    }

    /// `blake3:` checksum of the JSONL call log.
    pub fn checksum(&self) -> String {
        let hash = blake3::hash(self.jsonl().as_bytes());
        format!("{CHECKSUM_PREFIX}{}", hash.to_hex())
    }

    fn violation(&mut self, message: String) {
        tracing::warn!(%message, "surface misuse");
        self.violations.push(message);
    }
}

impl MapSurface for RecordingSurface {
    fn bounds(&self) -> Option<LatLngBounds> {
        self.bounds
    }

    fn zoom(&self) -> Option<f64> {
        self.zoom
    }

    fn center(&self) -> Option<LatLng> {
        self.center
    }

    fn attach_marker(&mut self, marker: &MarkerSpec<'_>) {
        let tooltip = marker.tooltip.map(|t| t.content.clone());
        self.calls.push(SurfaceCall::Attach {
            id: marker.id,
            position: marker.position,
            icon: marker.icon.key().to_owned(),
            tooltip: tooltip.clone(),
        });
        if self.is_attached(marker.id) {
            self.violation(format!("{} attached twice", marker.id));
            return;
        }
        self.markers.insert(
            marker.id,
            MarkerState {
                position: marker.position,
                icon: marker.icon.key().to_owned(),
                tooltip,
                attached: true,
            },
        );
    }

    fn detach_marker(&mut self, id: MarkerId) {
        self.calls.push(SurfaceCall::Detach { id });
        match self.markers.get_mut(&id) {
            Some(state) if state.attached => state.attached = false,
            _ => self.violation(format!("{id} detached while not attached")),
        }
    }

    fn set_marker_icon(&mut self, id: MarkerId, icon: &Icon) {
        self.calls.push(SurfaceCall::SetIcon {
            id,
            icon: icon.key().to_owned(),
        });
        if let Some(state) = self.markers.get_mut(&id) {
            state.icon = icon.key().to_owned();
        }
    }

    fn set_marker_position(&mut self, id: MarkerId, position: LatLng) {
        self.calls.push(SurfaceCall::SetPosition { id, position });
        if let Some(state) = self.markers.get_mut(&id) {
            state.position = position;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use verdant_backend::Tooltip;
    use verdant_core::icon::IconAnchor;

    fn spec<'a>(id: u64, icon: &'a Icon, tooltip: Option<&'a Tooltip>) -> MarkerSpec<'a> {
        MarkerSpec {
            id: MarkerId::new(id),
            position: LatLng::new(1.0, 2.0),
            icon,
            tooltip,
        }
    }

    #[test]
    fn tracks_attached_set() {
        let icon = Icon::new("pin", "", IconAnchor::default());
        let mut surface = RecordingSurface::showing_bbox([0.0, 0.0, 5.0, 5.0], 13.0);
        surface.attach_marker(&spec(1, &icon, None));
        surface.attach_marker(&spec(2, &icon, None));
        surface.detach_marker(MarkerId::new(1));

        assert_eq!(surface.attached(), vec![MarkerId::new(2)]);
        assert_eq!(surface.count("attach"), 2);
        assert_eq!(surface.count("detach"), 1);
        surface.assert_clean();
    }

    #[test]
    fn misuse_is_recorded() {
        let icon = Icon::new("pin", "", IconAnchor::default());
        let mut surface = RecordingSurface::unmounted();
        surface.attach_marker(&spec(1, &icon, None));
        surface.attach_marker(&spec(1, &icon, None));
        surface.detach_marker(MarkerId::new(9));
        assert_eq!(
            surface.violations(),
            &[
                "marker#1 attached twice".to_owned(),
                "marker#9 detached while not attached".to_owned(),
            ]
        );
    }

    #[test]
    fn updates_follow_the_marker() {
        let pin = Icon::new("pin", "", IconAnchor::default());
        let gold = Icon::new("gold", "", IconAnchor::default());
        let tooltip = Tooltip {
            content: "A-1".into(),
            options: Default::default(),
        };
        let mut surface = RecordingSurface::unmounted();
        surface.attach_marker(&spec(3, &pin, Some(&tooltip)));
        surface.set_marker_icon(MarkerId::new(3), &gold);
        surface.set_marker_position(MarkerId::new(3), LatLng::new(4.0, 4.0));

        let state = surface.marker(MarkerId::new(3)).unwrap();
        assert_eq!(state.icon, "gold");
        assert_eq!(state.position, LatLng::new(4.0, 4.0));
        assert_eq!(state.tooltip.as_deref(), Some("A-1"));
    }

    #[test]
    fn jsonl_and_checksum_are_stable() {
        let icon = Icon::new("pin", "", IconAnchor::default());
        let mut a = RecordingSurface::unmounted();
        let mut b = RecordingSurface::unmounted();
        for s in [&mut a, &mut b] {
            s.attach_marker(&spec(1, &icon, None));
            s.detach_marker(MarkerId::new(1));
        }
        let lines: Vec<_> = a.jsonl().lines().map(str::to_owned).collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first["call"], "attach");
        assert_eq!(first["icon"], "pin");
        assert!(a.checksum().starts_with("blake3:"));
        assert_eq!(a.checksum(), b.checksum());
    }

    #[test]
    fn unmount_clears_view() {
        let mut surface = RecordingSurface::showing_bbox([0.0, 0.0, 1.0, 1.0], 14.0);
        assert_eq!(surface.zoom(), Some(14.0));
        surface.unmount();
        assert!(surface.bounds().is_none());
        assert!(surface.center().is_none());
    }
}
