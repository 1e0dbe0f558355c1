#![forbid(unsafe_code)]
#![doc = "Map surface traits for Verdant: platform abstraction for markers, viewport, and time."]
#![doc = ""]
#![doc = "This crate defines the boundary between marker synchronization in"]
#![doc = "`verdant-map` and a concrete map widget (a Leaflet binding, a canvas"]
#![doc = "renderer, or the recording surface in `verdant-harness`)."]

use core::fmt;
use core::time::Duration;

use verdant_core::geometry::{LatLng, LatLngBounds};
use verdant_core::icon::Icon;

/// Surface-side identity of one marker handle.
///
/// Allocated by the marker registry; unique for the lifetime of the registry
/// and never reused after the handle is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(u64);

impl MarkerId {
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker#{}", self.0)
    }
}

/// Where a tooltip opens relative to its marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TooltipDirection {
    #[default]
    Auto,
    Top,
    Bottom,
    Left,
    Right,
    Center,
}

/// Presentation options for a marker tooltip.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TooltipOptions {
    pub direction: TooltipDirection,
    /// Pixel offset from the anchor.
    pub offset: (i32, i32),
    /// CSS class applied to the tooltip container.
    pub class_name: Option<String>,
}

impl TooltipOptions {
    /// Options used by every entity layer: above the pin, shifted past the icon.
    pub fn above_marker() -> Self {
        Self {
            direction: TooltipDirection::Top,
            offset: (5, -40),
            class_name: Some("font-nunito-sans font-semibold".to_owned()),
        }
    }
}

/// A tooltip bound to a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tooltip {
    pub content: String,
    pub options: TooltipOptions,
}

/// Everything a surface needs to show one marker.
#[derive(Debug, Clone, Copy)]
pub struct MarkerSpec<'a> {
    pub id: MarkerId,
    pub position: LatLng,
    pub icon: &'a Icon,
    pub tooltip: Option<&'a Tooltip>,
}

/// Viewport and interaction events forwarded by the host map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MapEvent {
    /// Fired continuously while the viewport pans or zooms.
    Move,
    /// Fired once when a pan or zoom gesture settles.
    MoveEnd,
    /// A drag gesture finished.
    DragEnd,
    /// A zoom change finished.
    ZoomEnd,
    /// The user clicked a marker.
    MarkerClick(MarkerId),
}

/// Monotonic clock abstraction.
///
/// Native hosts use `std::time::Instant`; WASM hosts use `performance.now()`.
/// Rate limiting never calls `Instant::now()` directly; all time flows
/// through this trait or through explicit `now` arguments.
pub trait MapClock {
    /// Elapsed time since an unspecified epoch, monotonically increasing.
    fn now_mono(&self) -> Duration;
}

/// The host map widget as seen by marker synchronization.
///
/// Implementations translate these calls into layer operations of the
/// underlying mapping library. The caller tracks which markers are attached;
/// a surface never sees `detach_marker` for a marker it does not show, nor
/// `attach_marker` twice without a detach in between.
pub trait MapSurface {
    /// Current visible bounds, or `None` while the map is not mounted.
    fn bounds(&self) -> Option<LatLngBounds>;

    /// Current zoom level, or `None` while the map is not mounted.
    fn zoom(&self) -> Option<f64>;

    /// Current center, or `None` while the map is not mounted.
    fn center(&self) -> Option<LatLng>;

    /// Show a marker.
    fn attach_marker(&mut self, marker: &MarkerSpec<'_>);

    /// Hide a previously attached marker.
    fn detach_marker(&mut self, id: MarkerId);

    /// Replace the icon of a marker, attached or not.
    fn set_marker_icon(&mut self, id: MarkerId, icon: &Icon);

    /// Move a marker, attached or not.
    fn set_marker_position(&mut self, id: MarkerId, position: LatLng);
}

impl<S: MapSurface + ?Sized> MapSurface for &mut S {
    fn bounds(&self) -> Option<LatLngBounds> {
        (**self).bounds()
    }

    fn zoom(&self) -> Option<f64> {
        (**self).zoom()
    }

    fn center(&self) -> Option<LatLng> {
        (**self).center()
    }

    fn attach_marker(&mut self, marker: &MarkerSpec<'_>) {
        (**self).attach_marker(marker);
    }

    fn detach_marker(&mut self, id: MarkerId) {
        (**self).detach_marker(id);
    }

    fn set_marker_icon(&mut self, id: MarkerId, icon: &Icon) {
        (**self).set_marker_icon(id, icon);
    }

    fn set_marker_position(&mut self, id: MarkerId, position: LatLng) {
        (**self).set_marker_position(id, position);
    }
}
