#![forbid(unsafe_code)]

//! Marker icon catalogue with a memoizing cache.
//!
//! Icons are HTML snippets styled inline, keyed by the parameters that shape
//! them. [`IconCache`] builds each distinct icon once and hands out shared
//! [`Rc<Icon>`] clones afterwards, so a layer re-evaluating its icon function
//! for an unchanged entity gets the very same allocation back and the sync
//! engine can skip the surface update.
//!
//! Sensor and refill icons take no parameters; they are built once when the
//! cache is created.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::rc::Rc;

use ahash::AHashMap;
use verdant_core::icon::{Icon, IconAnchor};

/// Anchor for round pins: the visual sits above the coordinate.
pub const PIN_ANCHOR: IconAnchor = IconAnchor::new(0, 24);
/// Where popups open relative to a round pin.
pub const PIN_POPUP_ANCHOR: IconAnchor = IconAnchor::new(0, -36);
/// Anchor for labels and refill points, centred on the coordinate.
pub const CENTERED_ANCHOR: IconAnchor = IconAnchor::new(12, 12);

/// Fill for sensor and refill pins.
const NEUTRAL_FILL: &str = "#454545";

const SVG_ATTRS: &str = r#"xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="3" stroke-linecap="round" stroke-linejoin="round" class="text-white w-[1.125rem] h-[1.125rem]""#;

const TREE_PATHS: &str = r#"<path d="M12 22v-7"/><path d="M9 9a3 3 0 1 1 6 0"/><path d="M7 15h10l-2.5-3.5A3.5 3.5 0 0 0 12 4a3.5 3.5 0 0 0-2.5 7.5Z"/>"#;
const CHECK_PATHS: &str = r#"<path d="M20 6 9 17l-5-5"/>"#;
const SENSOR_PATHS: &str = r#"<path d="M12 20v-8"/><path d="M8.5 8.5a5 5 0 0 1 7 0"/><path d="M5 5a10 10 0 0 1 14 0"/><circle cx="12" cy="12" r="1"/>"#;
const PAINT_BUCKET_PATHS: &str = r#"<path d="m19 11-8-8-8.6 8.6a2 2 0 0 0 0 2.8l5.2 5.2c.8.8 2 .8 2.8 0L19 11Z"/><path d="m5 2 5 5"/><path d="M2 13h15"/><path d="M22 20a2 2 0 1 1-4 0c0-1.6 1.7-2.4 2-4 .3 1.6 2 2.4 2 4Z"/>"#;

fn svg(paths: &str) -> String {
    format!("<svg {SVG_ATTRS}>{paths}</svg>")
}

fn pin_style(color: &str) -> String {
    format!(
        "background-color: {color}; width: 2rem; height: 2rem; position: absolute; \
         border-radius: 3rem; left: 0.25rem; top: 0.25rem; border: 1px solid white; \
         display: flex; align-items: center; justify-content: center;"
    )
}

fn pin_wrapper_style(selected: bool, highlighted: bool) -> String {
    let lifted = selected || highlighted;
    format!(
        "background-color: {}; width: 2.5rem; height: 2.5rem; border-radius: 3rem; \
         position: relative; left: -1rem; top: -1rem; \
         box-shadow: rgba(0, 0, 0, {}) 0px 5px 15px;",
        if lifted { "white" } else { "" },
        if lifted { "0.35" } else { "0" },
    )
}

fn cluster_style(color: &str, disabled: bool) -> String {
    format!(
        "background-color: {color}; opacity: {}; cursor: {}; width: 2.25rem; height: 2.25rem; \
         position: absolute; border-radius: 3rem; left: {edge}; top: {edge}; \
         border: 1px solid white; display: flex; align-items: center; justify-content: center; \
         font-weight: bold; font-size: 0.875rem; color: white; font-family: Nunito, sans-serif;",
        if disabled { "0.6" } else { "1" },
        if disabled { "not-allowed" } else { "pointer" },
        edge = if disabled { "0" } else { "0.25rem" },
    )
}

fn cluster_wrapper_style(highlighted: bool, disabled: bool) -> String {
    let background = match (highlighted, disabled) {
        (true, _) => "white",
        (false, true) => "#E8E8E8",
        (false, false) => "",
    };
    let (size, offset) = if disabled {
        ("2.25rem", "-1rem")
    } else {
        ("2.75rem", "-1.25rem")
    };
    format!(
        "background-color: {background}; width: {size}; height: {size}; border-radius: 3rem; \
         position: relative; left: {offset}; top: {offset}; \
         box-shadow: rgba(0, 0, 0, {}) 0px 5px 15px;",
        if highlighted { "0.35" } else { "0" },
    )
}

const ROUTE_STYLE: &str = "background-color: #454545; width: 6rem; height: 1.75rem; \
     position: absolute; border-radius: 3rem; left: 0.25rem; top: 0.25rem; \
     border: 1px solid white; display: flex; align-items: center; justify-content: center; \
     font-weight: bold; font-size: 0.875rem; color: white; z-index: 1500; \
     font-family: Nunito, sans-serif;";

fn figure(wrapper: &str, inner: &str, body: &str) -> String {
    format!(r#"<figure style="{wrapper}"><span style="{inner}">{body}</span></figure>"#)
}

/// Cache key for a tree pin.
pub fn tree_key(color: &str, selected: bool, highlighted: bool) -> String {
    format!("tree-{color}-{selected}-{highlighted}")
}

/// Cache key for a cluster pin.
pub fn cluster_key(color: &str, highlighted: bool, disabled: bool, tree_count: usize) -> String {
    format!("cluster-{color}-{highlighted}-{disabled}-{tree_count}")
}

/// Cache key for a route label.
pub fn route_key(label: &str) -> String {
    format!("route-{label}")
}

/// Shared, memoizing icon catalogue.
///
/// Interior mutability keeps lookups `&self` so icon closures can capture
/// an `Rc<IconCache>`.
#[derive(Debug)]
pub struct IconCache {
    icons: RefCell<AHashMap<String, Rc<Icon>>>,
    sensor: Rc<Icon>,
    refill: Rc<Icon>,
}

impl Default for IconCache {
    fn default() -> Self {
        Self::new()
    }
}

impl IconCache {
    #[must_use]
    pub fn new() -> Self {
        let sensor = Icon::new(
            "sensor",
            figure(
                &pin_wrapper_style(false, true),
                &pin_style(NEUTRAL_FILL),
                &svg(SENSOR_PATHS),
            ),
            PIN_ANCHOR,
        );
        let refill = Icon::new(
            "refill",
            figure(
                &pin_wrapper_style(false, false),
                &pin_style(NEUTRAL_FILL),
                &svg(PAINT_BUCKET_PATHS),
            ),
            CENTERED_ANCHOR,
        );
        Self {
            icons: RefCell::new(AHashMap::new()),
            sensor: Rc::new(sensor),
            refill: Rc::new(refill),
        }
    }

    /// Round tree pin in `color`; a selected tree shows a check mark.
    pub fn tree(&self, color: &str, selected: bool, highlighted: bool) -> Rc<Icon> {
        self.memo(tree_key(color, selected, highlighted), |key| {
            let glyph = svg(if selected { CHECK_PATHS } else { TREE_PATHS });
            Icon::new(
                key,
                figure(
                    &pin_wrapper_style(selected, highlighted),
                    &pin_style(color),
                    &glyph,
                ),
                PIN_ANCHOR,
            )
            .with_popup_anchor(PIN_POPUP_ANCHOR)
        })
    }

    /// Cluster pin showing its tree count.
    pub fn cluster(
        &self,
        color: &str,
        highlighted: bool,
        disabled: bool,
        tree_count: usize,
    ) -> Rc<Icon> {
        self.memo(cluster_key(color, highlighted, disabled, tree_count), |key| {
            Icon::new(
                key,
                figure(
                    &cluster_wrapper_style(highlighted, disabled),
                    &cluster_style(color, disabled),
                    &tree_count.to_string(),
                ),
                PIN_ANCHOR,
            )
            .with_popup_anchor(PIN_POPUP_ANCHOR)
        })
    }

    /// Pill-shaped route label.
    pub fn route(&self, label: &str) -> Rc<Icon> {
        self.memo(route_key(label), |key| {
            let mut html = String::with_capacity(ROUTE_STYLE.len() + label.len() + 32);
            let _ = write!(html, r#"<span style="{ROUTE_STYLE}">{label}</span>"#);
            Icon::new(key, html, CENTERED_ANCHOR)
        })
    }

    pub fn sensor(&self) -> Rc<Icon> {
        Rc::clone(&self.sensor)
    }

    pub fn refill(&self) -> Rc<Icon> {
        Rc::clone(&self.refill)
    }

    /// Number of memoized parameterized icons.
    pub fn len(&self) -> usize {
        self.icons.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.borrow().is_empty()
    }

    /// Drop every memoized icon. Handles keep the allocations they hold.
    pub fn clear(&self) {
        self.icons.borrow_mut().clear();
    }

    fn memo(&self, key: String, build: impl FnOnce(&str) -> Icon) -> Rc<Icon> {
        if let Some(icon) = self.icons.borrow().get(&key) {
            return Rc::clone(icon);
        }
        let icon = Rc::new(build(&key));
        tracing::trace!(key = %key, "icon built");
        self.icons.borrow_mut().insert(key, Rc::clone(&icon));
        icon
    }
}
