#![forbid(unsafe_code)]

//! Marker synchronization: keep surface markers in step with data and viewport.
//!
//! [`MarkerList<T>`] owns a [`MarkerRegistry`] and reconciles it against
//! two inputs:
//!
//! - **the data set**, replaced wholesale through [`MarkerList::set_data`];
//! - **the viewport**, read from the surface on every pass.
//!
//! # How it works
//!
//! 1. A data change drops the handles whose key vanished (detaching them
//!    first), refreshes the record, position, and icon of retained handles,
//!    and then runs a visibility pass.
//! 2. A visibility pass attaches handles that entered the bounds, detaches
//!    handles that left them, and creates handles for entities inside the
//!    bounds that have none yet. Entities outside the bounds get no handle
//!    until they scroll into view.
//! 3. `Move` events run a pass through the [`ThrottleGate`]; `MoveEnd` always
//!    runs one.
//!
//! # Invariants
//!
//! 1. At most one handle per [`EntityKey`]. Among duplicate keys in one data
//!    set the first occurrence inside the bounds wins, else the first one.
//! 2. After a pass, a handle is attached iff its position is inside the
//!    bounds that pass read.
//! 3. No handle outlives its key's presence in the data set.
//!
//! # Failure Modes
//!
//! - **Unmounted surface**: when [`MapSurface::bounds`] returns `None` the
//!   visibility pass is skipped. Removals from a data change still happen,
//!   so invariant 3 holds regardless.
//! - **Forgotten teardown**: the list cannot reach the surface from `Drop`.
//!   Hosts call [`MarkerList::clear`] when the layer unmounts.

use std::rc::Rc;
use std::time::Duration;

use ahash::{AHashMap, AHashSet};
use tracing::{debug, debug_span, trace};
use verdant_backend::{MapEvent, MapSurface, MarkerId};
use verdant_core::entity::{EntityKey, Located, default_key};
use verdant_core::geometry::LatLngBounds;

use crate::registry::{MarkerEntry, MarkerIds, MarkerRegistry};
use crate::source::{ClickHandler, IconSource, TooltipSource};
use crate::throttle::{DEFAULT_THROTTLE, ThrottleGate, ThrottleStats};

/// Key derivation function.
pub type KeyFn<T> = Rc<dyn Fn(&T) -> EntityKey>;

/// Counters describing what reconciliation has done so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Visibility passes that ran against mounted bounds.
    pub passes: u64,
    /// Passes skipped because the surface was not mounted.
    pub skipped_unmounted: u64,
    pub created: u64,
    pub destroyed: u64,
    pub attached: u64,
    pub detached: u64,
    pub icon_refreshes: u64,
    pub moved: u64,
}

/// What [`MarkerList::handle_event`] did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// A visibility pass ran.
    Reconciled,
    /// A move arrived inside the throttle window and was dropped.
    Throttled,
    /// A click resolved to one of this list's markers.
    Clicked,
    /// The event is not for this list.
    Ignored,
}

/// Reconciles one layer of markers against data and viewport.
pub struct MarkerList<T> {
    registry: MarkerRegistry<T>,
    data: Vec<T>,
    key_fn: KeyFn<T>,
    icon: IconSource<T>,
    tooltip: Option<TooltipSource<T>>,
    on_click: Option<ClickHandler<T>>,
    gate: ThrottleGate,
    last_bounds: Option<LatLngBounds>,
    stats: SyncStats,
}

impl<T: Located + Clone + 'static> MarkerList<T> {
    /// Create an empty list keyed by [`default_key`].
    #[must_use]
    pub fn new(icon: IconSource<T>) -> Self {
        Self {
            registry: MarkerRegistry::new(),
            data: Vec::new(),
            key_fn: Rc::new(|item: &T| default_key(item)),
            icon,
            tooltip: None,
            on_click: None,
            gate: ThrottleGate::new(DEFAULT_THROTTLE),
            last_bounds: None,
            stats: SyncStats::default(),
        }
    }

    /// Key markers by `f` instead of by coordinates.
    ///
    /// Must be set before the first data set; existing handles keep the key
    /// they were created under.
    #[must_use]
    pub fn with_key(mut self, f: impl Fn(&T) -> EntityKey + 'static) -> Self {
        self.key_fn = Rc::new(f);
        self
    }

    #[must_use]
    pub fn with_tooltip(mut self, tooltip: TooltipSource<T>) -> Self {
        self.tooltip = Some(tooltip);
        self
    }

    #[must_use]
    pub fn with_on_click(mut self, f: impl Fn(&T) + 'static) -> Self {
        self.on_click = Some(Rc::new(f));
        self
    }

    /// Rate-limit `Move` reconciliation to one pass per `interval`.
    #[must_use]
    pub fn with_throttle(mut self, interval: Duration) -> Self {
        self.gate = ThrottleGate::new(interval);
        self
    }

    /// Draw marker ids from `ids`, shared with other lists on the same
    /// surface. Refused while handles exist.
    pub fn share_marker_ids(&mut self, ids: &MarkerIds) -> bool {
        self.registry.share_ids(ids)
    }

    /// Change the pan throttle interval. The window restarts.
    pub fn set_throttle(&mut self, interval: Duration) {
        self.gate = ThrottleGate::new(interval);
    }

    /// Replace the data set and reconcile.
    pub fn set_data<S>(&mut self, data: Vec<T>, surface: &mut S)
    where
        S: MapSurface + ?Sized,
    {
        self.replace_data(data, surface);
        self.refresh_visibility(surface);
    }

    /// Replace the data set without a visibility pass.
    ///
    /// Stale handles are destroyed and retained ones updated, but nothing new
    /// is created or attached. Hidden layers use this to stay current.
    pub fn replace_data<S>(&mut self, data: Vec<T>, surface: &mut S)
    where
        S: MapSurface + ?Sized,
    {
        let _span = debug_span!("marker_sync.set_data", items = data.len()).entered();
        self.data = data;

        let key_fn = Rc::clone(&self.key_fn);
        let present: AHashSet<EntityKey> = self.data.iter().map(|item| key_fn(item)).collect();

        for (key, entry) in self.registry.remove_unless(|k| present.contains(k)) {
            self.destroy(&key, entry, surface);
        }

        let bounds = surface.bounds().or(self.last_bounds);
        for (key, index) in representatives(&self.data, &*key_fn, bounds) {
            let Some(entry) = self.registry.get_mut(&key) else {
                continue;
            };
            refresh_entry(entry, &self.data[index], &self.icon, surface, &mut self.stats);
        }
    }

    /// Attach/detach existing handles against the current bounds and create
    /// handles for entities that entered them.
    pub fn refresh_visibility<S>(&mut self, surface: &mut S)
    where
        S: MapSurface + ?Sized,
    {
        let Some(bounds) = surface.bounds() else {
            self.stats.skipped_unmounted += 1;
            trace!("surface not mounted; skipping visibility pass");
            return;
        };
        let _span = debug_span!("marker_sync.reconcile", markers = self.registry.len()).entered();
        self.last_bounds = Some(bounds);
        self.stats.passes += 1;

        for (key, entry) in self.registry.iter_mut() {
            let inside = bounds.contains(entry.handle.position());
            if inside && !entry.attached {
                surface.attach_marker(&entry.handle.spec());
                entry.attached = true;
                self.stats.attached += 1;
                trace!(key = %key, marker = %entry.handle.id(), "marker attached");
            } else if !inside && entry.attached {
                surface.detach_marker(entry.handle.id());
                entry.attached = false;
                self.stats.detached += 1;
                trace!(key = %key, marker = %entry.handle.id(), "marker detached");
            }
        }

        for item in &self.data {
            let key = (self.key_fn)(item);
            if self.registry.contains(&key) || !bounds.contains(item.position()) {
                continue;
            }
            let icon = self.icon.icon_for(item);
            let tooltip = self.tooltip.as_ref().map(|t| t.tooltip_for(item));
            let Some(entry) =
                self.registry
                    .insert(key.clone(), item.clone(), item.position(), icon, tooltip)
            else {
                continue;
            };
            surface.attach_marker(&entry.handle.spec());
            entry.attached = true;
            self.stats.created += 1;
            self.stats.attached += 1;
            debug!(key = %key, marker = %entry.handle.id(), "marker created");
        }
    }

    /// Install a new icon source.
    ///
    /// If it differs from the current one, every existing handle gets its
    /// icon re-rendered; attached state is untouched. Returns whether the
    /// source changed.
    pub fn set_icon_source<S>(&mut self, icon: IconSource<T>, surface: &mut S) -> bool
    where
        S: MapSurface + ?Sized,
    {
        if self.icon.same_as(&icon) {
            return false;
        }
        self.icon = icon;
        let mut refreshed = 0_u64;
        for (_, entry) in self.registry.iter_mut() {
            let next = self.icon.icon_for(&entry.data);
            surface.set_marker_icon(entry.handle.id(), &next);
            entry.handle.set_icon(next);
            refreshed += 1;
        }
        self.stats.icon_refreshes += refreshed;
        debug!(refreshed, "icon source changed");
        true
    }

    /// Tooltip used for handles created from now on.
    pub fn set_tooltip_source(&mut self, tooltip: Option<TooltipSource<T>>) {
        self.tooltip = tooltip;
    }

    /// Callback for marker clicks. Replaces any previous one.
    pub fn set_on_click(&mut self, handler: Option<ClickHandler<T>>) {
        self.on_click = handler;
    }

    /// Invoke the click callback for `marker`.
    ///
    /// Returns `false` if the marker does not belong to this list.
    pub fn handle_click(&self, marker: MarkerId) -> bool {
        let Some((key, entry)) = self.registry.by_marker(marker) else {
            return false;
        };
        trace!(key = %key, marker = %marker, "marker clicked");
        if let Some(handler) = &self.on_click {
            handler(&entry.data);
        }
        true
    }

    /// Route a map event at time `now`.
    pub fn handle_event<S>(&mut self, event: MapEvent, now: Duration, surface: &mut S) -> EventOutcome
    where
        S: MapSurface + ?Sized,
    {
        match event {
            MapEvent::Move => {
                if self.gate.admit(now) {
                    self.refresh_visibility(surface);
                    EventOutcome::Reconciled
                } else {
                    EventOutcome::Throttled
                }
            }
            MapEvent::MoveEnd => {
                self.gate.force();
                self.refresh_visibility(surface);
                EventOutcome::Reconciled
            }
            MapEvent::MarkerClick(id) => {
                if self.handle_click(id) {
                    EventOutcome::Clicked
                } else {
                    EventOutcome::Ignored
                }
            }
            MapEvent::DragEnd | MapEvent::ZoomEnd => EventOutcome::Ignored,
        }
    }

    /// Detach and destroy every handle. The data set is kept, so the next
    /// pass recreates what is visible.
    pub fn clear<S>(&mut self, surface: &mut S)
    where
        S: MapSurface + ?Sized,
    {
        for (key, entry) in self.registry.drain() {
            self.destroy(&key, entry, surface);
        }
        self.gate.reset();
    }

    fn destroy<S>(&mut self, key: &EntityKey, entry: MarkerEntry<T>, surface: &mut S)
    where
        S: MapSurface + ?Sized,
    {
        if entry.attached {
            surface.detach_marker(entry.handle.id());
            self.stats.detached += 1;
        }
        self.stats.destroyed += 1;
        debug!(key = %key, marker = %entry.handle.id(), "marker destroyed");
    }
}

impl<T> MarkerList<T> {
    pub fn registry(&self) -> &MarkerRegistry<T> {
        &self.registry
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn icon_source(&self) -> &IconSource<T> {
        &self.icon
    }

    /// Number of live handles, attached or not.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn attached_count(&self) -> usize {
        self.registry.attached_count()
    }

    pub fn is_attached(&self, key: &EntityKey) -> bool {
        self.registry.get(key).is_some_and(|e| e.attached)
    }

    pub fn marker_id(&self, key: &EntityKey) -> Option<MarkerId> {
        self.registry.get(key).map(|e| e.handle.id())
    }

    /// Bounds read by the most recent visibility pass.
    pub fn last_bounds(&self) -> Option<LatLngBounds> {
        self.last_bounds
    }

    pub fn stats(&self) -> SyncStats {
        self.stats
    }

    pub fn throttle_stats(&self) -> ThrottleStats {
        self.gate.stats()
    }
}

impl<T> std::fmt::Debug for MarkerList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkerList")
            .field("markers", &self.registry.len())
            .field("attached", &self.registry.attached_count())
            .field("data", &self.data.len())
            .field("icon", &self.icon)
            .field("stats", &self.stats)
            .finish()
    }
}

/// Bring a retained entry up to date with a fresh record.
/// One record index per distinct key, in order of first appearance.
///
/// A key is represented by its first occurrence inside `bounds`, or by its
/// first occurrence overall when none is inside.
fn representatives<T: Located>(
    data: &[T],
    key_fn: &dyn Fn(&T) -> EntityKey,
    bounds: Option<LatLngBounds>,
) -> Vec<(EntityKey, usize)> {
    let mut slots: AHashMap<EntityKey, usize> = AHashMap::with_capacity(data.len());
    let mut picks: Vec<(EntityKey, usize, bool)> = Vec::with_capacity(data.len());
    for (index, item) in data.iter().enumerate() {
        let inside = bounds.is_some_and(|b| b.contains(item.position()));
        let key = key_fn(item);
        match slots.get(&key) {
            Some(&slot) => {
                let pick = &mut picks[slot];
                if !pick.2 && inside {
                    pick.1 = index;
                    pick.2 = true;
                }
            }
            None => {
                slots.insert(key.clone(), picks.len());
                picks.push((key, index, inside));
            }
        }
    }
    picks.into_iter().map(|(key, index, _)| (key, index)).collect()
}

fn refresh_entry<T, S>(
    entry: &mut MarkerEntry<T>,
    item: &T,
    icon: &IconSource<T>,
    surface: &mut S,
    stats: &mut SyncStats,
) where
    T: Located + Clone,
    S: MapSurface + ?Sized,
{
    let position = item.position();
    if position != entry.handle.position() {
        surface.set_marker_position(entry.handle.id(), position);
        entry.handle.set_position(position);
        stats.moved += 1;
    }
    entry.data = item.clone();
    if icon.is_per_entity() {
        let next = icon.icon_for(item);
        let current = entry.handle.icon();
        if !Rc::ptr_eq(&next, current) && *next != **current {
            surface.set_marker_icon(entry.handle.id(), &next);
            entry.handle.set_icon(next);
            stats.icon_refreshes += 1;
        }
    }
}
