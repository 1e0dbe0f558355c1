#![forbid(unsafe_code)]

//! Keyed registry of marker handles.
//!
//! # Design
//!
//! [`MarkerRegistry<T>`] maps an [`EntityKey`] to a [`MarkerEntry`]: the
//! surface-facing [`MarkerHandle`], a copy of the entity record it was built
//! from, and whether it is currently attached to the surface. A reverse index
//! from [`MarkerId`] back to the key resolves click events.
//!
//! Entries iterate in key order, so reconciliation issues surface calls in a
//! deterministic sequence.
//!
//! # Invariants
//!
//! 1. At most one entry per key.
//! 2. Every live entry's `MarkerId` is in the reverse index, and nothing else is.
//! 3. Marker ids are allocated monotonically and never reused, including
//!    across registries sharing one [`MarkerIds`] allocator.
//!
//! The registry itself never talks to a surface; the sync engine detaches a
//! handle before removing its entry.

use std::cell::Cell;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::rc::Rc;

use ahash::AHashMap;
use verdant_backend::{MarkerId, MarkerSpec, Tooltip};
use verdant_core::entity::EntityKey;
use verdant_core::geometry::LatLng;
use verdant_core::icon::Icon;

/// Shared marker id allocator.
///
/// Registries whose markers land on the same surface must share one, so
/// their ids never collide. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct MarkerIds(Rc<Cell<u64>>);

impl MarkerIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id. The first id is 1.
    pub fn next_id(&self) -> MarkerId {
        let id = self.0.get() + 1;
        self.0.set(id);
        MarkerId::new(id)
    }

    /// Number of ids handed out so far.
    pub fn allocated(&self) -> u64 {
        self.0.get()
    }
}

/// On-screen representation of one entity, owned by the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerHandle {
    id: MarkerId,
    position: LatLng,
    icon: Rc<Icon>,
    tooltip: Option<Tooltip>,
}

impl MarkerHandle {
    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn position(&self) -> LatLng {
        self.position
    }

    pub fn icon(&self) -> &Rc<Icon> {
        &self.icon
    }

    pub fn tooltip(&self) -> Option<&Tooltip> {
        self.tooltip.as_ref()
    }

    /// Borrowed description for [`verdant_backend::MapSurface::attach_marker`].
    pub fn spec(&self) -> MarkerSpec<'_> {
        MarkerSpec {
            id: self.id,
            position: self.position,
            icon: &self.icon,
            tooltip: self.tooltip.as_ref(),
        }
    }

    pub(crate) fn set_icon(&mut self, icon: Rc<Icon>) {
        self.icon = icon;
    }

    pub(crate) fn set_position(&mut self, position: LatLng) {
        self.position = position;
    }
}

/// One registry slot.
#[derive(Debug, Clone)]
pub struct MarkerEntry<T> {
    pub handle: MarkerHandle,
    pub data: T,
    pub attached: bool,
}

/// Keyed collection of marker handles.
#[derive(Debug)]
pub struct MarkerRegistry<T> {
    entries: BTreeMap<EntityKey, MarkerEntry<T>>,
    by_id: AHashMap<MarkerId, EntityKey>,
    ids: MarkerIds,
}

impl<T> Default for MarkerRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MarkerRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_ids(MarkerIds::new())
    }

    /// Create a registry drawing ids from a shared allocator.
    #[must_use]
    pub fn with_ids(ids: MarkerIds) -> Self {
        Self {
            entries: BTreeMap::new(),
            by_id: AHashMap::new(),
            ids,
        }
    }

    /// Switch to a shared allocator. Refused (returns `false`) while the
    /// registry holds entries.
    pub fn share_ids(&mut self, ids: &MarkerIds) -> bool {
        if !self.entries.is_empty() {
            return false;
        }
        self.ids = ids.clone();
        true
    }

    pub fn ids(&self) -> &MarkerIds {
        &self.ids
    }

    /// Create a detached entry for `key`.
    ///
    /// Returns `None` and leaves the registry untouched if the key is taken.
    pub fn insert(
        &mut self,
        key: EntityKey,
        data: T,
        position: LatLng,
        icon: Rc<Icon>,
        tooltip: Option<Tooltip>,
    ) -> Option<&mut MarkerEntry<T>> {
        let slot = match self.entries.entry(key) {
            btree_map::Entry::Occupied(_) => return None,
            btree_map::Entry::Vacant(slot) => slot,
        };
        let id = self.ids.next_id();
        self.by_id.insert(id, slot.key().clone());
        Some(slot.insert(MarkerEntry {
            handle: MarkerHandle {
                id,
                position,
                icon,
                tooltip,
            },
            data,
            attached: false,
        }))
    }

    /// Remove and return the entry for `key`.
    pub fn remove(&mut self, key: &EntityKey) -> Option<MarkerEntry<T>> {
        let entry = self.entries.remove(key)?;
        self.by_id.remove(&entry.handle.id);
        Some(entry)
    }

    /// Remove every entry whose key fails `keep`, returning the removed ones.
    pub fn remove_unless(
        &mut self,
        mut keep: impl FnMut(&EntityKey) -> bool,
    ) -> Vec<(EntityKey, MarkerEntry<T>)> {
        let doomed: Vec<EntityKey> = self.entries.keys().filter(|k| !keep(k)).cloned().collect();
        doomed
            .into_iter()
            .filter_map(|key| self.remove(&key).map(|entry| (key, entry)))
            .collect()
    }

    /// Remove everything.
    pub fn drain(&mut self) -> Vec<(EntityKey, MarkerEntry<T>)> {
        self.by_id.clear();
        std::mem::take(&mut self.entries).into_iter().collect()
    }

    pub fn get(&self, key: &EntityKey) -> Option<&MarkerEntry<T>> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &EntityKey) -> Option<&mut MarkerEntry<T>> {
        self.entries.get_mut(key)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Resolve a surface marker back to its key.
    pub fn key_of(&self, id: MarkerId) -> Option<&EntityKey> {
        self.by_id.get(&id)
    }

    /// Resolve a surface marker back to its entry.
    pub fn by_marker(&self, id: MarkerId) -> Option<(&EntityKey, &MarkerEntry<T>)> {
        let key = self.by_id.get(&id)?;
        self.entries.get_key_value(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries currently attached to the surface.
    pub fn attached_count(&self) -> usize {
        self.entries.values().filter(|e| e.attached).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EntityKey, &MarkerEntry<T>)> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&EntityKey, &mut MarkerEntry<T>)> {
        self.entries.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_core::icon::IconAnchor;

    fn icon(key: &str) -> Rc<Icon> {
        Rc::new(Icon::new(key, "", IconAnchor::default()))
    }

    fn registry_with(keys: &[i64]) -> MarkerRegistry<i64> {
        let mut reg = MarkerRegistry::new();
        for k in keys {
            reg.insert(
                EntityKey::Id(*k),
                *k,
                LatLng::new(0.0, *k as f64),
                icon("i"),
                None,
            )
            .unwrap();
        }
        reg
    }

    #[test]
    fn insert_rejects_duplicate_key() {
        let mut reg = registry_with(&[1]);
        assert!(
            reg.insert(EntityKey::Id(1), 99, LatLng::default(), icon("x"), None)
                .is_none()
        );
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(&EntityKey::Id(1)).unwrap().data, 1);
    }

    #[test]
    fn new_entries_start_detached() {
        let reg = registry_with(&[1, 2]);
        assert_eq!(reg.attached_count(), 0);
        assert!(reg.iter().all(|(_, e)| !e.attached));
    }

    #[test]
    fn marker_ids_are_never_reused() {
        let mut reg = registry_with(&[1]);
        let first = reg.get(&EntityKey::Id(1)).unwrap().handle.id();
        reg.remove(&EntityKey::Id(1));
        let entry = reg
            .insert(EntityKey::Id(1), 1, LatLng::default(), icon("i"), None)
            .unwrap();
        assert!(entry.handle.id() > first);
    }

    #[test]
    fn shared_allocator_keeps_ids_distinct() {
        let ids = MarkerIds::new();
        let mut a: MarkerRegistry<i64> = MarkerRegistry::with_ids(ids.clone());
        let mut b: MarkerRegistry<i64> = MarkerRegistry::new();
        assert!(b.share_ids(&ids));
        let ia = a.insert(EntityKey::Id(1), 1, LatLng::default(), icon("i"), None).unwrap().handle.id();
        let ib = b.insert(EntityKey::Id(1), 1, LatLng::default(), icon("i"), None).unwrap().handle.id();
        assert_ne!(ia, ib);
        assert_eq!(ids.allocated(), 2);
        assert!(!b.share_ids(&MarkerIds::new()));
    }

    #[test]
    fn reverse_index_follows_removals() {
        let mut reg = registry_with(&[1, 2, 3]);
        let id2 = reg.get(&EntityKey::Id(2)).unwrap().handle.id();
        assert_eq!(reg.key_of(id2), Some(&EntityKey::Id(2)));
        reg.remove(&EntityKey::Id(2));
        assert_eq!(reg.key_of(id2), None);
        assert!(reg.by_marker(id2).is_none());
    }

    #[test]
    fn remove_unless_returns_removed_in_key_order() {
        let mut reg = registry_with(&[5, 1, 4, 2]);
        let removed = reg.remove_unless(|k| matches!(k, EntityKey::Id(n) if n % 2 == 0));
        let keys: Vec<_> = removed.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![EntityKey::Id(1), EntityKey::Id(5)]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn drain_clears_everything() {
        let mut reg = registry_with(&[1, 2]);
        let id = reg.get(&EntityKey::Id(1)).unwrap().handle.id();
        assert_eq!(reg.drain().len(), 2);
        assert!(reg.is_empty());
        assert!(reg.key_of(id).is_none());
    }

    #[test]
    fn spec_borrows_handle_fields() {
        let reg = registry_with(&[3]);
        let entry = reg.get(&EntityKey::Id(3)).unwrap();
        let spec = entry.handle.spec();
        assert_eq!(spec.id, entry.handle.id());
        assert_eq!(spec.position, LatLng::new(0.0, 3.0));
        assert_eq!(spec.icon.key(), "i");
        assert!(spec.tooltip.is_none());
    }
}
