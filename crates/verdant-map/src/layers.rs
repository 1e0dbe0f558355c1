#![forbid(unsafe_code)]

//! Entity layers built on [`MarkerList`].
//!
//! - [`TreeLayer`]: one pin per tree, coloured by watering status, with
//!   selection, highlight, and a [`TreeFilter`].
//! - [`ClusterLayer`]: one pin per located tree cluster showing its tree
//!   count, with highlight, disabled state, and a [`ClusterFilter`].
//! - [`SensorLayer`]: sensor kits with the constant sensor icon.
//! - [`TreesAndClusters`]: shows trees when zoomed in (or while a tree filter
//!   is active) and clusters otherwise.
//!
//! Selection, highlight, and disabled state live in the icon function's
//! captures. Changing them builds a new function, which the sync engine sees
//! as a new icon source and re-renders in place.

use std::rc::Rc;
use std::time::Duration;

use ahash::AHashSet;
use tracing::debug;
use verdant_backend::{MapEvent, MapSurface, TooltipOptions};
use verdant_core::domain::{PlacedCluster, Sensor, Tree, TreeCluster, WateringStatus};
use verdant_core::entity::EntityKey;

use crate::icons::IconCache;
use crate::registry::MarkerIds;
use crate::source::{IconSource, TooltipSource};
use crate::sync::{EventOutcome, MarkerList};

/// Zoom level from which individual trees replace clusters.
pub const DEFAULT_ZOOM_THRESHOLD: f64 = 17.0;

fn tree_icons(
    icons: &Rc<IconCache>,
    selected: &Rc<AHashSet<i64>>,
    highlighted: Option<i64>,
) -> IconSource<Tree> {
    let icons = Rc::clone(icons);
    let selected = Rc::clone(selected);
    IconSource::from_fn(move |t: &Tree| {
        icons.tree(
            t.watering_status.color(),
            selected.contains(&t.id),
            highlighted == Some(t.id),
        )
    })
}

/// Filter over watering status, cluster membership, and planting year.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeFilter {
    pub statuses: Vec<WateringStatus>,
    /// `Some(true)` keeps trees in a cluster, `Some(false)` those without one.
    pub has_cluster: Option<bool>,
    pub planting_years: Vec<i32>,
}

impl TreeFilter {
    pub fn is_active(&self) -> bool {
        self.active_count() > 0
    }

    /// Number of applied criteria values, as shown on the filter button.
    pub fn active_count(&self) -> usize {
        self.statuses.len() + usize::from(self.has_cluster.is_some()) + self.planting_years.len()
    }

    /// A tree matches when every set criterion accepts it. Trees without a
    /// planting year fail a year criterion.
    pub fn matches(&self, tree: &Tree) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&tree.watering_status);
        let cluster_ok = self
            .has_cluster
            .is_none_or(|has| tree.tree_cluster_id.is_some() == has);
        let year_ok = self.planting_years.is_empty()
            || tree
                .planting_year
                .is_some_and(|year| self.planting_years.contains(&year));
        status_ok && cluster_ok && year_ok
    }

    pub fn clear(&mut self) {
        self.statuses.clear();
        self.has_cluster = None;
        self.planting_years.clear();
    }
}

/// Trees as individual pins.
pub struct TreeLayer {
    list: MarkerList<Tree>,
    icons: Rc<IconCache>,
    trees: Vec<Tree>,
    filter: TreeFilter,
    selected: Rc<AHashSet<i64>>,
    highlighted: Option<i64>,
}

impl TreeLayer {
    #[must_use]
    pub fn new(icons: Rc<IconCache>) -> Self {
        let selected = Rc::new(AHashSet::new());
        let list = MarkerList::new(tree_icons(&icons, &selected, None))
            .with_key(|t: &Tree| EntityKey::Id(t.id))
            .with_tooltip(TooltipSource::from_fn(
                |t: &Tree| t.number.clone(),
                TooltipOptions::above_marker(),
            ));
        Self {
            list,
            icons,
            trees: Vec::new(),
            filter: TreeFilter::default(),
            selected,
            highlighted: None,
        }
    }

    /// Replace the trees. Only those matching the filter get pins.
    pub fn set_trees<S: MapSurface + ?Sized>(&mut self, trees: Vec<Tree>, surface: &mut S) {
        self.trees = trees;
        let shown = self.filtered();
        self.list.set_data(shown, surface);
    }

    fn replace_trees<S: MapSurface + ?Sized>(&mut self, trees: Vec<Tree>, surface: &mut S) {
        self.trees = trees;
        let shown = self.filtered();
        self.list.replace_data(shown, surface);
    }

    /// Apply a filter and reconcile. Returns whether the filter changed.
    pub fn set_filter<S: MapSurface + ?Sized>(
        &mut self,
        filter: TreeFilter,
        surface: &mut S,
    ) -> bool {
        self.apply_filter(filter, surface, true)
    }

    fn apply_filter<S: MapSurface + ?Sized>(
        &mut self,
        filter: TreeFilter,
        surface: &mut S,
        visible: bool,
    ) -> bool {
        if filter == self.filter {
            return false;
        }
        debug!(criteria = filter.active_count(), "tree filter changed");
        self.filter = filter;
        let shown = self.filtered();
        if visible {
            self.list.set_data(shown, surface);
        } else {
            self.list.replace_data(shown, surface);
        }
        true
    }

    pub fn filter(&self) -> &TreeFilter {
        &self.filter
    }

    fn filtered(&self) -> Vec<Tree> {
        self.trees
            .iter()
            .filter(|t| self.filter.matches(t))
            .cloned()
            .collect()
    }

    /// Mark trees as selected and optionally highlight one.
    ///
    /// Returns whether icons were re-rendered.
    pub fn set_selection<S: MapSurface + ?Sized>(
        &mut self,
        selected: impl IntoIterator<Item = i64>,
        highlighted: Option<i64>,
        surface: &mut S,
    ) -> bool {
        let selected: AHashSet<i64> = selected.into_iter().collect();
        if selected == *self.selected && highlighted == self.highlighted {
            return false;
        }
        self.selected = Rc::new(selected);
        self.highlighted = highlighted;
        let source = tree_icons(&self.icons, &self.selected, highlighted);
        self.list.set_icon_source(source, surface)
    }

    pub fn set_on_click(&mut self, f: impl Fn(&Tree) + 'static) {
        self.list.set_on_click(Some(Rc::new(f)));
    }

    pub fn selected(&self) -> &AHashSet<i64> {
        &self.selected
    }

    pub fn highlighted(&self) -> Option<i64> {
        self.highlighted
    }

    pub fn list(&self) -> &MarkerList<Tree> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut MarkerList<Tree> {
        &mut self.list
    }
}

/// Filter over watering status and region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterFilter {
    pub statuses: Vec<WateringStatus>,
    pub regions: Vec<String>,
}

impl ClusterFilter {
    pub fn is_active(&self) -> bool {
        !self.statuses.is_empty() || !self.regions.is_empty()
    }

    /// Number of applied criteria values, as shown on the filter button.
    pub fn active_count(&self) -> usize {
        self.statuses.len() + self.regions.len()
    }

    /// A cluster matches when every non-empty criterion contains its value.
    pub fn matches(&self, cluster: &TreeCluster) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&cluster.watering_status);
        let region_ok = self.regions.is_empty()
            || cluster
                .region_name()
                .is_some_and(|name| self.regions.iter().any(|r| r == name));
        status_ok && region_ok
    }

    pub fn clear(&mut self) {
        self.statuses.clear();
        self.regions.clear();
    }
}

fn cluster_icons(
    icons: &Rc<IconCache>,
    highlighted: &Rc<AHashSet<i64>>,
    disabled: &Rc<AHashSet<i64>>,
) -> IconSource<PlacedCluster> {
    let icons = Rc::clone(icons);
    let highlighted = Rc::clone(highlighted);
    let disabled = Rc::clone(disabled);
    IconSource::from_fn(move |c: &PlacedCluster| {
        let id = c.cluster.id;
        icons.cluster(
            c.cluster.watering_status.color(),
            highlighted.contains(&id),
            disabled.contains(&id),
            c.tree_count,
        )
    })
}

/// Tree clusters as count pins.
pub struct ClusterLayer {
    list: MarkerList<PlacedCluster>,
    icons: Rc<IconCache>,
    clusters: Vec<TreeCluster>,
    filter: ClusterFilter,
    highlighted: Rc<AHashSet<i64>>,
    disabled: Rc<AHashSet<i64>>,
}

impl ClusterLayer {
    #[must_use]
    pub fn new(icons: Rc<IconCache>) -> Self {
        let highlighted = Rc::new(AHashSet::new());
        let disabled = Rc::new(AHashSet::new());
        let list = MarkerList::new(cluster_icons(&icons, &highlighted, &disabled))
            .with_key(|c: &PlacedCluster| EntityKey::Id(c.cluster.id))
            .with_tooltip(TooltipSource::from_fn(
                |c: &PlacedCluster| c.cluster.name.clone(),
                TooltipOptions::above_marker(),
            ));
        Self {
            list,
            icons,
            clusters: Vec::new(),
            filter: ClusterFilter::default(),
            highlighted,
            disabled,
        }
    }

    /// Replace the clusters. Clusters without a location or tree list are
    /// never shown.
    pub fn set_clusters<S: MapSurface + ?Sized>(
        &mut self,
        clusters: Vec<TreeCluster>,
        surface: &mut S,
    ) {
        self.clusters = clusters;
        let placed = self.placed();
        self.list.set_data(placed, surface);
    }

    fn replace_clusters<S: MapSurface + ?Sized>(
        &mut self,
        clusters: Vec<TreeCluster>,
        surface: &mut S,
    ) {
        self.clusters = clusters;
        let placed = self.placed();
        self.list.replace_data(placed, surface);
    }

    /// Apply a filter and reconcile. Returns whether the filter changed.
    pub fn set_filter<S: MapSurface + ?Sized>(
        &mut self,
        filter: ClusterFilter,
        surface: &mut S,
    ) -> bool {
        self.apply_filter(filter, surface, true)
    }

    fn apply_filter<S: MapSurface + ?Sized>(
        &mut self,
        filter: ClusterFilter,
        surface: &mut S,
        visible: bool,
    ) -> bool {
        if filter == self.filter {
            return false;
        }
        debug!(criteria = filter.active_count(), "cluster filter changed");
        self.filter = filter;
        let placed = self.placed();
        if visible {
            self.list.set_data(placed, surface);
        } else {
            self.list.replace_data(placed, surface);
        }
        true
    }

    pub fn filter(&self) -> &ClusterFilter {
        &self.filter
    }

    /// Replace the highlighted and disabled sets.
    ///
    /// Returns whether icons were re-rendered.
    pub fn set_states<S: MapSurface + ?Sized>(
        &mut self,
        highlighted: impl IntoIterator<Item = i64>,
        disabled: impl IntoIterator<Item = i64>,
        surface: &mut S,
    ) -> bool {
        let highlighted: AHashSet<i64> = highlighted.into_iter().collect();
        let disabled: AHashSet<i64> = disabled.into_iter().collect();
        if highlighted == *self.highlighted && disabled == *self.disabled {
            return false;
        }
        self.highlighted = Rc::new(highlighted);
        self.disabled = Rc::new(disabled);
        let source = cluster_icons(&self.icons, &self.highlighted, &self.disabled);
        self.list.set_icon_source(source, surface)
    }

    pub fn set_on_click(&mut self, f: impl Fn(&TreeCluster) + 'static) {
        self.list
            .set_on_click(Some(Rc::new(move |c: &PlacedCluster| f(&c.cluster))));
    }

    pub fn list(&self) -> &MarkerList<PlacedCluster> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut MarkerList<PlacedCluster> {
        &mut self.list
    }

    fn placed(&self) -> Vec<PlacedCluster> {
        self.clusters
            .iter()
            .filter(|c| self.filter.matches(c))
            .cloned()
            .filter_map(TreeCluster::placed)
            .collect()
    }
}

/// Sensor kits.
pub struct SensorLayer {
    list: MarkerList<Sensor>,
}

impl SensorLayer {
    #[must_use]
    pub fn new(icons: &IconCache) -> Self {
        let list = MarkerList::new(IconSource::fixed(icons.sensor()))
            .with_key(|s: &Sensor| EntityKey::Text(s.id.clone()));
        Self { list }
    }

    pub fn set_sensors<S: MapSurface + ?Sized>(&mut self, sensors: Vec<Sensor>, surface: &mut S) {
        self.list.set_data(sensors, surface);
    }

    pub fn set_on_click(&mut self, f: impl Fn(&Sensor) + 'static) {
        self.list.set_on_click(Some(Rc::new(f)));
    }

    pub fn list(&self) -> &MarkerList<Sensor> {
        &self.list
    }

    pub fn list_mut(&mut self) -> &mut MarkerList<Sensor> {
        &mut self.list
    }
}

/// Which half of [`TreesAndClusters`] is on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibleLayer {
    Trees,
    Clusters,
}

/// Trees when zoomed in, clusters when zoomed out.
///
/// Only the visible layer holds handles; the hidden one keeps its data and
/// is rebuilt from it when it becomes visible.
pub struct TreesAndClusters {
    trees: TreeLayer,
    clusters: ClusterLayer,
    threshold: f64,
    zoom: f64,
    filter_active: bool,
    visible: VisibleLayer,
    ids: MarkerIds,
}

impl TreesAndClusters {
    /// Start at `zoom` with the given threshold.
    #[must_use]
    pub fn new(icons: Rc<IconCache>, threshold: f64, zoom: f64) -> Self {
        let ids = MarkerIds::new();
        let mut layer = Self {
            trees: TreeLayer::new(Rc::clone(&icons)),
            clusters: ClusterLayer::new(icons),
            threshold,
            zoom,
            filter_active: false,
            visible: VisibleLayer::Clusters,
            ids,
        };
        layer.trees.list.share_marker_ids(&layer.ids);
        layer.clusters.list.share_marker_ids(&layer.ids);
        layer.visible = layer.wanted();
        layer
    }

    /// Allocator shared by both halves; hand it to other lists drawn on the
    /// same surface.
    pub fn marker_ids(&self) -> &MarkerIds {
        &self.ids
    }

    /// Pan throttle interval for both halves.
    pub fn set_throttle(&mut self, interval: Duration) {
        self.trees.list.set_throttle(interval);
        self.clusters.list.set_throttle(interval);
    }

    pub fn visible(&self) -> VisibleLayer {
        self.visible
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn trees(&self) -> &TreeLayer {
        &self.trees
    }

    /// See [`TreesAndClusters::clusters_mut`].
    pub fn trees_mut(&mut self) -> &mut TreeLayer {
        &mut self.trees
    }

    pub fn clusters(&self) -> &ClusterLayer {
        &self.clusters
    }

    /// Direct access for selection state and click handlers. Data and
    /// filter changes go through this switch so the hidden half stays off
    /// the surface.
    pub fn clusters_mut(&mut self) -> &mut ClusterLayer {
        &mut self.clusters
    }

    pub fn set_trees<S: MapSurface + ?Sized>(&mut self, trees: Vec<Tree>, surface: &mut S) {
        match self.visible {
            VisibleLayer::Trees => self.trees.set_trees(trees, surface),
            VisibleLayer::Clusters => self.trees.replace_trees(trees, surface),
        }
    }

    pub fn set_clusters<S: MapSurface + ?Sized>(
        &mut self,
        clusters: Vec<TreeCluster>,
        surface: &mut S,
    ) {
        match self.visible {
            VisibleLayer::Clusters => self.clusters.set_clusters(clusters, surface),
            VisibleLayer::Trees => self.clusters.replace_clusters(clusters, surface),
        }
    }

    /// Apply a cluster filter without surfacing clusters while trees show.
    pub fn set_cluster_filter<S: MapSurface + ?Sized>(
        &mut self,
        filter: ClusterFilter,
        surface: &mut S,
    ) -> bool {
        let visible = self.visible == VisibleLayer::Clusters;
        self.clusters.apply_filter(filter, surface, visible)
    }

    /// Record a zoom change. Returns whether the visible layer switched.
    pub fn set_zoom<S: MapSurface + ?Sized>(&mut self, zoom: f64, surface: &mut S) -> bool {
        self.zoom = zoom;
        self.apply(surface)
    }

    /// Apply a tree filter. Trees show at any zoom while it is active.
    ///
    /// Returns whether the filter changed or the visible layer switched.
    pub fn set_tree_filter<S: MapSurface + ?Sized>(
        &mut self,
        filter: TreeFilter,
        surface: &mut S,
    ) -> bool {
        self.filter_active = filter.is_active();
        let trees_stay = self.visible == VisibleLayer::Trees && self.wanted() == VisibleLayer::Trees;
        let changed = self.trees.apply_filter(filter, surface, trees_stay);
        let switched = self.apply(surface);
        changed || switched
    }

    /// Route a map event to the visible layer. `ZoomEnd` and `MoveEnd` also
    /// re-read the surface zoom.
    pub fn handle_event<S: MapSurface + ?Sized>(
        &mut self,
        event: MapEvent,
        now: Duration,
        surface: &mut S,
    ) -> EventOutcome {
        if matches!(event, MapEvent::ZoomEnd | MapEvent::MoveEnd)
            && let Some(zoom) = surface.zoom()
            && self.set_zoom(zoom, surface)
        {
            return EventOutcome::Reconciled;
        }
        match self.visible {
            VisibleLayer::Trees => self.trees.list.handle_event(event, now, surface),
            VisibleLayer::Clusters => self.clusters.list.handle_event(event, now, surface),
        }
    }

    /// Remove both layers from the surface.
    pub fn clear<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        self.trees.list.clear(surface);
        self.clusters.list.clear(surface);
    }

    fn wanted(&self) -> VisibleLayer {
        if self.zoom >= self.threshold || self.filter_active {
            VisibleLayer::Trees
        } else {
            VisibleLayer::Clusters
        }
    }

    fn apply<S: MapSurface + ?Sized>(&mut self, surface: &mut S) -> bool {
        let wanted = self.wanted();
        if wanted == self.visible {
            return false;
        }
        debug!(from = ?self.visible, to = ?wanted, zoom = self.zoom, "layer switched");
        self.visible = wanted;
        match wanted {
            VisibleLayer::Trees => {
                self.clusters.list.clear(surface);
                self.trees.list.refresh_visibility(surface);
            }
            VisibleLayer::Clusters => {
                self.trees.list.clear(surface);
                self.clusters.list.refresh_visibility(surface);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use verdant_backend::{MarkerId, MarkerSpec};
    use verdant_core::domain::{Region, SensorStatus};
    use verdant_core::geometry::{LatLng, LatLngBounds};
    use verdant_core::icon::Icon;

    #[derive(Default)]
    struct Surface {
        zoom: f64,
        attached: Vec<(MarkerId, String)>,
        icon_updates: usize,
    }

    impl MapSurface for Surface {
        fn bounds(&self) -> Option<LatLngBounds> {
            Some(LatLngBounds::from_bbox([54.0, 9.0, 55.0, 10.0]))
        }

        fn zoom(&self) -> Option<f64> {
            Some(self.zoom)
        }

        fn center(&self) -> Option<LatLng> {
            Some(LatLng::new(54.5, 9.5))
        }

        fn attach_marker(&mut self, marker: &MarkerSpec<'_>) {
            self.attached.push((marker.id, marker.icon.key().to_owned()));
        }

        fn detach_marker(&mut self, id: MarkerId) {
            self.attached.retain(|(m, _)| *m != id);
        }

        fn set_marker_icon(&mut self, id: MarkerId, icon: &Icon) {
            self.icon_updates += 1;
            if let Some(slot) = self.attached.iter_mut().find(|(m, _)| *m == id) {
                slot.1 = icon.key().to_owned();
            }
        }

        fn set_marker_position(&mut self, _id: MarkerId, _position: LatLng) {}
    }

    fn tree(id: i64, status: WateringStatus) -> Tree {
        Tree {
            id,
            number: format!("T-{id}"),
            species: String::new(),
            latitude: 54.5,
            longitude: 9.0 + id as f64 / 100.0,
            planting_year: None,
            watering_status: status,
            tree_cluster_id: None,
            sensor_id: None,
        }
    }

    fn cluster(id: i64, status: WateringStatus, region: &str) -> TreeCluster {
        TreeCluster {
            id,
            name: format!("Cluster {id}"),
            latitude: Some(54.5),
            longitude: Some(9.0 + id as f64 / 100.0),
            tree_ids: Some(vec![1, 2, 3]),
            watering_status: status,
            region: Some(Region {
                id: 1,
                name: region.to_owned(),
            }),
        }
    }

    #[test]
    fn tree_layer_colours_and_tooltips() {
        let mut surface = Surface::default();
        let mut layer = TreeLayer::new(Rc::new(IconCache::new()));
        layer.set_trees(vec![tree(1, WateringStatus::Bad)], &mut surface);

        assert_eq!(surface.attached[0].1, "tree-#C43F3F-false-false");
        let entry = layer.list().registry().get(&EntityKey::Id(1)).unwrap();
        assert_eq!(entry.handle.tooltip().unwrap().content, "T-1");
    }

    #[test]
    fn selection_re_renders_in_place() {
        let mut surface = Surface::default();
        let mut layer = TreeLayer::new(Rc::new(IconCache::new()));
        layer.set_trees(vec![tree(1, WateringStatus::Good), tree(2, WateringStatus::Good)], &mut surface);

        assert!(layer.set_selection([2], Some(1), &mut surface));
        assert!(!layer.set_selection([2], Some(1), &mut surface));
        let keys: Vec<_> = surface.attached.iter().map(|(_, k)| k.as_str()).collect();
        assert_eq!(keys, vec!["tree-#4C7741-false-true", "tree-#4C7741-true-false"]);
        assert_eq!(layer.list().attached_count(), 2);
    }

    #[test]
    fn clusters_without_location_are_dropped() {
        let mut surface = Surface::default();
        let mut layer = ClusterLayer::new(Rc::new(IconCache::new()));
        let mut unplaced = cluster(2, WateringStatus::Good, "Nord");
        unplaced.latitude = None;
        let mut empty = cluster(3, WateringStatus::Good, "Nord");
        empty.tree_ids = None;
        layer.set_clusters(vec![cluster(1, WateringStatus::Good, "Nord"), unplaced, empty], &mut surface);

        assert_eq!(layer.list().len(), 1);
        assert_eq!(surface.attached[0].1, "cluster-#4C7741-false-false-3");
    }

    #[test]
    fn filter_counts_and_matches() {
        let filter = ClusterFilter {
            statuses: vec![WateringStatus::Bad, WateringStatus::Moderate],
            regions: vec!["Süd".into()],
        };
        assert!(filter.is_active());
        assert_eq!(filter.active_count(), 3);
        assert!(filter.matches(&cluster(1, WateringStatus::Bad, "Süd")));
        assert!(!filter.matches(&cluster(1, WateringStatus::Good, "Süd")));
        assert!(!filter.matches(&cluster(1, WateringStatus::Bad, "Nord")));
        assert!(!ClusterFilter::default().is_active());
        assert!(ClusterFilter::default().matches(&cluster(1, WateringStatus::Good, "Nord")));
    }

    #[test]
    fn filter_change_removes_non_matching() {
        let mut surface = Surface::default();
        let mut layer = ClusterLayer::new(Rc::new(IconCache::new()));
        layer.set_clusters(
            vec![cluster(1, WateringStatus::Bad, "Nord"), cluster(2, WateringStatus::Good, "Nord")],
            &mut surface,
        );
        layer.set_filter(
            ClusterFilter {
                statuses: vec![WateringStatus::Bad],
                regions: Vec::new(),
            },
            &mut surface,
        );
        assert_eq!(layer.list().len(), 1);
        assert_eq!(surface.attached.len(), 1);
    }

    #[test]
    fn sensors_share_constant_icon() {
        let mut surface = Surface::default();
        let icons = IconCache::new();
        let mut layer = SensorLayer::new(&icons);
        let sensor = |id: &str, lng: f64| Sensor {
            id: id.into(),
            latitude: 54.5,
            longitude: lng,
            status: SensorStatus::Online,
        };
        layer.set_sensors(vec![sensor("s-1", 9.1), sensor("s-2", 9.2)], &mut surface);
        assert_eq!(layer.list().len(), 2);
        assert!(surface.attached.iter().all(|(_, k)| k == "sensor"));
    }

    #[test]
    fn zoom_switch_keeps_only_visible_layer_attached() {
        let mut surface = Surface {
            zoom: 13.0,
            ..Surface::default()
        };
        let mut layer = TreesAndClusters::new(Rc::new(IconCache::new()), DEFAULT_ZOOM_THRESHOLD, 13.0);
        layer.set_trees(vec![tree(1, WateringStatus::Good), tree(2, WateringStatus::Good)], &mut surface);
        layer.set_clusters(vec![cluster(1, WateringStatus::Good, "Nord")], &mut surface);
        assert_eq!(layer.visible(), VisibleLayer::Clusters);
        assert_eq!(surface.attached.len(), 1);
        assert!(layer.trees().list().is_empty());

        surface.zoom = 17.0;
        assert_eq!(
            layer.handle_event(MapEvent::ZoomEnd, Duration::ZERO, &mut surface),
            EventOutcome::Reconciled
        );
        assert_eq!(layer.visible(), VisibleLayer::Trees);
        assert_eq!(surface.attached.len(), 2);
        assert!(surface.attached.iter().all(|(_, k)| k.starts_with("tree-")));
        assert!(layer.clusters().list().is_empty());
    }

    #[test]
    fn halves_never_reuse_marker_ids() {
        let mut surface = Surface {
            zoom: 17.0,
            ..Surface::default()
        };
        let mut layer = TreesAndClusters::new(Rc::new(IconCache::new()), DEFAULT_ZOOM_THRESHOLD, 17.0);
        layer.set_trees(vec![tree(1, WateringStatus::Good)], &mut surface);
        layer.set_clusters(vec![cluster(1, WateringStatus::Good, "Nord")], &mut surface);
        let tree_marker = layer.trees().list().marker_id(&EntityKey::Id(1)).unwrap();

        layer.set_zoom(13.0, &mut surface);
        let cluster_marker = layer.clusters().list().marker_id(&EntityKey::Id(1)).unwrap();
        assert_ne!(tree_marker, cluster_marker);
        assert_eq!(layer.marker_ids().allocated(), 2);
    }

    fn bad_only() -> TreeFilter {
        TreeFilter {
            statuses: vec![WateringStatus::Bad],
            ..TreeFilter::default()
        }
    }

    #[test]
    fn active_tree_filter_forces_trees() {
        let mut surface = Surface::default();
        let mut layer = TreesAndClusters::new(Rc::new(IconCache::new()), DEFAULT_ZOOM_THRESHOLD, 13.0);
        assert!(layer.set_tree_filter(bad_only(), &mut surface));
        assert_eq!(layer.visible(), VisibleLayer::Trees);
        assert!(!layer.set_zoom(14.0, &mut surface));
        assert!(!layer.set_tree_filter(bad_only(), &mut surface));
        assert!(layer.set_tree_filter(TreeFilter::default(), &mut surface));
        assert_eq!(layer.visible(), VisibleLayer::Clusters);
    }

    #[test]
    fn tree_filter_counts_and_matches() {
        let filter = TreeFilter {
            statuses: vec![WateringStatus::Bad, WateringStatus::Good],
            has_cluster: Some(true),
            planting_years: vec![2019],
        };
        assert_eq!(filter.active_count(), 4);
        let mut planted = tree(1, WateringStatus::Bad);
        planted.tree_cluster_id = Some(7);
        planted.planting_year = Some(2019);
        assert!(filter.matches(&planted));

        let mut loose = planted.clone();
        loose.tree_cluster_id = None;
        assert!(!filter.matches(&loose));
        let mut undated = planted.clone();
        undated.planting_year = None;
        assert!(!filter.matches(&undated));
        let mut dry = planted.clone();
        dry.watering_status = WateringStatus::Moderate;
        assert!(!filter.matches(&dry));

        let without_cluster = TreeFilter {
            has_cluster: Some(false),
            ..TreeFilter::default()
        };
        assert!(without_cluster.is_active());
        assert_eq!(without_cluster.active_count(), 1);
        assert!(without_cluster.matches(&loose));
        assert!(!without_cluster.matches(&planted));

        let mut cleared = filter;
        cleared.clear();
        assert!(!cleared.is_active());
        assert!(cleared.matches(&dry));
    }

    #[test]
    fn tree_filter_limits_pins_to_matching_trees() {
        let mut surface = Surface {
            zoom: 13.0,
            ..Surface::default()
        };
        let mut layer = TreesAndClusters::new(Rc::new(IconCache::new()), DEFAULT_ZOOM_THRESHOLD, 13.0);
        layer.set_trees(
            vec![
                tree(1, WateringStatus::Bad),
                tree(2, WateringStatus::Good),
                tree(3, WateringStatus::Bad),
            ],
            &mut surface,
        );
        layer.set_clusters(vec![cluster(1, WateringStatus::Good, "Nord")], &mut surface);
        assert_eq!(surface.attached.len(), 1);

        assert!(layer.set_tree_filter(bad_only(), &mut surface));
        assert_eq!(layer.trees().list().len(), 2);
        assert!(layer.trees().list().marker_id(&EntityKey::Id(2)).is_none());
        assert_eq!(surface.attached.len(), 2);
        assert!(surface.attached.iter().all(|(_, k)| k == "tree-#C43F3F-false-false"));

        // New data keeps going through the filter.
        layer.set_trees(vec![tree(2, WateringStatus::Good), tree(4, WateringStatus::Bad)], &mut surface);
        assert_eq!(layer.trees().list().len(), 1);
        assert!(layer.trees().list().is_attached(&EntityKey::Id(4)));

        assert!(layer.set_tree_filter(TreeFilter::default(), &mut surface));
        assert_eq!(layer.visible(), VisibleLayer::Clusters);
        assert!(layer.trees().list().is_empty());
        assert_eq!(surface.attached.len(), 1);
    }

    #[test]
    fn zoomed_in_filter_change_reconciles_in_place() {
        let mut surface = Surface {
            zoom: 17.0,
            ..Surface::default()
        };
        let mut layer = TreesAndClusters::new(Rc::new(IconCache::new()), DEFAULT_ZOOM_THRESHOLD, 17.0);
        layer.set_trees(vec![tree(1, WateringStatus::Bad), tree(2, WateringStatus::Good)], &mut surface);
        assert_eq!(surface.attached.len(), 2);

        assert!(layer.set_tree_filter(bad_only(), &mut surface));
        assert_eq!(layer.visible(), VisibleLayer::Trees);
        assert_eq!(surface.attached.len(), 1);

        assert!(layer.set_tree_filter(TreeFilter::default(), &mut surface));
        assert_eq!(layer.visible(), VisibleLayer::Trees);
        assert_eq!(surface.attached.len(), 2);
    }
}
