#![forbid(unsafe_code)]

//! A mounted session driven the way a host widget drives it.
//!
//! Run:
//!   cargo test -p verdant-map --test session_flow

use std::collections::BTreeSet;
use std::time::Duration;

use pretty_assertions::assert_eq;
use verdant_backend::{MapEvent, MarkerId};
use verdant_core::geometry::LatLng;
use verdant_harness::{RecordingSurface, fixtures};
use verdant_map::{
    EventOutcome, ManualClock, MapConfig, MapSession, ViewCommit, ViewportSize, ViewportTracker,
    VisibleLayer,
};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

struct Host {
    session: MapSession<ManualClock>,
    viewport: ViewportTracker,
    surface: RecordingSurface,
}

impl Host {
    fn mount(config: &MapConfig) -> Self {
        let session = MapSession::new(config, ManualClock::new());
        let viewport = config.to_camera().viewport(ViewportSize::new(800.0, 600.0));
        let mut surface = RecordingSurface::unmounted();
        surface.set_view(viewport.center(), viewport.zoom(), viewport.bounds());
        Self {
            session,
            viewport,
            surface,
        }
    }

    fn sync(&mut self) {
        self.surface
            .set_view(self.viewport.center(), self.viewport.zoom(), self.viewport.bounds());
    }

    fn send(&mut self, event: MapEvent) -> EventOutcome {
        self.session.handle_event(event, &mut self.surface)
    }

    fn advance(&self, step: u64) {
        self.session.clock().advance(ms(step));
    }

    fn load(&mut self) {
        let center = self.viewport.center();
        let trees = fixtures::tree_grid(
            LatLng::new(center.lat - 0.001, center.lng - 0.002),
            5,
            3,
            0.001,
        );
        let clusters = vec![
            fixtures::cluster(1, center.lat, center.lng, 8),
            fixtures::cluster(2, center.lat + 0.01, center.lng + 0.01, 4),
            fixtures::unplaced_cluster(3),
        ];
        let sensors = vec![fixtures::sensor("kit-1", center.lat, center.lng + 0.0005)];
        self.session.layers_mut().set_trees(trees, &mut self.surface);
        self.session
            .layers_mut()
            .set_clusters(clusters, &mut self.surface);
        self.session
            .sensors_mut()
            .set_sensors(sensors, &mut self.surface);
    }
}

#[test]
fn zooming_in_swaps_clusters_for_trees_and_commits_the_view() {
    let mut host = Host::mount(&MapConfig::default());
    host.load();
    assert_eq!(host.session.layers().visible(), VisibleLayer::Clusters);
    assert_eq!(host.session.layers().clusters().list().len(), 2);
    assert!(host.session.layers().trees().list().is_empty());

    host.viewport.zoom_to(17.0);
    host.sync();
    assert_eq!(host.send(MapEvent::ZoomEnd), EventOutcome::Reconciled);
    assert_eq!(host.session.layers().visible(), VisibleLayer::Trees);
    assert!(host.session.layers().clusters().list().is_empty());
    assert_eq!(host.session.layers().trees().list().len(), 15);

    assert_eq!(host.session.tick(), None);
    host.advance(149);
    assert_eq!(host.session.tick(), None);
    host.advance(1);
    let commit = host.session.tick().expect("commit after quiet period");
    assert_eq!(commit.zoom, 17.0);
    assert_eq!(host.session.camera().camera().zoom, 17.0);
    assert_eq!(
        commit.merge_into_query("?tree=12&zoom=13"),
        format!("tree=12&{}", commit.to_query())
    );
    assert_eq!(ViewCommit::from_query(&commit.to_query()), Ok(commit));
    host.surface.assert_clean();
}

#[test]
fn sensor_and_layer_markers_never_share_ids() {
    let mut host = Host::mount(&MapConfig::default());
    host.viewport.zoom_to(17.0);
    host.sync();
    host.send(MapEvent::ZoomEnd);
    host.load();

    let mut ids: Vec<MarkerId> = host
        .session
        .layers()
        .trees()
        .list()
        .registry()
        .iter()
        .map(|(_, e)| e.handle.id())
        .collect();
    ids.extend(
        host.session
            .sensors()
            .list()
            .registry()
            .iter()
            .map(|(_, e)| e.handle.id()),
    );
    let distinct: BTreeSet<_> = ids.iter().copied().collect();
    assert_eq!(distinct.len(), ids.len());
    assert_eq!(host.surface.attached_len(), ids.len());
    host.surface.assert_clean();
}

#[test]
fn drag_burst_commits_once_after_it_settles() {
    let mut host = Host::mount(&MapConfig::default());
    host.load();

    for _ in 0..5 {
        host.viewport.pan_by(40.0, 0.0);
        host.sync();
        host.send(MapEvent::Move);
        host.send(MapEvent::DragEnd);
        host.advance(100);
        assert_eq!(host.session.tick(), None);
    }
    host.advance(50);
    let commit = host.session.tick().expect("settled drag commits");
    assert_eq!(commit.lng, host.viewport.center().lng);
    assert_eq!(host.session.camera().commits(), 1);
}

#[test]
fn unmount_clears_everything_and_drops_pending_commit() {
    let mut host = Host::mount(&MapConfig::default());
    host.load();
    assert!(host.surface.attached_len() > 0);

    host.viewport.pan_by(100.0, 0.0);
    host.sync();
    host.send(MapEvent::DragEnd);
    host.session.unmount(&mut host.surface);
    host.advance(500);

    assert_eq!(host.session.tick(), None);
    assert_eq!(host.surface.attached_len(), 0);
    assert!(host.session.sensors().list().is_empty());
    host.surface.assert_clean();
}

#[test]
fn config_throttle_reaches_every_list() {
    let mut config = MapConfig::default();
    config.sync.throttle_ms = 400;
    let mut host = Host::mount(&config);
    host.load();

    let mut reconciled = 0;
    for _ in 0..10 {
        host.viewport.pan_by(5.0, 0.0);
        host.sync();
        if host.send(MapEvent::Move) == EventOutcome::Reconciled {
            reconciled += 1;
        }
        host.advance(100);
    }
    // Moves at 0..900 ms in 100 ms steps: admitted at 0, 400, 800.
    assert_eq!(reconciled, 3);
    assert_eq!(host.session.sensors().list().throttle_stats().admitted, 3);
}
