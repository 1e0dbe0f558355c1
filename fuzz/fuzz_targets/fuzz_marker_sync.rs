#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use verdant_backend::MapEvent;
use verdant_core::domain::Tree;
use verdant_core::entity::EntityKey;
use verdant_core::geometry::LatLngBounds;
use verdant_core::icon::{Icon, IconAnchor};
use verdant_harness::{RecordingSurface, fixtures};
use verdant_map::{IconSource, MarkerList};

#[derive(Debug, Arbitrary)]
enum Op {
    Data(Vec<(u8, u8, u8)>),
    View { south: u8, west: u8, height: u8, width: u8 },
    Unmount,
    Move { dt: u16 },
    MoveEnd,
    Click(u8),
    SwapIcon,
    Clear,
}

fn tree(&(id, lat, lng): &(u8, u8, u8)) -> Tree {
    fixtures::tree(i64::from(id % 32), f64::from(lat % 16), f64::from(lng % 16))
}

fuzz_target!(|ops: Vec<Op>| {
    let mut surface = RecordingSurface::showing_bbox([0.0, 0.0, 8.0, 8.0], 16.0);
    let plain = Icon::new("plain", "", IconAnchor::default());
    let bold = Icon::new("bold", "", IconAnchor::default());
    let mut list = MarkerList::new(IconSource::fixed(plain.clone()))
        .with_key(|t: &Tree| EntityKey::Id(t.id));
    let mut now = Duration::ZERO;
    let mut swapped = false;

    for op in ops.into_iter().take(256) {
        match op {
            Op::Data(items) => {
                let trees = items.iter().take(64).map(tree).collect();
                list.set_data(trees, &mut surface);
            }
            Op::View { south, west, height, width } => {
                let south = f64::from(south % 16);
                let west = f64::from(west % 16);
                surface.set_bounds(LatLngBounds::from_bbox([
                    south,
                    west,
                    south + f64::from(height % 8),
                    west + f64::from(width % 8),
                ]));
            }
            Op::Unmount => surface.unmount(),
            Op::Move { dt } => {
                now += Duration::from_millis(u64::from(dt));
                list.handle_event(MapEvent::Move, now, &mut surface);
            }
            Op::MoveEnd => {
                list.handle_event(MapEvent::MoveEnd, now, &mut surface);
            }
            Op::Click(n) => {
                let id = list.registry().iter().nth(usize::from(n)).map(|(_, e)| e.handle.id());
                if let Some(id) = id {
                    assert!(list.handle_click(id));
                }
            }
            Op::SwapIcon => {
                swapped = !swapped;
                let next = if swapped { bold.clone() } else { plain.clone() };
                list.set_icon_source(IconSource::fixed(next), &mut surface);
            }
            Op::Clear => list.clear(&mut surface),
        }

        assert!(surface.violations().is_empty(), "{:?}", surface.violations());
        assert_eq!(surface.attached_len(), list.attached_count());
        if let Some(bounds) = list.last_bounds() {
            for (_, entry) in list.registry().iter() {
                assert_eq!(entry.attached, bounds.contains(entry.handle.position()));
            }
        }
    }
});
