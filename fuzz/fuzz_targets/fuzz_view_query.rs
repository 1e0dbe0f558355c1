#![no_main]

use libfuzzer_sys::fuzz_target;
use verdant_map::ViewCommit;

fuzz_target!(|data: &[u8]| {
    let Ok(query) = std::str::from_utf8(data) else {
        return;
    };

    // Must never panic, whatever the host router hands over.
    let Ok(view) = ViewCommit::from_query(query) else {
        return;
    };

    assert!((-90.0..=90.0).contains(&view.lat), "lat out of range");
    assert!((-180.0..=180.0).contains(&view.lng), "lng out of range");
    assert!(view.zoom.is_finite() && view.zoom >= 0.0, "bad zoom");

    // A parsed view re-encodes to a query that parses back to itself.
    let again = ViewCommit::from_query(&view.to_query()).expect("re-encoded view parses");
    assert_eq!(again, view);

    // Merging keeps unrelated parameters and replaces the view.
    let merged = view.merge_into_query(query);
    assert_eq!(ViewCommit::from_query(&merged).expect("merged view parses"), view);
});
