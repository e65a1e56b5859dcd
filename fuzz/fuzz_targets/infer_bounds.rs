#![no_main]

//! Fuzz target for constraint-rule bound inference.

use fieldfix_domain::{display_value, infer_bounds, infer_bounds_legacy};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let rule = String::from_utf8_lossy(data);
    for bounds in [infer_bounds(&rule), infer_bounds_legacy(&rule)] {
        assert!(bounds.min() <= bounds.max());
        let shown = display_value(&rule, bounds);
        assert!(bounds.contains(shown));
    }
});
