#![no_main]
use libfuzzer_sys::fuzz_target;
use rpmlab_config::{CAPTURE_HEADER, parse_capture};

fuzz_target!(|text: &str| {
    if parse_capture(text).is_ok() {
        assert!(text.contains(CAPTURE_HEADER));
    }
});
