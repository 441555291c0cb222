#![no_main]
use libfuzzer_sys::fuzz_target;
use rpmlab_core::{Command, parse_command};

fuzz_target!(|line: &str| {
    match parse_command(line) {
        Ok(Command::Empty) => assert!(line.trim().is_empty()),
        Ok(_) => assert!(!line.trim().is_empty()),
        Err(_) => {}
    }
});
