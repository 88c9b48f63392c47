//! Fuzz target for IRC message parsing
//!
//! Feeds arbitrary input to the line parser and re-parses whatever it
//! serializes back. Lines that fit without truncation must come back equal.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_client::message::MAX_CONTENT_LENGTH;
use slirc_client::Message;
use std::str;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        if let Ok(msg) = Message::parse(input) {
            let bytes = msg.to_bytes();
            assert!(bytes.len() <= MAX_CONTENT_LENGTH + 2);

            let line = msg.to_string();
            let reparsed = Message::parse(&line);
            // Truncation leaves at least 1019 bytes.
            if line.len() < MAX_CONTENT_LENGTH - 3 {
                assert_eq!(reparsed, Ok(msg), "serialized as {:?}", line);
            }
        }
    }
});
