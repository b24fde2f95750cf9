//! Fuzz target for Frame::decode
//!
//! This fuzzer feeds arbitrary text to the frame decoder to find:
//! - Parser crashes or panics
//! - Oversized input that bypasses the size check
//! - Frames that decode but do not survive re-encoding
//! - Known kinds reported as unknown
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use unichat_proto::{Decoded, EventKind, Frame, MAX_FRAME_SIZE};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    match Frame::decode(&text) {
        Ok(Decoded::Frame(frame)) => {
            assert!(text.len() <= MAX_FRAME_SIZE);
            let encoded = frame.encode().expect("decoded frames re-encode");
            match Frame::decode(&encoded) {
                Ok(Decoded::Frame(again)) => assert_eq!(again, frame),
                other => panic!("re-encoded frame decoded as {other:?}"),
            }
        },
        Ok(Decoded::Unknown { kind }) => assert!(EventKind::from_wire(&kind).is_none()),
        Err(_) => {},
    }
});
