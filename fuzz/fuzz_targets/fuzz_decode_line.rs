#![no_main]

use libfuzzer_sys::fuzz_target;
use mzchrom::codec::{decode_line, encode_line};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Arbitrary input must either decode or fail gracefully, never panic
    if let Ok(entries) = decode_line(text) {
        // Whatever decodes must re-encode to a line that decodes the same way
        let again = decode_line(&encode_line(&entries)).expect("re-encoded line must decode");
        assert_eq!(entries.len(), again.len());
    }
});
