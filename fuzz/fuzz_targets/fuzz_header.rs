#![no_main]

use libfuzzer_sys::fuzz_target;
use mzchrom::header::ChromHeader;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Header parsing must reject malformed property files without panicking
    if let Ok(header) = ChromHeader::read_from(Cursor::new(data)) {
        let mut written = Vec::new();
        header.write_to(&mut written).expect("writing to a Vec cannot fail");
        let _ = ChromHeader::read_from(Cursor::new(written));
    }
});
