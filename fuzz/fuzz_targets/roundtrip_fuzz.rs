#![no_main]
use std::io::Read;

use libfuzzer_sys::fuzz_target;
use uuwire::section::{Decoder, EncodeOptions, Encoder};
use uuwire::transform::{TransformReader, transform_all};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    // Use first byte as control flags.
    let flags = data[0];
    let payload = &data[1..];
    let opts = EncodeOptions {
        grave: flags & 1 != 0,
        eol: if flags & 2 != 0 { "\r\n" } else { "\n" }.to_string(),
        mode: Some(u32::from(flags) & 0o777),
        ..Default::default()
    };

    let encoded = transform_all(&mut Encoder::new(opts), payload).unwrap();

    let mut decoded = Vec::new();
    TransformReader::new(&encoded[..], Decoder::new())
        .read_to_end(&mut decoded)
        .unwrap();
    assert_eq!(decoded, payload);
});
