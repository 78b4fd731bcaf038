#![no_main]
use std::io::{self, Read};
use std::thread;

use libfuzzer_sys::fuzz_target;
use uuwire::multi::multi_decoder;
use uuwire::transform::TransformReader;

fuzz_target!(|data: &[u8]| {
    // The multi-section session must neither panic nor hang on any input.
    let (decoder, _canceller, sections) = multi_decoder();
    let consumer = thread::spawn(move || {
        for mut section in sections.iter() {
            let _ = io::copy(&mut section, &mut io::sink());
        }
    });
    let mut reader = TransformReader::new(data, decoder);
    let mut out = Vec::new();
    let _ = reader.read_to_end(&mut out);
    reader.into_parts().1.close();
    consumer.join().unwrap();
});
