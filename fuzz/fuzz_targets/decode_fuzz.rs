#![no_main]
use libfuzzer_sys::fuzz_target;
use uuwire::section::Decoder;
use uuwire::transform::transform_all;

fuzz_target!(|data: &[u8]| {
    // The decoder must never panic, only return errors.
    let _ = transform_all(&mut Decoder::new(), data);

    // Also fuzz the body with a valid header in front.
    let mut framed = b"begin 644 fuzz.bin\n".to_vec();
    framed.extend_from_slice(data);
    let _ = transform_all(&mut Decoder::new(), &framed);
});
