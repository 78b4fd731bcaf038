use std::io::{self, Read};
use std::thread;

use uuwire::error::{FormatError, UuError};
use uuwire::multi::multi_decoder;
use uuwire::section::{EncodeOptions, Encoder};
use uuwire::transform::{TransformReader, transform_all};

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7) as u8).collect()
}

fn encode_section(data: &[u8], name: &str, mode: u32) -> Vec<u8> {
    let mut enc = Encoder::new(EncodeOptions {
        filename: Some(name.to_string()),
        mode: Some(mode),
        ..Default::default()
    });
    transform_all(&mut enc, data).unwrap()
}

/// Drive a multi-section decoder over `input`, closing the channel after.
fn drive(input: &[u8], decoder: uuwire::section::Decoder) -> Result<u64, UuError> {
    let mut reader = TransformReader::new(input, decoder);
    let driven = io::copy(&mut reader, &mut io::sink());
    let (_, mut decoder) = reader.into_parts();
    decoder.close();
    driven.map_err(UuError::from_io)
}

#[test]
fn two_sections_in_order() {
    let first = payload(5000);
    let second = b"I love you forever.".to_vec();
    let mut input = b"From: someone\n\nPreamble text.\n".to_vec();
    input.extend(encode_section(&first, "first.bin", 0o600));
    input.extend_from_slice(b"between the sections\n");
    input.extend(encode_section(&second, "pp.txt", 0o644));
    input.extend_from_slice(b"-- \nsignature\n");

    let (decoder, _canceller, sections) = multi_decoder();
    let consumer = thread::spawn(move || {
        let mut got = Vec::new();
        for mut section in sections.iter() {
            let mut data = Vec::new();
            section.read_to_end(&mut data).unwrap();
            got.push((
                section.index(),
                section.filename().map(str::to_string),
                section.mode(),
                data,
            ));
        }
        got
    });

    drive(&input, decoder).unwrap();
    let got = consumer.join().unwrap();
    assert_eq!(got.len(), 2);
    assert_eq!(got[0], (0, Some("first.bin".to_string()), Some(0o600), first));
    assert_eq!(got[1], (1, Some("pp.txt".to_string()), Some(0o644), second));
}

#[test]
fn discarded_canceller_leaves_session_running() {
    let mut input = encode_section(b"first", "a.txt", 0o644);
    input.extend(encode_section(b"second", "b.txt", 0o644));

    let (decoder, _, sections) = multi_decoder();
    let consumer = thread::spawn(move || {
        sections
            .iter()
            .map(|mut section| {
                let mut data = Vec::new();
                section.read_to_end(&mut data).unwrap();
                data
            })
            .collect::<Vec<_>>()
    });

    drive(&input, decoder).unwrap();
    assert_eq!(consumer.join().unwrap(), [b"first".to_vec(), b"second".to_vec()]);
}

#[test]
fn cancel_after_partial_read_fails_driver() {
    let input = encode_section(&payload(5000), "big.bin", 0o644);
    let (decoder, canceller, sections) = multi_decoder();
    let consumer = thread::spawn(move || {
        for mut section in sections.iter() {
            let mut buf = [0u8; 4];
            section.read_exact(&mut buf).unwrap();
            canceller.cancel();
            let err = io::copy(&mut section, &mut io::sink()).unwrap_err();
            assert!(matches!(UuError::from_io(err), UuError::Cancelled));
        }
    });

    let err = drive(&input, decoder).unwrap_err();
    assert!(matches!(err, UuError::Cancelled), "unexpected {err:?}");
    consumer.join().unwrap();
}

#[test]
fn cancel_before_driving() {
    let input = encode_section(&payload(5000), "big.bin", 0o644);
    let (decoder, canceller, sections) = multi_decoder();
    canceller.cancel();
    let consumer = thread::spawn(move || sections.iter().count());

    let err = drive(&input, decoder).unwrap_err();
    assert!(matches!(err, UuError::Cancelled));
    assert_eq!(consumer.join().unwrap(), 0);
}

#[test]
fn concurrent_cancel_ends_cleanly() {
    let input = encode_section(&payload(100), "small.bin", 0o644);
    for _ in 0..50 {
        let (decoder, canceller, sections) = multi_decoder();
        let consumer = thread::spawn(move || for _ in sections.iter() {});
        let trigger = thread::spawn(move || canceller.cancel());

        // The race may go either way, but it never hangs and never reports
        // anything other than cancellation.
        match drive(&input, decoder) {
            Ok(_) | Err(UuError::Cancelled) => {}
            Err(other) => panic!("unexpected {other:?}"),
        }
        trigger.join().unwrap();
        consumer.join().unwrap();
    }
}

#[test]
fn cancel_after_completion_is_a_no_op() {
    let input = encode_section(b"done", "d", 0o644);
    let (decoder, canceller, sections) = multi_decoder();
    let consumer = thread::spawn(move || {
        sections
            .iter()
            .map(|mut s| {
                let mut v = Vec::new();
                s.read_to_end(&mut v).unwrap();
                v
            })
            .collect::<Vec<_>>()
    });
    drive(&input, decoder).unwrap();
    canceller.cancel();
    canceller.cancel();
    assert_eq!(consumer.join().unwrap(), vec![b"done".to_vec()]);
}

#[test]
fn closing_a_section_early_keeps_scanning() {
    let mut input = encode_section(&payload(5000), "skipped.bin", 0o644);
    input.extend(encode_section(b"kept", "kept.txt", 0o644));

    let (decoder, _canceller, sections) = multi_decoder();
    let consumer = thread::spawn(move || {
        let mut kept = Vec::new();
        for mut section in sections.iter() {
            if section.index() == 0 {
                let mut buf = [0u8; 4];
                section.read_exact(&mut buf).unwrap();
                section.close();
                continue;
            }
            section.read_to_end(&mut kept).unwrap();
        }
        kept
    });

    drive(&input, decoder).unwrap();
    assert_eq!(consumer.join().unwrap(), b"kept");
}

#[test]
fn held_sections_survive_later_headers() {
    let mut input = encode_section(b"alpha", "a", 0o644);
    input.extend(encode_section(b"beta", "b", 0o600));

    let (decoder, _canceller, sections) = multi_decoder();
    let consumer = thread::spawn(move || {
        let held: Vec<_> = sections
            .iter()
            .map(|mut s| {
                let mut v = Vec::new();
                s.read_to_end(&mut v).unwrap();
                s
            })
            .collect();
        held.iter()
            .map(|s| (s.filename().map(str::to_string), s.mode()))
            .collect::<Vec<_>>()
    });

    drive(&input, decoder).unwrap();
    assert_eq!(
        consumer.join().unwrap(),
        vec![
            (Some("a".to_string()), Some(0o644)),
            (Some("b".to_string()), Some(0o600)),
        ]
    );
}

// ---------------------------------------------------------------------------
// Malformed input
// ---------------------------------------------------------------------------

const BEGIN_LINE: &[u8] = b"begin 666 filename.txt\n";
const END_LINES: &[u8] = b"\n`\nend\n";
const VALID_LINE: &[u8] = b"22!L;W9E('EO=2!F;W)E=F5R+@``";

/// Run the multi decoder with a consumer that reads a little and closes.
fn drive_with_sampling_consumer(input: Vec<u8>) -> Result<u64, UuError> {
    let (decoder, _canceller, sections) = multi_decoder();
    let consumer = thread::spawn(move || {
        for mut section in sections.iter() {
            let mut buf = [0u8; 4];
            let _ = section.read(&mut buf);
            section.close();
        }
    });
    let result = drive(&input, decoder);
    consumer.join().unwrap();
    result
}

#[test]
fn unterminated_long_line_is_line_too_long() {
    let mut input = BEGIN_LINE.to_vec();
    input.resize(5000 - END_LINES.len(), b'a');
    input.extend_from_slice(END_LINES);
    let err = drive_with_sampling_consumer(input).unwrap_err();
    assert!(matches!(err, UuError::LineTooLong { .. }), "unexpected {err:?}");
}

#[test]
fn length_char_above_range_is_bad_format() {
    let mut input = BEGIN_LINE.to_vec();
    input.push(b'a');
    input.extend_from_slice(VALID_LINE);
    input.push(b'\n');
    input.extend_from_slice(END_LINES);
    let err = drive_with_sampling_consumer(input).unwrap_err();
    assert_eq!(err.format_kind(), Some(FormatError::BadChar { byte: b'a' }));
}

#[test]
fn length_char_below_range_is_bad_format() {
    let mut input = BEGIN_LINE.to_vec();
    input.push(0x1f);
    input.extend_from_slice(VALID_LINE);
    input.push(b'\n');
    input.extend_from_slice(END_LINES);
    let err = drive_with_sampling_consumer(input).unwrap_err();
    assert_eq!(err.format_kind(), Some(FormatError::BadChar { byte: 0x1f }));
}

#[test]
fn very_long_begin_line_is_line_too_long() {
    let mut input = b"begin 123 file.log".to_vec();
    input.resize(5000 - END_LINES.len() - VALID_LINE.len() - 1, b'a');
    input.extend_from_slice(VALID_LINE);
    input.push(b'\n');
    input.extend_from_slice(END_LINES);
    let err = drive_with_sampling_consumer(input).unwrap_err();
    assert!(matches!(err, UuError::LineTooLong { offset: 0, .. }), "unexpected {err:?}");
}

#[test]
fn very_long_line_without_begin_is_missing_header() {
    let mut input = b"NO begin string".to_vec();
    input.resize(5000 - END_LINES.len() - VALID_LINE.len() - 1, b'a');
    input.extend_from_slice(VALID_LINE);
    input.push(b'\n');
    input.extend_from_slice(END_LINES);
    let err = drive_with_sampling_consumer(input).unwrap_err();
    assert_eq!(err.format_kind(), Some(FormatError::MissingHeader));
}

#[test]
fn blank_line_ahead_of_trailer() {
    let mut input = BEGIN_LINE.to_vec();
    input.extend_from_slice(b"#0V%T\n");
    input.extend_from_slice(END_LINES);
    input.extend_from_slice(b"begin 644 second\n#9&]G\n");
    input.extend_from_slice(END_LINES);

    let (decoder, _canceller, sections) = multi_decoder();
    let consumer = thread::spawn(move || {
        sections
            .iter()
            .map(|mut section| {
                let mut data = Vec::new();
                section.read_to_end(&mut data).unwrap();
                data
            })
            .collect::<Vec<_>>()
    });

    drive(&input, decoder).unwrap();
    assert_eq!(consumer.join().unwrap(), [b"Cat".to_vec(), b"dog".to_vec()]);
}

#[test]
fn codec_error_fails_the_open_section() {
    let mut input = BEGIN_LINE.to_vec();
    input.extend_from_slice(b"#0V%T\n");
    input.extend_from_slice(b"#0V\n");

    let (decoder, _canceller, sections) = multi_decoder();
    let consumer = thread::spawn(move || {
        let mut section = sections.recv().unwrap();
        let mut data = Vec::new();
        let err = section.read_to_end(&mut data).unwrap_err();
        (data, err.kind())
    });

    let err = drive(&input, decoder).unwrap_err();
    assert_eq!(err.format_kind(), Some(FormatError::Misaligned { len: 2 }));
    let (data, kind) = consumer.join().unwrap();
    assert_eq!(data, b"Cat");
    assert_eq!(kind, io::ErrorKind::InvalidData);
}

#[test]
fn truncated_stream_fails_the_open_section() {
    let mut input = BEGIN_LINE.to_vec();
    input.extend_from_slice(b"#0V%T\n");

    let (decoder, _canceller, sections) = multi_decoder();
    let consumer = thread::spawn(move || {
        let mut section = sections.recv().unwrap();
        let mut data = Vec::new();
        section.read_to_end(&mut data).unwrap_err().kind()
    });

    let err = drive(&input, decoder).unwrap_err();
    assert_eq!(err.format_kind(), Some(FormatError::Truncated));
    assert_eq!(consumer.join().unwrap(), io::ErrorKind::InvalidData);
}
