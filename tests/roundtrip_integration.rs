use std::io::{Read, Write};

use uuwire::error::FormatError;
use uuwire::section::{Decoder, EncodeOptions, Encoder};
use uuwire::transform::{
    Progress, Status, Transform, TransformReader, TransformWriter, transform_all,
};

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 + 7) as u8).collect()
}

fn encode(data: &[u8], opts: EncodeOptions) -> Vec<u8> {
    transform_all(&mut Encoder::new(opts), data).unwrap()
}

fn decode(encoded: &[u8]) -> Vec<u8> {
    transform_all(&mut Decoder::new(), encoded).unwrap()
}

#[test]
fn roundtrip_boundary_sizes() {
    for len in [0, 1, 2, 3, 43, 44, 45, 46, 89, 90, 91, 1000, 4096, 100_000] {
        let data = payload(len);
        let encoded = encode(&data, EncodeOptions::default());
        assert_eq!(decode(&encoded), data, "len={len}");
    }
}

#[test]
fn encoded_layout() {
    let encoded = encode(&payload(91), EncodeOptions::default());
    let text = String::from_utf8(encoded).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "begin 644 data");
    assert!(lines[1].starts_with('M') && lines[1].len() == 61);
    assert!(lines[2].starts_with('M') && lines[2].len() == 61);
    assert_eq!(lines[3].len(), 1 + 4);
    assert_eq!(&lines[4..], ["`", "end"]);
}

#[test]
fn every_line_style_roundtrips() {
    for grave in [true, false] {
        for eol in ["\n", "\r\n"] {
            let data = payload(500);
            let encoded = encode(
                &data,
                EncodeOptions {
                    grave,
                    eol: eol.to_string(),
                    ..Default::default()
                },
            );
            if !grave {
                assert!(
                    !encoded[..encoded.len() - 8].contains(&b'`'),
                    "grave in body with grave off"
                );
            }
            assert_eq!(decode(&encoded), data, "grave={grave} eol={eol:?}");
        }
    }
}

#[test]
fn streaming_reader_and_writer_agree() {
    let data = payload(20_000);

    let mut via_reader = Vec::new();
    TransformReader::new(&data[..], Encoder::default())
        .read_to_end(&mut via_reader)
        .unwrap();

    let mut writer = TransformWriter::new(Vec::new(), Encoder::default());
    for chunk in data.chunks(7) {
        writer.write_all(chunk).unwrap();
    }
    let (via_writer, _) = writer.finish().unwrap();
    assert_eq!(via_reader, via_writer);

    let mut decoded = Vec::new();
    let mut writer = TransformWriter::new(&mut decoded, Decoder::new());
    for chunk in via_writer.chunks(13) {
        writer.write_all(chunk).unwrap();
    }
    let (_, decoder) = writer.finish().unwrap();
    assert_eq!(decoded, data);
    assert_eq!(decoder.filename(), Some("data"));
}

#[test]
fn short_destination_then_retry() {
    let src = b"begin 644 file.txt\n#0V%T\n`\nend\n";
    let mut decoder = Decoder::new();

    let mut tiny = [0u8; 2];
    let first = decoder.transform(&mut tiny, src, true).unwrap();
    assert_eq!(first.status, Status::ShortDst);
    assert_eq!(first.written, 0);

    let mut room = [0u8; 64];
    let second = decoder
        .transform(&mut room, &src[first.consumed..], true)
        .unwrap();
    assert_eq!(second, Progress::new(src.len() - first.consumed, 3, Status::Done));
    assert_eq!(&room[..3], b"Cat");
}

#[test]
fn decoder_reset_between_inputs() {
    let mut decoder = Decoder::new();
    let a = encode(b"first", EncodeOptions::default());
    let b = encode(
        b"second",
        EncodeOptions {
            filename: Some("b.txt".into()),
            mode: Some(0o600),
            ..Default::default()
        },
    );
    assert_eq!(transform_all(&mut decoder, &a).unwrap(), b"first");
    decoder.reset();
    assert_eq!(transform_all(&mut decoder, &b).unwrap(), b"second");
    assert_eq!(decoder.filename(), Some("b.txt"));
    assert_eq!(decoder.mode(), Some(0o600));
}

#[test]
fn header_without_name_or_octal_mode() {
    let mut decoder = Decoder::new();
    let out = transform_all(&mut decoder, b"begin 9z9\n#0V%T\n`\nend\n").unwrap();
    assert_eq!(out, b"Cat");
    assert_eq!(decoder.mode(), None);
    assert_eq!(decoder.filename(), None);
}

#[test]
fn filename_with_spaces() {
    let mut decoder = Decoder::new();
    transform_all(&mut decoder, b"begin 644 my  long\tname.txt\r\n#0V%T\r\n`\r\nend\r\n").unwrap();
    assert_eq!(decoder.filename(), Some("my long name.txt"));
}

#[test]
fn bad_character_reports_offset() {
    let input = b"begin 644 f\n#0V%T\n#0V\x7fT\n`\nend\n";
    let err = transform_all(&mut Decoder::new(), input).unwrap_err();
    match err {
        uuwire::UuError::BadFormat { offset, kind } => {
            assert_eq!(kind, FormatError::BadChar { byte: 0x7f });
            assert_eq!(offset, (12 + 6 + 3) as u64);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn missing_end_line() {
    let err = transform_all(&mut Decoder::new(), b"begin 644 f\n#0V%T\n`\nnot end\n").unwrap_err();
    assert_eq!(err.format_kind(), Some(FormatError::MissingEnd));
}

#[test]
fn padding_of_three_is_rejected() {
    // Declares 2 bytes but carries two quanta (capacity 6).
    let err = transform_all(&mut Decoder::new(), b"begin 644 f\n\"0V%T0V%T\n`\nend\n").unwrap_err();
    assert!(matches!(
        err.format_kind(),
        Some(FormatError::BadPadding { padding: 4, .. })
    ));
}
