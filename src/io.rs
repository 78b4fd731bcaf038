// File-level helpers around the section transformers.
//
// - `encode_files()` writes one section per file into a single writer.
// - `decode_to_dir()` runs the multi-section decoder over a reader and writes
//   every section into a directory, one file per section.
// - `has_uuencode()` probes a reader for a complete section.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::thread;

use log::{debug, warn};

use crate::error::UuError;
use crate::multi::{self, Canceller, Section};
use crate::section::{Decoder, EncodeOptions, Encoder};
use crate::transform::TransformReader;

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `encode_files()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeStats {
    /// Number of sections written.
    pub files: u64,
    /// Payload bytes read from the input files.
    pub input_size: u64,
    /// Encoded bytes written.
    pub output_size: u64,
}

/// Statistics returned by `decode_to_dir()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// `begin` headers found in the input.
    pub sections: u64,
    /// Section files written completely.
    pub files_written: u64,
    /// Payload bytes written across all section files.
    pub bytes_written: u64,
    /// Sections whose file could not be created or completed.
    pub failed: u64,
}

// ---------------------------------------------------------------------------
// encode_files
// ---------------------------------------------------------------------------

/// Encode `files` as consecutive sections into `out`.
///
/// Each header carries the file's base name and permission bits. `opts`
/// supplies the line style; its `filename`/`mode` are replaced per file.
pub fn encode_files<W, P>(out: W, opts: EncodeOptions, files: &[P]) -> Result<EncodeStats, UuError>
where
    W: Write,
    P: AsRef<Path>,
{
    if files.is_empty() {
        return Err(UuError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            "nothing to encode",
        )));
    }

    let mut out = CountingWriter::new(BufWriter::with_capacity(BUF_SIZE, out));
    let mut encoder = Encoder::new(opts);
    let mut stats = EncodeStats::default();

    for path in files {
        let path = path.as_ref();
        let file = File::open(path)?;
        let meta = file.metadata()?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        encoder.retarget(permission_bits(&meta), &name);
        debug!("encoding {} as {name:?}", path.display());

        let mut reader = TransformReader::new(BufReader::with_capacity(BUF_SIZE, file), &mut encoder);
        io::copy(&mut reader, &mut out).map_err(UuError::from_io)?;

        stats.files += 1;
        stats.input_size += meta.len();
    }

    out.flush()?;
    stats.output_size = out.count;
    Ok(stats)
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        crate::codec::header::DEFAULT_MODE
    }
}

// ---------------------------------------------------------------------------
// decode_to_dir
// ---------------------------------------------------------------------------

/// Decode every section of `input` into a file under `dir`.
///
/// See [`decode_to_dir_with`].
pub fn decode_to_dir<R: Read>(input: R, dir: &Path) -> Result<DecodeStats, UuError> {
    decode_to_dir_with(input, dir, |_| {})
}

/// Decode every section of `input` into a file under `dir`, handing the
/// session's [`Canceller`] to `on_start` before scanning begins.
///
/// Files are named after the header filename (base name only); nameless
/// sections become `section-<index>.bin`. Existing files are overwritten. The
/// directory is created when the first section arrives. A section that cannot
/// be written is logged and skipped; scanning continues. The returned error is
/// the scanner's: a codec error, an I/O error on `input`, or `Cancelled`.
pub fn decode_to_dir_with<R, F>(input: R, dir: &Path, on_start: F) -> Result<DecodeStats, UuError>
where
    R: Read,
    F: FnOnce(Canceller),
{
    let (decoder, canceller, sections) = multi::multi_decoder();
    on_start(canceller);

    thread::scope(|scope| {
        let writer = scope.spawn(move || {
            let mut stats = DecodeStats::default();
            let mut dir_ready = false;
            for mut section in sections.iter() {
                match write_section(&mut section, dir, &mut dir_ready) {
                    Ok(n) => {
                        stats.files_written += 1;
                        stats.bytes_written += n;
                    }
                    Err(e) => {
                        warn!("section {}: {e}", section.index());
                        stats.failed += 1;
                    }
                }
            }
            stats
        });

        let mut reader = TransformReader::new(input, decoder);
        let driven = io::copy(&mut reader, &mut io::sink());
        let (_, mut decoder) = reader.into_parts();
        decoder.close();
        let found = decoder.sections_found();
        drop(decoder);

        let mut stats = writer
            .join()
            .map_err(|_| UuError::Io(io::Error::other("section writer panicked")))?;
        driven.map_err(UuError::from_io)?;
        stats.sections = found;
        Ok(stats)
    })
}

fn section_path(dir: &Path, section: &Section) -> PathBuf {
    let name = section
        .filename()
        .and_then(|n| Path::new(n).file_name())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(format!("section-{}.bin", section.index())));
    dir.join(name)
}

fn write_section(section: &mut Section, dir: &Path, dir_ready: &mut bool) -> io::Result<u64> {
    if !*dir_ready {
        fs::create_dir_all(dir)?;
        *dir_ready = true;
    }
    let path = section_path(dir, section);
    let mut file = BufWriter::with_capacity(BUF_SIZE, File::create(&path)?);
    let n = io::copy(section, &mut file)?;
    let file = file.into_inner().map_err(|e| e.into_error())?;
    if let Some(mode) = section.mode() {
        apply_mode(&file, mode)?;
    }
    debug!("section {} written to {} ({n} bytes)", section.index(), path.display());
    Ok(n)
}

#[cfg(unix)]
fn apply_mode(file: &File, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(mode & 0o777))
}

#[cfg(not(unix))]
fn apply_mode(_file: &File, _mode: u32) -> io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// Whether `input` holds at least one complete, well-formed section.
///
/// Runs a full single-section decode and discards the output.
pub fn has_uuencode<R: Read>(input: R) -> bool {
    let mut reader = TransformReader::new(input, Decoder::new());
    io::copy(&mut reader, &mut io::sink()).is_ok()
}

// ---------------------------------------------------------------------------
// Counting writer
// ---------------------------------------------------------------------------

pub(crate) struct CountingWriter<W: Write> {
    inner: W,
    pub(crate) count: u64,
}

impl<W: Write> CountingWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
