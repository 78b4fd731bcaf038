// Command-line front end for uuwire.
//
// `encode` wraps files (or stdin) as sections, `decode` writes every section
// of the input into a directory (or the first one to stdout), and `check`
// reports whether the input holds a complete section.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::codec::header::DEFAULT_MODE;
use crate::io::{self as uuio, CountingWriter, EncodeStats};
use crate::section::{DEFAULT_FILENAME, Decoder, EncodeOptions, Encoder};
use crate::transform::{TransformReader, TransformWriter};

const BUF_SIZE: usize = 64 * 1024;

/// Parse a permission mode written in octal (`644`, `0o755`, `0600`).
fn parse_octal_mode(s: &str) -> Result<u32, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    let mode = u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal mode: {e}"))?;
    if mode > 0o7777 {
        return Err(format!("mode {s} out of range"));
    }
    Ok(mode)
}

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Streaming uuencode encoder/decoder.
#[derive(Parser, Debug)]
#[command(
    name = "uuwire",
    version,
    about = "Streaming uuencode encoder/decoder",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats as JSON to stderr.
    #[arg(long = "json", global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Encode files (or stdin) as uuencoded sections.
    Encode(EncodeArgs),
    /// Decode every section of the input.
    Decode(DecodeArgs),
    /// Exit 0 if the input holds a complete section, 1 otherwise.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Output file (default: stdout).
    #[arg(short = 'o', long, value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,

    /// Encode zero bits as space instead of grave accent.
    #[arg(long)]
    space: bool,

    /// Terminate lines with CRLF.
    #[arg(long)]
    crlf: bool,

    /// Header filename when encoding stdin.
    #[arg(long, default_value = DEFAULT_FILENAME)]
    name: String,

    /// Header mode (octal) when encoding stdin.
    #[arg(long, value_parser = parse_octal_mode, default_value = "644")]
    mode: u32,

    /// Files to encode, one section each (default: stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    files: Vec<PathBuf>,
}

#[derive(Args, Debug)]
struct DecodeArgs {
    /// Directory receiving one file per section.
    #[arg(short = 'd', long, default_value = ".", value_hint = ValueHint::DirPath)]
    dir: PathBuf,

    /// Write the first section to stdout instead; surrounding text passes
    /// through.
    #[arg(short = 'c', long, conflicts_with = "dir")]
    stdout: bool,

    /// Input file (default: stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Input file (default: stdin).
    #[arg(value_hint = ValueHint::FilePath)]
    input: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Encode,
    Decode,
    Check,
}

struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    grave: bool,
    eol: &'static str,
    name: String,
    mode: u32,
    use_stdout: bool,
    dir: PathBuf,
    input_files: Vec<PathBuf>,
    output_file: Option<PathBuf>,
}

fn resolve_options(cli: Cli) -> Options {
    let mut opts = Options {
        command: Command::Check,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        grave: true,
        eol: "\n",
        name: DEFAULT_FILENAME.to_owned(),
        mode: DEFAULT_MODE,
        use_stdout: false,
        dir: PathBuf::from("."),
        input_files: Vec::new(),
        output_file: None,
    };

    match cli.command {
        Cmd::Encode(args) => {
            opts.command = Command::Encode;
            opts.grave = !args.space;
            opts.eol = if args.crlf { "\r\n" } else { "\n" };
            opts.name = args.name;
            opts.mode = args.mode;
            opts.input_files = args.files;
            opts.output_file = args.output;
        }
        Cmd::Decode(args) => {
            opts.command = Command::Decode;
            opts.use_stdout = args.stdout;
            opts.dir = args.dir;
            opts.input_files = args.input.into_iter().collect();
        }
        Cmd::Check(args) => {
            opts.input_files = args.input.into_iter().collect();
        }
    }
    opts
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("uuwire".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

fn print_json(value: serde_json::Value) {
    if let Ok(text) = serde_json::to_string_pretty(&value) {
        eprintln!("{text}");
    }
}

fn open_input(path: Option<&PathBuf>) -> Result<Box<dyn Read>, i32> {
    match path {
        Some(path) => match File::open(path) {
            Ok(f) => Ok(Box::new(BufReader::with_capacity(BUF_SIZE, f))),
            Err(e) => {
                eprintln!("uuwire: input file: {}: {e}", path.display());
                Err(1)
            }
        },
        None => Ok(Box::new(BufReader::new(io::stdin()))),
    }
}

fn open_output(opts: &Options) -> Result<Box<dyn Write>, i32> {
    match &opts.output_file {
        None => Ok(Box::new(BufWriter::with_capacity(
            BUF_SIZE,
            io::stdout().lock(),
        ))),
        Some(path) => {
            if path.exists() && !opts.force {
                eprintln!(
                    "uuwire: output file exists, use -f to overwrite: {}",
                    path.display()
                );
                return Err(1);
            }
            match File::create(path) {
                Ok(f) => Ok(Box::new(BufWriter::with_capacity(BUF_SIZE, f))),
                Err(e) => {
                    eprintln!("uuwire: output file: {}: {e}", path.display());
                    Err(1)
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Encode command
// ---------------------------------------------------------------------------

fn cmd_encode(opts: &Options) -> i32 {
    let mut output = match open_output(opts) {
        Ok(w) => w,
        Err(code) => return code,
    };
    let encode_opts = EncodeOptions {
        grave: opts.grave,
        eol: opts.eol.to_owned(),
        filename: Some(opts.name.clone()),
        mode: Some(opts.mode),
    };

    let stats = if opts.input_files.is_empty() {
        let mut input = match open_input(None) {
            Ok(r) => r,
            Err(code) => return code,
        };
        let mut counted = CountingWriter::new(&mut output);
        let mut writer = TransformWriter::new(&mut counted, Encoder::new(encode_opts));
        let result = io::copy(&mut input, &mut writer)
            .and_then(|n| writer.finish().map(|_| n).map_err(io::Error::from));
        match result {
            Ok(input_size) => EncodeStats {
                files: 1,
                input_size,
                output_size: counted.count,
            },
            Err(e) => {
                eprintln!("uuwire: encode error: {e}");
                return 1;
            }
        }
    } else {
        match uuio::encode_files(&mut output, encode_opts, &opts.input_files) {
            Ok(stats) => stats,
            Err(e) => {
                eprintln!("uuwire: encode error: {e}");
                return 1;
            }
        }
    };

    if let Err(e) = output.flush() {
        eprintln!("uuwire: write flush error: {e}");
        return 1;
    }

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "uuwire: encoder: sections: {}, input size: {}, output size: {}",
            stats.files, stats.input_size, stats.output_size
        );
    }
    if opts.json_output {
        print_json(serde_json::json!({
            "command": "encode",
            "sections": stats.files,
            "input_size": stats.input_size,
            "output_size": stats.output_size,
        }));
    }
    0
}

// ---------------------------------------------------------------------------
// Decode command
// ---------------------------------------------------------------------------

fn cmd_decode(opts: &Options) -> i32 {
    let input = match open_input(opts.input_files.first()) {
        Ok(r) => r,
        Err(code) => return code,
    };

    if opts.use_stdout {
        let mut output = BufWriter::with_capacity(BUF_SIZE, io::stdout().lock());
        let mut reader = TransformReader::new(input, Decoder::new());
        let result = io::copy(&mut reader, &mut output).and_then(|n| output.flush().map(|()| n));
        return match result {
            Ok(total) => {
                let decoder = reader.transformer();
                if opts.verbose > 0 && !opts.quiet {
                    eprintln!(
                        "uuwire: decoder: output size: {total}, filename: {}",
                        decoder.filename().unwrap_or("-")
                    );
                }
                if opts.json_output {
                    print_json(serde_json::json!({
                        "command": "decode",
                        "output_size": total,
                        "filename": decoder.filename(),
                        "mode": decoder.mode().map(|m| format!("{m:o}")),
                    }));
                }
                0
            }
            Err(e) => {
                eprintln!("uuwire: decode error: {e}");
                1
            }
        };
    }

    match uuio::decode_to_dir(input, &opts.dir) {
        Ok(stats) => {
            if opts.verbose > 0 && !opts.quiet {
                eprintln!(
                    "uuwire: decoder: sections: {}, files: {}, bytes: {}, failed: {}",
                    stats.sections, stats.files_written, stats.bytes_written, stats.failed
                );
            }
            if opts.json_output {
                print_json(serde_json::json!({
                    "command": "decode",
                    "sections": stats.sections,
                    "files_written": stats.files_written,
                    "bytes_written": stats.bytes_written,
                    "failed": stats.failed,
                }));
            }
            if stats.failed > 0 { 1 } else { 0 }
        }
        Err(e) => {
            eprintln!("uuwire: decode error: {e}");
            1
        }
    }
}

// ---------------------------------------------------------------------------
// Check command
// ---------------------------------------------------------------------------

fn cmd_check(opts: &Options) -> i32 {
    let input = match open_input(opts.input_files.first()) {
        Ok(r) => r,
        Err(code) => return code,
    };
    let found = uuio::has_uuencode(input);
    if !opts.quiet {
        println!("{}", if found { "uuencoded" } else { "not uuencoded" });
    }
    if opts.json_output {
        print_json(serde_json::json!({
            "command": "check",
            "found": found,
        }));
    }
    if found { 0 } else { 1 }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let cli = Cli::parse();
    let opts = resolve_options(cli);

    let exit_code = match opts.command {
        Command::Encode => cmd_encode(&opts),
        Command::Decode => cmd_decode(&opts),
        Command::Check => cmd_check(&opts),
    };

    process::exit(exit_code);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
