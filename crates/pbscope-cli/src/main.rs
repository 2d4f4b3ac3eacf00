//! pbscope - Inspect Protocol Buffer wire data
//!
//! This tool encodes JSON documents against `.proto` schemas and decodes raw
//! protobuf bytes into a field tree without needing a schema.

use anyhow::{bail, Context, Result};
use clap::builder::RangedU64ValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use pbscope_core::render::{render_table, write_items};
use pbscope_core::{DecodedItem, Decoder, DecoderConfig, Encoder, EncoderConfig, StatsWriter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, Level};
use tracing_subscriber::EnvFilter;

/// Inspect Protocol Buffer wire data
#[derive(Parser, Debug)]
#[command(name = "pbscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a JSON document as the root message of a schema
    Encode {
        #[command(flatten)]
        source: EncodeArgs,

        /// Write the encoded bytes to this file instead of printing hex
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Decode raw protobuf bytes without a schema
    Decode {
        #[command(flatten)]
        input: DecodeInput,

        #[command(flatten)]
        view: ViewArgs,
    },

    /// Encode a JSON document, then decode the resulting bytes
    Inspect {
        #[command(flatten)]
        source: EncodeArgs,

        #[command(flatten)]
        view: ViewArgs,

        /// Also save the encoded bytes to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Path to the .proto schema
    #[arg(short, long)]
    schema: PathBuf,

    /// Path to the JSON document
    #[arg(short, long)]
    data: PathBuf,

    /// Message type the document is encoded as
    #[arg(long, default_value = pbscope_core::encoder::DEFAULT_ROOT_MESSAGE)]
    root: String,

    /// Ignore JSON keys that name no field instead of failing
    #[arg(long)]
    allow_unknown_fields: bool,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct DecodeInput {
    /// Path to a file of raw protobuf bytes
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Protobuf bytes as hex (whitespace allowed)
    #[arg(long)]
    hex: Option<String>,
}

#[derive(Args, Debug)]
struct ViewArgs {
    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// Maximum nesting depth to expand
    #[arg(
        long,
        default_value_t = pbscope_core::decoder::DEFAULT_MAX_DEPTH,
        value_parser = RangedU64ValueParser::<usize>::new()
            .range(1..=pbscope_core::decoder::MAX_SUPPORTED_DEPTH as u64)
    )]
    max_depth: usize,

    /// Number of LEN payload bytes shown before the dump is cut
    #[arg(long, default_value_t = pbscope_core::decoder::DEFAULT_HEX_DUMP_CAP)]
    hex_cap: usize,
}

/// Output format for decoded trees
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Aligned WireType / FieldTag / Length / Value table
    Table,
    /// JSON array of items
    Json,
    /// Item counts only
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Encode { source, output } => run_encode(source, output.as_deref()),
        Command::Decode { input, view } => run_decode(input, view),
        Command::Inspect {
            source,
            view,
            output,
        } => run_inspect(source, view, output.as_deref()),
    }
}

/// Encode and either save or print the bytes
fn run_encode(source: &EncodeArgs, output: Option<&Path>) -> Result<()> {
    let bytes = encode_source(source)?;

    match output {
        Some(path) => write_bytes(path, &bytes)?,
        None => println!("{}", pbscope_core::decoder::hex_dump(&bytes, usize::MAX)),
    }
    Ok(())
}

/// Decode bytes from a file or a hex argument
fn run_decode(input: &DecodeInput, view: &ViewArgs) -> Result<()> {
    let items = if let Some(ref file) = input.file {
        trace!("Reading {}", file.display());
        decoder(view)
            .decode_file(file)
            .with_context(|| format!("Failed to decode {}", file.display()))?
    } else if let Some(ref hex) = input.hex {
        decode_bytes(&parse_hex(hex)?, view)?
    } else {
        bail!("Either --file or --hex must be specified")
    };

    print_items(&items, view.format)
}

/// Encode, optionally save, then decode and print
fn run_inspect(source: &EncodeArgs, view: &ViewArgs, output: Option<&Path>) -> Result<()> {
    let bytes = encode_source(source)?;

    if let Some(path) = output {
        write_bytes(path, &bytes)?;
    }

    let items = decode_bytes(&bytes, view)?;
    print_items(&items, view.format)
}

fn encode_source(source: &EncodeArgs) -> Result<Vec<u8>> {
    let schema = fs::read_to_string(&source.schema)
        .with_context(|| format!("Failed to read schema: {}", source.schema.display()))?;
    let data = fs::read_to_string(&source.data)
        .with_context(|| format!("Failed to read data: {}", source.data.display()))?;

    let config = EncoderConfig::new()
        .root_message(source.root.as_str())
        .deny_unknown_fields(!source.allow_unknown_fields);
    let bytes = Encoder::new()
        .with_config(config)
        .encode(&schema, &data)
        .with_context(|| format!("Failed to encode {}", source.data.display()))?;

    info!("Encoded {} bytes", bytes.len());
    Ok(bytes)
}

fn decoder(view: &ViewArgs) -> Decoder {
    let config = DecoderConfig::new()
        .max_depth(view.max_depth)
        .hex_dump_cap(view.hex_cap);
    Decoder::with_config(config)
}

fn decode_bytes(bytes: &[u8], view: &ViewArgs) -> Result<Vec<DecodedItem>> {
    let items = decoder(view)
        .decode(bytes)
        .context("Input is not valid protobuf wire data")?;

    debug!("Decoded {} top-level fields from {} bytes", items.len(), bytes.len());
    Ok(items)
}

fn print_items(items: &[DecodedItem], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => print!("{}", render_table(items)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
        OutputFormat::Stats => {
            let mut stats = StatsWriter::default();
            write_items(&mut stats, items)?;
            println!("{}", stats);
        }
    }
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, bytes).with_context(|| format!("Failed to write file: {}", path.display()))?;
    println!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Parse a hex string such as `0a 04 08 02` into bytes
fn parse_hex(input: &str) -> Result<Vec<u8>> {
    let digits: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = digits.strip_prefix("0x").unwrap_or(&digits);

    hex::decode(digits).context("Invalid hex input")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SCHEMA: &str = r#"
        syntax = "proto3";
        message Point { int32 x = 1; int32 y = 2; }
        message Root { Point point = 1; int32 distance = 2; }
    "#;

    fn encode_args(dir: &TempDir, data: &str) -> EncodeArgs {
        let schema = dir.path().join("root.proto");
        let json = dir.path().join("data.json");
        fs::write(&schema, SCHEMA).unwrap();
        fs::write(&json, data).unwrap();

        EncodeArgs {
            schema,
            data: json,
            root: "Root".to_string(),
            allow_unknown_fields: false,
        }
    }

    fn default_view() -> ViewArgs {
        ViewArgs {
            format: OutputFormat::Table,
            max_depth: pbscope_core::decoder::DEFAULT_MAX_DEPTH,
            hex_cap: pbscope_core::decoder::DEFAULT_HEX_DUMP_CAP,
        }
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("0a 04 08 02").unwrap(), vec![0x0a, 0x04, 0x08, 0x02]);
        assert_eq!(parse_hex("0x1064").unwrap(), vec![0x10, 0x64]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
    }

    #[test]
    fn test_parse_hex_non_ascii() {
        let err = parse_hex("a\u{e9}0").unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid hex input"));
        assert!(parse_hex("\u{e9}\u{e9}").is_err());
    }

    #[test]
    fn test_run_decode_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, [0x10, 0x64]).unwrap();

        let input = DecodeInput {
            file: Some(path),
            hex: None,
        };
        run_decode(&input, &default_view()).unwrap();

        let input = DecodeInput {
            file: Some(dir.path().join("missing.bin")),
            hex: None,
        };
        let err = run_decode(&input, &default_view()).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read file"));
    }

    #[test]
    fn test_max_depth_range() {
        let args = ["pbscope", "decode", "--hex", "0a00", "--max-depth"];
        let parse = |depth: &str| Cli::try_parse_from(args.iter().copied().chain([depth]));

        assert!(parse("256").is_ok());
        assert!(parse("257").is_err());
        assert!(parse("0").is_err());
        match parse("12").unwrap().command {
            Command::Decode { view, .. } => assert_eq!(view.max_depth, 12),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_encode_source() {
        let dir = TempDir::new().unwrap();
        let args = encode_args(&dir, r#"{"point":{"x":2,"y":1},"distance":100}"#);
        let bytes = encode_source(&args).unwrap();
        assert_eq!(bytes, vec![0x0a, 0x04, 0x08, 0x02, 0x10, 0x01, 0x10, 0x64]);
    }

    #[test]
    fn test_encode_source_reports_error() {
        let dir = TempDir::new().unwrap();
        let args = encode_args(&dir, r#"{"distance": }"#);
        let err = encode_source(&args).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid JSON"));
    }

    #[test]
    fn test_inspect_writes_output() {
        let dir = TempDir::new().unwrap();
        let args = encode_args(&dir, r#"{"distance":100}"#);
        let output = dir.path().join("out/data.bin");

        run_inspect(&args, &default_view(), Some(&output)).unwrap();
        assert_eq!(fs::read(&output).unwrap(), vec![0x10, 0x64]);
    }

    #[test]
    fn test_decode_bytes_respects_depth() {
        let view = ViewArgs {
            max_depth: 1,
            ..default_view()
        };
        let items = decode_bytes(&[0x0a, 0x02, 0x08, 0x01], &view).unwrap();
        assert!(items[0].sub_items.is_empty());
    }

    #[test]
    fn test_decode_bytes_invalid() {
        let err = decode_bytes(&[0x80], &default_view()).unwrap_err();
        assert!(format!("{:#}", err).contains("cannot read type"));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
