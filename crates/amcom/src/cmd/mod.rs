use clap::{Args, Subcommand};
use std::fs;
use std::path::PathBuf;

use crate::exit::{io_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod checksum;
pub mod decode;
pub mod encode;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serialize one packet into a wire frame.
    Encode(EncodeArgs),
    /// Read a byte stream and print every verified packet.
    Decode(DecodeArgs),
    /// Compute the frame checksum of arbitrary bytes.
    Checksum(ChecksumArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, max_payload: u8) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format, max_payload),
        Command::Decode(args) => decode::run(args, format, max_payload),
        Command::Checksum(args) => checksum::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Bytes supplied inline, as hex, or from a file.
#[derive(Args, Debug, Default)]
pub struct PayloadArgs {
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex-encoded payload (whitespace ignored).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    /// Resolve the payload bytes; no source means an empty payload.
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        if let Some(data) = &self.data {
            return Ok(data.as_bytes().to_vec());
        }
        if let Some(text) = &self.hex {
            return decode_hex("--hex", text);
        }
        if let Some(path) = &self.file {
            return fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
        }
        Ok(Vec::new())
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Packet type, decimal or 0x-prefixed hex.
    #[arg(long = "type", short = 't', value_name = "TYPE", value_parser = parse_packet_type)]
    pub packet_type: u8,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file to read. Default: stdin.
    pub path: Option<PathBuf>,
    /// Treat the input as hex text instead of raw bytes.
    #[arg(long)]
    pub hex: bool,
    /// Exit after printing N packets.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ChecksumArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a packet type given as decimal (`17`) or hex (`0x11`).
pub fn parse_packet_type(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(digits) => u8::from_str_radix(digits, 16),
        None => input.parse::<u8>(),
    };
    parsed.map_err(|_| format!("packet type must be 0..=255 or 0x00..=0xFF, got `{input}`"))
}

pub fn decode_hex(what: &str, text: &str) -> CliResult<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|err| CliError::usage(format!("{what} is not valid hex: {err}")))
}
