use std::io::{IsTerminal, Write};

use amcom_frame::{frame_checksum, Frame};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
    Hex,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput {
    packet_type: u8,
    length: usize,
    checksum: String,
    payload_hex: String,
    payload: Option<String>,
}

#[derive(Serialize)]
struct EncodedOutput {
    packet_type: u8,
    length: usize,
    checksum: String,
    wire_size: usize,
    wire_hex: String,
}

#[derive(Serialize)]
struct ChecksumOutput {
    length: usize,
    checksum: String,
}

/// Print one verified packet received by `decode`.
pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let payload = frame.payload.as_ref();
    let checksum = frame_checksum(frame.packet_type, payload);

    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                packet_type: frame.packet_type,
                length: payload.len(),
                checksum: checksum_text(checksum),
                payload_hex: hex::encode(payload),
                payload: std::str::from_utf8(payload).ok().map(str::to_owned),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "LENGTH", "CHECKSUM", "PAYLOAD"])
                .add_row(vec![
                    type_text(frame.packet_type),
                    payload.len().to_string(),
                    checksum_text(checksum),
                    payload_preview(payload),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "type={} length={} checksum={} payload={}",
                type_text(frame.packet_type),
                payload.len(),
                checksum_text(checksum),
                payload_preview(payload)
            );
        }
        OutputFormat::Raw => print_raw(payload),
        OutputFormat::Hex => println!("{}", hex::encode(payload)),
    }
}

/// Print a serialized frame produced by `encode`.
pub fn print_encoded(
    packet_type: u8,
    payload_len: usize,
    checksum: u16,
    wire: &[u8],
    format: OutputFormat,
) {
    match format {
        OutputFormat::Json => {
            let out = EncodedOutput {
                packet_type,
                length: payload_len,
                checksum: checksum_text(checksum),
                wire_size: wire.len(),
                wire_hex: hex::encode(wire),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "LENGTH", "CHECKSUM", "WIRE"])
                .add_row(vec![
                    type_text(packet_type),
                    payload_len.to_string(),
                    checksum_text(checksum),
                    spaced_hex(wire),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", spaced_hex(wire)),
        OutputFormat::Raw => print_raw(wire),
        OutputFormat::Hex => println!("{}", hex::encode(wire)),
    }
}

pub fn print_checksum(length: usize, checksum: u16, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ChecksumOutput {
            length,
            checksum: checksum_text(checksum),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["LENGTH", "CHECKSUM"])
                .add_row(vec![length.to_string(), checksum_text(checksum)]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("length={length} checksum={}", checksum_text(checksum)),
        OutputFormat::Raw => print_raw(&checksum.to_le_bytes()),
        OutputFormat::Hex => println!("{checksum:04x}"),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json(value: &impl Serialize) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn checksum_text(checksum: u16) -> String {
    format!("0x{checksum:04X}")
}

fn type_text(packet_type: u8) -> String {
    format!("0x{packet_type:02X}")
}

fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) if !text.chars().any(char::is_control) => text.to_string(),
        _ => format!("<binary {} bytes> {}", payload.len(), hex::encode(payload)),
    }
}
