#![cfg(feature = "cli")]

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

fn amcom() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_amcom"));
    cmd.arg("--log-level").arg("off");
    cmd
}

fn run_with_stdin(mut cmd: Command, stdin: &[u8]) -> Output {
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("amcom should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(stdin)
        .expect("stdin should be writable");
    child.wait_with_output().expect("amcom should exit")
}

fn unique_temp_file(tag: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "amcom-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ))
}

#[test]
fn encode_hex_output_matches_wire_format() {
    let output = amcom()
        .args(["--format", "hex", "encode", "--type", "0x02", "--hex", "10 20"])
        .output()
        .expect("encode should run");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "a102027c3b1020");
}

#[test]
fn encode_raw_pipes_into_decode() {
    let encoded = amcom()
        .args(["--format", "raw", "encode", "--type", "17", "--data", "hello"])
        .output()
        .expect("encode should run");
    assert!(encoded.status.success());
    assert_eq!(&encoded.stdout[..5], &[0xA1, 0x11, 0x05, 0xDE, 0xB6]);

    let mut stream = vec![0x00, 0x42];
    stream.extend_from_slice(&encoded.stdout);

    let mut decode = amcom();
    decode.args(["--format", "json", "decode"]);
    let decoded = run_with_stdin(decode, &stream);

    assert!(decoded.status.success());
    let line = String::from_utf8(decoded.stdout).expect("json output should be utf-8");
    let value: serde_json::Value =
        serde_json::from_str(line.trim()).expect("decode should print one JSON object");
    assert_eq!(value["packet_type"], 17);
    assert_eq!(value["length"], 5);
    assert_eq!(value["payload"], "hello");
    assert_eq!(value["checksum"], "0xB6DE");
}

#[test]
fn decode_hex_file_skips_corrupt_frames_and_honours_count() {
    let path = unique_temp_file("decode");
    std::fs::write(
        &path,
        "a1 02 02 7c 3b 10 21\n\
         a1 02 02 7c 3b 10 20\n\
         a1 05 00 00 8e\n",
    )
    .expect("capture should be writable");

    let output = amcom()
        .args(["--format", "hex", "decode", "--hex", "--count", "1"])
        .arg(&path)
        .output()
        .expect("decode should run");
    let _ = std::fs::remove_file(&path);

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1020");
}

#[test]
fn encode_rejects_payload_above_max() {
    let output = amcom()
        .args(["--max-payload", "4", "encode", "--type", "1", "--data", "too long"])
        .output()
        .expect("encode should run");

    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("payload too large"));
}

#[test]
fn encode_rejects_invalid_packet_type() {
    let output = amcom()
        .args(["encode", "--type", "0x1FF"])
        .output()
        .expect("encode should run");

    assert!(!output.status.success());
}

#[test]
fn checksum_of_check_string() {
    let output = amcom()
        .args(["--format", "hex", "checksum", "--data", "123456789"])
        .output()
        .expect("checksum should run");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "6f91");
}

#[test]
fn version_prints_package_version() {
    let output = amcom().arg("version").output().expect("version should run");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("amcom {}", env!("CARGO_PKG_VERSION"))
    );
}
