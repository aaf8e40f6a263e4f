use amcom_frame::{frame_checksum, FrameConfig, PacketWriter};

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat, max_payload: u8) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let wire = encode(args.packet_type, &payload, max_payload)?;

    tracing::debug!(
        packet_type = args.packet_type,
        length = payload.len(),
        "encoded frame"
    );
    print_encoded(
        args.packet_type,
        payload.len(),
        frame_checksum(args.packet_type, &payload),
        &wire,
        format,
    );

    Ok(SUCCESS)
}

fn encode(packet_type: u8, payload: &[u8], max_payload: u8) -> CliResult<Vec<u8>> {
    let config = FrameConfig::with_max_payload(max_payload);
    let mut writer = PacketWriter::with_config(Vec::new(), config);
    writer
        .send(packet_type, payload)
        .map_err(|err| frame_error("encode failed", err))?;
    Ok(writer.into_inner())
}
