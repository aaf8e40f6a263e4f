use std::fs::File;
use std::io::{self, Cursor, Read};

use amcom_frame::{FrameConfig, FrameError, PacketReader, ReceiverStats};

use crate::cmd::{decode_hex, DecodeArgs};
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat, max_payload: u8) -> CliResult<i32> {
    let input = open_input(&args)?;
    let config = FrameConfig::with_max_payload(max_payload);
    let mut reader = PacketReader::with_config(input, config);

    let printed = drain(&mut reader, args.count, |frame| print_frame(frame, format))?;

    let stats = reader.stats();
    log_summary(printed, &stats);

    Ok(SUCCESS)
}

fn open_input(args: &DecodeArgs) -> CliResult<Box<dyn Read>> {
    let mut raw: Box<dyn Read> = match &args.path {
        Some(path) => Box::new(
            File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(io::stdin().lock()),
    };

    if !args.hex {
        return Ok(raw);
    }

    let mut text = String::new();
    raw.read_to_string(&mut text)
        .map_err(|err| io_error("failed reading hex input", err))?;
    Ok(Box::new(Cursor::new(decode_hex("input", &text)?)))
}

/// Pull verified frames until EOF or `limit` frames have been handed to `emit`.
fn drain<R: Read>(
    reader: &mut PacketReader<R>,
    limit: Option<usize>,
    mut emit: impl FnMut(&amcom_frame::Frame),
) -> CliResult<usize> {
    let mut printed = 0usize;

    while limit.is_none_or(|limit| printed < limit) {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("read failed", err)),
        };

        emit(&frame);
        printed = printed.saturating_add(1);
    }

    Ok(printed)
}

fn log_summary(printed: usize, stats: &ReceiverStats) {
    if stats.checksum_mismatches > 0 || stats.length_rejections > 0 {
        tracing::warn!(
            printed,
            checksum_mismatches = stats.checksum_mismatches,
            length_rejections = stats.length_rejections,
            bytes_discarded = stats.bytes_discarded,
            "decode finished with dropped frames"
        );
    } else {
        tracing::info!(
            printed,
            bytes_discarded = stats.bytes_discarded,
            "decode finished"
        );
    }
}
