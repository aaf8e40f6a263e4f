use bytes::{BufMut, Bytes, BytesMut};

use crate::checksum::frame_checksum;
use crate::error::{FrameError, Result};

/// Frame header: marker (1) + type (1) + length (1) + checksum (2) = 5 bytes.
pub const HEADER_SIZE: usize = 5;

/// Start-of-packet marker.
pub const START_MARKER: u8 = 0xA1;

/// Largest payload the one-byte length field can describe.
pub const MAX_PAYLOAD_CAPACITY: usize = u8::MAX as usize;

/// Largest frame that can appear on the wire.
pub const MAX_FRAME_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD_CAPACITY;

/// Default maximum payload size: 200 bytes.
pub const DEFAULT_MAX_PAYLOAD: u8 = 200;

/// Default number of bytes pulled from a stream per read.
pub const DEFAULT_READ_CHUNK: usize = 64;

/// An owned, verified packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Application-defined packet type.
    pub packet_type: u8,
    /// The packet payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(packet_type: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            packet_type,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Serialize a frame into a caller-owned buffer, returning the bytes written.
///
/// Payloads longer than [`DEFAULT_MAX_PAYLOAD`] are rejected. Links
/// configured with a different limit use [`serialize_with_max`]. Nothing is
/// written on error.
///
/// Wire format:
/// ```text
/// ┌────────┬──────┬────────┬─────────┬─────────┬──────────────────┐
/// │ Marker │ Type │ Length │ CRC low │ CRC high│ Payload          │
/// │ 0xA1   │ (1B) │ (1B)   │ (1B)    │ (1B)    │ (Length bytes)   │
/// └────────┴──────┴────────┴─────────┴─────────┴──────────────────┘
/// ```
///
/// The checksum covers type, length and payload, never the marker.
pub fn serialize(packet_type: u8, payload: &[u8], dst: &mut [u8]) -> Result<usize> {
    serialize_with_max(packet_type, payload, DEFAULT_MAX_PAYLOAD, dst)
}

/// [`serialize`] with an explicit payload limit, normally
/// [`FrameConfig::max_payload_size`] of the link.
pub fn serialize_with_max(
    packet_type: u8,
    payload: &[u8],
    max_payload: u8,
    dst: &mut [u8],
) -> Result<usize> {
    let length = check_payload(payload, max_payload)?;
    let total = HEADER_SIZE + payload.len();
    if dst.len() < total {
        return Err(FrameError::BufferTooSmall {
            needed: total,
            available: dst.len(),
        });
    }

    dst[..HEADER_SIZE].copy_from_slice(&header(packet_type, length, payload));
    dst[HEADER_SIZE..total].copy_from_slice(payload);
    Ok(total)
}

/// Encode a frame onto the end of `dst`, enforcing `max_payload`.
pub fn encode_frame(
    packet_type: u8,
    payload: &[u8],
    max_payload: u8,
    dst: &mut BytesMut,
) -> Result<()> {
    let length = check_payload(payload, max_payload)?;
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&header(packet_type, length, payload));
    dst.put_slice(payload);
    Ok(())
}

fn check_payload(payload: &[u8], max_payload: u8) -> Result<u8> {
    if payload.len() > max_payload as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: max_payload as usize,
        });
    }
    Ok(payload.len() as u8)
}

fn header(packet_type: u8, length: u8, payload: &[u8]) -> [u8; HEADER_SIZE] {
    let [crc_lo, crc_hi] = frame_checksum(packet_type, payload).to_le_bytes();
    [START_MARKER, packet_type, length, crc_lo, crc_hi]
}

/// Configuration shared by the receiver and the stream adapters.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 200.
    ///
    /// Both ends of a link must agree on this value.
    pub max_payload_size: u8,
    /// Bytes requested per read by blocking readers. Default: 64.
    pub read_chunk_size: usize,
}

impl FrameConfig {
    /// Default configuration with a different payload limit.
    pub fn with_max_payload(max_payload_size: u8) -> Self {
        Self {
            max_payload_size,
            ..Self::default()
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            read_chunk_size: DEFAULT_READ_CHUNK,
        }
    }
}
