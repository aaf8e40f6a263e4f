//! 16-bit frame checksum.
//!
//! The accumulator is threaded explicitly by the caller; there is no hidden
//! state. Every participant on a link must seed with [`CHECKSUM_SEED`] and fold
//! the packet type, the payload length and then the payload bytes, in that
//! order. The start marker is never folded.

/// Initial accumulator value.
pub const CHECKSUM_SEED: u16 = 0xFFFF;

/// Fold one byte into the running checksum.
#[inline]
pub const fn update(byte: u8, running: u16) -> u16 {
    let mut b = byte ^ (running as u8);
    b ^= b << 4;

    (((b as u16) << 8) | (running >> 8)) ^ ((b >> 4) as u16) ^ ((b as u16) << 3)
}

/// Fold a slice into `running`, byte by byte.
#[inline]
pub fn update_slice(bytes: &[u8], running: u16) -> u16 {
    bytes.iter().fold(running, |acc, &byte| update(byte, acc))
}

/// Checksum of a byte slice, starting from [`CHECKSUM_SEED`].
pub fn checksum(bytes: &[u8]) -> u16 {
    update_slice(bytes, CHECKSUM_SEED)
}

/// Checksum of a frame body: packet type, payload length, payload.
///
/// `payload` must already fit the one-byte length field.
pub fn frame_checksum(packet_type: u8, payload: &[u8]) -> u16 {
    debug_assert!(payload.len() <= u8::MAX as usize);

    let running = update(packet_type, CHECKSUM_SEED);
    let running = update(payload.len() as u8, running);
    update_slice(payload, running)
}
