//! Checksummed packet framing for point-to-point serial links.
//!
//! Every packet travels as a 5-byte header followed by its payload:
//! - A 1-byte start marker (`0xA1`) for stream synchronization
//! - A 1-byte application-defined packet type
//! - A 1-byte payload length
//! - A 2-byte checksum (low byte first) over type, length and payload
//!
//! [`serialize`] / [`encode_frame`] build frames; a [`Receiver`] consumes a
//! live byte stream one byte at a time and hands every verified packet to a
//! [`PacketHandler`]. Corrupt frames are dropped and the receiver
//! resynchronizes on the next start marker.

pub mod checksum;
pub mod codec;
pub mod error;
pub mod packet;
pub mod reader;
pub mod receiver;
pub mod writer;

#[cfg(feature = "async")]
pub mod async_codec;

pub use checksum::{checksum, frame_checksum, CHECKSUM_SEED};
pub use codec::{
    encode_frame, serialize, serialize_with_max, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD,
    HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_CAPACITY, START_MARKER,
};
pub use error::{FrameError, Result};
pub use packet::{FrameQueue, Header, Packet, PacketHandler};
pub use reader::PacketReader;
pub use receiver::{DropReason, Receiver, ReceiverState, ReceiverStats};
pub use writer::PacketWriter;

#[cfg(feature = "async")]
pub use async_codec::AmcomCodec;
