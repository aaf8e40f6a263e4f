//! Packet model and the handler seam between the receiver and the application.

use std::collections::VecDeque;
use std::fmt;

use bytes::Bytes;

use crate::codec::{Frame, MAX_PAYLOAD_CAPACITY};

/// Header fields of a received frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Header {
    /// Start-of-packet marker as received.
    pub start_marker: u8,
    /// Application-defined packet type.
    pub packet_type: u8,
    /// Declared payload length.
    pub length: u8,
    /// Checksum as transmitted (low byte first on the wire).
    pub checksum: u16,
}

/// A packet assembled by a [`Receiver`](crate::Receiver).
///
/// The payload buffer has fixed capacity and is reused across frames; only
/// the first `header.length` bytes belong to this packet.
#[derive(Clone)]
pub struct Packet {
    pub(crate) header: Header,
    pub(crate) payload: [u8; MAX_PAYLOAD_CAPACITY],
}

impl Packet {
    pub(crate) const fn empty() -> Self {
        Self {
            header: Header {
                start_marker: 0,
                packet_type: 0,
                length: 0,
                checksum: 0,
            },
            payload: [0; MAX_PAYLOAD_CAPACITY],
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn packet_type(&self) -> u8 {
        self.header.packet_type
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.header.length as usize
    }

    pub fn is_empty(&self) -> bool {
        self.header.length == 0
    }

    /// The payload bytes of this packet.
    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.len()]
    }

    pub fn checksum(&self) -> u16 {
        self.header.checksum
    }

    /// Copy the packet out of the receiver's buffer.
    pub fn to_frame(&self) -> Frame {
        Frame {
            packet_type: self.packet_type(),
            payload: Bytes::copy_from_slice(self.payload()),
        }
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("header", &self.header)
            .field("payload", &self.payload())
            .finish()
    }
}

/// Receives every packet that passes checksum validation.
///
/// Called synchronously from inside [`Receiver::feed`](crate::Receiver::feed).
/// The packet is only borrowed for the duration of the call; use
/// [`Packet::to_frame`] to keep it. If `feed` runs in a latency-sensitive
/// context, the handler should hand work off rather than do it inline.
pub trait PacketHandler {
    fn handle(&mut self, packet: &Packet);
}

impl<F> PacketHandler for F
where
    F: FnMut(&Packet),
{
    fn handle(&mut self, packet: &Packet) {
        self(packet)
    }
}

/// Handler that queues owned frames for later retrieval.
#[derive(Debug, Default)]
pub struct FrameQueue {
    frames: VecDeque<Frame>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest queued frame.
    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

impl PacketHandler for FrameQueue {
    fn handle(&mut self, packet: &Packet) {
        self.frames.push_back(packet.to_frame());
    }
}
