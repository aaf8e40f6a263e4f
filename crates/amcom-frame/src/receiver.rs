use tracing::{debug, trace};

use crate::checksum::frame_checksum;
use crate::codec::{FrameConfig, START_MARKER};
use crate::packet::{Packet, PacketHandler};

/// Position of the receiver inside the current frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Waiting for a start marker.
    Empty,
    GotStart,
    GotType,
    GotLength,
    /// First checksum byte (the low byte) received.
    GotChecksumLow,
    ReceivingPayload,
    /// Whole frame buffered. Transient: validation and dispatch run before the
    /// next byte is consumed, so `feed` never returns in this state.
    Complete,
}

/// Why a frame was discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The length byte exceeded the configured maximum payload size.
    InvalidLengthField,
    /// The recomputed checksum did not match the transmitted one.
    ChecksumMismatch,
}

impl DropReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DropReason::InvalidLengthField => "invalid length field",
            DropReason::ChecksumMismatch => "checksum mismatch",
        }
    }
}

/// Link-quality counters. All counters saturate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    /// Packets that passed validation and reached the handler.
    pub packets_dispatched: u64,
    /// Complete frames dropped because of a checksum mismatch.
    pub checksum_mismatches: u64,
    /// Frames abandoned because the length byte was too large.
    pub length_rejections: u64,
    /// Bytes ignored while waiting for a start marker.
    pub bytes_discarded: u64,
}

impl ReceiverStats {
    fn record_drop(&mut self, reason: DropReason) {
        let counter = match reason {
            DropReason::InvalidLengthField => &mut self.length_rejections,
            DropReason::ChecksumMismatch => &mut self.checksum_mismatches,
        };
        *counter = counter.saturating_add(1);
    }
}

/// Incremental frame receiver for one link.
///
/// Bytes are consumed one at a time in [`feed`](Self::feed). Every frame that
/// passes checksum validation is handed to the [`PacketHandler`] before the
/// next byte is looked at. Malformed frames are dropped silently and the
/// receiver resynchronizes on the next start marker.
///
/// Splitting the input into chunks of any size never changes which packets
/// are delivered.
#[derive(Debug)]
pub struct Receiver<H> {
    state: ReceiverState,
    payload_received: usize,
    packet: Packet,
    config: FrameConfig,
    stats: ReceiverStats,
    handler: H,
}

impl<H: PacketHandler> Receiver<H> {
    /// Create a receiver with default configuration.
    pub fn new(handler: H) -> Self {
        Self::with_config(handler, FrameConfig::default())
    }

    /// Create a receiver with explicit configuration.
    pub fn with_config(handler: H, config: FrameConfig) -> Self {
        Self {
            state: ReceiverState::Empty,
            payload_received: 0,
            packet: Packet::empty(),
            config,
            stats: ReceiverStats::default(),
            handler,
        }
    }

    /// Consume `data`, dispatching every valid packet it completes.
    pub fn feed(&mut self, data: &[u8]) {
        for &byte in data {
            self.step(byte);
        }
    }

    /// Discard any partially received frame.
    pub fn reset(&mut self) {
        self.state = ReceiverState::Empty;
        self.payload_received = 0;
    }

    /// Advance by one byte. A transition into `Complete` validates and
    /// dispatches immediately, so `step` always returns in a receiving state.
    fn step(&mut self, byte: u8) {
        self.state = match self.state {
            ReceiverState::Empty => {
                if byte == START_MARKER {
                    self.packet.header.start_marker = byte;
                    ReceiverState::GotStart
                } else {
                    self.stats.bytes_discarded = self.stats.bytes_discarded.saturating_add(1);
                    ReceiverState::Empty
                }
            }
            ReceiverState::GotStart => {
                self.packet.header.packet_type = byte;
                ReceiverState::GotType
            }
            ReceiverState::GotType => {
                if byte <= self.config.max_payload_size {
                    self.packet.header.length = byte;
                    ReceiverState::GotLength
                } else {
                    self.drop_frame(DropReason::InvalidLengthField, byte);
                    ReceiverState::Empty
                }
            }
            ReceiverState::GotLength => {
                self.packet.header.checksum = u16::from(byte);
                ReceiverState::GotChecksumLow
            }
            ReceiverState::GotChecksumLow => {
                self.packet.header.checksum |= u16::from(byte) << 8;
                self.payload_received = 0;
                if self.packet.header.length == 0 {
                    ReceiverState::Complete
                } else {
                    ReceiverState::ReceivingPayload
                }
            }
            ReceiverState::ReceivingPayload => {
                self.packet.payload[self.payload_received] = byte;
                self.payload_received += 1;
                if self.payload_received == self.packet.len() {
                    ReceiverState::Complete
                } else {
                    ReceiverState::ReceivingPayload
                }
            }
            ReceiverState::Complete => {
                unreachable!("complete frames are dispatched before the next byte")
            }
        };

        if self.state == ReceiverState::Complete {
            self.complete();
        }
    }

    fn complete(&mut self) {
        let header = self.packet.header;
        let expected = frame_checksum(header.packet_type, self.packet.payload());

        if expected == header.checksum {
            self.stats.packets_dispatched = self.stats.packets_dispatched.saturating_add(1);
            trace!(
                packet_type = header.packet_type,
                length = header.length,
                "packet received"
            );
            self.handler.handle(&self.packet);
        } else {
            debug!(
                packet_type = header.packet_type,
                length = header.length,
                expected,
                received = header.checksum,
                "dropped frame: {}",
                DropReason::ChecksumMismatch.as_str()
            );
            self.stats.record_drop(DropReason::ChecksumMismatch);
        }

        self.reset();
    }

    fn drop_frame(&mut self, reason: DropReason, byte: u8) {
        debug!(
            packet_type = self.packet.header.packet_type,
            length = byte,
            max = self.config.max_payload_size,
            "dropped frame: {}",
            reason.as_str()
        );
        self.stats.record_drop(reason);
        self.reset();
    }

    /// Current state. Never [`ReceiverState::Complete`] between calls.
    pub fn state(&self) -> ReceiverState {
        self.state
    }

    /// Current receiver configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn stats(&self) -> ReceiverStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ReceiverStats::default();
    }

    /// Borrow the packet handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Mutably borrow the packet handler.
    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Consume the receiver and return the packet handler.
    pub fn into_handler(self) -> H {
        self.handler
    }
}

impl<H: PacketHandler + Default> Default for Receiver<H> {
    fn default() -> Self {
        Self::new(H::default())
    }
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use proptest::prelude::*;

    use super::*;
    use crate::codec::{encode_frame, Frame, DEFAULT_MAX_PAYLOAD, HEADER_SIZE};
    use crate::packet::FrameQueue;

    fn wire(packet_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(packet_type, payload, u8::MAX, &mut buf).unwrap();
        buf.to_vec()
    }

    fn drain(rx: &mut Receiver<FrameQueue>) -> Vec<Frame> {
        std::iter::from_fn(|| rx.handler_mut().pop()).collect()
    }

    fn receive_all(bytes: &[u8]) -> Vec<Frame> {
        let mut rx = Receiver::new(FrameQueue::new());
        rx.feed(bytes);
        drain(&mut rx)
    }

    #[test]
    fn known_frame_dispatches_once() {
        let bytes = [START_MARKER, 0x02, 0x02, 0x7C, 0x3B, 0x10, 0x20];
        let mut seen = Vec::new();
        {
            let mut rx =
                Receiver::new(|p: &Packet| seen.push((p.packet_type(), p.payload().to_vec())));
            rx.feed(&bytes);
            assert_eq!(rx.state(), ReceiverState::Empty);
        }

        assert_eq!(seen, vec![(0x02, vec![0x10, 0x20])]);
    }

    #[test]
    fn handler_sees_header_fields() {
        let mut headers = Vec::new();
        {
            let mut rx = Receiver::new(|p: &Packet| headers.push(*p.header()));
            rx.feed(&wire(0x02, &[0x10, 0x20]));
        }

        assert_eq!(
            headers,
            vec![crate::packet::Header {
                start_marker: START_MARKER,
                packet_type: 0x02,
                length: 2,
                checksum: 0x3B7C,
            }]
        );
    }

    #[test]
    fn zero_length_payload() {
        let frames = receive_all(&[START_MARKER, 0x05, 0x00, 0x00, 0x8E]);

        assert_eq!(frames, vec![Frame::new(5, Vec::<u8>::new())]);
    }

    #[test]
    fn frame_completing_on_last_byte_is_dispatched() {
        let bytes = wire(1, b"ABC");
        let mut rx = Receiver::new(FrameQueue::new());

        rx.feed(&bytes[..bytes.len() - 1]);
        assert_eq!(rx.state(), ReceiverState::ReceivingPayload);
        assert!(rx.handler().is_empty());

        rx.feed(&bytes[bytes.len() - 1..]);
        assert_eq!(rx.state(), ReceiverState::Empty);
        assert_eq!(drain(&mut rx), vec![Frame::new(1, b"ABC".to_vec())]);
    }

    #[test]
    fn byte_after_complete_frame_starts_next_frame() {
        let mut stream = wire(1, b"one");
        stream.extend(wire(2, b""));
        stream.extend(wire(3, b"three"));

        let frames = receive_all(&stream);

        assert_eq!(
            frames,
            vec![
                Frame::new(1, b"one".to_vec()),
                Frame::new(2, Vec::<u8>::new()),
                Frame::new(3, b"three".to_vec()),
            ]
        );
    }

    #[test]
    fn start_marker_right_after_frame_is_kept() {
        let first = wire(1, b"x");
        let second = wire(2, b"y");
        let mut rx = Receiver::new(FrameQueue::new());

        let mut chunk = first.clone();
        chunk.push(second[0]);
        rx.feed(&chunk);
        assert_eq!(rx.state(), ReceiverState::GotStart);

        rx.feed(&second[1..]);
        assert_eq!(
            drain(&mut rx),
            vec![Frame::new(1, b"x".to_vec()), Frame::new(2, b"y".to_vec())]
        );
    }

    #[test]
    fn oversized_length_resets_without_reinterpreting_byte() {
        let cfg = FrameConfig::with_max_payload(100);
        let mut rx = Receiver::with_config(FrameQueue::new(), cfg);

        // 0xA1 doubles as the oversized length byte.
        rx.feed(&[START_MARKER, 0x01, START_MARKER]);
        assert_eq!(rx.state(), ReceiverState::Empty);
        assert_eq!(rx.stats().length_rejections, 1);

        rx.feed(&wire(4, b"valid"));
        assert_eq!(drain(&mut rx), vec![Frame::new(4, b"valid".to_vec())]);
    }

    #[test]
    fn length_at_limit_is_accepted() {
        let cfg = FrameConfig::with_max_payload(3);
        let mut rx = Receiver::with_config(FrameQueue::new(), cfg);

        rx.feed(&wire(1, b"abc"));
        rx.feed(&wire(1, b"abcd"));

        assert_eq!(drain(&mut rx), vec![Frame::new(1, b"abc".to_vec())]);
        assert_eq!(rx.stats().length_rejections, 1);
    }

    #[test]
    fn checksum_mismatch_is_dropped() {
        let mut bytes = wire(9, b"data");
        bytes[3] ^= 0xFF;

        let mut rx = Receiver::new(FrameQueue::new());
        rx.feed(&bytes);

        assert!(rx.handler().is_empty());
        assert_eq!(rx.state(), ReceiverState::Empty);
        assert_eq!(rx.stats().checksum_mismatches, 1);
        assert_eq!(rx.stats().packets_dispatched, 0);

        rx.feed(&wire(9, b"data"));
        assert_eq!(drain(&mut rx), vec![Frame::new(9, b"data".to_vec())]);
    }

    #[test]
    fn checksum_bytes_are_low_then_high() {
        let mut swapped = wire(0x02, &[0x10, 0x20]);
        swapped.swap(3, 4);

        assert!(receive_all(&swapped).is_empty());
    }

    #[test]
    fn start_marker_inside_payload_is_data() {
        let payload = [START_MARKER; 3];
        let bytes = wire(0, &payload);
        assert_eq!(bytes, vec![0xA1, 0x00, 0x03, 0xEA, 0x42, 0xA1, 0xA1, 0xA1]);

        assert_eq!(receive_all(&bytes), vec![Frame::new(0, payload.to_vec())]);
    }

    #[test]
    fn leading_noise_is_discarded() {
        let mut stream = vec![0x00, 0x13, 0xFF];
        stream.extend(wire(6, b"ok"));

        let mut rx = Receiver::new(FrameQueue::new());
        rx.feed(&stream);

        assert_eq!(drain(&mut rx), vec![Frame::new(6, b"ok".to_vec())]);
        assert_eq!(rx.stats().bytes_discarded, 3);
    }

    #[test]
    fn reset_discards_partial_frame() {
        let bytes = wire(1, b"partial");
        let mut rx = Receiver::new(FrameQueue::new());

        rx.feed(&bytes[..HEADER_SIZE + 2]);
        assert_eq!(rx.state(), ReceiverState::ReceivingPayload);

        rx.reset();
        assert_eq!(rx.state(), ReceiverState::Empty);

        rx.feed(&bytes[HEADER_SIZE + 2..]);
        rx.feed(&wire(2, b"fresh"));
        assert_eq!(drain(&mut rx), vec![Frame::new(2, b"fresh".to_vec())]);
    }

    #[test]
    fn stale_payload_never_exposed() {
        let mut lengths = Vec::new();
        {
            let mut rx = Receiver::new(|p: &Packet| lengths.push(p.payload().to_vec()));
            rx.feed(&wire(1, b"a long first payload"));
            rx.feed(&wire(1, b"hi"));
        }

        assert_eq!(lengths[1], b"hi".to_vec());
    }

    #[test]
    fn single_step_never_leaves_receiver_complete() {
        let mut rx = Receiver::new(FrameQueue::new());
        let bytes = [wire(5, &[]), wire(2, &[0x10, 0x20])].concat();

        for &byte in &bytes {
            rx.step(byte);
            assert_ne!(rx.state(), ReceiverState::Complete);
        }

        assert_eq!(
            drain(&mut rx),
            vec![Frame::new(5, Vec::<u8>::new()), Frame::new(2, vec![0x10u8, 0x20])]
        );
        assert_eq!(rx.state(), ReceiverState::Empty);
    }

    #[test]
    fn walks_every_state() {
        let bytes = wire(7, b"z");
        let mut rx = Receiver::new(FrameQueue::new());
        let mut states = Vec::new();

        for byte in &bytes {
            rx.feed(std::slice::from_ref(byte));
            states.push(rx.state());
        }

        assert_eq!(
            states,
            vec![
                ReceiverState::GotStart,
                ReceiverState::GotType,
                ReceiverState::GotLength,
                ReceiverState::GotChecksumLow,
                ReceiverState::ReceivingPayload,
                ReceiverState::Empty,
            ]
        );
    }

    #[test]
    fn stats_accumulate_and_reset() {
        let mut rx = Receiver::new(FrameQueue::new());
        rx.feed(&wire(1, b"a"));
        rx.feed(&wire(2, b"b"));

        assert_eq!(rx.stats().packets_dispatched, 2);
        rx.reset_stats();
        assert_eq!(rx.stats(), ReceiverStats::default());
    }

    #[test]
    fn every_single_bit_flip_is_rejected() {
        let frames: [(u8, Vec<u8>); 5] = [
            (0x02, vec![0x10, 0x20]),
            (0x11, b"hello".to_vec()),
            (0x05, Vec::new()),
            (0x7F, (0..DEFAULT_MAX_PAYLOAD).collect()),
            (0x00, vec![START_MARKER; 3]),
        ];

        for (packet_type, payload) in frames {
            let bytes = wire(packet_type, &payload);
            for index in 1..bytes.len() {
                for bit in 0..8 {
                    let mut corrupted = bytes.clone();
                    corrupted[index] ^= 1 << bit;
                    assert!(
                        receive_all(&corrupted).is_empty(),
                        "flip at byte {index} bit {bit} accepted for type {packet_type:#04x}"
                    );
                }
            }
        }
    }

    #[test]
    fn default_receiver_uses_default_config() {
        let rx: Receiver<FrameQueue> = Receiver::default();
        assert_eq!(rx.config().max_payload_size, DEFAULT_MAX_PAYLOAD);
        assert_eq!(rx.state(), ReceiverState::Empty);
    }

    #[test]
    fn into_handler_returns_queued_frames() {
        let mut rx = Receiver::new(FrameQueue::new());
        rx.feed(&wire(3, b"q"));

        let mut queue = rx.into_handler();
        assert_eq!(queue.pop(), Some(Frame::new(3, b"q".to_vec())));
    }

    fn frame_strategy() -> impl Strategy<Value = (u8, Vec<u8>)> {
        (
            any::<u8>(),
            prop::collection::vec(any::<u8>(), 0..=DEFAULT_MAX_PAYLOAD as usize),
        )
    }

    proptest! {
        #[test]
        fn round_trip((packet_type, payload) in frame_strategy()) {
            let frames = receive_all(&wire(packet_type, &payload));
            prop_assert_eq!(frames, vec![Frame::new(packet_type, payload)]);
        }

        #[test]
        fn body_bit_flip_is_rejected(
            (packet_type, payload) in frame_strategy(),
            position in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            // Type, checksum and payload bytes; the length byte is covered by
            // the exhaustive test above.
            let mut bytes = wire(packet_type, &payload);
            let candidates: Vec<usize> = (1..bytes.len()).filter(|&i| i != 2).collect();
            let index = candidates[position.index(candidates.len())];
            bytes[index] ^= 1 << bit;

            prop_assert!(receive_all(&bytes).is_empty());
        }

        #[test]
        fn chunking_does_not_change_delivery(
            frames in prop::collection::vec(
                (any::<u8>(), prop::collection::vec(any::<u8>(), 0..48)),
                1..6,
            ),
            noise in prop::collection::vec(any::<u8>(), 0..16),
            chunk_sizes in prop::collection::vec(1usize..9, 1..32),
        ) {
            let mut stream = noise;
            for (packet_type, payload) in &frames {
                stream.extend(wire(*packet_type, payload));
            }

            let whole = receive_all(&stream);

            let mut rx = Receiver::new(FrameQueue::new());
            let mut rest = stream.as_slice();
            let mut sizes = chunk_sizes.iter().cycle();
            while !rest.is_empty() {
                let take = (*sizes.next().unwrap()).min(rest.len());
                let (chunk, tail) = rest.split_at(take);
                rx.feed(chunk);
                rest = tail;
            }
            let chunked = drain(&mut rx);

            prop_assert_eq!(&whole, &chunked);

            let mut byte_rx = Receiver::new(FrameQueue::new());
            for byte in &stream {
                byte_rx.feed(std::slice::from_ref(byte));
            }
            prop_assert_eq!(whole, drain(&mut byte_rx));
        }

        #[test]
        fn resyncs_after_oversized_length(
            bad_type in any::<u8>(),
            bad_length in (DEFAULT_MAX_PAYLOAD + 1)..=u8::MAX,
            (packet_type, payload) in frame_strategy(),
        ) {
            let mut stream = vec![START_MARKER, bad_type, bad_length];
            stream.extend(wire(packet_type, &payload));

            let frames = receive_all(&stream);
            prop_assert_eq!(frames, vec![Frame::new(packet_type, payload)]);
        }
    }
}
