//! `tokio_util::codec` adapter for async byte streams.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::packet::FrameQueue;
use crate::receiver::{Receiver, ReceiverStats};

/// Frames a byte stream with `FramedRead` / `FramedWrite`.
///
/// Decoding drains every buffered byte into a [`Receiver`], so no partial
/// frame is ever left in the read buffer; corrupt frames never surface.
#[derive(Debug, Default)]
pub struct AmcomCodec {
    receiver: Receiver<FrameQueue>,
}

impl AmcomCodec {
    /// Create a codec with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a codec with explicit configuration.
    pub fn with_config(config: FrameConfig) -> Self {
        Self {
            receiver: Receiver::with_config(FrameQueue::new(), config),
        }
    }

    /// Receiver counters for the decoded stream.
    pub fn stats(&self) -> ReceiverStats {
        self.receiver.stats()
    }

    pub fn config(&self) -> &FrameConfig {
        self.receiver.config()
    }
}

impl Decoder for AmcomCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if !src.is_empty() {
            let bytes = src.split();
            self.receiver.feed(&bytes);
        }
        Ok(self.receiver.handler_mut().pop())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let frame = self.decode(src)?;
        if frame.is_none() {
            // Truncated trailing frame.
            self.receiver.reset();
        }
        Ok(frame)
    }
}

impl Encoder<Frame> for AmcomCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<()> {
        encode_frame(
            item.packet_type,
            item.payload.as_ref(),
            self.receiver.config().max_payload_size,
            dst,
        )
    }
}
