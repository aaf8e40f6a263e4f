use std::io::{ErrorKind, Read};

use crate::codec::{Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::packet::FrameQueue;
use crate::receiver::{Receiver, ReceiverStats};

/// Reads verified frames from any `Read` byte stream (serial port, pipe, file).
///
/// Bytes are pushed through a [`Receiver`]; corrupt frames are skipped
/// silently, so callers only ever see packets that passed validation.
pub struct PacketReader<T> {
    inner: T,
    receiver: Receiver<FrameQueue>,
    chunk: Vec<u8>,
}

impl<T: Read> PacketReader<T> {
    /// Create a new packet reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new packet reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        let chunk = vec![0u8; config.read_chunk_size.max(1)];
        Self {
            inner,
            receiver: Receiver::with_config(FrameQueue::new(), config),
            chunk,
        }
    }

    /// Read the next verified frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached with no
    /// complete frame pending. A partial frame at EOF is discarded.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.receiver.handler_mut().pop() {
                return Ok(frame);
            }

            let read = match self.inner.read(&mut self.chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                self.receiver.reset();
                return Err(FrameError::ConnectionClosed);
            }

            self.receiver.feed(&self.chunk[..read]);
        }
    }

    /// Discard any partially received frame and queued frames.
    pub fn reset(&mut self) {
        self.receiver.reset();
        self.receiver.handler_mut().clear();
    }

    /// Receiver counters for this stream.
    pub fn stats(&self) -> ReceiverStats {
        self.receiver.stats()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current packet reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.receiver.config()
    }
}

impl<T: Read> Iterator for PacketReader<T> {
    type Item = Result<Frame>;

    /// Yields frames until the stream closes cleanly.
    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Ok(frame) => Some(Ok(frame)),
            Err(FrameError::ConnectionClosed) => None,
            Err(err) => Some(Err(err)),
        }
    }
}
