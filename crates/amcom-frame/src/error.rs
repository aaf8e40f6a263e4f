/// Errors that can occur while serializing frames or moving them over a stream.
///
/// Receive-side framing failures (bad length byte, checksum mismatch) are not
/// errors: the receiver drops the frame and resynchronizes on its own. See
/// [`DropReason`](crate::receiver::DropReason).
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The destination buffer cannot hold the serialized frame.
    #[error("output buffer too small ({available} bytes, need {needed})")]
    BufferTooSmall { needed: usize, available: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream was closed before a complete frame was received.
    #[error("connection closed (incomplete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
