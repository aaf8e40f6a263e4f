//! Checksummed packet framing for point-to-point serial links.
//!
//! amcom moves small typed packets over a raw byte stream such as a UART.
//! Each packet carries a start marker, a type, a length and a checksum, so a
//! receiver can pick valid packets out of a noisy stream and resynchronize
//! after corruption.
//!
//! # Crate Structure
//!
//! - [`frame`] - Serializer, checksum, incremental receiver and stream adapters
//!
//! The `amcom` binary (behind the `cli` feature) encodes, decodes and
//! checksums frames from the command line.

/// Re-export frame types.
pub mod frame {
    pub use amcom_frame::*;
}
