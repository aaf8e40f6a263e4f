use std::ffi::c_void;

use amcom_frame::{Packet, PacketHandler, Receiver};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmcomResult {
    Ok = 0,
    InvalidArgument = 1,
    PayloadTooLarge = 2,
    BufferTooSmall = 3,
    Internal = 99,
}

pub const AMCOM_OK: AmcomResult = AmcomResult::Ok;
pub const AMCOM_ERR_INVALID_ARGUMENT: AmcomResult = AmcomResult::InvalidArgument;
pub const AMCOM_ERR_PAYLOAD_TOO_LARGE: AmcomResult = AmcomResult::PayloadTooLarge;
pub const AMCOM_ERR_BUFFER_TOO_SMALL: AmcomResult = AmcomResult::BufferTooSmall;
pub const AMCOM_ERR_INTERNAL: AmcomResult = AmcomResult::Internal;

pub const AMCOM_START_MARKER: u8 = amcom_frame::START_MARKER;
pub const AMCOM_HEADER_SIZE: usize = amcom_frame::HEADER_SIZE;
pub const AMCOM_MAX_FRAME_SIZE: usize = amcom_frame::MAX_FRAME_SIZE;
pub const AMCOM_DEFAULT_MAX_PAYLOAD: u8 = amcom_frame::DEFAULT_MAX_PAYLOAD;

/// Packet view handed to the C packet handler.
///
/// `payload` points into the receiver's internal buffer and is only valid for
/// the duration of the callback. Copy it out to keep it.
#[repr(C)]
#[derive(Debug)]
pub struct AmcomPacket {
    pub packet_type: u8,
    pub length: u8,
    pub checksum: u16,
    pub payload: *const u8,
}

/// Callback invoked synchronously from `amcom_receiver_feed` for every valid packet.
pub type AmcomPacketHandler =
    Option<unsafe extern "C" fn(packet: *const AmcomPacket, context: *mut c_void)>;

pub type AmcomReceiverHandle = *mut c_void;

pub(crate) struct CallbackHandler {
    pub(crate) callback: unsafe extern "C" fn(*const AmcomPacket, *mut c_void),
    pub(crate) context: *mut c_void,
}

impl PacketHandler for CallbackHandler {
    fn handle(&mut self, packet: &Packet) {
        let view = AmcomPacket {
            packet_type: packet.packet_type(),
            length: packet.header().length,
            checksum: packet.checksum(),
            payload: packet.payload().as_ptr(),
        };

        // SAFETY: `callback` and `context` were supplied together by the caller of
        // `amcom_receiver_new`; `view` outlives the call.
        unsafe { (self.callback)(&view, self.context) }
    }
}

pub(crate) struct ReceiverHandle {
    pub(crate) receiver: Receiver<CallbackHandler>,
}
