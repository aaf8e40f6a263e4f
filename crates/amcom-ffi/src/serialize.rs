use amcom_frame::{checksum, serialize_with_max};

use crate::args;
use crate::error;
use crate::types::{AmcomResult, AMCOM_DEFAULT_MAX_PAYLOAD};

/// Serialize one frame into a caller-provided buffer.
///
/// On success `*out_len` holds the number of bytes written. A payload above
/// the default maximum yields `PayloadTooLarge`; a short buffer yields
/// `BufferTooSmall`. Nothing is written in either case.
///
/// # Safety
/// If `payload_len > 0`, `payload` must be readable for `payload_len` bytes.
/// If `out_capacity > 0`, `out` must be writable for `out_capacity` bytes.
/// `out_len` must be non-null and writable.
#[no_mangle]
pub unsafe extern "C" fn amcom_serialize(
    packet_type: u8,
    payload: *const u8,
    payload_len: usize,
    out: *mut u8,
    out_capacity: usize,
    out_len: *mut usize,
) -> AmcomResult {
    crate::ffi_boundary(AmcomResult::Internal, || {
        // SAFETY: Forwarded caller contract.
        unsafe {
            serialize_checked(
                packet_type,
                payload,
                payload_len,
                AMCOM_DEFAULT_MAX_PAYLOAD,
                out,
                out_capacity,
                out_len,
            )
        }
    })
}

/// Serialize one frame, enforcing `max_payload` instead of the default.
///
/// Pairs with `amcom_receiver_new_with_max_payload` on links that agree on a
/// non-default limit.
///
/// # Safety
/// Same contract as `amcom_serialize`.
#[no_mangle]
pub unsafe extern "C" fn amcom_serialize_with_max_payload(
    packet_type: u8,
    payload: *const u8,
    payload_len: usize,
    max_payload: u8,
    out: *mut u8,
    out_capacity: usize,
    out_len: *mut usize,
) -> AmcomResult {
    crate::ffi_boundary(AmcomResult::Internal, || {
        // SAFETY: Forwarded caller contract.
        unsafe {
            serialize_checked(
                packet_type,
                payload,
                payload_len,
                max_payload,
                out,
                out_capacity,
                out_len,
            )
        }
    })
}

unsafe fn serialize_checked(
    packet_type: u8,
    payload: *const u8,
    payload_len: usize,
    max_payload: u8,
    out: *mut u8,
    out_capacity: usize,
    out_len: *mut usize,
) -> AmcomResult {
    error::clear_error_state();

    if out_len.is_null() {
        return error::set_invalid_argument("out_len cannot be null");
    }
    // SAFETY: `out_len` checked non-null above.
    unsafe {
        *out_len = 0;
    }

    let payload = {
        // SAFETY: We validate pointer/length pairing in helper.
        match unsafe { args::bytes_arg(payload, payload_len, "payload") } {
            Some(v) => v,
            None => return AmcomResult::InvalidArgument,
        }
    };
    let dst = {
        // SAFETY: We validate pointer/capacity pairing in helper.
        match unsafe { args::out_buffer_arg(out, out_capacity, "out") } {
            Some(v) => v,
            None => return AmcomResult::InvalidArgument,
        }
    };

    match serialize_with_max(packet_type, payload, max_payload, dst) {
        Ok(written) => {
            // SAFETY: `out_len` checked non-null above.
            unsafe {
                *out_len = written;
            }
            AmcomResult::Ok
        }
        Err(err) => error::map_frame_error(&err),
    }
}

/// Checksum of `data` starting from the protocol seed.
///
/// Null `data` with `len > 0` returns the seed and sets the last error.
///
/// # Safety
/// If `len > 0`, `data` must be readable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn amcom_checksum(data: *const u8, len: usize) -> u16 {
    crate::ffi_boundary(amcom_frame::CHECKSUM_SEED, || {
        error::clear_error_state();

        // SAFETY: We validate pointer/length pairing in helper.
        match unsafe { args::bytes_arg(data, len, "data") } {
            Some(bytes) => checksum(bytes),
            None => amcom_frame::CHECKSUM_SEED,
        }
    })
}
