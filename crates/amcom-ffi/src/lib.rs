//! amcom-ffi: C-ABI exports for the amcom receiver and serializer.

mod args;
mod error;
mod receiver;
mod serialize;
mod types;

use std::panic::AssertUnwindSafe;

pub use receiver::{
    amcom_receiver_feed, amcom_receiver_free, amcom_receiver_new,
    amcom_receiver_new_with_max_payload, amcom_receiver_reset,
};
pub use serialize::{amcom_checksum, amcom_serialize, amcom_serialize_with_max_payload};
pub use types::{
    AmcomPacket, AmcomPacketHandler, AmcomReceiverHandle, AmcomResult, AMCOM_DEFAULT_MAX_PAYLOAD,
    AMCOM_ERR_BUFFER_TOO_SMALL, AMCOM_ERR_INTERNAL, AMCOM_ERR_INVALID_ARGUMENT,
    AMCOM_ERR_PAYLOAD_TOO_LARGE, AMCOM_HEADER_SIZE, AMCOM_MAX_FRAME_SIZE, AMCOM_OK,
    AMCOM_START_MARKER,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Text of the last error raised on this thread, or an empty string.
///
/// The pointer stays valid until the next amcom call on the same thread.
#[no_mangle]
pub extern "C" fn amcom_last_error() -> *const std::os::raw::c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    fn last_error_text() -> String {
        let ptr = amcom_last_error();
        assert!(!ptr.is_null());
        // SAFETY: amcom_last_error returns a pointer to a thread-local CString.
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_owned()
    }

    #[test]
    fn last_error_is_empty_after_success() {
        let data = [1u8, 2, 3];
        // SAFETY: `data` is a live buffer of the stated length.
        let _ = unsafe { amcom_checksum(data.as_ptr(), data.len()) };
        assert!(last_error_text().is_empty());
    }

    #[test]
    fn last_error_describes_failure() {
        let payload = [0u8; 201];
        let mut out = [0u8; AMCOM_MAX_FRAME_SIZE];
        let mut written = 0usize;

        // SAFETY: All buffers are live locals of the stated sizes.
        let rc = unsafe {
            amcom_serialize(
                1,
                payload.as_ptr(),
                payload.len(),
                out.as_mut_ptr(),
                out.len(),
                &mut written,
            )
        };

        assert_eq!(rc, AMCOM_ERR_PAYLOAD_TOO_LARGE);
        assert!(last_error_text().contains("201"));
    }

    #[test]
    fn panic_is_contained() {
        let value = ffi_boundary(AMCOM_ERR_INTERNAL, || panic!("boom"));
        assert_eq!(value, AmcomResult::Internal);
        assert_eq!(last_error_text(), "panic across FFI boundary");
    }

    #[test]
    fn constants_match_wire_format() {
        assert_eq!(AMCOM_START_MARKER, 0xA1);
        assert_eq!(AMCOM_HEADER_SIZE, 5);
        assert_eq!(AMCOM_MAX_FRAME_SIZE, 260);
        assert_eq!(AMCOM_DEFAULT_MAX_PAYLOAD, 200);
        assert_eq!(AMCOM_OK as i32, 0);
        assert_eq!(AMCOM_ERR_INVALID_ARGUMENT as i32, 1);
        assert_eq!(AMCOM_ERR_BUFFER_TOO_SMALL as i32, 3);
    }
}
