use std::ffi::c_void;

use amcom_frame::{FrameConfig, Receiver};

use crate::args;
use crate::error;
use crate::types::{
    AmcomPacketHandler, AmcomReceiverHandle, AmcomResult, CallbackHandler, ReceiverHandle,
};

fn with_receiver_mut(
    handle: AmcomReceiverHandle,
    f: impl FnOnce(&mut ReceiverHandle) -> AmcomResult,
) -> AmcomResult {
    if handle.is_null() {
        return error::set_invalid_argument("receiver handle cannot be null");
    }

    let receiver_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut ReceiverHandle) }
    };

    f(receiver_handle)
}

fn new_receiver(
    handler: AmcomPacketHandler,
    context: *mut c_void,
    config: FrameConfig,
) -> AmcomReceiverHandle {
    let Some(callback) = handler else {
        let _ = error::set_invalid_argument("handler cannot be null");
        return std::ptr::null_mut();
    };

    let handle = ReceiverHandle {
        receiver: Receiver::with_config(CallbackHandler { callback, context }, config),
    };
    Box::into_raw(Box::new(handle)) as AmcomReceiverHandle
}

/// Create a receiver that reports valid packets to `handler`.
///
/// `context` is passed through to every `handler` call and never interpreted.
/// Returns null if `handler` is null.
#[no_mangle]
pub extern "C" fn amcom_receiver_new(
    handler: AmcomPacketHandler,
    context: *mut c_void,
) -> AmcomReceiverHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();
        new_receiver(handler, context, FrameConfig::default())
    })
}

/// Create a receiver with a non-default maximum payload size.
///
/// Returns null if `handler` is null.
#[no_mangle]
pub extern "C" fn amcom_receiver_new_with_max_payload(
    handler: AmcomPacketHandler,
    context: *mut c_void,
    max_payload: u8,
) -> AmcomReceiverHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();
        new_receiver(handler, context, FrameConfig::with_max_payload(max_payload))
    })
}

/// Discard any partially received frame.
///
/// # Safety
/// `receiver` must be a valid handle returned by `amcom_receiver_new*`.
#[no_mangle]
pub unsafe extern "C" fn amcom_receiver_reset(receiver: AmcomReceiverHandle) -> AmcomResult {
    crate::ffi_boundary(AmcomResult::Internal, || {
        error::clear_error_state();

        with_receiver_mut(receiver, |handle| {
            handle.receiver.reset();
            AmcomResult::Ok
        })
    })
}

/// Feed received bytes, invoking the handler for every valid packet completed.
///
/// # Safety
/// `receiver` must be a valid handle returned by `amcom_receiver_new*`. If `len > 0`,
/// `data` must be non-null and readable for `len` bytes. The handler must not feed,
/// reset or free the same receiver.
#[no_mangle]
pub unsafe extern "C" fn amcom_receiver_feed(
    receiver: AmcomReceiverHandle,
    data: *const u8,
    len: usize,
) -> AmcomResult {
    crate::ffi_boundary(AmcomResult::Internal, || {
        error::clear_error_state();

        let bytes = {
            // SAFETY: We validate pointer/length pairing in helper.
            match unsafe { args::bytes_arg(data, len, "data") } {
                Some(v) => v,
                None => return AmcomResult::InvalidArgument,
            }
        };

        with_receiver_mut(receiver, |handle| {
            handle.receiver.feed(bytes);
            AmcomResult::Ok
        })
    })
}

/// Free a receiver handle.
///
/// # Safety
/// `receiver` must be null or a handle previously returned by `amcom_receiver_new*`.
#[no_mangle]
pub unsafe extern "C" fn amcom_receiver_free(receiver: AmcomReceiverHandle) {
    crate::ffi_boundary((), || {
        if receiver.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by amcom_receiver_new*.
        unsafe {
            drop(Box::from_raw(receiver as *mut ReceiverHandle));
        }
    });
}
