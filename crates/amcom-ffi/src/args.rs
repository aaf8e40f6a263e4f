use crate::error;

/// Convert an optional byte pointer + length into a slice.
///
/// # Safety
/// If `len > 0`, `data` must be non-null and readable for `len` bytes.
pub(crate) unsafe fn bytes_arg<'a>(data: *const u8, len: usize, name: &str) -> Option<&'a [u8]> {
    if len == 0 {
        return Some(&[]);
    }
    if data.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null when len > 0"));
        return None;
    }

    // SAFETY: Pointer and length are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Convert an output pointer + capacity into a writable slice.
///
/// # Safety
/// If `capacity > 0`, `out` must be non-null and writable for `capacity` bytes.
pub(crate) unsafe fn out_buffer_arg<'a>(
    out: *mut u8,
    capacity: usize,
    name: &str,
) -> Option<&'a mut [u8]> {
    if capacity == 0 {
        return Some(&mut []);
    }
    if out.is_null() {
        let _ = error::set_invalid_argument(format!("{name} cannot be null when capacity > 0"));
        return None;
    }

    // SAFETY: Pointer and capacity are validated above and owned by caller for the call duration.
    Some(unsafe { std::slice::from_raw_parts_mut(out, capacity) })
}
