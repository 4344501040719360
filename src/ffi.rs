//! C ABI over [`dispatch`](crate::dispatch) for hosts loading the shared library.

use std::ffi::{c_char, CStr, CString};
use std::ptr;

use crate::router::dispatch;

/// Run one JSON command and return the JSON response.
///
/// # Safety
/// `command` must be null or point to a NUL-terminated string valid for the duration of
/// the call. The returned string is owned by the caller and must be released with
/// [`indusign_free_string`].
#[no_mangle]
pub unsafe extern "C" fn indusign_dispatch(command: *const c_char) -> *mut c_char {
    let input = if command.is_null() {
        String::new()
    } else {
        unsafe { CStr::from_ptr(command) }
            .to_string_lossy()
            .into_owned()
    };
    CString::new(dispatch(&input))
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

/// Release a string returned by [`indusign_dispatch`]. Null is ignored.
///
/// # Safety
/// `response` must be null or a pointer obtained from [`indusign_dispatch`] that has not
/// been freed yet.
#[no_mangle]
pub unsafe extern "C" fn indusign_free_string(response: *mut c_char) {
    if !response.is_null() {
        drop(unsafe { CString::from_raw(response) });
    }
}
