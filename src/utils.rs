use core::ffi::{c_char, CStr};

///Converts engine diagnostic into owned text, if engine set one.
pub(crate) fn convert_c_str(msg: *const c_char) -> Option<String> {
    if msg.is_null() {
        return None;
    }

    let msg = unsafe {
        CStr::from_ptr(msg)
    };
    Some(msg.to_string_lossy().into_owned())
}
