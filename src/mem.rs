//!Allocation callbacks handing zlib memory requests to Rust's global allocator
use core::ffi::{c_void, c_uint};

use core::{mem, ptr};
use std::alloc::Layout;

//Linux & win 32 bit are 8
#[cfg(not(any(target_os = "macos", all(windows, target_pointer_width = "64"))))]
const MIN_ALIGN: usize = 8;
//Mac and  win 64 bit are 16
#[cfg(any(target_os = "macos", all(windows, target_pointer_width = "64")))]
const MIN_ALIGN: usize = 16;

//Size of allocation is stored right before returned pointer, as zfree doesn't receive it.
const LAYOUT_OFFSET: usize = mem::size_of::<usize>();

#[cold]
#[inline(never)]
fn unlikely_null() -> *mut c_void {
    ptr::null_mut()
}

#[inline]
unsafe fn zmalloc(size: usize) -> *mut c_void {
    let total = match size.checked_add(LAYOUT_OFFSET) {
        Some(total) => total,
        None => return unlikely_null(),
    };

    if let Ok(layout) = Layout::from_size_align(total, MIN_ALIGN) {
        let mem = std::alloc::alloc(layout);
        if !mem.is_null() {
            ptr::write(mem as *mut usize, total);
            return mem.add(LAYOUT_OFFSET) as _
        }
    }

    unlikely_null()
}

///`zalloc` callback for `z_stream`
pub(crate) unsafe extern "C" fn zalloc(_: *mut c_void, items: c_uint, size: c_uint) -> *mut c_void {
    let size = match (items as usize).checked_mul(size as usize) {
        Some(0) | None => return unlikely_null(),
        Some(size) => size,
    };
    zmalloc(size)
}

///`zfree` callback for `z_stream`
pub(crate) unsafe extern "C" fn zfree(_: *mut c_void, mem: *mut c_void) {
    if !mem.is_null() {
        let mem = (mem as *mut u8).sub(LAYOUT_OFFSET);
        let total = ptr::read(mem as *const usize);
        let layout = Layout::from_size_align_unchecked(total, MIN_ALIGN);
        std::alloc::dealloc(mem, layout);
    }
}
