//! The fourth, out-of-core "variant": delegates straight to the host
//! system allocator. Not part of the allocation engine at all — it exists
//! purely as an A/B baseline so the three in-core designs can be benchmarked
//! against whatever `malloc` the host libc ships.

use crate::config::{ALIGN, WORD};
use std::alloc::{GlobalAlloc, Layout, System};
use std::ptr::{self, NonNull};

/// Always succeeds (there is no arena registry to fail to initialize).
pub fn init() -> bool {
    true
}

/// `Layout` for a `System`-backed allocation of `size` payload bytes,
/// prefixed by one header word recording that size. Unlike the engine
/// variants — whose block header already carries the size `free` needs to
/// reconstruct a `Layout` — plain `System::dealloc` requires the original
/// `Layout` back, so this variant has to carry it itself.
fn layout_for(size: usize) -> Option<Layout> {
    let total = size.checked_add(WORD)?;
    Layout::from_size_align(total, ALIGN).ok()
}

/// Allocate `size` payload bytes, 16-byte aligned, via the host allocator.
pub fn alloc(size: usize) -> Option<NonNull<u8>> {
    if size == 0 {
        return None;
    }
    let layout = layout_for(size)?;
    let base = NonNull::new(unsafe { System.alloc(layout) })?;
    unsafe {
        base.as_ptr().cast::<usize>().write(size);
        NonNull::new(base.as_ptr().add(WORD))
    }
}

/// Free a pointer previously returned by [`alloc`] (or [`calloc`] /
/// [`realloc`]) on this process.
pub fn free(ptr: NonNull<u8>) {
    unsafe {
        let base = ptr.as_ptr().sub(WORD);
        let size = base.cast::<usize>().read();
        let layout = layout_for(size).expect("size recorded by a prior alloc call must be valid");
        System.dealloc(base, layout);
    }
}

pub fn calloc(count: usize, size: usize) -> Option<NonNull<u8>> {
    super::checked_calloc(count, size, alloc)
}

pub fn realloc(ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
    unsafe {
        let base = ptr.as_ptr().sub(WORD);
        let old_size = base.cast::<usize>().read();
        if new_size <= old_size {
            return Some(ptr);
        }
        let new_ptr = alloc(new_size)?;
        ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), old_size.min(new_size));
        free(ptr);
        Some(new_ptr)
    }
}

/// `GlobalAlloc` adapter that forwards every call to [`std::alloc::System`].
pub struct PassthroughAllocator;

unsafe impl GlobalAlloc for PassthroughAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        unsafe { System.realloc(ptr, layout, new_size) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        unsafe { System.alloc_zeroed(layout) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_always_succeeds() {
        assert!(init());
    }

    #[test]
    fn forwards_to_the_system_allocator() {
        let layout = Layout::new::<[u8; 64]>();
        let ptr = unsafe { PassthroughAllocator.alloc(layout) };
        assert!(!ptr.is_null());
        unsafe { PassthroughAllocator.dealloc(ptr, layout) };
    }

    #[test]
    fn alloc_free_roundtrip() {
        assert!(init());
        let ptr = alloc(256).expect("allocation should succeed");
        assert_eq!(ptr.as_ptr() as usize % ALIGN, 0);
        free(ptr);
    }

    #[test]
    fn alloc_zero_is_none() {
        assert!(alloc(0).is_none());
    }

    #[test]
    fn calloc_zero_fills() {
        let count = 16;
        let ptr = calloc(count, 8).expect("allocation should succeed");
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), count * 8) };
        assert!(bytes.iter().all(|&b| b == 0));
        free(ptr);
    }

    #[test]
    fn realloc_grows_and_preserves_prefix() {
        let ptr = alloc(16).expect("allocation should succeed");
        unsafe { ptr.as_ptr().write_bytes(0xAB, 16) };
        let grown = realloc(ptr, 256).expect("reallocation should succeed");
        let bytes = unsafe { std::slice::from_raw_parts(grown.as_ptr(), 16) };
        assert!(bytes.iter().all(|&b| b == 0xAB));
        free(grown);
    }
}
