//! Variant 1: one process-wide heap behind one process-wide mutex.
//!
//! The simplest of the three designs — no arena dispatch, no ownership
//! lookup on free, just a single [`Arena`] guarded by its own mutex. Kept
//! around specifically so it can be benchmarked against the arena and
//! arena-cache variants.

use crate::engine::arena::Arena;
use crate::engine::header;
use crate::engine::heap;
use std::alloc::{GlobalAlloc, Layout};
use std::ptr::{self, NonNull};
use std::sync::OnceLock;

static HEAP: OnceLock<Arena> = OnceLock::new();

/// Initialize the single global heap. Idempotent.
pub fn init() -> bool {
    if HEAP.get().is_some() {
        return true;
    }
    match Arena::new() {
        Ok(arena) => {
            let _ = HEAP.set(arena);
            true
        }
        Err(err) => {
            log::error!("naive heap init failed: {err}");
            false
        }
    }
}

pub fn alloc(size: usize) -> Option<NonNull<u8>> {
    let heap_arena = HEAP.get()?;
    let mut locked = heap_arena.lock();
    unsafe { heap::alloc(&mut locked, size) }.map(|b| unsafe { header::header_to_payload(b) })
}

pub fn free(ptr: NonNull<u8>) {
    let Some(heap_arena) = HEAP.get() else {
        log::error!("free called before init");
        return;
    };
    let mut locked = heap_arena.lock();
    unsafe { heap::free(&mut locked, ptr.as_ptr()) };
}

pub fn calloc(count: usize, size: usize) -> Option<NonNull<u8>> {
    super::checked_calloc(count, size, alloc)
}

pub fn realloc(ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
    super::checked_realloc(ptr, new_size, alloc, free)
}

/// `GlobalAlloc` adapter over the naive single-lock variant.
pub struct NaiveAllocator;

unsafe impl GlobalAlloc for NaiveAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > crate::config::ALIGN {
            // Alignment beyond the fixed 16-byte guarantee is out of scope;
            // see `spec.md`'s alignment Non-goal.
            return ptr::null_mut();
        }
        match alloc(layout.size()) {
            Some(ptr) => ptr.as_ptr(),
            None => ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        if let Some(ptr) = NonNull::new(ptr) {
            free(ptr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        assert!(init());
        assert!(init());
    }

    #[test]
    fn alloc_free_roundtrip() {
        assert!(init());
        let ptr = alloc(128).expect("allocation should succeed");
        free(ptr);
    }
}
