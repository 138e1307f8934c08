//! Heap manager: coalescing, splitting, heap extension and the top-level
//! `alloc`/`free` operations over one arena's contiguous region.

use super::arena::LockedArena;
use super::header;
use super::seglist::find_fit;
use crate::config::{CHUNK, MIN_BLOCK, WORD};
use std::sync::atomic::Ordering;

fn seglist_index(b: *mut u8) -> usize {
    let size = unsafe { header::extract_size(header::read_word(b)) };
    header::size_class(size)
}

unsafe fn seglist_insert(la: &mut LockedArena<'_>, b: *mut u8) {
    let idx = seglist_index(b);
    unsafe { la.inner.seglists[idx].add(b) };
}

unsafe fn seglist_remove(la: &mut LockedArena<'_>, b: *mut u8) {
    let idx = seglist_index(b);
    unsafe { la.inner.seglists[idx].remove(b) };
}

/// Round a requested extension size up to a multiple of 16 (no doubling —
/// that rule is specific to allocation requests, not heap growth).
fn round_chunk(bytes: usize) -> usize {
    (bytes + 15) & !15
}

/// The prev-alloc bit currently sitting in the epilogue, i.e. the
/// allocation status of the last real block on the heap (or `true` if the
/// heap is still empty, since the preceding "block" is the prologue).
unsafe fn epilogue_prev_alloc(la: &LockedArena<'_>) -> bool {
    let epilogue = la.arena.heap_end().load(Ordering::Relaxed) as *mut u8 - WORD;
    unsafe { header::extract_prev_alloc(header::read_word(epilogue)) }
}

/// Grow the heap by `bytes` (rounded up to a multiple of 16), turning the
/// old epilogue into the new block's header and writing a fresh epilogue
/// past it. Coalesces with a free predecessor and inserts the result into
/// its free list before returning it.
///
/// # Safety
/// Must be called with `la` locked and consistent.
pub unsafe fn extend(la: &mut LockedArena<'_>, bytes: usize, prev_alloc: bool) -> Option<*mut u8> {
    let bytes = round_chunk(bytes);
    let heap_end = la.arena.heap_end().load(Ordering::Relaxed);
    let new_end = heap_end.checked_add(bytes)?;
    if new_end > la.arena.base() as usize + la.arena.capacity() {
        return None;
    }

    let block = (heap_end - WORD) as *mut u8;
    unsafe { header::write_free(block, bytes, prev_alloc) };

    let epilogue = unsafe { block.add(bytes) };
    unsafe { header::write_alloc(epilogue, 0, false) };
    let new_heap_end = unsafe { epilogue.add(WORD) } as usize;
    la.arena.heap_end().store(new_heap_end, Ordering::Release);

    let merged = unsafe { coalesce(la, block) };
    unsafe { seglist_insert(la, merged) };
    Some(merged)
}

/// Merge `b` (just written as a free block) with any free neighbours,
/// updating the block following the merged region so its prev-alloc bit
/// reflects the (now free) merged block. Returns the merged block's
/// address, which may be `b`, its predecessor, or unchanged.
///
/// # Safety
/// `b` must currently be written as a free block (header == footer) not yet
/// a member of any free list.
pub unsafe fn coalesce(la: &mut LockedArena<'_>, b: *mut u8) -> *mut u8 {
    unsafe {
        let word = header::read_word(b);
        let size = header::extract_size(word);
        let prev_alloc = header::extract_prev_alloc(word);

        let next = b.add(size);
        let next_word = header::read_word(next);
        let next_alloc = header::extract_alloc(next_word);

        let merged = match (prev_alloc, next_alloc) {
            (true, true) => b,
            (true, false) => {
                let next_size = header::extract_size(next_word);
                seglist_remove(la, next);
                header::write_free(b, size + next_size, true);
                b
            }
            (false, true) => {
                let prev = header::prev(b);
                let prev_word = header::read_word(prev);
                let prev_size = header::extract_size(prev_word);
                let prev_prev_alloc = header::extract_prev_alloc(prev_word);
                seglist_remove(la, prev);
                header::write_free(prev, prev_size + size, prev_prev_alloc);
                prev
            }
            (false, false) => {
                let prev = header::prev(b);
                let prev_word = header::read_word(prev);
                let prev_size = header::extract_size(prev_word);
                let prev_prev_alloc = header::extract_prev_alloc(prev_word);
                let next_size = header::extract_size(next_word);
                seglist_remove(la, prev);
                seglist_remove(la, next);
                header::write_free(prev, prev_size + size + next_size, prev_prev_alloc);
                prev
            }
        };

        let merged_size = header::extract_size(header::read_word(merged));
        let following = merged.add(merged_size);
        header::set_prev_alloc(following, false);
        merged
    }
}

/// Shrink `b` (already written allocated at its full, pre-split size) to
/// `asize`, carving the remainder into a new free block when the leftover
/// is at least [`MIN_BLOCK`]. Leaves `b` untouched otherwise (internal
/// slack).
///
/// # Safety
/// `b` must be a freshly allocated block not present in any free list.
pub unsafe fn split(la: &mut LockedArena<'_>, b: *mut u8, asize: usize) {
    unsafe {
        let word = header::read_word(b);
        let size = header::extract_size(word);
        let prev_alloc = header::extract_prev_alloc(word);

        if size - asize < MIN_BLOCK {
            return;
        }

        header::write_alloc(b, asize, prev_alloc);
        let remainder_size = size - asize;
        let remainder = b.add(asize);
        header::write_free(remainder, remainder_size, true);
        seglist_insert(la, remainder);

        let following = remainder.add(remainder_size);
        header::set_prev_alloc(following, false);
    }
}

/// Allocate `size` payload bytes, returning a block header pointer (not yet
/// converted to a payload pointer — callers use [`header::header_to_payload`]).
///
/// # Safety
/// Must be called with `la` locked and consistent.
pub unsafe fn alloc(la: &mut LockedArena<'_>, size: usize) -> Option<*mut u8> {
    let asize = header::asize_for(size)?;

    let b = match unsafe { find_fit(&la.inner.seglists, asize) } {
        Some(b) => b,
        None => {
            let prev_alloc = unsafe { epilogue_prev_alloc(la) };
            let grow = asize.max(CHUNK);
            match unsafe { extend(la, grow, prev_alloc) } {
                Some(b) => b,
                None => {
                    if la.arena.note_exhausted() {
                        log::warn!("arena exhausted: no room for a {asize}-byte block");
                    }
                    return None;
                }
            }
        }
    };
    unsafe { seglist_remove(la, b) };

    let word = unsafe { header::read_word(b) };
    let full_size = header::extract_size(word);
    let prev_alloc = header::extract_prev_alloc(word);
    unsafe { header::write_alloc(b, full_size, prev_alloc) };
    unsafe { split(la, b, asize) };

    let next = unsafe { header::next(b) };
    unsafe { header::set_prev_alloc(next, true) };

    Some(b)
}

/// Free the block whose payload pointer is `payload`.
///
/// # Safety
/// `payload` must have been returned by a prior `alloc` on this same arena
/// and not already freed.
pub unsafe fn free(la: &mut LockedArena<'_>, payload: *mut u8) {
    unsafe {
        let b = header::payload_to_header(payload);
        let word = header::read_word(b);
        debug_assert!(
            header::extract_alloc(word),
            "double free or free of an unallocated block"
        );
        let size = header::extract_size(word);
        let prev_alloc = header::extract_prev_alloc(word);
        header::write_free(b, size, prev_alloc);

        let merged = coalesce(la, b);
        seglist_insert(la, merged);

        #[cfg(feature = "checked")]
        {
            if let Err(err) = super::checker::walk(la) {
                panic!("{err}");
            }
        }
    }
}
