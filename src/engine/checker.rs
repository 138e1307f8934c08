//! Heap consistency checker: a debug-assertion-gated boundary-tag walker,
//! callable at a quiescent point to validate block sizing, header/footer
//! and prev-alloc-bit consistency, and the no-adjacent-free-blocks
//! invariant. Wired in behind the `checked` feature after every
//! [`super::heap::free`], and used directly by the property tests in
//! `tests/properties.rs`.

use super::arena::LockedArena;
use super::error::AllocError;
use super::header;
use crate::config::{ALIGN, MIN_BLOCK};
use std::sync::atomic::Ordering;

/// Walk every block from `heap_start` to the epilogue, checking:
/// - every block's size is at least [`MIN_BLOCK`] and a multiple of [`ALIGN`].
/// - a free block's header and footer words are bitwise equal.
/// - each block's prev-alloc bit matches the preceding block's alloc bit.
/// - no two adjacent blocks are both free.
pub fn walk(la: &LockedArena<'_>) -> Result<(), AllocError> {
    let mut cur = la.arena.heap_start() as *mut u8;
    let end = la.arena.heap_end().load(Ordering::Relaxed);
    let mut prev_was_free = false;
    let mut expected_prev_alloc = true; // the prologue is always allocated

    while (cur as usize) < end {
        let word = unsafe { header::read_word(cur) };
        let size = header::extract_size(word);
        let alloc = header::extract_alloc(word);
        let prev_alloc = header::extract_prev_alloc(word);

        if size == 0 {
            // the epilogue; nothing more to check.
            break;
        }

        if size < MIN_BLOCK || size % ALIGN != 0 {
            log::error!("block at {cur:p} has invalid size {size}");
            return Err(AllocError::InvariantViolation);
        }
        if prev_alloc != expected_prev_alloc {
            log::error!(
                "block at {cur:p} has prev_alloc={prev_alloc}, expected {expected_prev_alloc}"
            );
            return Err(AllocError::InvariantViolation);
        }
        if !alloc {
            let footer = unsafe { header::footer_ptr(cur, size) };
            let footer_word = unsafe { header::read_word(footer) };
            if footer_word != word {
                log::error!("block at {cur:p} has mismatched header/footer");
                return Err(AllocError::InvariantViolation);
            }
            if prev_was_free {
                log::error!("block at {cur:p} is free and adjacent to a free predecessor");
                return Err(AllocError::InvariantViolation);
            }
        }

        prev_was_free = !alloc;
        expected_prev_alloc = alloc;
        cur = unsafe { cur.add(size) };
    }

    log::debug!("heap checker: arena at {:p} ok", la.arena.base());
    Ok(())
}

/// Every free block currently reachable from `la`'s free lists, walked for
/// test use to confirm list membership matches free-block status.
pub fn free_list_members(la: &LockedArena<'_>) -> Vec<*mut u8> {
    la.inner
        .seglists
        .iter()
        .flat_map(|list| list.iter())
        .collect()
}
