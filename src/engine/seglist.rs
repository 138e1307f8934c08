//! Segregated free lists: fifteen doubly-linked LIFOs per arena, indexed by
//! size class.
//!
//! A free block's first 16 payload bytes overlay two link fields (prev-in-
//! list, next-in-list), stored as raw block-header addresses with `0`
//! doubling as the null sentinel — the same "treat the link as a raw offset
//! into the arena, not an owning reference" approach the design notes call
//! for.

use super::header;
use crate::config::{LIST_PROBE_DEPTH, MAXLISTS, MAX_SCAN, WORD};
use std::ptr;

#[inline]
unsafe fn link_prev(b: *mut u8) -> *mut u8 {
    unsafe { header::read_word(b.add(WORD)) as *mut u8 }
}

#[inline]
unsafe fn link_next(b: *mut u8) -> *mut u8 {
    unsafe { header::read_word(b.add(2 * WORD)) as *mut u8 }
}

#[inline]
unsafe fn set_link_prev(b: *mut u8, p: *mut u8) {
    unsafe { header::write_word(b.add(WORD), p as u64) }
}

#[inline]
unsafe fn set_link_next(b: *mut u8, n: *mut u8) {
    unsafe { header::write_word(b.add(2 * WORD), n as u64) }
}

/// One size class's free list.
#[derive(Debug)]
pub struct FreeList {
    head: *mut u8,
}

impl FreeList {
    pub const fn new() -> Self {
        Self {
            head: ptr::null_mut(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    /// Push `b` onto the head of this list. Idempotent if `b` is already
    /// the head (guards against a stray double-insert).
    ///
    /// # Safety
    /// `b` must be a free block not currently a member of any other list.
    pub unsafe fn add(&mut self, b: *mut u8) {
        if self.head == b {
            return;
        }
        unsafe {
            set_link_prev(b, ptr::null_mut());
            set_link_next(b, self.head);
            if !self.head.is_null() {
                set_link_prev(self.head, b);
            }
        }
        self.head = b;
    }

    /// Remove `b` from this list.
    ///
    /// # Safety
    /// `b` must currently be a member of this list.
    pub unsafe fn remove(&mut self, b: *mut u8) {
        unsafe {
            let p = link_prev(b);
            let n = link_next(b);
            if p.is_null() {
                self.head = n;
            } else {
                set_link_next(p, n);
            }
            if !n.is_null() {
                set_link_prev(n, p);
            }
            set_link_prev(b, ptr::null_mut());
            set_link_next(b, ptr::null_mut());
        }
    }

    /// Best-of-`MAX_SCAN` search: the smallest-overhead block of size
    /// `>= asize` among the first `MAX_SCAN` blocks visited from the head.
    /// Returns immediately on an exact-size match.
    ///
    /// # Safety
    /// Every block reachable from `head` must be a valid free block.
    pub unsafe fn search(&self, asize: usize) -> Option<*mut u8> {
        let mut cur = self.head;
        let mut best: Option<(*mut u8, usize)> = None;
        let mut visited = 0;
        unsafe {
            while !cur.is_null() && visited < MAX_SCAN {
                let size = header::extract_size(header::read_word(cur));
                if size >= asize {
                    let overhead = size - asize;
                    if overhead == 0 {
                        return Some(cur);
                    }
                    let better = match best {
                        Some((_, bo)) => overhead < bo,
                        None => true,
                    };
                    if better {
                        best = Some((cur, overhead));
                    }
                }
                cur = link_next(cur);
                visited += 1;
            }
        }
        best.map(|(b, _)| b)
    }

    /// Iterate every block currently linked into this list, for test and
    /// checker use only.
    pub fn iter(&self) -> FreeListIter<'_> {
        FreeListIter {
            cur: self.head,
            _list: self,
        }
    }
}

impl Default for FreeList {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FreeListIter<'a> {
    cur: *mut u8,
    _list: &'a FreeList,
}

impl Iterator for FreeListIter<'_> {
    type Item = *mut u8;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cur.is_null() {
            return None;
        }
        let b = self.cur;
        self.cur = unsafe { link_next(b) };
        Some(b)
    }
}

/// Fixed array of the fifteen size-class lists owned by one arena.
pub type SegLists = [FreeList; MAXLISTS];

pub fn new_seglists() -> SegLists {
    std::array::from_fn(|_| FreeList::new())
}

/// Probe the minimum list that could fit `asize` and [`LIST_PROBE_DEPTH`]
/// lists deeper, returning the first hit. Bounds total work to
/// `O(LIST_PROBE_DEPTH * MAX_SCAN)`.
///
/// # Safety
/// Every free list in `lists` must only contain valid free blocks.
pub unsafe fn find_fit(lists: &SegLists, asize: usize) -> Option<*mut u8> {
    let c_min = header::size_class(asize);
    for c in c_min..(c_min + LIST_PROBE_DEPTH).min(MAXLISTS) {
        if let Some(b) = unsafe { lists[c].search(asize) } {
            return Some(b);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::alloc::{alloc as raw_alloc, dealloc as raw_dealloc, Layout};

    struct Scratch {
        ptr: *mut u8,
        layout: Layout,
    }
    impl Scratch {
        fn new(len: usize) -> Self {
            let layout = Layout::from_size_align(len, 16).unwrap();
            let ptr = unsafe { raw_alloc(layout) };
            Self { ptr, layout }
        }
        fn block(&self, offset: usize, size: usize, prev_alloc: bool) -> *mut u8 {
            let b = unsafe { self.ptr.add(offset) };
            unsafe { header::write_free(b, size, prev_alloc) };
            b
        }
    }
    impl Drop for Scratch {
        fn drop(&mut self) {
            unsafe { raw_dealloc(self.ptr, self.layout) };
        }
    }

    #[test]
    fn add_remove_head() {
        let scratch = Scratch::new(256);
        let mut list = FreeList::new();
        let b0 = scratch.block(0, 64, true);
        let b1 = scratch.block(64, 64, true);
        unsafe {
            list.add(b0);
            list.add(b1);
        }
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![b1, b0]);
        unsafe { list.remove(b1) };
        assert_eq!(list.iter().collect::<Vec<_>>(), vec![b0]);
        unsafe { list.remove(b0) };
        assert!(list.is_empty());
    }

    #[test]
    fn search_prefers_exact_then_best_fit() {
        let scratch = Scratch::new(1024);
        let mut list = FreeList::new();
        let sizes = [128usize, 96, 64, 256];
        let mut offset = 0;
        for &size in &sizes {
            let b = scratch.block(offset, size, true);
            unsafe { list.add(b) };
            offset += size;
        }
        // asize = 64 should pick the 64-byte block exactly.
        let hit = unsafe { list.search(64) }.unwrap();
        assert_eq!(unsafe { header::extract_size(header::read_word(hit)) }, 64);
    }

    #[test]
    fn search_returns_none_when_nothing_fits() {
        let scratch = Scratch::new(256);
        let mut list = FreeList::new();
        let b0 = scratch.block(0, 32, true);
        unsafe { list.add(b0) };
        assert!(unsafe { list.search(64) }.is_none());
    }
}
