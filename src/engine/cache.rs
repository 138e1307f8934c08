//! Per-thread cache of recently freed blocks.
//!
//! Strictly thread-local: never touched by another thread, never locked.
//! A cached block's underlying header still says "allocated" — the owning
//! arena does not consider it free until it is evicted and handed back
//! through [`super::heap::free`].

use super::header;
use crate::config::{CACHE_EVICT_PROBABILITY, CACHE_MAX_ENTRIES, CACHE_MAX_SIZE};
use rand::Rng;
use std::ptr;

/// Sentinel `front` value meaning "cache is empty".
const EMPTY: usize = CACHE_MAX_ENTRIES;

pub struct ThreadCache {
    slots: [*mut u8; CACHE_MAX_ENTRIES],
    /// Index of the lowest occupied slot, or [`EMPTY`].
    front: usize,
    num_entries: usize,
    total_size: usize,
}

impl ThreadCache {
    pub fn new() -> Self {
        Self {
            slots: [ptr::null_mut(); CACHE_MAX_ENTRIES],
            front: EMPTY,
            num_entries: 0,
            total_size: 0,
        }
    }

    /// First cached block whose size is `>= asize`, scanning from `front`
    /// upward. No best-fit: the cache is tiny, so the first hit is taken.
    /// The returned block's header is already marked allocated.
    ///
    /// # Safety
    /// Every non-null slot must point at a valid block header.
    pub unsafe fn query(&mut self, asize: usize) -> Option<*mut u8> {
        let mut i = self.front;
        while i < CACHE_MAX_ENTRIES {
            let b = self.slots[i];
            if !b.is_null() {
                let size = unsafe { header::extract_size(header::read_word(b)) };
                if size >= asize {
                    self.slots[i] = ptr::null_mut();
                    self.num_entries -= 1;
                    self.total_size -= size;
                    self.advance_front();
                    return Some(b);
                }
            }
            i += 1;
        }
        None
    }

    fn advance_front(&mut self) {
        while self.front < CACHE_MAX_ENTRIES && self.slots[self.front].is_null() {
            self.front += 1;
        }
    }

    /// Try to insert `b`. Fails (returning `false`, cache left unchanged)
    /// if the cache is full or `b` would push `total_size` over
    /// [`CACHE_MAX_SIZE`].
    ///
    /// # Safety
    /// `b` must be a valid, currently-allocated block header not already
    /// present in this cache.
    pub unsafe fn add(&mut self, b: *mut u8) -> bool {
        let size = unsafe { header::extract_size(header::read_word(b)) };
        if self.num_entries >= CACHE_MAX_ENTRIES || self.total_size + size > CACHE_MAX_SIZE {
            return false;
        }
        debug_assert!(
            self.slots.iter().all(|&slot| slot != b),
            "block already present in thread cache"
        );
        let idx = self
            .slots
            .iter()
            .position(|&slot| slot.is_null())
            .expect("num_entries < CACHE_MAX_ENTRIES implies a free slot exists");
        self.slots[idx] = b;
        if idx < self.front {
            self.front = idx;
        }
        self.num_entries += 1;
        self.total_size += size;
        true
    }

    /// Remove and return the `front` slot's block, advancing `front` to the
    /// next occupant. `None` if the cache is empty.
    pub fn evict(&mut self) -> Option<*mut u8> {
        if self.front >= CACHE_MAX_ENTRIES {
            return None;
        }
        let b = self.slots[self.front];
        let size = unsafe { header::extract_size(header::read_word(b)) };
        self.slots[self.front] = ptr::null_mut();
        self.num_entries -= 1;
        self.total_size -= size;
        self.advance_front();
        Some(b)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.num_entries
    }
}

impl Default for ThreadCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Up to two block pointers that must be returned to their owning arenas
/// after a cache operation. Almost always holds exactly one; the second
/// slot only fires on the rare double-failed-add edge case documented in
/// [`offer`].
pub struct ToFree {
    items: [*mut u8; 2],
    len: u8,
}

impl ToFree {
    fn one(p: *mut u8) -> Self {
        Self {
            items: [p, ptr::null_mut()],
            len: 1,
        }
    }

    fn two(a: *mut u8, b: *mut u8) -> Self {
        Self { items: [a, b], len: 2 }
    }

    pub fn iter(&self) -> impl Iterator<Item = *mut u8> + '_ {
        self.items[..self.len as usize].iter().copied()
    }
}

pub enum Offer {
    /// `b` was cached; nothing else to do.
    Cached,
    /// `b` (and possibly one evicted block) must be freed to their arenas.
    Free(ToFree),
}

/// Offer a freshly-freed block to the thread cache, applying the
/// probabilistic-eviction rule when the cache is full: flip a weighted coin
/// (`CACHE_EVICT_PROBABILITY`); on heads, evict the front block and retry
/// the add; on tails, or if the retry still fails, bypass the cache.
pub fn offer(tc: &mut ThreadCache, b: *mut u8) -> Offer {
    if unsafe { tc.add(b) } {
        return Offer::Cached;
    }

    let mut rng = rand::thread_rng();
    if rng.gen_bool(CACHE_EVICT_PROBABILITY) {
        if let Some(evicted) = tc.evict() {
            if unsafe { tc.add(b) } {
                return Offer::Free(ToFree::one(evicted));
            }
            return Offer::Free(ToFree::two(evicted, b));
        }
    }
    Offer::Free(ToFree::one(b))
}
