//! A multithreaded general-purpose allocator, backed by per-arena
//! segregated free lists and fronted, optionally, by a per-thread cache.
//!
//! This crate exists to let three allocator designs be benchmarked against
//! each other under one shared engine:
//!
//! - **`naive`**: one process-wide heap behind one process-wide mutex.
//! - **`arena`**: the heap partitioned into several independent arenas,
//!   each with its own mutex, dispatched round-robin.
//! - **`arena-cache`** (the default): the arena design fronted by a
//!   per-thread cache of recently freed blocks, so that an alloc/free pair
//!   on the same thread often never touches an arena mutex at all.
//!
//! Exactly one of these is compiled in at a time, selected by Cargo
//! feature; see the crate's `Cargo.toml` for the full list, including the
//! `passthrough` feature (delegates to the host system allocator, used only
//! as an A/B baseline — not part of the allocation engine proper).
//!
//! # Usage
//! Plug [`ALLOCATOR`] in as your global allocator:
//! ```no_run
//! #[global_allocator]
//! static ALLOCATOR: arenalloc::Allocator = arenalloc::ALLOCATOR;
//! ```
//! or call the lower-level [`alloc`]/[`free`] functions directly after
//! [`init`]:
//! ```
//! assert!(arenalloc::init());
//! let ptr = arenalloc::alloc(128).expect("allocation should succeed");
//! arenalloc::free(ptr);
//! ```
//!
//! # Implementation
//! Every arena is one contiguous anonymous memory mapping managed as a
//! classic implicit free list with boundary tags: each block carries an
//! 8-byte header (free blocks also carry a footer), packing size and two
//! status bits (allocated, previous-block-allocated) into one word so that
//! adjacent free blocks can always be coalesced and an allocated block
//! never needs to read a footer that doesn't exist. Free blocks of similar
//! size are threaded onto one of fifteen segregated free lists per arena,
//! searched best-of-`N` and capped at two size classes per allocation so
//! that worst-case search work stays bounded. See [`engine`] for the full
//! breakdown (block codec, free lists, heap manager, arena registry,
//! thread cache) and `DESIGN.md` in the repository root for the rationale
//! behind each design choice.
//!
//! The allocator never returns memory to the OS: arenas are reserved once,
//! at [`init`], and held for the life of the process. Deliberately out of
//! scope: NUMA awareness, huge pages, decommitting freed memory back to
//! the OS, alignment beyond 16 bytes, and allocation classes larger than
//! one arena's capacity.

pub mod config;
pub mod engine;
pub mod facade;

use std::ptr::NonNull;

#[cfg(all(feature = "naive", feature = "arena"))]
compile_error!("at most one of the `naive`/`arena`/`arena-cache`/`passthrough` features may be enabled");
#[cfg(all(feature = "naive", feature = "arena-cache"))]
compile_error!("at most one of the `naive`/`arena`/`arena-cache`/`passthrough` features may be enabled");
#[cfg(all(feature = "naive", feature = "passthrough"))]
compile_error!("at most one of the `naive`/`arena`/`arena-cache`/`passthrough` features may be enabled");
#[cfg(all(feature = "arena", feature = "arena-cache"))]
compile_error!("at most one of the `naive`/`arena`/`arena-cache`/`passthrough` features may be enabled");
#[cfg(all(feature = "arena", feature = "passthrough"))]
compile_error!("at most one of the `naive`/`arena`/`arena-cache`/`passthrough` features may be enabled");
#[cfg(all(feature = "arena-cache", feature = "passthrough"))]
compile_error!("at most one of the `naive`/`arena`/`arena-cache`/`passthrough` features may be enabled");
#[cfg(not(any(
    feature = "naive",
    feature = "arena",
    feature = "arena-cache",
    feature = "passthrough"
)))]
compile_error!("exactly one of the `naive`/`arena`/`arena-cache`/`passthrough` features must be enabled");

#[cfg(feature = "naive")]
use facade::naive as selected;
#[cfg(feature = "arena")]
use facade::arena as selected;
#[cfg(feature = "arena-cache")]
use facade::cached as selected;
#[cfg(feature = "passthrough")]
use facade::passthrough as selected;

/// The `GlobalAlloc` type for whichever variant is selected by feature
/// flag. See the crate-level docs for the full list of variants.
#[cfg(feature = "naive")]
pub type Allocator = facade::naive::NaiveAllocator;
#[cfg(feature = "arena")]
pub type Allocator = facade::arena::ArenaAllocator;
#[cfg(feature = "arena-cache")]
pub type Allocator = facade::cached::CachedAllocator;
#[cfg(feature = "passthrough")]
pub type Allocator = facade::passthrough::PassthroughAllocator;

/// A value of the selected [`Allocator`] type, usable directly in a
/// `#[global_allocator]` static.
#[cfg(feature = "naive")]
pub const ALLOCATOR: Allocator = facade::naive::NaiveAllocator;
#[cfg(feature = "arena")]
pub const ALLOCATOR: Allocator = facade::arena::ArenaAllocator;
#[cfg(feature = "arena-cache")]
pub const ALLOCATOR: Allocator = facade::cached::CachedAllocator;
#[cfg(feature = "passthrough")]
pub const ALLOCATOR: Allocator = facade::passthrough::PassthroughAllocator;

/// Initialize the allocator's process-wide state (arena registry, or a
/// single global heap for the naive variant). Idempotent: safe to call
/// more than once, and safe to call redundantly before every use.
///
/// Returns `false` if the host OS declined to provide the backing memory
/// mapping(s); `alloc` then also returns `None` for every request.
#[must_use]
pub fn init() -> bool {
    selected::init()
}

/// Allocate `size` payload bytes, 16-byte aligned. Returns `None` if
/// `size == 0` or no arena has room (and, for the arena variants, [`init`]
/// has not yet succeeded).
pub fn alloc(size: usize) -> Option<NonNull<u8>> {
    selected::alloc(size)
}

/// Free a pointer previously returned by [`alloc`] (or [`calloc`] /
/// [`realloc`]) on this process. Freeing any other pointer, or freeing the
/// same pointer twice, is undefined behaviour.
pub fn free(ptr: NonNull<u8>) {
    selected::free(ptr)
}

/// Allocate `count * size` bytes and zero-fill them. Returns `None` on
/// overflow of `count * size` or if the underlying [`alloc`] fails.
pub fn calloc(count: usize, size: usize) -> Option<NonNull<u8>> {
    selected::calloc(count, size)
}

/// Resize the allocation at `ptr` to `new_size` bytes, preserving the
/// smaller of the old and new sizes' worth of content. May return the same
/// pointer (if it already had room) or a fresh one (after copying and
/// freeing the old block).
pub fn realloc(ptr: NonNull<u8>, new_size: usize) -> Option<NonNull<u8>> {
    selected::realloc(ptr, new_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_alloc_free_roundtrip() {
        assert!(init());
        let ptr = alloc(100).expect("allocation should succeed");
        free(ptr);
    }

    #[test]
    fn alloc_zero_is_none() {
        assert!(init());
        assert!(alloc(0).is_none());
    }

    #[test]
    fn calloc_zero_fills() {
        assert!(init());
        let count = 16;
        let ptr = calloc(count, 8).expect("allocation should succeed");
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), count * 8) };
        assert!(bytes.iter().all(|&b| b == 0));
        free(ptr);
    }

    #[test]
    fn realloc_grows_and_preserves_prefix() {
        assert!(init());
        let ptr = alloc(16).expect("allocation should succeed");
        unsafe { ptr.as_ptr().write_bytes(0xAB, 16) };
        let grown = realloc(ptr, 256).expect("reallocation should succeed");
        let bytes = unsafe { std::slice::from_raw_parts(grown.as_ptr(), 16) };
        assert!(bytes.iter().all(|&b| b == 0xAB));
        free(grown);
    }

    #[test]
    fn pointers_are_16_byte_aligned() {
        assert!(init());
        for size in [1usize, 7, 16, 63, 1000, 1 << 16] {
            let ptr = alloc(size).expect("allocation should succeed");
            assert_eq!(ptr.as_ptr() as usize % 16, 0);
            free(ptr);
        }
    }
}
