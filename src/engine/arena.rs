//! Arena registry: N independent sub-heaps, each with its own mutex, address
//! range and free lists, plus the process-wide round-robin dispatch counter.

use super::error::AllocError;
use super::header;
use super::seglist::{new_seglists, SegLists};
use crate::config::{ARENAS, ARENA_MAX, CHUNK};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::OnceLock;

/// Metadata mutated only while an arena's mutex is held.
#[derive(Debug)]
pub struct ArenaInner {
    pub(crate) seglists: SegLists,
}

/// One independent sub-heap: a fixed virtual mapping, a growable usable
/// region within it, and the free lists covering that region.
pub struct Arena {
    base: *mut u8,
    capacity: usize,
    /// Fixed after construction: the first block boundary, just past the
    /// prologue.
    heap_start: usize,
    /// Mutated only while `inner` is locked; loaded without the lock by
    /// [`Arena::owns`] to decide whether to even attempt acquiring it.
    heap_end: AtomicUsize,
    /// Set once this arena has logged its first exhaustion, so a hot
    /// exhausted arena doesn't flood the log on every subsequent miss.
    warned_exhausted: AtomicBool,
    inner: Mutex<ArenaInner>,
}

// SAFETY: `base`/`capacity`/`heap_start` are set once before the `Arena` is
// ever shared and never mutated afterwards; all other state is behind
// `inner`'s mutex or `heap_end`'s atomic.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

impl Arena {
    /// Reserve a fresh `ARENA_MAX`-byte mapping, write its sentinels and
    /// seed the first free block with one `CHUNK`-sized extension.
    pub fn new() -> Result<Self, AllocError> {
        let base = map_region(ARENA_MAX)?;
        // Prologue: zero-size, allocated, "previous" (nothing) allocated.
        unsafe { header::write_alloc(base, 0, true) };
        let heap_start = unsafe { base.add(crate::config::WORD) };
        // Initial epilogue, consumed by the first `extend` call below.
        unsafe { header::write_alloc(heap_start, 0, true) };
        let heap_end = unsafe { heap_start.add(crate::config::WORD) };

        let arena = Self {
            base,
            capacity: ARENA_MAX,
            heap_start: heap_start as usize,
            heap_end: AtomicUsize::new(heap_end as usize),
            warned_exhausted: AtomicBool::new(false),
            inner: Mutex::new(ArenaInner {
                seglists: new_seglists(),
            }),
        };

        let mut locked = arena.lock();
        unsafe { super::heap::extend(&mut locked, CHUNK, true) }.ok_or(AllocError::OutOfAddressSpace)?;
        drop(locked);
        Ok(arena)
    }

    pub fn base(&self) -> *mut u8 {
        self.base
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn heap_start(&self) -> usize {
        self.heap_start
    }

    pub(crate) fn heap_end(&self) -> &AtomicUsize {
        &self.heap_end
    }

    /// Acquire this arena's mutex.
    pub fn lock(&self) -> LockedArena<'_> {
        LockedArena {
            arena: self,
            inner: self.inner.lock(),
        }
    }

    /// Half-open-interval ownership test: does `ptr` fall within
    /// `[heap_start, heap_end)`? See DESIGN.md for why the interval is
    /// half-open rather than the original's inclusive upper bound.
    fn owns(&self, ptr: *mut u8) -> bool {
        let addr = ptr as usize;
        addr >= self.heap_start && addr < self.heap_end.load(Ordering::Acquire)
    }

    /// Lock this arena if (and only if) it owns `ptr`.
    pub fn lookup(&self, ptr: *mut u8) -> Option<LockedArena<'_>> {
        if self.owns(ptr) {
            Some(self.lock())
        } else {
            None
        }
    }

    /// Returns `true` the first time this arena is reported exhausted,
    /// `false` on every call after that.
    pub(crate) fn note_exhausted(&self) -> bool {
        self.warned_exhausted
            .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }
}

/// A locked arena: bundles the immutable arena handle with the mutex guard
/// over its mutable metadata, so [`super::heap`] operations can reach both
/// without threading two parameters through every call.
pub struct LockedArena<'a> {
    pub(crate) arena: &'a Arena,
    pub(crate) inner: MutexGuard<'a, ArenaInner>,
}

fn map_region(len: usize) -> Result<*mut u8, AllocError> {
    // SAFETY: a fixed-size, anonymous, private read-write mapping with no
    // file backing; `mmap` either succeeds with a fresh region or returns
    // `MAP_FAILED`, both handled below.
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        Err(AllocError::OutOfOsMemory)
    } else {
        Ok(ptr.cast())
    }
}

/// The process-wide arena array plus its round-robin dispatch counter.
pub struct Registry {
    arenas: Vec<Arena>,
    next: AtomicU64,
}

impl Registry {
    fn new(count: usize) -> Result<Self, AllocError> {
        let mut arenas = Vec::with_capacity(count);
        for _ in 0..count {
            arenas.push(Arena::new()?);
        }
        Ok(Self {
            arenas,
            next: AtomicU64::new(0),
        })
    }

    /// Round-robin acquire: lock-free on the selection step, serializing
    /// only on the chosen arena's own mutex.
    pub fn acquire(&self) -> LockedArena<'_> {
        let idx = (self.next.fetch_add(1, Ordering::SeqCst) as usize) % self.arenas.len();
        self.arenas[idx].lock()
    }

    /// Find and lock the arena owning `ptr`, or `None` if no arena does.
    pub fn lookup(&self, ptr: *mut u8) -> Option<LockedArena<'_>> {
        self.arenas.iter().find_map(|arena| arena.lookup(ptr))
    }

    pub fn arenas(&self) -> &[Arena] {
        &self.arenas
    }
}

static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Initialize the process-wide arena registry. Idempotent: a second call
/// after a successful first call is a cheap no-op returning `true`.
pub fn init() -> bool {
    if REGISTRY.get().is_some() {
        return true;
    }
    match Registry::new(ARENAS) {
        Ok(registry) => {
            // A losing racer's freshly-mapped arenas are simply dropped;
            // see DESIGN.md for why that's an acceptable address-space
            // (not physical-memory) leak.
            let _ = REGISTRY.set(registry);
            true
        }
        Err(err) => {
            log::error!("arena registry init failed: {err}");
            false
        }
    }
}

/// The process-wide registry, or `None` if [`init`] hasn't succeeded yet.
pub fn registry() -> Option<&'static Registry> {
    REGISTRY.get()
}
