//! Compile-time configuration constants.
//!
//! These mirror a C allocator's `#define`s: there is no runtime
//! configuration object, only `pub const` items picked up at build time.
//! Rebuild with different values (e.g. a smaller [`ARENA_MAX`] for tests)
//! rather than trying to tune the allocator at runtime.

/// Size of a single metadata word (header or footer).
pub const WORD: usize = 8;

/// Alignment guaranteed to every payload pointer returned by `alloc`.
pub const ALIGN: usize = 16;

/// Smallest possible block: header (8) + two free-list links (16) + footer (8).
pub const MIN_BLOCK: usize = 32;

/// Size of a single arena's virtual memory mapping.
pub const ARENA_MAX: usize = 128 * 1024 * 1024;

/// Default heap-extension granularity.
pub const CHUNK: usize = 4 * 1024;

/// Number of arenas in the registry.
///
/// Recommended to be roughly 2x the number of logical CPUs; fixed here as a
/// compile-time constant rather than read from
/// `std::thread::available_parallelism` at startup.
pub const ARENAS: usize = 10;

/// Number of segregated free lists per arena.
pub const MAXLISTS: usize = 15;

/// Maximum number of blocks visited by a single free-list search.
pub const MAX_SCAN: usize = 15;

/// Number of size-class lists probed by `find_fit` before extending the heap.
pub const LIST_PROBE_DEPTH: usize = 2;

/// Maximum number of blocks held in a single thread's cache.
pub const CACHE_MAX_ENTRIES: usize = 8;

/// Maximum total payload bytes held in a single thread's cache.
pub const CACHE_MAX_SIZE: usize = 1024 * 1024;

/// Probability of evicting a cached block when the cache is full and a new
/// block arrives, rather than bypassing the cache entirely.
pub const CACHE_EVICT_PROBABILITY: f64 = 0.1;
