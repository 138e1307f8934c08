//! Multi-threaded integration tests covering cross-thread free and arena
//! exhaustion under concurrent load.

use std::sync::mpsc;
use std::thread;

/// A block allocated on one thread, freed on another, must not corrupt
/// the heap — the freeing thread looks the block's arena up by address
/// rather than assuming affinity with whichever arena it would itself
/// have been dispatched to.
#[test]
fn cross_thread_free() {
    assert!(arenalloc::init());
    let (tx, rx) = mpsc::channel();

    let producer = thread::spawn(move || {
        let ptr = arenalloc::alloc(256).expect("allocation should succeed");
        tx.send(ptr as usize).unwrap();
    });

    let consumer = thread::spawn(move || {
        let addr = rx.recv().unwrap();
        let ptr = std::ptr::NonNull::new(addr as *mut u8).unwrap();
        arenalloc::free(ptr);
    });

    producer.join().unwrap();
    consumer.join().unwrap();
}

/// Forcing one arena toward exhaustion must not prevent other arenas
/// (and hence other threads) from satisfying requests, and the exhausted
/// arena must still accept frees afterwards.
#[test]
fn arena_exhaustion_does_not_starve_other_arenas() {
    // Surfaces the `log::warn!` exhaustion diagnostic under
    // `cargo test -- --nocapture` with `RUST_LOG` set.
    let _ = env_logger::try_init();
    assert!(arenalloc::init());

    // Sanity-check the registry itself: every configured arena exists, maps
    // its own `ARENA_MAX`-byte region, and is independent of the others.
    let registry = arenalloc::engine::arena::registry().expect("registry should be initialized");
    assert_eq!(registry.arenas().len(), arenalloc::config::ARENAS);
    let mut bases = std::collections::HashSet::new();
    for arena in registry.arenas() {
        assert_eq!(arena.capacity(), arenalloc::config::ARENA_MAX);
        bases.insert(arena.base() as usize);
    }
    assert_eq!(
        bases.len(),
        arenalloc::config::ARENAS,
        "every arena should have a distinct mapping"
    );

    // Large chunks (well above CHUNK) to exhaust one arena's 128 MiB
    // quickly without also exhausting every other arena via round-robin
    // spillover: we pin all of these allocations to happen before any
    // other thread gets a dispatch slot by doing them up front, back to
    // back, on this thread alone.
    let chunk = 8 * 1024 * 1024; // 8 MiB
    let mut pointers = Vec::new();
    loop {
        match arenalloc::alloc(chunk) {
            Some(ptr) => pointers.push(ptr),
            None => break,
        }
        if pointers.len() > arenalloc::config::ARENAS * 20 {
            // Safety valve: round-robin dispatch means this loop drains
            // every arena, not just one, before returning `None`; bound
            // the iteration count so a regression here fails fast instead
            // of spinning.
            break;
        }
    }

    // Whatever happened above, a normal-sized request must still succeed
    // somewhere (every arena cannot plausibly be full from one thread's
    // 8 MiB chunks alone once round-robin has spread them out, and this
    // crate does not route oversized requests to a single arena only).
    let small = arenalloc::alloc(128);
    assert!(small.is_some(), "other arenas should still serve requests");
    if let Some(ptr) = small {
        arenalloc::free(ptr);
    }

    for ptr in pointers {
        arenalloc::free(ptr);
    }
}

/// Many threads concurrently alloc/free without ever observing overlapping
/// live pointers; exercised end to end with real OS threads rather than
/// as a `quickcheck` property, since thread scheduling is what matters
/// here.
#[test]
fn concurrent_alloc_free_no_overlap() {
    assert!(arenalloc::init());
    const THREADS: usize = 8;
    const OPS_PER_THREAD: usize = 2_000;

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            thread::spawn(move || {
                let mut live = Vec::new();
                for i in 0..OPS_PER_THREAD {
                    let size = 16 + (t * 37 + i * 13) % 2048;
                    let ptr = arenalloc::alloc(size).expect("allocation should succeed");
                    live.push(ptr);
                    if live.len() > 32 {
                        let victim = live.remove((t + i) % live.len());
                        arenalloc::free(victim);
                    }
                }
                for ptr in live {
                    arenalloc::free(ptr);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
