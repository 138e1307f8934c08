#![feature(test)]
extern crate test;
use test::Bencher;

/// Run a benchmark that repeatedly allocates and deallocates a fixed-size
/// block, first pre-allocating `pre_allocations` unrelated blocks to fill
/// up the heap and expose the cost of free-list search under load. One
/// macro instantiated per variant below.
macro_rules! bench_variant {
    ($module:path) => {
        fn benchmark_with_preallocation(b: &mut Bencher, pre_allocations: usize) {
            use $module as variant;
            assert!(variant::init());
            let mut pre = Vec::with_capacity(pre_allocations);
            for _ in 0..pre_allocations {
                if let Some(ptr) = variant::alloc(64) {
                    pre.push(ptr);
                }
            }

            // make sure there is room for the benchmarked allocation itself
            let warmup = variant::alloc(64).expect("warmup allocation should succeed");
            variant::free(warmup);

            b.iter(|| {
                let ptr = variant::alloc(64).expect("allocation should succeed");
                let ptr = test::black_box(ptr);
                variant::free(ptr);
            });

            for ptr in pre {
                variant::free(ptr);
            }
        }

        #[bench]
        fn no_memory_usage(b: &mut Bencher) {
            benchmark_with_preallocation(b, 0);
        }

        #[bench]
        fn low_memory_usage(b: &mut Bencher) {
            benchmark_with_preallocation(b, 8);
        }

        #[bench]
        fn medium_memory_usage(b: &mut Bencher) {
            benchmark_with_preallocation(b, 510);
        }

        #[bench]
        fn high_memory_usage(b: &mut Bencher) {
            benchmark_with_preallocation(b, 1020);
        }
    };
}

mod naive_variant {
    use super::*;
    bench_variant!(arenalloc::facade::naive);
}

mod arena_variant {
    use super::*;
    bench_variant!(arenalloc::facade::arena);
}

mod arena_cache_variant {
    use super::*;
    bench_variant!(arenalloc::facade::cached);
}

/// Multi-threaded throughput: `THREADS` threads each hammering alloc/free
/// concurrently against the arena-cache variant, to surface the payoff of
/// the thread cache and the cost of any remaining cross-thread mutex
/// contention.
mod concurrent_throughput {
    use super::*;
    use arenalloc::facade::cached as variant;
    use std::thread;

    const THREADS: usize = 8;

    #[bench]
    fn concurrent_alloc_free(b: &mut Bencher) {
        assert!(variant::init());
        b.iter(|| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    thread::spawn(|| {
                        for _ in 0..256 {
                            let ptr = variant::alloc(64).expect("allocation should succeed");
                            variant::free(ptr);
                        }
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }
        });
    }
}
