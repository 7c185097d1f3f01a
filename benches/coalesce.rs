use std::sync::{Arc, Barrier};
use std::thread;

use criterion::{Criterion, criterion_group, criterion_main};
use ringcache::coalesce::CallCoalescer;

fn bench_uncontended_call(c: &mut Criterion) {
    let coalescer: CallCoalescer<u64, u64, ()> = CallCoalescer::new();
    c.bench_function("coalesce_uncontended", |b| {
        let mut k = 0u64;
        b.iter(|| {
            k = k.wrapping_add(1);
            std::hint::black_box(coalescer.call(k, || Ok(k)))
        })
    });
}

fn bench_contended_hot_key(c: &mut Criterion) {
    const THREADS: usize = 4;
    c.bench_function("coalesce_hot_key_4_threads", |b| {
        b.iter(|| {
            let coalescer: Arc<CallCoalescer<&'static str, u64, ()>> =
                Arc::new(CallCoalescer::new());
            let barrier = Arc::new(Barrier::new(THREADS));
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    let coalescer = Arc::clone(&coalescer);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        for _ in 0..256 {
                            let _ = coalescer.call("hot", || Ok(std::hint::black_box(1)));
                        }
                    })
                })
                .collect();
            for h in handles {
                let _ = h.join();
            }
        })
    });
}

criterion_group!(benches, bench_uncontended_call, bench_contended_hot_key);
criterion_main!(benches);
