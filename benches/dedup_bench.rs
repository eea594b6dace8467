use catalog_sitemap::dedup::DedupCache;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::thread;

fn bench_claim_single_threaded(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim_single_threaded");
    group.throughput(Throughput::Elements(10_000));

    group.bench_function("fresh", |b| {
        b.iter(|| {
            let cache = DedupCache::new();
            for i in 0..10_000 {
                black_box(cache.claim(&format!("/pieces/p{}.html", i)));
            }
        });
    });

    group.bench_function("already_claimed", |b| {
        let cache = DedupCache::new();
        for i in 0..10_000 {
            cache.claim(&format!("/pieces/p{}.html", i));
        }
        b.iter(|| {
            for i in 0..10_000 {
                black_box(cache.claim(&format!("/pieces/p{}.html", i)));
            }
        });
    });

    group.finish();
}

// Several generators claiming overlapping URL sets
fn bench_claim_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("claim_contended");

    for num_threads in [2, 4, 8] {
        group.throughput(Throughput::Elements(num_threads as u64 * 5_000));
        group.bench_with_input(BenchmarkId::from_parameter(num_threads), &num_threads, |b, &num_threads| {
            b.iter(|| {
                let cache = Arc::new(DedupCache::new());
                let handles: Vec<_> = (0..num_threads)
                    .map(|_| {
                        let cache = Arc::clone(&cache);
                        thread::spawn(move || {
                            (0..5_000)
                                .filter(|i| cache.claim(&format!("/pieces/p{}.html", i)))
                                .count()
                        })
                    })
                    .collect();
                let won: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
                assert_eq!(won, 5_000);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_claim_single_threaded, bench_claim_contended);
criterion_main!(benches);
