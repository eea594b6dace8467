use catalog_sitemap::models::{PageCandidate, PageType, SignalBundle};
use catalog_sitemap::scoring;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn bundle(i: u32) -> SignalBundle {
    SignalBundle {
        business_value: (i % 101) as f64,
        demand: ((i * 7) % 101) as f64,
        graph_strength: ((i * 13) % 101) as f64,
        cluster_depth: i % 12,
        content_strength: ((i * 3) % 101) as f64,
        duplication_risk: (i % 17) as f64,
        orphan_risk: (i % 5) as f64,
        confusion_risk: (i % 9) as f64,
        ..Default::default()
    }
}

fn bench_score(c: &mut Criterion) {
    let mut group = c.benchmark_group("score");

    let unblocked = bundle(42);
    group.bench_function("unblocked", |b| b.iter(|| scoring::score(black_box(&unblocked))));

    let blocked = SignalBundle {
        status_code: 404,
        ..bundle(42)
    };
    group.bench_function("blocked", |b| b.iter(|| scoring::score(black_box(&blocked))));

    group.finish();
}

fn bench_score_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_candidates");

    for size in [1_000usize, 50_000] {
        let rows: Vec<PageCandidate> = (0..size as u32)
            .map(|i| PageCandidate::new(format!("/pieces/p{}.html", i), PageType::Piece).with_signals(bundle(i)))
            .collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &rows, |b, rows| {
            b.iter(|| {
                rows.iter()
                    .filter(|row| !scoring::score_candidate(row).is_blocked)
                    .count()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score, bench_score_candidates);
criterion_main!(benches);
