use criterion::{black_box, criterion_group, criterion_main, Criterion};
use newsflow::client::aggregator::dedupe_by_url;
use newsflow::{Article, InMemoryCache};
use std::time::Duration;

fn sample_articles(count: usize) -> Vec<Article> {
    (0..count)
        .map(|i| Article::new("bench", format!("https://bench.test/{}", i % (count / 2).max(1)), format!("Story {i}")))
        .collect()
}

fn benchmark_cache(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();
    let cache = InMemoryCache::with_config(Duration::from_secs(600), 500);

    c.bench_function("cache_set_with_eviction", |b| {
        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            runtime
                .block_on(cache.set(&format!("key-{i}"), i, None, None))
                .unwrap();
        });
    });

    c.bench_function("cache_get_hit", |b| {
        runtime.block_on(cache.set("hot", 42u64, None, None)).unwrap();
        b.iter(|| {
            let value: Option<u64> = runtime.block_on(cache.get(black_box("hot"))).unwrap();
            black_box(value)
        });
    });
}

fn benchmark_dedupe(c: &mut Criterion) {
    let articles = sample_articles(200);
    c.bench_function("dedupe_by_url_200", |b| {
        b.iter(|| black_box(dedupe_by_url(articles.clone())));
    });
}

criterion_group!(benches, benchmark_cache, benchmark_dedupe);
criterion_main!(benches);
