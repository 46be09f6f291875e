use criterion::{black_box, criterion_group, criterion_main, Criterion};

use mf_core::{Candidate, CandidateId, CategoryCatalog, FilterConfig, FilterEngine, PriceRange};

const TITLES: &[&str] = &[
    "Will the election be delayed? 12% volume $1.2m liquidity $80k",
    "Bitcoin above $100k by June? 48% volume $5.4m liquidity $1.1m",
    "NBA Finals winner: Celtics 35% volume $900k liquidity $40k",
    "Fed rate cut in March? 7% volume $12m liquidity $2m",
    "Best Picture: Oppenheimer 91% volume $300k liquidity $25k",
    "Hurricane landfall in Florida? 22% volume $60k liquidity $9k",
];

fn candidates(count: usize) -> Vec<Candidate> {
    (0..count)
        .map(|i| {
            let text = TITLES[i % TITLES.len()];
            Candidate::new(i as CandidateId, Some(text.to_string()), text)
        })
        .collect()
}

fn bench_evaluate(c: &mut Criterion) {
    let catalog = CategoryCatalog::builtin();
    let engine = FilterEngine::new();
    let page = candidates(200);

    let keywords_only = FilterConfig {
        keywords: vec!["election".into(), "oscar".into()],
        ..FilterConfig::default()
    };
    let everything = FilterConfig {
        keywords: vec!["election".into()],
        categories: vec!["sports".into(), "crypto".into(), "weather".into()],
        price_range: PriceRange { min: 10.0, max: 90.0 },
        volume_threshold: 250_000.0,
        liquidity_threshold: 20_000.0,
        enabled: true,
    };

    c.bench_function("evaluate_200_keywords", |b| {
        b.iter(|| engine.evaluate(black_box(&page), &keywords_only, &catalog))
    });
    c.bench_function("evaluate_200_all_stages", |b| {
        b.iter(|| engine.evaluate(black_box(&page), &everything, &catalog))
    });
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
