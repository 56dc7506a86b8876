use content_optimizer::adaptive::{ErrorHandler, InMemoryLogSink, InMemoryRuleStore};
use content_optimizer::optimizer::{ContentOptimizer, OptimizerConfig};
use content_optimizer::readability::{ReadabilityCorrector, ReadabilityOptions};
use content_optimizer::seo::IssueDetector;
use content_optimizer::ContentRecord;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

const BODY: &str = "## Planning Your Week

Good planning was considered essential by every manager we interviewed for this piece about time management and the small habits that make it work over many months. A weekly review helps you see what matters. The calendar was filled with meetings that nobody really needed and that were scheduled without any clear agenda or goal.

## Daily Routines

Start with the hardest task. Short breaks keep your energy steady through the afternoon and help you return to difficult work with a clearer head than before.";

fn optimizer() -> ContentOptimizer {
    let handler = Arc::new(ErrorHandler::new(
        Arc::new(InMemoryLogSink::new()),
        Arc::new(InMemoryRuleStore::new()),
    ));
    ContentOptimizer::new(OptimizerConfig::default().with_max_iterations(5), handler).unwrap()
}

fn benchmark_detection(c: &mut Criterion) {
    let detector = IssueDetector::default();
    let record = ContentRecord::new("Weekly Planning", BODY);

    c.bench_function("issue_detection", |b| {
        b.iter(|| detector.detect(black_box(&record), "time management", &[]))
    });
}

fn benchmark_readability_correction(c: &mut Criterion) {
    let corrector = ReadabilityCorrector::new(ReadabilityOptions::default());

    c.bench_function("readability_correction", |b| {
        b.iter(|| corrector.correct_readability(black_box(BODY), 3))
    });
}

// タイトルのレジストリが増え続けないよう、反復ごとに新しいオプティマイザーを使う
fn benchmark_optimization_loop(c: &mut Criterion) {
    let record = ContentRecord::new("Weekly Planning", BODY);

    c.bench_function("optimization_loop", |b| {
        b.iter(|| optimizer().optimize(black_box(&record), "time management", &[]))
    });

    c.bench_function("optimization_loop_empty_record", |b| {
        b.iter(|| optimizer().optimize(black_box(&ContentRecord::default()), "time management", &[]))
    });
}

criterion_group!(
    benches,
    benchmark_detection,
    benchmark_readability_correction,
    benchmark_optimization_loop
);
criterion_main!(benches);
