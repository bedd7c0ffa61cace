// Criterion benchmarks for Kelibe

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kelibe::core::{build_feature_vector, cosine_similarity, Matcher};
use kelibe::models::{AnswerPayload, AnswerRecord, FeatureVector};
use kelibe::services::InMemoryStore;
use std::sync::Arc;

/// A questionnaire of `questions` answers mixing every vectorized type
fn create_answers(seed: usize, questions: usize) -> Vec<AnswerRecord> {
    (0..questions)
        .map(|i| {
            let value = ((seed + i) % 5) as i32 + 1;
            let payload = match i % 4 {
                0 => AnswerPayload::SingleChoice(Some(value)),
                1 => AnswerPayload::Scale(Some(value)),
                2 => AnswerPayload::MultipleChoice(vec![value, 6 - value]),
                _ => AnswerPayload::ShortAnswer("x".repeat(value as usize * 3)),
            };
            AnswerRecord::new(i as i64 + 1, payload)
        })
        .collect()
}

fn bench_build_feature_vector(c: &mut Criterion) {
    let answers = create_answers(1, 40);

    c.bench_function("build_feature_vector_40_answers", |b| {
        b.iter(|| build_feature_vector(black_box(&answers)))
    });
}

fn bench_cosine_similarity(c: &mut Criterion) {
    let mut group = c.benchmark_group("cosine_similarity");

    for len in [10, 100, 1000].iter() {
        let a = FeatureVector::new((0..*len).map(|i| (i % 7) as f64).collect());
        let b = FeatureVector::new((0..*len).map(|i| (i % 5) as f64 + 1.0).collect());

        group.bench_with_input(BenchmarkId::from_parameter(len), len, |bench, _| {
            bench.iter(|| cosine_similarity(black_box(&a), black_box(&b)))
        });
    }

    group.finish();
}

fn bench_compute_matches(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute_matches");
    group.sample_size(20);

    for size in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter_batched(
                || {
                    // Fresh store per iteration: a run creates matches that
                    // would exclude those candidates from the next one
                    let store = Arc::new(InMemoryStore::new());
                    for id in 0..=size as i64 {
                        store.add_user(id, true).unwrap();
                        store.set_answers(id, create_answers(id as usize, 20)).unwrap();
                    }
                    Matcher::new(store.clone(), store.clone(), store)
                },
                |matcher| tokio_test::block_on(matcher.compute_matches(black_box(0))).unwrap(),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_build_feature_vector,
    bench_cosine_similarity,
    bench_compute_matches
);
criterion_main!(benches);
