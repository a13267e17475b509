//! Benchmarks for building and searching the meeting index.
//!
//! Uses 2,000 meetings by default. Set `BENCH_FULL_SCALE=1` to run with
//! 50,000, roughly the largest catalog the weekly batch is expected to see.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};

use readmate_core::types::MeetingStatus;
use readmate_vector::embedding::{EmbeddingService, MockEmbedding};
use readmate_vector::index::{IndexMetadata, VectorIndex};

const CI_MEETING_COUNT: usize = 2_000;
const FULL_SCALE_MEETING_COUNT: usize = 50_000;

fn meeting_count() -> usize {
    if std::env::var("BENCH_FULL_SCALE").is_ok() {
        FULL_SCALE_MEETING_COUNT
    } else {
        CI_MEETING_COUNT
    }
}

fn meeting_texts(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            format!(
                "Genre G{} book club. Title: Reading circle {}. About: weekly sessions \
                 discussing one chapter at a time. Leader: host {}",
                i % 12,
                i,
                i % 97
            )
        })
        .collect()
}

fn embed_catalog(count: usize) -> (Vec<Vec<f32>>, Vec<IndexMetadata>) {
    let embedder = MockEmbedding::new();
    let vectors = embedder
        .encode(&meeting_texts(count))
        .expect("embed failed");
    let metadata = (0..count)
        .map(|i| IndexMetadata {
            meeting_id: i as i64,
            status: Some(if i % 3 == 0 {
                MeetingStatus::Finished
            } else {
                MeetingStatus::Recruiting
            }),
        })
        .collect();
    (vectors, metadata)
}

fn bench_build(c: &mut Criterion) {
    let count = meeting_count();
    let (vectors, metadata) = embed_catalog(count);

    let mut group = c.benchmark_group("index_build");
    group.sample_size(20);
    group.bench_function(format!("build_{}meetings", count), |b| {
        b.iter(|| {
            let mut index = VectorIndex::new();
            index
                .build(vectors.clone(), metadata.clone())
                .expect("build failed");
            index
        });
    });
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let count = meeting_count();
    let (vectors, metadata) = embed_catalog(count);
    let mut index = VectorIndex::new();
    index.build(vectors, metadata).expect("build failed");

    let query = MockEmbedding::new()
        .encode(&["Reads 3 books per month. Purposes: HABIT. Preferred genres: G4.".to_string()])
        .expect("query embed failed")
        .remove(0);

    let mut group = c.benchmark_group("index_search");
    group.sample_size(100);
    group.measurement_time(Duration::from_secs(10));

    group.bench_function(format!("top20_{}meetings", count), |b| {
        b.iter(|| {
            let hits = index.search(&query, 20).expect("search failed");
            assert_eq!(hits.len(), 20);
            hits
        });
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_search);
criterion_main!(benches);
