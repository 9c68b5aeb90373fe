use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use textbook_rag::index::{EmbeddingRecord, FlatIndex, VectorIndex};

const DIMENSION: usize = 768;
const RECORDS: usize = 2_000;

fn pseudo_vector(seed: usize) -> Vec<f32> {
    (0..DIMENSION)
        .map(|i| (((seed * 31 + i * 17) % 97) as f32 / 97.0) - 0.5)
        .collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let records = (0..RECORDS)
        .map(|i| {
            EmbeddingRecord::new(&format!("chunk_{}", i), "text", pseudo_vector(i))
                .expect("valid record")
        })
        .collect();
    let index = FlatIndex::build(records).expect("index builds");
    let query = pseudo_vector(RECORDS + 1);

    c.bench_function("flat_index_query", |b| {
        b.iter(|| index.query(black_box(&query), black_box(5)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
