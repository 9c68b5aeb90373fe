use super::*;
use tempfile::TempDir;

use crate::store::persist_records;

fn record(id: &str, embedding: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord::new(id, &format!("text of {id}"), embedding).expect("valid record")
}

fn three_record_index() -> FlatIndex {
    FlatIndex::build(vec![
        record("chunk_0", vec![1.0, 0.0]),
        record("chunk_1", vec![0.0, 1.0]),
        record("chunk_2", vec![0.9, 0.1]),
    ])
    .expect("index should build")
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    cosine_similarity(a, b).expect("equal lengths")
}

#[test]
fn cosine_of_vector_with_itself_is_one() {
    for v in [vec![1.0, 2.0, 3.0], vec![0.3, -0.7], vec![1e-3, 5e3, -2.5, 0.0]] {
        assert_eq!(cosine(&v, &v), 1.0, "vector {v:?}");
    }
}

#[test]
fn cosine_with_zero_vector_is_zero() {
    let v = [0.5, 0.5, 0.1];
    let zero = [0.0; 3];
    assert_eq!(cosine(&v, &zero), 0.0);
    assert_eq!(cosine(&zero, &v), 0.0);
    assert_eq!(cosine(&zero, &zero), 0.0);
}

#[test]
fn cosine_of_opposite_and_orthogonal_vectors() {
    assert!((cosine(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-6);
    assert_eq!(cosine(&[1.0, 0.0], &[0.0, 4.0]), 0.0);
    assert!((cosine(&[3.0, 0.0], &[10.0, 0.0]) - 1.0).abs() < 1e-6);
}

#[test]
fn cosine_of_different_lengths_is_an_error() {
    let err = cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0]).expect_err("lengths differ");

    assert_eq!(err.category(), "dimension");
    assert_eq!(
        err.to_string(),
        "Dimension mismatch in cosine similarity: expected 3, found 2"
    );
}

#[test]
fn query_ranks_known_embeddings() {
    let index = three_record_index();

    let results = index.query(&[1.0, 0.0], 2).expect("query should succeed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].chunk_id, "chunk_0");
    assert!((results[0].similarity - 1.0).abs() < 1e-6);
    assert_eq!(results[1].chunk_id, "chunk_2");
    assert!((results[1].similarity - 0.9939).abs() < 1e-3);
    assert!(results.iter().all(|r| r.chunk_id != "chunk_1"));
    assert_eq!(results[1].text, "text of chunk_2");
}

#[test]
fn query_returns_min_of_top_k_and_len() {
    let index = three_record_index();

    assert_eq!(index.query(&[0.0, 1.0], 1).expect("query").len(), 1);
    assert_eq!(index.query(&[0.0, 1.0], 3).expect("query").len(), 3);

    let all = index.query(&[0.0, 1.0], 50).expect("query");
    assert_eq!(all.len(), 3);
    let ids: Vec<&str> = all.iter().map(|r| r.chunk_id.as_str()).collect();
    assert_eq!(ids, ["chunk_1", "chunk_2", "chunk_0"]);
    assert!(all.windows(2).all(|w| w[0].similarity >= w[1].similarity));
}

#[test]
fn ties_keep_storage_order() {
    let index = FlatIndex::build(vec![
        record("chunk_0", vec![0.0, 1.0]),
        record("chunk_1", vec![2.0, 0.0]),
        record("chunk_2", vec![0.0, 3.0]),
        record("chunk_3", vec![1.0, 0.0]),
        record("chunk_4", vec![5.0, 0.0]),
    ])
    .expect("index should build");

    let results = index.query(&[1.0, 0.0], 5).expect("query should succeed");
    let ids: Vec<&str> = results.iter().map(|r| r.chunk_id.as_str()).collect();

    assert_eq!(ids, ["chunk_1", "chunk_3", "chunk_4", "chunk_0", "chunk_2"]);
}

#[test]
fn query_does_not_reorder_storage() {
    let index = three_record_index();
    let _ = index.query(&[0.0, 1.0], 3).expect("query should succeed");

    let stored: Vec<&str> = index.records().iter().map(EmbeddingRecord::chunk_id).collect();
    assert_eq!(stored, ["chunk_0", "chunk_1", "chunk_2"]);
}

#[test]
fn build_rejects_mixed_dimensions() {
    let result = FlatIndex::build(vec![
        record("chunk_0", vec![1.0, 0.0]),
        record("chunk_1", vec![1.0, 0.0, 0.0]),
    ]);

    match result {
        Err(RagError::DimensionMismatch {
            expected, found, ..
        }) => {
            assert_eq!(expected, 2);
            assert_eq!(found, 3);
        }
        other => panic!("expected dimension mismatch, got {other:?}"),
    }
}

#[test]
fn query_rejects_wrong_dimension_and_zero_top_k() {
    let index = three_record_index();

    assert!(matches!(
        index.query(&[1.0, 0.0, 0.0], 1),
        Err(RagError::DimensionMismatch {
            expected: 2,
            found: 3,
            ..
        })
    ));
    assert!(matches!(
        index.query(&[1.0, 0.0], 0),
        Err(RagError::InvalidArgument(_))
    ));
}

#[test]
fn empty_index_returns_nothing() {
    let index = FlatIndex::build(Vec::new()).expect("empty index should build");

    assert!(index.is_empty());
    assert_eq!(index.dimension(), None);
    assert!(index.query(&[1.0, 2.0], 3).expect("query").is_empty());
}

#[test]
fn record_constructor_validates() {
    assert!(EmbeddingRecord::new("", "text", vec![1.0]).is_err());
    assert!(EmbeddingRecord::new("chunk_0", "text", Vec::new()).is_err());
    assert!(EmbeddingRecord::new("chunk_0", "text", vec![1.0, f32::NAN]).is_err());
    assert!(EmbeddingRecord::new("chunk_0", "text", vec![1.0, 0.5]).is_ok());
}

#[test]
fn open_preserves_file_row_order() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("embeddings.json");
    let records = vec![
        record("chunk_2", vec![0.1, 0.2]),
        record("chunk_0", vec![0.3, 0.4]),
        record("chunk_1", vec![0.5, 0.6]),
    ];
    persist_records(&records, &path).expect("persist should succeed");

    let index = FlatIndex::open(&path).expect("open should succeed");

    assert_eq!(index.records(), records.as_slice());
    assert_eq!(index.dimension(), Some(2));
}

#[test]
fn open_reports_dimension_mismatch_in_file() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("embeddings.json");
    std::fs::write(
        &path,
        r#"[{"chunk_id":"chunk_0","text":"a","embedding":[1.0,0.0]},
            {"chunk_id":"chunk_1","text":"b","embedding":[1.0]}]"#,
    )
    .expect("should write file");

    assert!(matches!(
        FlatIndex::open(&path),
        Err(RagError::DimensionMismatch { .. })
    ));
}
