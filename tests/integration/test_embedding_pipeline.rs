//! Embedding pipeline against a real memory-mapped lookup-table artifact.

use std::collections::HashSet;

use codesight::embedding::{EmbeddingError, LookupTableModel, write_artifact};
use codesight::{CodeRecord, EmbeddingType, GraphBuilder, Vocabulary};
use tempfile::TempDir;

use crate::common::{TEST_DIMENSION, lookup_embedder, norm, order_flow, settings_in};

#[test]
fn vectors_are_bit_identical_across_loads() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_in(temp_dir.path());
    let first = lookup_embedder(&settings, 7);
    let second = lookup_embedder(&settings, 7);

    for record in order_flow() {
        let a = first.embed(&record).unwrap();
        let b = second.embed(&record).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.id, y.id);
            let xb: Vec<u32> = x.vector.iter().map(|v| v.to_bits()).collect();
            let yb: Vec<u32> = y.vector.iter().map(|v| v.to_bits()).collect();
            assert_eq!(xb, yb, "vector for {} differs", x.id);
        }
    }
}

#[test]
fn artifact_bytes_depend_only_on_seed() {
    let temp_dir = TempDir::new().unwrap();
    let rows = Vocabulary::builtin().len();
    let a = temp_dir.path().join("a.cemb");
    let b = temp_dir.path().join("b.cemb");
    let c = temp_dir.path().join("c.cemb");
    write_artifact(&a, rows, TEST_DIMENSION, 1).unwrap();
    write_artifact(&b, rows, TEST_DIMENSION, 1).unwrap();
    write_artifact(&c, rows, TEST_DIMENSION, 2).unwrap();

    let read = |p: &std::path::Path| std::fs::read(p).unwrap();
    assert_eq!(read(&a), read(&b));
    assert_ne!(read(&a), read(&c));
}

#[test]
fn artifact_must_match_configuration() {
    let temp_dir = TempDir::new().unwrap();
    let rows = Vocabulary::builtin().len();
    let path = temp_dir.path().join("model.cemb");
    write_artifact(&path, rows, TEST_DIMENSION, 3).unwrap();

    assert!(matches!(
        LookupTableModel::open(&path, TEST_DIMENSION * 2, rows),
        Err(EmbeddingError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        LookupTableModel::open(&path, TEST_DIMENSION, rows + 1),
        Err(EmbeddingError::InvalidArtifact { .. })
    ));

    std::fs::write(&path, b"not a model").unwrap();
    assert!(matches!(
        LookupTableModel::open(&path, TEST_DIMENSION, rows),
        Err(EmbeddingError::InvalidArtifact { .. })
    ));
}

#[test]
fn every_record_yields_unit_vectors_and_unique_ids() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_in(temp_dir.path());
    let embedder = lookup_embedder(&settings, 11);

    let mut records = order_flow();
    records.push(CodeRecord::new("apps/api/empty.ts", "typescript", ""));

    let batches = embedder.embed_batch(&records, None).unwrap();
    assert_eq!(batches.len(), records.len());

    let mut ids = HashSet::new();
    for (record, embeddings) in records.iter().zip(&batches) {
        assert_eq!(embeddings[0].embedding_type, EmbeddingType::SemanticCode);
        for embedding in embeddings {
            assert_eq!(embedding.file_id, record.id);
            assert_eq!(embedding.vector.len(), TEST_DIMENSION);
            assert!((norm(&embedding.vector) - 1.0).abs() < 1e-4);
            assert!((0..=10).contains(&embedding.metadata.security_relevance));
            assert!(ids.insert(embedding.id.clone()), "duplicate id {}", embedding.id);
        }
    }

    // The empty record still gets exactly one embedding.
    assert_eq!(batches.last().unwrap().len(), 1);
}

#[test]
fn graph_context_raises_relevance() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_in(temp_dir.path());
    let embedder = lookup_embedder(&settings, 5);
    let records = order_flow();
    let graph = GraphBuilder::new(settings.graph.clone())
        .build(&records)
        .unwrap();

    let plain = embedder.embed_batch(&records, None).unwrap();
    let informed = embedder.embed_batch(&records, Some(&graph)).unwrap();

    for ((record, without), with) in records.iter().zip(&plain).zip(&informed) {
        let node = graph.node(record.id.as_str()).unwrap();
        let floor = codesight::risk::to_score(node.security_risk);
        assert_eq!(without.len(), with.len());
        for (a, b) in without.iter().zip(with) {
            assert_eq!(a.vector, b.vector);
            assert!(b.metadata.security_relevance >= a.metadata.security_relevance);
            assert!(b.metadata.security_relevance >= floor);
            assert_eq!(b.metadata.trust_boundary, a.metadata.trust_boundary || node.trust_boundary);
        }
    }
}

#[test]
fn conditional_embeddings_follow_record_facts() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_in(temp_dir.path());
    let embedder = lookup_embedder(&settings, 9);
    let records = order_flow();

    let service = embedder.embed(&records[1]).unwrap();
    let settle = service
        .iter()
        .find(|e| e.metadata.function_name.as_deref() == Some("settle"))
        .expect("complex function is embedded");
    assert_eq!(settle.metadata.complexity, 14);
    assert!(service.iter().any(|e| e.embedding_type == EmbeddingType::BusinessLogic));
    assert!(!service.iter().any(|e| e.embedding_type == EmbeddingType::SecurityPattern));

    let gateway = embedder.embed(&records[2]).unwrap();
    let secret = gateway
        .iter()
        .find(|e| e.embedding_type == EmbeddingType::SecurityPattern)
        .expect("pattern group is embedded");
    assert!(secret.id.ends_with(":hardcoded_secret"));
    assert!(secret.metadata.security_relevance >= 9);
}
