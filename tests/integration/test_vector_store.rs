//! End-to-end pipeline: records -> graph -> embeddings -> local vector store.

use codesight::vector::{FieldKey, Filter};
use codesight::{
    CodeEmbedding, CodeRecord, EmbeddingType, GraphBuilder, RiskLevel, SearchQuery, Settings,
    VectorStore,
};
use tempfile::TempDir;

use crate::common::{function, lookup_embedder, order_flow, settings_in};

/// Embed the order flow with graph context and store it. Returns the embeddings per record.
async fn index_order_flow(settings: &Settings) -> Vec<Vec<CodeEmbedding>> {
    let records = order_flow();
    let graph = GraphBuilder::new(settings.graph.clone())
        .build(&records)
        .unwrap();
    let embedder = lookup_embedder(settings, 21);
    let batches = embedder
        .embed_batch(&records, Some(&graph))
        .unwrap();

    let store = VectorStore::from_settings(settings).unwrap();
    assert!(store.initialize().await.unwrap());
    let all: Vec<CodeEmbedding> = batches.iter().flatten().cloned().collect();
    assert_eq!(store.store(&all).await.unwrap(), all.len());
    batches
}

#[tokio::test]
async fn stored_embeddings_survive_reopen_from_settings_file() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(".codesight").join("settings.toml");
    settings_in(temp_dir.path()).save(&config_path).unwrap();
    let settings = Settings::load_from(&config_path).unwrap();
    assert_eq!(settings.collection_name(), "codesight_it");

    let batches = index_order_flow(&settings).await;

    // A fresh store over the same snapshot directory.
    let reopened = VectorStore::from_settings(&settings).unwrap();
    assert!(!reopened.initialize().await.unwrap());
    for expected in &batches {
        let mut expected = expected.clone();
        expected.sort_by(|a, b| a.id.cmp(&b.id));
        let stored = reopened
            .get_by_file(expected[0].file_id.as_str())
            .await
            .unwrap();
        assert_eq!(stored, expected);
    }
}

#[tokio::test]
async fn reindexing_a_file_replaces_its_embeddings() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_in(temp_dir.path());
    let batches = index_order_flow(&settings).await;
    let store = VectorStore::from_settings(&settings).unwrap();

    let service = &batches[1];
    let file_id = service[0].file_id.as_str();
    store.delete_by_file(file_id).await.unwrap();
    assert!(store.get_by_file(file_id).await.unwrap().is_empty());

    let leftovers = store
        .search(SearchQuery::new().filter(Filter::by_file(file_id)).limit(100))
        .await
        .unwrap();
    assert!(leftovers.is_empty());

    // Other files are untouched.
    let gateway_id = batches[2][0].file_id.as_str();
    assert_eq!(store.get_by_file(gateway_id).await.unwrap().len(), batches[2].len());

    // Storing again restores exactly the same set.
    assert_eq!(store.store(service).await.unwrap(), service.len());
    assert_eq!(store.get_by_file(file_id).await.unwrap().len(), service.len());
}

#[tokio::test]
async fn changed_content_drops_the_previous_version() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_in(temp_dir.path());
    let batches = index_order_flow(&settings).await;
    let store = VectorStore::from_settings(&settings).unwrap();
    let old_id = batches[1][0].file_id.clone();

    let edited = CodeRecord::new(
        "apps/api/orders.service.ts",
        "typescript",
        "export class OrdersService {\n\
           async reconcile(order) {\n\
             return this.repo.save(order);\n\
           }\n\
         }\n",
    )
    .with_imports(["./orders.repository"])
    .with_function(function("reconcile", 2, 4, 12, RiskLevel::Medium));
    assert_ne!(edited.id, old_id);

    let embedder = lookup_embedder(&settings, 21);
    let fresh = embedder.embed(&edited).unwrap();
    store.delete_by_path(&edited.path).await.unwrap();
    store.store(&fresh).await.unwrap();

    assert!(store.get_by_file(old_id.as_str()).await.unwrap().is_empty());
    assert_eq!(store.get_by_file(edited.id.as_str()).await.unwrap().len(), fresh.len());

    let functions = store
        .search(
            SearchQuery::new()
                .filter(Filter::new().exists(FieldKey::FunctionName))
                .limit(100),
        )
        .await
        .unwrap();
    let names: Vec<_> = functions
        .iter()
        .filter_map(|r| r.embedding.metadata.function_name.as_deref())
        .collect();
    assert!(names.contains(&"reconcile"));
    assert!(!names.contains(&"settle"));

    let on_path = store
        .search(
            SearchQuery::new()
                .filter(Filter::by_path("apps/api/orders.service.ts"))
                .limit(100),
        )
        .await
        .unwrap();
    assert_eq!(on_path.len(), fresh.len());
}

#[tokio::test]
async fn security_queries_find_the_seeded_findings() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_in(temp_dir.path());
    let batches = index_order_flow(&settings).await;
    let store = VectorStore::from_settings(&settings).unwrap();

    let secret = batches[2]
        .iter()
        .find(|e| e.embedding_type == EmbeddingType::SecurityPattern)
        .unwrap();

    let hits = store
        .find_security_patterns(secret.vector.clone(), 10)
        .await
        .unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, secret.id);
    assert!((hits[0].score - 1.0).abs() < 1e-4);
    assert!(hits[0].score >= hits[1].score);
    for hit in &hits {
        assert_eq!(hit.embedding.embedding_type, EmbeddingType::SecurityPattern);
        assert!(hit.embedding.metadata.security_relevance >= 5);
    }

    let complex = store.find_complex_functions(10, 10).await.unwrap();
    assert_eq!(complex.len(), 1);
    assert_eq!(complex[0].embedding.metadata.function_name.as_deref(), Some("settle"));
    assert_eq!(complex[0].score, 0.0);

    // Every file under apps/api is a boundary.
    let boundary_hits = store
        .search(
            SearchQuery::new()
                .filter(Filter::new().exact(FieldKey::TrustBoundary, true))
                .limit(1000),
        )
        .await
        .unwrap();
    let total: usize = batches.iter().map(Vec::len).sum();
    assert_eq!(boundary_hits.len(), total);
}

#[tokio::test]
async fn threshold_filters_similarity_hits() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_in(temp_dir.path());
    let batches = index_order_flow(&settings).await;
    let store = VectorStore::from_settings(&settings).unwrap();

    let query_vector = batches[0][0].vector.clone();
    let everything = store
        .search(SearchQuery::new().vector(query_vector.clone()).limit(1000))
        .await
        .unwrap();
    assert!(everything.windows(2).all(|w| w[0].score >= w[1].score));

    let strict = store
        .search(SearchQuery::new().vector(query_vector).limit(1000).threshold(0.999))
        .await
        .unwrap();
    assert!(!strict.is_empty());
    assert!(strict.len() <= everything.len());
    assert!(strict.iter().all(|r| r.score >= 0.999));
    assert!(strict.iter().any(|r| r.id == batches[0][0].id));
}

#[tokio::test]
async fn clustering_needs_at_least_k_embeddings() {
    let temp_dir = TempDir::new().unwrap();
    let settings = settings_in(temp_dir.path());
    index_order_flow(&settings).await;
    let store = VectorStore::from_settings(&settings).unwrap();

    let clusters = store
        .cluster_by_type(EmbeddingType::SecurityPattern, 2)
        .await
        .unwrap();
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters.iter().map(|c| c.size).sum::<usize>(), 2);
    assert!(clusters[0].risk_score >= clusters[1].risk_score);

    let too_many = store
        .cluster_by_type(EmbeddingType::SecurityPattern, 3)
        .await
        .unwrap();
    assert!(too_many.is_empty());
}
