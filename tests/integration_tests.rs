// Gateway file to expose integration tests from the integration/ subdirectory
// Each test file in integration/ needs to be included here

mod common;

#[path = "integration/test_graph_properties.rs"]
mod test_graph_properties;

#[path = "integration/test_embedding_pipeline.rs"]
mod test_embedding_pipeline;

#[path = "integration/test_vector_store.rs"]
mod test_vector_store;
