//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use codesight::config::{EmbeddingBackend, VectorBackendKind};
use codesight::embedding::{LookupTableModel, write_artifact};
use codesight::{
    CodeRecord, FunctionFact, RiskLevel, SecurityPatternFact, SemanticEmbedder, Settings,
    Vocabulary,
};

/// Small dimension keeps artifacts tiny.
pub const TEST_DIMENSION: usize = 16;

pub fn record(path: &str, imports: &[&str]) -> CodeRecord {
    // Content includes the path so ids stay distinct.
    CodeRecord::new(path, "typescript", format!("// {path}\n"))
        .with_imports(imports.iter().copied())
}

pub fn function(name: &str, start: u32, end: u32, complexity: u32, risk: RiskLevel) -> FunctionFact {
    FunctionFact {
        name: name.to_string(),
        start_line: start,
        end_line: end,
        complexity,
        risk_level: risk,
        trust_boundary: false,
    }
}

pub fn pattern(pattern_type: &str, severity: RiskLevel, description: &str) -> SecurityPatternFact {
    SecurityPatternFact {
        pattern_type: pattern_type.to_string(),
        severity,
        description: description.to_string(),
        line: Some(1),
    }
}

/// A four-file order flow: controller -> service -> {gateway, repository}.
pub fn order_flow() -> Vec<CodeRecord> {
    let mut controller = CodeRecord::new(
        "apps/api/orders.controller.ts",
        "typescript",
        "import { OrdersService } from './orders.service';\n\
         export class OrdersController {\n\
           async create(req, res) {\n\
             const order = await this.service.create(req.body);\n\
             res.json(order);\n\
           }\n\
         }\n",
    )
    .with_imports(["./orders.service", "express"])
    .with_exports(["OrdersController"]);
    let mut create = function("create", 3, 6, 4, RiskLevel::Medium);
    create.trust_boundary = true;
    controller = controller.with_function(create);

    let service = CodeRecord::new(
        "apps/api/orders.service.ts",
        "typescript",
        "export class OrdersService {\n\
           async settle(order) {\n\
             const invoice = this.pricing.price(order);\n\
             if (invoice.total > 0) { await this.payment.charge(invoice); }\n\
             return this.repo.save(order);\n\
           }\n\
         }\n",
    )
    .with_imports(["./payment.gateway", "./orders.repository"])
    .with_exports(["OrdersService"])
    .with_function(function("settle", 2, 6, 14, RiskLevel::High));

    let gateway = CodeRecord::new(
        "apps/api/payment.gateway.ts",
        "typescript",
        "const STRIPE_KEY = 'sk_live_123';\nexport function charge(invoice) { return stripe.charge(invoice, STRIPE_KEY); }\n",
    )
    .with_imports(["stripe"])
    .with_exports(["charge"])
    .with_pattern(pattern(
        "hardcoded_secret",
        RiskLevel::Critical,
        "api key literal assigned to STRIPE_KEY",
    ));

    let repository = CodeRecord::new(
        "apps/api/orders.repository.ts",
        "typescript",
        "export function save(order) { return db.query(`INSERT INTO orders VALUES (${order.id})`); }\n",
    )
    .with_imports(["pg"])
    .with_exports(["save"])
    .with_pattern(pattern(
        "sql_injection",
        RiskLevel::High,
        "template literal interpolated into sql query",
    ));

    vec![controller, service, gateway, repository]
}

/// Settings rooted in `dir`: lookup model, local vector backend.
pub fn settings_in(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.project = "it".to_string();
    settings.embedding.backend = EmbeddingBackend::Lookup;
    settings.embedding.dimension = TEST_DIMENSION;
    settings.embedding.model_path = dir.join("models").join("embedding.cemb");
    settings.embedding.concurrency = 2;
    settings.vector_store.backend = VectorBackendKind::Local;
    settings.vector_store.data_dir = dir.join("vectors");
    settings.vector_store.batch_size = 3;
    settings
}

/// Write a seeded artifact for `settings` and open an embedder over it.
pub fn lookup_embedder(settings: &Settings, seed: u64) -> SemanticEmbedder {
    let vocabulary = Arc::new(Vocabulary::builtin());
    let path = &settings.embedding.model_path;
    if !path.exists() {
        write_artifact(path, vocabulary.len(), settings.embedding.dimension, seed)
            .expect("write artifact");
    }
    let model = LookupTableModel::open(path, settings.embedding.dimension, vocabulary.len())
        .expect("open artifact");
    SemanticEmbedder::new(Arc::new(model), vocabulary, &settings.embedding)
        .expect("create embedder")
}

pub fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}
