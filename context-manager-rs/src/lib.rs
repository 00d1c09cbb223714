//! Context retrieval for failure diagnosis.
//!
//! Looks up code and documentation snippets related to a failure log in
//! per-commit vector indexes, and can populate those indexes from local
//! source trees beforehand. Neither operation ever fails the caller.

pub mod ingestion;

use std::path::Path;
use std::sync::Arc;

use integration_sdk::VectorSearchClient;
use shared_types::{FailureLogRecord, RetrievedContext};
use tracing::{debug, info, warn};

pub use ingestion::{collect_documents, ingest_sources, IngestionSummary, SourceKind};

pub const DEFAULT_TOP_K: usize = 5;

pub fn code_index(commit_hash: &str) -> String {
    format!("code_index:{}", commit_hash)
}

pub fn doc_index(commit_hash: &str) -> String {
    format!("doc_index:{}", commit_hash)
}

/// Query text for a failure log: the log itself as JSON.
pub fn query_text(log: &FailureLogRecord) -> String {
    serde_json::to_string(log).unwrap_or_else(|e| {
        warn!(error = %e, "Failure log did not serialize, querying by reason only");
        log.failure_reason().unwrap_or_default().to_string()
    })
}

/// Retrieval and ingestion bound to one vector search client.
#[derive(Clone)]
pub struct ContextManager {
    client: Arc<VectorSearchClient>,
    top_k: usize,
}

impl ContextManager {
    pub fn new(client: Arc<VectorSearchClient>, top_k: usize) -> Self {
        Self { client, top_k }
    }

    /// Manager that always yields empty context.
    pub fn disabled() -> Self {
        Self::new(Arc::new(VectorSearchClient::disabled()), DEFAULT_TOP_K)
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_enabled()
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub async fn retrieve(&self, log: &FailureLogRecord, commit_hash: &str) -> RetrievedContext {
        retrieve_context(log, commit_hash, &self.client, self.top_k).await
    }

    pub async fn ingest(&self, code_dir: Option<&Path>, docs_dir: Option<&Path>, commit_hash: &str) -> IngestionSummary {
        ingestion::ingest_sources(code_dir, docs_dir, commit_hash, &self.client).await
    }
}

/// Search the commit's code and doc indexes for snippets related to `log`.
///
/// Each list holds at most `top_k` entries and is empty when the backend is
/// absent or failing.
pub async fn retrieve_context(
    log: &FailureLogRecord,
    commit_hash: &str,
    client: &VectorSearchClient,
    top_k: usize,
) -> RetrievedContext {
    if !client.is_enabled() {
        debug!("Vector search disabled, continuing without context");
        return RetrievedContext::default();
    }

    let query = query_text(log);
    let code_index = code_index(commit_hash);
    let doc_index = doc_index(commit_hash);
    let (code, docs) = tokio::join!(
        client.search(&code_index, &query, top_k),
        client.search(&doc_index, &query, top_k),
    );

    for result in [&code, &docs] {
        if let Some(reason) = &result.reason {
            warn!(reason = %reason, "Context search degraded");
        }
    }

    let mut context = RetrievedContext {
        code: code.value,
        docs: docs.value,
    };
    context.code.truncate(top_k);
    context.docs.truncate(top_k);

    info!(
        code_snippets = context.code.len(),
        doc_snippets = context.docs.len(),
        "Retrieved failure context"
    );
    context
}
