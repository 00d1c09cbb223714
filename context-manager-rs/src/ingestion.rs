//! Indexing of local code and documentation trees.

use std::fs;
use std::path::{Path, PathBuf};

use integration_sdk::{IndexDocument, VectorSearchClient};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::{code_index, doc_index};

/// Files above this size are skipped.
const MAX_FILE_BYTES: u64 = 512 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Code,
    Docs,
}

impl SourceKind {
    fn extensions(self) -> &'static [&'static str] {
        match self {
            SourceKind::Code => &["rs", "py", "js", "ts", "go", "java"],
            SourceKind::Docs => &["md", "txt"],
        }
    }

    fn matches(self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions().iter().any(|x| x.eq_ignore_ascii_case(e)))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestionSummary {
    pub enabled: bool,
    pub code_indexed: usize,
    pub docs_indexed: usize,
}

/// Every matching file under `root`, keyed by its path relative to `root`.
///
/// Unreadable entries are skipped. A missing root yields nothing.
pub fn collect_documents(root: &Path, kind: SourceKind) -> Vec<IndexDocument> {
    if !root.is_dir() {
        return Vec::new();
    }

    let mut documents: Vec<IndexDocument> = WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .filter(|e| kind.matches(e.path()))
        .filter(|e| e.metadata().map(|m| m.len() <= MAX_FILE_BYTES).unwrap_or(false))
        .filter_map(|e| {
            let bytes = fs::read(e.path()).ok()?;
            let relative = e.path().strip_prefix(root).ok()?;
            let id = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            Some(IndexDocument {
                source: id.clone(),
                id,
                text: String::from_utf8_lossy(&bytes).into_owned(),
            })
        })
        .collect();

    documents.sort_by(|a, b| a.id.cmp(&b.id));
    documents
}

async fn collect_blocking(root: Option<&Path>, kind: SourceKind) -> Vec<IndexDocument> {
    let Some(root) = root.map(PathBuf::from) else {
        return Vec::new();
    };
    match tokio::task::spawn_blocking(move || collect_documents(&root, kind)).await {
        Ok(documents) => documents,
        Err(e) => {
            warn!(error = %e, "Source walk aborted");
            Vec::new()
        }
    }
}

/// Upsert code and docs into the commit's indexes.
///
/// Skipped entirely when vector search is disabled. Failures are logged
/// and reported as zero documents indexed.
pub async fn ingest_sources(
    code_dir: Option<&Path>,
    docs_dir: Option<&Path>,
    commit_hash: &str,
    client: &VectorSearchClient,
) -> IngestionSummary {
    if !client.is_enabled() {
        debug!("Vector search disabled, skipping ingestion");
        return IngestionSummary::default();
    }

    let code = collect_blocking(code_dir, SourceKind::Code).await;
    let docs = collect_blocking(docs_dir, SourceKind::Docs).await;

    let mut summary = IngestionSummary {
        enabled: true,
        ..Default::default()
    };

    for (index, documents, slot) in [
        (code_index(commit_hash), code, &mut summary.code_indexed),
        (doc_index(commit_hash), docs, &mut summary.docs_indexed),
    ] {
        if documents.is_empty() {
            continue;
        }
        let result = client.upsert(&index, &documents).await;
        if let Some(reason) = &result.reason {
            warn!(index = %index, reason = %reason, "Ingestion failed, continuing");
        }
        *slot = result.value;
    }

    info!(
        code = summary.code_indexed,
        docs = summary.docs_indexed,
        commit = %commit_hash,
        "Source ingestion finished"
    );
    summary
}
