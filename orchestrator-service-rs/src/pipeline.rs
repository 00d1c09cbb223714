//! The diagnostic pipeline.
//!
//! Every dependency is constructed per pipeline and handed in through
//! [`PipelineDeps`]; nothing here is process-global. Each stage absorbs its
//! own failures, so [`Pipeline::run`] always reaches `Done`.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use config_rs::AppSettings;
use context_manager::ContextManager;
use integration_sdk::{KeyValueStore, TokenizerClient, VectorSearchClient};
use llm_service::{DiagnosisSource, DiagnosisStage};
use persistence_kb::{build_failure_log, redact_failure_log, write_raw_log, RunStore};
use serde::{Deserialize, Serialize};
use shared_types::{DiagnosisRecord, FailureLogRecord, RetrievedContext, TestSuite};
use test_runner::{ProbeError, TestRunner};
use tracing::{info, warn};
use uuid::Uuid;

use crate::stage::{PipelineStage, StageTracker};

/// Aggregate output of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub run_id: String,
    pub commit_hash: String,
    pub base_url: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    /// The log as persisted and diagnosed; PII is tokenized when
    /// `pii_tokenized` is set.
    pub failure_log: FailureLogRecord,
    pub diagnosis: DiagnosisRecord,
    pub diagnosis_source: DiagnosisSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnosis_note: Option<String>,
    pub retrieved_context: RetrievedContext,
    pub pii_tokenized: bool,
    pub durable_storage: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_log_path: Option<PathBuf>,
    pub stages: Vec<PipelineStage>,
}

/// Everything a pipeline talks to.
pub struct PipelineDeps {
    pub runner: TestRunner,
    pub tokenizer: TokenizerClient,
    pub run_store: RunStore,
    pub context: ContextManager,
    pub diagnosis: DiagnosisStage,
    /// Where `{run_id}_raw.json` goes; `None` disables the file sink.
    pub runs_dir: Option<PathBuf>,
    pub code_source_dir: Option<PathBuf>,
    pub docs_source_dir: Option<PathBuf>,
}

impl PipelineDeps {
    /// Dependencies that never leave the process: no vault, no vector
    /// search, no model and an in-memory store.
    pub fn offline(runner: TestRunner) -> Self {
        Self {
            runner,
            tokenizer: TokenizerClient::new(Default::default()),
            run_store: RunStore::in_memory(),
            context: ContextManager::disabled(),
            diagnosis: DiagnosisStage::rule_based(),
            runs_dir: None,
            code_source_dir: None,
            docs_source_dir: None,
        }
    }

    /// Wire every dependency from settings. Only an invalid probe client
    /// can fail; unavailable services degrade instead.
    pub async fn from_settings(settings: &AppSettings) -> Result<Self, ProbeError> {
        let runner = TestRunner::new(settings.pipeline.probe_timeout)?;
        let kv = KeyValueStore::connect(&settings.key_value).await;
        let vector = VectorSearchClient::new(settings.vector_search.clone());

        Ok(Self {
            runner,
            tokenizer: TokenizerClient::new(settings.tokenizer.clone()),
            run_store: RunStore::new(Arc::new(kv)),
            context: ContextManager::new(Arc::new(vector), settings.pipeline.retrieval_top_k),
            diagnosis: DiagnosisStage::new(settings.llm.clone()),
            runs_dir: Some(settings.pipeline.runs_dir.clone()),
            code_source_dir: settings.pipeline.code_source_dir.clone(),
            docs_source_dir: settings.pipeline.docs_source_dir.clone(),
        })
    }
}

pub struct Pipeline {
    deps: PipelineDeps,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        Self { deps }
    }

    pub fn run_store(&self) -> &RunStore {
        &self.deps.run_store
    }

    /// Run with a fresh run id and the current time.
    pub async fn run(&self, suite: &TestSuite, base_url: &str, commit_hash: &str) -> PipelineRunResult {
        let run_id = Uuid::new_v4().to_string();
        self.run_with_id(suite, base_url, commit_hash, &run_id, Utc::now()).await
    }

    pub async fn run_with_id(
        &self,
        suite: &TestSuite,
        base_url: &str,
        commit_hash: &str,
        run_id: &str,
        timestamp: DateTime<Utc>,
    ) -> PipelineRunResult {
        let mut stages = StageTracker::start(run_id);
        info!(run_id = %run_id, base_url = %base_url, commit = %commit_hash, cases = suite.len(), "Starting diagnostic run");

        // Executing
        let test_result = self.deps.runner.run(suite, base_url).await;
        match &test_result.failure {
            None => info!(run_id = %run_id, "All tests passed"),
            Some(failure) => info!(run_id = %run_id, test = %failure.test_name, reason = %failure.reason, "Test failure detected"),
        }

        // Logging
        stages.advance();
        let canonical = build_failure_log(&test_result, commit_hash, run_id, timestamp);
        let redacted = redact_failure_log(&canonical, &self.deps.tokenizer).await;
        let pii_tokenized = redacted.enabled;
        let failure_log = redacted.value;

        let saved = self.deps.run_store.save_failure_log(&failure_log).await;
        if let Some(reason) = &saved.reason {
            info!(run_id = %run_id, reason = %reason, "Failure log kept in memory only");
        }

        let raw_log_path = self.deps.runs_dir.as_deref().and_then(|dir| {
            write_raw_log(dir, &failure_log)
                .map_err(|e| warn!(run_id = %run_id, error = %e, "Could not write raw failure log"))
                .ok()
        });

        // Retrieving
        stages.advance();
        let retrieved_context = if failure_log.is_failed() {
            self.deps
                .context
                .ingest(
                    self.deps.code_source_dir.as_deref(),
                    self.deps.docs_source_dir.as_deref(),
                    commit_hash,
                )
                .await;
            self.deps.context.retrieve(&failure_log, commit_hash).await
        } else {
            RetrievedContext::default()
        };

        // Diagnosing
        stages.advance();
        let outcome = self.deps.diagnosis.diagnose(&failure_log, &retrieved_context).await;

        stages.advance();
        debug_assert!(stages.current().is_terminal());
        let result = PipelineRunResult {
            run_id: run_id.to_string(),
            commit_hash: commit_hash.to_string(),
            base_url: base_url.to_string(),
            timestamp,
            success: test_result.success,
            failure_log,
            diagnosis: outcome.record,
            diagnosis_source: outcome.source,
            diagnosis_note: outcome.reason,
            retrieved_context,
            pii_tokenized,
            durable_storage: self.deps.run_store.is_durable(),
            raw_log_path,
            stages: stages.into_visited(),
        };

        self.deps.run_store.save_run_result(run_id, &result).await;

        info!(
            run_id = %run_id,
            success = result.success,
            category = %result.diagnosis.failure_category,
            source = ?result.diagnosis_source,
            "Diagnostic run complete"
        );
        result
    }
}
