//! Keyed run history on top of the fail-soft key-value store.
//!
//! Layout: `failure_log:{run_id}` holds the canonical log,
//! `run:{run_id}` holds the summary the caller chooses to keep.

use std::sync::Arc;

use error_handling::FailSoftResult;
use integration_sdk::KeyValueStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::FailureLogRecord;
use tracing::{debug, warn};

const FAILURE_LOG_PREFIX: &str = "failure_log:";
const RUN_PREFIX: &str = "run:";

#[derive(Clone)]
pub struct RunStore {
    kv: Arc<KeyValueStore>,
}

impl RunStore {
    pub fn new(kv: Arc<KeyValueStore>) -> Self {
        Self { kv }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(KeyValueStore::in_memory()))
    }

    pub fn is_durable(&self) -> bool {
        self.kv.is_durable()
    }

    pub async fn save_failure_log(&self, log: &FailureLogRecord) -> FailSoftResult<()> {
        let key = format!("{}{}", FAILURE_LOG_PREFIX, log.run_id);
        self.put(&key, log).await
    }

    pub async fn get_failure_log(&self, run_id: &str) -> FailSoftResult<Option<FailureLogRecord>> {
        self.fetch(&format!("{}{}", FAILURE_LOG_PREFIX, run_id)).await
    }

    pub async fn save_run_result<T: Serialize>(&self, run_id: &str, result: &T) -> FailSoftResult<()> {
        self.put(&format!("{}{}", RUN_PREFIX, run_id), result).await
    }

    pub async fn get_run_result<T: DeserializeOwned>(&self, run_id: &str) -> FailSoftResult<Option<T>> {
        self.fetch(&format!("{}{}", RUN_PREFIX, run_id)).await
    }

    /// All stored run summaries ordered by key. Entries that no longer
    /// decode as `T` are skipped.
    pub async fn list_run_history<T: DeserializeOwned>(&self) -> FailSoftResult<Vec<T>> {
        let keys = self.kv.keys(&format!("{}*", RUN_PREFIX)).await;
        let mut keys_sorted = keys.value;
        keys_sorted.sort();

        let mut enabled = keys.enabled;
        let mut reason = keys.reason;
        let mut runs = Vec::with_capacity(keys_sorted.len());

        for key in keys_sorted {
            let entry = self.kv.get(&key).await;
            if !entry.enabled && enabled {
                enabled = false;
                reason = entry.reason.clone();
            }
            let Some(raw) = entry.value else { continue };
            match serde_json::from_str::<T>(&raw) {
                Ok(run) => runs.push(run),
                Err(e) => warn!(key = %key, error = %e, "Skipping unreadable run entry"),
            }
        }

        FailSoftResult {
            enabled,
            value: runs,
            reason,
        }
    }

    async fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> FailSoftResult<()> {
        match serde_json::to_string(value) {
            Ok(json) => {
                let result = self.kv.set(key, &json).await;
                debug!(key = %key, durable = result.enabled, "Stored run entry");
                result
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Could not serialize run entry");
                FailSoftResult::degraded((), format!("serialization failed for {}: {}", key, e))
            }
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, key: &str) -> FailSoftResult<Option<T>> {
        let entry = self.kv.get(key).await;
        entry.map(|raw| {
            raw.and_then(|raw| match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key = %key, error = %e, "Stored entry does not decode");
                    None
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde::Deserialize;
    use shared_types::RunStatus;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Summary {
        run_id: String,
        success: bool,
    }

    #[tokio::test]
    async fn test_history_empty_without_backend() {
        let store = RunStore::in_memory();
        let history = store.list_run_history::<Summary>().await;

        assert!(!history.enabled);
        assert!(history.value.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_writes_are_readable() {
        let store = RunStore::in_memory();
        let saved = store
            .save_run_result("b", &Summary { run_id: "b".into(), success: false })
            .await;
        assert!(!saved.enabled);
        store
            .save_run_result("a", &Summary { run_id: "a".into(), success: true })
            .await;

        let history = store.list_run_history::<Summary>().await.value;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].run_id, "a");

        let one = store.get_run_result::<Summary>("b").await.value;
        assert_eq!(one, Some(Summary { run_id: "b".into(), success: false }));
        assert!(store.get_run_result::<Summary>("missing").await.value.is_none());
    }

    #[tokio::test]
    async fn test_failure_log_keyed_by_run_id() {
        let store = RunStore::in_memory();
        let log = FailureLogRecord {
            run_id: "r1".to_string(),
            timestamp: Utc::now(),
            commit_hash: "c".to_string(),
            status: RunStatus::Passed,
            failure: None,
            request_history: Vec::new(),
        };
        store.save_failure_log(&log).await;

        assert_eq!(store.get_failure_log("r1").await.value, Some(log));
        // failure logs are not run summaries
        assert!(store.list_run_history::<Summary>().await.value.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_entries_are_skipped() {
        let kv = Arc::new(KeyValueStore::in_memory());
        kv.set("run:bad", "{not json").await;
        let store = RunStore::new(kv);
        store
            .save_run_result("good", &Summary { run_id: "good".into(), success: true })
            .await;

        let history = store.list_run_history::<Summary>().await.value;
        assert_eq!(history, vec![Summary { run_id: "good".into(), success: true }]);
    }
}
