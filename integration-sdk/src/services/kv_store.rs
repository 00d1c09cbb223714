//! Key-value persistence with an in-memory fallback
//!
//! [`KeyValueStore`] prefers a durable backend (Redis) and falls back to a
//! process-local map when the backend is missing or misbehaves. Once a
//! backend operation fails the store stays in memory mode for the rest of
//! its lifetime, so a flapping backend cannot split writes between the two.
//! Reads and writes always succeed; `enabled` on the result tells the
//! caller whether the durable backend served them.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use config_rs::KeyValueSettings;
use error_handling::{FailSoft, FailSoftResult};
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::error::{Result, ServiceError};

const SERVICE_NAME: &str = "key-value-store";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage operations the pipeline needs from a key-value backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueBackend: Send + Sync {
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;
}

/// Redis backend over a multiplexed connection manager.
#[derive(Clone)]
pub struct RedisBackend {
    connection: redis::aio::ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| ServiceError::configuration(format!("Invalid Redis URL: {}", e)))?;

        let connection = tokio::time::timeout(CONNECT_TIMEOUT, redis::aio::ConnectionManager::new(client))
            .await
            .map_err(|_| ServiceError::timeout(format!("Connecting to Redis took over {:?}", CONNECT_TIMEOUT)))??;

        Ok(Self { connection })
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection.clone();
        conn.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.connection.clone();
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection.clone();
        let mut keys: Vec<String> = conn.keys(pattern).await?;
        keys.sort();
        Ok(keys)
    }
}

/// Process-local map. Keys come back sorted.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// `*` matches everything, a trailing `*` is a prefix match, anything
    /// else is a substring match.
    fn matches(pattern: &str, key: &str) -> bool {
        if pattern == "*" {
            true
        } else if let Some(prefix) = pattern.strip_suffix('*') {
            key.starts_with(prefix)
        } else {
            key.contains(pattern)
        }
    }
}

#[async_trait]
impl KeyValueBackend for MemoryBackend {
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|key| Self::matches(pattern, key))
            .cloned()
            .collect())
    }
}

/// Fail-soft key-value store.
pub struct KeyValueStore {
    fail_soft: FailSoft,
    backend: Option<Arc<dyn KeyValueBackend>>,
    memory: MemoryBackend,
    tripped: AtomicBool,
}

impl KeyValueStore {
    /// Store with no durable backend at all.
    pub fn in_memory() -> Self {
        Self {
            fail_soft: FailSoft::disabled(SERVICE_NAME),
            backend: None,
            memory: MemoryBackend::new(),
            tripped: AtomicBool::new(false),
        }
    }

    pub fn with_backend(backend: Arc<dyn KeyValueBackend>) -> Self {
        Self {
            fail_soft: FailSoft::new(SERVICE_NAME, true),
            backend: Some(backend),
            memory: MemoryBackend::new(),
            tripped: AtomicBool::new(false),
        }
    }

    /// Connect to Redis when `REDIS_URL` is configured.
    ///
    /// Never fails: an unreachable server yields an in-memory store.
    pub async fn connect(settings: &KeyValueSettings) -> Self {
        let Some(url) = settings.redis_url.as_deref() else {
            info!("No REDIS_URL set, using in-memory store");
            return Self::in_memory();
        };

        match RedisBackend::connect(url).await {
            Ok(backend) => {
                info!("Connected to Redis key-value store");
                Self::with_backend(Arc::new(backend))
            }
            Err(e) => {
                warn!(error = %e, "Redis connection failed, using in-memory store instead");
                Self::in_memory()
            }
        }
    }

    /// True while a durable backend is serving requests.
    pub fn is_durable(&self) -> bool {
        self.active_backend().is_some()
    }

    fn active_backend(&self) -> Option<&Arc<dyn KeyValueBackend>> {
        if self.tripped.load(Ordering::SeqCst) {
            None
        } else {
            self.backend.as_ref()
        }
    }

    fn trip(&self) {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            warn!("Key-value backend failed, switching to in-memory store for the rest of this run");
        }
    }

    fn memory_reason(&self) -> String {
        if self.backend.is_some() {
            format!("{} backend failed earlier, serving from memory", SERVICE_NAME)
        } else {
            format!("{} is not configured", SERVICE_NAME)
        }
    }

    pub async fn set(&self, key: &str, value: &str) -> FailSoftResult<()> {
        if let Some(backend) = self.active_backend() {
            let result = self.fail_soft.call("set", || backend.set(key, value), || ()).await;
            if result.enabled {
                return result;
            }
            self.trip();
            // Memory writes cannot fail.
            let _ = self.memory.set(key, value).await;
            return result;
        }

        let _ = self.memory.set(key, value).await;
        FailSoftResult::degraded((), self.memory_reason())
    }

    pub async fn get(&self, key: &str) -> FailSoftResult<Option<String>> {
        if let Some(backend) = self.active_backend() {
            let result = self.fail_soft.call("get", || backend.get(key), || None).await;
            if result.enabled {
                return result;
            }
            self.trip();
            let value = self.memory.get(key).await.unwrap_or(None);
            return FailSoftResult { value, ..result };
        }

        let value = self.memory.get(key).await.unwrap_or(None);
        FailSoftResult::degraded(value, self.memory_reason())
    }

    pub async fn keys(&self, pattern: &str) -> FailSoftResult<Vec<String>> {
        if let Some(backend) = self.active_backend() {
            let result = self.fail_soft.call("keys", || backend.keys(pattern), Vec::new).await;
            if result.enabled {
                return result;
            }
            self.trip();
            let value = self.memory.keys(pattern).await.unwrap_or_default();
            return FailSoftResult { value, ..result };
        }

        let value = self.memory.keys(pattern).await.unwrap_or_default();
        FailSoftResult::degraded(value, self.memory_reason())
    }
}
