//! Artifact gateway and object-store backends.
//!
//! Large inputs and outputs (files) are persisted in an object store behind
//! the [`ObjectStore`] trait. The [`ArtifactGateway`] layers a logical-key
//! scheme and bounded retry with backoff on top, so a flaky store surfaces
//! as a per-spec error only after the retry budget is spent.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::model::RunId;
use crate::error::{ErrorRetryability, SpecError, SpecResult};

/// Failure reported by an object-store backend.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
    pub retryability: ErrorRetryability,
}

impl StoreError {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryability: ErrorRetryability::Retryable,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryability: ErrorRetryability::NonRetryable,
        }
    }
}

/// Key-value blob store. Both operations are idempotent: re-`put`ting the
/// same bytes under the same key is a no-op success, and concurrent puts to
/// distinct keys need no coordination.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// In-memory store, for tests and single-process runs.
#[derive(Default)]
pub struct MemoryObjectStore {
    data: tokio::sync::RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self {
            data: tokio::sync::RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        {
            let data = self.data.read().await;
            if data.get(key).map(|existing| existing == bytes).unwrap_or(false) {
                return Ok(());
            }
        }
        self.data.write().await.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.data
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::fatal(format!("key not found: {}", key)))
    }
}

/// Directory-backed store. Slashes in keys become subdirectories.
pub struct FileObjectStore {
    dir: PathBuf,
}

impl FileObjectStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::fatal(e.to_string()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() || key.split('/').any(|part| part.is_empty() || part == "..") {
            return Err(StoreError::fatal(format!("invalid storage key: {}", key)));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl ObjectStore for FileObjectStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::retryable(e.to_string()))?;
        }
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| StoreError::retryable(e.to_string()))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::fatal(format!("key not found: {}", key)))
            }
            Err(e) => Err(StoreError::retryable(e.to_string())),
        }
    }
}

/// Retry behavior at the gateway boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_interval_ms")]
    pub base_interval_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_interval_ms() -> u64 {
    100
}
fn default_backoff_multiplier() -> f64 {
    2.0
}
fn default_max_interval_ms() -> u64 {
    10_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_interval_ms: default_base_interval_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_interval_ms: default_max_interval_ms(),
        }
    }
}

impl RetrySettings {
    /// Exponential backoff with jitter for the given 0-based attempt.
    fn backoff(&self, attempt: u32) -> Duration {
        let scaled = self.base_interval_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped = scaled.min(self.max_interval_ms as f64) as u64;
        let jitter = rand::thread_rng().gen_range(0..=capped / 2 + 1);
        Duration::from_millis(capped + jitter)
    }
}

/// Store access scoped by the run's logical-key scheme, with retries.
#[derive(Clone)]
pub struct ArtifactGateway {
    store: Arc<dyn ObjectStore>,
    retry: RetrySettings,
}

impl ArtifactGateway {
    pub fn new(store: Arc<dyn ObjectStore>, retry: RetrySettings) -> Self {
        Self { store, retry }
    }

    /// Collision-free, reproducible key for a file field of one spec.
    pub fn logical_key(run_id: &RunId, sort_index: usize, field_name: &str) -> String {
        format!("{}/{}/{}", run_id, sort_index, field_name)
    }

    /// Store bytes under a logical key, returning the storage key.
    pub async fn put(&self, bytes: &[u8], logical_key: &str) -> SpecResult<String> {
        self.with_retry(logical_key, || self.store.put(logical_key, bytes))
            .await?;
        Ok(logical_key.to_string())
    }

    pub async fn get(&self, key: &str) -> SpecResult<Vec<u8>> {
        self.with_retry(key, || self.store.get(key)).await
    }

    async fn with_retry<T, F, Fut>(&self, key: &str, op: F) -> SpecResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.retryability == ErrorRetryability::Retryable
                    && attempt < self.retry.max_retries =>
                {
                    let delay = self.retry.backoff(attempt);
                    tracing::warn!(
                        key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "object store operation failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(SpecError::Storage {
                        message: format!("{} (key {})", e.message, key),
                        retryability: e.retryability,
                    });
                }
            }
        }
    }
}
