use async_trait::async_trait;
use reqwest::StatusCode;
use std::{
    collections::BTreeMap,
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

use crate::push_id::PushIdGenerator;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("request to store failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store rejected write with {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("unexpected store response: {0}")]
    InvalidResponse(String),
    #[error("credential error: {0}")]
    Credential(String),
    #[error("serialize payload failed: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only keyed store: every `push` creates one new child record and
/// returns the key the store generated for it.
#[async_trait]
pub trait DataSink: Send + Sync + 'static {
    async fn push(&self, value: serde_json::Value) -> Result<String, SinkError>;
}

pub const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

/// Process-local store with the same push-key semantics as the remote one.
/// Holds at most `capacity` records; the oldest keys are evicted first.
pub struct MemorySink {
    capacity: usize,
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    ids: PushIdGenerator,
    records: BTreeMap<String, serde_json::Value>,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_CAPACITY)
    }
}

impl MemorySink {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(MemoryInner::default()),
        }
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let inner = self.inner.lock().ok()?;
        inner.records.get(key).cloned()
    }
}

#[async_trait]
impl DataSink for MemorySink {
    async fn push(&self, value: serde_json::Value) -> Result<String, SinkError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| SinkError::Unavailable("memory store poisoned".to_string()))?;
        let key = inner.ids.next_id(now_millis());
        inner.records.insert(key.clone(), value);
        // Push ids sort by creation time, so the first entry is the oldest.
        while inner.records.len() > self.capacity {
            inner.records.pop_first();
        }
        tracing::debug!(key = %key, records = inner.records.len(), "stored record in memory");
        Ok(key)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
