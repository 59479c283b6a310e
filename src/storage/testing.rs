//! In-memory backend for handler and router tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::StorageBackend;
use crate::error::{StorageError, StorageResult};
use crate::models::NAMESPACE_RESOURCE_TYPE;

/// A backend call as seen by [`MemoryBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    UpsertResource(String, String),
    DeleteResource(String, String),
    UpsertNamespace(String),
    DeleteNamespace(String),
}

/// Backend keeping records in a map keyed by `(resource_type, uid)`.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    connected: AtomicBool,
    /// When set, every write is rejected as a store-side failure.
    reject_writes: AtomicBool,
    records: Mutex<HashMap<(String, String), Value>>,
    calls: Mutex<Vec<Call>>,
}

impl MemoryBackend {
    /// Returns a backend that is already connected.
    pub fn connected() -> Self {
        let backend = Self::default();
        backend.connected.store(true, Ordering::SeqCst);
        backend
    }

    pub fn reject_writes(&self) {
        self.reject_writes.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn get(&self, resource_type: &str, uid: &str) -> Option<Value> {
        self.records
            .lock()
            .unwrap()
            .get(&(resource_type.to_string(), uid.to_string()))
            .cloned()
    }

    fn check(&self, call: Call) -> StorageResult<()> {
        self.calls.lock().unwrap().push(call);
        if !self.connected.load(Ordering::SeqCst) {
            return Err(StorageError::NotConnected);
        }
        Ok(())
    }

    fn upsert(&self, resource_type: &str, uid: &str, doc: &Value) -> bool {
        if self.reject_writes.load(Ordering::SeqCst) {
            return false;
        }
        self.records
            .lock()
            .unwrap()
            .insert((resource_type.to_string(), uid.to_string()), doc.clone());
        true
    }

    fn delete(&self, resource_type: &str, uid: &str) -> bool {
        if self.reject_writes.load(Ordering::SeqCst) {
            return false;
        }
        self.records
            .lock()
            .unwrap()
            .remove(&(resource_type.to_string(), uid.to_string()))
            .is_some()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn connect(&self) -> StorageResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    async fn upsert_resource(
        &self,
        resource_type: &str,
        uid: &str,
        doc: &Value,
    ) -> StorageResult<bool> {
        self.check(Call::UpsertResource(resource_type.to_string(), uid.to_string()))?;
        Ok(self.upsert(resource_type, uid, doc))
    }

    async fn delete_resource(&self, resource_type: &str, uid: &str) -> StorageResult<bool> {
        self.check(Call::DeleteResource(resource_type.to_string(), uid.to_string()))?;
        Ok(self.delete(resource_type, uid))
    }

    async fn upsert_namespace(&self, uid: &str, doc: &Value) -> StorageResult<bool> {
        self.check(Call::UpsertNamespace(uid.to_string()))?;
        Ok(self.upsert(NAMESPACE_RESOURCE_TYPE, uid, doc))
    }

    async fn delete_namespace(&self, uid: &str) -> StorageResult<bool> {
        self.check(Call::DeleteNamespace(uid.to_string()))?;
        Ok(self.delete(NAMESPACE_RESOURCE_TYPE, uid))
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
