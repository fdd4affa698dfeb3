//! In-process [`Store`] that mirrors etcd's absence and conflict signals
//! and records every mutation for inspection.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Create(String),
    Update(String),
    Delete(String),
}

#[derive(Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
    log: Mutex<Vec<Op>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes directly, bypassing the operation log.
    pub async fn seed(&self, path: &str, value: impl Into<Vec<u8>>) {
        self.data.lock().await.insert(path.to_string(), value.into());
    }

    /// Removes directly, bypassing the operation log.
    pub async fn evict(&self, path: &str) {
        self.data.lock().await.remove(path);
    }

    pub async fn value(&self, path: &str) -> Option<Vec<u8>> {
        self.data.lock().await.get(path).cloned()
    }

    pub async fn paths(&self) -> Vec<String> {
        self.data.lock().await.keys().cloned().collect()
    }

    /// Drains the mutations recorded so far, including failed attempts.
    pub async fn take_ops(&self) -> Vec<Op> {
        std::mem::take(&mut *self.log.lock().await)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.lock().await.get(path).cloned())
    }

    async fn create(&self, path: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.log.lock().await.push(Op::Create(path.to_string()));
        let mut data = self.data.lock().await;
        if data.contains_key(path) {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        data.insert(path.to_string(), value);
        Ok(())
    }

    async fn update(&self, path: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.log.lock().await.push(Op::Update(path.to_string()));
        match self.data.lock().await.get_mut(path) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.log.lock().await.push(Op::Delete(path.to_string()));
        match self.data.lock().await.remove(path) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }
}
