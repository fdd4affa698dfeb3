use async_trait::async_trait;
use thiserror::Error;

pub mod etcd;
#[cfg(test)]
pub mod memory;

pub use etcd::EtcdStore;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("key {0} not found")]
    NotFound(String),
    #[error("key {0} already exists")]
    AlreadyExists(String),
    #[error("store {op} on {path} failed")]
    Backend {
        op: &'static str,
        path: String,
        #[source]
        source: BoxError,
    },
}

impl StoreError {
    pub fn backend(op: &'static str, path: &str, source: impl Into<BoxError>) -> Self {
        Self::Backend {
            op,
            path: path.to_string(),
            source: source.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Only backend failures are worth retrying; absence and conflicts
    /// will not change by asking again.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Backend { .. })
    }
}

/// Hierarchical key-value store holding the discovery records.
#[async_trait]
pub trait Store: Send + Sync {
    /// Raw value at `path`, or `None` when the key is absent.
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Writes `value` only if `path` does not exist yet.
    async fn create(&self, path: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Replaces the value at `path`, failing if it does not exist.
    async fn update(&self, path: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Removes `path`, failing with [`StoreError::NotFound`] if it is absent.
    async fn delete(&self, path: &str) -> Result<(), StoreError>;
}
