//! etcd v3 backed [`Store`].
//!
//! Create and update are expressed as transactions guarded on the key
//! version, so a lost race surfaces as [`StoreError::AlreadyExists`] or
//! [`StoreError::NotFound`] instead of silently overwriting.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use etcd_client::{Client, Compare, CompareOp, ConnectOptions, Txn, TxnOp};
use log::{debug, info};

use super::{Store, StoreError};

#[derive(Clone)]
pub struct EtcdStore {
    client: Client,
}

impl EtcdStore {
    pub async fn connect(endpoints: &[String], request_timeout: Duration) -> Result<Self> {
        let options = ConnectOptions::new()
            .with_connect_timeout(request_timeout)
            .with_timeout(request_timeout);
        let client = Client::connect(endpoints, Some(options))
            .await
            .context("Failed to connect to etcd")?;
        info!("Connected to etcd at {:?}", endpoints);
        Ok(Self { client })
    }

    async fn guarded_put(
        &self,
        op: &'static str,
        path: &str,
        value: Vec<u8>,
        guard: Compare,
    ) -> Result<bool, StoreError> {
        let txn = Txn::new()
            .when(vec![guard])
            .and_then(vec![TxnOp::put(path, value, None)]);
        let resp = self
            .client
            .clone()
            .txn(txn)
            .await
            .map_err(|e| StoreError::backend(op, path, e))?;
        Ok(resp.succeeded())
    }
}

#[async_trait]
impl Store for EtcdStore {
    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let resp = self
            .client
            .clone()
            .get(path, None)
            .await
            .map_err(|e| StoreError::backend("get", path, e))?;
        Ok(resp.kvs().first().map(|kv| kv.value().to_vec()))
    }

    async fn create(&self, path: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let absent = Compare::version(path, CompareOp::Equal, 0);
        if !self.guarded_put("create", path, value, absent).await? {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        debug!("etcd create {}", path);
        Ok(())
    }

    async fn update(&self, path: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let present = Compare::version(path, CompareOp::Greater, 0);
        if !self.guarded_put("update", path, value, present).await? {
            return Err(StoreError::NotFound(path.to_string()));
        }
        debug!("etcd update {}", path);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let resp = self
            .client
            .clone()
            .delete(path, None)
            .await
            .map_err(|e| StoreError::backend("delete", path, e))?;
        if resp.deleted() == 0 {
            return Err(StoreError::NotFound(path.to_string()));
        }
        debug!("etcd delete {}", path);
        Ok(())
    }
}
