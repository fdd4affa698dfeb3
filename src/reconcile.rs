//! Reconciliation engine.
//!
//! For one container identifier the engine inspects the container, reads
//! the entry last stored for it and issues the store mutations needed to
//! make the store match what the inspection says.  Nothing is kept between
//! calls; the store is the only memory.
//!
//! Mutation order when an entry is replaced:
//!
//! 1. delete every key path of the previous entry (absent keys are fine)
//! 2. replace the entry in place (must still exist)
//! 3. create every key path of the new entry (must not exist)
//!
//! None of this is transactional.  A crash between steps leaves orphans
//! that are only repaired by the next event for the same container.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use log::{debug, info, warn};
use tokio::time::timeout;

use crate::error::ReconcileError;
use crate::keypath::{discovery_keys, entry_path};
use crate::naming::discovery_domains;
use crate::runtime::{InspectError, Inspector};
use crate::store::{Store, StoreError};
use crate::types::{AddressEnvelope, ContainerInfo, Entry};

/// What a reconciliation did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No entry existed; entry and keys were written.
    Created,
    /// A different entry existed; it and its keys were superseded.
    Replaced,
    /// The stored entry already matched. No writes.
    Unchanged,
    /// The container is gone or addressless; entry and keys were removed.
    Deleted,
    /// The container is gone and nothing was stored for it. No writes.
    AlreadyAbsent,
}

/// Exponential backoff applied to collaborator calls that fail transiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(100),
            max_interval: Duration::from_secs(2),
            max_elapsed: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::new()
            .with_initial_interval(self.initial_interval)
            .with_max_interval(self.max_interval)
            .with_max_elapsed_time(Some(self.max_elapsed))
            .build()
    }

    /// Runs `op` until it succeeds, fails with an error `transient` rejects,
    /// or the policy's time budget is spent.
    pub async fn run<T, E, F, Fut>(&self, mut op: F, transient: fn(&E) -> bool) -> Result<T, E>
    where
        E: Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        backoff::future::retry_notify(
            self.backoff(),
            || {
                let attempt = op();
                async move {
                    attempt.await.map_err(|e| {
                        if transient(&e) {
                            backoff::Error::transient(e)
                        } else {
                            backoff::Error::permanent(e)
                        }
                    })
                }
            },
            |e: E, after: Duration| warn!("{}. Retrying in {:?}...", e, after),
        )
        .await
    }
}

/// An entry as read back from the store, together with its exact bytes.
struct StoredEntry {
    raw: Vec<u8>,
    entry: Entry,
}

/// Upper bound on a single inspection attempt.
pub const DEFAULT_INSPECT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Reconciler<I, S> {
    inspector: I,
    store: S,
    retry: RetryPolicy,
    inspect_timeout: Duration,
}

impl<I: Inspector, S: Store> Reconciler<I, S> {
    pub fn new(inspector: I, store: S, retry: RetryPolicy) -> Self {
        Self {
            inspector,
            store,
            retry,
            inspect_timeout: DEFAULT_INSPECT_TIMEOUT,
        }
    }

    pub fn with_inspect_timeout(mut self, inspect_timeout: Duration) -> Self {
        self.inspect_timeout = inspect_timeout;
        self
    }

    #[cfg(test)]
    pub fn inspector(&self) -> &I {
        &self.inspector
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Converges the store to the current state of one container.
    pub async fn reconcile(&self, id: &str) -> Result<Outcome, ReconcileError> {
        let info = self.inspect(id).await?;
        let live = info.as_ref().filter(|i| !i.address.is_empty());

        let action = if live.is_some() { "set" } else { "del" };
        let shown = info.clone().unwrap_or_default();
        info!(
            "{}: {} {} {} {}",
            action, id, shown.image, shown.name, shown.address
        );

        let path = entry_path(id);
        let prior = self.load(&path).await?;
        match live {
            Some(info) => self.publish(id, &path, info, prior).await,
            None => self.withdraw(&path, prior).await,
        }
    }

    async fn inspect(&self, id: &str) -> Result<Option<ContainerInfo>, InspectError> {
        // Not-found already comes back as `Ok(None)`; anything else is transport.
        // Each attempt is timed out on its own so a hung call cannot stall
        // the worker past the retry budget.
        let attempt = || async move {
            match timeout(self.inspect_timeout, self.inspector.inspect(id)).await {
                Ok(result) => result,
                Err(elapsed) => Err(InspectError {
                    id: id.to_string(),
                    source: Box::new(elapsed),
                }),
            }
        };
        self.retry.run(attempt, |_: &InspectError| true).await
    }

    async fn load(&self, path: &str) -> Result<Option<StoredEntry>, ReconcileError> {
        let raw = self
            .retry
            .run(|| self.store.get(path), StoreError::is_transient)
            .await?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let entry = Entry::from_bytes(&raw).map_err(|source| ReconcileError::CorruptEntry {
            path: path.to_string(),
            source,
        })?;
        Ok(Some(StoredEntry { raw, entry }))
    }

    async fn withdraw(
        &self,
        path: &str,
        prior: Option<StoredEntry>,
    ) -> Result<Outcome, ReconcileError> {
        let Some(prior) = prior else {
            return Ok(Outcome::AlreadyAbsent);
        };
        self.delete_keys(&prior.entry.keys).await?;
        self.delete(path).await?;
        Ok(Outcome::Deleted)
    }

    async fn publish(
        &self,
        id: &str,
        path: &str,
        info: &ContainerInfo,
        prior: Option<StoredEntry>,
    ) -> Result<Outcome, ReconcileError> {
        let domains = discovery_domains(id, &info.image, &info.name)?;
        let desired = Entry {
            keys: discovery_keys(&domains),
            domains,
            address: info.address.clone(),
        };
        let encode = |source: serde_json::Error| ReconcileError::Encode {
            id: id.to_string(),
            source,
        };
        let bytes = desired.to_bytes().map_err(encode)?;

        let outcome = match prior {
            Some(prior) if prior.raw == bytes => return Ok(Outcome::Unchanged),
            Some(prior) => {
                self.delete_keys(&prior.entry.keys).await?;
                self.retry
                    .run(
                        || self.store.update(path, bytes.clone()),
                        StoreError::is_transient,
                    )
                    .await?;
                debug!("Replaced entry {}", path);
                Outcome::Replaced
            }
            None => {
                self.retry
                    .run(
                        || self.store.create(path, bytes.clone()),
                        StoreError::is_transient,
                    )
                    .await?;
                debug!("Created entry {}", path);
                Outcome::Created
            }
        };

        let envelope = serde_json::to_vec(&AddressEnvelope {
            host: desired.address.clone(),
        })
        .map_err(encode)?;
        for key in &desired.keys {
            self.retry
                .run(
                    || self.store.create(key, envelope.clone()),
                    StoreError::is_transient,
                )
                .await?;
            debug!("Created key {} -> {}", key, desired.address);
        }
        Ok(outcome)
    }

    async fn delete_keys(&self, keys: &[String]) -> Result<(), StoreError> {
        for key in keys {
            self.delete(key).await?;
        }
        Ok(())
    }

    /// Deletes `path`; a key that is already gone counts as deleted.
    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        match self
            .retry
            .run(|| self.store.delete(path), StoreError::is_transient)
            .await
        {
            Ok(()) => {
                debug!("Deleted {}", path);
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!("{} was already absent", path);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
