use crate::types::{ContainerInfo, LifecycleEvent};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

pub mod docker;
pub use docker::DockerRuntime;

#[derive(Debug, Error)]
#[error("failed to inspect container {id}")]
pub struct InspectError {
    pub id: String,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync + 'static>,
}

#[async_trait]
pub trait ContainerRuntime {
    /// Start watching the runtime for lifecycle events.
    /// Events should be sent to the provided channel in arrival order.
    async fn monitor(&self, event_tx: mpsc::Sender<LifecycleEvent>) -> Result<()>;
}

#[async_trait]
pub trait Inspector: Send + Sync {
    /// Current state of a container, or `None` if the runtime does not know it.
    async fn inspect(&self, id: &str) -> Result<Option<ContainerInfo>, InspectError>;
}
