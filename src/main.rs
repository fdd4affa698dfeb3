//! swtch daemon entry point.

use log::{error, info};
use tokio::signal;
use tokio::sync::mpsc;

mod config;
mod error;
mod events;
mod keypath;
mod naming;
mod reconcile;
mod runtime;
mod store;
mod supervisor;
mod types;

use config::Config;
use reconcile::Reconciler;
use runtime::{ContainerRuntime, DockerRuntime};
use store::EtcdStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::init();

    // Load configuration
    let cfg = Config::load()?;
    info!("Starting swtch with config: {:?}", cfg);

    // Store (etcd)
    let retry = cfg.retry_policy();
    let store = retry
        .run(
            || EtcdStore::connect(&cfg.etcd_endpoints, cfg.etcd_timeout()),
            |_: &anyhow::Error| true,
        )
        .await?;

    // Container Runtime (Docker)
    let runtime = DockerRuntime::connect(cfg.network_name.clone(), cfg.reconnect_delay())?;
    let reconciler = Reconciler::new(runtime.clone(), store, retry)
        .with_inspect_timeout(cfg.inspect_timeout());

    // Event channel
    let (event_tx, event_rx) = mpsc::channel(128);

    let mut monitor_handle = tokio::spawn(async move { runtime.monitor(event_tx).await });
    let mut worker_handle = tokio::spawn(supervisor::run(reconciler, event_rx));

    let result: anyhow::Result<()> = tokio::select! {
        res = signal::ctrl_c() => match res {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down...");
                Ok(())
            }
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
                Err(err.into())
            }
        },
        res = &mut worker_handle => match res {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Reconciler failed: {}", e);
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        },
        res = &mut monitor_handle => match res {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!("Container runtime failed: {}", e);
                Err(e)
            }
            Err(e) => Err(e.into()),
        },
    };

    // Abort tasks
    monitor_handle.abort();
    worker_handle.abort();

    info!("Shutdown complete.");
    result
}
