//! Single-consumer event worker.
//!
//! Events are handled strictly one after another, so two reconciliations
//! for the same container never overlap.

use anyhow::anyhow;
use log::{debug, error, info};
use tokio::sync::mpsc;

use crate::error::ReconcileError;
use crate::events::affected_containers;
use crate::reconcile::{Outcome, Reconciler};
use crate::runtime::Inspector;
use crate::store::Store;
use crate::types::LifecycleEvent;

/// Consumes events until the channel closes or a fatal error occurs.
pub async fn run<I: Inspector, S: Store>(
    reconciler: Reconciler<I, S>,
    mut event_rx: mpsc::Receiver<LifecycleEvent>,
) -> Result<(), ReconcileError> {
    while let Some(event) = event_rx.recv().await {
        handle_event(&reconciler, &event).await?;
    }
    info!("Event channel closed, reconciler stopping");
    Ok(())
}

/// Reconciles every container the event refers to. Isolable failures
/// are logged and skipped; the first fatal one is returned.
pub async fn handle_event<I: Inspector, S: Store>(
    reconciler: &Reconciler<I, S>,
    event: &LifecycleEvent,
) -> Result<Vec<(String, Outcome)>, ReconcileError> {
    let mut outcomes = Vec::new();
    for id in affected_containers(event) {
        match reconciler.reconcile(&id).await {
            Ok(outcome) => {
                debug!("{} -> {:?}", id, outcome);
                outcomes.push((id, outcome));
            }
            Err(e) if !e.is_fatal() => {
                error!("Skipping container {}: {:#}", id, anyhow!(e));
            }
            Err(e) => return Err(e),
        }
    }
    Ok(outcomes)
}
