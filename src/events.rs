//! Reduces runtime events to the set of containers they concern.

use std::collections::BTreeSet;

use crate::types::LifecycleEvent;

/// Event type emitted for container objects.
pub const CONTAINER_KIND: &str = "container";

/// Actor attribute carrying the parent container of sub-resource events
/// (exec sessions, network attachments).
pub const CONTAINER_ATTRIBUTE: &str = "container";

/// Containers affected by `event`, deduplicated and in ascending order.
pub fn affected_containers(event: &LifecycleEvent) -> Vec<String> {
    let mut ids = BTreeSet::new();
    if event.kind == CONTAINER_KIND && !event.id.is_empty() {
        ids.insert(event.id.as_str());
    }
    if let Some(parent) = event.attributes.get(CONTAINER_ATTRIBUTE) {
        if !parent.is_empty() {
            ids.insert(parent.as_str());
        }
    }
    ids.into_iter().map(str::to_string).collect()
}
