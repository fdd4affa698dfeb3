use thiserror::Error;

use crate::naming::NamingError;
use crate::runtime::InspectError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Naming(#[from] NamingError),
    #[error(transparent)]
    Inspect(#[from] InspectError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to encode entry for container {id}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("stored entry at {path} is not a valid entry")]
    CorruptEntry {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ReconcileError {
    /// Whether the daemon must stop rather than move on to the next
    /// container.
    ///
    /// Failures tied to one container (a bad identifier, an inspection
    /// that kept failing) are isolable. Store failures are not: either the
    /// store is unreachable for everyone, or it disagreed with what was
    /// just read from it.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Naming(_) | Self::Inspect(_) => false,
            Self::Store(_) | Self::Encode { .. } | Self::CorruptEntry { .. } => true,
        }
    }
}
