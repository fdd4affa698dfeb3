//! Data structures used throughout the swtch daemon.
//!
//! [`Entry`] and [`AddressEnvelope`] are what ends up in etcd, so their
//! serialised form is part of the on-disk contract: field order and
//! field names must not change.  The remaining types describe what the
//! container runtime reports to the reconciler.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The canonical discovery record of one container.
///
/// `domains` and `keys` are each sorted on their own, so `keys[i]` is
/// not necessarily the key path of `domains[i]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Entry {
    pub domains: Vec<String>,
    pub keys: Vec<String>,
    #[serde(rename = "Addr")]
    pub address: String,
}

impl Entry {
    /// Compact JSON encoding. Struct fields serialise in declaration
    /// order, so equal entries always produce equal bytes.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

/// Value written at every discovery key path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressEnvelope {
    pub host: String,
}

/// A single event from the container runtime, reduced to the fields the
/// deduplicator looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Object type the event was emitted for, e.g. `container` or `network`.
    pub kind: String,
    /// Identifier of the object the event was emitted for.
    pub id: String,
    pub attributes: HashMap<String, String>,
}

/// What an inspection reports about a live container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerInfo {
    /// Display name, possibly with a leading `/`.
    pub name: String,
    /// Image reference as the container was created from it.
    pub image: String,
    /// Resolved network address; empty when the container has none.
    pub address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_serialises_with_stable_field_names_and_order() {
        let entry = Entry {
            domains: vec!["abc.switch".into()],
            keys: vec!["/skydns/switch/abc".into()],
            address: "172.17.0.2".into(),
        };
        let json = String::from_utf8(entry.to_bytes().unwrap()).unwrap();
        assert_eq!(
            json,
            r#"{"Domains":["abc.switch"],"Keys":["/skydns/switch/abc"],"Addr":"172.17.0.2"}"#
        );
        assert_eq!(Entry::from_bytes(json.as_bytes()).unwrap(), entry);
    }

    #[test]
    fn envelope_carries_host() {
        let envelope = AddressEnvelope {
            host: "10.0.0.7".into(),
        };
        assert_eq!(
            serde_json::to_string(&envelope).unwrap(),
            r#"{"host":"10.0.0.7"}"#
        );
    }
}
