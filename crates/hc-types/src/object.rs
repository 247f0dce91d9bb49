//! Object identity: keys, metadata, and owner references.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Identifies one namespaced resource. The wire encoding is
/// `"<namespace>/<name>"`, reversible by a single split on the first `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Parse a `"<namespace>/<name>"` key. Both parts must be non-empty.
    pub fn parse(key: &str) -> Result<Self, InvalidKey> {
        match key.split_once('/') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            _ => Err(InvalidKey(key.to_string())),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Error for keys that do not decode into a namespace and a name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid resource key '{0}'")]
pub struct InvalidKey(pub String);

/// Common metadata carried by every resource.
///
/// `uid` and `creation_timestamp` are assigned by the storage backend when
/// the object is first persisted; client-built objects leave them unset so
/// that desired-state construction stays deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub name: String,
    pub namespace: String,

    /// Backend-assigned unique ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<chrono::DateTime<chrono::Utc>>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            uid: None,
            creation_timestamp: None,
            labels: HashMap::new(),
            owner_references: Vec::new(),
        }
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace.clone(), self.name.clone())
    }

    /// The controlling owner reference, if any.
    pub fn controller_ref(&self) -> Option<&OwnerReference> {
        self.owner_references.iter().find(|r| r.controller)
    }

    /// Whether this object is controlled by `owner`. UIDs are compared when
    /// both sides carry one; otherwise kind and name decide.
    pub fn controlled_by(&self, owner_kind: &str, owner: &ObjectMeta) -> bool {
        match self.controller_ref() {
            Some(reference) => match (reference.uid, owner.uid) {
                (Some(child_uid), Some(owner_uid)) => child_uid == owner_uid,
                _ => reference.kind == owner_kind && reference.name == owner.name,
            },
            None => false,
        }
    }
}

/// Immutable back-pointer from a derived object to the resource that
/// created it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<Uuid>,

    /// True for the single managing owner.
    pub controller: bool,
}

impl OwnerReference {
    /// A controlling reference to `owner`.
    pub fn controller(kind: impl Into<String>, owner: &ObjectMeta) -> Self {
        Self {
            kind: kind.into(),
            name: owner.name.clone(),
            uid: owner.uid,
            controller: true,
        }
    }
}
