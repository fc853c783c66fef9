use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Failure modes surfaced by a coordination store.
///
/// `NodeExists`, `NoNode`, and `BadVersion` are distinct, expected outcomes
/// that callers branch on; `Unavailable` covers transient I/O and
/// availability problems.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("node already exists: {path}")]
    NodeExists { path: String },
    #[error("no node: {path}")]
    NoNode { path: String },
    #[error("version mismatch at {path}: expected {expected}, found {found}")]
    BadVersion {
        path: String,
        expected: u64,
        found: u64,
    },
    #[error("coordination store unavailable: {reason}")]
    Unavailable { reason: String },
}

/// Payload plus the version the store assigned on its last successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    pub bytes: Vec<u8>,
    pub version: u64,
}

/// Contract consumed from the external hierarchical, versioned key-value
/// service. Paths are slash-separated strings; all calls block until the
/// store answers, for however long that takes.
pub trait CoordinationStore {
    /// Creates `path`; fails with [`StoreError::NodeExists`] if present.
    fn create(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Reads `path`; fails with [`StoreError::NoNode`] if absent.
    fn read(&self, path: &str) -> Result<Versioned, StoreError>;

    /// Writes `path` only if its current version equals `expected_version`;
    /// fails with [`StoreError::BadVersion`] otherwise.
    fn compare_and_set(
        &self,
        path: &str,
        bytes: &[u8],
        expected_version: u64,
    ) -> Result<(), StoreError>;

    /// Removes `path`; fails with [`StoreError::NoNode`] if absent.
    fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Names of the direct children under `path`.
    fn list_children(&self, path: &str) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Clone)]
struct Node {
    bytes: Vec<u8>,
    version: u64,
}

/// Deterministic in-process store with the same observable semantics as the
/// external service: versions start at zero on create and bump on every
/// successful conditional write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: Mutex<HashMap<String, Node>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> Result<MutexGuard<'_, HashMap<String, Node>>, StoreError> {
        self.nodes.lock().map_err(|_| StoreError::Unavailable {
            reason: "store mutex poisoned".to_string(),
        })
    }
}

impl CoordinationStore for MemoryStore {
    fn create(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let mut nodes = self.guard()?;
        if nodes.contains_key(path) {
            return Err(StoreError::NodeExists {
                path: path.to_string(),
            });
        }
        nodes.insert(
            path.to_string(),
            Node {
                bytes: bytes.to_vec(),
                version: 0,
            },
        );
        Ok(())
    }

    fn read(&self, path: &str) -> Result<Versioned, StoreError> {
        let nodes = self.guard()?;
        let node = nodes.get(path).ok_or_else(|| StoreError::NoNode {
            path: path.to_string(),
        })?;
        Ok(Versioned {
            bytes: node.bytes.clone(),
            version: node.version,
        })
    }

    fn compare_and_set(
        &self,
        path: &str,
        bytes: &[u8],
        expected_version: u64,
    ) -> Result<(), StoreError> {
        let mut nodes = self.guard()?;
        let node = nodes.get_mut(path).ok_or_else(|| StoreError::NoNode {
            path: path.to_string(),
        })?;
        if node.version != expected_version {
            return Err(StoreError::BadVersion {
                path: path.to_string(),
                expected: expected_version,
                found: node.version,
            });
        }
        node.bytes = bytes.to_vec();
        node.version += 1;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), StoreError> {
        let mut nodes = self.guard()?;
        if nodes.remove(path).is_none() {
            return Err(StoreError::NoNode {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn list_children(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let nodes = self.guard()?;
        let prefix = if path.ends_with('/') {
            path.to_string()
        } else {
            format!("{path}/")
        };
        let mut names: Vec<String> = nodes
            .keys()
            .filter_map(|key| key.strip_prefix(&prefix))
            .filter(|rest| !rest.is_empty() && !rest.contains('/'))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }
}
