//! Node directory: resolves a signer's id to its network location.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{AggregatorError, Result};
use crate::types::{NodeId, NodeIdentity};

/// Lookup of signer addresses. Consulted on every call; the aggregator never caches it.
pub trait NodeDirectory: Send + Sync {
    fn lookup(&self, id: &NodeId) -> Result<NodeIdentity>;
}

/// Fixed directory built at startup, either in code or from a JSON node list.
#[derive(Debug, Clone, Default)]
pub struct StaticNodeDirectory {
    nodes: HashMap<NodeId, NodeIdentity>,
}

impl StaticNodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a node entry.
    pub fn with_node(mut self, id: impl Into<NodeId>, host: impl Into<String>, port: u16) -> Self {
        let id = id.into();
        self.nodes.insert(id.clone(), NodeIdentity { id, host: host.into(), port });
        self
    }

    pub fn from_nodes(nodes: impl IntoIterator<Item = NodeIdentity>) -> Result<Self> {
        let mut directory = Self::new();
        for node in nodes {
            if directory.nodes.contains_key(&node.id) {
                return Err(AggregatorError::DirectoryError(format!(
                    "Duplicate node id {} in directory",
                    node.id
                )));
            }
            directory.nodes.insert(node.id.clone(), node);
        }
        Ok(directory)
    }

    /// Loads `[{"id": "1", "host": "127.0.0.1", "port": 5001}, ...]`.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            AggregatorError::DirectoryError(format!("Cannot read {}: {e}", path.display()))
        })?;
        let nodes: Vec<NodeIdentity> = serde_json::from_str(&raw)?;
        let directory = Self::from_nodes(nodes)?;
        tracing::debug!(path = %path.display(), nodes = directory.len(), "Loaded node directory");
        Ok(directory)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeDirectory for StaticNodeDirectory {
    fn lookup(&self, id: &NodeId) -> Result<NodeIdentity> {
        self.nodes
            .get(id)
            .cloned()
            .ok_or_else(|| AggregatorError::UnknownNode(id.clone()))
    }
}
