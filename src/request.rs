//! Read request descriptors.

use crate::node_id::NodeId;
use serde::{Deserialize, Serialize};

/// Maximum age of a cached server value the poller accepts, in milliseconds.
pub const DEFAULT_MAX_AGE_MS: f64 = 2000.0;

/// Attribute id of the `Value` attribute.
pub const VALUE_ATTRIBUTE_ID: u32 = 13;

/// Which timestamps the server attaches to each result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampsToReturn {
    Source,
    Server,
    Both,
    Neither,
}

/// One node/attribute pair to read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadValueId {
    pub node_id: NodeId,
    pub attribute_id: u32,
}

impl From<NodeId> for ReadValueId {
    fn from(node_id: NodeId) -> Self {
        Self {
            node_id,
            attribute_id: VALUE_ATTRIBUTE_ID,
        }
    }
}

/// A read operation, built once and reused for every poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadRequest {
    /// Maximum acceptable cached-value age (ms)
    pub max_age: f64,
    /// Nodes to read, in result order
    pub nodes_to_read: Vec<ReadValueId>,
    /// Timestamp kinds requested per result
    pub timestamps_to_return: TimestampsToReturn,
}

impl ReadRequest {
    /// Number of results a complete response carries.
    pub fn len(&self) -> usize {
        self.nodes_to_read.len()
    }

    /// True when no nodes are requested.
    pub fn is_empty(&self) -> bool {
        self.nodes_to_read.is_empty()
    }

    /// Requested node ids in order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.nodes_to_read.iter().map(|r| &r.node_id)
    }
}

/// Build the polling request for `identifiers`: value attribute, max age
/// 2000 ms, both timestamps. Pure; the order of `identifiers` is kept.
pub fn build_request(identifiers: &[NodeId]) -> ReadRequest {
    ReadRequest {
        max_age: DEFAULT_MAX_AGE_MS,
        nodes_to_read: identifiers.iter().cloned().map(ReadValueId::from).collect(),
        timestamps_to_return: TimestampsToReturn::Both,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_defaults() {
        let req = build_request(&[NodeId::numeric(1, 2345)]);
        assert_eq!(req.max_age, 2000.0);
        assert_eq!(req.timestamps_to_return, TimestampsToReturn::Both);
        assert_eq!(req.len(), 1);
        assert_eq!(req.nodes_to_read[0].attribute_id, VALUE_ATTRIBUTE_ID);
    }

    #[test]
    fn test_build_request_is_idempotent_and_ordered() {
        let ids = vec![
            NodeId::string(2, "b"),
            NodeId::numeric(1, 7),
            NodeId::string(2, "a"),
        ];
        let first = build_request(&ids);
        let second = build_request(&ids);
        assert_eq!(first, second);
        assert_eq!(first.node_ids().cloned().collect::<Vec<_>>(), ids);
    }
}
