//! Edge records: the carriers of the closure pattern bits.

use serde::{Deserialize, Serialize};

use crate::topology::point::NodeId;

/// An undirected edge on one level, keyed in the level pool by its
/// canonical [`EdgeKey`](crate::topology::point::EdgeKey).
///
/// `pattern` says "bisect this edge in the current pass"; `add_pattern` is
/// the residual flag cleared wherever a regularly refined element places a
/// real mid-node, which is what green classification and mark restriction
/// react to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub pattern: bool,
    pub add_pattern: bool,
    /// Mid-node on the next finer level, if the edge is bisected.
    pub mid: Option<NodeId>,
    /// Whether the edge lies on the domain boundary. Both end nodes being
    /// boundary nodes is not enough (interior diagonals), so the flag is
    /// carried explicitly and mid-nodes inherit it.
    pub boundary: bool,
    /// Number of elements on this level containing the edge.
    pub(crate) elem_count: u32,
}

impl Default for Edge {
    fn default() -> Self {
        Edge {
            pattern: false,
            add_pattern: true,
            mid: None,
            boundary: false,
            elem_count: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_edge_state() {
        let e = Edge::default();
        assert!(!e.pattern);
        assert!(e.add_pattern);
        assert!(e.mid.is_none());
        assert!(!e.boundary);
        assert_eq!(e.elem_count, 0);
    }
}
