//! Geometric nodes and their coarse-level back-references.

use serde::{Deserialize, Serialize};

use crate::topology::class::NodeKind;
use crate::topology::point::{EdgeKey, ElemId, FaceKey, NodeId};

/// Back-reference from a node to the coarser-level entity that spawned it.
/// Lookup only, never ownership: the coarse entity does not keep the node
/// alive and the node does not keep the entity alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeFather {
    /// Son of a coarser corner node.
    Corner(NodeId),
    /// Midpoint of a coarser edge.
    Mid(EdgeKey),
    /// Center of a coarser quadrilateral face.
    Side(FaceKey),
    /// Center of a coarser element.
    Center(ElemId),
}

/// A geometric point on one level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Cartesian position; the z component is zero on 2-D grids.
    pub pos: [f64; 3],
    /// Where this node came from; `None` for coarse-mesh vertices.
    pub father: Option<NodeFather>,
    /// Son node on the next finer level (corner nodes only).
    pub son: Option<NodeId>,
    /// Whether the node lies on the domain boundary.
    pub boundary: bool,
    /// Number of elements on this node's level using it as a corner.
    pub(crate) ref_count: u32,
}

impl Node {
    /// A fresh node with no incident elements yet.
    pub fn new(kind: NodeKind, pos: [f64; 3], father: Option<NodeFather>, boundary: bool) -> Self {
        Node {
            kind,
            pos,
            father,
            son: None,
            boundary,
            ref_count: 0,
        }
    }
}

/// Midpoint of two positions.
#[inline]
pub fn midpoint(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        0.5 * (a[0] + b[0]),
        0.5 * (a[1] + b[1]),
        0.5 * (a[2] + b[2]),
    ]
}

/// Arithmetic mean of a corner set (face and center nodes).
#[inline]
pub fn centroid(points: &[[f64; 3]]) -> [f64; 3] {
    let mut c = [0.0; 3];
    for p in points {
        c[0] += p[0];
        c[1] += p[1];
        c[2] += p[2];
    }
    let n = points.len() as f64;
    [c[0] / n, c[1] / n, c[2] / n]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_and_centroid() {
        let a = [0.0, 0.0, 0.0];
        let b = [2.0, 4.0, 6.0];
        assert_eq!(midpoint(a, b), [1.0, 2.0, 3.0]);
        assert_eq!(centroid(&[a, b]), [1.0, 2.0, 3.0]);
        assert_eq!(
            centroid(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]),
            [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]
        );
    }

    #[test]
    fn new_node_is_unreferenced() {
        let n = Node::new(NodeKind::Corner, [0.0; 3], None, true);
        assert_eq!(n.ref_count, 0);
        assert!(n.son.is_none());
        assert!(n.boundary);
    }
}
