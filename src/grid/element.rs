//! Element records and the per-element refinement state machine.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::topology::class::{ElementClass, MarkId};
use crate::topology::point::{EdgeKey, ElemId, NodeId};
use crate::topology::shape::ElementShape;

/// An element on one level.
///
/// Side/edge adjacency is derived from the shape tables, so the record
/// only stores corner handles and one neighbor per side. `mark` is the
/// *requested* next-level treatment, `refine` the treatment already
/// applied (what produced the current children); the driver rebuilds an
/// element exactly when the two disagree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Element {
    pub shape: ElementShape,
    pub corners: SmallVec<[NodeId; 8]>,
    /// One entry per side; `None` at a domain boundary or at the edge of
    /// the refined region.
    pub neighbors: SmallVec<[Option<ElemId>; 6]>,
    /// Bitmask of sides lying on the domain boundary.
    pub boundary_sides: u8,
    pub father: Option<ElemId>,
    pub children: SmallVec<[ElemId; 8]>,
    /// Quality class of this element itself.
    pub class: ElementClass,
    /// Requested treatment.
    pub mark: MarkId,
    pub mark_class: ElementClass,
    /// Applied treatment.
    pub refine: MarkId,
    pub refine_class: ElementClass,
    pub coarsen: bool,
    /// Closure scratch: set while the pass computes this element, cleared
    /// on green elements whose rebuild turned out unnecessary.
    pub used: bool,
    /// Closure scratch (3-D): one bit per side, face node present or
    /// tri-face diagonal flipped.
    pub side_pattern: u8,
    /// Side pattern the current children were built from. A green family
    /// is stale when this disagrees with `side_pattern` even if the node
    /// set is unchanged (a flipped diagonal moves no nodes).
    pub refine_side_pattern: u8,
}

impl Element {
    /// A fresh element with no connectivity yet.
    pub fn new(shape: ElementShape, corners: SmallVec<[NodeId; 8]>) -> Self {
        debug_assert_eq!(corners.len(), shape.corner_count());
        let neighbors = SmallVec::from_elem(None, shape.side_count());
        Element {
            shape,
            corners,
            neighbors,
            boundary_sides: 0,
            father: None,
            children: SmallVec::new(),
            class: ElementClass::None,
            mark: MarkId::NONE,
            mark_class: ElementClass::None,
            refine: MarkId::NONE,
            refine_class: ElementClass::None,
            coarsen: false,
            used: false,
            side_pattern: 0,
            refine_side_pattern: 0,
        }
    }

    /// The two corner nodes of local edge `edge`.
    #[inline]
    pub fn edge_nodes(&self, edge: usize) -> (NodeId, NodeId) {
        let [a, b] = self.shape.corner_of_edge(edge);
        (self.corners[a as usize], self.corners[b as usize])
    }

    /// Canonical key of local edge `edge`.
    #[inline]
    pub fn edge_key(&self, edge: usize) -> EdgeKey {
        let (a, b) = self.edge_nodes(edge);
        EdgeKey::new(a, b)
    }

    /// Corner nodes of local side `side`, in side order.
    pub fn side_nodes(&self, side: usize) -> SmallVec<[NodeId; 4]> {
        self.shape
            .corners_of_side(side)
            .iter()
            .map(|&c| self.corners[c as usize])
            .collect()
    }

    /// Whether side `side` lies on the domain boundary.
    #[inline]
    pub fn side_on_boundary(&self, side: usize) -> bool {
        self.boundary_sides & (1 << side) != 0
    }

    /// Whether the requested treatment differs from the applied one.
    #[inline]
    pub fn treatment_changes(&self) -> bool {
        self.refine != self.mark || self.refine_class != self.mark_class
    }

    /// Whether this shape is refined by the combinatorial green path
    /// rather than by a rule when it turns green.
    #[inline]
    pub fn green_by_cases(&self) -> bool {
        matches!(
            self.shape,
            ElementShape::Pyramid | ElementShape::Prism | ElementShape::Hexahedron
        )
    }

    /// The local side across which `other` is the neighbor, if any.
    pub fn side_of_neighbor(&self, other: ElemId) -> Option<usize> {
        self.neighbors.iter().position(|&n| n == Some(other))
    }
}
