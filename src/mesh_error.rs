//! RefineError: unified error type for the refinement engine.
//!
//! Every failure the engine can detect is a hard violation of the
//! topological invariants it exists to guarantee; there is no local
//! recovery. The driver surfaces the first error and the caller must not
//! continue the pass with a partially closed level.

use thiserror::Error;

use crate::topology::point::{EdgeKey, ElemId, FaceKey, NodeId};
use crate::topology::shape::ElementShape;

/// Unified error type for refinement operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RefineError {
    /// A derived bit pattern has no matching subdivision rule.
    #[error("no {shape:?} rule matches pattern {pattern:#b}")]
    RuleNotFound { shape: ElementShape, pattern: u32 },

    /// The reduced side pattern hit the ambiguous sentinel of the
    /// tri-section table: edges outside the side leaked into the lookup.
    #[error("inconsistent side pattern {pattern:#b} on side {side} of element {elem}")]
    InconsistentPattern { elem: ElemId, side: usize, pattern: u8 },

    /// Cross-element side stitching could not pair children one to one.
    #[error(
        "cannot reconcile side {side} of element {elem}: {left} sons against {right} on the neighbor"
    )]
    ReconciliationMismatch {
        elem: ElemId,
        side: usize,
        left: usize,
        right: usize,
    },

    /// Handle space exhausted while allocating a node or element.
    #[error("out of {entity} handles")]
    AllocationFailure { entity: &'static str },

    /// A constructed son family has a side that neither coincides with a
    /// sibling's side nor lies on a side of the father.
    #[error("{shape:?} family: side {side} of son {son} is neither interior nor on a father side")]
    SonTopology {
        shape: ElementShape,
        son: usize,
        side: usize,
    },

    /// A son references a context slot the pass did not populate.
    #[error("element {elem} has no context node in slot {slot}")]
    ContextSlot { elem: ElemId, slot: usize },

    /// The closure retry queue stopped making progress before draining.
    #[error("closure retry did not converge on level {level}: {pending} elements pending")]
    RetryNonConvergence { level: usize, pending: usize },

    /// An element handle is not present on its level.
    #[error("unknown element {0}")]
    UnknownElement(ElemId),

    /// A node handle is not present on its level.
    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    /// An edge record expected on a level is missing.
    #[error("missing edge ({}, {})", .0.lo(), .0.hi())]
    MissingEdge(EdgeKey),

    /// A mid-node expected on a bisected edge is missing.
    #[error("edge ({}, {}) has no mid-node", .0.lo(), .0.hi())]
    MissingMidNode(EdgeKey),

    /// A face node expected on a refined quadrilateral face is missing.
    #[error("face {0:?} has no face node")]
    MissingFaceNode(FaceKey),

    /// A level index beyond the current multigrid depth.
    #[error("no such level {0}")]
    NoSuchLevel(usize),

    /// A cell handed to the coarse assembly does not fit the grid dimension.
    #[error("cell {index} has shape {shape:?}, expected dimension {expected}")]
    DimensionMismatch {
        index: usize,
        shape: ElementShape,
        expected: u8,
    },

    /// A cell handed to the coarse assembly references a bad vertex.
    #[error("cell {index} references vertex {vertex} out of {count}")]
    InvalidVertex {
        index: usize,
        vertex: usize,
        count: usize,
    },

    /// A cell handed to the coarse assembly has the wrong corner count.
    #[error("cell {index} has {found} corners, its shape takes {expected}")]
    CornerCount {
        index: usize,
        expected: usize,
        found: usize,
    },

    /// More than two cells share one side.
    #[error("side {side} of element {elem} is shared by more than two elements")]
    NonManifoldSide { elem: ElemId, side: usize },

    /// Invariant check: a neighbor reference is not mutual.
    #[error("element {a} lists {b} as neighbor of side {side}, but not vice versa")]
    NonMutualNeighbor { a: ElemId, b: ElemId, side: usize },

    /// Invariant check: a child does not point back at its parent.
    #[error("element {child} is a child of {parent} but records a different father")]
    FatherMismatch { parent: ElemId, child: ElemId },

    /// Invariant check: an edge's element count does not match the pool.
    #[error("edge ({}, {}) records {recorded} incident elements, counted {counted}", key.lo(), key.hi())]
    EdgeRefCount {
        key: EdgeKey,
        recorded: u32,
        counted: u32,
    },
}
