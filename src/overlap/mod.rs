//! Partition overlay: which elements are ghost copies of a remote rank.
//!
//! A distributed mesh keeps a halo of remote elements around each
//! partition. A ghost's family is rebuilt by its owning rank, so side
//! reconciliation against a ghost tolerates a partial son list instead of
//! failing the pass. The engine asks membership questions and announces
//! what it creates; ownership, transport and id unification across ranks
//! stay with the caller.

use crate::topology::point::{ElemId, NodeId};

/// Ghost-membership oracle consulted during side reconciliation, plus
/// creation events so a distributed caller can unify ids after the pass.
pub trait PartitionOverlay {
    /// Whether `elem` is a copy owned by another rank.
    fn is_ghost(&self, elem: ElemId) -> bool;

    /// A node came into existence on `level` during this pass.
    fn node_created(&self, _level: usize, _node: NodeId) {}

    /// An element came into existence on `level` during this pass.
    fn element_created(&self, _level: usize, _elem: ElemId) {}
}

/// Serial grids: nothing is a ghost.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOverlay;

impl PartitionOverlay for NoOverlay {
    #[inline]
    fn is_ghost(&self, _elem: ElemId) -> bool {
        false
    }
}
