//! Strong, zero-cost handles for grid entities.
//!
//! Every node and element in a multigrid is addressed by an opaque,
//! non-zero identifier. Handles replace the parent/child/neighbor pointer
//! graphs of classical grid managers: ownership lives in the per-level
//! pools, handles are plain indices with no destructor obligation.
//!
//! This module provides:
//! - Transparent `NodeId` / `ElemId` newtypes around `NonZeroU64` for
//!   memory layout guarantees.
//! - `EdgeKey` / `FaceKey`, the canonical unordered node tuples used to
//!   share mid-nodes and face nodes between neighboring elements.

use std::{fmt, num::NonZeroU64};

/// Handle of a geometric node (corner, mid, side or center point).
///
/// # Memory layout
/// `repr(transparent)`: same ABI and alignment as `NonZeroU64`, so
/// `Option<NodeId>` is still eight bytes.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct NodeId(NonZeroU64);

/// Handle of an element on some level of the multigrid.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[repr(transparent)]
pub struct ElemId(NonZeroU64);

impl NodeId {
    /// Creates a `NodeId` from a raw `u64`.
    ///
    /// # Panics
    ///
    /// Panics if `raw == 0`; zero is reserved as the invalid value.
    #[inline]
    pub fn new(raw: u64) -> Self {
        NodeId(NonZeroU64::new(raw).expect("NodeId must be non-zero"))
    }

    /// Returns the raw `u64` behind this handle.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl ElemId {
    /// Creates an `ElemId` from a raw `u64`.
    ///
    /// # Panics
    ///
    /// Panics if `raw == 0`; zero is reserved as the invalid value.
    #[inline]
    pub fn new(raw: u64) -> Self {
        ElemId(NonZeroU64::new(raw).expect("ElemId must be non-zero"))
    }

    /// Returns the raw `u64` behind this handle.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeId").field(&self.get()).finish()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

impl fmt::Debug for ElemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ElemId").field(&self.get()).finish()
    }
}

impl fmt::Display for ElemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Canonical key of an undirected edge between two corner nodes.
///
/// The two endpoints are stored sorted, so the key is identical no matter
/// which of the incident elements constructs it. This is what guarantees
/// at most one mid-node per physical edge.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, serde::Serialize, serde::Deserialize,
)]
pub struct EdgeKey(NodeId, NodeId);

impl EdgeKey {
    /// Builds the canonical key for the edge `{a, b}`.
    #[inline]
    pub fn new(a: NodeId, b: NodeId) -> Self {
        if a <= b { EdgeKey(a, b) } else { EdgeKey(b, a) }
    }

    /// Lower endpoint.
    #[inline]
    pub fn lo(self) -> NodeId {
        self.0
    }

    /// Upper endpoint.
    #[inline]
    pub fn hi(self) -> NodeId {
        self.1
    }

    /// Whether `n` is one of the two endpoints.
    #[inline]
    pub fn contains(self, n: NodeId) -> bool {
        self.0 == n || self.1 == n
    }
}

/// Canonical key of a quadrilateral face, given by its four corner nodes
/// in sorted order. Face nodes (3-D) are shared through this key.
#[derive(
    Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, serde::Serialize, serde::Deserialize,
)]
pub struct FaceKey([NodeId; 4]);

impl FaceKey {
    /// Builds the canonical key for the face with the given corners.
    #[inline]
    pub fn new(mut corners: [NodeId; 4]) -> Self {
        corners.sort_unstable();
        FaceKey(corners)
    }

    /// The sorted corner nodes.
    #[inline]
    pub fn corners(&self) -> &[NodeId; 4] {
        &self.0
    }
}
