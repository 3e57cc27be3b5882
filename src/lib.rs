#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-refine
//!
//! mesh-refine is a Rust library for adaptive red/green refinement of
//! unstructured 2-D and 3-D grids. It keeps a hierarchy of grid levels in
//! which every element knows its father and sons, refines marked regions
//! into regular (red) son families, closes the surrounding region with
//! irregular (green) transition families instead of hanging nodes, and
//! takes refinement back out again when element families agree to coarsen.
//!
//! ## Features
//! - Multigrid hierarchy with per-level node, edge and element pools
//! - Static refinement-rule tables for triangles, quadrilaterals,
//!   tetrahedra, pyramids, prisms and hexahedra
//! - Closure by fixpoint negotiation: bisection patterns propagate across
//!   sides until every element has a consistent treatment
//! - Green transition families, rebuilt case by case for the shapes the
//!   rule tables do not cover
//! - Mark restriction so requests on green or copied sons reach an
//!   element that may refine in place
//! - Family-wise coarsening with veto by finer levels
//! - Pluggable boundary projection and ghost-overlay hooks
//!
//! ## Determinism
//!
//! Pools hand out monotone ids and every pass walks levels in sorted id
//! order, so identical mark sequences produce identical hierarchies.
//! Tests rely on this for exact element and node counts.
//!
//! ## Usage
//! Add `mesh-refine` as a dependency in your `Cargo.toml` and enable
//! features as needed:
//!
//! ```toml
//! [dependencies]
//! mesh-refine = "0.3.0"
//! # Optional features:
//! # features = ["check-invariants"]
//! ```
//!
//! The `check-invariants` feature turns on full hierarchy validation in
//! debug builds; `strict-invariants` extends it to release builds.
//!
//! ## Entry points
//! Build a coarse grid with [`grid::multigrid::MultiGrid::build_2d`] or
//! [`grid::multigrid::MultiGrid::build_3d`], place requests with
//! [`refine::mark_refine`] and [`refine::mark_coarsen`], and run
//! [`refine::refine_multigrid`] between solves. One pass settles every
//! level and reports what it did in a [`refine::PassReport`].

// Re-export our major subsystems:
pub mod debug_invariants;
pub mod geometry;
pub mod grid;
pub mod mesh_error;
pub mod overlap;
pub mod refine;
pub mod rules;
pub mod topology;

pub use debug_invariants::DebugInvariants;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::geometry::{BoundaryGeometry, NoGeometry};
    pub use crate::grid::edge::Edge;
    pub use crate::grid::element::Element;
    pub use crate::grid::level::Level;
    pub use crate::grid::multigrid::MultiGrid;
    pub use crate::grid::node::{Node, NodeFather};
    pub use crate::mesh_error::RefineError;
    pub use crate::overlap::{NoOverlay, PartitionOverlay};
    pub use crate::refine::{
        clear_mark, mark_coarsen, mark_refine, refine_multigrid, refine_multigrid_with, CopyMode,
        PassReport, RefineOptions,
    };
    pub use crate::rules::{RuleSet, COPY_MARK, FULL_MARK};
    pub use crate::topology::class::{ElementClass, MarkId, NodeKind};
    pub use crate::topology::point::{EdgeKey, ElemId, FaceKey, NodeId};
    pub use crate::topology::shape::ElementShape;
}
