//! Shape-level topology: handles, reference connectivity and classes.
//!
//! Everything here is instance-independent: handle newtypes and canonical
//! keys, the fixed shape set with its static adjacency tables, and the
//! refinement classes of the per-element state machine.

pub mod class;
pub mod point;
pub mod shape;

pub use class::{ElementClass, MarkId, NodeKind};
pub use point::{EdgeKey, ElemId, FaceKey, NodeId};
pub use shape::ElementShape;
