//! Refinement classes, marks and node kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Quality class of an element's (requested or applied) refinement.
///
/// The ordering is meaningful: coarsening gates and the copy computation
/// compare classes, with `Red` the strongest treatment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum ElementClass {
    /// Untouched by the current pass.
    #[default]
    None,
    /// Copied one level down unchanged, for numerical buffering.
    Yellow,
    /// Irregular transition refinement closing hanging nodes.
    Green,
    /// Regular refinement by a complete subdivision rule.
    Red,
}

/// Identifier of a subdivision rule within one shape's rule set.
///
/// `MarkId::NONE` (rule 0) is the empty treatment: every shape's rule 0 is
/// "no refinement". Rule ids are only meaningful together with a shape.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct MarkId(pub u16);

impl MarkId {
    /// The empty treatment.
    pub const NONE: MarkId = MarkId(0);

    /// Whether this mark requests any refinement at all.
    #[inline]
    pub fn is_some(self) -> bool {
        self != MarkId::NONE
    }
}

impl fmt::Display for MarkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rule#{}", self.0)
    }
}

/// Kind of a geometric node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Vertex of the coarse mesh or son of a coarser corner node.
    Corner,
    /// Edge midpoint, created when the edge is bisected.
    Mid,
    /// Center of a quadrilateral face (3-D only).
    Side,
    /// Element interior node.
    Center,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_ordering() {
        assert!(ElementClass::None < ElementClass::Yellow);
        assert!(ElementClass::Yellow < ElementClass::Green);
        assert!(ElementClass::Green < ElementClass::Red);
    }

    #[test]
    fn none_mark_is_empty() {
        assert!(!MarkId::NONE.is_some());
        assert!(MarkId(3).is_some());
        assert_eq!(MarkId::default(), MarkId::NONE);
    }
}
