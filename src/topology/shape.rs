//! Element shapes and their reference connectivity tables.
//!
//! Every element is one of six fixed polytope shapes. All adjacency that
//! does not depend on the concrete instance (which corners bound an edge,
//! which edges bound a side, which sides meet at an edge) is static data
//! derived from the reference shape, so element records only store corner
//! handles and per-side neighbors.
//!
//! Edge numbering for the tetrahedron follows the classical grid-manager
//! convention: edges 0..2 bound side 0, and the per-side edge masks are
//! `0x07, 0x32, 0x2C, 0x19`. The closure propagator's tri-section table is
//! indexed with patterns reduced by exactly these masks.

use serde::{Deserialize, Serialize};

/// The fixed shape set: 2-D triangles and quadrilaterals, 3-D tetrahedra,
/// pyramids, prisms and hexahedra.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ElementShape {
    Triangle,
    Quadrilateral,
    Tetrahedron,
    Pyramid,
    Prism,
    Hexahedron,
}

/// Corner pairs per edge, indexed by shape (see `corner_of_edge`).
const TRI_EDGES: &[[u8; 2]] = &[[0, 1], [1, 2], [2, 0]];
const QUAD_EDGES: &[[u8; 2]] = &[[0, 1], [1, 2], [2, 3], [3, 0]];
const TET_EDGES: &[[u8; 2]] = &[[0, 1], [1, 2], [0, 2], [0, 3], [1, 3], [2, 3]];
const PYR_EDGES: &[[u8; 2]] = &[
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [0, 4],
    [1, 4],
    [2, 4],
    [3, 4],
];
const PRI_EDGES: &[[u8; 2]] = &[
    [0, 1],
    [1, 2],
    [2, 0],
    [0, 3],
    [1, 4],
    [2, 5],
    [3, 4],
    [4, 5],
    [5, 3],
];
const HEX_EDGES: &[[u8; 2]] = &[
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];

/// Corner lists per side. Side corner `j` and `j+1` (cyclic) are joined by
/// `edges_of_side(..)[j]`.
const TRI_SIDES: &[&[u8]] = &[&[0, 1], &[1, 2], &[2, 0]];
const QUAD_SIDES: &[&[u8]] = &[&[0, 1], &[1, 2], &[2, 3], &[3, 0]];
const TET_SIDES: &[&[u8]] = &[&[0, 1, 2], &[1, 2, 3], &[0, 2, 3], &[0, 1, 3]];
const PYR_SIDES: &[&[u8]] = &[
    &[0, 1, 2, 3],
    &[0, 1, 4],
    &[1, 2, 4],
    &[2, 3, 4],
    &[3, 0, 4],
];
const PRI_SIDES: &[&[u8]] = &[
    &[0, 1, 2],
    &[0, 1, 4, 3],
    &[1, 2, 5, 4],
    &[2, 0, 3, 5],
    &[3, 4, 5],
];
const HEX_SIDES: &[&[u8]] = &[
    &[0, 1, 2, 3],
    &[4, 5, 6, 7],
    &[0, 1, 5, 4],
    &[1, 2, 6, 5],
    &[2, 3, 7, 6],
    &[3, 0, 4, 7],
];

/// Edge lists per side, aligned with the side corner lists above.
const TRI_SIDE_EDGES: &[&[u8]] = &[&[0], &[1], &[2]];
const QUAD_SIDE_EDGES: &[&[u8]] = &[&[0], &[1], &[2], &[3]];
const TET_SIDE_EDGES: &[&[u8]] = &[&[0, 1, 2], &[1, 5, 4], &[2, 5, 3], &[0, 4, 3]];
const PYR_SIDE_EDGES: &[&[u8]] = &[
    &[0, 1, 2, 3],
    &[0, 5, 4],
    &[1, 6, 5],
    &[2, 7, 6],
    &[3, 4, 7],
];
const PRI_SIDE_EDGES: &[&[u8]] = &[
    &[0, 1, 2],
    &[0, 4, 6, 3],
    &[1, 5, 7, 4],
    &[2, 3, 8, 5],
    &[6, 7, 8],
];
const HEX_SIDE_EDGES: &[&[u8]] = &[
    &[0, 1, 2, 3],
    &[4, 5, 6, 7],
    &[0, 9, 4, 8],
    &[1, 10, 5, 9],
    &[2, 11, 6, 10],
    &[3, 8, 7, 11],
];

/// The (at most two) sides containing each edge.
const TRI_EDGE_SIDES: &[&[u8]] = &[&[0], &[1], &[2]];
const QUAD_EDGE_SIDES: &[&[u8]] = &[&[0], &[1], &[2], &[3]];
const TET_EDGE_SIDES: &[&[u8]] = &[&[0, 3], &[0, 1], &[0, 2], &[2, 3], &[1, 3], &[1, 2]];
const PYR_EDGE_SIDES: &[&[u8]] = &[
    &[0, 1],
    &[0, 2],
    &[0, 3],
    &[0, 4],
    &[1, 4],
    &[1, 2],
    &[2, 3],
    &[3, 4],
];
const PRI_EDGE_SIDES: &[&[u8]] = &[
    &[0, 1],
    &[0, 2],
    &[0, 3],
    &[1, 3],
    &[1, 2],
    &[2, 3],
    &[1, 4],
    &[2, 4],
    &[3, 4],
];
const HEX_EDGE_SIDES: &[&[u8]] = &[
    &[0, 2],
    &[0, 3],
    &[0, 4],
    &[0, 5],
    &[1, 2],
    &[1, 3],
    &[1, 4],
    &[1, 5],
    &[2, 5],
    &[2, 3],
    &[3, 4],
    &[4, 5],
];

impl ElementShape {
    /// Topological dimension of the shape.
    pub const fn dimension(self) -> u8 {
        match self {
            ElementShape::Triangle | ElementShape::Quadrilateral => 2,
            _ => 3,
        }
    }

    /// Number of corner nodes.
    pub const fn corner_count(self) -> usize {
        match self {
            ElementShape::Triangle => 3,
            ElementShape::Quadrilateral | ElementShape::Tetrahedron => 4,
            ElementShape::Pyramid => 5,
            ElementShape::Prism => 6,
            ElementShape::Hexahedron => 8,
        }
    }

    /// Number of edges.
    pub const fn edge_count(self) -> usize {
        match self {
            ElementShape::Triangle => 3,
            ElementShape::Quadrilateral => 4,
            ElementShape::Tetrahedron => 6,
            ElementShape::Pyramid => 8,
            ElementShape::Prism => 9,
            ElementShape::Hexahedron => 12,
        }
    }

    /// Number of sides (edges in 2-D, faces in 3-D).
    pub const fn side_count(self) -> usize {
        match self {
            ElementShape::Triangle => 3,
            ElementShape::Quadrilateral | ElementShape::Tetrahedron => 4,
            ElementShape::Pyramid | ElementShape::Prism => 5,
            ElementShape::Hexahedron => 6,
        }
    }

    /// The two corners bounding edge `edge`.
    pub fn corner_of_edge(self, edge: usize) -> [u8; 2] {
        self.edge_table()[edge]
    }

    /// The corners of side `side`, in cyclic order.
    pub fn corners_of_side(self, side: usize) -> &'static [u8] {
        self.side_table()[side]
    }

    /// The edges of side `side`; entry `j` joins side corners `j` and `j+1`.
    pub fn edges_of_side(self, side: usize) -> &'static [u8] {
        self.side_edge_table()[side]
    }

    /// The sides containing edge `edge` (one in 2-D, two in 3-D).
    pub fn sides_with_edge(self, edge: usize) -> &'static [u8] {
        self.edge_side_table()[edge]
    }

    /// The edge joining corners `a` and `b`, if any.
    pub fn edge_with_corners(self, a: u8, b: u8) -> Option<usize> {
        self.edge_table()
            .iter()
            .position(|&[x, y]| (x == a && y == b) || (x == b && y == a))
    }

    /// The side whose corner set equals `corners` (any order), if any.
    pub fn side_with_corners(self, corners: &[u8]) -> Option<usize> {
        (0..self.side_count()).find(|&s| {
            let sc = self.corners_of_side(s);
            sc.len() == corners.len() && corners.iter().all(|c| sc.contains(c))
        })
    }

    /// For edge `k` of side `side`, the other side sharing that edge (3-D).
    pub fn side_across_edge(self, side: usize, k: usize) -> usize {
        let edge = self.edges_of_side(side)[k] as usize;
        let sides = self.sides_with_edge(edge);
        if sides[0] as usize == side {
            sides[1] as usize
        } else {
            sides[0] as usize
        }
    }

    /// Bitmask over the element edges belonging to side `side`.
    pub fn side_edge_mask(self, side: usize) -> u16 {
        self.edges_of_side(side)
            .iter()
            .fold(0u16, |m, &e| m | (1 << e))
    }

    /// Whether side `side` is a quadrilateral face (may carry a face node).
    pub fn side_is_quad(self, side: usize) -> bool {
        self.corners_of_side(side).len() == 4
    }

    /// Context slot of the mid-node of edge `edge`.
    pub const fn edge_slot(self, edge: usize) -> usize {
        self.corner_count() + edge
    }

    /// Context slot of the face node of side `side` (3-D).
    pub const fn side_slot(self, side: usize) -> usize {
        self.corner_count() + self.edge_count() + side
    }

    /// Context slot of the center node.
    pub const fn center_slot(self) -> usize {
        self.corner_count() + self.edge_count() + self.side_count()
    }

    /// Number of context slots (corners, edge mids, face nodes, center).
    pub const fn context_size(self) -> usize {
        self.center_slot() + 1
    }

    fn edge_table(self) -> &'static [[u8; 2]] {
        match self {
            ElementShape::Triangle => TRI_EDGES,
            ElementShape::Quadrilateral => QUAD_EDGES,
            ElementShape::Tetrahedron => TET_EDGES,
            ElementShape::Pyramid => PYR_EDGES,
            ElementShape::Prism => PRI_EDGES,
            ElementShape::Hexahedron => HEX_EDGES,
        }
    }

    fn side_table(self) -> &'static [&'static [u8]] {
        match self {
            ElementShape::Triangle => TRI_SIDES,
            ElementShape::Quadrilateral => QUAD_SIDES,
            ElementShape::Tetrahedron => TET_SIDES,
            ElementShape::Pyramid => PYR_SIDES,
            ElementShape::Prism => PRI_SIDES,
            ElementShape::Hexahedron => HEX_SIDES,
        }
    }

    fn side_edge_table(self) -> &'static [&'static [u8]] {
        match self {
            ElementShape::Triangle => TRI_SIDE_EDGES,
            ElementShape::Quadrilateral => QUAD_SIDE_EDGES,
            ElementShape::Tetrahedron => TET_SIDE_EDGES,
            ElementShape::Pyramid => PYR_SIDE_EDGES,
            ElementShape::Prism => PRI_SIDE_EDGES,
            ElementShape::Hexahedron => HEX_SIDE_EDGES,
        }
    }

    fn edge_side_table(self) -> &'static [&'static [u8]] {
        match self {
            ElementShape::Triangle => TRI_EDGE_SIDES,
            ElementShape::Quadrilateral => QUAD_EDGE_SIDES,
            ElementShape::Tetrahedron => TET_EDGE_SIDES,
            ElementShape::Pyramid => PYR_EDGE_SIDES,
            ElementShape::Prism => PRI_EDGE_SIDES,
            ElementShape::Hexahedron => HEX_EDGE_SIDES,
        }
    }
}

/// All shapes, for table-driven tests and rule construction.
pub const ALL_SHAPES: [ElementShape; 6] = [
    ElementShape::Triangle,
    ElementShape::Quadrilateral,
    ElementShape::Tetrahedron,
    ElementShape::Pyramid,
    ElementShape::Prism,
    ElementShape::Hexahedron,
];
