//! Combinatorial green families for pyramids, prisms and hexahedra.
//!
//! These shapes carry no closure rule tables for irregular edge patterns.
//! Instead the element surface is partitioned into facets compatible with
//! the refinement on each side (sub-quads and sub-triangles over the side
//! corners, edge mids and face node), and every facet is coned to the
//! center node: quad facets become pyramid sons, triangle facets become
//! tetrahedron sons.
//!
//! Facet splits are canonical in the mesh nodes rather than in the local
//! side numbering, so the two sharers of a side derive the same sub-faces
//! independently. The one free choice, the diagonal of a triangle side
//! with two mids, follows the side-pattern flip bit negotiated during
//! closure. Triangle splits use the same case analysis as the generated
//! tetrahedron rules, which keeps mixed tetrahedron/pyramid interfaces
//! conforming.

use smallvec::{SmallVec, smallvec};

use crate::topology::point::NodeId;
use crate::topology::shape::ElementShape;

/// One surface facet, 3 or 4 context slots in cycle order.
type Facet = SmallVec<[u8; 4]>;

/// Surface facets plus center cone for a caseful green element.
///
/// `slots` is the element context: a mid slot being occupied means the
/// corresponding edge is really bisected. Son corners are context slots;
/// the caller resolves them to nodes and fixes orientation.
pub(crate) fn green_sons(
    shape: ElementShape,
    side_pattern: u8,
    slots: &[Option<NodeId>],
) -> Vec<(ElementShape, SmallVec<[u8; 8]>)> {
    debug_assert!(matches!(
        shape,
        ElementShape::Pyramid | ElementShape::Prism | ElementShape::Hexahedron
    ));
    let center = shape.center_slot() as u8;
    let mut sons = Vec::new();
    for side in 0..shape.side_count() {
        let facets = if shape.side_is_quad(side) {
            quad_facets(shape, side, side_pattern, slots)
        } else {
            tri_facets(shape, side, side_pattern, slots)
        };
        for facet in facets {
            let son_shape = if facet.len() == 3 {
                ElementShape::Tetrahedron
            } else {
                ElementShape::Pyramid
            };
            let mut corners: SmallVec<[u8; 8]> = SmallVec::from_slice(&facet);
            corners.push(center);
            sons.push((son_shape, corners));
        }
    }
    sons
}

fn quad_facets(
    shape: ElementShape,
    side: usize,
    side_pattern: u8,
    slots: &[Option<NodeId>],
) -> Vec<Facet> {
    let corners = shape.corners_of_side(side);
    let edges = shape.edges_of_side(side);
    let c = |j: usize| corners[j % 4];
    let m = |j: usize| shape.edge_slot(edges[j % 4] as usize) as u8;
    let has_mid = |j: usize| slots[m(j) as usize].is_some();

    if side_pattern & (1 << side) != 0 {
        // A face node implies the full cross split of the side.
        let face = shape.side_slot(side) as u8;
        debug_assert!((0..4).all(has_mid), "face node on a partially split side");
        return (0..4)
            .map(|j| smallvec![c(j), m(j), face, m(j + 3)])
            .collect();
    }

    let marked: Vec<usize> = (0..4).filter(|&j| has_mid(j)).collect();
    match marked.as_slice() {
        [] => vec![smallvec![c(0), c(1), c(2), c(3)]],
        [j] => {
            let j = *j;
            vec![
                smallvec![m(j), c(j + 1), c(j + 2)],
                smallvec![m(j), c(j + 2), c(j + 3)],
                smallvec![m(j), c(j + 3), c(j)],
            ]
        }
        [a, b] if b - a == 2 => {
            // Opposite mids: two half quads.
            let j = *a;
            vec![
                smallvec![m(j), c(j + 1), c(j + 2), m(j + 2)],
                smallvec![m(j + 2), c(j + 3), c(j), m(j)],
            ]
        }
        [a, b] => {
            // Adjacent mids: cut the corner between them, fan the rest
            // from the diagonally opposite corner.
            let j = if *b == *a + 1 { *a } else { 3 };
            vec![
                smallvec![m(j), c(j + 1), m(j + 1)],
                smallvec![c(j + 3), c(j), m(j)],
                smallvec![c(j + 3), m(j), m(j + 1)],
                smallvec![c(j + 3), m(j + 1), c(j + 2)],
            ]
        }
        [a, b, c_] => {
            // Three mids: the unmarked edge position is the one missing
            // from {0, 1, 2, 3}.
            let d = 6 - (a + b + c_);
            vec![
                smallvec![m(d + 1), c(d + 2), m(d + 2)],
                smallvec![m(d + 2), c(d + 3), m(d + 3)],
                smallvec![m(d + 1), m(d + 2), m(d + 3)],
                smallvec![c(d + 1), m(d + 1), m(d + 3), c(d)],
            ]
        }
        _ => {
            // Four mids without a face node: corner quads would need the
            // face point, so cut all four corners and keep the middle.
            let mut out: Vec<Facet> = (0..4).map(|j| smallvec![m(j + 3), c(j), m(j)]).collect();
            out.push(smallvec![m(0), m(1), m(2), m(3)]);
            out
        }
    }
}

fn tri_facets(
    shape: ElementShape,
    side: usize,
    side_pattern: u8,
    slots: &[Option<NodeId>],
) -> Vec<Facet> {
    let corners = shape.corners_of_side(side);
    let edges = shape.edges_of_side(side);
    let c = |j: usize| corners[j % 3];
    let m = |j: usize| shape.edge_slot(edges[j % 3] as usize) as u8;
    let has_mid = |j: usize| slots[m(j) as usize].is_some();
    let flipped = side_pattern & (1 << side) != 0;

    let marked: Vec<usize> = (0..3).filter(|&j| has_mid(j)).collect();
    match marked.as_slice() {
        [] => vec![smallvec![c(0), c(1), c(2)]],
        [j] => {
            let j = *j;
            vec![
                smallvec![c(j), m(j), c(j + 2)],
                smallvec![m(j), c(j + 1), c(j + 2)],
            ]
        }
        [a, b] => {
            // Shared corner position: edges j and j+1 meet at corner j+1.
            let s = if *b == *a + 1 { *b } else { 0 };
            let (x, y, z) = (c(s), c(s + 1), c(s + 2));
            let (m_xy, m_zx) = (m(s), m(s + 2));
            if flipped {
                vec![
                    smallvec![x, m_xy, m_zx],
                    smallvec![m_xy, y, m_zx],
                    smallvec![y, z, m_zx],
                ]
            } else {
                vec![
                    smallvec![x, m_xy, m_zx],
                    smallvec![m_xy, y, z],
                    smallvec![m_xy, z, m_zx],
                ]
            }
        }
        _ => vec![
            smallvec![c(0), m(0), m(2)],
            smallvec![c(1), m(1), m(0)],
            smallvec![c(2), m(2), m(1)],
            smallvec![m(0), m(1), m(2)],
        ],
    }
}
