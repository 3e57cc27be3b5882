//! Hand-written rule data.
//!
//! Context slots per shape (corners, then edge mids, then face nodes,
//! then center):
//!
//! | shape | corners | mids  | faces | center |
//! |-------|---------|-------|-------|--------|
//! | tri   | 0..3    | 3..6  |       | 6      |
//! | quad  | 0..4    | 4..8  |       | 8      |
//! | tet   | 0..4    | 4..10 | 10..14| 14     |
//! | pyr   | 0..5    | 5..13 | 13..18| 18     |
//! | prism | 0..6    | 6..15 | 15..20| 20     |
//! | hex   | 0..8    | 8..20 | 20..26| 26     |
//!
//! All sons are written with positive orientation in the reference
//! element. The 2-D sets are complete over every edge pattern; the 3-D
//! shapes carry the copy and the full regular template here, and the
//! tetrahedron closure set is generated separately.

use super::{Rule, build_rule};
use crate::topology::class::{ElementClass, MarkId};
use crate::topology::shape::ElementShape;

use ElementShape::*;

fn rule(
    shape: ElementShape,
    mark: u16,
    class: ElementClass,
    sons: &[(ElementShape, &[u8])],
) -> Rule {
    build_rule(shape, MarkId(mark), class, sons).expect("static rule table")
}

/// Rules 0.. for one shape, in mark order.
pub(super) fn base_rules(shape: ElementShape) -> Vec<Rule> {
    match shape {
        Triangle => triangle_rules(),
        Quadrilateral => quadrilateral_rules(),
        Tetrahedron => tetrahedron_base_rules(),
        Pyramid => pyramid_rules(),
        Prism => prism_rules(),
        Hexahedron => hexahedron_rules(),
    }
}

/// Mids 3, 4, 5 sit on edges (0,1), (1,2), (2,0). Bisections split
/// toward the opposite corner; trisections cut the leftover quad from
/// the mid of the cyclically later marked edge.
fn triangle_rules() -> Vec<Rule> {
    use ElementClass::*;
    vec![
        rule(Triangle, 0, None, &[]),
        rule(Triangle, 1, Yellow, &[(Triangle, &[0, 1, 2])]),
        rule(
            Triangle,
            2,
            Red,
            &[
                (Triangle, &[0, 3, 5]),
                (Triangle, &[1, 4, 3]),
                (Triangle, &[2, 5, 4]),
                (Triangle, &[3, 4, 5]),
            ],
        ),
        // One mid: 3, 4, 5.
        rule(
            Triangle,
            3,
            Green,
            &[(Triangle, &[0, 3, 2]), (Triangle, &[3, 1, 2])],
        ),
        rule(
            Triangle,
            4,
            Green,
            &[(Triangle, &[1, 4, 0]), (Triangle, &[4, 2, 0])],
        ),
        rule(
            Triangle,
            5,
            Green,
            &[(Triangle, &[2, 5, 1]), (Triangle, &[5, 0, 1])],
        ),
        // Two mids: edges {0,1}, {1,2}, {0,2}.
        rule(
            Triangle,
            6,
            Green,
            &[
                (Triangle, &[3, 1, 4]),
                (Triangle, &[0, 3, 4]),
                (Triangle, &[0, 4, 2]),
            ],
        ),
        rule(
            Triangle,
            7,
            Green,
            &[
                (Triangle, &[4, 2, 5]),
                (Triangle, &[1, 4, 5]),
                (Triangle, &[1, 5, 0]),
            ],
        ),
        rule(
            Triangle,
            8,
            Green,
            &[
                (Triangle, &[5, 0, 3]),
                (Triangle, &[3, 1, 5]),
                (Triangle, &[1, 2, 5]),
            ],
        ),
    ]
}

/// Mids 4..8 on edges (0,1), (1,2), (2,3), (3,0); slot 8 is the center.
/// Only the full subdivision places the center node.
fn quadrilateral_rules() -> Vec<Rule> {
    use ElementClass::*;
    vec![
        rule(Quadrilateral, 0, None, &[]),
        rule(Quadrilateral, 1, Yellow, &[(Quadrilateral, &[0, 1, 2, 3])]),
        rule(
            Quadrilateral,
            2,
            Red,
            &[
                (Quadrilateral, &[0, 4, 8, 7]),
                (Quadrilateral, &[1, 5, 8, 4]),
                (Quadrilateral, &[2, 6, 8, 5]),
                (Quadrilateral, &[3, 7, 8, 6]),
            ],
        ),
        // One mid: fan of three triangles.
        rule(
            Quadrilateral,
            3,
            Green,
            &[
                (Triangle, &[4, 1, 2]),
                (Triangle, &[4, 2, 3]),
                (Triangle, &[4, 3, 0]),
            ],
        ),
        rule(
            Quadrilateral,
            4,
            Green,
            &[
                (Triangle, &[5, 2, 3]),
                (Triangle, &[5, 3, 0]),
                (Triangle, &[5, 0, 1]),
            ],
        ),
        rule(
            Quadrilateral,
            5,
            Green,
            &[
                (Triangle, &[6, 3, 0]),
                (Triangle, &[6, 0, 1]),
                (Triangle, &[6, 1, 2]),
            ],
        ),
        rule(
            Quadrilateral,
            6,
            Green,
            &[
                (Triangle, &[7, 0, 1]),
                (Triangle, &[7, 1, 2]),
                (Triangle, &[7, 2, 3]),
            ],
        ),
        // Opposite mids: two quadrilaterals.
        rule(
            Quadrilateral,
            7,
            Green,
            &[
                (Quadrilateral, &[0, 4, 6, 3]),
                (Quadrilateral, &[4, 1, 2, 6]),
            ],
        ),
        rule(
            Quadrilateral,
            8,
            Green,
            &[
                (Quadrilateral, &[0, 1, 5, 7]),
                (Quadrilateral, &[7, 5, 2, 3]),
            ],
        ),
        // Adjacent mids: corner triangle plus triangle plus quadrilateral.
        rule(
            Quadrilateral,
            9,
            Green,
            &[
                (Triangle, &[4, 1, 5]),
                (Triangle, &[0, 4, 5]),
                (Quadrilateral, &[0, 5, 2, 3]),
            ],
        ),
        rule(
            Quadrilateral,
            10,
            Green,
            &[
                (Triangle, &[5, 2, 6]),
                (Triangle, &[1, 5, 6]),
                (Quadrilateral, &[1, 6, 3, 0]),
            ],
        ),
        rule(
            Quadrilateral,
            11,
            Green,
            &[
                (Triangle, &[6, 3, 7]),
                (Triangle, &[2, 6, 7]),
                (Quadrilateral, &[2, 7, 0, 1]),
            ],
        ),
        rule(
            Quadrilateral,
            12,
            Green,
            &[
                (Triangle, &[7, 0, 4]),
                (Triangle, &[3, 7, 4]),
                (Quadrilateral, &[3, 4, 1, 2]),
            ],
        ),
        // Three mids, named by the unmarked edge.
        rule(
            Quadrilateral,
            13,
            Green,
            &[
                (Triangle, &[4, 1, 5]),
                (Triangle, &[5, 2, 6]),
                (Triangle, &[4, 5, 6]),
                (Quadrilateral, &[0, 4, 6, 3]),
            ],
        ),
        rule(
            Quadrilateral,
            14,
            Green,
            &[
                (Triangle, &[5, 2, 6]),
                (Triangle, &[6, 3, 7]),
                (Triangle, &[5, 6, 7]),
                (Quadrilateral, &[1, 5, 7, 0]),
            ],
        ),
        rule(
            Quadrilateral,
            15,
            Green,
            &[
                (Triangle, &[6, 3, 7]),
                (Triangle, &[7, 0, 4]),
                (Triangle, &[6, 7, 4]),
                (Quadrilateral, &[2, 6, 4, 1]),
            ],
        ),
        rule(
            Quadrilateral,
            16,
            Green,
            &[
                (Triangle, &[7, 0, 4]),
                (Triangle, &[4, 1, 5]),
                (Triangle, &[7, 4, 5]),
                (Quadrilateral, &[3, 7, 5, 2]),
            ],
        ),
    ]
}

/// Copy and the regular 1:8 template; the interior octahedron is cut
/// along the diagonal between the mids of edges (0,1) and (2,3).
fn tetrahedron_base_rules() -> Vec<Rule> {
    use ElementClass::*;
    vec![
        rule(Tetrahedron, 0, None, &[]),
        rule(Tetrahedron, 1, Yellow, &[(Tetrahedron, &[0, 1, 2, 3])]),
        rule(
            Tetrahedron,
            2,
            Red,
            &[
                (Tetrahedron, &[0, 4, 6, 7]),
                (Tetrahedron, &[1, 5, 4, 8]),
                (Tetrahedron, &[2, 6, 5, 9]),
                (Tetrahedron, &[3, 8, 7, 9]),
                (Tetrahedron, &[4, 8, 5, 9]),
                (Tetrahedron, &[4, 7, 8, 9]),
                (Tetrahedron, &[4, 6, 7, 9]),
                (Tetrahedron, &[4, 5, 6, 9]),
            ],
        ),
    ]
}

/// The regular pyramid template quarters the base and keeps the apex:
/// four pyramids over the base quadrants.
fn pyramid_rules() -> Vec<Rule> {
    use ElementClass::*;
    vec![
        rule(Pyramid, 0, None, &[]),
        rule(Pyramid, 1, Yellow, &[(Pyramid, &[0, 1, 2, 3, 4])]),
        rule(
            Pyramid,
            2,
            Red,
            &[
                (Pyramid, &[0, 5, 13, 8, 4]),
                (Pyramid, &[5, 1, 6, 13, 4]),
                (Pyramid, &[13, 6, 2, 7, 4]),
                (Pyramid, &[8, 13, 7, 3, 4]),
            ],
        ),
    ]
}

/// The regular prism template splits both triangle decks and keeps the
/// vertical edges whole: four prisms.
fn prism_rules() -> Vec<Rule> {
    use ElementClass::*;
    vec![
        rule(Prism, 0, None, &[]),
        rule(Prism, 1, Yellow, &[(Prism, &[0, 1, 2, 3, 4, 5])]),
        rule(
            Prism,
            2,
            Red,
            &[
                (Prism, &[0, 6, 8, 3, 12, 14]),
                (Prism, &[1, 7, 6, 4, 13, 12]),
                (Prism, &[2, 8, 7, 5, 14, 13]),
                (Prism, &[6, 7, 8, 12, 13, 14]),
            ],
        ),
    ]
}

/// The regular 1:8 hexahedron template: one son per octant, using every
/// mid, every face node and the center.
fn hexahedron_rules() -> Vec<Rule> {
    use ElementClass::*;
    vec![
        rule(Hexahedron, 0, None, &[]),
        rule(
            Hexahedron,
            1,
            Yellow,
            &[(Hexahedron, &[0, 1, 2, 3, 4, 5, 6, 7])],
        ),
        rule(
            Hexahedron,
            2,
            Red,
            &[
                (Hexahedron, &[0, 8, 20, 11, 16, 22, 26, 25]),
                (Hexahedron, &[8, 1, 9, 20, 22, 17, 23, 26]),
                (Hexahedron, &[20, 9, 2, 10, 26, 23, 18, 24]),
                (Hexahedron, &[11, 20, 10, 3, 25, 26, 24, 19]),
                (Hexahedron, &[16, 22, 26, 25, 4, 12, 21, 15]),
                (Hexahedron, &[22, 17, 23, 26, 12, 5, 13, 21]),
                (Hexahedron, &[26, 23, 18, 24, 21, 13, 6, 14]),
                (Hexahedron, &[25, 26, 24, 19, 15, 21, 14, 7]),
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::SonNeighbor;

    #[test]
    fn triangle_set_covers_every_edge_pattern() {
        let rules = triangle_rules();
        for pattern in 0u32..8 {
            let hit = rules.iter().filter(|r| r.pattern == pattern).count();
            let expected = if pattern == 0 { 2 } else { 1 };
            assert_eq!(hit, expected, "pattern {pattern:03b}");
        }
    }

    #[test]
    fn quadrilateral_set_covers_every_edge_pattern() {
        let rules = quadrilateral_rules();
        for pattern in 0u32..16 {
            let hit = rules.iter().filter(|r| r.pattern == pattern).count();
            let expected = if pattern == 0 { 2 } else { 1 };
            assert_eq!(hit, expected, "pattern {pattern:04b}");
        }
    }

    #[test]
    fn full_patterns_match_shape_layout() {
        assert_eq!(triangle_rules()[2].pattern, 0b111);
        assert_eq!(quadrilateral_rules()[2].pattern, 0b1111);
        assert_eq!(tetrahedron_base_rules()[2].pattern, 0x3F);
        // Pyramid: base edges and the base face node.
        assert_eq!(pyramid_rules()[2].pattern, (1 << 8) | 0b1111);
        // Prism: both triangle decks, vertical edges stay whole.
        assert_eq!(prism_rules()[2].pattern, 0b111_000_111);
        // Hexahedron: all edges, all faces.
        assert_eq!(hexahedron_rules()[2].pattern, (0x3F << 12) | 0xFFF);
    }

    #[test]
    fn red_tetrahedron_faces_match_regular_face_split() {
        // Each father side must carry the four triangles of the regular
        // 2-D split: three corner triangles and the mid triangle.
        let red = &tetrahedron_base_rules()[2];
        for side in 0..4 {
            let on_side = red.sons_on_father_side(side);
            assert_eq!(on_side.len(), 4, "side {side}");
        }
    }

    #[test]
    fn red_hexahedron_sons_pair_around_center() {
        let red = &hexahedron_rules()[2];
        // Every son touches the center slot and has exactly three
        // exterior sides.
        for (i, son) in red.sons.iter().enumerate() {
            assert!(son.corners.contains(&26), "son {i}");
            let exterior = son
                .neighbors
                .iter()
                .filter(|n| matches!(n, SonNeighbor::FatherSide(_)))
                .count();
            assert_eq!(exterior, 3, "son {i}");
        }
    }

    #[test]
    fn prism_template_keeps_vertical_edges() {
        let red = &prism_rules()[2];
        for e in [3usize, 4, 5] {
            assert!(!red.bisects_edge(ElementShape::Prism, e), "edge {e}");
        }
        for e in [0usize, 1, 2, 6, 7, 8] {
            assert!(red.bisects_edge(ElementShape::Prism, e), "edge {e}");
        }
    }
}
