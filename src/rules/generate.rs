//! Startup generation of the tetrahedral closure set.
//!
//! For every edge pattern except "none" and "all" (those are rules 0 and
//! 2), and for every admissible combination of side diagonal flips, this
//! module tessellates the reference tetrahedron into sub-tetrahedra whose
//! boundary reproduces the canonical 2-D split of each face:
//!
//! * no marked edge: the face stays whole,
//! * one marked edge: bisection toward the opposite corner,
//! * two marked edges: corner triangle plus a quadrilateral cut along a
//!   diagonal; the default diagonal starts at the mid of the edge leaving
//!   the shared corner in cyclic order, the flip bit selects the other,
//! * three marked edges: the regular four-triangle split.
//!
//! The interior is filled by a backtracking search over candidate
//! sub-tetrahedra in exact integer reference coordinates (corner
//! coordinates doubled so mid-nodes stay integral). A pattern and flip
//! combination without a conforming tessellation simply produces no rule;
//! lookups for it miss.

use std::collections::BTreeMap;

use hashbrown::HashMap;

use super::{Rule, build_rule};
use crate::topology::class::{ElementClass, MarkId};
use crate::topology::shape::ElementShape;

/// Reference corners, doubled: (0,0,0), (2,0,0), (0,2,0), (0,0,2).
const CORNER_POS: [[i64; 3]; 4] = [[0, 0, 0], [2, 0, 0], [0, 2, 0], [0, 0, 2]];

/// Volume of the doubled reference tetrahedron, times six.
const TOTAL_VOLUME: i64 = 8;

const SHAPE: ElementShape = ElementShape::Tetrahedron;

/// Position of a context slot: corner or edge mid.
fn slot_pos(slot: u8) -> [i64; 3] {
    if (slot as usize) < 4 {
        return CORNER_POS[slot as usize];
    }
    let edge = slot as usize - 4;
    let [a, b] = SHAPE.corner_of_edge(edge);
    let (a, b) = (a as usize, b as usize);
    [
        (CORNER_POS[a][0] + CORNER_POS[b][0]) / 2,
        (CORNER_POS[a][1] + CORNER_POS[b][1]) / 2,
        (CORNER_POS[a][2] + CORNER_POS[b][2]) / 2,
    ]
}

fn det3(a: [i64; 3], b: [i64; 3], c: [i64; 3]) -> i64 {
    a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
        + a[2] * (b[0] * c[1] - b[1] * c[0])
}

fn sub(a: [i64; 3], b: [i64; 3]) -> [i64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Six times the signed volume of slots `t`.
fn signed_volume(t: [u8; 4]) -> i64 {
    let p: Vec<[i64; 3]> = t.iter().map(|&s| slot_pos(s)).collect();
    det3(sub(p[1], p[0]), sub(p[2], p[0]), sub(p[3], p[0]))
}

/// Unordered face key.
type Tri = [u8; 3];

fn tri_key(a: u8, b: u8, c: u8) -> Tri {
    let mut k = [a, b, c];
    k.sort_unstable();
    k
}

fn faces_of(t: [u8; 4]) -> [Tri; 4] {
    [
        tri_key(t[0], t[1], t[2]),
        tri_key(t[0], t[1], t[3]),
        tri_key(t[0], t[2], t[3]),
        tri_key(t[1], t[2], t[3]),
    ]
}

/// The element side plane containing all three face vertices, if any.
/// Planes of the reference tetrahedron: z = 0, y = 0, x = 0 and
/// x + y + z = 2.
fn on_element_side(tri: Tri) -> bool {
    let p: Vec<[i64; 3]> = tri.iter().map(|&s| slot_pos(s)).collect();
    p.iter().all(|q| q[2] == 0)
        || p.iter().all(|q| q[1] == 0)
        || p.iter().all(|q| q[0] == 0)
        || p.iter().all(|q| q[0] + q[1] + q[2] == 2)
}

/// Whether `w` lies in the closed hull of `t` without being a corner.
fn hull_contains(t: [u8; 4], w: u8) -> bool {
    if t.contains(&w) {
        return false;
    }
    let total = signed_volume(t);
    let sign = total.signum();
    for i in 0..4 {
        let mut sub_tet = t;
        sub_tet[i] = w;
        let v = signed_volume(sub_tet);
        if v != 0 && v.signum() != sign {
            return false;
        }
    }
    true
}

/// Canonical split of one side under `edge_pattern`, as slot triangles.
fn side_triangles(edge_pattern: u8, side: usize, flipped: bool) -> Vec<Tri> {
    let corners = SHAPE.corners_of_side(side);
    let edges = SHAPE.edges_of_side(side);
    let marked: Vec<usize> = (0..3)
        .filter(|&j| edge_pattern & (1 << edges[j]) != 0)
        .collect();
    let c = |j: usize| corners[j % 3];
    let m = |j: usize| SHAPE.edge_slot(edges[j % 3] as usize) as u8;

    match marked.as_slice() {
        [] => vec![tri_key(c(0), c(1), c(2))],
        [j] => vec![tri_key(c(*j), m(*j), c(j + 2)), tri_key(m(*j), c(j + 1), c(j + 2))],
        [a, b] => {
            // Shared corner position: edges j and j+1 meet at corner j+1.
            let s = if *b == *a + 1 { *b } else { 0 };
            let (x, y, z) = (c(s), c(s + 1), c(s + 2));
            let (m_xy, m_zx) = (m(s), m(s + 2));
            if flipped {
                vec![
                    tri_key(x, m_xy, m_zx),
                    tri_key(m_xy, y, m_zx),
                    tri_key(y, z, m_zx),
                ]
            } else {
                vec![
                    tri_key(x, m_xy, m_zx),
                    tri_key(m_xy, y, z),
                    tri_key(m_xy, z, m_zx),
                ]
            }
        }
        _ => vec![
            tri_key(c(0), m(0), m(2)),
            tri_key(c(1), m(1), m(0)),
            tri_key(c(2), m(2), m(1)),
            tri_key(m(0), m(1), m(2)),
        ],
    }
}

/// Sub-tetrahedra candidates: every positively measurable 4-subset of the
/// vertex set that contains no further vertex in its closed hull.
fn candidates(verts: &[u8]) -> Vec<[u8; 4]> {
    let n = verts.len();
    let mut out = Vec::new();
    for a in 0..n {
        for b in a + 1..n {
            for c in b + 1..n {
                for d in c + 1..n {
                    let t = [verts[a], verts[b], verts[c], verts[d]];
                    if signed_volume(t) == 0 {
                        continue;
                    }
                    if verts.iter().any(|&w| hull_contains(t, w)) {
                        continue;
                    }
                    out.push(t);
                }
            }
        }
    }
    out
}

/// Depth-first fill: pick the smallest uncovered face, try every
/// candidate over it, match faces pairwise and balance the volume.
fn fill(
    open: &mut BTreeMap<Tri, u32>,
    remaining: i64,
    cands: &[[u8; 4]],
    by_face: &HashMap<Tri, Vec<usize>>,
    placed: &mut Vec<[u8; 4]>,
) -> bool {
    let Some((&front, _)) = open.iter().next() else {
        return remaining == 0;
    };
    let Some(list) = by_face.get(&front) else {
        return false;
    };
    for &ci in list {
        let t = cands[ci];
        let vol = signed_volume(t).abs();
        if vol > remaining {
            continue;
        }
        let faces = faces_of(t);
        // A face on the element boundary must match a pending triangle.
        if faces
            .iter()
            .any(|g| on_element_side(*g) && !open.contains_key(g))
        {
            continue;
        }
        if !faces.contains(&front) {
            continue;
        }
        let mut removed: Vec<Tri> = Vec::new();
        let mut added: Vec<Tri> = Vec::new();
        for g in faces {
            if let Some(n) = open.get_mut(&g) {
                *n -= 1;
                if *n == 0 {
                    open.remove(&g);
                }
                removed.push(g);
            } else {
                *open.entry(g).or_insert(0) += 1;
                added.push(g);
            }
        }
        placed.push(t);
        if fill(open, remaining - vol, cands, by_face, placed) {
            return true;
        }
        placed.pop();
        for g in added {
            if let Some(n) = open.get_mut(&g) {
                *n -= 1;
                if *n == 0 {
                    open.remove(&g);
                }
            }
        }
        for g in removed {
            *open.entry(g).or_insert(0) += 1;
        }
    }
    false
}

/// Attempts a conforming tessellation for one pattern and flip choice.
fn tessellate(edge_pattern: u8, side_bits: u8) -> Option<Vec<[u8; 4]>> {
    let mut verts: Vec<u8> = (0..4).collect();
    for e in 0..6 {
        if edge_pattern & (1 << e) != 0 {
            verts.push(SHAPE.edge_slot(e) as u8);
        }
    }

    let mut open: BTreeMap<Tri, u32> = BTreeMap::new();
    for side in 0..4 {
        let flipped = side_bits & (1 << side) != 0;
        for tri in side_triangles(edge_pattern, side, flipped) {
            *open.entry(tri).or_insert(0) += 1;
        }
    }

    let cands = candidates(&verts);
    let mut by_face: HashMap<Tri, Vec<usize>> = HashMap::new();
    for (i, t) in cands.iter().enumerate() {
        for g in faces_of(*t) {
            by_face.entry(g).or_default().push(i);
        }
    }

    let mut placed = Vec::new();
    fill(&mut open, TOTAL_VOLUME, &cands, &by_face, &mut placed).then_some(placed)
}

/// Side bits admissible for a pattern: exactly the sides carrying two
/// marked edges have a diagonal to choose.
fn ambiguous_sides(edge_pattern: u8) -> u8 {
    let mut mask = 0u8;
    for side in 0..4 {
        let on_side = edge_pattern as u16 & SHAPE.side_edge_mask(side);
        if on_side.count_ones() == 2 {
            mask |= 1 << side;
        }
    }
    mask
}

/// All generated closure rules, with marks starting at `first_mark`.
pub(super) fn tetrahedron_closure_rules(first_mark: u16) -> Vec<Rule> {
    let mut out = Vec::new();
    let mut mark = first_mark;
    for edge_pattern in 1u8..0x3F {
        let ambiguous = ambiguous_sides(edge_pattern);
        for side_bits in 0u8..16 {
            if side_bits & !ambiguous != 0 {
                continue;
            }
            let Some(tets) = tessellate(edge_pattern, side_bits) else {
                continue;
            };
            let sons: Vec<(ElementShape, [u8; 4])> = tets
                .into_iter()
                .map(|mut t| {
                    if signed_volume(t) < 0 {
                        t.swap(0, 1);
                    }
                    (SHAPE, t)
                })
                .collect();
            let borrowed: Vec<(ElementShape, &[u8])> =
                sons.iter().map(|(s, c)| (*s, &c[..])).collect();
            let mut rule = build_rule(SHAPE, MarkId(mark), ElementClass::Green, &borrowed)
                .expect("generated tetrahedron rule");
            rule.pattern = (u32::from(side_bits) << 6) | u32::from(edge_pattern);
            out.push(rule);
            mark += 1;
        }
    }
    out
}
