//! Grid closure: turns scattered refinement marks into a consistent
//! treatment for every element of one level.
//!
//! Red marks seed bisection requests on their edges (and face-node bits
//! on quadrilateral sides). The requests spread to whoever shares the
//! edge or face, tri-side diagonals are negotiated between the two
//! sharers, and every element's accumulated bit pattern is resolved
//! against the rule table. Shapes without a matching rule are covered by
//! the combinatorial green path afterwards.
//!
//! Resolution runs as a bounded fixpoint: a pyramid or prism whose red
//! rule is contaminated by neighbor bits cannot refine red, so it drops
//! out of the seed set and the level is reseeded without it. The sweep
//! count is capped by [`RefineOptions::max_closure_sweeps`]; in practice
//! two sweeps settle a level.
//!
//! [`RefineOptions::max_closure_sweeps`]: crate::refine::RefineOptions

use hashbrown::HashSet;
use log::debug;

use crate::grid::element::Element;
use crate::grid::level::Level;
use crate::grid::multigrid::MultiGrid;
use crate::mesh_error::RefineError;
use crate::refine::PassContext;
use crate::rules::{COPY_MARK, FULL_MARK};
use crate::topology::class::{ElementClass, MarkId};
use crate::topology::point::{ElemId, FaceKey};
use crate::topology::shape::ElementShape;

/// Per-level outcome of one closure.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ClosureStats {
    /// Elements holding any treatment mark.
    pub marked: usize,
    /// The green subset of `marked`.
    pub green: usize,
}

/// Diagonal anchors of tetrahedron sides with two bisected edges, by
/// 6-bit edge pattern reduced to one side: `[chosen, other]` as global
/// edge indices. `[-1, -1]` marks patterns without a two-edge side,
/// `[-2, -2]` patterns whose bits span more than one side.
///
/// The anchor convention is positional: the default diagonal runs from
/// the mid of the edge leaving the shared corner (in side cycle order)
/// to the corner opposite that edge; a set side bit selects the entering
/// edge instead.
#[rustfmt::skip]
static TRISECTION_EDGE: [[i8; 2]; 64] = [
    [-1, -1], [-1, -1], [-1, -1], [ 1,  0], [-1, -1], [ 0,  2], [ 2,  1], [-1, -1],
    [-1, -1], [ 0,  3], [-2, -2], [-2, -2], [ 2,  3], [-2, -2], [-2, -2], [-2, -2],
    [-1, -1], [ 4,  0], [ 1,  4], [-2, -2], [-2, -2], [-2, -2], [-2, -2], [-2, -2],
    [ 3,  4], [-1, -1], [-2, -2], [-2, -2], [-2, -2], [-2, -2], [-2, -2], [-2, -2],
    [-1, -1], [-2, -2], [ 5,  1], [-2, -2], [ 5,  2], [-2, -2], [-2, -2], [-2, -2],
    [ 3,  5], [-2, -2], [-2, -2], [-2, -2], [-1, -1], [-2, -2], [-2, -2], [-2, -2],
    [ 4,  5], [-2, -2], [-1, -1], [-2, -2], [-2, -2], [-2, -2], [-2, -2], [-2, -2],
    [-2, -2], [-2, -2], [-2, -2], [-2, -2], [-2, -2], [-2, -2], [-2, -2], [-2, -2],
];

/// Bit per local edge whose level edge carries a bisection request.
fn edge_bits(level: &Level, elem: &Element) -> Result<u16, RefineError> {
    let mut bits = 0u16;
    for e in 0..elem.shape.edge_count() {
        if level.edge(elem.edge_key(e))?.pattern {
            bits |= 1 << e;
        }
    }
    Ok(bits)
}

/// The lookup key of an element's accumulated pattern.
fn pattern_key(shape: ElementShape, edges: u16, side_bits: u8) -> u32 {
    if shape.dimension() == 2 {
        u32::from(edges)
    } else {
        (u32::from(side_bits) << shape.edge_count()) | u32::from(edges)
    }
}

/// Side-pattern bits restricted to quadrilateral sides (face nodes; the
/// remaining bits are tri-side diagonal flips).
fn quad_side_bits(shape: ElementShape, side_pattern: u8) -> u8 {
    let mut bits = 0u8;
    for s in 0..shape.side_count() {
        if shape.side_is_quad(s) {
            bits |= side_pattern & (1 << s);
        }
    }
    bits
}

/// The local edge whose mid anchors the diagonal of tri side `side`, or
/// `None` when the side does not have exactly two bisected edges.
fn tri_diagonal_edge(
    elem: &Element,
    id: ElemId,
    side: usize,
    edges: u16,
) -> Result<Option<usize>, RefineError> {
    let shape = elem.shape;
    let flipped = elem.side_pattern & (1 << side) != 0;

    if shape == ElementShape::Tetrahedron {
        let reduced = (edges & shape.side_edge_mask(side)) as u8;
        let [chosen, other] = TRISECTION_EDGE[reduced as usize];
        if chosen == -2 {
            return Err(RefineError::InconsistentPattern {
                elem: id,
                side,
                pattern: reduced,
            });
        }
        if chosen == -1 {
            return Ok(None);
        }
        let anchor = if flipped { other } else { chosen };
        return Ok(Some(anchor as usize));
    }

    let side_edges = shape.edges_of_side(side);
    let mut pos_mask = 0u8;
    for (j, &e) in side_edges.iter().enumerate() {
        if edges & (1 << e) != 0 {
            pos_mask |= 1 << j;
        }
    }
    let shared = match pos_mask {
        0b011 => 1,
        0b110 => 2,
        0b101 => 0,
        _ => return Ok(None),
    };
    let pos = if flipped { (shared + 2) % 3 } else { shared };
    Ok(Some(side_edges[pos] as usize))
}

/// Carries side state across shared sides, each unordered pair once.
///
/// A face-node bit is made mutual; disagreeing tri-side diagonals are
/// settled by flipping the higher-numbered element's bit, so a second
/// look at the pair agrees.
fn propagate_side_bits(mg: &mut MultiGrid, k: usize, ids: &[ElemId]) -> Result<(), RefineError> {
    for &id in ids {
        let elem = mg.level(k)?.element(id)?.clone();
        let my_edges = edge_bits(mg.level(k)?, &elem)?;
        for side in 0..elem.shape.side_count() {
            let Some(nb) = elem.neighbors[side] else {
                continue;
            };
            if nb < id {
                continue;
            }
            let nb_elem = mg.level(k)?.element(nb)?.clone();
            let nb_side =
                nb_elem
                    .side_of_neighbor(id)
                    .ok_or(RefineError::NonMutualNeighbor {
                        a: id,
                        b: nb,
                        side,
                    })?;

            if elem.shape.side_is_quad(side) {
                let mine = elem.side_pattern & (1 << side) != 0;
                let theirs = nb_elem.side_pattern & (1 << nb_side) != 0;
                if mine != theirs {
                    let level = mg.level_mut(k)?;
                    level.element_mut(id)?.side_pattern |= 1 << side;
                    level.element_mut(nb)?.side_pattern |= 1 << nb_side;
                }
            } else {
                let Some(my_anchor) = tri_diagonal_edge(&elem, id, side, my_edges)? else {
                    continue;
                };
                let nb_edges = edge_bits(mg.level(k)?, &nb_elem)?;
                let Some(nb_anchor) = tri_diagonal_edge(&nb_elem, nb, nb_side, nb_edges)? else {
                    continue;
                };
                if elem.edge_key(my_anchor) != nb_elem.edge_key(nb_anchor) {
                    mg.level_mut(k)?.element_mut(nb)?.side_pattern ^= 1 << nb_side;
                }
            }
        }
    }
    Ok(())
}

/// Whether the nodes the standing family hangs off `elem` match the newly
/// derived pattern exactly.
fn family_nodes_match(level: &Level, elem: &Element) -> Result<bool, RefineError> {
    for e in 0..elem.shape.edge_count() {
        let edge = level.edge(elem.edge_key(e))?;
        if edge.mid.is_some() != (edge.pattern && !edge.add_pattern) {
            return Ok(false);
        }
    }
    for s in 0..elem.shape.side_count() {
        if !elem.shape.side_is_quad(s) {
            continue;
        }
        let corners = elem.side_nodes(s);
        let face = FaceKey::new([corners[0], corners[1], corners[2], corners[3]]);
        let has = level.face_nodes.contains_key(&face);
        if has != (elem.side_pattern & (1 << s) != 0) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Closes level `k`: propagates all standing red marks, assigns rule
/// marks, green covering, and the rebuild-release of unchanged green
/// families. Returns how much of the level ended up marked.
pub(crate) fn close_grid(
    mg: &mut MultiGrid,
    k: usize,
    pass: &mut PassContext<'_>,
) -> Result<ClosureStats, RefineError> {
    let rules = pass.rules;
    let ids = mg.level(k)?.sorted_elements();
    let edge_keys = mg.level(k)?.sorted_edges();
    let dim3 = mg.dim() == 3;

    {
        let level = mg.level_mut(k)?;
        for &id in &ids {
            level.element_mut(id)?.used = true;
        }
    }

    // Red marks whose rules seed bit patterns. A caseful shape leaves the
    // set when neighbor bits contaminate its pattern past its own rule;
    // the level is then reseeded without it.
    let mut seeding: HashSet<ElemId> = HashSet::new();
    for &id in &ids {
        let elem = mg.level(k)?.element(id)?;
        if elem.mark_class == ElementClass::Red && elem.mark.is_some() {
            seeding.insert(id);
        }
    }

    let mut sweep = 0usize;
    loop {
        sweep += 1;
        if sweep > pass.options.max_closure_sweeps {
            return Err(RefineError::RetryNonConvergence {
                level: k,
                pending: seeding.len(),
            });
        }

        {
            let level = mg.level_mut(k)?;
            for &key in &edge_keys {
                let edge = level.edge_mut(key)?;
                edge.pattern = false;
                edge.add_pattern = true;
            }
            for &id in &ids {
                level.element_mut(id)?.side_pattern = 0;
            }
        }

        for &id in &ids {
            if !seeding.contains(&id) {
                continue;
            }
            let elem = mg.level(k)?.element(id)?.clone();
            let rule = rules.rule(elem.shape, elem.mark)?;
            let mut side_bits = 0u8;
            for s in 0..elem.shape.side_count() {
                if elem.shape.side_is_quad(s) && rule.places_face_node(elem.shape, s) {
                    side_bits |= 1 << s;
                }
            }
            let level = mg.level_mut(k)?;
            for e in 0..elem.shape.edge_count() {
                if rule.bisects_edge(elem.shape, e) {
                    level.edge_mut(elem.edge_key(e))?.pattern = true;
                }
            }
            if side_bits != 0 {
                level.element_mut(id)?.side_pattern |= side_bits;
            }
        }

        if dim3 {
            propagate_side_bits(mg, k, &ids)?;
        }

        // Resolve every element's pattern against the rule table.
        let mut changed = false;
        for &id in &ids {
            let elem = mg.level(k)?.element(id)?.clone();
            let edges = edge_bits(mg.level(k)?, &elem)?;
            let key = pattern_key(elem.shape, edges, elem.side_pattern);
            match rules.pattern_to_mark(elem.shape, key) {
                Some(mark) => {
                    let class = rules.rule(elem.shape, mark)?.class;
                    let e = mg.level_mut(k)?.element_mut(id)?;
                    e.mark = mark;
                    e.mark_class = class;
                }
                None => match elem.shape {
                    ElementShape::Triangle | ElementShape::Quadrilateral => {
                        // The 2-D sets cover every edge pattern; anything
                        // unmatched escalates to the full subdivision and
                        // is reseeded.
                        let e = mg.level_mut(k)?.element_mut(id)?;
                        e.mark = FULL_MARK;
                        e.mark_class = ElementClass::Red;
                        seeding.insert(id);
                        changed = true;
                    }
                    ElementShape::Tetrahedron => {
                        return Err(RefineError::RuleNotFound {
                            shape: elem.shape,
                            pattern: key,
                        });
                    }
                    _ => {
                        if seeding.remove(&id) {
                            changed = true;
                        }
                        let e = mg.level_mut(k)?.element_mut(id)?;
                        e.mark = MarkId::NONE;
                        e.mark_class = ElementClass::None;
                    }
                },
            }
        }

        if !changed {
            break;
        }
    }

    // Rule marks announce the mids they will create.
    for &id in &ids {
        let elem = mg.level(k)?.element(id)?.clone();
        if !elem.mark.is_some() {
            continue;
        }
        let rule = rules.rule(elem.shape, elem.mark)?;
        let level = mg.level_mut(k)?;
        for e in 0..elem.shape.edge_count() {
            if rule.bisects_edge(elem.shape, e) {
                level.edge_mut(elem.edge_key(e))?.add_pattern = false;
            }
        }
    }

    // Green covering: an unmarked element bordering real bisections or an
    // incoming face node turns green; a green element whose standing
    // family still fits is released from rebuilding.
    for &id in &ids {
        let elem = mg.level(k)?.element(id)?.clone();
        if elem.mark_class == ElementClass::Red {
            continue;
        }

        if elem.mark_class != ElementClass::Green {
            let level = mg.level(k)?;
            let mut bisected = false;
            for e in 0..elem.shape.edge_count() {
                let edge = level.edge(elem.edge_key(e))?;
                if edge.pattern && !edge.add_pattern {
                    bisected = true;
                    break;
                }
            }
            if !bisected && quad_side_bits(elem.shape, elem.side_pattern) == 0 {
                continue;
            }
            debug_assert!(elem.green_by_cases(), "rule shapes close by derivation");
            let e = mg.level_mut(k)?.element_mut(id)?;
            e.mark = COPY_MARK;
            e.mark_class = ElementClass::Green;
        }

        let elem = mg.level(k)?.element(id)?.clone();
        if elem.treatment_changes() || elem.refine_class != ElementClass::Green {
            continue;
        }
        if elem.side_pattern != elem.refine_side_pattern {
            continue;
        }
        if family_nodes_match(mg.level(k)?, &elem)? {
            mg.level_mut(k)?.element_mut(id)?.used = false;
        }
    }

    let mut stats = ClosureStats::default();
    {
        let level = mg.level(k)?;
        for &id in &ids {
            match level.element(id)?.mark_class {
                ElementClass::Red => stats.marked += 1,
                ElementClass::Green => {
                    stats.marked += 1;
                    stats.green += 1;
                }
                _ => {}
            }
        }
    }
    debug!(
        "closed level {k}: {} marked ({} green), {sweep} sweeps",
        stats.marked, stats.green
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NoGeometry;
    use crate::overlap::NoOverlay;
    use crate::refine::{PassContext, RefineOptions, mark_refine};
    use crate::rules::RuleSet;
    use crate::topology::point::EdgeKey;

    fn pass_fixture(options: &RefineOptions) -> PassContext<'_> {
        PassContext::new(options, &NoGeometry, &NoOverlay)
    }

    fn two_triangles() -> MultiGrid {
        MultiGrid::build_2d(
            &[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            &[
                (ElementShape::Triangle, &[0, 1, 3]),
                (ElementShape::Triangle, &[1, 2, 3]),
            ],
        )
        .unwrap()
    }

    fn two_tets() -> MultiGrid {
        MultiGrid::build_3d(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
            ],
            &[
                (ElementShape::Tetrahedron, &[0, 1, 2, 3]),
                (ElementShape::Tetrahedron, &[1, 2, 3, 4]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn trisection_table_matches_the_positional_rule() {
        let shape = ElementShape::Tetrahedron;
        for side in 0..shape.side_count() {
            let edges = shape.edges_of_side(side);
            for a in 0..3 {
                let b = (a + 1) % 3;
                let pattern = (1usize << edges[a]) | (1 << edges[b]);
                let [chosen, other] = TRISECTION_EDGE[pattern];
                // The default anchor leaves the shared corner, which sits
                // at side position a + 1.
                assert_eq!(chosen as u8, edges[b], "side {side} pair ({a},{b})");
                assert_eq!(other as u8, edges[a], "side {side} pair ({a},{b})");
            }
        }

        assert_eq!(TRISECTION_EDGE[0], [-1, -1]);
        for e in 0..6 {
            assert_eq!(TRISECTION_EDGE[1 << e], [-1, -1]);
        }
        for side in 0..shape.side_count() {
            let mask = shape.side_edge_mask(side) as usize;
            assert_eq!(TRISECTION_EDGE[mask], [-1, -1]);
        }
        // Bits spanning two sides are not a side pattern at all.
        assert_eq!(TRISECTION_EDGE[0b100001], [-2, -2]);
        assert_eq!(TRISECTION_EDGE[0b001010], [-2, -2]);
    }

    #[test]
    fn red_triangle_greens_its_neighbor() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = two_triangles();
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[0]).unwrap();

        let stats = close_grid(&mut mg, 0, &mut pass).unwrap();
        assert_eq!(stats.marked, 2);
        assert_eq!(stats.green, 1);

        let level = mg.level(0).unwrap();
        let a = level.element(ids[0]).unwrap();
        let b = level.element(ids[1]).unwrap();
        assert_eq!(a.mark_class, ElementClass::Red);
        assert_eq!(b.mark_class, ElementClass::Green);

        // The neighbor's rule bisects exactly the shared diagonal.
        let rules = RuleSet::global();
        let pattern = rules.mark_to_pattern(b.shape, b.mark).unwrap();
        let shared = b.side_of_neighbor(ids[0]).unwrap();
        assert_eq!(pattern, 1 << shared);

        // Every edge of the red element is announced, the boundary edges
        // of the green one are not.
        for e in 0..3 {
            let edge = level.edge(a.edge_key(e)).unwrap();
            assert!(edge.pattern && !edge.add_pattern);
        }
        for e in 0..3 {
            let edge = level.edge(b.edge_key(e)).unwrap();
            assert_eq!(edge.pattern, e == shared);
        }
    }

    #[test]
    fn closure_is_idempotent() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = two_triangles();
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[0]).unwrap();

        let first = close_grid(&mut mg, 0, &mut pass).unwrap();
        let marks: Vec<_> = ids
            .iter()
            .map(|&id| {
                let e = mg.level(0).unwrap().element(id).unwrap();
                (e.mark, e.mark_class)
            })
            .collect();
        let second = close_grid(&mut mg, 0, &mut pass).unwrap();
        for (i, &id) in ids.iter().enumerate() {
            let e = mg.level(0).unwrap().element(id).unwrap();
            assert_eq!((e.mark, e.mark_class), marks[i]);
        }
        assert_eq!(first.marked, second.marked);
    }

    #[test]
    fn red_tetrahedron_greens_its_neighbor_across_the_face() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = two_tets();
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[0]).unwrap();

        let stats = close_grid(&mut mg, 0, &mut pass).unwrap();
        assert_eq!(stats.marked, 2);
        assert_eq!(stats.green, 1);

        let level = mg.level(0).unwrap();
        let b = level.element(ids[1]).unwrap();
        assert_eq!(b.mark_class, ElementClass::Green);

        // The shared face has all three edges bisected, so the neighbor's
        // generated rule covers exactly that side's edges, with no flips.
        let rules = RuleSet::global();
        let pattern = rules.mark_to_pattern(b.shape, b.mark).unwrap();
        let shared = b.side_of_neighbor(ids[0]).unwrap();
        assert_eq!(pattern, u32::from(b.shape.side_edge_mask(shared)));
        assert_eq!(b.side_pattern, 0);
    }

    #[test]
    fn disagreeing_diagonals_flip_the_higher_element() {
        // The second tet is written so the shared face is traversed in
        // the same-handed order by both elements; their default anchors
        // then disagree and negotiation must flip one side bit.
        let mut mg = MultiGrid::build_3d(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
            ],
            &[
                (ElementShape::Tetrahedron, &[0, 1, 2, 3]),
                (ElementShape::Tetrahedron, &[2, 1, 4, 3]),
            ],
        )
        .unwrap();
        let ids = mg.level(0).unwrap().sorted_elements();
        let (a, b) = (ids[0], ids[1]);

        // Bisect mesh edges (1,2) and (2,3): two edges of the shared
        // face {1,2,3}, meeting at mesh node 2.
        for (lo, hi) in [(2u64, 3u64), (3, 4)] {
            let key = EdgeKey::new(
                crate::topology::point::NodeId::new(lo),
                crate::topology::point::NodeId::new(hi),
            );
            mg.level_mut(0).unwrap().edge_mut(key).unwrap().pattern = true;
        }
        propagate_side_bits(&mut mg, 0, &ids).unwrap();

        let level = mg.level(0).unwrap();
        let ea = level.element(a).unwrap();
        let eb = level.element(b).unwrap();
        let side_a = ea.side_of_neighbor(b).unwrap();
        let side_b = eb.side_of_neighbor(a).unwrap();
        assert_eq!(ea.side_pattern, 0);
        assert_eq!(eb.side_pattern, 1 << side_b);

        // After the flip both elements anchor the same physical edge.
        let bits_a = edge_bits(level, ea).unwrap();
        let bits_b = edge_bits(level, eb).unwrap();
        let anchor_a = tri_diagonal_edge(ea, a, side_a, bits_a).unwrap().unwrap();
        let anchor_b = tri_diagonal_edge(eb, b, side_b, bits_b).unwrap().unwrap();
        assert_eq!(ea.edge_key(anchor_a), eb.edge_key(anchor_b));
    }

    fn pyramid_and_tet() -> MultiGrid {
        MultiGrid::build_3d(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.5, 0.5, 1.0],
                [0.5, -0.5, 1.0],
            ],
            &[
                (ElementShape::Pyramid, &[0, 1, 2, 3, 4]),
                (ElementShape::Tetrahedron, &[0, 1, 4, 5]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn red_tet_turns_the_pyramid_green_by_cases() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = pyramid_and_tet();
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[1]).unwrap();

        let stats = close_grid(&mut mg, 0, &mut pass).unwrap();
        assert_eq!(stats.marked, 2);
        assert_eq!(stats.green, 1);

        let level = mg.level(0).unwrap();
        let pyr = level.element(ids[0]).unwrap();
        assert_eq!(pyr.mark, COPY_MARK);
        assert_eq!(pyr.mark_class, ElementClass::Green);
        // No face node and no diagonal ambiguity on any pyramid side.
        assert_eq!(pyr.side_pattern, 0);
    }

    #[test]
    fn contaminated_red_pyramid_is_demoted_to_green() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = pyramid_and_tet();
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[0]).unwrap();
        mark_refine(&mut mg, 0, ids[1]).unwrap();

        let stats = close_grid(&mut mg, 0, &mut pass).unwrap();
        assert_eq!(stats.marked, 2);
        assert_eq!(stats.green, 1);

        let level = mg.level(0).unwrap();
        let pyr = level.element(ids[0]).unwrap();
        let tet = level.element(ids[1]).unwrap();
        assert_eq!(tet.mark_class, ElementClass::Red);
        // The tet's lateral bisections do not fit the pyramid's red rule,
        // so its mark and its seeded base-face bit are withdrawn.
        assert_eq!(pyr.mark, COPY_MARK);
        assert_eq!(pyr.mark_class, ElementClass::Green);
        assert_eq!(pyr.side_pattern, 0);

        // Base edges seeded by the demoted pyramid are requests no rule
        // answers; only the tet's edges end up announced.
        let shared_base = level.edge(pyr.edge_key(0)).unwrap();
        assert!(shared_base.pattern && !shared_base.add_pattern);
        let far_base = level.edge(pyr.edge_key(2)).unwrap();
        assert!(!far_base.pattern);
    }

    #[test]
    fn red_hexahedron_pushes_face_nodes_to_its_neighbor() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = MultiGrid::build_3d(
            &[
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 1.0],
                [1.0, 1.0, 1.0],
                [0.0, 1.0, 1.0],
                [2.0, 0.0, 0.0],
                [2.0, 1.0, 0.0],
                [2.0, 0.0, 1.0],
                [2.0, 1.0, 1.0],
            ],
            &[
                (ElementShape::Hexahedron, &[0, 1, 2, 3, 4, 5, 6, 7]),
                (ElementShape::Hexahedron, &[1, 8, 9, 2, 5, 10, 11, 6]),
            ],
        )
        .unwrap();
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[0]).unwrap();

        let stats = close_grid(&mut mg, 0, &mut pass).unwrap();
        assert_eq!(stats.marked, 2);
        assert_eq!(stats.green, 1);

        let level = mg.level(0).unwrap();
        let a = level.element(ids[0]).unwrap();
        let b = level.element(ids[1]).unwrap();
        assert_eq!(a.mark_class, ElementClass::Red);
        assert_eq!(a.side_pattern, 0b11_1111);
        assert_eq!(b.mark, COPY_MARK);
        assert_eq!(b.mark_class, ElementClass::Green);
        let shared = b.side_of_neighbor(ids[0]).unwrap();
        assert_eq!(b.side_pattern, 1 << shared);
    }
}
