//! Cross-side stitching of son families.
//!
//! After a level's families are rebuilt, the sons on either flank of
//! every element side must agree: refinement rules guarantee that the
//! two sharers split a common side into the same sub-sides, so the
//! stitcher only has to pair them up. Sides are identified by their
//! sorted corner-node tuples, which is independent of how either father
//! numbers the side.

use std::cmp::Ordering;

use hashbrown::HashSet;
use log::warn;
use smallvec::SmallVec;

use crate::grid::multigrid::MultiGrid;
use crate::mesh_error::RefineError;
use crate::refine::PassContext;
use crate::topology::class::ElementClass;
use crate::topology::point::{EdgeKey, ElemId, FaceKey, NodeId};

/// Wires the sons of `id` on father side `side` to whatever sits across:
/// the domain boundary, nothing, or the neighbor's sons.
///
/// `rebuilt` holds the elements rebuilt in this pass; a pair of rebuilt
/// sharers is stitched once, from the higher element id.
pub(crate) fn connect_sons_of_element_side(
    mg: &mut MultiGrid,
    k: usize,
    id: ElemId,
    side: usize,
    rebuilt: &HashSet<ElemId>,
    pass: &PassContext<'_>,
) -> Result<(), RefineError> {
    let (boundary, neighbor) = {
        let e = mg.level(k)?.element(id)?;
        (e.side_on_boundary(side), e.neighbors[side])
    };

    if boundary {
        for (child, cs) in sons_of_side(mg, k, id, side, pass)? {
            let keys: SmallVec<[EdgeKey; 4]> = {
                let son = mg.level(k + 1)?.element(child)?;
                son.shape
                    .edges_of_side(cs)
                    .iter()
                    .map(|&e| son.edge_key(e as usize))
                    .collect()
            };
            let level = mg.level_mut(k + 1)?;
            level.element_mut(child)?.boundary_sides |= 1 << cs;
            for key in keys {
                level.edge_mut(key)?.boundary = true;
            }
        }
        return Ok(());
    }

    let Some(nb) = neighbor else {
        return Ok(());
    };
    if rebuilt.contains(&nb) && nb < id {
        return Ok(());
    }
    if mg.level(k)?.element(nb)?.refine_class == ElementClass::None {
        return Ok(());
    }
    let nb_side = mg
        .level(k)?
        .element(nb)?
        .side_of_neighbor(id)
        .ok_or(RefineError::NonMutualNeighbor { a: id, b: nb, side })?;

    let mine = keyed_sons(mg, k, id, side, pass)?;
    let theirs = keyed_sons(mg, k, nb, nb_side, pass)?;

    let ghost = pass.overlay.is_ghost(id) || pass.overlay.is_ghost(nb);
    if mine.len() != theirs.len() {
        if !ghost {
            return Err(RefineError::ReconciliationMismatch {
                elem: id,
                side,
                left: mine.len(),
                right: theirs.len(),
            });
        }
        warn!(
            "ghost side {side} of element {id}: pairing {} sons against {}",
            mine.len(),
            theirs.len()
        );
    }

    // Merge-walk the two descending lists; on a ghost side unmatched
    // sub-sides are legal and stay unwired.
    let mut i = 0;
    let mut j = 0;
    while i < mine.len() && j < theirs.len() {
        match mine[i].0.cmp(&theirs[j].0) {
            Ordering::Equal => {
                let (a, sa) = (mine[i].1, mine[i].2);
                let (b, sb) = (theirs[j].1, theirs[j].2);
                let level = mg.level_mut(k + 1)?;
                level.element_mut(a)?.neighbors[sa] = Some(b);
                level.element_mut(b)?.neighbors[sb] = Some(a);
                i += 1;
                j += 1;
            }
            Ordering::Greater if ghost => i += 1,
            Ordering::Less if ghost => j += 1,
            _ => {
                return Err(RefineError::ReconciliationMismatch {
                    elem: id,
                    side,
                    left: mine.len(),
                    right: theirs.len(),
                });
            }
        }
    }
    Ok(())
}

/// The sons of `id` on father side `side` with their sorted side-corner
/// tuples, ordered descending for the merge walk.
fn keyed_sons(
    mg: &MultiGrid,
    k: usize,
    id: ElemId,
    side: usize,
    pass: &PassContext<'_>,
) -> Result<Vec<(SmallVec<[NodeId; 4]>, ElemId, usize)>, RefineError> {
    let fine = mg.level(k + 1)?;
    let mut out = Vec::new();
    for (child, cs) in sons_of_side(mg, k, id, side, pass)? {
        let mut nodes = fine.element(child)?.side_nodes(cs);
        nodes.sort_unstable();
        out.push((nodes, child, cs));
    }
    out.sort_unstable_by(|a, b| b.0.cmp(&a.0));
    Ok(out)
}

/// `(child, child side)` pairs of `id` lying on father side `side`.
fn sons_of_side(
    mg: &MultiGrid,
    k: usize,
    id: ElemId,
    side: usize,
    pass: &PassContext<'_>,
) -> Result<Vec<(ElemId, usize)>, RefineError> {
    let elem = mg.level(k)?.element(id)?;
    if elem.refine_class == ElementClass::Green && elem.green_by_cases() {
        return caseful_sons_of_side(mg, k, id, side);
    }
    let rule = pass.rules.rule(elem.shape, elem.refine)?;
    Ok(rule
        .sons_on_father_side(side)
        .into_iter()
        .map(|(i, j)| (elem.children[i as usize], j as usize))
        .collect())
}

/// Membership variant for caseful green families, which have no static
/// rule to consult: a son side lies on the father side exactly when all
/// of its corners descend from that side's corners, mids and face node.
fn caseful_sons_of_side(
    mg: &MultiGrid,
    k: usize,
    id: ElemId,
    side: usize,
) -> Result<Vec<(ElemId, usize)>, RefineError> {
    let coarse = mg.level(k)?;
    let elem = coarse.element(id)?;
    let shape = elem.shape;

    let mut set: SmallVec<[NodeId; 9]> = SmallVec::new();
    for &c in shape.corners_of_side(side) {
        if let Some(s) = coarse.node(elem.corners[c as usize])?.son {
            set.push(s);
        }
    }
    for &e in shape.edges_of_side(side) {
        if let Some(m) = coarse.edge(elem.edge_key(e as usize))?.mid {
            set.push(m);
        }
    }
    if shape.side_is_quad(side) {
        let sn = elem.side_nodes(side);
        let face = FaceKey::new([sn[0], sn[1], sn[2], sn[3]]);
        if let Some(&f) = coarse.face_nodes.get(&face) {
            set.push(f);
        }
    }

    let fine = mg.level(k + 1)?;
    let mut out = Vec::new();
    for &child in &elem.children {
        let son = fine.element(child)?;
        for s in 0..son.shape.side_count() {
            // Sibling-interior sides are already wired.
            if son.neighbors[s].is_some() {
                continue;
            }
            if son.side_nodes(s).iter().all(|n| set.contains(n)) {
                out.push((child, s));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NoGeometry;
    use crate::overlap::NoOverlay;
    use crate::refine::closure::close_grid;
    use crate::refine::synthesize::refine_grid;
    use crate::refine::{PassContext, RefineOptions, mark_refine};
    use crate::topology::shape::ElementShape;

    fn pass_fixture(options: &RefineOptions) -> PassContext<'_> {
        PassContext::new(options, &NoGeometry, &NoOverlay)
    }

    fn refine_once(mg: &mut MultiGrid, pass: &mut PassContext<'_>) {
        close_grid(mg, 0, pass).unwrap();
        mg.push_level();
        refine_grid(mg, 0, pass).unwrap();
    }

    #[test]
    fn boundary_flags_reach_fine_edges() {
        let mut mg = MultiGrid::build_2d(
            &[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]],
            &[
                (ElementShape::Triangle, &[0, 1, 2]),
                (ElementShape::Triangle, &[0, 2, 3]),
            ],
        )
        .unwrap();
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[0]).unwrap();
        refine_once(&mut mg, &mut pass);

        // Every fine boundary edge joins two boundary nodes and carries
        // the flag; the interior edges of the red family do not.
        let fine = mg.level(1).unwrap();
        let mut flagged = 0;
        for key in fine.sorted_edges() {
            let edge = fine.edge(key).unwrap();
            if edge.boundary {
                flagged += 1;
                assert!(fine.node(key.lo()).unwrap().boundary);
                assert!(fine.node(key.hi()).unwrap().boundary);
            }
        }
        // Two boundary sides of the red triangle split into four fine
        // edges; the green sons carry whole images of the neighbor's two
        // outer sides.
        assert_eq!(flagged, 4 + 2);
    }

    #[test]
    fn mixed_rule_and_caseful_faces_pair_one_to_one() {
        // Red tetrahedron over a pyramid: the tet's faces are split by
        // rule, the pyramid's by cases; the shared face must stitch.
        let mut mg = MultiGrid::build_3d(
            &[
                [0.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [2.0, 2.0, 0.0],
                [0.0, 2.0, 0.0],
                [1.0, 0.5, 2.0],
                [1.0, -1.5, 1.0],
            ],
            &[
                (ElementShape::Pyramid, &[0, 1, 2, 3, 4]),
                (ElementShape::Tetrahedron, &[1, 0, 5, 4]),
            ],
        )
        .unwrap();
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[1]).unwrap();
        refine_once(&mut mg, &mut pass);

        let coarse = mg.level(0).unwrap();
        let fine = mg.level(1).unwrap();
        let tet_children = coarse.element(ids[1]).unwrap().children.clone();
        let pyr_children = coarse.element(ids[0]).unwrap().children.clone();

        // The shared face is fully split: four sub-triangles, so four
        // mutual cross-family pairs.
        let mut pairs = 0;
        for &c in &tet_children {
            let e = fine.element(c).unwrap();
            for (s, nb) in e.neighbors.iter().enumerate() {
                let Some(nb) = *nb else { continue };
                if pyr_children.contains(&nb) {
                    pairs += 1;
                    let other = fine.element(nb).unwrap();
                    let back = other.side_of_neighbor(c).unwrap();
                    let mut a = e.side_nodes(s);
                    let mut b = other.side_nodes(back);
                    a.sort_unstable();
                    b.sort_unstable();
                    assert_eq!(a, b);
                }
            }
        }
        assert_eq!(pairs, 4);
        mg.check_invariants().unwrap();
    }

    #[test]
    fn unrefined_neighbors_are_left_alone() {
        // Three triangles in a strip; only the middle one refines red,
        // its neighbors go green, the far sides stay coarse.
        let mut mg = MultiGrid::build_2d(
            &[[0.0, 0.0], [2.0, 0.0], [4.0, 0.0], [4.0, 2.0], [2.0, 2.0], [0.0, 2.0]],
            &[
                (ElementShape::Triangle, &[0, 1, 5]),
                (ElementShape::Triangle, &[1, 4, 5]),
                (ElementShape::Triangle, &[1, 2, 4]),
                (ElementShape::Triangle, &[2, 3, 4]),
            ],
        )
        .unwrap();
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[1]).unwrap();
        refine_once(&mut mg, &mut pass);

        let coarse = mg.level(0).unwrap();
        // The outermost triangle shares no side with the red one and no
        // bisected edge, so it stays untouched.
        assert_eq!(coarse.element(ids[3]).unwrap().refine_class, ElementClass::None);
        assert!(coarse.element(ids[3]).unwrap().children.is_empty());
        mg.check_invariants().unwrap();
    }
}
