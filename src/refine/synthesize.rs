//! Element rebuild: turning negotiated marks into son families.
//!
//! The level is processed in two passes. The first disposes stale
//! families and creates the new sons of every element whose treatment
//! changed; the second stitches sons across element sides, once all
//! families on the level are current. Stitching inside the first pass
//! would see half-built neighbors.

use hashbrown::HashSet;
use smallvec::SmallVec;

use crate::grid::multigrid::MultiGrid;
use crate::mesh_error::RefineError;
use crate::refine::PassContext;
use crate::refine::connect::connect_sons_of_element_side;
use crate::refine::context::{ElementContext, build_context};
use crate::refine::green::green_sons;
use crate::refine::unrefine::unrefine_element;
use crate::rules::{Rule, SonNeighbor, build_rule};
use crate::topology::class::{ElementClass, MarkId};
use crate::topology::point::{ElemId, NodeId};
use crate::topology::shape::ElementShape;

/// Applies the marks negotiated by closure to level `k`: rebuilds every
/// element whose treatment changed, wires the new sons, and consumes the
/// coarsening flags.
pub(crate) fn refine_grid(
    mg: &mut MultiGrid,
    k: usize,
    pass: &mut PassContext<'_>,
) -> Result<(), RefineError> {
    let ids = mg.level(k)?.sorted_elements();

    let mut rebuilt: HashSet<ElemId> = HashSet::new();
    for &id in &ids {
        let (rebuild, unchanged_green) = {
            let e = mg.level(k)?.element(id)?;
            let rebuild =
                e.treatment_changes() || (e.mark_class == ElementClass::Green && e.used);
            let unchanged = !rebuild && e.mark_class == ElementClass::Green && !e.used;
            (rebuild, unchanged)
        };
        if unchanged_green {
            pass.report.green_updates_skipped += 1;
        }
        if rebuild {
            rebuild_element(mg, k, id, pass)?;
            if mg.level(k)?.element(id)?.refine_class != ElementClass::None {
                rebuilt.insert(id);
            }
        }
    }

    for &id in &ids {
        if !rebuilt.contains(&id) {
            continue;
        }
        let side_count = mg.level(k)?.element(id)?.shape.side_count();
        for side in 0..side_count {
            connect_sons_of_element_side(mg, k, id, side, &rebuilt, pass)?;
        }
    }

    for &id in &ids {
        mg.level_mut(k)?.element_mut(id)?.coarsen = false;
    }
    Ok(())
}

/// Disposes the old family of `id` and builds the one its mark asks for.
fn rebuild_element(
    mg: &mut MultiGrid,
    k: usize,
    id: ElemId,
    pass: &mut PassContext<'_>,
) -> Result<(), RefineError> {
    let (shape, mark, mark_class, side_pattern, had_family, caseful_green) = {
        let e = mg.level(k)?.element(id)?;
        (
            e.shape,
            e.mark,
            e.mark_class,
            e.side_pattern,
            e.refine_class != ElementClass::None,
            e.mark_class == ElementClass::Green && e.green_by_cases(),
        )
    };

    if had_family {
        unrefine_element(mg, k, id)?;
    }
    if mark == MarkId::NONE {
        if had_family {
            pass.report.coarsened += 1;
        }
        return Ok(());
    }

    let static_rule = if caseful_green {
        None
    } else {
        Some(pass.rules.rule(shape, mark)?)
    };
    let with_center = static_rule.map(|r| r.uses_center(shape)).unwrap_or(true);
    let ctx = build_context(mg, k, id, with_center, pass)?;

    let owned_rule;
    let rule: &Rule = match static_rule {
        Some(r) => r,
        None => {
            // No table covers the irregular pattern; assemble the family
            // from the side facets and derive its adjacency ad hoc.
            let mut sons = green_sons(shape, side_pattern, &ctx.slots);
            for (son_shape, corners) in &mut sons {
                orient_slots(mg, k + 1, id, &ctx, *son_shape, corners)?;
            }
            let son_refs: Vec<(ElementShape, &[u8])> =
                sons.iter().map(|(s, c)| (*s, c.as_slice())).collect();
            owned_rule = build_rule(shape, mark, ElementClass::Green, &son_refs)?;
            &owned_rule
        }
    };

    let children = create_family(mg, k, id, rule, &ctx, pass)?;
    {
        let e = mg.level_mut(k)?.element_mut(id)?;
        e.children = children;
        e.refine = mark;
        e.refine_class = mark_class;
        e.refine_side_pattern = e.side_pattern;
        e.used = false;
    }
    pass.report.rebuilt += 1;
    Ok(())
}

/// Instantiates the sons of `rule` for `id` and wires sibling links.
fn create_family(
    mg: &mut MultiGrid,
    k: usize,
    id: ElemId,
    rule: &Rule,
    ctx: &ElementContext,
    pass: &PassContext<'_>,
) -> Result<SmallVec<[ElemId; 8]>, RefineError> {
    let mut child_ids: SmallVec<[ElemId; 8]> = SmallVec::new();
    for son in &rule.sons {
        let corners: SmallVec<[NodeId; 8]> = son
            .corners
            .iter()
            .map(|&s| ctx.node(id, s as usize))
            .collect::<Result<_, _>>()?;
        let cid = mg.create_element(k + 1, son.shape, corners, Some(id))?;
        mg.level_mut(k + 1)?.element_mut(cid)?.class = rule.class;
        pass.overlay.element_created(k + 1, cid);
        child_ids.push(cid);
    }
    for (i, son) in rule.sons.iter().enumerate() {
        for (side, nb) in son.neighbors.iter().enumerate() {
            if let SonNeighbor::Sibling(j) = *nb {
                mg.level_mut(k + 1)?.element_mut(child_ids[i])?.neighbors[side] =
                    Some(child_ids[j as usize]);
            }
        }
    }
    Ok(child_ids)
}

/// Restores positive orientation of an ad-hoc son, permuting its slot
/// list in place. Facet cycles come out of the side split with arbitrary
/// handedness relative to the center.
fn orient_slots(
    mg: &MultiGrid,
    fine: usize,
    id: ElemId,
    ctx: &ElementContext,
    shape: ElementShape,
    corners: &mut SmallVec<[u8; 8]>,
) -> Result<(), RefineError> {
    let level = mg.level(fine)?;
    let mut pos = [[0f64; 3]; 8];
    for (i, &slot) in corners.iter().enumerate() {
        let n = ctx.node(id, slot as usize)?;
        pos[i] = level.node(n)?.pos;
    }
    match shape {
        ElementShape::Tetrahedron => {
            if signed_volume(pos[0], pos[1], pos[2], pos[3]) < 0.0 {
                corners.swap(0, 1);
            }
        }
        ElementShape::Pyramid => {
            // Base cycle reversed keeps corner 0 in place.
            if signed_volume(pos[0], pos[1], pos[2], pos[4]) < 0.0 {
                corners.swap(1, 3);
            }
        }
        _ => {}
    }
    Ok(())
}

fn signed_volume(a: [f64; 3], b: [f64; 3], c: [f64; 3], d: [f64; 3]) -> f64 {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let w = [d[0] - a[0], d[1] - a[1], d[2] - a[2]];
    u[0] * (v[1] * w[2] - v[2] * w[1]) - u[1] * (v[0] * w[2] - v[2] * w[0])
        + u[2] * (v[0] * w[1] - v[1] * w[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NoGeometry;
    use crate::overlap::NoOverlay;
    use crate::refine::closure::close_grid;
    use crate::refine::{PassContext, RefineOptions, mark_refine};
    use crate::rules::FULL_MARK;

    fn pass_fixture(options: &RefineOptions) -> PassContext<'_> {
        PassContext::new(options, &NoGeometry, &NoOverlay)
    }

    fn two_triangles() -> MultiGrid {
        MultiGrid::build_2d(
            &[[0.0, 0.0], [2.0, 0.0], [2.0, 2.0], [0.0, 2.0]],
            &[
                (ElementShape::Triangle, &[0, 1, 2]),
                (ElementShape::Triangle, &[0, 2, 3]),
            ],
        )
        .unwrap()
    }

    fn close_and_refine(mg: &mut MultiGrid, pass: &mut PassContext<'_>) {
        close_grid(mg, 0, pass).unwrap();
        mg.push_level();
        refine_grid(mg, 0, pass).unwrap();
    }

    #[test]
    fn red_triangle_builds_four_sons() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = two_triangles();
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[0]).unwrap();
        close_and_refine(&mut mg, &mut pass);

        let coarse = mg.level(0).unwrap();
        let red = coarse.element(ids[0]).unwrap();
        assert_eq!(red.children.len(), 4);
        assert_eq!(red.refine, FULL_MARK);
        assert_eq!(red.refine_class, ElementClass::Red);

        // The neighbor went green over the shared diagonal: two sons.
        let green = coarse.element(ids[1]).unwrap();
        assert_eq!(green.children.len(), 2);
        assert_eq!(green.refine_class, ElementClass::Green);

        let fine = mg.level(1).unwrap();
        assert_eq!(fine.elem_count(), 6);
        for &c in &red.children {
            assert_eq!(fine.element(c).unwrap().class, ElementClass::Red);
        }
        for &c in &green.children {
            assert_eq!(fine.element(c).unwrap().class, ElementClass::Green);
        }
        mg.check_invariants().unwrap();
    }

    #[test]
    fn sons_are_stitched_across_the_shared_side() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = two_triangles();
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[0]).unwrap();
        close_and_refine(&mut mg, &mut pass);

        // Exactly two fine neighbor pairs cross the old diagonal: the
        // red sons on side (0,2) against the green halves.
        let fine = mg.level(1).unwrap();
        let red_children = mg.level(0).unwrap().element(ids[0]).unwrap().children.clone();
        let green_children = mg.level(0).unwrap().element(ids[1]).unwrap().children.clone();
        let mut crossings = 0;
        for &c in &red_children {
            let e = fine.element(c).unwrap();
            for nb in e.neighbors.iter().flatten() {
                if green_children.contains(nb) {
                    crossings += 1;
                }
            }
        }
        assert_eq!(crossings, 2);
        mg.check_invariants().unwrap();
    }

    #[test]
    fn boundary_sides_pass_to_the_sons() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = two_triangles();
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[0]).unwrap();
        close_and_refine(&mut mg, &mut pass);

        let fine = mg.level(1).unwrap();
        let red_children = mg.level(0).unwrap().element(ids[0]).unwrap().children.clone();
        // Sides 0 and 1 of the first triangle are domain boundary; each
        // contributes two son sides.
        let mut boundary_sides = 0;
        for &c in &red_children {
            boundary_sides += fine.element(c).unwrap().boundary_sides.count_ones();
        }
        assert_eq!(boundary_sides, 4);
    }

    #[test]
    fn unmarking_disposes_the_family() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = two_triangles();
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[0]).unwrap();
        close_and_refine(&mut mg, &mut pass);
        assert!(mg.level(1).unwrap().elem_count() > 0);

        // Take both marks back; every family goes.
        for &id in &ids {
            let e = mg.level_mut(0).unwrap().element_mut(id).unwrap();
            e.mark = MarkId::NONE;
            e.mark_class = ElementClass::None;
        }
        close_grid(&mut mg, 0, &mut pass).unwrap();
        refine_grid(&mut mg, 0, &mut pass).unwrap();

        assert_eq!(mg.level(1).unwrap().elem_count(), 0);
        assert_eq!(mg.level(1).unwrap().node_count(), 0);
        assert_eq!(pass.report.coarsened, 2);
        mg.check_invariants().unwrap();
    }

    #[test]
    fn stable_marks_rebuild_nothing() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = two_triangles();
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[0]).unwrap();
        close_and_refine(&mut mg, &mut pass);

        let before: Vec<ElemId> = mg.level(1).unwrap().sorted_elements();
        let rebuilt_before = pass.report.rebuilt;

        // Same marks again: closure re-derives the same treatment and
        // the rebuild pass leaves the families alone.
        close_grid(&mut mg, 0, &mut pass).unwrap();
        refine_grid(&mut mg, 0, &mut pass).unwrap();

        assert_eq!(mg.level(1).unwrap().sorted_elements(), before);
        assert_eq!(pass.report.rebuilt, rebuilt_before);
        assert_eq!(pass.report.green_updates_skipped, 1);
    }

    #[test]
    fn red_tet_family_fills_the_volume() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        let mut mg = MultiGrid::build_3d(
            &[
                [0.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [0.0, 2.0, 0.0],
                [0.0, 0.0, 2.0],
            ],
            &[(ElementShape::Tetrahedron, &[0, 1, 2, 3])],
        )
        .unwrap();
        let id = mg.level(0).unwrap().sorted_elements()[0];
        mark_refine(&mut mg, 0, id).unwrap();
        close_and_refine(&mut mg, &mut pass);

        let coarse = mg.level(0).unwrap();
        let e = coarse.element(id).unwrap();
        assert_eq!(e.children.len(), 8);
        assert_eq!(e.refine_class, ElementClass::Red);
        mg.check_invariants().unwrap();
    }

    #[test]
    fn green_pyramid_family_is_oriented_and_wired() {
        let options = RefineOptions::default();
        let mut pass = pass_fixture(&options);
        // A pyramid under a red tetrahedron; the tet bisects the three
        // edges of the shared face, the pyramid follows by cases.
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
        let ids = mg.level(0).unwrap().sorted_elements();
        mark_refine(&mut mg, 0, ids[1]).unwrap();
        close_and_refine(&mut mg, &mut pass);

        let coarse = mg.level(0).unwrap();
        let pyr = coarse.element(ids[0]).unwrap();
        assert_eq!(pyr.refine_class, ElementClass::Green);
        assert!(!pyr.children.is_empty());

        // Every caseful son has positive volume.
        let fine = mg.level(1).unwrap();
        for &c in &pyr.children {
            let son = fine.element(c).unwrap();
            let p: Vec<[f64; 3]> = son
                .corners
                .iter()
                .map(|&n| fine.node(n).unwrap().pos)
                .collect();
            let apex = if son.shape == ElementShape::Pyramid { p[4] } else { p[3] };
            assert!(signed_volume(p[0], p[1], p[2], apex) > 0.0);
        }
        mg.check_invariants().unwrap();
    }
}
