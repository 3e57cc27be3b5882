//! Downward mark restriction: families answer for their children.
//!
//! Marks on green or copied children cannot be honored in place, since
//! those classes are cleared before the upward sweep refines anything.
//! The demand transfers to the father instead: a green-refined father is
//! upgraded to a red treatment covering the finer structure, a
//! red-refined father re-asserts its standing rule so the family stays
//! put. Coarsening travels the same road in reverse: a family is
//! released only when every child agrees and none of them is refined
//! red, and the father then casts the same vote one level down, so a
//! stack of green families can collapse in a single pass.

use crate::grid::multigrid::MultiGrid;
use crate::mesh_error::RefineError;
use crate::refine::PassContext;
use crate::rules::FULL_MARK;
use crate::topology::class::{ElementClass, MarkId};
use crate::topology::point::{EdgeKey, ElemId};
use crate::topology::shape::ElementShape;

/// Restricts fine marks on level `k + 1` onto their fathers on level `k`
/// and applies the coarsening gate.
pub(crate) fn restrict_marks(
    mg: &mut MultiGrid,
    k: usize,
    pass: &PassContext<'_>,
) -> Result<(), RefineError> {
    let ids = mg.level(k)?.sorted_elements();
    for &id in &ids {
        let (shape, class, refine, refine_class, fresh_red, children) = {
            let e = mg.level(k)?.element(id)?;
            (
                e.shape,
                e.class,
                e.refine,
                e.refine_class,
                // A standing mark equal to the applied treatment is not a
                // request; only a new red demand vetoes coarsening.
                e.mark_class == ElementClass::Red && e.treatment_changes(),
                e.children.clone(),
            )
        };
        if refine_class == ElementClass::None {
            continue;
        }
        // Green and copied elements never refine in place, and neither do
        // the children of a copy; their marks restrict one level further
        // up instead.
        if class == ElementClass::Yellow
            || class == ElementClass::Green
            || refine_class == ElementClass::Yellow
        {
            continue;
        }

        let fine = mg.level(k + 1)?;
        let mut needy = false;
        let mut all_coarsen = !children.is_empty();
        let mut any_red_refined = false;
        for &child in &children {
            let c = fine.element(child)?;
            if c.mark.is_some() && c.mark_class >= ElementClass::Green {
                needy = true;
            }
            if !c.coarsen {
                all_coarsen = false;
            }
            if c.refine_class == ElementClass::Red {
                any_red_refined = true;
            }
        }

        if needy {
            let mark = match refine_class {
                ElementClass::Green => restricted_mark(mg, k, id, shape, refine, pass)?,
                _ => refine,
            };
            let e = mg.level_mut(k)?.element_mut(id)?;
            e.mark = mark;
            e.mark_class = ElementClass::Red;
            continue;
        }

        if all_coarsen && !any_red_refined && !fresh_red {
            let e = mg.level_mut(k)?.element_mut(id)?;
            e.mark = MarkId::NONE;
            e.mark_class = ElementClass::None;
            // The released family's father now votes like its children
            // did, so the next restriction step can release the level
            // below as well.
            e.coarsen = true;
        }
    }
    Ok(())
}

/// A red mark replacing a green treatment, wide enough to cover both the
/// applied rule and the bisections requested among the children.
///
/// Tetrahedra keep their pattern precise: the rule's edge bits are
/// joined with every unbisected father edge, except those whose
/// spanning fine edge picks up a real mid on the fine level anyway.
/// The other shapes fall back to full refinement.
fn restricted_mark(
    mg: &MultiGrid,
    k: usize,
    id: ElemId,
    shape: ElementShape,
    refine: MarkId,
    pass: &PassContext<'_>,
) -> Result<MarkId, RefineError> {
    if shape != ElementShape::Tetrahedron {
        return Ok(FULL_MARK);
    }
    let coarse = mg.level(k)?;
    let fine = mg.level(k + 1)?;
    let elem = coarse.element(id)?;
    let mut pattern = pass.rules.mark_to_pattern(shape, refine)? & 0x3F;
    for e in 0..shape.edge_count() {
        if pattern & (1 << e) != 0 {
            continue;
        }
        let (a, b) = elem.edge_nodes(e);
        let (Some(sa), Some(sb)) = (coarse.node(a)?.son, coarse.node(b)?.son) else {
            continue;
        };
        // An unbisected father edge spans exactly one fine edge between
        // the two corner sons. Only edges the fine level does not
        // bisect itself join the pattern.
        if let Some(edge) = fine.edges.get(&EdgeKey::new(sa, sb)) {
            if edge.add_pattern {
                pattern |= 1 << e;
            }
        }
    }
    // Restricted marks use the default diagonals, and a default variant
    // exists for every tetrahedron edge pattern.
    Ok(pass.rules.pattern_to_mark(shape, pattern).unwrap_or(FULL_MARK))
}
