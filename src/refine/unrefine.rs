//! Family disposal, deepest descendants first.

use crate::grid::multigrid::MultiGrid;
use crate::mesh_error::RefineError;
use crate::topology::class::{ElementClass, MarkId};
use crate::topology::point::ElemId;

/// Disposes the whole family of `id` on level `k` and clears the applied
/// treatment. Nodes and edges that die with the family are released by
/// the grid, which also severs their coarse back-references. Returns the
/// number of elements removed.
pub(crate) fn unrefine_element(
    mg: &mut MultiGrid,
    k: usize,
    id: ElemId,
) -> Result<usize, RefineError> {
    let children: Vec<ElemId> = mg.level(k)?.element(id)?.children.to_vec();
    let mut disposed = 0;
    for &child in &children {
        disposed += unrefine_element(mg, k + 1, child)?;
        mg.dispose_element(k + 1, child)?;
        disposed += 1;
    }
    {
        let elem = mg.level_mut(k)?.element_mut(id)?;
        elem.children.clear();
        elem.refine = MarkId::NONE;
        elem.refine_class = ElementClass::None;
        elem.refine_side_pattern = 0;
    }
    Ok(disposed)
}
