//! The adaptation pass: marks in, conforming multigrid out.
//!
//! A pass walks the level hierarchy twice. The downward sweep closes
//! each level and restricts fine demands onto fathers, so that requests
//! sitting on green or copied elements reach an element that is allowed
//! to refine in place. The upward sweep then settles each level for
//! real: stale derived marks are filtered, the closure negotiates the
//! final treatment of every element, copy marks buffer the refined
//! region, and the rebuild turns changed treatments into son families.
//! A new level appears when the top level refines; empty top levels are
//! popped at the end.
//!
//! Marks come in through [`mark_refine`] and [`mark_coarsen`] between
//! passes. Everything else on the element records is engine state.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::debug_invariants::DebugInvariants;
use crate::geometry::{BoundaryGeometry, NoGeometry};
use crate::grid::multigrid::MultiGrid;
use crate::mesh_error::RefineError;
use crate::overlap::{NoOverlay, PartitionOverlay};
use crate::rules::{COPY_MARK, FULL_MARK, RuleSet};
use crate::topology::class::{ElementClass, MarkId};
use crate::topology::point::ElemId;

pub(crate) mod closure;
pub(crate) mod connect;
pub(crate) mod context;
pub(crate) mod green;
pub(crate) mod restrict;
pub(crate) mod synthesize;
pub(crate) mod unrefine;

use closure::close_grid;
use restrict::restrict_marks;
use synthesize::refine_grid;

/// Which unmarked elements receive buffering copy marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CopyMode {
    /// No copies; the refined region ends hard.
    None,
    /// Copy the side neighbors of refined elements.
    #[default]
    Neighborhood,
    /// Copy every unmarked element of the level.
    All,
}

/// Knobs of a refinement pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineOptions {
    pub copy_mode: CopyMode,
    /// Upper bound on closure sweeps per level before the pass gives up.
    pub max_closure_sweeps: usize,
}

impl Default for RefineOptions {
    fn default() -> Self {
        RefineOptions {
            copy_mode: CopyMode::default(),
            max_closure_sweeps: 8,
        }
    }
}

/// What a refinement pass did, for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassReport {
    /// Elements carrying a red or green mark after closure.
    pub marked: usize,
    /// Families built or rebuilt.
    pub rebuilt: usize,
    /// Families removed without replacement.
    pub coarsened: usize,
    /// Green marks among `marked`.
    pub green_marks: usize,
    /// Green families whose standing sons were kept as-is.
    pub green_updates_skipped: usize,
    pub levels_added: usize,
    pub levels_removed: usize,
}

/// Everything a pass carries besides the grid itself.
pub(crate) struct PassContext<'a> {
    pub options: &'a RefineOptions,
    pub rules: &'static RuleSet,
    pub geometry: &'a dyn BoundaryGeometry,
    pub overlay: &'a dyn PartitionOverlay,
    pub report: PassReport,
}

impl<'a> PassContext<'a> {
    pub fn new(
        options: &'a RefineOptions,
        geometry: &'a dyn BoundaryGeometry,
        overlay: &'a dyn PartitionOverlay,
    ) -> Self {
        PassContext {
            options,
            rules: RuleSet::global(),
            geometry,
            overlay,
            report: PassReport::default(),
        }
    }
}

/// Requests full regular refinement of one element.
pub fn mark_refine(mg: &mut MultiGrid, k: usize, id: ElemId) -> Result<(), RefineError> {
    let e = mg.level_mut(k)?.element_mut(id)?;
    e.mark = FULL_MARK;
    e.mark_class = ElementClass::Red;
    e.coarsen = false;
    Ok(())
}

/// Flags one element as removable; the family goes only when every
/// sibling agrees and nothing finer objects.
pub fn mark_coarsen(mg: &mut MultiGrid, k: usize, id: ElemId) -> Result<(), RefineError> {
    mg.level_mut(k)?.element_mut(id)?.coarsen = true;
    Ok(())
}

/// Withdraws any request on one element.
pub fn clear_mark(mg: &mut MultiGrid, k: usize, id: ElemId) -> Result<(), RefineError> {
    let e = mg.level_mut(k)?.element_mut(id)?;
    e.mark = MarkId::NONE;
    e.mark_class = ElementClass::None;
    e.coarsen = false;
    Ok(())
}

/// Runs one adaptation pass with default options and no boundary
/// geometry.
pub fn refine_multigrid(mg: &mut MultiGrid) -> Result<PassReport, RefineError> {
    let options = RefineOptions::default();
    refine_multigrid_with(mg, &options, &NoGeometry, &NoOverlay)
}

/// Runs one adaptation pass.
pub fn refine_multigrid_with(
    mg: &mut MultiGrid,
    options: &RefineOptions,
    geometry: &dyn BoundaryGeometry,
    overlay: &dyn PartitionOverlay,
) -> Result<PassReport, RefineError> {
    let mut pass = PassContext::new(options, geometry, overlay);

    // Downward: close each level so restriction reads final treatments,
    // then pull fine demands onto the fathers.
    for k in (1..=mg.top_level()).rev() {
        close_grid(mg, k, &mut pass)?;
        restrict_marks(mg, k - 1, &pass)?;
    }

    // Upward: settle each level and rebuild what changed.
    let mut k = 0;
    while k <= mg.top_level() {
        filter_marks(mg, k)?;
        let stats = close_grid(mg, k, &mut pass)?;
        pass.report.marked += stats.marked;
        pass.report.green_marks += stats.green;
        compute_copies(mg, k, &pass)?;
        if k == mg.top_level() && stats.marked > 0 {
            mg.push_level();
            pass.report.levels_added += 1;
        }
        if k < mg.top_level() {
            refine_grid(mg, k, &mut pass)?;
        }
        k += 1;
    }

    while mg.pop_empty_top_level() {
        pass.report.levels_removed += 1;
    }

    // The rebuild consumes coarsening flags level by level; the finest
    // level never rebuilds, so its flags are consumed here.
    let top = mg.top_level();
    for id in mg.level(top)?.sorted_elements() {
        mg.level_mut(top)?.element_mut(id)?.coarsen = false;
    }

    mg.debug_assert_invariants();
    debug!(
        "pass done: {} marked ({} green), {} rebuilt, {} coarsened, top level {}",
        pass.report.marked,
        pass.report.green_marks,
        pass.report.rebuilt,
        pass.report.coarsened,
        mg.top_level()
    );
    Ok(pass.report)
}

/// Drops derived marks so the upward closure starts from requests alone.
/// Only red marks on regular elements persist; green marks, copies and
/// anything sitting on an element that cannot refine in place are
/// re-derived each pass.
fn filter_marks(mg: &mut MultiGrid, k: usize) -> Result<(), RefineError> {
    let ids = mg.level(k)?.sorted_elements();
    let level = mg.level_mut(k)?;
    for &id in &ids {
        let e = level.element_mut(id)?;
        if e.mark.is_some()
            && !(e.class == ElementClass::Red && e.mark_class == ElementClass::Red)
        {
            e.mark = MarkId::NONE;
            e.mark_class = ElementClass::None;
        }
    }
    Ok(())
}

/// Marks buffering copies around the refined region. Copies are derived
/// state like green marks: they are cleared by the next pass's filter
/// and re-appear for as long as the refined region keeps its shape.
fn compute_copies(
    mg: &mut MultiGrid,
    k: usize,
    pass: &PassContext<'_>,
) -> Result<(), RefineError> {
    if pass.options.copy_mode == CopyMode::None {
        return Ok(());
    }
    let ids = mg.level(k)?.sorted_elements();
    for &id in &ids {
        let copy = {
            let level = mg.level(k)?;
            let e = level.element(id)?;
            if e.mark.is_some() {
                false
            } else if pass.options.copy_mode == CopyMode::All {
                true
            } else {
                let mut near = false;
                for nb in e.neighbors.iter().flatten() {
                    let c = level.element(*nb)?.mark_class;
                    if c == ElementClass::Red || c == ElementClass::Green {
                        near = true;
                        break;
                    }
                }
                near
            }
        };
        if copy {
            let e = mg.level_mut(k)?.element_mut(id)?;
            e.mark = COPY_MARK;
            e.mark_class = ElementClass::Yellow;
        }
    }
    Ok(())
}
