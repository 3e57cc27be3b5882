//! The multigrid: an ordered stack of levels plus handle allocation.

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::debug_invariants::DebugInvariants;
use crate::grid::element::Element;
use crate::grid::level::Level;
use crate::grid::node::{Node, NodeFather};
use crate::mesh_error::RefineError;
use crate::topology::class::{ElementClass, NodeKind};
use crate::topology::point::{EdgeKey, ElemId, NodeId};
use crate::topology::shape::ElementShape;

/// A hierarchy of grid levels, each finer than the last.
///
/// All handles are allocated from two multigrid-wide counters, so a node
/// or element id never recurs after disposal and handles stay valid as
/// map keys across passes.
#[derive(Debug, Clone)]
pub struct MultiGrid {
    dim: u8,
    pub(crate) levels: Vec<Level>,
    next_node: u64,
    next_elem: u64,
}

impl MultiGrid {
    /// Assembles a 2-D coarse grid from vertex positions and cells.
    ///
    /// Cells are `(shape, corner indices)` with corners in the shape's
    /// reference order. Neighbor links are derived by matching side corner
    /// sets; sides without a twin become domain boundary.
    pub fn build_2d(
        positions: &[[f64; 2]],
        cells: &[(ElementShape, &[usize])],
    ) -> Result<Self, RefineError> {
        let pos3: Vec<[f64; 3]> = positions.iter().map(|p| [p[0], p[1], 0.0]).collect();
        Self::build(2, &pos3, cells)
    }

    /// Assembles a 3-D coarse grid from vertex positions and cells.
    pub fn build_3d(
        positions: &[[f64; 3]],
        cells: &[(ElementShape, &[usize])],
    ) -> Result<Self, RefineError> {
        Self::build(3, positions, cells)
    }

    fn build(
        dim: u8,
        positions: &[[f64; 3]],
        cells: &[(ElementShape, &[usize])],
    ) -> Result<Self, RefineError> {
        let mut mg = MultiGrid {
            dim,
            levels: vec![Level::new()],
            next_node: 0,
            next_elem: 0,
        };
        let node_ids: Vec<NodeId> = positions
            .iter()
            .map(|&p| mg.create_node(0, NodeKind::Corner, p, None, false))
            .collect::<Result<_, _>>()?;

        let mut elem_ids = Vec::with_capacity(cells.len());
        for (index, &(shape, verts)) in cells.iter().enumerate() {
            if shape.dimension() != dim {
                return Err(RefineError::DimensionMismatch {
                    index,
                    shape,
                    expected: dim,
                });
            }
            if verts.len() != shape.corner_count() {
                return Err(RefineError::CornerCount {
                    index,
                    expected: shape.corner_count(),
                    found: verts.len(),
                });
            }
            let mut corners: SmallVec<[NodeId; 8]> = SmallVec::new();
            for &v in verts {
                let id = *node_ids.get(v).ok_or(RefineError::InvalidVertex {
                    index,
                    vertex: v,
                    count: node_ids.len(),
                })?;
                corners.push(id);
            }
            let id = mg.create_element(0, shape, corners, None)?;
            mg.levels[0].element_mut(id)?.class = ElementClass::Red;
            elem_ids.push(id);
        }

        // Pair sides by their sorted corner sets; the leftovers are the
        // domain boundary.
        let mut open: HashMap<SmallVec<[NodeId; 4]>, (ElemId, usize)> = HashMap::new();
        for &id in &elem_ids {
            let elem = mg.levels[0].element(id)?;
            let shape = elem.shape;
            let side_keys: Vec<SmallVec<[NodeId; 4]>> = (0..shape.side_count())
                .map(|s| {
                    let mut key = elem.side_nodes(s);
                    key.sort_unstable();
                    key
                })
                .collect();
            for (side, key) in side_keys.into_iter().enumerate() {
                match open.remove(&key) {
                    None => {
                        open.insert(key, (id, side));
                    }
                    Some((other, other_side)) => {
                        if mg.levels[0].element(other)?.neighbors[other_side].is_some() {
                            return Err(RefineError::NonManifoldSide { elem: id, side });
                        }
                        mg.levels[0].element_mut(id)?.neighbors[side] = Some(other);
                        mg.levels[0].element_mut(other)?.neighbors[other_side] = Some(id);
                    }
                }
            }
        }
        for (_, (id, side)) in open.drain() {
            let (on_side, side_edges) = {
                let elem = mg.levels[0].element_mut(id)?;
                elem.boundary_sides |= 1 << side;
                let keys: SmallVec<[EdgeKey; 4]> = elem
                    .shape
                    .edges_of_side(side)
                    .iter()
                    .map(|&e| elem.edge_key(e as usize))
                    .collect();
                (elem.side_nodes(side), keys)
            };
            for n in on_side {
                mg.levels[0].node_mut(n)?.boundary = true;
            }
            for key in side_edges {
                mg.levels[0].edge_mut(key)?.boundary = true;
            }
        }
        Ok(mg)
    }

    pub fn dim(&self) -> u8 {
        self.dim
    }

    /// Index of the finest level.
    pub fn top_level(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn level(&self, k: usize) -> Result<&Level, RefineError> {
        self.levels.get(k).ok_or(RefineError::NoSuchLevel(k))
    }

    pub fn level_mut(&mut self, k: usize) -> Result<&mut Level, RefineError> {
        self.levels.get_mut(k).ok_or(RefineError::NoSuchLevel(k))
    }

    /// Appends a new, empty finest level and returns its index.
    pub(crate) fn push_level(&mut self) -> usize {
        self.levels.push(Level::new());
        self.top_level()
    }

    /// Drops the finest level if it carries no elements. Returns whether a
    /// level was removed.
    pub(crate) fn pop_empty_top_level(&mut self) -> bool {
        if self.levels.len() > 1 && self.levels[self.top_level()].is_empty() {
            let level = self.levels.pop();
            debug_assert!(level.is_some_and(|l| l.node_count() == 0 && l.edge_count() == 0));
            true
        } else {
            false
        }
    }

    fn alloc_node_id(&mut self) -> Result<NodeId, RefineError> {
        self.next_node = self
            .next_node
            .checked_add(1)
            .ok_or(RefineError::AllocationFailure { entity: "node" })?;
        Ok(NodeId::new(self.next_node))
    }

    fn alloc_elem_id(&mut self) -> Result<ElemId, RefineError> {
        self.next_elem = self
            .next_elem
            .checked_add(1)
            .ok_or(RefineError::AllocationFailure { entity: "element" })?;
        Ok(ElemId::new(self.next_elem))
    }

    /// Creates a node on level `k`.
    pub(crate) fn create_node(
        &mut self,
        k: usize,
        kind: NodeKind,
        pos: [f64; 3],
        father: Option<NodeFather>,
        boundary: bool,
    ) -> Result<NodeId, RefineError> {
        let id = self.alloc_node_id()?;
        self.level_mut(k)?
            .nodes
            .insert(id, Node::new(kind, pos, father, boundary));
        Ok(id)
    }

    /// Creates an element on level `k` and registers its corner and edge
    /// references. Neighbor wiring and the father's child list are the
    /// caller's business.
    pub(crate) fn create_element(
        &mut self,
        k: usize,
        shape: ElementShape,
        corners: SmallVec<[NodeId; 8]>,
        father: Option<ElemId>,
    ) -> Result<ElemId, RefineError> {
        let id = self.alloc_elem_id()?;
        let mut elem = Element::new(shape, corners);
        elem.father = father;
        self.level_mut(k)?.attach_element(id, elem)?;
        Ok(id)
    }

    /// Disposes one childless element: removes it from its level, clears
    /// every neighbor reference to it, and releases the nodes and edges
    /// that die with it (clearing their coarse back-references).
    pub(crate) fn dispose_element(&mut self, k: usize, id: ElemId) -> Result<(), RefineError> {
        if k >= self.levels.len() {
            return Err(RefineError::NoSuchLevel(k));
        }
        let (below, rest) = self.levels.split_at_mut(k);
        let level = &mut rest[0];
        let mut coarse = below.last_mut();

        let (elem, dead_nodes, _dead_edges) = level.detach_element(id)?;
        debug_assert!(elem.children.is_empty(), "disposing element with children");
        for nb in elem.neighbors.iter().flatten() {
            if let Some(other) = level.elements.get_mut(nb) {
                for slot in other.neighbors.iter_mut() {
                    if *slot == Some(id) {
                        *slot = None;
                    }
                }
            }
        }
        for n in dead_nodes {
            let father = level.node(n)?.father;
            let Some(father) = father else {
                // Coarse-mesh vertices stay even when transiently unused.
                continue;
            };
            level.nodes.remove(&n);
            if let Some(coarse) = coarse.as_deref_mut() {
                match father {
                    NodeFather::Corner(c) => {
                        if let Some(cn) = coarse.nodes.get_mut(&c) {
                            cn.son = None;
                        }
                    }
                    NodeFather::Mid(key) => {
                        if let Some(edge) = coarse.edges.get_mut(&key) {
                            edge.mid = None;
                        }
                    }
                    NodeFather::Side(face) => {
                        coarse.face_nodes.remove(&face);
                    }
                    NodeFather::Center(_) => {}
                }
            }
        }
        Ok(())
    }

    /// Total elements across all levels.
    pub fn total_elem_count(&self) -> usize {
        self.levels.iter().map(Level::elem_count).sum()
    }

    /// Total nodes across all levels.
    pub fn total_node_count(&self) -> usize {
        self.levels.iter().map(Level::node_count).sum()
    }

    /// First violated structural invariant, if any: mutual neighbors,
    /// father/child agreement, edge and node reference counts.
    pub fn check_invariants(&self) -> Result<(), RefineError> {
        for (k, level) in self.levels.iter().enumerate() {
            for (&id, elem) in &level.elements {
                for (side, nb) in elem.neighbors.iter().enumerate() {
                    let Some(nb) = *nb else { continue };
                    let other = level.element(nb)?;
                    if other.side_of_neighbor(id).is_none() {
                        return Err(RefineError::NonMutualNeighbor { a: id, b: nb, side });
                    }
                }
                for &child in &elem.children {
                    let fine = self.level(k + 1)?;
                    if fine.element(child)?.father != Some(id) {
                        return Err(RefineError::FatherMismatch {
                            parent: id,
                            child,
                        });
                    }
                }
            }

            let mut edge_counts: HashMap<_, u32> = HashMap::new();
            for elem in level.elements.values() {
                for e in 0..elem.shape.edge_count() {
                    *edge_counts.entry(elem.edge_key(e)).or_insert(0) += 1;
                }
            }
            for (&key, edge) in &level.edges {
                let counted = edge_counts.get(&key).copied().unwrap_or(0);
                if counted != edge.elem_count {
                    return Err(RefineError::EdgeRefCount {
                        key,
                        recorded: edge.elem_count,
                        counted,
                    });
                }
            }
        }
        Ok(())
    }
}

impl DebugInvariants for MultiGrid {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "multigrid");
    }

    fn validate_invariants(&self) -> Result<(), RefineError> {
        self.check_invariants()
    }
}
