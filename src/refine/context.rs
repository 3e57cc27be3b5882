//! Per-element refinement context: the fine nodes a family is built from.
//!
//! The context is a slot array in the shape's slot order (corners, edge
//! mids, face nodes, center). Building it creates whatever fine nodes do
//! not exist yet and records their descent, so two elements sharing an
//! edge or a face also share the mid or face node: corner sons are found
//! through `Node::son`, mids through `Edge::mid`, face nodes through the
//! coarse level's face-node map.

use smallvec::{SmallVec, smallvec};

use crate::grid::multigrid::MultiGrid;
use crate::grid::node::{NodeFather, centroid, midpoint};
use crate::mesh_error::RefineError;
use crate::refine::PassContext;
use crate::topology::class::NodeKind;
use crate::topology::point::{ElemId, FaceKey, NodeId};

/// Fine nodes available to one element's subdivision, by context slot.
#[derive(Debug)]
pub(crate) struct ElementContext {
    pub slots: SmallVec<[Option<NodeId>; 27]>,
}

impl ElementContext {
    /// The node in `slot`, or an error naming the gap.
    pub fn node(&self, elem: ElemId, slot: usize) -> Result<NodeId, RefineError> {
        self.slots
            .get(slot)
            .copied()
            .flatten()
            .ok_or(RefineError::ContextSlot { elem, slot })
    }
}

/// Builds the context of `id` on level `k`, creating nodes on `k + 1`.
///
/// Corner sons are always present. A mid appears exactly on edges that are
/// bisected for real (`pattern` set, `add_pattern` cleared), a face node
/// exactly on quadrilateral sides whose side-pattern bit is set, and the
/// center only when `with_center` asks for it. Boundary nodes are run
/// through the pass geometry before they are stored.
pub(crate) fn build_context(
    mg: &mut MultiGrid,
    k: usize,
    id: ElemId,
    with_center: bool,
    pass: &PassContext<'_>,
) -> Result<ElementContext, RefineError> {
    let elem = mg.level(k)?.element(id)?.clone();
    let shape = elem.shape;
    let mut slots: SmallVec<[Option<NodeId>; 27]> = smallvec![None; shape.context_size()];

    for (i, &c) in elem.corners.iter().enumerate() {
        let (pos, boundary, son) = {
            let node = mg.level(k)?.node(c)?;
            (node.pos, node.boundary, node.son)
        };
        let fine = match son {
            Some(n) => n,
            None => {
                let n = mg.create_node(
                    k + 1,
                    NodeKind::Corner,
                    pos,
                    Some(NodeFather::Corner(c)),
                    boundary,
                )?;
                mg.level_mut(k)?.node_mut(c)?.son = Some(n);
                pass.overlay.node_created(k + 1, n);
                n
            }
        };
        slots[i] = Some(fine);
    }

    for e in 0..shape.edge_count() {
        let key = elem.edge_key(e);
        let (bisected, mid, on_boundary) = {
            let edge = mg.level(k)?.edge(key)?;
            (edge.pattern && !edge.add_pattern, edge.mid, edge.boundary)
        };
        if !bisected {
            continue;
        }
        let fine = match mid {
            Some(n) => n,
            None => {
                let (pa, pb) = {
                    let level = mg.level(k)?;
                    (level.node(key.lo())?.pos, level.node(key.hi())?.pos)
                };
                let mut pos = midpoint(pa, pb);
                if on_boundary {
                    pos = pass.geometry.project(pos);
                }
                let n = mg.create_node(
                    k + 1,
                    NodeKind::Mid,
                    pos,
                    Some(NodeFather::Mid(key)),
                    on_boundary,
                )?;
                mg.level_mut(k)?.edge_mut(key)?.mid = Some(n);
                pass.overlay.node_created(k + 1, n);
                n
            }
        };
        slots[shape.edge_slot(e)] = Some(fine);
    }

    for s in 0..shape.side_count() {
        if !shape.side_is_quad(s) || elem.side_pattern & (1 << s) == 0 {
            continue;
        }
        let corners = elem.side_nodes(s);
        let face = FaceKey::new([corners[0], corners[1], corners[2], corners[3]]);
        let existing = mg.level(k)?.face_nodes.get(&face).copied();
        let fine = match existing {
            Some(n) => n,
            None => {
                let positions: SmallVec<[[f64; 3]; 4]> = {
                    let level = mg.level(k)?;
                    let mut ps = SmallVec::new();
                    for &c in &corners {
                        ps.push(level.node(c)?.pos);
                    }
                    ps
                };
                let on_boundary = elem.side_on_boundary(s);
                let mut pos = centroid(&positions);
                if on_boundary {
                    pos = pass.geometry.project(pos);
                }
                let n = mg.create_node(
                    k + 1,
                    NodeKind::Side,
                    pos,
                    Some(NodeFather::Side(face)),
                    on_boundary,
                )?;
                mg.level_mut(k)?.face_nodes.insert(face, n);
                pass.overlay.node_created(k + 1, n);
                n
            }
        };
        slots[shape.side_slot(s)] = Some(fine);
    }

    if with_center {
        let positions: SmallVec<[[f64; 3]; 8]> = {
            let level = mg.level(k)?;
            let mut ps = SmallVec::new();
            for &c in &elem.corners {
                ps.push(level.node(c)?.pos);
            }
            ps
        };
        let n = mg.create_node(
            k + 1,
            NodeKind::Center,
            centroid(&positions),
            Some(NodeFather::Center(id)),
            false,
        )?;
        pass.overlay.node_created(k + 1, n);
        slots[shape.center_slot()] = Some(n);
    }

    Ok(ElementContext { slots })
}
