//! One refinement level: pools of elements, nodes and edges.

use hashbrown::HashMap;
use itertools::Itertools;

use crate::grid::edge::Edge;
use crate::grid::element::Element;
use crate::grid::node::Node;
use crate::mesh_error::RefineError;
use crate::topology::point::{EdgeKey, ElemId, FaceKey, NodeId};

/// Pools of one level. Iteration order over the maps is irrelevant to the
/// algorithms; sweeps that must be deterministic iterate sorted handles.
#[derive(Debug, Default, Clone)]
pub struct Level {
    pub(crate) elements: HashMap<ElemId, Element>,
    pub(crate) nodes: HashMap<NodeId, Node>,
    pub(crate) edges: HashMap<EdgeKey, Edge>,
    /// Face node (on the next finer level) per quadrilateral face of this
    /// level, keyed by the sorted face corners.
    pub(crate) face_nodes: HashMap<FaceKey, NodeId>,
}

impl Level {
    pub fn new() -> Self {
        Level::default()
    }

    pub fn element(&self, id: ElemId) -> Result<&Element, RefineError> {
        self.elements.get(&id).ok_or(RefineError::UnknownElement(id))
    }

    pub fn element_mut(&mut self, id: ElemId) -> Result<&mut Element, RefineError> {
        self.elements
            .get_mut(&id)
            .ok_or(RefineError::UnknownElement(id))
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, RefineError> {
        self.nodes.get(&id).ok_or(RefineError::UnknownNode(id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, RefineError> {
        self.nodes.get_mut(&id).ok_or(RefineError::UnknownNode(id))
    }

    pub fn edge(&self, key: EdgeKey) -> Result<&Edge, RefineError> {
        self.edges.get(&key).ok_or(RefineError::MissingEdge(key))
    }

    pub fn edge_mut(&mut self, key: EdgeKey) -> Result<&mut Edge, RefineError> {
        self.edges.get_mut(&key).ok_or(RefineError::MissingEdge(key))
    }

    pub fn contains_element(&self, id: ElemId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Element handles in ascending order, for deterministic sweeps.
    pub fn sorted_elements(&self) -> Vec<ElemId> {
        self.elements.keys().copied().sorted_unstable().collect()
    }

    /// Edge keys in ascending order, for deterministic sweeps.
    pub fn sorted_edges(&self) -> Vec<EdgeKey> {
        self.edges.keys().copied().sorted_unstable().collect()
    }

    pub fn elem_count(&self) -> usize {
        self.elements.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Registers an element in the pools: corner reference counts and one
    /// edge record (or count bump) per local edge.
    pub(crate) fn attach_element(&mut self, id: ElemId, elem: Element) -> Result<(), RefineError> {
        for &c in &elem.corners {
            self.node_mut(c)?.ref_count += 1;
        }
        for e in 0..elem.shape.edge_count() {
            let key = elem.edge_key(e);
            self.edges.entry(key).or_default().elem_count += 1;
        }
        self.elements.insert(id, elem);
        Ok(())
    }

    /// Unregisters an element; returns the record, the corner nodes whose
    /// reference count dropped to zero and the edges removed with it.
    pub(crate) fn detach_element(
        &mut self,
        id: ElemId,
    ) -> Result<(Element, Vec<NodeId>, Vec<EdgeKey>), RefineError> {
        let elem = self
            .elements
            .remove(&id)
            .ok_or(RefineError::UnknownElement(id))?;
        let mut dead_nodes = Vec::new();
        for &c in &elem.corners {
            let node = self.node_mut(c)?;
            node.ref_count -= 1;
            if node.ref_count == 0 {
                dead_nodes.push(c);
            }
        }
        let mut dead_edges = Vec::new();
        for e in 0..elem.shape.edge_count() {
            let key = elem.edge_key(e);
            let edge = self.edge_mut(key)?;
            edge.elem_count -= 1;
            if edge.elem_count == 0 {
                debug_assert!(edge.mid.is_none(), "disposing edge with live mid-node");
                self.edges.remove(&key);
                dead_edges.push(key);
            }
        }
        Ok((elem, dead_nodes, dead_edges))
    }
}
