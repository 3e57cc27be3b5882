//! Mesh model and level store: records for nodes, edges and elements,
//! the per-level pools, and the multigrid stack.

pub mod edge;
pub mod element;
pub mod level;
pub mod multigrid;
pub mod node;

pub use edge::Edge;
pub use element::Element;
pub use level::Level;
pub use multigrid::MultiGrid;
pub use node::{Node, NodeFather};
