//! Boundary geometry hook for refined node placement.
//!
//! New mid-nodes sit at edge midpoints and new face nodes at side
//! centroids. On a curved domain that drifts off the true boundary, so
//! every boundary-node position is routed through a [`BoundaryGeometry`]
//! before it is stored.

/// Projects tentative boundary-node positions back onto the domain
/// boundary.
pub trait BoundaryGeometry {
    fn project(&self, pos: [f64; 3]) -> [f64; 3];
}

/// Polygonal domains: positions are kept as computed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGeometry;

impl BoundaryGeometry for NoGeometry {
    #[inline]
    fn project(&self, pos: [f64; 3]) -> [f64; 3] {
        pos
    }
}
