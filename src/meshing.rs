use std::collections::HashMap;
use crate::index_space::{Axis, IndexSpace};
use crate::mesh::Mesh;




/// A graph edge pointing from grid `source` to grid `target` means that
/// `source` is _upstream_ of `target`: cells from the source interior are
/// required to fill the target's guard zones. In parallel executions,
/// messages are passed in the direction of the arrows.
///
#[derive(Clone, Debug, PartialEq)]
pub struct GuardEdge {
    pub source: usize,
    pub target: usize,

    /// The guard cells filled by this edge, in the target's coordinates.
    pub region: IndexSpace,

    /// The periodic image shift: target coordinates minus source
    /// coordinates. Zero for edges within the mesh.
    pub shift: (i64, i64, i64),
}




// ============================================================================
impl GuardEdge {

    /// The region in the source grid's own coordinates.
    pub fn source_region(&self) -> IndexSpace {
        self.region.shift((-self.shift.0, -self.shift.1, -self.shift.2))
    }
}




/// The guard-zone topology of a decomposed mesh: for every grid, the edges
/// leaving it and the number of edges arriving at it. Faces, edges and
/// corners of the guard region are all covered, periodic images included.
///
#[derive(Clone, Debug, Default)]
pub struct GuardTopology {
    outgoing: HashMap<usize, Vec<GuardEdge>>,
    incoming: HashMap<usize, usize>,
}




// ============================================================================
impl GuardTopology {

    /// Compute the topology of the given blocks, each an `(id, interior,
    /// extended)` triple.
    pub fn new(mesh: &Mesh, blocks: &[(usize, IndexSpace, IndexSpace)]) -> Self {
        let mut topology = Self::default();

        for (target, interior, extended) in blocks {
            for (source, source_interior, _) in blocks {
                for shift in periodic_shifts(mesh) {
                    if source == target && shift == (0, 0, 0) {
                        continue
                    }
                    if let Some(region) = extended.intersect(&source_interior.shift(shift)) {
                        if interior.intersect(&region).is_some() {
                            continue
                        }
                        topology.insert(GuardEdge {
                            source: *source,
                            target: *target,
                            region,
                            shift,
                        })
                    }
                }
            }
        }
        topology
    }

    fn insert(&mut self, edge: GuardEdge) {
        *self.incoming.entry(edge.target).or_default() += 1;
        self.outgoing.entry(edge.source).or_default().push(edge);
    }

    /// Return the edges leaving the given grid.
    pub fn outgoing_edges(&self, source: usize) -> &[GuardEdge] {
        self.outgoing.get(&source).map(|e| e.as_slice()).unwrap_or(&[])
    }

    /// Return the number of edges arriving at the given grid.
    pub fn incoming_count(&self, target: usize) -> usize {
        self.incoming.get(&target).cloned().unwrap_or(0)
    }

    /// Return the total number of edges in the graph.
    pub fn len(&self) -> usize {
        self.incoming.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}




/// Every image shift of the mesh: zero, plus plus or minus the mesh size
/// along each periodic active axis, in all combinations.
fn periodic_shifts(mesh: &Mesh) -> Vec<(i64, i64, i64)> {
    let shifts = |axis: Axis, n: i64| -> Vec<i64> {
        if mesh.is_active(axis) && mesh.is_periodic(axis) {
            vec![-n, 0, n]
        } else {
            vec![0]
        }
    };
    let (l, m, n) = mesh.shape();
    let mut result = Vec::new();

    for &a in &shifts(Axis::I, l) {
        for &b in &shifts(Axis::J, m) {
            for &c in &shifts(Axis::K, n) {
                result.push((a, b, c))
            }
        }
    }
    result
}
