use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use serde::{Deserialize, Serialize};
use crate::error::Error;
use crate::grid::Grid;
use crate::index_space::{component, with_component, Axis, IndexSpace};
use crate::mesh::Mesh;




/// Which end of an axis a face sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Lower,
    Upper,
}




/// One of the six outer faces of the mesh. Faces order by axis, then side,
/// which is the order boundary conditions are applied in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Face {
    pub axis: Axis,
    pub side: Side,
}




// ============================================================================
impl Face {
    pub fn new(axis: Axis, side: Side) -> Self {
        Self { axis, side }
    }

    pub fn all() -> impl Iterator<Item = Face> {
        Axis::ALL.iter().flat_map(|&axis| {
            [Side::Lower, Side::Upper].iter().map(move |&side| Face::new(axis, side))
        })
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let axis = match self.axis {
            Axis::I => "i",
            Axis::J => "j",
            Axis::K => "k",
        };
        let side = match self.side {
            Side::Lower => "lower",
            Side::Upper => "upper",
        };
        write!(f, "{}-{}", axis, side)
    }
}




/// A boundary condition fills the guard zones of one grid on one physical
/// face, after the guard zone exchange between grids has completed.
pub type BoundaryCondition = Box<dyn Fn(&mut Grid) + Send + Sync>;




/// Ordered map from mesh face to the boundary condition enrolled for it.
#[derive(Default)]
pub struct BoundaryRegistry {
    conditions: BTreeMap<Face, BoundaryCondition>,
}




// ============================================================================
impl BoundaryRegistry {

    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with outflow conditions on every face.
    pub fn outflow() -> Self {
        let mut registry = Self::new();
        for face in Face::all() {
            registry.enroll(face, outflow(face));
        }
        registry
    }

    /// Enroll a condition for a face, replacing any earlier enrollment.
    pub fn enroll(&mut self, face: Face, condition: BoundaryCondition) -> &mut Self {
        self.conditions.insert(face, condition);
        self
    }

    pub fn is_enrolled(&self, face: Face) -> bool {
        self.conditions.contains_key(&face)
    }

    /// Faces which need a condition: both ends of every active, non-periodic
    /// axis.
    pub fn required_faces(mesh: &Mesh) -> impl Iterator<Item = Face> + '_ {
        Face::all().filter(move |f| mesh.is_active(f.axis) && !mesh.is_periodic(f.axis))
    }

    /// Check that a condition is enrolled for every required face.
    pub fn validate(&self, mesh: &Mesh) -> Result<(), Error> {
        for face in Self::required_faces(mesh) {
            if !self.is_enrolled(face) {
                return Err(Error::MissingBoundaryCondition(face))
            }
        }
        Ok(())
    }

    /// Apply the enrolled conditions to a grid, for each physical face the
    /// grid touches, in axis order.
    pub fn apply(&self, grid: &mut Grid) -> Result<(), Error> {
        let mesh = grid.mesh().clone();

        for face in Self::required_faces(&mesh) {
            if grid.touches(face) {
                match self.conditions.get(&face) {
                    Some(condition) => condition(grid),
                    None => return Err(Error::MissingBoundaryCondition(face)),
                }
            }
        }
        Ok(())
    }
}




// ============================================================================
fn edge_index(grid: &Grid, face: Face) -> i64 {
    let r = grid.interior().range(face.axis);
    match face.side {
        Side::Lower => r.start,
        Side::Upper => r.end - 1,
    }
}

fn boundary_face_index(grid: &Grid, face: Face) -> i64 {
    let r = grid.interior().range(face.axis);
    match face.side {
        Side::Lower => r.start,
        Side::Upper => r.end,
    }
}

fn mirror_index(r: Range<i64>, face: Face, i: i64) -> i64 {
    match face.side {
        Side::Lower => 2 * r.start - 1 - i,
        Side::Upper => 2 * r.end - 1 - i,
    }
}

/// Faces of a field normal to the boundary which lie beyond the boundary
/// face itself.
fn normal_guard_faces(space: &IndexSpace, face: Face, boundary_face: i64) -> IndexSpace {
    let f = space.range(face.axis);
    match face.side {
        Side::Lower => space.with_range(face.axis, f.start .. boundary_face),
        Side::Upper => space.with_range(face.axis, boundary_face + 1 .. f.end),
    }
}




/**
 * Zero-gradient condition: guard zones copy the adjacent interior cell.
 */
pub fn outflow(face: Face) -> BoundaryCondition {
    Box::new(move |grid: &mut Grid| {
        let edge = edge_index(grid, face);
        let boundary_face = boundary_face_index(grid, face);
        let region = grid.guard_region(face);

        for index in region.iter() {
            let u = grid.conserved_at(with_component(index, face.axis, edge));
            u.write_to_slice(grid.conserved_mut().get_slice_mut(index));
        }

        if let Some(fields) = grid.face_fields_mut() {
            for (axis, field) in Axis::ALL.iter().zip(fields.iter_mut()) {
                let space = field.index_space().clone();

                if *axis == face.axis {
                    for index in normal_guard_faces(&space, face, boundary_face).iter() {
                        let b = field.get(with_component(index, face.axis, boundary_face), 0);
                        field.set(index, 0, b);
                    }
                } else {
                    for index in space.with_range(face.axis, region.range(face.axis)).iter() {
                        let b = field.get(with_component(index, face.axis, edge), 0);
                        field.set(index, 0, b);
                    }
                }
            }
        }
    })
}




/**
 * Reflecting wall: guard zones mirror the interior, with the normal
 * momentum and normal magnetic field reversed.
 */
pub fn reflecting(face: Face) -> BoundaryCondition {
    Box::new(move |grid: &mut Grid| {
        let r = grid.interior().range(face.axis);
        let boundary_face = boundary_face_index(grid, face);
        let region = grid.guard_region(face);
        let n = face.axis.index();

        for index in region.iter() {
            let i = mirror_index(r.clone(), face, component(index, face.axis));
            let mut u = grid.conserved_at(with_component(index, face.axis, i));
            u.0[1 + n] = -u.0[1 + n];
            u.0[5 + n] = -u.0[5 + n];
            u.write_to_slice(grid.conserved_mut().get_slice_mut(index));
        }

        if let Some(fields) = grid.face_fields_mut() {
            for (axis, field) in Axis::ALL.iter().zip(fields.iter_mut()) {
                let space = field.index_space().clone();

                if *axis == face.axis {
                    for index in normal_guard_faces(&space, face, boundary_face).iter() {
                        let i = 2 * boundary_face - component(index, face.axis);
                        let b = field.get(with_component(index, face.axis, i), 0);
                        field.set(index, 0, -b);
                    }
                } else {
                    for index in space.with_range(face.axis, region.range(face.axis)).iter() {
                        let i = mirror_index(r.clone(), face, component(index, face.axis));
                        let b = field.get(with_component(index, face.axis, i), 0);
                        field.set(index, 0, b);
                    }
                }
            }
        }
    })
}




// ============================================================================
#[cfg(test)]
mod test {

    use std::sync::Arc;
    use crate::grid::Grid;
    use crate::hydro::Primitive;
    use crate::index_space::{range3d, Axis};
    use crate::mesh::Mesh;
    use super::{BoundaryRegistry, Face, Side, outflow, reflecting};

    fn grid_1d() -> Grid {
        let mesh = Arc::new(Mesh::uniform([0.0; 3], [1.0; 3], [8, 1, 1]).unwrap());
        let mut grid = Grid::new(0, range3d(0..8, 0..1, 0..1), mesh, false);
        grid.initialize(5.0 / 3.0, |(x, _, _)| Primitive([1.0 + x, 0.5, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]));
        grid
    }

    #[test]
    fn registry_reports_missing_faces() {
        let mesh = Mesh::uniform([0.0; 3], [1.0; 3], [8, 8, 1]).unwrap();
        let mut registry = BoundaryRegistry::new();
        registry.enroll(Face::new(Axis::I, Side::Lower), outflow(Face::new(Axis::I, Side::Lower)));
        assert!(registry.validate(&mesh).is_err());
        assert!(BoundaryRegistry::outflow().validate(&mesh).is_ok());
    }

    #[test]
    fn periodic_axes_need_no_condition() {
        let mesh = Mesh::uniform([0.0; 3], [1.0; 3], [8, 1, 1]).unwrap().with_periodic([true, false, false]);
        assert!(BoundaryRegistry::new().validate(&mesh).is_ok());
    }

    #[test]
    fn outflow_copies_the_edge_cell() {
        let mut grid = grid_1d();
        BoundaryRegistry::outflow().apply(&mut grid).unwrap();
        assert_eq!(grid.conserved_at((-2, 0, 0)), grid.conserved_at((0, 0, 0)));
        assert_eq!(grid.conserved_at((9, 0, 0)), grid.conserved_at((7, 0, 0)));
    }

    #[test]
    fn reflecting_reverses_the_normal_momentum() {
        let mut grid = grid_1d();
        reflecting(Face::new(Axis::I, Side::Lower))(&mut grid);
        let inside = grid.conserved_at((1, 0, 0));
        let guard = grid.conserved_at((-2, 0, 0));
        assert_eq!(guard.mass_density(), inside.mass_density());
        assert_eq!(guard.momentum_1(), -inside.momentum_1());
    }
}
