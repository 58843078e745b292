use std::sync::Arc;
use crate::boundary::{Face, Side};
use crate::chemistry::ChemistryState;
use crate::error::Error;
use crate::hydro::{Conserved, Primitive, NUM_FIELDS};
use crate::index_space::{component, offset, Axis, IndexSpace};
use crate::mesh::Mesh;
use crate::patch::Patch;




/// Number of guard zones on each end of an active axis.
pub const NUM_GUARD: i64 = 2;




/// A rectilinear block of the global index space, owning the conserved
/// state of its cells plus guard zones, the face-centered magnetic field
/// when the run is magnetized, and per-cell chemistry scratch space.
///
#[derive(Clone, Debug)]
pub struct Grid {
    id: usize,
    interior: IndexSpace,
    extended: IndexSpace,
    mesh: Arc<Mesh>,
    pub(crate) conserved: Patch,
    pub(crate) face_field: Option<[Patch; 3]>,
    pub(crate) origin: Option<(Patch, Option<[Patch; 3]>)>,
    pub(crate) chemistry: ChemistryState,
}




// ============================================================================
impl Grid {

    /// Create a grid with zeroed state over the given block of the mesh.
    pub fn new(id: usize, interior: IndexSpace, mesh: Arc<Mesh>, magnetic: bool) -> Self {
        let extended = interior.extend_active(NUM_GUARD, mesh.active());
        let conserved = Patch::zeros(extended.clone(), NUM_FIELDS);
        let face_field = if magnetic {
            Some([
                Patch::zeros(Self::face_space(&extended, &mesh, Axis::I), 1),
                Patch::zeros(Self::face_space(&extended, &mesh, Axis::J), 1),
                Patch::zeros(Self::face_space(&extended, &mesh, Axis::K), 1),
            ])
        } else {
            None
        };
        let chemistry = ChemistryState::new(interior.clone());

        Self {
            id,
            interior,
            extended,
            mesh,
            conserved,
            face_field,
            origin: None,
            chemistry,
        }
    }

    /// The index space of the face-centered field normal to an axis: one
    /// extra face on the upper end of an active axis. The field normal to
    /// an inactive axis has a single value per cell.
    pub fn face_space(cells: &IndexSpace, mesh: &Mesh, axis: Axis) -> IndexSpace {
        if mesh.is_active(axis) {
            cells.extend_upper(1, axis)
        } else {
            cells.clone()
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn interior(&self) -> &IndexSpace {
        &self.interior
    }

    pub fn extended(&self) -> &IndexSpace {
        &self.extended
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn is_magnetic(&self) -> bool {
        self.face_field.is_some()
    }

    pub fn conserved(&self) -> &Patch {
        &self.conserved
    }

    pub fn conserved_mut(&mut self) -> &mut Patch {
        &mut self.conserved
    }

    pub fn face_fields(&self) -> Option<&[Patch; 3]> {
        self.face_field.as_ref()
    }

    pub fn face_fields_mut(&mut self) -> Option<&mut [Patch; 3]> {
        self.face_field.as_mut()
    }

    pub fn chemistry_state(&self) -> &ChemistryState {
        &self.chemistry
    }

    pub fn cell_center(&self, index: (i64, i64, i64)) -> (f64, f64, f64) {
        self.mesh.cell_center(index)
    }

    pub fn conserved_at(&self, index: (i64, i64, i64)) -> Conserved {
        Conserved::from_slice(self.conserved.get_slice(index))
    }

    /// Recover the primitive state of one cell, reporting the grid and the
    /// cell on failure.
    pub fn primitive_at(&self, index: (i64, i64, i64), gamma_law_index: f64) -> Result<Primitive, Error> {
        self.conserved_at(index)
            .to_primitive(gamma_law_index)
            .map_err(|e| e.at_position(self.id, index))
    }

    /// Whether the grid's interior reaches the given face of the mesh.
    pub fn touches(&self, face: Face) -> bool {
        let r = self.interior.range(face.axis);
        match face.side {
            Side::Lower => r.start == 0,
            Side::Upper => r.end == self.mesh.num_cells(face.axis),
        }
    }

    /// The guard cells beyond one face of the interior, spanning the full
    /// extended range on the other axes.
    pub fn guard_region(&self, face: Face) -> IndexSpace {
        let r = self.interior.range(face.axis);
        let e = self.extended.range(face.axis);
        match face.side {
            Side::Lower => self.extended.with_range(face.axis, e.start .. r.start),
            Side::Upper => self.extended.with_range(face.axis, r.end .. e.end),
        }
    }

    /// Set the interior state from a function of the cell center. For a
    /// magnetized grid the face-centered field is sampled at face centers
    /// and the cell-centered field is set to face averages, so that a field
    /// with zero analytic divergence starts with zero discrete divergence
    /// when it is linear between faces.
    pub fn initialize<F>(&mut self, gamma_law_index: f64, f: F)
    where
        F: Fn((f64, f64, f64)) -> Primitive
    {
        let mesh = self.mesh.clone();

        if let Some(fields) = self.face_field.as_mut() {
            for (axis, field) in Axis::ALL.iter().zip(fields.iter_mut()) {
                let space = field.index_space().clone();

                for index in space.iter() {
                    let mut x = mesh.cell_center(index);
                    if mesh.is_active(*axis) {
                        let face = mesh.face(*axis, component(index, *axis));
                        match axis {
                            Axis::I => x.0 = face,
                            Axis::J => x.1 = face,
                            Axis::K => x.2 = face,
                        }
                    }
                    field.set(index, 0, f(x).magnetic_field(*axis));
                }
            }
        }

        for index in self.interior.clone().iter() {
            let mut p = f(mesh.cell_center(index));

            if self.face_field.is_some() {
                let b = self.cell_field_from_faces(index);
                p.0[5] = b[0];
                p.0[6] = b[1];
                p.0[7] = b[2];
            }
            p.to_conserved(gamma_law_index).write_to_slice(self.conserved.get_slice_mut(index));
        }
    }

    /// Average the face-centered field onto the cell center.
    pub fn cell_field_from_faces(&self, index: (i64, i64, i64)) -> [f64; 3] {
        let mut b = [0.0; 3];

        if let Some(fields) = &self.face_field {
            for (n, (axis, field)) in Axis::ALL.iter().zip(fields.iter()).enumerate() {
                b[n] = if self.mesh.is_active(*axis) {
                    0.5 * (field.get(index, 0) + field.get(offset(index, 1, *axis), 0))
                } else {
                    field.get(index, 0)
                }
            }
        }
        b
    }

    /// Overwrite the cell-centered field of the interior with face averages.
    pub fn sync_cell_field(&mut self) {
        if self.face_field.is_none() {
            return
        }
        for index in self.interior.clone().iter() {
            let b = self.cell_field_from_faces(index);
            self.conserved.get_slice_mut(index)[5..8].copy_from_slice(&b);
        }
    }

    /// Discrete divergence of the face-centered field over the interior;
    /// zero everywhere for an unmagnetized grid.
    pub fn divergence_b(&self) -> Patch {
        let mut div = Patch::zeros(self.interior.clone(), 1);

        if let Some(fields) = &self.face_field {
            for index in self.interior.iter() {
                let mut d = 0.0;

                for (axis, field) in Axis::ALL.iter().zip(fields.iter()) {
                    if self.mesh.is_active(*axis) {
                        let dx = self.mesh.cell_width(*axis, component(index, *axis));
                        d += (field.get(offset(index, 1, *axis), 0) - field.get(index, 0)) / dx;
                    }
                }
                div.set(index, 0, d);
            }
        }
        div
    }

    /// Volume-weighted L1 norm of the difference to a reference solution,
    /// per conserved field, together with the grid's volume.
    pub fn l1_error<F>(&self, reference: F) -> ([f64; NUM_FIELDS], f64)
    where
        F: Fn((f64, f64, f64)) -> Conserved
    {
        let mut sums = [0.0; NUM_FIELDS];
        let mut volume = 0.0;

        for index in self.interior.iter() {
            let dv = self.mesh.cell_volume(index);
            let u = self.conserved_at(index);
            let r = reference(self.cell_center(index));

            for q in 0..NUM_FIELDS {
                sums[q] += (u.0[q] - r.0[q]).abs() * dv;
            }
            volume += dv;
        }
        (sums, volume)
    }

    /// Remember the state at the start of a time step, for the stage
    /// updates of the Runge-Kutta scheme.
    pub fn begin_step(&mut self) {
        self.origin = Some((self.conserved.clone(), self.face_field.clone()))
    }

    /// Check that every interior cell has a valid primitive state.
    pub fn validate(&self, gamma_law_index: f64) -> Result<(), Error> {
        for index in self.interior.iter() {
            self.primitive_at(index, gamma_law_index)?;
        }
        Ok(())
    }
}
