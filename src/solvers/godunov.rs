use std::sync::Arc;
use crate::automaton::{Automaton, Status};
use crate::boundary::BoundaryRegistry;
use crate::error::Error;
use crate::grid::Grid;
use crate::hydro::{Conserved, Primitive, NUM_FIELDS};
use crate::index_space::{component, offset, Axis, IndexSpace};
use crate::mesh::Mesh;
use crate::meshing::{GuardEdge, GuardTopology};
use crate::patch::Patch;
use super::Scheme;




/// The content of one guard-zone message: conserved cells and, for MHD,
/// face-centered fields, already shifted into the recipient's coordinates.
pub struct GuardZones {
    conserved: Patch,
    faces: Option<[Patch; 3]>,
}




/// One Runge-Kutta stage of one grid, as a task in the automaton executor.
/// The stage sends its interior cells to the grids whose guard zones they
/// cover, fills its own guard zones from the messages it receives and the
/// enrolled boundary conditions, and then yields the updated grid.
///
pub struct GridStage {
    grid: Grid,
    scheme: Scheme,
    boundaries: Arc<BoundaryRegistry>,
    outgoing_edges: Vec<GuardEdge>,
    incoming_count: usize,
    received: Vec<GuardZones>,
    weight: f64,
    time_step_size: f64,
}




// ============================================================================
impl GridStage {

    pub fn new(
        grid: Grid,
        scheme: Scheme,
        boundaries: Arc<BoundaryRegistry>,
        topology: &GuardTopology,
        weight: f64,
        time_step_size: f64,
    ) -> Self {
        let outgoing_edges = topology.outgoing_edges(grid.id()).to_vec();
        let incoming_count = topology.incoming_count(grid.id());
        Self {
            grid,
            scheme,
            boundaries,
            outgoing_edges,
            incoming_count,
            received: Vec::new(),
            weight,
            time_step_size,
        }
    }

    fn guard_zones(&self, edge: &GuardEdge) -> GuardZones {
        let source = edge.source_region();
        let mesh = self.grid.mesh();
        let conserved = self.grid.conserved().extract(&source).translate(edge.shift);
        let faces = self.grid.face_fields().map(|fields| {
            let extract = |n: usize| {
                let space = Grid::face_space(&source, mesh, Axis::ALL[n]);
                fields[n].extract(&space).translate(edge.shift)
            };
            [extract(0), extract(1), extract(2)]
        });
        GuardZones { conserved, faces }
    }
}




// ============================================================================
impl Automaton for GridStage {
    type Key = usize;
    type Message = GuardZones;
    type Value = Result<Grid, Error>;

    fn key(&self) -> Self::Key {
        self.grid.id()
    }

    fn messages(&self) -> Vec<(Self::Key, Self::Message)> {
        self.outgoing_edges
            .iter()
            .map(|edge| (edge.target, self.guard_zones(edge)))
            .collect()
    }

    fn independent(&self) -> bool {
        self.incoming_count == 0
    }

    fn receive(&mut self, message: Self::Message) -> Status {
        self.received.push(message);
        Status::eligible_if(self.received.len() == self.incoming_count)
    }

    fn value(self) -> Self::Value {
        let mut grid = self.grid;

        for zones in self.received {
            grid.conserved.insert(&zones.conserved);

            if let (Some(fields), Some(faces)) = (grid.face_field.as_mut(), zones.faces) {
                for (field, face) in fields.iter_mut().zip(faces.iter()) {
                    field.insert(face)
                }
            }
        }
        self.boundaries.apply(&mut grid)?;
        advance(grid, &self.scheme, self.weight, self.time_step_size)
    }
}




/**
 * The faces at which fluxes along `axis` are needed: every interior face
 * along the axis, plus one layer beyond the interior on the other active
 * axes for the edge electric fields.
 */
fn flux_space(interior: &IndexSpace, mesh: &Mesh, axis: Axis) -> IndexSpace {
    Axis::ALL
        .iter()
        .filter(|&&a| a != axis && mesh.is_active(a))
        .fold(interior.extend_upper(1, axis), |space, &a| space.extend(1, a))
}

fn primitive_patch(grid: &Grid, gamma_law_index: f64) -> Result<Patch, Error> {
    let mut primitive = Patch::zeros(grid.extended().clone(), NUM_FIELDS);

    for index in grid.extended().iter() {
        grid.primitive_at(index, gamma_law_index)?
            .write_to_slice(primitive.get_slice_mut(index))
    }
    Ok(primitive)
}

fn compute_flux(grid: &Grid, primitive: &Patch, scheme: &Scheme, axis: Axis) -> Result<Patch, Error> {
    let gamma = scheme.gamma_law_index;
    let mesh = grid.mesh();
    let space = flux_space(grid.interior(), mesh, axis);
    let mut flux = Patch::zeros(space.clone(), NUM_FIELDS);
    let n = axis.index();
    let cell = |index| Primitive::from_slice(primitive.get_slice(index));

    for index in space.iter() {
        let a = cell(offset(index, -2, axis));
        let b = cell(offset(index, -1, axis));
        let c = cell(index);
        let d = cell(offset(index, 1, axis));
        let (mut pl, mut pr) = scheme.reconstruction.face_states(&a, &b, &c, &d);

        if let Some(fields) = grid.face_fields() {
            let bn = fields[n].get(index, 0);
            pl.0[5 + n] = bn;
            pr.0[5 + n] = bn;
        }

        let mut f = scheme
            .riemann_solver
            .flux(&pl, &pr, axis, gamma)
            .map_err(|e| e.at_position(grid.id(), index))?;

        if scheme.diffusion.is_active() {
            let i = component(index, axis);
            let dx = 0.5 * (mesh.cell_width(axis, i - 1) + mesh.cell_width(axis, i));
            f = f + scheme.diffusion.flux(&b, &c, dx, gamma);
        }
        f.write_to_slice(flux.get_slice_mut(index));
    }
    Ok(flux)
}

/**
 * Electric field along `c` at the edge on the lower `a` and lower `b` side
 * of the cell at `index`, where `(c, a, b)` is a cyclic triple. It is the
 * average of the estimates from the adjacent face fluxes:
 * E_c = -F_a[B_b] = F_b[B_a].
 */
fn edge_electric_field(fluxes: &[Option<Patch>; 3], c: Axis, index: (i64, i64, i64)) -> f64 {
    let (a, b) = c.cyclic();
    let mut sum = 0.0;
    let mut count = 0;

    if let Some(fa) = &fluxes[a.index()] {
        sum -= fa.get(index, 5 + b.index());
        count += 1;

        if fluxes[b.index()].is_some() {
            sum -= fa.get(offset(index, -1, b), 5 + b.index());
            count += 1;
        }
    }
    if let Some(fb) = &fluxes[b.index()] {
        sum += fb.get(index, 5 + a.index());
        count += 1;

        if fluxes[a.index()].is_some() {
            sum += fb.get(offset(index, -1, a), 5 + a.index());
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/**
 * Update the face-centered field from the circulation of the edge electric
 * fields around each face: dB_a/dt = -(d_b E_c - d_c E_b). The discrete
 * divergence of the update vanishes identically.
 */
fn constrained_transport(grid: &Grid, fluxes: &[Option<Patch>; 3], weight: f64, dt: f64) -> Option<[Patch; 3]> {
    let fields = grid.face_fields()?;
    let mesh = grid.mesh();
    let mut new_fields = fields.clone();

    for (n, &a) in Axis::ALL.iter().enumerate() {
        let (b, c) = a.cyclic();
        let origin = grid.origin.as_ref().and_then(|(_, f)| f.as_ref()).map(|f| &f[n]);

        for index in Grid::face_space(grid.interior(), mesh, a).iter() {
            let mut dbdt = 0.0;

            if mesh.is_active(b) {
                let e0 = edge_electric_field(fluxes, c, index);
                let e1 = edge_electric_field(fluxes, c, offset(index, 1, b));
                dbdt -= (e1 - e0) / mesh.cell_width(b, component(index, b));
            }
            if mesh.is_active(c) {
                let e0 = edge_electric_field(fluxes, b, index);
                let e1 = edge_electric_field(fluxes, b, offset(index, 1, c));
                dbdt += (e1 - e0) / mesh.cell_width(c, component(index, c));
            }
            let bf = fields[n].get(index, 0);
            let bf0 = origin.map(|o| o.get(index, 0)).unwrap_or(bf);
            new_fields[n].set(index, 0, bf0 * (1.0 - weight) + (bf + dbdt * dt) * weight);
        }
    }
    Some(new_fields)
}

/**
 * Advance a grid whose guard zones are filled by one stage of the
 * Runge-Kutta scheme with weight `weight`. The interior conserved state is
 * updated from the flux divergence and the face-centered field by
 * constrained transport; the cell-centered field is then reset to face
 * averages. Fails if any updated cell has no valid primitive state.
 */
pub fn advance(mut grid: Grid, scheme: &Scheme, weight: f64, dt: f64) -> Result<Grid, Error> {
    let mesh = grid.mesh().clone();
    let interior = grid.interior().clone();
    let primitive = primitive_patch(&grid, scheme.gamma_law_index)?;

    let mut fluxes: [Option<Patch>; 3] = [None, None, None];

    for axis in mesh.active_axes() {
        fluxes[axis.index()] = Some(compute_flux(&grid, &primitive, scheme, axis)?);
    }

    let mut updated = grid.conserved.clone();

    for index in interior.iter() {
        let mut l = Conserved::zeros();

        for (axis, flux) in Axis::ALL.iter().zip(fluxes.iter()) {
            if let Some(flux) = flux {
                let fl = Conserved::from_slice(flux.get_slice(index));
                let fr = Conserved::from_slice(flux.get_slice(offset(index, 1, *axis)));
                l = l - (fr - fl) / mesh.cell_width(*axis, component(index, *axis));
            }
        }
        let u = grid.conserved_at(index);
        let u0 = match &grid.origin {
            Some((origin, _)) => Conserved::from_slice(origin.get_slice(index)),
            None => u,
        };
        (u0 * (1.0 - weight) + (u + l * dt) * weight).write_to_slice(updated.get_slice_mut(index));
    }

    if let Some(fields) = constrained_transport(&grid, &fluxes, weight, dt) {
        grid.face_field = Some(fields);
    }

    grid.conserved = updated;
    grid.sync_cell_field();
    grid.validate(scheme.gamma_law_index)?;
    Ok(grid)
}




// ============================================================================
#[cfg(test)]
mod test {

    use std::sync::Arc;
    use crate::boundary::BoundaryRegistry;
    use crate::grid::Grid;
    use crate::hydro::{Primitive, Reconstruction};
    use crate::index_space::range3d;
    use crate::mesh::Mesh;
    use crate::solvers::Scheme;
    use super::advance;

    fn uniform_grid(magnetic: bool, p: Primitive) -> Grid {
        let mesh = Arc::new(Mesh::uniform([0.0; 3], [1.0; 3], [12, 10, 1]).unwrap());
        let mut grid = Grid::new(0, range3d(0..12, 0..10, 0..1), mesh, magnetic);
        grid.initialize(5.0 / 3.0, |_| p);
        grid.begin_step();
        grid
    }

    #[test]
    fn uniform_flow_is_preserved() {
        let p = Primitive([1.0, 0.3, -0.2, 0.0, 0.5, 0.1, 0.2, 0.3, 0.7]);
        let scheme = Scheme { magnetic: true, ..Scheme::default() };
        let mut grid = uniform_grid(true, p);
        let before = grid.conserved_at((5, 5, 0));

        BoundaryRegistry::outflow().apply(&mut grid).unwrap();
        let grid = advance(grid, &scheme, 1.0, 0.01).unwrap();

        for (a, b) in grid.conserved_at((5, 5, 0)).0.iter().zip(before.0.iter()) {
            assert!((a - b).abs() < 1e-14);
        }
        assert!(grid.divergence_b().data().iter().all(|d| d.abs() < 1e-12));
    }

    #[test]
    fn pressure_jump_reports_no_error_with_either_reconstruction() {
        for &reconstruction in [Reconstruction::Pcm, Reconstruction::Plm { theta: 2.0 }].iter() {
            let scheme = Scheme { reconstruction, ..Scheme::default() };
            let mesh = Arc::new(Mesh::uniform([0.0; 3], [1.0; 3], [32, 1, 1]).unwrap());
            let mut grid = Grid::new(0, range3d(0..32, 0..1, 0..1), mesh, false);
            grid.initialize(scheme.gamma_law_index, |(x, _, _)| {
                if x < 0.5 {
                    Primitive([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
                } else {
                    Primitive([0.125, 0.0, 0.0, 0.0, 0.1, 0.0, 0.0, 0.0, 0.0])
                }
            });
            grid.begin_step();
            BoundaryRegistry::outflow().apply(&mut grid).unwrap();
            let grid = advance(grid, &scheme, 1.0, 0.005).unwrap();
            assert!(grid.conserved_at((16, 0, 0)).mass_density() > 0.125);
        }
    }
}
