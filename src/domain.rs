use std::sync::Arc;
use rayon::prelude::*;
use crate::automaton;
use crate::boundary::BoundaryRegistry;
use crate::error::Error;
use crate::grid::{Grid, NUM_GUARD};
use crate::history::HistoryRegistry;
use crate::hydro::{Conserved, Primitive, NUM_FIELDS};
use crate::index_space::{Axis, IndexSpace};
use crate::mesh::Mesh;
use crate::meshing::GuardTopology;
use crate::output::{GridSnapshot, Snapshot};
use crate::solvers::{GridStage, Scheme};




/// The explicit context of a run: the mesh, its grids, the numerical
/// scheme, and the registries and clocks which are shared by every grid.
/// Registries are populated during setup and read-only while integrating.
///
pub struct Domain {
    mesh: Arc<Mesh>,
    grids: Vec<Grid>,
    scheme: Scheme,
    topology: GuardTopology,
    boundaries: Arc<BoundaryRegistry>,
    history: HistoryRegistry,
    time: f64,
    cycle: u64,
    dt: Option<f64>,
}




// ============================================================================
impl Domain {

    /**
     * Decompose the mesh into `blocks[n]` grids along each axis and set up
     * the guard-zone topology. Fails if a block count does not evenly
     * divide the cells on its axis, or if a required face has no boundary
     * condition.
     */
    pub fn new(mesh: Mesh, blocks: [usize; 3], scheme: Scheme, boundaries: BoundaryRegistry) -> Result<Self, Error> {
        let mesh = Arc::new(mesh);
        let spaces = decompose(&mesh, blocks)?;

        let grids: Vec<_> = spaces
            .into_iter()
            .enumerate()
            .map(|(id, space)| Grid::new(id, space, mesh.clone(), scheme.magnetic))
            .collect();

        let triples: Vec<_> = grids
            .iter()
            .map(|g| (g.id(), g.interior().clone(), g.extended().clone()))
            .collect();

        let domain = Self {
            topology: GuardTopology::new(&mesh, &triples),
            mesh,
            grids,
            scheme,
            boundaries: Arc::new(boundaries),
            history: HistoryRegistry::with_defaults(),
            time: 0.0,
            cycle: 0,
            dt: None,
        };
        domain.validate()?;
        Ok(domain)
    }

    /// Check the setup: every required face has a boundary condition and
    /// the scheme parameters are usable.
    pub fn validate(&self) -> Result<(), Error> {
        self.boundaries.validate(&self.mesh)?;

        if !(self.scheme.gamma_law_index > 1.0) {
            return Err(Error::Config("gamma law index must be greater than 1".into()))
        }
        if self.scheme.diffusion.viscosity < 0.0 || self.scheme.diffusion.thermal_diffusivity < 0.0 {
            return Err(Error::Config("diffusion coefficients must be non-negative".into()))
        }
        Ok(())
    }

    /// Set the interior state of every grid from a function of position,
    /// then check that it is physically valid.
    pub fn initialize<F>(&mut self, f: F) -> Result<(), Error>
    where
        F: Fn((f64, f64, f64)) -> Primitive + Sync
    {
        let gamma = self.scheme.gamma_law_index;

        self.grids.par_iter_mut().for_each(|grid| grid.initialize(gamma, &f));
        self.grids.iter().try_for_each(|grid| grid.validate(gamma))
    }

    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }

    pub fn grids(&self) -> &[Grid] {
        &self.grids
    }

    pub fn grids_mut(&mut self) -> &mut [Grid] {
        &mut self.grids
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    pub fn topology(&self) -> &GuardTopology {
        &self.topology
    }

    pub fn history_registry(&self) -> &HistoryRegistry {
        &self.history
    }

    pub fn history_registry_mut(&mut self) -> &mut HistoryRegistry {
        &mut self.history
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// The last accepted time step, if any cycle has completed.
    pub fn dt(&self) -> Option<f64> {
        self.dt
    }

    /**
     * Advance the conserved state of every grid by `dt` with the scheme's
     * Runge-Kutta stages. Each stage is a guard-zone exchange between the
     * grids followed by the flux update, run on the automaton executor. On
     * failure the grids are left in an unspecified state; the caller is
     * expected to restore a backup.
     */
    pub fn advance_hydro(&mut self, dt: f64) -> Result<(), Error> {
        for grid in &mut self.grids {
            grid.begin_step()
        }
        for &weight in self.scheme.time_integration.stage_weights() {
            self.apply_stage(weight, dt)?;
        }
        Ok(())
    }

    fn apply_stage(&mut self, weight: f64, dt: f64) -> Result<(), Error> {
        let num_grids = self.grids.len();
        let stages: Vec<_> = std::mem::take(&mut self.grids)
            .into_iter()
            .map(|grid| GridStage::new(grid, self.scheme, self.boundaries.clone(), &self.topology, weight, dt))
            .collect();

        let results: Vec<_> = if rayon::current_num_threads() >= 2 {
            rayon::scope(|scope| automaton::execute_par(scope, stages).collect())
        } else {
            automaton::execute(stages).collect()
        };

        let mut grids = results.into_iter().collect::<Result<Vec<_>, _>>()?;

        if grids.len() != num_grids {
            return Err(Error::Decomposition(format!(
                "{} of {} grids completed the stage", grids.len(), num_grids)))
        }
        grids.sort_by_key(Grid::id);
        self.grids = grids;
        Ok(())
    }

    /// Record a completed cycle of length `dt`.
    pub fn complete_cycle(&mut self, dt: f64) {
        self.time += dt;
        self.cycle += 1;
        self.dt = Some(dt);
    }

    /// Replace the grids with a backup taken earlier, e.g. at the start of
    /// a failed cycle.
    pub fn restore_grids(&mut self, grids: Vec<Grid>) {
        self.grids = grids;
    }

    pub(crate) fn restore_clock(&mut self, time: f64, cycle: u64, dt: Option<f64>) {
        self.time = time;
        self.cycle = cycle;
        self.dt = dt;
    }

    /// Copy of the interior state, for output between cycles.
    pub fn snapshot(&self) -> Snapshot {
        let grids = self.grids
            .iter()
            .map(|grid| GridSnapshot {
                id: grid.id(),
                conserved: grid.conserved().extract(grid.interior()),
                face_fields: grid.face_fields().map(|fields| {
                    let extract = |n: usize| {
                        let space = Grid::face_space(grid.interior(), &self.mesh, Axis::ALL[n]);
                        fields[n].extract(&space)
                    };
                    [extract(0), extract(1), extract(2)]
                }),
                divergence_b: grid.divergence_b(),
            })
            .collect();

        Snapshot {
            time: self.time,
            cycle: self.cycle,
            grids,
        }
    }

    /// Evaluate every enrolled history quantity as a volume integral over
    /// the domain, in enrollment order.
    pub fn history(&self) -> Vec<(String, f64)> {
        self.history.evaluate(self)
    }

    /**
     * Volume-weighted L1 error against a reference solution evaluated at
     * cell centers, normalized by the domain volume, and combined as the
     * root-mean-square over the conserved fields.
     */
    pub fn l1_error<F>(&self, reference: F) -> f64
    where
        F: Fn((f64, f64, f64)) -> Conserved + Sync
    {
        let (sums, volume) = self.grids
            .par_iter()
            .map(|grid| grid.l1_error(&reference))
            .reduce(|| ([0.0; NUM_FIELDS], 0.0), |(a, va), (b, vb)| {
                let mut s = [0.0; NUM_FIELDS];
                for q in 0..NUM_FIELDS {
                    s[q] = a[q] + b[q];
                }
                (s, va + vb)
            });

        let mean_square = sums.iter().map(|s| (s / volume).powi(2)).sum::<f64>() / NUM_FIELDS as f64;
        mean_square.sqrt()
    }

    /// Largest magnitude of the discrete divergence of the face-centered
    /// field over all grids.
    pub fn max_divergence_b(&self) -> f64 {
        self.grids
            .par_iter()
            .map(|grid| grid.divergence_b().data().iter().fold(0.0, |a: f64, d| a.max(d.abs())))
            .reduce(|| 0.0, f64::max)
    }
}




/**
 * Split the mesh index space into equal blocks, ordered with the i axis
 * fastest.
 */
fn decompose(mesh: &Mesh, blocks: [usize; 3]) -> Result<Vec<IndexSpace>, Error> {
    let mut ranges = Vec::new();

    for (&axis, &b) in Axis::ALL.iter().zip(blocks.iter()) {
        let n = mesh.num_cells(axis);

        if b == 0 {
            return Err(Error::Decomposition(format!("zero blocks on axis {:?}", axis)))
        }
        if n % b as i64 != 0 {
            return Err(Error::Decomposition(format!(
                "{} cells on axis {:?} do not divide into {} blocks", n, axis, b)))
        }
        let size = n / b as i64;

        if mesh.is_active(axis) && size < NUM_GUARD {
            return Err(Error::Decomposition(format!(
                "blocks of {} cells on axis {:?} are narrower than the {} guard zones", size, axis, NUM_GUARD)))
        }
        ranges.push((0..b as i64).map(|m| m * size .. (m + 1) * size).collect::<Vec<_>>());
    }

    let mut spaces = Vec::new();

    for dk in &ranges[2] {
        for dj in &ranges[1] {
            for di in &ranges[0] {
                spaces.push(IndexSpace::new(di.clone(), dj.clone(), dk.clone()))
            }
        }
    }
    Ok(spaces)
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::boundary::BoundaryRegistry;
    use crate::error::Error;
    use crate::hydro::Primitive;
    use crate::mesh::Mesh;
    use crate::solvers::Scheme;
    use super::Domain;

    fn blast(magnetic: bool) -> impl Fn((f64, f64, f64)) -> Primitive + Sync {
        move |(x, y, _)| {
            let r2 = (x - 0.5).powi(2) + (y - 0.5).powi(2);
            let p = if r2 < 0.02 { 10.0 } else { 1.0 };
            let b = if magnetic { 0.5 } else { 0.0 };
            Primitive([1.0, 0.0, 0.0, 0.0, p, b, b, 0.0, 1.0])
        }
    }

    fn run(blocks: [usize; 3], magnetic: bool, periodic: bool, cycles: usize) -> Domain {
        let mesh = Mesh::uniform([0.0; 3], [1.0; 3], [16, 16, 1]).unwrap().with_periodic([periodic, periodic, false]);
        let scheme = Scheme { magnetic, ..Scheme::default() };
        let mut domain = Domain::new(mesh, blocks, scheme, BoundaryRegistry::outflow()).unwrap();
        domain.initialize(blast(magnetic)).unwrap();

        for _ in 0..cycles {
            domain.advance_hydro(0.005).unwrap();
            domain.complete_cycle(0.005);
        }
        domain
    }

    #[test]
    fn uneven_decomposition_is_a_setup_error() {
        let mesh = Mesh::uniform([0.0; 3], [1.0; 3], [10, 10, 1]).unwrap();
        let result = Domain::new(mesh, [3, 1, 1], Scheme::default(), BoundaryRegistry::outflow());
        assert!(matches!(result, Err(Error::Decomposition(_))));
    }

    #[test]
    fn blocks_narrower_than_the_guard_zones_are_a_setup_error() {
        let mesh = Mesh::uniform([0.0; 3], [1.0; 3], [8, 1, 1]).unwrap();
        let result = Domain::new(mesh.clone(), [8, 1, 1], Scheme::default(), BoundaryRegistry::outflow());
        assert!(matches!(result, Err(Error::Decomposition(_))));

        let mut domain = Domain::new(mesh, [4, 1, 1], Scheme::default(), BoundaryRegistry::outflow()).unwrap();
        domain.initialize(|_| Primitive([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])).unwrap();
        domain.advance_hydro(0.01).unwrap();
    }

    #[test]
    fn missing_boundary_condition_is_a_setup_error() {
        let mesh = Mesh::uniform([0.0; 3], [1.0; 3], [10, 10, 1]).unwrap();
        let result = Domain::new(mesh, [1, 1, 1], Scheme::default(), BoundaryRegistry::new());
        assert!(matches!(result, Err(Error::MissingBoundaryCondition(_))));
    }

    #[test]
    fn block_decomposition_reproduces_the_single_block_result() {
        for &periodic in [false, true].iter() {
            let single = run([1, 1, 1], true, periodic, 3);
            let blocks = run([2, 4, 1], true, periodic, 3);
            let a = single.snapshot();
            let b = blocks.snapshot();

            for grid in &b.grids {
                for index in grid.conserved.index_space().iter() {
                    let u = grid.conserved.get_slice(index);
                    let v = a.grids[0].conserved.get_slice(index);
                    for (x, y) in u.iter().zip(v) {
                        assert!((x - y).abs() < 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn constrained_transport_keeps_the_field_divergence_free() {
        let domain = run([2, 2, 1], true, true, 5);
        assert!(domain.max_divergence_b() < 1e-10);
        assert_eq!(domain.cycle(), 5);
    }

    #[test]
    fn l1_error_of_the_initial_state_vanishes() {
        let mut domain = run([2, 1, 1], false, false, 0);
        let f = blast(false);
        let gamma = domain.scheme().gamma_law_index;
        assert_eq!(domain.l1_error(|x| f(x).to_conserved(gamma)), 0.0);
        domain.advance_hydro(0.01).unwrap();
        assert!(domain.l1_error(|x| f(x).to_conserved(gamma)) > 0.0);
    }
}
