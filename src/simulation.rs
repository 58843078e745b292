use log::{info, warn};
use crate::chemistry::{ChemistrySolver, SubcycleReport};
use crate::config::Config;
use crate::domain::Domain;
use crate::error::Error;
use crate::restart::Checkpoint;
use crate::timestep::TimestepController;




/// What one integration cycle did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub time: f64,
    pub dt: f64,
    pub retries: usize,
    pub chemistry: Option<SubcycleReport>,
}




/**
 * The driver: owns the domain, the time step controller and the optional
 * chemistry solver, and advances them one cycle at a time. A cycle is the
 * hydrodynamic update followed by the chemistry sub-cycle. A cycle which
 * fails numerically is rolled back and retried with half the time step.
 */
pub struct Simulation {
    domain: Domain,
    controller: TimestepController,
    chemistry: Option<ChemistrySolver>,
    max_retries: usize,
    chemistry_bound: Option<f64>,
}




// ============================================================================
impl Simulation {

    pub fn new(domain: Domain, controller: TimestepController, chemistry: Option<ChemistrySolver>, max_retries: usize) -> Self {
        Self {
            domain,
            controller,
            chemistry,
            max_retries,
            chemistry_bound: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self::new(
            config.domain()?,
            TimestepController::new(config.timestep.clone()),
            config.chemistry.clone().map(ChemistrySolver::new),
            config.run.max_retries))
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn domain_mut(&mut self) -> &mut Domain {
        &mut self.domain
    }

    pub fn controller(&self) -> &TimestepController {
        &self.controller
    }

    pub fn chemistry(&self) -> Option<&ChemistrySolver> {
        self.chemistry.as_ref()
    }

    pub fn time(&self) -> f64 {
        self.domain.time()
    }

    /**
     * Advance one cycle with the controller's time step, shortened to land
     * on `end_time` if given.
     */
    pub fn advance(&mut self, end_time: Option<f64>) -> Result<CycleReport, Error> {
        let mut dt = self.controller.next_timestep(&self.domain, self.chemistry_bound)?;

        if let Some(end_time) = end_time {
            let remaining = end_time - self.domain.time();

            if remaining > 0.0 {
                dt = dt.min(remaining)
            }
        }
        self.advance_with_timestep(dt)
    }

    /**
     * Advance one cycle of length `dt`, or a fraction of it if the cycle
     * had to be retried.
     */
    pub fn advance_with_timestep(&mut self, mut dt: f64) -> Result<CycleReport, Error> {
        let backup = self.domain.grids().to_vec();
        let coarse_time = self.chemistry.as_ref().map(ChemistrySolver::coarse_time);
        let mut retries = 0;

        loop {
            match self.try_cycle(dt) {
                Ok(chemistry) => {
                    self.domain.complete_cycle(dt);
                    self.chemistry_bound = chemistry.and_then(|report| report.bound());

                    let report = CycleReport {
                        cycle: self.domain.cycle(),
                        time: self.domain.time(),
                        dt,
                        retries,
                        chemistry,
                    };
                    info!("[{:06}] t={:.6} dt={:.3e}", report.cycle, report.time, report.dt);
                    return Ok(report)
                }
                Err(e) if e.is_numerical() && retries < self.max_retries => {
                    warn!("cycle {} failed with dt={:.3e}: {}; retrying with dt/2", self.domain.cycle() + 1, dt, e);
                    self.domain.restore_grids(backup.clone());

                    if let (Some(solver), Some(coarse_time)) = (self.chemistry.as_mut(), coarse_time) {
                        solver.restore_coarse_time(coarse_time)
                    }
                    dt *= 0.5;
                    retries += 1;
                }
                Err(e) => {
                    self.domain.restore_grids(backup);

                    if let (Some(solver), Some(coarse_time)) = (self.chemistry.as_mut(), coarse_time) {
                        solver.restore_coarse_time(coarse_time)
                    }
                    return Err(e)
                }
            }
        }
    }

    fn try_cycle(&mut self, dt: f64) -> Result<Option<SubcycleReport>, Error> {
        self.domain.advance_hydro(dt)?;

        match self.chemistry.as_mut() {
            Some(solver) => Ok(Some(solver.advance(&mut self.domain, &self.controller, dt)?)),
            None => Ok(None),
        }
    }

    /// Advance until `end_time` or `max_cycles` cycles, whichever is first,
    /// calling `on_cycle` after every cycle.
    pub fn run<F>(&mut self, end_time: f64, max_cycles: Option<u64>, mut on_cycle: F) -> Result<(), Error>
    where
        F: FnMut(&Self, &CycleReport) -> Result<(), Error>
    {
        while self.domain.time() < end_time && max_cycles.map_or(true, |n| self.domain.cycle() < n) {
            let report = self.advance(Some(end_time))?;
            on_cycle(self, &report)?;
        }
        Ok(())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        let coarse_time = self.chemistry.as_ref().map_or(0.0, ChemistrySolver::coarse_time);
        Checkpoint::capture(&self.domain, coarse_time, self.chemistry_bound)
    }

    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<(), Error> {
        let coarse_time = checkpoint.restore(&mut self.domain)?;

        if let Some(solver) = self.chemistry.as_mut() {
            solver.restore_coarse_time(coarse_time)
        }
        self.chemistry_bound = checkpoint.chemistry_bound;
        Ok(())
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::boundary::{BoundaryRegistry, Face, Side};
    use crate::chemistry::{ChemistryConfig, ChemistrySolver, RadiationPlane};
    use crate::config::Config;
    use crate::domain::Domain;
    use crate::hydro::Primitive;
    use crate::index_space::Axis;
    use crate::mesh::Mesh;
    use crate::solvers::Scheme;
    use crate::timestep::{TimestepConfig, TimestepController};
    use super::Simulation;

    fn shock_tube(max_retries: usize) -> Simulation {
        let mesh = Mesh::uniform([0.0; 3], [1.0; 3], [32, 1, 1]).unwrap();
        let mut domain = Domain::new(mesh, [2, 1, 1], Scheme::default(), BoundaryRegistry::outflow()).unwrap();
        domain.initialize(|(x, _, _)| {
            if x < 0.5 {
                Primitive([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
            } else {
                Primitive([0.125, 0.0, 0.0, 0.0, 0.1, 0.0, 0.0, 0.0, 1.0])
            }
        }).unwrap();
        Simulation::new(domain, TimestepController::new(TimestepConfig::default()), None, max_retries)
    }

    #[test]
    fn run_lands_on_the_end_time() {
        let mut sim = shock_tube(0);
        let mut cycles = 0;
        sim.run(0.05, None, |_, _| {
            cycles += 1;
            Ok(())
        }).unwrap();
        assert!((sim.time() - 0.05).abs() < 1e-12);
        assert_eq!(sim.domain().cycle(), cycles);
    }

    #[test]
    fn run_stops_after_max_cycles() {
        let mut sim = shock_tube(0);
        sim.run(10.0, Some(3), |_, _| Ok(())).unwrap();
        assert_eq!(sim.domain().cycle(), 3);
        assert!(sim.time() < 10.0);
    }

    #[test]
    fn oversized_step_is_retried_with_a_smaller_one() {
        let mut sim = shock_tube(12);
        let dt = 50.0 * sim.controller().hydro_timestep(sim.domain()).unwrap();
        let report = sim.advance_with_timestep(dt).unwrap();
        assert!(report.retries > 0);
        assert_eq!(report.dt, dt / 2f64.powi(report.retries as i32));
        assert_eq!(sim.time(), report.dt);
    }

    #[test]
    fn failed_cycle_leaves_the_state_untouched() {
        let mut sim = shock_tube(0);
        let before = sim.domain().grids().to_vec();
        let dt = 50.0 * sim.controller().hydro_timestep(sim.domain()).unwrap();
        assert!(sim.advance_with_timestep(dt).is_err());
        assert_eq!(sim.time(), 0.0);
        assert_eq!(sim.domain().cycle(), 0);

        for (a, b) in before.iter().zip(sim.domain().grids()) {
            assert_eq!(a.conserved(), b.conserved());
        }
    }

    #[test]
    fn ionizing_source_ionizes_the_tube() {
        let config = ChemistryConfig {
            photoionization_cross_section: 1.0,
            hydrogen_mass: 1.0,
            mean_neutral_mass: 1.0,
            boltzmann_constant: 1.0,
            carbon_abundance: 0.0,
            temperature_floor: 1e-3,
            radiation: vec![RadiationPlane::new(Face::new(Axis::I, Side::Lower), 10.0)],
            ..ChemistryConfig::default()
        };
        let mut sim = shock_tube(2);
        sim.chemistry = Some(ChemistrySolver::new(config.clone()));
        sim.run(0.02, None, |_, report| {
            assert!(report.chemistry.is_some());
            Ok(())
        }).unwrap();

        let first = sim.domain().grids()[0].conserved_at((0, 0, 0));
        assert!(config.composition(&first).ionization_fraction() > 0.0);

        for grid in sim.domain().grids() {
            for index in grid.interior().iter() {
                let u = grid.conserved_at(index);
                assert!(u.neutral_density() >= 0.0 && u.neutral_density() <= u.mass_density());
            }
        }
    }

    #[test]
    fn resumed_run_takes_the_same_step_as_the_uninterrupted_one() {
        let mut a = shock_tube(0);
        a.run(1.0, Some(2), |_, _| Ok(())).unwrap();
        a.chemistry_bound = Some(1e-5);

        let mut b = shock_tube(0);
        b.restore(&a.checkpoint()).unwrap();
        assert_eq!(b.chemistry_bound, Some(1e-5));

        let ra = a.advance(None).unwrap();
        let rb = b.advance(None).unwrap();
        assert_eq!(ra.dt, 1e-5);
        assert_eq!(rb.dt, ra.dt);
        assert_eq!(rb.time, ra.time);

        for (ga, gb) in a.domain().grids().iter().zip(b.domain().grids()) {
            assert_eq!(ga.conserved(), gb.conserved());
        }
    }

    #[test]
    fn simulation_is_built_from_a_config() {
        let config = Config::from_toml("[mesh]\ncells = [16, 1, 1]\nblocks = [2, 1, 1]\n[chemistry]\n").unwrap();
        let sim = Simulation::from_config(&config).unwrap();
        assert!(sim.chemistry().is_some());
        assert_eq!(sim.domain().grids().len(), 2);
    }
}
