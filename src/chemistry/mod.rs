//! Non-equilibrium ionization and thermal chemistry of hydrogen, operator
//! split from the hydrodynamic update and sub-cycled on its own time step.

pub mod radiation;
pub mod rates;
pub mod state;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::domain::Domain;
use crate::error::Error;
use crate::grid::Grid;
use crate::hydro::Conserved;
use crate::timestep::TimestepController;
pub use radiation::RadiationPlane;
pub use rates::{RateModel, StandardRates};
pub use state::{CellPhase, ChemistryState};




/// A cell whose neutral density is within this factor of the floor is
/// treated as sitting on the floor.
const FLOOR_TOLERANCE: f64 = 1.0001;

/// Molecular heating and cooling are applied only where the ionized
/// fraction is below this value, or above one minus it.
const MOLECULAR_FRACTION: f64 = 0.1;




/**
 * Physical constants, step controls and radiation sources of the chemistry
 * update. Quantities are in CGS units except where a code time is implied;
 * `time_unit` converts the rate coefficients from seconds to code time.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChemistryConfig {
    pub photoionization_cross_section: f64,
    pub hydrogen_mass: f64,
    pub mean_neutral_mass: f64,
    pub photon_excess_energy: f64,
    pub carbon_abundance: f64,
    pub boltzmann_constant: f64,
    pub time_unit: f64,

    /// Largest relative change of the total energy in one sub-step.
    pub max_de_iter: f64,
    /// Largest relative change of the thermal energy in one sub-step.
    pub max_de_therm_iter: f64,
    /// Largest relative change of the electron or neutral density in one
    /// sub-step.
    pub max_dx_iter: f64,

    /// Largest relative changes over a whole sub-cycle; a sub-cycle stops
    /// once more than `max_cell_count` cells exceed any of them. A value
    /// <= 0 disables the limit.
    pub max_de_step: f64,
    pub max_de_therm_step: f64,
    pub max_dx_step: f64,
    pub max_cell_count: usize,

    pub temperature_floor: f64,
    pub temperature_ceiling: Option<f64>,

    /// The neutral density floor is the smaller of this fraction of the
    /// mass density and `neutral_density_floor`, if given.
    pub ionization_fraction_floor: f64,
    pub neutral_density_floor: Option<f64>,

    pub max_substeps: usize,
    pub molecular_cooling: bool,
    pub radiation: Vec<RadiationPlane>,
}

impl Default for ChemistryConfig {
    fn default() -> Self {
        Self {
            photoionization_cross_section: 6.3e-18,
            hydrogen_mass: 1.6733e-24,
            mean_neutral_mass: 2.1e-24,
            photon_excess_energy: 3.84e-12,
            carbon_abundance: 3.0e-4,
            boltzmann_constant: 1.380658e-16,
            time_unit: 1.0,
            max_de_iter: 0.1,
            max_de_therm_iter: 0.25,
            max_dx_iter: 0.1,
            max_de_step: 1.0,
            max_de_therm_step: 4.0,
            max_dx_step: 1.0,
            max_cell_count: 0,
            temperature_floor: 10.0,
            temperature_ceiling: None,
            ionization_fraction_floor: 1e-6,
            neutral_density_floor: None,
            max_substeps: 10000,
            molecular_cooling: false,
            radiation: Vec::new(),
        }
    }
}




/// Number densities of one cell.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Composition {
    pub neutral: f64,
    pub ionized: f64,
    pub electrons: f64,
}




// ============================================================================
impl Composition {

    /// Electrons per hydrogen nucleus. Carbon contributes electrons in
    /// neutral gas, so the value may slightly exceed one.
    pub fn electron_fraction(&self) -> f64 {
        self.electrons / (self.neutral + self.ionized)
    }

    /// Ionized hydrogen per hydrogen nucleus, between zero and one.
    pub fn ionization_fraction(&self) -> f64 {
        self.ionized / (self.neutral + self.ionized)
    }
}




// ============================================================================
impl ChemistryConfig {

    pub fn validate(&self) -> Result<(), Error> {
        let positive = [
            ("photoionization_cross_section", self.photoionization_cross_section),
            ("hydrogen_mass", self.hydrogen_mass),
            ("mean_neutral_mass", self.mean_neutral_mass),
            ("boltzmann_constant", self.boltzmann_constant),
            ("time_unit", self.time_unit),
            ("max_de_iter", self.max_de_iter),
            ("max_de_therm_iter", self.max_de_therm_iter),
            ("max_dx_iter", self.max_dx_iter),
            ("temperature_floor", self.temperature_floor),
            ("ionization_fraction_floor", self.ionization_fraction_floor),
        ];
        for (name, value) in positive.iter() {
            if !(*value > 0.0) {
                return Err(Error::Config(format!("chemistry.{} must be positive", name)))
            }
        }
        if let Some(ceiling) = self.temperature_ceiling {
            if !(ceiling > self.temperature_floor) {
                return Err(Error::Config("chemistry.temperature_ceiling must exceed the floor".into()))
            }
        }
        if self.max_substeps == 0 {
            return Err(Error::Config("chemistry.max_substeps must be at least 1".into()))
        }
        for plane in &self.radiation {
            if !(plane.flux >= 0.0) {
                return Err(Error::Config("radiation flux must be non-negative".into()))
            }
        }
        Ok(())
    }

    pub fn composition(&self, u: &Conserved) -> Composition {
        let neutral = u.neutral_density() / self.hydrogen_mass;
        let ionized = (u.mass_density() - u.neutral_density()) / self.hydrogen_mass;
        let electrons = ionized + u.mass_density() * self.carbon_abundance / (14.0 * self.hydrogen_mass);
        Composition { neutral, ionized, electrons }
    }

    /// Mean mass per particle at the given electron fraction.
    pub fn mean_particle_mass(&self, electron_fraction: f64) -> f64 {
        let x = electron_fraction;
        x * 0.5 * self.hydrogen_mass + (1.0 - x) * self.mean_neutral_mass
    }

    pub fn temperature(&self, u: &Conserved, gamma_law_index: f64) -> f64 {
        let x = self.composition(u).electron_fraction();
        let e_sp = u.internal_energy_density() / u.mass_density();
        (gamma_law_index - 1.0) * e_sp * self.mean_particle_mass(x) / self.boltzmann_constant
    }

    /// Specific thermal energy of gas at the given temperature.
    pub fn specific_energy(&self, temperature: f64, electron_fraction: f64, gamma_law_index: f64) -> f64 {
        temperature * self.boltzmann_constant / (self.mean_particle_mass(electron_fraction) * (gamma_law_index - 1.0))
    }

    pub fn neutral_floor(&self, mass_density: f64) -> f64 {
        let floor = mass_density * self.ionization_fraction_floor;
        match self.neutral_density_floor {
            Some(limit) => floor.min(limit),
            None => floor,
        }
    }
}




/// Number of cells a range check changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Clamped {
    pub neutral_density: usize,
    pub temperature: usize,
}




/**
 * Clamp the neutral density of every interior cell into `[floor, rho]`,
 * and its temperature into the configured bounds by resetting the thermal
 * energy. Non-finite values are clamped to the floor. This is a
 * recoverable condition; the number of cells changed is logged.
 */
pub fn check_range(grid: &mut Grid, config: &ChemistryConfig, gamma_law_index: f64) -> Clamped {
    let mut clamped = Clamped::default();

    for index in grid.interior().clone().iter() {
        let u = grid.conserved.get_slice_mut(index);
        let d = u[0];
        let floor = config.neutral_floor(d);

        if !(u[8] >= floor) {
            u[8] = floor;
            clamped.neutral_density += 1;
        } else if u[8] > d {
            u[8] = d;
            clamped.neutral_density += 1;
        }

        let cons = Conserved::from_slice(u);
        let t = config.temperature(&cons, gamma_law_index);
        let bound = if !(t >= config.temperature_floor) {
            Some(config.temperature_floor)
        } else {
            config.temperature_ceiling.filter(|&ceiling| t > ceiling)
        };

        if let Some(t) = bound {
            let x = config.composition(&cons).electron_fraction();
            u[4] = cons.kinetic_energy_density()
                + cons.magnetic_energy_density()
                + config.specific_energy(t, x, gamma_law_index) * d;
            clamped.temperature += 1;
        }
    }
    if clamped != Clamped::default() {
        debug!(
            "grid {}: clamped {} neutral densities and {} temperatures",
            grid.id(),
            clamped.neutral_density,
            clamped.temperature);
    }
    clamped
}




/// Record each cell's energies and electron fraction at the start of a
/// sub-cycle.
pub fn save_initial(grid: &mut Grid, config: &ChemistryConfig) {
    for index in grid.interior().clone().iter() {
        let u = grid.conserved_at(index);
        let x = config.composition(&u).electron_fraction();
        grid.chemistry.save_initial(index, u.energy_density(), u.internal_energy_density(), x);
    }
}




/**
 * Compute the neutral density rate of every interior cell from
 * photoionization, radiative recombination and collisional ionization, and
 * return the largest sub-step which changes the electron and neutral
 * densities by at most the configured fraction. Oscillating rates are
 * damped.
 */
pub fn compute_chem_rates(
    grid: &mut Grid,
    config: &ChemistryConfig,
    rates: &dyn RateModel,
    gamma_law_index: f64,
) -> Result<f64, Error> {
    let m = config.max_dx_iter;
    let mut dt_min = f64::INFINITY;

    for index in grid.interior().clone().iter() {
        let u = grid.conserved_at(index);
        let c = config.composition(&u);
        let t = config.temperature(&u, gamma_law_index).max(config.temperature_floor);
        let time_unit = config.time_unit;

        let nhdot = rates.recombination(t) * time_unit * c.electrons * c.ionized
            - grid.chemistry.photoionization_rate(index) * c.neutral
            - rates.collisional_ionization(t) * time_unit * c.electrons * c.neutral;

        let nhdot = nhdot * grid.chemistry.track_sign(index, nhdot);
        grid.chemistry.set_neutral_rate(index, nhdot);

        let floor = config.neutral_floor(u.mass_density());

        let dt = if nhdot > 0.0 {
            (m / (1.0 + m) * c.electrons / nhdot).min(m * c.neutral / nhdot)
        } else if nhdot < 0.0 && u.neutral_density() > FLOOR_TOLERANCE * floor {
            let dt_neutral = -m / (1.0 + m) * c.neutral / nhdot;

            if c.electrons > 0.0 {
                dt_neutral.min(-m * c.electrons / nhdot)
            } else {
                dt_neutral
            }
        } else {
            f64::INFINITY
        };

        if dt < 0.0 {
            return Err(Error::ChemistryRate { grid: grid.id(), index })
        }
        dt_min = dt_min.min(dt);
    }
    Ok(dt_min)
}




/**
 * Compute the energy rate of every interior cell from photoheating,
 * recombination and Lyman-alpha cooling, and optionally molecular heating
 * and cooling, and return the largest sub-step which changes the total and
 * thermal energies by at most the configured fractions. Cooling which
 * could at most reach the temperature floor does not limit the step.
 */
pub fn compute_therm_rates(grid: &mut Grid, config: &ChemistryConfig, rates: &dyn RateModel, gamma_law_index: f64) -> f64 {
    let de = config.max_de_iter;
    let dth = config.max_de_therm_iter;
    let mut dt_min = f64::INFINITY;

    for index in grid.interior().clone().iter() {
        let u = grid.conserved_at(index);
        let c = config.composition(&u);
        let t = config.temperature(&u, gamma_law_index);
        let floor = config.neutral_floor(u.mass_density());
        let nhdot = grid.chemistry.neutral_rate(index);

        if !(t >= config.temperature_floor) || (nhdot < 0.0 && u.neutral_density() < FLOOR_TOLERANCE * floor) {
            grid.chemistry.set_energy_rate(index, 0.0);
            continue
        }

        let time_unit = config.time_unit;
        let mut edot = grid.chemistry.photoionization_rate(index) * config.photon_excess_energy * c.neutral
            - rates.recombination_cooling(t) * time_unit * c.ionized * c.electrons
            + rates.lyman_alpha_cooling(c.neutral, c.electrons, t) * time_unit;

        if config.molecular_cooling {
            let f = c.ionization_fraction();

            if f < MOLECULAR_FRACTION || f > 1.0 - MOLECULAR_FRACTION {
                let n = c.neutral + c.ionized;
                edot += rates.molecular_heating() * time_unit * n - rates.molecular_cooling(t) * time_unit * n * n;
            }
        }
        grid.chemistry.set_energy_rate(index, edot);

        let e = u.energy_density();
        let e_th = u.internal_energy_density();

        let dt = if edot > 0.0 {
            (de * e / edot).min(dth * e_th / edot)
        } else if edot < 0.0 {
            let x = c.electron_fraction();
            let e_th_min = config.specific_energy(config.temperature_floor, x, gamma_law_index) * u.mass_density();
            let e_min = u.kinetic_energy_density() + u.magnetic_energy_density() + e_th_min;

            if e_th / (1.0 + dth) < e_th_min && e / (1.0 + de) < e_min {
                continue
            }
            (-de / (1.0 + de) * e / edot).min(-dth / (1.0 + dth) * e_th / edot)
        } else {
            f64::INFINITY
        };
        dt_min = dt_min.min(dt);
    }
    dt_min
}




/**
 * Advance the total energy and neutral density of every active cell by
 * `dt` with the current rates. Cells on the neutral density floor which
 * would be ionized further are left alone.
 */
pub fn ionization_update(grid: &mut Grid, config: &ChemistryConfig, dt: f64) {
    for index in grid.interior().clone().iter() {
        if grid.chemistry.phase(index) == CellPhase::Stable {
            continue
        }
        let edot = grid.chemistry.energy_rate(index);
        let nhdot = grid.chemistry.neutral_rate(index);
        let u = grid.conserved.get_slice_mut(index);
        let floor = config.neutral_floor(u[0]);

        if nhdot > 0.0 || u[8] > FLOOR_TOLERANCE * floor {
            u[4] += edot * dt;
            u[8] += nhdot * dt * config.hydrogen_mass;
        }
    }
}




/**
 * Number of cells whose total energy, thermal energy or electron fraction
 * has changed by more than the per-cycle limits since the start of the
 * sub-cycle.
 */
pub fn count_step_limits(grid: &Grid, config: &ChemistryConfig) -> usize {
    let exceeds = |now: f64, then: f64, limit: f64| {
        limit > 0.0 && (now / then >= 1.0 + limit || then / now >= 1.0 + limit)
    };
    let state = grid.chemistry_state();

    grid.interior()
        .iter()
        .filter(|&index| {
            let u = grid.conserved_at(index);
            let x = config.composition(&u).electron_fraction();

            exceeds(u.internal_energy_density(), state.initial_thermal_energy(index), config.max_de_therm_step)
                || exceeds(u.energy_density(), state.initial_energy(index), config.max_de_step)
                || exceeds(x, state.initial_electron_fraction(index), config.max_dx_step)
        })
        .count()
}




/// Whether more than `max_cell_count` cells over all grids have reached the
/// per-cycle change limits.
pub fn step_limits_reached(grids: &[Grid], config: &ChemistryConfig) -> bool {
    let exceeded: usize = grids.par_iter().map(|grid| count_step_limits(grid, config)).sum();

    if exceeded > config.max_cell_count {
        debug!("chemistry stopped: {} cells reached the step limits", exceeded);
        true
    } else {
        false
    }
}




/// What a chemistry sub-cycle did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SubcycleReport {
    pub substeps: usize,
    pub chemical_steps: usize,
    pub thermal_steps: usize,
    pub time_done: f64,
    pub complete: bool,
}




// ============================================================================
impl SubcycleReport {

    /// When the sub-cycle stopped short of the coarse time, the time it did
    /// manage bounds the next hydrodynamic step.
    pub fn bound(&self) -> Option<f64> {
        if self.complete {
            None
        } else {
            Some(self.time_done)
        }
    }
}




/**
 * Drives the chemistry sub-cycle of each hydrodynamic step and keeps the
 * coarse time: the hydrodynamic time not yet consumed by chemistry.
 */
pub struct ChemistrySolver {
    config: ChemistryConfig,
    rates: Box<dyn RateModel>,
    coarse_time: f64,
}




// ============================================================================
impl ChemistrySolver {

    /// Solver with the standard rate fits.
    pub fn new(config: ChemistryConfig) -> Self {
        let rates = StandardRates::new(config.boltzmann_constant, config.molecular_cooling);
        Self::with_rate_model(config, Box::new(rates))
    }

    pub fn with_rate_model(config: ChemistryConfig, rates: Box<dyn RateModel>) -> Self {
        Self {
            config,
            rates,
            coarse_time: 0.0,
        }
    }

    pub fn config(&self) -> &ChemistryConfig {
        &self.config
    }

    pub fn coarse_time(&self) -> f64 {
        self.coarse_time
    }

    /// Add a hydrodynamic step to the coarse time.
    pub fn set_coarse_time(&mut self, dt_hydro: f64) {
        self.coarse_time += dt_hydro
    }

    /// Reset the coarse time, once chemistry has caught up with the
    /// hydrodynamics.
    pub fn clear_coarse_time(&mut self) {
        self.coarse_time = 0.0
    }

    pub(crate) fn restore_coarse_time(&mut self, coarse_time: f64) {
        self.coarse_time = coarse_time
    }

    /// Compute the photoionization rate of every cell from all sources.
    pub fn compute_photoionization(&self, domain: &mut Domain, time: f64) {
        for grid in domain.grids_mut() {
            grid.chemistry.clear_photoionization()
        }
        for plane in &self.config.radiation {
            plane.sweep(domain.grids_mut(), &self.config, time)
        }
    }

    /**
     * Sub-cycle the chemistry after a hydrodynamic step of `dt_hydro`.
     * Sub-steps of the smaller of the chemical and thermal bounds are
     * taken until the coarse time is consumed. The sub-cycle stops early
     * if the per-cycle change limits are reached, if the hydrodynamic
     * bound of the updated state falls below the time done, or after
     * `max_substeps` sub-steps; the remainder stays in the coarse time.
     */
    pub fn advance(&mut self, domain: &mut Domain, controller: &TimestepController, dt_hydro: f64) -> Result<SubcycleReport, Error> {
        self.set_coarse_time(dt_hydro);

        let gamma = domain.scheme().gamma_law_index;
        let target = self.coarse_time;
        let start = domain.time();
        let mut report = SubcycleReport::default();

        {
            let config = &self.config;
            domain.grids_mut().par_iter_mut().for_each(|grid| {
                check_range(grid, config, gamma);
                save_initial(grid, config);
            });
        }

        while report.substeps < self.config.max_substeps {
            self.compute_photoionization(domain, start + report.time_done);

            let config = &self.config;
            let rates = self.rates.as_ref();

            let dt_chem = domain
                .grids_mut()
                .par_iter_mut()
                .map(|grid| compute_chem_rates(grid, config, rates, gamma))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .fold(f64::INFINITY, f64::min);

            let dt_therm = domain
                .grids_mut()
                .par_iter_mut()
                .map(|grid| compute_therm_rates(grid, config, rates, gamma))
                .reduce(|| f64::INFINITY, f64::min);

            if dt_chem < dt_therm {
                report.chemical_steps += 1
            } else {
                report.thermal_steps += 1
            }

            let mut dt = dt_chem.min(dt_therm);

            if !(report.time_done + dt < target) {
                dt = target - report.time_done;
                report.complete = true;
            }

            domain.grids_mut().par_iter_mut().for_each(|grid| {
                ionization_update(grid, config, dt);
                check_range(grid, config, gamma);
            });

            report.time_done += dt;
            report.substeps += 1;

            if report.complete {
                break
            }

            if step_limits_reached(domain.grids(), config) {
                break
            }
            if controller.hydro_timestep(domain)? < report.time_done {
                debug!("chemistry stopped: hydrodynamic step fell below the time done");
                break
            }
        }

        if report.complete {
            self.clear_coarse_time()
        } else {
            self.coarse_time -= report.time_done
        }

        info!(
            "chemistry done in {} sub-steps: {} thermal, {} chemical; time done {:.4e} of {:.4e}",
            report.substeps,
            report.thermal_steps,
            report.chemical_steps,
            report.time_done,
            target);

        Ok(report)
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::boundary::{BoundaryRegistry, Face, Side};
    use crate::domain::Domain;
    use crate::hydro::Primitive;
    use crate::index_space::Axis;
    use crate::mesh::Mesh;
    use crate::solvers::Scheme;
    use crate::timestep::{TimestepConfig, TimestepController};
    use super::*;

    const GAMMA: f64 = 5.0 / 3.0;

    /// Photoionization only: no recombination and no cooling.
    struct PhotoionizationOnly;

    impl RateModel for PhotoionizationOnly {
        fn recombination(&self, _: f64) -> f64 { 0.0 }
        fn collisional_ionization(&self, _: f64) -> f64 { 0.0 }
        fn recombination_cooling(&self, _: f64) -> f64 { 0.0 }
        fn lyman_alpha_cooling(&self, _: f64, _: f64, _: f64) -> f64 { 0.0 }
    }

    /// Absurd coefficients of both signs.
    struct Pathological;

    impl RateModel for Pathological {
        fn recombination(&self, t: f64) -> f64 { 1e30 * t }
        fn collisional_ionization(&self, _: f64) -> f64 { -1e25 }
        fn recombination_cooling(&self, _: f64) -> f64 { 1e40 }
        fn lyman_alpha_cooling(&self, _: f64, _: f64, t: f64) -> f64 { 1e38 * t.sin() }
    }

    fn config() -> ChemistryConfig {
        ChemistryConfig {
            photoionization_cross_section: 1.0,
            hydrogen_mass: 1.0,
            mean_neutral_mass: 1.0,
            photon_excess_energy: 0.1,
            carbon_abundance: 0.0,
            boltzmann_constant: 1.0,
            temperature_floor: 1e-3,
            radiation: vec![RadiationPlane::new(Face::new(Axis::I, Side::Lower), 1.0)],
            ..ChemistryConfig::default()
        }
    }

    fn neutral_domain() -> Domain {
        let mesh = Mesh::uniform([0.0; 3], [8.0, 1.0, 1.0], [8, 1, 1]).unwrap();
        let mut domain = Domain::new(mesh, [2, 1, 1], Scheme::default(), BoundaryRegistry::outflow()).unwrap();
        domain.initialize(|_| Primitive([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])).unwrap();
        domain
    }

    fn controller() -> TimestepController {
        TimestepController::new(TimestepConfig::default())
    }

    fn ionization_fractions(domain: &Domain, config: &ChemistryConfig) -> Vec<f64> {
        domain
            .grids()
            .iter()
            .flat_map(|g| g.interior().iter().map(move |i| g.conserved_at(i)).collect::<Vec<_>>())
            .map(|u| config.composition(&u).ionization_fraction())
            .collect()
    }

    #[test]
    fn temperature_round_trips_through_the_specific_energy() {
        let config = ChemistryConfig::default();
        let x = 0.3;
        let e_sp = config.specific_energy(8000.0, x, GAMMA);
        let d = 1e-22;
        let s = d * (1.0 - x);
        let u = Conserved([d, 0.0, 0.0, 0.0, e_sp * d, 0.0, 0.0, 0.0, s]);
        let x_u = config.composition(&u).electron_fraction();
        let t = config.temperature(&u, GAMMA);
        assert!((t - 8000.0 * config.mean_particle_mass(x_u) / config.mean_particle_mass(x)).abs() < 1e-6);
    }

    #[test]
    fn ionization_rises_monotonically_without_reaching_one() {
        let config = config();
        let mut domain = neutral_domain();
        let mut solver = ChemistrySolver::with_rate_model(config.clone(), Box::new(PhotoionizationOnly));
        let controller = controller();
        let mut previous = ionization_fractions(&domain, &config);

        for _ in 0..40 {
            let report = solver.advance(&mut domain, &controller, 0.5).unwrap();
            assert!(report.substeps > 0);
            let current = ionization_fractions(&domain, &config);

            for (now, then) in current.iter().zip(&previous) {
                assert!(now >= then);
                assert!(*now < 1.0);
            }
            previous = current;
        }
        assert!(previous[0] > 0.9);
        assert!(previous[0] > previous[7]);
    }

    #[test]
    fn pathological_rates_are_clamped() {
        let config = ChemistryConfig {
            temperature_ceiling: Some(50.0),
            max_substeps: 25,
            ..config()
        };
        let mut domain = neutral_domain();
        let mut solver = ChemistrySolver::with_rate_model(config.clone(), Box::new(Pathological));
        let controller = controller();

        for _ in 0..4 {
            solver.advance(&mut domain, &controller, 0.1).unwrap();

            for grid in domain.grids() {
                for index in grid.interior().iter() {
                    let u = grid.conserved_at(index);
                    let f = config.composition(&u).ionization_fraction();
                    let t = config.temperature(&u, GAMMA);
                    assert!(f >= 0.0 && f <= 1.0);
                    assert!(t >= config.temperature_floor * (1.0 - 1e-9));
                    assert!(t <= 50.0 * (1.0 + 1e-9));
                }
            }
        }
    }

    #[test]
    fn non_finite_cells_are_clamped_to_the_floors() {
        let config = config();
        let mut domain = neutral_domain();
        let grid = &mut domain.grids_mut()[0];
        grid.conserved_mut().set((2, 0, 0), 4, f64::NAN);
        grid.conserved_mut().set((2, 0, 0), 8, f64::NAN);

        let clamped = check_range(grid, &config, GAMMA);
        let u = grid.conserved_at((2, 0, 0));
        assert_eq!(clamped, Clamped { neutral_density: 1, temperature: 1 });
        assert_eq!(u.neutral_density(), config.neutral_floor(1.0));
        assert!((config.temperature(&u, GAMMA) - config.temperature_floor).abs() < 1e-12);
    }

    #[test]
    fn energy_jump_reaches_the_step_limits() {
        let config = config();
        let mut domain = neutral_domain();
        for grid in domain.grids_mut() {
            save_initial(grid, &config);
        }
        assert!(!step_limits_reached(domain.grids(), &config));

        let e = domain.grids()[1].conserved_at((5, 0, 0)).energy_density();
        domain.grids_mut()[1].conserved_mut().set((5, 0, 0), 4, 3.0 * e);
        assert_eq!(count_step_limits(&domain.grids()[1], &config), 1);
        assert!(step_limits_reached(domain.grids(), &config));
    }

    #[test]
    fn coarse_time_accumulates_until_cleared() {
        let mut solver = ChemistrySolver::new(ChemistryConfig::default());
        solver.set_coarse_time(0.25);
        solver.set_coarse_time(0.5);
        assert_eq!(solver.coarse_time(), 0.75);
        solver.clear_coarse_time();
        assert_eq!(solver.coarse_time(), 0.0);
    }

    #[test]
    fn complete_sub_cycle_clears_the_coarse_time() {
        let config = config();
        let mut domain = neutral_domain();
        let mut solver = ChemistrySolver::with_rate_model(config, Box::new(PhotoionizationOnly));
        let report = solver.advance(&mut domain, &controller(), 1e-3).unwrap();
        assert!(report.complete);
        assert_eq!(report.bound(), None);
        assert_eq!(solver.coarse_time(), 0.0);
    }

    #[test]
    fn interrupted_sub_cycle_keeps_the_remainder() {
        let config = ChemistryConfig { max_substeps: 1, ..config() };
        let mut domain = neutral_domain();
        let mut solver = ChemistrySolver::with_rate_model(config, Box::new(PhotoionizationOnly));
        let report = solver.advance(&mut domain, &controller(), 100.0).unwrap();
        assert!(!report.complete);
        assert_eq!(report.substeps, 1);
        assert_eq!(report.bound(), Some(report.time_done));
        assert!((solver.coarse_time() - (100.0 - report.time_done)).abs() < 1e-12);
    }

    #[test]
    fn cells_without_sources_are_stable() {
        let config = ChemistryConfig { radiation: Vec::new(), ..config() };
        let mut domain = neutral_domain();
        let before = domain.grids()[0].conserved_at((1, 0, 0));
        let mut solver = ChemistrySolver::with_rate_model(config, Box::new(PhotoionizationOnly));
        solver.advance(&mut domain, &controller(), 0.1).unwrap();
        assert_eq!(domain.grids()[0].chemistry_state().phase((1, 0, 0)), CellPhase::Stable);
        assert_eq!(domain.grids()[0].conserved_at((1, 0, 0)), before);
    }
}
