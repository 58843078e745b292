use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use crate::domain::Domain;
use crate::error::Error;
use crate::grid::Grid;
use crate::index_space::{component, Axis};




/// Parameters of the time step controller.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimestepConfig {
    /// Fraction of the stability bound taken as the time step; must lie
    /// in (0, 1).
    pub courant_number: f64,

    /// Largest allowed ratio of a time step to the previous one.
    pub max_growth_factor: f64,

    /// Optional hard upper limit on the time step.
    pub dt_max: Option<f64>,
}

impl Default for TimestepConfig {
    fn default() -> Self {
        Self {
            courant_number: 0.4,
            max_growth_factor: 1.25,
            dt_max: None,
        }
    }
}




// ============================================================================
impl TimestepConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.courant_number > 0.0 && self.courant_number < 1.0) {
            return Err(Error::Config(format!("courant number {} is not in (0, 1)", self.courant_number)))
        }
        if !(self.max_growth_factor >= 1.0) {
            return Err(Error::Config("max growth factor must be at least 1".into()))
        }
        if let Some(dt_max) = self.dt_max {
            if !(dt_max > 0.0) {
                return Err(Error::Config("dt_max must be positive".into()))
            }
        }
        Ok(())
    }
}




/// Computes the stable time step of each cycle from the state of a domain.
#[derive(Clone, Debug)]
pub struct TimestepController {
    config: TimestepConfig,
}




// ============================================================================
impl TimestepController {

    pub fn new(config: TimestepConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimestepConfig {
        &self.config
    }

    /**
     * The CFL bound: the Courant number over the largest value of
     * (|v_a| + cf_a) / dx_a, over the interior cells and active axes of every
     * grid. Each grid is reduced on its own thread, then the minimum is
     * taken. Invalid cell states are fatal. Gas at rest with no pressure and
     * no field has no signal speed, and the bound is infinite; such a run
     * needs `dt_max`.
     */
    pub fn hydro_timestep(&self, domain: &Domain) -> Result<f64, Error> {
        let gamma = domain.scheme().gamma_law_index;
        let rates = domain
            .grids()
            .par_iter()
            .map(|grid| max_wave_rate(grid, gamma))
            .collect::<Result<Vec<_>, _>>()?;

        let rate = rates.into_iter().fold(0.0, f64::max);
        Ok(self.config.courant_number / rate)
    }

    /**
     * The explicit diffusion bound `C dx^2 / (2 n D)` with `dx` the smallest
     * cell width, `n` the number of active dimensions and `D` the largest
     * diffusion coefficient. Infinite when diffusion is off.
     */
    pub fn diffusive_timestep(&self, domain: &Domain) -> f64 {
        let coefficient = domain.scheme().diffusion.max_coefficient();

        if coefficient <= 0.0 {
            return f64::INFINITY
        }
        let mesh = domain.mesh();
        let dx = mesh.min_cell_width();
        let ndim = mesh.num_active_dims().max(1) as f64;
        self.config.courant_number * dx * dx / (2.0 * ndim * coefficient)
    }

    /**
     * The time step of the next cycle: the harmonic combination of the
     * hydrodynamic and diffusive bounds, limited by the chemistry bound and
     * `dt_max`, and by the growth factor relative to the last accepted
     * step. A result which is not finite and positive is an error.
     */
    pub fn next_timestep(&self, domain: &Domain, chemistry_bound: Option<f64>) -> Result<f64, Error> {
        let hydro = self.hydro_timestep(domain)?;
        let diffusive = self.diffusive_timestep(domain);

        let mut dt = if diffusive.is_finite() {
            1.0 / (1.0 / hydro + 1.0 / diffusive)
        } else {
            hydro
        };

        if let Some(bound) = chemistry_bound {
            dt = dt.min(bound)
        }
        if let Some(dt_max) = self.config.dt_max {
            dt = dt.min(dt_max)
        }
        if let Some(previous) = domain.dt() {
            dt = dt.min(previous * self.config.max_growth_factor)
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(Error::InvalidTimestep(dt))
        }
        Ok(dt)
    }
}




/**
 * Largest inverse crossing time of the interior cells of a grid. For MHD
 * the cell-centered field is replaced by a bound which also covers the
 * face-centered values, |Bc| + |Bf - Bc| on the lower face.
 */
fn max_wave_rate(grid: &Grid, gamma_law_index: f64) -> Result<f64, Error> {
    let mesh = grid.mesh();
    let axes = mesh.active_axes();
    let mut rate: f64 = 0.0;

    for index in grid.interior().iter() {
        let mut p = grid.primitive_at(index, gamma_law_index)?;

        if let Some(fields) = grid.face_fields() {
            for axis in Axis::ALL.iter() {
                let n = axis.index();
                let bc = p.0[5 + n];
                let bf = fields[n].get(index, 0);
                p.0[5 + n] = bc.abs() + (bf - bc).abs();
            }
        }
        for &axis in &axes {
            let dx = mesh.cell_width(axis, component(index, axis));
            let speed = p
                .max_signal_speed(axis, gamma_law_index)
                .map_err(|e| e.at_position(grid.id(), index))?;
            rate = rate.max(speed / dx);
        }
    }
    Ok(rate)
}
