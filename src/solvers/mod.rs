//! The finite-volume update of a grid: interface fluxes, constrained
//! transport of the face-centered field, and explicit diffusion.

pub mod diffusion;
pub mod godunov;

use serde::{Deserialize, Serialize};
use crate::hydro::{Reconstruction, RiemannSolver};
pub use diffusion::Diffusion;
pub use godunov::{GridStage, GuardZones};




/**
 * Explicit time integration scheme
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeIntegration {
    ForwardEuler,
    Rk2,
}




// ============================================================================
impl TimeIntegration {

    /// Weights `w` of the stage updates `U = (1 - w) U0 + w (U + dt L(U))`.
    pub fn stage_weights(&self) -> &'static [f64] {
        match self {
            TimeIntegration::ForwardEuler => &[1.0],
            TimeIntegration::Rk2 => &[1.0, 0.5],
        }
    }
}




/**
 * Everything the stage update needs to know about the numerical method
 */
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scheme {
    pub gamma_law_index: f64,
    pub magnetic: bool,
    pub riemann_solver: RiemannSolver,
    pub reconstruction: Reconstruction,
    pub time_integration: TimeIntegration,
    pub diffusion: Diffusion,
}




// ============================================================================
impl Default for Scheme {
    fn default() -> Self {
        Self {
            gamma_law_index: 5.0 / 3.0,
            magnetic: false,
            riemann_solver: RiemannSolver::Hlle,
            reconstruction: Reconstruction::default(),
            time_integration: TimeIntegration::Rk2,
            diffusion: Diffusion::default(),
        }
    }
}
