use serde::{Deserialize, Serialize};
use super::error::Error;
use super::geometry::Direction;
use super::mhd::{Conserved, Primitive};




/**
 * Enum for Riemann solver type
 */
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiemannSolver {
    Hlle,
    Llf,
}




// ============================================================================
impl RiemannSolver {

    /**
     * Compute the interface flux between the left and right states. For MHD
     * the caller must have set the normal field component of both states
     * to the same face-centered value.
     */
    pub fn flux(&self, pl: &Primitive, pr: &Primitive, direction: Direction, gamma_law_index: f64) -> Result<Conserved, Error> {
        match self {
            RiemannSolver::Hlle => riemann_hlle(pl, pr, direction, gamma_law_index),
            RiemannSolver::Llf => riemann_llf(pl, pr, direction, gamma_law_index),
        }
    }
}




// ============================================================================
pub fn riemann_hlle(pl: &Primitive, pr: &Primitive, direction: Direction, gamma_law_index: f64) -> Result<Conserved, Error> {
    let ul = pl.to_conserved(gamma_law_index);
    let ur = pr.to_conserved(gamma_law_index);
    let fl = pl.flux_vector(direction, gamma_law_index);
    let fr = pr.flux_vector(direction, gamma_law_index);

    let (alm, alp) = pl.outer_wavespeeds(direction, gamma_law_index)?;
    let (arm, arp) = pr.outer_wavespeeds(direction, gamma_law_index)?;
    let ap = alp.max(arp).max(0.0);
    let am = alm.min(arm).min(0.0);

    if ap == am {
        return Ok((fl + fr) * 0.5)
    }
    Ok((fl * ap - fr * am - (ul - ur) * ap * am) / (ap - am))
}

pub fn riemann_llf(pl: &Primitive, pr: &Primitive, direction: Direction, gamma_law_index: f64) -> Result<Conserved, Error> {
    let ul = pl.to_conserved(gamma_law_index);
    let ur = pr.to_conserved(gamma_law_index);
    let fl = pl.flux_vector(direction, gamma_law_index);
    let fr = pr.flux_vector(direction, gamma_law_index);

    let a = pl.max_signal_speed(direction, gamma_law_index)?
        .max(pr.max_signal_speed(direction, gamma_law_index)?);

    Ok((fl + fr) * 0.5 - (ur - ul) * (0.5 * a))
}
