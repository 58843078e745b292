use serde::{Deserialize, Serialize};
use crate::hydro::{Conserved, Primitive, NUM_FIELDS};




/**
 * Explicit diffusion: kinematic viscosity acting on the velocity, and
 * thermal diffusivity acting on the specific internal energy. Both
 * coefficients are zero by default.
 */
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Diffusion {
    pub viscosity: f64,
    pub thermal_diffusivity: f64,
}




// ============================================================================
impl Diffusion {

    pub fn is_active(&self) -> bool {
        self.viscosity > 0.0 || self.thermal_diffusivity > 0.0
    }

    /// The largest diffusion coefficient, which bounds the explicit step.
    pub fn max_coefficient(&self) -> f64 {
        self.viscosity.max(self.thermal_diffusivity)
    }

    /**
     * Diffusive flux through the face between two cells whose centers are
     * `dx` apart. The flux is added to the hyperbolic flux of that face.
     */
    pub fn flux(&self, pl: &Primitive, pr: &Primitive, dx: f64, gamma_law_index: f64) -> Conserved {
        let mut f = [0.0; NUM_FIELDS];

        if !self.is_active() {
            return Conserved(f)
        }

        let df = 0.5 * (pl.mass_density() + pr.mass_density());
        let vl = pl.velocity_vector();
        let vr = pr.velocity_vector();
        let vf = (vl + vr) * 0.5;
        let fm = (vr - vl) * (-df * self.viscosity / dx);

        let el = pl.specific_internal_energy(gamma_law_index);
        let er = pr.specific_internal_energy(gamma_law_index);
        let heat = -df * self.thermal_diffusivity * (er - el) / dx;

        f[1] = fm.0;
        f[2] = fm.1;
        f[3] = fm.2;
        f[4] = vf.dot(&fm) + heat;
        Conserved(f)
    }
}
