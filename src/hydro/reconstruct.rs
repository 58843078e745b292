use serde::{Deserialize, Serialize};
use super::mhd::{Primitive, NUM_FIELDS};




/**
 * Spatial reconstruction of the primitive variables at cell faces
 */
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Reconstruction {
    /// Piecewise constant: face states are the cell averages.
    Pcm,

    /// Piecewise linear with the generalized minmod limiter; `theta`
    /// ranges from 1 (most diffusive) to 2 (least diffusive).
    Plm { theta: f64 },
}




// ============================================================================
impl Default for Reconstruction {
    fn default() -> Self {
        Reconstruction::Plm { theta: 1.5 }
    }
}

impl Reconstruction {

    /**
     * Return the limited slope of cell `b`, given its neighbors `a` and
     * `c` along one axis. The slope is per cell width.
     */
    pub fn slope(&self, a: &Primitive, b: &Primitive, c: &Primitive) -> Primitive {
        match self {
            Reconstruction::Pcm => Primitive([0.0; NUM_FIELDS]),
            Reconstruction::Plm { theta } => {
                let mut g = [0.0; NUM_FIELDS];

                for q in 0..NUM_FIELDS {
                    g[q] = plm_gradient(*theta, a.0[q], b.0[q], c.0[q])
                }
                Primitive(g)
            }
        }
    }

    /**
     * Face states on the two sides of the face between cells `b` and `c`,
     * from the four cells a | b || c | d surrounding it.
     */
    pub fn face_states(&self, a: &Primitive, b: &Primitive, c: &Primitive, d: &Primitive) -> (Primitive, Primitive) {
        match self {
            Reconstruction::Pcm => (*b, *c),
            Reconstruction::Plm { .. } => {
                let pl = *b + self.slope(a, b, c) * 0.5;
                let pr = *c - self.slope(b, c, d) * 0.5;
                (pl, pr)
            }
        }
    }
}




// ============================================================================
fn minmod(a: f64, b: f64) -> f64 {
    if a * b <= 0.0 {
        0.0
    } else if a.abs() < b.abs() {
        a
    } else {
        b
    }
}

/**
 * Generalized minmod limited difference of the middle value
 */
pub fn plm_gradient(theta: f64, a: f64, b: f64, c: f64) -> f64 {
    minmod(theta * (b - a), minmod(0.5 * (c - a), theta * (c - b)))
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::plm_gradient;

    #[test]
    fn gradient_vanishes_at_extrema() {
        assert_eq!(plm_gradient(1.5, 1.0, 2.0, 1.0), 0.0);
        assert_eq!(plm_gradient(1.5, 1.0, 1.0, 3.0), 0.0);
    }

    #[test]
    fn gradient_is_centered_on_smooth_data() {
        assert_eq!(plm_gradient(1.5, 1.0, 2.0, 3.0), 1.0);
        assert_eq!(plm_gradient(1.0, 1.0, 2.0, 4.0), 1.0);
    }
}
