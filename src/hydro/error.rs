/**
 * Error to represent invalid hydrodynamics data or primitive variable recovery.
 */
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("negative gas pressure: {0:.4e}")]
    NegativeGasPressure(f64),

    #[error("negative mass density: {0:.4e}")]
    NegativeMassDensity(f64),

    #[error("non-finite conserved state: {0:?}")]
    NonFiniteState([f64; 9]),

    #[error("wave speed requested for vanishing density: {0:.4e}")]
    VanishingDensity(f64),
}




// ============================================================================
impl Error {
    pub fn at_position(self, grid: usize, index: (i64, i64, i64)) -> crate::Error {
        crate::Error::Hydro { grid, index, source: self }
    }
}
