use crate::boundary::Face;




/// The error type for every fallible operation of the solver. Numerical
/// failures carry the grid and cell where they happened; setup errors are
/// raised before the first cycle.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("grid {grid} cell {index:?}: {source}")]
    Hydro {
        grid: usize,
        index: (i64, i64, i64),
        source: crate::hydro::Error,
    },

    #[error("invalid time step: {0:.4e}")]
    InvalidTimestep(f64),

    #[error("grid {grid} cell {index:?}: chemistry rates give a negative time step")]
    ChemistryRate {
        grid: usize,
        index: (i64, i64, i64),
    },

    #[error("configuration: {0}")]
    Config(String),

    #[error("no boundary condition enrolled for face {0}")]
    MissingBoundaryCondition(Face),

    #[error("history label '{0}' is already enrolled")]
    DuplicateHistoryLabel(String),

    #[error("domain decomposition: {0}")]
    Decomposition(String),

    #[error("restart: {0}")]
    Restart(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}




// ============================================================================
impl Error {

    /// Whether the error is a numerical failure which a retry with a
    /// smaller time step may cure.
    pub fn is_numerical(&self) -> bool {
        matches!(self, Error::Hydro { .. } | Error::ChemistryRate { .. })
    }
}
