//! Variable algebra, wave speeds and interface fluxes of ideal MHD with an
//! advected neutral hydrogen density.

pub mod error;
pub mod geometry;
pub mod mhd;
pub mod reconstruct;
pub mod riemann;

pub use error::Error;
pub use geometry::{Direction, Vector3d};
pub use mhd::{Conserved, Primitive, NUM_FIELDS};
pub use reconstruct::Reconstruction;
pub use riemann::RiemannSolver;
