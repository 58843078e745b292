//! Ionfront is a finite-volume solver for compressible, optionally
//! magnetized, gas dynamics coupled to a non-equilibrium ionization and
//! thermal chemistry network for atomic hydrogen. It is meant for
//! astrophysical flows such as ionization fronts and expanding HII regions.
//!
//! The mesh is a rectilinear Cartesian mesh in one to three dimensions,
//! split into equal blocks (grids). Each Runge-Kutta stage runs the grids
//! as message-passing automata: a grid sends its edge cells to its
//! neighbors, and is advanced once its own guard zones have arrived. The
//! magnetic field is evolved by constrained transport on cell faces. The
//! chemistry is operator split from the hydrodynamics and sub-cycled on
//! its own, much shorter, time step, with photoionizing radiation entering
//! through the faces of the mesh.

pub mod automaton;
pub mod boundary;
pub mod chemistry;
pub mod config;
pub mod domain;
pub mod error;
pub mod grid;
pub mod history;
pub mod hydro;
pub mod index_space;
pub mod mesh;
pub mod meshing;
pub mod output;
pub mod patch;
pub mod restart;
pub mod simulation;
pub mod solvers;
pub mod timestep;

pub use error::Error;
