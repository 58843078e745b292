//! Run configuration, read from a TOML file. Every section has defaults, so
//! an empty file describes a valid (if dull) run.

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::boundary::{self, BoundaryRegistry, Face, Side};
use crate::chemistry::ChemistryConfig;
use crate::domain::Domain;
use crate::error::Error;
use crate::hydro::{Primitive, NUM_FIELDS};
use crate::index_space::Axis;
use crate::mesh::Mesh;
use crate::solvers::Scheme;
use crate::timestep::TimestepConfig;




#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub mesh: MeshConfig,
    pub hydro: Scheme,
    pub timestep: TimestepConfig,
    pub chemistry: Option<ChemistryConfig>,
    pub run: RunConfig,
    pub initial: InitialCondition,
    pub boundary: BoundaryConfig,
}




/// Extent, resolution and decomposition of a uniform mesh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeshConfig {
    pub lower: [f64; 3],
    pub upper: [f64; 3],
    pub cells: [usize; 3],
    pub periodic: [bool; 3],

    /// Number of grids along each axis; must divide the cell count.
    pub blocks: [usize; 3],
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            lower: [0.0; 3],
            upper: [1.0; 3],
            cells: [128, 1, 1],
            periodic: [false; 3],
            blocks: [1, 1, 1],
        }
    }
}




/// Limits of the run and how failures and checkpoints are handled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    pub end_time: f64,
    pub max_cycles: Option<u64>,

    /// Number of times a failed cycle is retried with half the time step.
    pub max_retries: usize,

    /// Write a checkpoint every this many cycles, and at the end of the run.
    pub checkpoint_interval: Option<u64>,
    pub checkpoint_file: String,

    /// Size of the worker pool; all cores when not given.
    pub num_threads: Option<usize>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            end_time: 0.1,
            max_cycles: None,
            max_retries: 4,
            checkpoint_interval: None,
            checkpoint_file: "chkpt.cbor".into(),
            num_threads: None,
        }
    }
}




/**
 * Generic initial states. Primitive states are given as the nine values
 * `[rho, v1, v2, v3, p, B1, B2, B3, neutral fraction]`.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitialCondition {
    Uniform {
        state: [f64; NUM_FIELDS],
    },
    Discontinuity {
        axis: Axis,
        position: f64,
        left: [f64; NUM_FIELDS],
        right: [f64; NUM_FIELDS],
    },
}

impl Default for InitialCondition {
    fn default() -> Self {
        InitialCondition::Uniform {
            state: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }
}




// ============================================================================
impl InitialCondition {

    pub fn primitive_at(&self, position: (f64, f64, f64)) -> Primitive {
        match self {
            InitialCondition::Uniform { state } => Primitive(*state),
            InitialCondition::Discontinuity { axis, position: x0, left, right } => {
                let x = match axis {
                    Axis::I => position.0,
                    Axis::J => position.1,
                    Axis::K => position.2,
                };
                if x < *x0 {
                    Primitive(*left)
                } else {
                    Primitive(*right)
                }
            }
        }
    }

    /// Whether every state is at rest with zero pressure and field, so the
    /// CFL condition gives no bound on the first step.
    pub fn has_no_signal_speed(&self) -> bool {
        let at_rest = |state: &[f64; NUM_FIELDS]| state[1..8].iter().all(|&x| x == 0.0);

        match self {
            InitialCondition::Uniform { state } => at_rest(state),
            InitialCondition::Discontinuity { left, right, .. } => at_rest(left) && at_rest(right),
        }
    }
}




/// Built-in conditions that can be named in a configuration file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryKind {
    Outflow,
    Reflecting,
}




#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoundaryConfig {
    pub i_lower: BoundaryKind,
    pub i_upper: BoundaryKind,
    pub j_lower: BoundaryKind,
    pub j_upper: BoundaryKind,
    pub k_lower: BoundaryKind,
    pub k_upper: BoundaryKind,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            i_lower: BoundaryKind::Outflow,
            i_upper: BoundaryKind::Outflow,
            j_lower: BoundaryKind::Outflow,
            j_upper: BoundaryKind::Outflow,
            k_lower: BoundaryKind::Outflow,
            k_upper: BoundaryKind::Outflow,
        }
    }
}




// ============================================================================
impl BoundaryConfig {

    pub fn kind(&self, face: Face) -> BoundaryKind {
        match (face.axis, face.side) {
            (Axis::I, Side::Lower) => self.i_lower,
            (Axis::I, Side::Upper) => self.i_upper,
            (Axis::J, Side::Lower) => self.j_lower,
            (Axis::J, Side::Upper) => self.j_upper,
            (Axis::K, Side::Lower) => self.k_lower,
            (Axis::K, Side::Upper) => self.k_upper,
        }
    }

    pub fn registry(&self) -> BoundaryRegistry {
        let mut registry = BoundaryRegistry::new();

        for face in Face::all() {
            let condition = match self.kind(face) {
                BoundaryKind::Outflow => boundary::outflow(face),
                BoundaryKind::Reflecting => boundary::reflecting(face),
            };
            registry.enroll(face, condition);
        }
        registry
    }
}




// ============================================================================
impl Config {

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.mesh.blocks.iter().any(|&b| b == 0) {
            return Err(Error::Config("mesh.blocks must be at least 1 on every axis".into()))
        }
        if !(self.hydro.gamma_law_index > 1.0) {
            return Err(Error::Config("hydro.gamma_law_index must be greater than 1".into()))
        }
        if !(self.run.end_time > 0.0) {
            return Err(Error::Config("run.end_time must be positive".into()))
        }
        if self.run.checkpoint_interval == Some(0) {
            return Err(Error::Config("run.checkpoint_interval must be at least 1".into()))
        }
        if self.run.num_threads == Some(0) {
            return Err(Error::Config("run.num_threads must be at least 1".into()))
        }
        self.timestep.validate()?;

        if self.timestep.dt_max.is_none() && self.initial.has_no_signal_speed() {
            return Err(Error::Config("initial state has no signal speed; set timestep.dt_max".into()))
        }
        if let Some(chemistry) = &self.chemistry {
            chemistry.validate()?;
        }
        Ok(())
    }

    pub fn mesh(&self) -> Result<Mesh, Error> {
        let m = &self.mesh;
        Ok(Mesh::uniform(m.lower, m.upper, m.cells)?.with_periodic(m.periodic))
    }

    /// Build the domain and set its initial state.
    pub fn domain(&self) -> Result<Domain, Error> {
        let mut domain = Domain::new(self.mesh()?, self.mesh.blocks, self.hydro, self.boundary.registry())?;
        let initial = &self.initial;
        domain.initialize(|x| initial.primitive_at(x))?;
        Ok(domain)
    }
}
