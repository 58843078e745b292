use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use log::info;
use serde::{Deserialize, Serialize};
use crate::domain::Domain;
use crate::error::Error;
use crate::patch::Patch;




/// The stored state of one grid, guard zones included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridCheckpoint {
    pub id: usize,
    pub conserved: Patch,
    pub face_fields: Option<[Patch; 3]>,
}




/**
 * Everything needed to resume a run exactly where it stopped: the
 * conserved and face-centered arrays of every grid, the clock, the last
 * accepted time step, the chemistry coarse time and the bound an
 * interrupted chemistry sub-cycle put on the next step. Checkpoints are
 * CBOR encoded.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub time: f64,
    pub cycle: u64,
    pub dt: Option<f64>,
    pub coarse_time: f64,
    #[serde(default)]
    pub chemistry_bound: Option<f64>,
    pub grids: Vec<GridCheckpoint>,
}




// ============================================================================
impl Checkpoint {

    pub fn capture(domain: &Domain, coarse_time: f64, chemistry_bound: Option<f64>) -> Self {
        let grids = domain
            .grids()
            .iter()
            .map(|grid| GridCheckpoint {
                id: grid.id(),
                conserved: grid.conserved().clone(),
                face_fields: grid.face_fields().cloned(),
            })
            .collect();

        Self {
            time: domain.time(),
            cycle: domain.cycle(),
            dt: domain.dt(),
            coarse_time,
            chemistry_bound,
            grids,
        }
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        let file = File::create(path.as_ref())?;
        let mut buffer = BufWriter::new(file);
        ciborium::ser::into_writer(self, &mut buffer).map_err(|e| Error::Restart(e.to_string()))?;
        info!("write checkpoint {} at t={:.6}", path.as_ref().display(), self.time);
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = File::open(path.as_ref())?;
        let checkpoint: Self = ciborium::de::from_reader(BufReader::new(file)).map_err(|e| Error::Restart(e.to_string()))?;
        info!("read checkpoint {} at t={:.6}", path.as_ref().display(), checkpoint.time);
        Ok(checkpoint)
    }

    /**
     * Load the checkpoint into a domain built from the same configuration,
     * and return the chemistry coarse time. The grids of the checkpoint
     * must match the domain's decomposition and magnetization.
     */
    pub fn restore(&self, domain: &mut Domain) -> Result<f64, Error> {
        if self.grids.len() != domain.grids().len() {
            return Err(Error::Restart(format!(
                "checkpoint has {} grids, domain has {}",
                self.grids.len(),
                domain.grids().len())))
        }
        for (stored, grid) in self.grids.iter().zip(domain.grids()) {
            if stored.id != grid.id() || stored.conserved.index_space() != grid.extended() {
                return Err(Error::Restart(format!("grid {} does not match the domain", stored.id)))
            }
            if stored.face_fields.is_some() != grid.is_magnetic() {
                return Err(Error::Restart(format!("grid {} magnetization does not match", stored.id)))
            }
        }
        for (stored, grid) in self.grids.iter().zip(domain.grids_mut()) {
            grid.conserved = stored.conserved.clone();
            grid.face_field = stored.face_fields.clone();
        }
        domain.restore_clock(self.time, self.cycle, self.dt);
        Ok(self.coarse_time)
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::boundary::BoundaryRegistry;
    use crate::domain::Domain;
    use crate::hydro::Primitive;
    use crate::mesh::Mesh;
    use crate::solvers::Scheme;
    use super::Checkpoint;

    fn domain(blocks: [usize; 3]) -> Domain {
        let scheme = Scheme { magnetic: true, ..Scheme::default() };
        let mesh = Mesh::uniform([0.0; 3], [1.0; 3], [16, 8, 1]).unwrap();
        Domain::new(mesh, blocks, scheme, BoundaryRegistry::outflow()).unwrap()
    }

    #[test]
    fn checkpoint_round_trips_exactly() {
        let mut a = domain([2, 2, 1]);
        a.initialize(|(x, y, _)| Primitive([1.0 + x * y, 0.1, -0.2, 0.0, 1.0 / 3.0, y.sin(), 0.7, 0.1, 0.3 + 0.1 * x])).unwrap();
        a.advance_hydro(1e-3).unwrap();
        a.complete_cycle(1e-3);

        let path = std::env::temp_dir().join(format!("ionfront-restart-{}.cbor", std::process::id()));
        Checkpoint::capture(&a, 0.125, Some(2e-4)).write(&path).unwrap();
        let checkpoint = Checkpoint::read(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(checkpoint.chemistry_bound, Some(2e-4));

        let mut b = domain([2, 2, 1]);
        assert_eq!(checkpoint.restore(&mut b).unwrap(), 0.125);
        assert_eq!(b.time(), a.time());
        assert_eq!(b.cycle(), 1);
        assert_eq!(b.dt(), Some(1e-3));

        for (ga, gb) in a.grids().iter().zip(b.grids()) {
            assert_eq!(ga.conserved(), gb.conserved());
            assert_eq!(ga.face_fields(), gb.face_fields());
        }
    }

    #[test]
    fn checkpoint_of_another_decomposition_is_rejected() {
        let a = domain([2, 1, 1]);
        let mut b = domain([1, 2, 1]);
        assert!(Checkpoint::capture(&a, 0.0, None).restore(&mut b).is_err());
    }
}
