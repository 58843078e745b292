use serde::{Deserialize, Serialize};
use crate::error::Error;
use crate::patch::Patch;




/// The interior data of one grid at the end of a cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    pub id: usize,
    pub conserved: Patch,
    pub face_fields: Option<[Patch; 3]>,
    pub divergence_b: Patch,
}




/// Everything an output writer is given: the interior conserved state,
/// face-centered fields and the divergence of each grid, and the clock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub time: f64,
    pub cycle: u64,
    pub grids: Vec<GridSnapshot>,
}




/// A collaborator which writes snapshots to some external format. It is
/// only ever invoked between cycles.
pub trait Output {
    fn write(&mut self, snapshot: &Snapshot) -> Result<(), Error>;
}




/// Keeps every snapshot in memory.
#[derive(Default)]
pub struct MemoryOutput {
    pub snapshots: Vec<Snapshot>,
}

impl Output for MemoryOutput {
    fn write(&mut self, snapshot: &Snapshot) -> Result<(), Error> {
        self.snapshots.push(snapshot.clone());
        Ok(())
    }
}
