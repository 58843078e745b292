use serde::{Deserialize, Serialize};
use crate::error::Error;
use crate::index_space::{Axis, IndexSpace};




/// A rectilinear, possibly non-uniform structured mesh. Each axis holds the
/// coordinates of its cell faces; an axis with a single cell is inactive
/// (no guard zones, no fluxes).
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    faces: [Vec<f64>; 3],
    periodic: [bool; 3],
}




// ============================================================================
impl Mesh {

    /// Create a mesh with uniform spacing on each axis.
    pub fn uniform(lower: [f64; 3], upper: [f64; 3], cells: [usize; 3]) -> Result<Self, Error> {
        let axis_faces = |n: usize| -> Result<Vec<f64>, Error> {
            if cells[n] == 0 {
                return Err(Error::Config(format!("axis {} has zero cells", n + 1)))
            }
            if !(upper[n] > lower[n]) {
                return Err(Error::Config(format!("axis {} has upper bound <= lower bound", n + 1)))
            }
            let dx = (upper[n] - lower[n]) / cells[n] as f64;
            Ok((0..=cells[n]).map(|i| lower[n] + dx * i as f64).collect())
        };
        Ok(Self {
            faces: [axis_faces(0)?, axis_faces(1)?, axis_faces(2)?],
            periodic: [false; 3],
        })
    }

    /// Create a mesh from explicit face coordinates, which must be strictly
    /// increasing with at least two entries per axis.
    pub fn from_faces(faces: [Vec<f64>; 3]) -> Result<Self, Error> {
        for (n, f) in faces.iter().enumerate() {
            if f.len() < 2 {
                return Err(Error::Config(format!("axis {} needs at least two faces", n + 1)))
            }
            if f.windows(2).any(|w| !(w[1] > w[0])) {
                return Err(Error::Config(format!("axis {} faces are not strictly increasing", n + 1)))
            }
        }
        Ok(Self { faces, periodic: [false; 3] })
    }

    /// Builder-style setter for periodicity along each axis.
    pub fn with_periodic(mut self, periodic: [bool; 3]) -> Self {
        self.periodic = periodic;
        self
    }

    pub fn is_periodic(&self, axis: Axis) -> bool {
        self.periodic[axis.index()]
    }

    /// Number of cells along each axis.
    pub fn shape(&self) -> (i64, i64, i64) {
        (self.num_cells(Axis::I), self.num_cells(Axis::J), self.num_cells(Axis::K))
    }

    pub fn num_cells(&self, axis: Axis) -> i64 {
        self.faces[axis.index()].len() as i64 - 1
    }

    pub fn total_zones(&self) -> i64 {
        let (l, m, n) = self.shape();
        l * m * n
    }

    /// The index space covering every interior cell of the mesh.
    pub fn index_space(&self) -> IndexSpace {
        let (l, m, n) = self.shape();
        IndexSpace::new(0..l, 0..m, 0..n)
    }

    pub fn is_active(&self, axis: Axis) -> bool {
        self.num_cells(axis) > 1
    }

    pub fn active(&self) -> [bool; 3] {
        [self.is_active(Axis::I), self.is_active(Axis::J), self.is_active(Axis::K)]
    }

    pub fn active_axes(&self) -> Vec<Axis> {
        Axis::ALL.iter().cloned().filter(|&a| self.is_active(a)).collect()
    }

    pub fn num_active_dims(&self) -> usize {
        self.active_axes().len()
    }

    /// Coordinate of the lower face of the cell with the given index along
    /// one axis. Guard indices beyond the mesh continue with the width of
    /// the edge cell.
    pub fn face(&self, axis: Axis, index: i64) -> f64 {
        let f = &self.faces[axis.index()];
        let n = f.len() as i64 - 1;

        if index < 0 {
            f[0] + index as f64 * (f[1] - f[0])
        } else if index > n {
            f[n as usize] + (index - n) as f64 * (f[n as usize] - f[n as usize - 1])
        } else {
            f[index as usize]
        }
    }

    /// Width of the cell with the given index along one axis. Guard indices
    /// reuse the width of the nearest edge cell.
    pub fn cell_width(&self, axis: Axis, index: i64) -> f64 {
        let n = self.num_cells(axis);
        let i = index.max(0).min(n - 1) as usize;
        let f = &self.faces[axis.index()];
        f[i + 1] - f[i]
    }

    pub fn cell_center(&self, index: (i64, i64, i64)) -> (f64, f64, f64) {
        let c = |axis: Axis, i: i64| self.face(axis, i) + 0.5 * self.cell_width(axis, i);
        (c(Axis::I, index.0), c(Axis::J, index.1), c(Axis::K, index.2))
    }

    pub fn cell_volume(&self, index: (i64, i64, i64)) -> f64 {
        self.cell_width(Axis::I, index.0) *
        self.cell_width(Axis::J, index.1) *
        self.cell_width(Axis::K, index.2)
    }

    /// Smallest cell width over all active axes.
    pub fn min_cell_width(&self) -> f64 {
        self.active_axes()
            .into_iter()
            .flat_map(|a| (0..self.num_cells(a)).map(move |i| (a, i)))
            .map(|(a, i)| self.cell_width(a, i))
            .fold(f64::INFINITY, f64::min)
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::index_space::Axis;
    use super::Mesh;

    #[test]
    fn uniform_mesh_cell_centers_are_correct() {
        let mesh = Mesh::uniform([0.0, 0.0, 0.0], [1.0, 2.0, 1.0], [10, 4, 1]).unwrap();
        let (x, y, z) = mesh.cell_center((0, 1, 0));
        assert!((x - 0.05).abs() < 1e-15);
        assert!((y - 0.75).abs() < 1e-15);
        assert!((z - 0.5).abs() < 1e-15);
        assert_eq!(mesh.active(), [true, true, false]);
        assert_eq!(mesh.num_active_dims(), 2);
    }

    #[test]
    fn guard_cells_reuse_the_edge_width() {
        let mesh = Mesh::from_faces([vec![0.0, 1.0, 3.0], vec![0.0, 1.0], vec![0.0, 1.0]]).unwrap();
        assert_eq!(mesh.cell_width(Axis::I, -2), 1.0);
        assert_eq!(mesh.cell_width(Axis::I, 3), 2.0);
        assert_eq!(mesh.cell_center((-1, 0, 0)).0, -0.5);
        assert_eq!(mesh.cell_center((2, 0, 0)).0, 4.0);
    }

    #[test]
    fn non_increasing_faces_are_rejected() {
        assert!(Mesh::from_faces([vec![0.0, 1.0, 1.0], vec![0.0, 1.0], vec![0.0, 1.0]]).is_err());
        assert!(Mesh::uniform([0.0; 3], [1.0; 3], [0, 1, 1]).is_err());
    }
}
