use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::boundary::{Face, Side};
use crate::grid::Grid;
use crate::index_space::{component, with_component};
use super::ChemistryConfig;




/// Once the flux along a ray falls below this fraction of the source flux,
/// the rest of the ray is dark.
pub const MIN_FLUX_FRACTION: f64 = 1e-6;




/**
 * A plane-parallel source of ionizing photons, entering the mesh through
 * one of its faces and propagating along the face normal.
 */
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RadiationPlane {
    /// The face the radiation enters through.
    pub face: Face,

    /// Ionizing photon number flux at the face [cm^-2 per unit code time].
    pub flux: f64,

    /// If given, the flux is ramped up logarithmically from zero over this
    /// time: `flux ln(1 + t) / ln(1 + ramp_time)`.
    #[serde(default)]
    pub ramp_time: Option<f64>,
}




// ============================================================================
impl RadiationPlane {

    pub fn new(face: Face, flux: f64) -> Self {
        Self { face, flux, ramp_time: None }
    }

    /// The photon flux entering the mesh at the given time.
    pub fn source_flux(&self, time: f64) -> f64 {
        match self.ramp_time {
            Some(ramp) if time < ramp => self.flux * time.max(0.0).ln_1p() / ramp.ln_1p(),
            _ => self.flux,
        }
    }

    /**
     * Attenuate the plane's flux cell by cell through the grids, and add
     * the photoionization rate `F (1 - exp(-tau)) / (n_H dx)` to each cell,
     * where `tau = sigma n_H dx`. The grids are visited in order along the
     * propagation axis, so the flux leaving one grid enters the next.
     */
    pub fn sweep(&self, grids: &mut [Grid], config: &ChemistryConfig, time: f64) {
        let source = self.source_flux(time);

        if !(source > 0.0) {
            return
        }
        let axis = self.face.axis;
        let mut order: Vec<usize> = (0..grids.len()).collect();

        order.sort_by_key(|&n| {
            let r = grids[n].interior().range(axis);
            match self.face.side {
                Side::Lower => r.start,
                Side::Upper => -r.end,
            }
        });

        let mut ray_flux: HashMap<(i64, i64, i64), f64> = HashMap::new();

        for n in order {
            let grid = &mut grids[n];
            let mesh = grid.mesh().clone();
            let r = grid.interior().range(axis);
            let cells: Vec<i64> = match self.face.side {
                Side::Lower => r.clone().collect(),
                Side::Upper => r.clone().rev().collect(),
            };
            let rays = grid.interior().with_range(axis, r.start .. r.start + 1);

            for ray in rays.iter() {
                let key = with_component(ray, axis, 0);
                let mut flux = ray_flux.get(&key).cloned().unwrap_or(source);

                for &i in &cells {
                    if flux == 0.0 {
                        break
                    }
                    let index = with_component(ray, axis, i);
                    let n_h = grid.conserved_at(index).neutral_density() / config.hydrogen_mass;
                    let dx = mesh.cell_width(axis, component(index, axis));
                    let etau = (-config.photoionization_cross_section * n_h * dx).exp();

                    if n_h > 0.0 {
                        grid.chemistry.add_photoionization(index, flux * (1.0 - etau) / (n_h * dx));
                    }
                    flux *= etau;

                    if flux / source < MIN_FLUX_FRACTION {
                        flux = 0.0
                    }
                }
                ray_flux.insert(key, flux);
            }
        }
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use std::sync::Arc;
    use crate::boundary::{Face, Side};
    use crate::chemistry::ChemistryConfig;
    use crate::grid::Grid;
    use crate::hydro::Primitive;
    use crate::index_space::{range3d, Axis};
    use crate::mesh::Mesh;
    use super::RadiationPlane;

    fn grids(blocks: usize) -> Vec<Grid> {
        let mesh = Arc::new(Mesh::uniform([0.0; 3], [8.0, 2.0, 1.0], [8, 2, 1]).unwrap());
        let size = 8 / blocks as i64;
        (0..blocks as i64)
            .map(|n| {
                let mut grid = Grid::new(n as usize, range3d(n * size .. (n + 1) * size, 0..2, 0..1), mesh.clone(), false);
                grid.initialize(5.0 / 3.0, |_| Primitive([1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.5]));
                grid
            })
            .collect()
    }

    fn config() -> ChemistryConfig {
        ChemistryConfig {
            photoionization_cross_section: 1.0,
            hydrogen_mass: 1.0,
            ..ChemistryConfig::default()
        }
    }

    #[test]
    fn rate_decays_along_the_ray_and_across_grids() {
        let plane = RadiationPlane::new(Face::new(Axis::I, Side::Lower), 1.0);
        let mut single = grids(1);
        let mut split = grids(4);
        plane.sweep(&mut single, &config(), 0.0);
        plane.sweep(&mut split, &config(), 0.0);

        let k0 = single[0].chemistry_state().photoionization_rate((0, 1, 0));
        let k1 = single[0].chemistry_state().photoionization_rate((1, 1, 0));
        assert!((k0 - 2.0 * (1.0 - (-0.5f64).exp())).abs() < 1e-12);
        assert!((k1 / k0 - (-0.5f64).exp()).abs() < 1e-12);

        for (n, grid) in split.iter().enumerate() {
            for index in grid.interior().iter() {
                let k = grid.chemistry_state().photoionization_rate(index);
                assert!((k - single[0].chemistry_state().photoionization_rate(index)).abs() < 1e-14, "grid {}", n);
            }
        }
    }

    #[test]
    fn source_on_the_upper_face_lights_the_last_cell_first() {
        let plane = RadiationPlane::new(Face::new(Axis::I, Side::Upper), 1.0);
        let mut g = grids(2);
        plane.sweep(&mut g, &config(), 0.0);
        let last = g[1].chemistry_state().photoionization_rate((7, 0, 0));
        let first = g[0].chemistry_state().photoionization_rate((0, 0, 0));
        assert!(last > first);
    }

    #[test]
    fn optically_thick_ray_goes_dark() {
        let plane = RadiationPlane::new(Face::new(Axis::I, Side::Lower), 1.0);
        let mut g = grids(1);
        let config = ChemistryConfig { photoionization_cross_section: 20.0, ..config() };
        plane.sweep(&mut g, &config, 0.0);
        assert!(g[0].chemistry_state().photoionization_rate((0, 0, 0)) > 0.0);
        assert_eq!(g[0].chemistry_state().photoionization_rate((7, 0, 0)), 0.0);
    }

    #[test]
    fn ramped_source_starts_dark() {
        let plane = RadiationPlane { ramp_time: Some(100.0), ..RadiationPlane::new(Face::new(Axis::I, Side::Lower), 2.0) };
        assert_eq!(plane.source_flux(0.0), 0.0);
        assert!((plane.source_flux(100.0) - 2.0).abs() < 1e-12);
        assert!(plane.source_flux(10.0) < 2.0);
    }
}
