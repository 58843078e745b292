use rayon::prelude::*;
use crate::domain::Domain;
use crate::error::Error;
use crate::hydro::Conserved;




/// A quantity whose volume integral over the domain is recorded in the
/// history: a function of the conserved state of one cell.
pub type HistoryFunction = Box<dyn Fn(&Conserved) -> f64 + Send + Sync>;




/// Ordered list of labeled history quantities. Labels are unique, and
/// quantities are reported in the order they were enrolled.
#[derive(Default)]
pub struct HistoryRegistry {
    entries: Vec<(String, HistoryFunction)>,
}




// ============================================================================
impl HistoryRegistry {

    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the total mass, momenta, energies and neutral mass.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.push("mass", Box::new(|u: &Conserved| u.mass_density()));
        registry.push("momentum_1", Box::new(|u: &Conserved| u.momentum_1()));
        registry.push("momentum_2", Box::new(|u: &Conserved| u.momentum_2()));
        registry.push("momentum_3", Box::new(|u: &Conserved| u.momentum_3()));
        registry.push("total_energy", Box::new(|u: &Conserved| u.energy_density()));
        registry.push("kinetic_energy", Box::new(|u: &Conserved| u.kinetic_energy_density()));
        registry.push("magnetic_energy", Box::new(|u: &Conserved| u.magnetic_energy_density()));
        registry.push("neutral_mass", Box::new(|u: &Conserved| u.neutral_density()));
        registry
    }

    fn push(&mut self, label: &str, f: HistoryFunction) {
        self.entries.push((label.to_string(), f))
    }

    /// Add a quantity at the end of the list. Fails if the label is taken.
    pub fn enroll(&mut self, label: &str, f: HistoryFunction) -> Result<(), Error> {
        if self.entries.iter().any(|(l, _)| l == label) {
            return Err(Error::DuplicateHistoryLabel(label.to_string()))
        }
        self.push(label, f);
        Ok(())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Integrate every quantity over the interior cells of the domain.
    pub fn evaluate(&self, domain: &Domain) -> Vec<(String, f64)> {
        let zeros = || vec![0.0; self.entries.len()];

        let sums = domain
            .grids()
            .par_iter()
            .map(|grid| {
                let mut sums = zeros();
                for index in grid.interior().iter() {
                    let u = grid.conserved_at(index);
                    let dv = grid.mesh().cell_volume(index);
                    for (s, (_, f)) in sums.iter_mut().zip(&self.entries) {
                        *s += f(&u) * dv
                    }
                }
                sums
            })
            .reduce(zeros, |a, b| a.iter().zip(&b).map(|(x, y)| x + y).collect());

        self.entries
            .iter()
            .map(|(l, _)| l.clone())
            .zip(sums)
            .collect()
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::boundary::BoundaryRegistry;
    use crate::domain::Domain;
    use crate::error::Error;
    use crate::hydro::{Conserved, Primitive};
    use crate::mesh::Mesh;
    use crate::solvers::Scheme;
    use super::HistoryRegistry;

    #[test]
    fn duplicate_labels_are_rejected() {
        let mut registry = HistoryRegistry::with_defaults();
        assert!(matches!(registry.enroll("mass", Box::new(|_: &Conserved| 0.0)), Err(Error::DuplicateHistoryLabel(_))));
        assert!(registry.enroll("pressure_proxy", Box::new(|u: &Conserved| u.internal_energy_density())).is_ok());
        assert_eq!(registry.labels().last(), Some("pressure_proxy"));
    }

    #[test]
    fn mass_of_a_uniform_domain_is_density_times_volume() {
        let mesh = Mesh::uniform([0.0; 3], [2.0, 1.0, 1.0], [8, 4, 1]).unwrap();
        let mut domain = Domain::new(mesh, [2, 2, 1], Scheme::default(), BoundaryRegistry::outflow()).unwrap();
        domain.initialize(|_| Primitive([3.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.5])).unwrap();
        let history = domain.history();
        assert_eq!(history[0].0, "mass");
        assert!((history[0].1 - 6.0).abs() < 1e-12);
        assert!((history[7].1 - 3.0).abs() < 1e-12);
    }
}
