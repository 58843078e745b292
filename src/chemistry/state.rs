use crate::index_space::IndexSpace;
use crate::patch::Patch;




const PHOTOIONIZATION: usize = 0;
const ENERGY_RATE: usize = 1;
const NEUTRAL_RATE: usize = 2;
const ENERGY_INIT: usize = 3;
const THERMAL_ENERGY_INIT: usize = 4;
const ELECTRON_FRACTION_INIT: usize = 5;
const NUM_RATE_FIELDS: usize = 6;

const LAST_SIGN: usize = 0;
const SIGN_COUNT: usize = 1;

/// Number of successive sign flips of the neutral density rate after which
/// the rate is damped.
pub const MAX_SIGN_COUNT: i32 = 4;

/// Factor applied to the neutral density rate for each flip beyond
/// `MAX_SIGN_COUNT`.
pub const DAMP_FACTOR: f64 = 0.5;




/// Whether a cell takes part in a chemistry sub-step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellPhase {
    /// Both the neutral density rate and the energy rate vanish.
    Stable,
    /// The cell is integrating its rate equations.
    Active,
}




/// Per-cell scratch data of the chemistry update, over the interior of one
/// grid: the current rates, the state on entry to the sub-cycle, and the
/// sign history of the neutral density rate.
#[derive(Clone, Debug)]
pub struct ChemistryState {
    rates: Patch,
    signs: Patch<i32>,
}




// ============================================================================
impl ChemistryState {

    pub fn new(interior: IndexSpace) -> Self {
        Self {
            rates: Patch::zeros(interior.clone(), NUM_RATE_FIELDS),
            signs: Patch::zeros(interior, 2),
        }
    }

    pub fn photoionization_rate(&self, index: (i64, i64, i64)) -> f64 {
        self.rates.get(index, PHOTOIONIZATION)
    }

    pub fn energy_rate(&self, index: (i64, i64, i64)) -> f64 {
        self.rates.get(index, ENERGY_RATE)
    }

    pub fn neutral_rate(&self, index: (i64, i64, i64)) -> f64 {
        self.rates.get(index, NEUTRAL_RATE)
    }

    pub fn initial_energy(&self, index: (i64, i64, i64)) -> f64 {
        self.rates.get(index, ENERGY_INIT)
    }

    pub fn initial_thermal_energy(&self, index: (i64, i64, i64)) -> f64 {
        self.rates.get(index, THERMAL_ENERGY_INIT)
    }

    pub fn initial_electron_fraction(&self, index: (i64, i64, i64)) -> f64 {
        self.rates.get(index, ELECTRON_FRACTION_INIT)
    }

    pub fn sign_count(&self, index: (i64, i64, i64)) -> i32 {
        self.signs.get(index, SIGN_COUNT)
    }

    pub fn phase(&self, index: (i64, i64, i64)) -> CellPhase {
        if self.neutral_rate(index) == 0.0 && self.energy_rate(index) == 0.0 {
            CellPhase::Stable
        } else {
            CellPhase::Active
        }
    }

    pub(crate) fn clear_photoionization(&mut self) {
        for rates in self.rates.data_mut().chunks_mut(NUM_RATE_FIELDS) {
            rates[PHOTOIONIZATION] = 0.0
        }
    }

    pub(crate) fn add_photoionization(&mut self, index: (i64, i64, i64), rate: f64) {
        let r = self.rates.get_slice_mut(index);
        r[PHOTOIONIZATION] += rate
    }

    pub(crate) fn set_energy_rate(&mut self, index: (i64, i64, i64), rate: f64) {
        self.rates.set(index, ENERGY_RATE, rate)
    }

    pub(crate) fn set_neutral_rate(&mut self, index: (i64, i64, i64), rate: f64) {
        self.rates.set(index, NEUTRAL_RATE, rate)
    }

    /// Record the state on entry to a sub-cycle, and forget the sign
    /// history.
    pub(crate) fn save_initial(&mut self, index: (i64, i64, i64), energy: f64, thermal_energy: f64, electron_fraction: f64) {
        let r = self.rates.get_slice_mut(index);
        r[ENERGY_INIT] = energy;
        r[THERMAL_ENERGY_INIT] = thermal_energy;
        r[ELECTRON_FRACTION_INIT] = electron_fraction;

        let s = self.signs.get_slice_mut(index);
        s[LAST_SIGN] = 0;
        s[SIGN_COUNT] = 0;
    }

    /**
     * Update the sign history with a new neutral density rate, and return
     * the factor the rate is to be multiplied by. A flip of sign counts up,
     * a repeat counts down, and a vanishing rate resets the history. Past
     * `MAX_SIGN_COUNT` flips the cell is taken to be oscillating, and the
     * rate is damped by `DAMP_FACTOR` for every flip in excess.
     */
    pub(crate) fn track_sign(&mut self, index: (i64, i64, i64), rate: f64) -> f64 {
        let s = self.signs.get_slice_mut(index);
        let sign = if rate < 0.0 {
            -1
        } else if rate > 0.0 {
            1
        } else {
            0
        };

        if sign == 0 {
            s[LAST_SIGN] = 0;
            s[SIGN_COUNT] = 0;
        } else {
            if s[LAST_SIGN] == -sign {
                s[SIGN_COUNT] += 1
            } else if s[SIGN_COUNT] > 0 {
                s[SIGN_COUNT] -= 1
            }
            s[LAST_SIGN] = sign;
        }
        DAMP_FACTOR.powi((s[SIGN_COUNT] - MAX_SIGN_COUNT).max(0))
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use crate::index_space::range3d;
    use super::{CellPhase, ChemistryState, DAMP_FACTOR};

    #[test]
    fn oscillating_rate_is_damped_after_four_flips() {
        let mut state = ChemistryState::new(range3d(0..2, 0..1, 0..1));
        let factors: Vec<_> = (0..7)
            .map(|n| state.track_sign((0, 0, 0), if n % 2 == 0 { 1.0 } else { -1.0 }))
            .collect();
        assert_eq!(&factors[..5], &[1.0; 5]);
        assert_eq!(factors[5], DAMP_FACTOR);
        assert_eq!(factors[6], DAMP_FACTOR * DAMP_FACTOR);
        assert_eq!(state.sign_count((1, 0, 0)), 0);
    }

    #[test]
    fn steady_sign_unwinds_the_flip_count() {
        let mut state = ChemistryState::new(range3d(0..1, 0..1, 0..1));
        for &r in [1.0, -1.0, 1.0, 1.0, 1.0].iter() {
            state.track_sign((0, 0, 0), r);
        }
        assert_eq!(state.sign_count((0, 0, 0)), 0);
        state.track_sign((0, 0, 0), -1.0);
        state.track_sign((0, 0, 0), 0.0);
        assert_eq!(state.sign_count((0, 0, 0)), 0);
    }

    #[test]
    fn cell_without_rates_is_stable() {
        let mut state = ChemistryState::new(range3d(0..1, 0..1, 0..1));
        assert_eq!(state.phase((0, 0, 0)), CellPhase::Stable);
        state.set_energy_rate((0, 0, 0), 1e-3);
        assert_eq!(state.phase((0, 0, 0)), CellPhase::Active);
        state.add_photoionization((0, 0, 0), 2.0);
        state.add_photoionization((0, 0, 0), 1.0);
        assert_eq!(state.photoionization_rate((0, 0, 0)), 3.0);
        state.clear_photoionization();
        assert_eq!(state.photoionization_rate((0, 0, 0)), 0.0);
    }
}
