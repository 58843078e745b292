/**
 * Temperature-dependent coefficients of the hydrogen network. All
 * coefficients are in CGS units and per unit physical time; the solver
 * converts them to code time with the configured time unit.
 */
pub trait RateModel: Send + Sync {

    /// Case-B radiative recombination coefficient [cm^3 s^-1].
    fn recombination(&self, temperature: f64) -> f64;

    /// Collisional ionization coefficient [cm^3 s^-1].
    fn collisional_ionization(&self, temperature: f64) -> f64;

    /// Energy lost per recombination times the recombination coefficient
    /// [erg cm^3 s^-1].
    fn recombination_cooling(&self, temperature: f64) -> f64;

    /// Lyman-alpha line emission per unit volume [erg cm^-3 s^-1]. The
    /// result is negative: it is added to the heating rate.
    fn lyman_alpha_cooling(&self, neutral: f64, electrons: f64, temperature: f64) -> f64;

    /// Molecular heating per hydrogen atom [erg s^-1].
    fn molecular_heating(&self) -> f64 {
        0.0
    }

    /// Molecular cooling coefficient [erg cm^3 s^-1].
    fn molecular_cooling(&self, _temperature: f64) -> f64 {
        0.0
    }
}




/// Fits for photoionized atomic hydrogen: case-B recombination and its
/// cooling, collisional ionization, and collisionally excited Lyman-alpha
/// emission. The Koyama-Inutsuka fits for cold neutral gas are included
/// when `molecular` is set.
#[derive(Clone, Debug)]
pub struct StandardRates {
    pub boltzmann_constant: f64,
    pub molecular: bool,
}




// ============================================================================
impl StandardRates {
    pub fn new(boltzmann_constant: f64, molecular: bool) -> Self {
        Self { boltzmann_constant, molecular }
    }
}

impl RateModel for StandardRates {

    fn recombination(&self, temperature: f64) -> f64 {
        2.59e-13 * (temperature / 1e4).powf(-0.7)
    }

    fn collisional_ionization(&self, temperature: f64) -> f64 {
        if temperature <= 0.0 {
            return 0.0
        }
        5.84e-11 * temperature.sqrt() * (-157809.1 / temperature).exp()
    }

    fn recombination_cooling(&self, temperature: f64) -> f64 {
        if temperature <= 0.0 {
            return 0.0
        }
        6.1e-10 * self.boltzmann_constant * temperature.powf(0.11)
    }

    fn lyman_alpha_cooling(&self, neutral: f64, electrons: f64, temperature: f64) -> f64 {
        if temperature <= 0.0 {
            return 0.0
        }
        -7.5e-19 * (-118348.0 / temperature).exp() / (1.0 + (temperature / 1e5).sqrt()) * neutral * electrons
    }

    fn molecular_heating(&self) -> f64 {
        if self.molecular {
            2e-26
        } else {
            0.0
        }
    }

    fn molecular_cooling(&self, temperature: f64) -> f64 {
        if !self.molecular || temperature <= 0.0 {
            return 0.0
        }
        let ratio = 1e7 * (-1.184e5 / (temperature + 1000.0)).exp()
            + 1.4e-2 * temperature.sqrt() * (-92.0 / temperature).exp();
        2e-26 * ratio
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use super::{RateModel, StandardRates};

    const K_B: f64 = 1.380658e-16;

    #[test]
    fn collisional_rates_vanish_in_cold_gas() {
        let rates = StandardRates::new(K_B, true);
        for &t in [0.0, 1e-3, 1.0].iter() {
            assert!(rates.collisional_ionization(t) < 1e-300);
            assert!(rates.lyman_alpha_cooling(1.0, 1.0, t).abs() < 1e-300);
        }
        assert_eq!(rates.recombination_cooling(0.0), 0.0);
        assert_eq!(rates.molecular_cooling(0.0), 0.0);
    }

    #[test]
    fn recombination_slows_down_in_hot_gas() {
        let rates = StandardRates::new(K_B, false);
        assert!((rates.recombination(1e4) - 2.59e-13).abs() < 1e-25);
        assert!(rates.recombination(2e4) < rates.recombination(1e4));
    }

    #[test]
    fn collisional_ionization_grows_with_temperature() {
        let rates = StandardRates::new(K_B, false);
        let t: Vec<f64> = vec![1e3, 1e4, 1e5, 1e6];
        assert!(t.windows(2).all(|w| rates.collisional_ionization(w[1]) > rates.collisional_ionization(w[0])));
    }

    #[test]
    fn molecular_terms_are_off_unless_requested() {
        let rates = StandardRates::new(K_B, false);
        assert_eq!(rates.molecular_heating(), 0.0);
        assert_eq!(rates.molecular_cooling(100.0), 0.0);
        assert!(StandardRates::new(K_B, true).molecular_cooling(100.0) > 0.0);
    }
}
