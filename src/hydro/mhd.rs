use std::ops::{Add, Sub, Mul, Div};
use super::error::Error;
use super::geometry::{Direction, Vector3d};




/// Number of fields in the conserved and primitive state vectors.
pub const NUM_FIELDS: usize = 9;




/**
 * Conserved state: mass density, momentum density (3), total energy
 * density, cell-centered magnetic field (3), and neutral hydrogen mass
 * density. The magnetic field is in units where the magnetic pressure is
 * B^2 / 2.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Conserved(pub [f64; NUM_FIELDS]);

/**
 * Primitive state: mass density, velocity (3), gas pressure, magnetic
 * field (3), and neutral mass fraction.
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Primitive(pub [f64; NUM_FIELDS]);




// ============================================================================
impl Conserved {

    pub fn from_slice(cons: &[f64]) -> Self {
        let mut u = [0.0; NUM_FIELDS];
        u.copy_from_slice(&cons[..NUM_FIELDS]);
        Self(u)
    }

    pub fn write_to_slice(&self, cons: &mut [f64]) {
        cons[..NUM_FIELDS].copy_from_slice(&self.0)
    }

    pub fn zeros() -> Self {
        Self([0.0; NUM_FIELDS])
    }

    pub fn mass_density(&self) -> f64 {
        self.0[0]
    }

    pub fn momentum_1(&self) -> f64 {
        self.0[1]
    }

    pub fn momentum_2(&self) -> f64 {
        self.0[2]
    }

    pub fn momentum_3(&self) -> f64 {
        self.0[3]
    }

    pub fn energy_density(&self) -> f64 {
        self.0[4]
    }

    pub fn neutral_density(&self) -> f64 {
        self.0[8]
    }

    pub fn momentum_vector(&self) -> Vector3d {
        Vector3d::new(self.0[1], self.0[2], self.0[3])
    }

    pub fn magnetic_vector(&self) -> Vector3d {
        Vector3d::new(self.0[5], self.0[6], self.0[7])
    }

    pub fn momentum(&self, direction: Direction) -> f64 {
        self.momentum_vector().component(direction)
    }

    pub fn magnetic_field(&self, direction: Direction) -> f64 {
        self.magnetic_vector().component(direction)
    }

    pub fn momentum_squared(&self) -> f64 {
        self.momentum_vector().norm_squared()
    }

    pub fn magnetic_energy_density(&self) -> f64 {
        0.5 * self.magnetic_vector().norm_squared()
    }

    pub fn kinetic_energy_density(&self) -> f64 {
        0.5 * self.momentum_squared() / self.mass_density()
    }

    /**
     * Thermal energy density: total energy minus kinetic and magnetic parts.
     */
    pub fn internal_energy_density(&self) -> f64 {
        self.energy_density() - self.kinetic_energy_density() - self.magnetic_energy_density()
    }

    pub fn to_primitive(&self, gamma_law_index: f64) -> Result<Primitive, Error> {
        if self.0.iter().any(|x| !x.is_finite()) {
            return Err(Error::NonFiniteState(self.0))
        }

        let d = self.mass_density();

        if d <= 0.0 {
            return Err(Error::NegativeMassDensity(d))
        }

        let pg = self.internal_energy_density() * (gamma_law_index - 1.0);

        if pg < 0.0 {
            return Err(Error::NegativeGasPressure(pg))
        }

        let v = self.momentum_vector() * (1.0 / d);
        let b = self.magnetic_vector();

        Ok(Primitive([d, v.0, v.1, v.2, pg, b.0, b.1, b.2, self.neutral_density() / d]))
    }

    pub fn fast_magnetosonic_speed(&self, direction: Direction, gamma_law_index: f64) -> Result<f64, Error> {
        if self.mass_density() == 0.0 {
            return Err(Error::VanishingDensity(0.0))
        }
        self.to_primitive(gamma_law_index)?.fast_magnetosonic_speed(direction, gamma_law_index)
    }
}




// ============================================================================
impl Primitive {

    pub fn from_slice(prim: &[f64]) -> Self {
        let mut p = [0.0; NUM_FIELDS];
        p.copy_from_slice(&prim[..NUM_FIELDS]);
        Self(p)
    }

    pub fn write_to_slice(&self, prim: &mut [f64]) {
        prim[..NUM_FIELDS].copy_from_slice(&self.0)
    }

    pub fn mass_density(&self) -> f64 {
        self.0[0]
    }

    pub fn velocity_1(&self) -> f64 {
        self.0[1]
    }

    pub fn velocity_2(&self) -> f64 {
        self.0[2]
    }

    pub fn velocity_3(&self) -> f64 {
        self.0[3]
    }

    pub fn gas_pressure(&self) -> f64 {
        self.0[4]
    }

    pub fn neutral_fraction(&self) -> f64 {
        self.0[8]
    }

    pub fn velocity_vector(&self) -> Vector3d {
        Vector3d::new(self.0[1], self.0[2], self.0[3])
    }

    pub fn magnetic_vector(&self) -> Vector3d {
        Vector3d::new(self.0[5], self.0[6], self.0[7])
    }

    pub fn velocity(&self, direction: Direction) -> f64 {
        self.velocity_vector().component(direction)
    }

    pub fn magnetic_field(&self, direction: Direction) -> f64 {
        self.magnetic_vector().component(direction)
    }

    pub fn velocity_squared(&self) -> f64 {
        self.velocity_vector().norm_squared()
    }

    pub fn magnetic_pressure(&self) -> f64 {
        0.5 * self.magnetic_vector().norm_squared()
    }

    pub fn total_pressure(&self) -> f64 {
        self.gas_pressure() + self.magnetic_pressure()
    }

    pub fn sound_speed_squared(&self, gamma_law_index: f64) -> f64 {
        gamma_law_index * self.gas_pressure() / self.mass_density()
    }

    pub fn specific_kinetic_energy(&self) -> f64 {
        0.5 * self.velocity_squared()
    }

    pub fn specific_internal_energy(&self, gamma_law_index: f64) -> f64 {
        self.gas_pressure() / self.mass_density() / (gamma_law_index - 1.0)
    }

    /**
     * Fast magnetosonic speed along the given direction. With a = sound
     * speed, b = Alfven speed from the total field and bt = the part from
     * the transverse field:
     *
     * ```text
     * cf^2 = 1/2 (a^2 + b^2 + sqrt((b^2 - a^2)^2 + 4 a^2 bt^2))
     * ```
     *
     * which is exactly the sound speed when the field vanishes.
     */
    pub fn fast_magnetosonic_speed(&self, direction: Direction, gamma_law_index: f64) -> Result<f64, Error> {
        let d = self.mass_density();

        if !(d > 0.0) {
            return Err(Error::VanishingDensity(d))
        }

        let asq = self.sound_speed_squared(gamma_law_index);
        let b = self.magnetic_vector();
        let bn = b.component(direction);
        let bsq = b.norm_squared() / d;

        if bsq == 0.0 {
            return Ok(asq.sqrt())
        }

        let btsq = (b.norm_squared() - bn * bn) / d;
        let dif = bsq - asq;
        let cfsq = 0.5 * (asq + bsq + (dif * dif + 4.0 * asq * btsq).sqrt());

        Ok(cfsq.sqrt())
    }

    pub fn outer_wavespeeds(&self, direction: Direction, gamma_law_index: f64) -> Result<(f64, f64), Error> {
        let cf = self.fast_magnetosonic_speed(direction, gamma_law_index)?;
        let vn = self.velocity(direction);
        Ok((vn - cf, vn + cf))
    }

    pub fn max_signal_speed(&self, direction: Direction, gamma_law_index: f64) -> Result<f64, Error> {
        Ok(self.velocity(direction).abs() + self.fast_magnetosonic_speed(direction, gamma_law_index)?)
    }

    pub fn to_conserved(&self, gamma_law_index: f64) -> Conserved {
        let d = self.mass_density();
        let p = self.gas_pressure();
        let v = self.velocity_vector();
        let b = self.magnetic_vector();

        Conserved([
            d,
            d * v.0,
            d * v.1,
            d * v.2,
            0.5 * d * v.norm_squared() + p / (gamma_law_index - 1.0) + 0.5 * b.norm_squared(),
            b.0,
            b.1,
            b.2,
            d * self.neutral_fraction(),
        ])
    }

    /**
     * Physical flux of the ideal MHD equations through a face normal to
     * the given direction, including the advected neutral density.
     */
    pub fn flux_vector(&self, direction: Direction, gamma_law_index: f64) -> Conserved {
        let u = self.to_conserved(gamma_law_index);
        let v = self.velocity_vector();
        let b = self.magnetic_vector();
        let vn = v.component(direction);
        let bn = b.component(direction);
        let pt = self.total_pressure();
        let n = Vector3d::unit(direction);

        let fm = u.momentum_vector() * vn + n * pt - b * bn;
        let fb = b * vn - v * bn;

        Conserved([
            u.mass_density() * vn,
            fm.0,
            fm.1,
            fm.2,
            (u.energy_density() + pt) * vn - bn * v.dot(&b),
            fb.0,
            fb.1,
            fb.2,
            u.neutral_density() * vn,
        ])
    }

    /**
     * Mirror the state across a plane normal to the given direction.
     */
    pub fn reflect(&self, direction: Direction) -> Primitive {
        let mut p = self.0;
        let n = direction.index();
        p[1 + n] = -p[1 + n];
        p[5 + n] = -p[5 + n];
        Primitive(p)
    }
}




// ============================================================================
impl Add<Conserved> for Conserved {
    type Output = Conserved;
    fn add(self, u: Self) -> Conserved {
        let mut r = self.0;
        r.iter_mut().zip(u.0.iter()).for_each(|(a, b)| *a += b);
        Conserved(r)
    }
}

impl Sub<Conserved> for Conserved {
    type Output = Self;
    fn sub(self, u: Self) -> Self {
        let mut r = self.0;
        r.iter_mut().zip(u.0.iter()).for_each(|(a, b)| *a -= b);
        Self(r)
    }
}

impl Mul<f64> for Conserved {
    type Output = Self;
    fn mul(self, a: f64) -> Self {
        Self(self.0.map(|x| x * a))
    }
}

impl Div<f64> for Conserved {
    type Output = Self;
    fn div(self, a: f64) -> Self {
        Self(self.0.map(|x| x / a))
    }
}

impl Add<Primitive> for Primitive {
    type Output = Primitive;
    fn add(self, p: Self) -> Primitive {
        let mut r = self.0;
        r.iter_mut().zip(p.0.iter()).for_each(|(a, b)| *a += b);
        Primitive(r)
    }
}

impl Sub<Primitive> for Primitive {
    type Output = Self;
    fn sub(self, p: Self) -> Self {
        let mut r = self.0;
        r.iter_mut().zip(p.0.iter()).for_each(|(a, b)| *a -= b);
        Self(r)
    }
}

impl Mul<f64> for Primitive {
    type Output = Self;
    fn mul(self, a: f64) -> Self {
        Self(self.0.map(|x| x * a))
    }
}




// ============================================================================
#[cfg(test)]
mod test {

    use proptest::prelude::*;
    use crate::index_space::Axis;
    use crate::hydro::Error;
    use super::{Conserved, Primitive};

    const GAMMA: f64 = 5.0 / 3.0;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-12 * (1.0 + a.abs().max(b.abs()))
    }

    proptest! {
        #[test]
        fn primitive_round_trip_recovers_the_state(
            d in 1e-3f64..1e3,
            v1 in -10.0f64..10.0,
            v2 in -10.0f64..10.0,
            v3 in -10.0f64..10.0,
            p in 1e-3f64..1e3,
            b1 in -5.0f64..5.0,
            b2 in -5.0f64..5.0,
            b3 in -5.0f64..5.0,
            x in 0.0f64..1.0)
        {
            let prim = Primitive([d, v1, v2, v3, p, b1, b2, b3, x]);
            let back = prim.to_conserved(GAMMA).to_primitive(GAMMA).unwrap();

            for (a, b) in prim.0.iter().zip(back.0.iter()) {
                prop_assert!((a - b).abs() <= 1e-8 * (1.0 + a.abs()), "{} != {}", a, b);
            }
        }
    }

    proptest! {
        #[test]
        fn fast_speed_reduces_to_sound_speed_at_zero_field(
            d in 1e-6f64..1e6,
            p in 1e-6f64..1e6,
            v1 in -10.0f64..10.0)
        {
            let prim = Primitive([d, v1, 0.0, 0.0, p, 0.0, 0.0, 0.0, 1.0]);
            let cs = (GAMMA * p / d).sqrt();

            for &axis in Axis::ALL.iter() {
                let cf = prim.fast_magnetosonic_speed(axis, GAMMA).unwrap();
                prop_assert!(close(cf, cs), "{} != {}", cf, cs);
            }
        }
    }

    #[test]
    fn fast_speed_with_parallel_field_is_the_larger_of_sound_and_alfven() {
        let prim = Primitive([1.0, 0.0, 0.0, 0.0, 0.6, 2.0, 0.0, 0.0, 0.0]);
        let cf = prim.fast_magnetosonic_speed(Axis::I, GAMMA).unwrap();
        assert!(close(cf, 2.0));

        let cf_perp = prim.fast_magnetosonic_speed(Axis::J, GAMMA).unwrap();
        assert!(close(cf_perp, (GAMMA * 0.6 + 4.0_f64).sqrt()));
    }

    #[test]
    fn invalid_states_are_reported() {
        let u = Conserved([-1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(matches!(u.to_primitive(GAMMA), Err(Error::NegativeMassDensity(_))));

        let u = Conserved([1.0, 2.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(matches!(u.to_primitive(GAMMA), Err(Error::NegativeGasPressure(_))));

        let u = Conserved([1.0, f64::NAN, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(matches!(u.to_primitive(GAMMA), Err(Error::NonFiniteState(_))));

        let p = Primitive([0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(matches!(p.fast_magnetosonic_speed(Axis::I, GAMMA), Err(Error::VanishingDensity(_))));
    }

    #[test]
    fn flux_of_a_static_state_is_pure_pressure() {
        let prim = Primitive([1.0, 0.0, 0.0, 0.0, 0.4, 0.0, 1.0, 0.0, 0.5]);
        let f = prim.flux_vector(Axis::I, GAMMA);
        assert_eq!(f.0, [0.0, 0.9, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn normal_field_has_no_flux_of_its_own() {
        let prim = Primitive([1.0, 0.3, -0.2, 0.1, 1.0, 0.7, 0.4, -0.5, 0.2]);
        assert_eq!(prim.flux_vector(Axis::I, GAMMA).0[5], 0.0);
        assert_eq!(prim.flux_vector(Axis::J, GAMMA).0[6], 0.0);
        assert_eq!(prim.flux_vector(Axis::K, GAMMA).0[7], 0.0);
    }
}
