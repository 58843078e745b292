use std::ops::{Add, Mul, Sub};
use crate::index_space::Axis;




/**
 * Hydrodynamic directions coincide with the mesh axes
 */
pub type Direction = Axis;




/**
 * A 3D vector
 */
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector3d(pub f64, pub f64, pub f64);




// ============================================================================
impl Vector3d {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Vector3d(x, y, z)
    }

    pub fn unit(direction: Direction) -> Self {
        match direction {
            Axis::I => Vector3d(1.0, 0.0, 0.0),
            Axis::J => Vector3d(0.0, 1.0, 0.0),
            Axis::K => Vector3d(0.0, 0.0, 1.0),
        }
    }

    pub fn component(&self, direction: Direction) -> f64 {
        match direction {
            Axis::I => self.0,
            Axis::J => self.1,
            Axis::K => self.2,
        }
    }

    pub fn dot(&self, other: &Self) -> f64 {
        self.0 * other.0 + self.1 * other.1 + self.2 * other.2
    }

    pub fn norm_squared(&self) -> f64 {
        self.dot(self)
    }
}




// ============================================================================
impl Add<Vector3d> for Vector3d {
    type Output = Self;
    fn add(self, v: Self) -> Self {
        Self(self.0 + v.0, self.1 + v.1, self.2 + v.2)
    }
}

impl Sub<Vector3d> for Vector3d {
    type Output = Self;
    fn sub(self, v: Self) -> Self {
        Self(self.0 - v.0, self.1 - v.1, self.2 - v.2)
    }
}

impl Mul<f64> for Vector3d {
    type Output = Self;
    fn mul(self, a: f64) -> Self {
        Self(self.0 * a, self.1 * a, self.2 * a)
    }
}
