//! Two-port transfer matrices and acoustic state vectors.
//!
//! A transfer matrix relates pressure and volume flow at the upstream (mouthpiece-side)
//! end of an element to those at its downstream end:
//!
//! ```text
//! [p_in]   [A  B] [p_out]
//! [U_in] = [C  D] [U_out]
//! ```
//!
//! Elements compose left to right from the mouthpiece toward the foot.

use std::ops::Mul;

use num_complex::Complex64;

use crate::types::{Matrix2c, Vector2c};

/// Complex 2×2 two-port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferMatrix(Matrix2c);

impl TransferMatrix {
    pub fn new(a: Complex64, b: Complex64, c: Complex64, d: Complex64) -> Self {
        Self(Matrix2c::new(a, b, c, d))
    }

    pub fn identity() -> Self {
        Self(Matrix2c::identity())
    }

    /// Series impedance element: `[[1, Z], [0, 1]]`.
    pub fn series(impedance: Complex64) -> Self {
        Self::new(
            Complex64::new(1.0, 0.0),
            impedance,
            Complex64::new(0.0, 0.0),
            Complex64::new(1.0, 0.0),
        )
    }

    /// Shunt admittance element: `[[1, 0], [Y, 1]]`.
    pub fn shunt(admittance: Complex64) -> Self {
        Self::new(
            Complex64::new(1.0, 0.0),
            Complex64::new(0.0, 0.0),
            admittance,
            Complex64::new(1.0, 0.0),
        )
    }

    pub fn a(&self) -> Complex64 {
        self.0[(0, 0)]
    }

    pub fn b(&self) -> Complex64 {
        self.0[(0, 1)]
    }

    pub fn c(&self) -> Complex64 {
        self.0[(1, 0)]
    }

    pub fn d(&self) -> Complex64 {
        self.0[(1, 1)]
    }

    pub fn matrix(&self) -> &Matrix2c {
        &self.0
    }

    /// AD − BC; equals 1 for reciprocal elements.
    pub fn determinant(&self) -> Complex64 {
        self.a() * self.d() - self.b() * self.c()
    }

    /// Product of a sequence of matrices, in order.
    pub fn multiply_all<'a, I>(matrices: I) -> Self
    where
        I: IntoIterator<Item = &'a TransferMatrix>,
    {
        matrices
            .into_iter()
            .fold(Self::identity(), |acc, m| acc * *m)
    }

    /// Apply to a downstream state vector, giving the upstream state.
    pub fn apply(&self, state: &StateVector) -> StateVector {
        StateVector(self.0 * state.0)
    }

    /// Input impedance seen through this element when its output is loaded by `load`.
    pub fn transform_impedance(&self, load: Complex64) -> Complex64 {
        (self.a() * load + self.b()) / (self.c() * load + self.d())
    }
}

impl Mul for TransferMatrix {
    type Output = TransferMatrix;

    fn mul(self, rhs: TransferMatrix) -> TransferMatrix {
        TransferMatrix(self.0 * rhs.0)
    }
}

/// Acoustic state (pressure, volume flow) at a point in the bore.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector(Vector2c);

impl StateVector {
    pub fn new(pressure: Complex64, flow: Complex64) -> Self {
        Self(Vector2c::new(pressure, flow))
    }

    /// State with the given impedance and unit flow.
    pub fn from_impedance(impedance: Complex64) -> Self {
        Self::new(impedance, Complex64::new(1.0, 0.0))
    }

    pub fn pressure(&self) -> Complex64 {
        self.0[0]
    }

    pub fn flow(&self) -> Complex64 {
        self.0[1]
    }

    /// Z = p / U.
    pub fn impedance(&self) -> Complex64 {
        self.pressure() / self.flow()
    }

    /// Y = U / p.
    pub fn admittance(&self) -> Complex64 {
        self.flow() / self.pressure()
    }

    /// Reflectance relative to a characteristic impedance: (Z − Z₀)/(Z + Z₀).
    pub fn reflectance(&self, z0: f64) -> Complex64 {
        let p = self.pressure();
        let u = self.flow() * z0;
        (p - u) / (p + u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn series_and_shunt_have_unit_determinant() {
        let s = TransferMatrix::series(c(3.0, -2.0));
        let y = TransferMatrix::shunt(c(0.5, 4.0));
        assert!((s.determinant() - c(1.0, 0.0)).norm() < 1e-15);
        assert!((y.determinant() - c(1.0, 0.0)).norm() < 1e-15);
        assert!(((s * y).determinant() - c(1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn product_applies_left_to_right() {
        let s = TransferMatrix::series(c(2.0, 0.0));
        let y = TransferMatrix::shunt(c(0.25, 0.0));
        let load = StateVector::from_impedance(c(4.0, 0.0));

        let step = s.apply(&y.apply(&load));
        let combined = TransferMatrix::multiply_all([s, y].iter()).apply(&load);

        assert!((step.impedance() - combined.impedance()).norm() < 1e-12);
        // 4 Ω in parallel with 4 Ω, then 2 Ω in series
        assert!((combined.impedance() - c(4.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn transform_impedance_matches_state_vector() {
        let m = TransferMatrix::new(c(1.0, 0.2), c(0.3, 1.0), c(-0.1, 0.4), c(0.9, -0.3));
        let load = c(2.0, -1.0);
        let via_state = m.apply(&StateVector::from_impedance(load)).impedance();
        assert!((m.transform_impedance(load) - via_state).norm() < 1e-12);
    }

    #[test]
    fn reflectance_of_matched_load_is_zero() {
        let sv = StateVector::from_impedance(c(5.0, 0.0));
        assert!(sv.reflectance(5.0).norm() < 1e-15);
        let open = StateVector::new(c(0.0, 0.0), c(1.0, 0.0));
        assert!((open.reflectance(5.0) - c(-1.0, 0.0)).norm() < 1e-15);
    }
}
