//! Radiation boundary at the foot of the bore.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::physical_parameters::PhysicalParameters;
use crate::transfer_matrix::StateVector;

/// End corrections (in bore radii) and radiation resistance coefficients
/// for the unflanged and infinitely flanged pipe.
const UNFLANGED_END_CORRECTION: f64 = 0.6133;
const FLANGED_END_CORRECTION: f64 = 0.8216;
const UNFLANGED_RESISTANCE: f64 = 0.25;
const FLANGED_RESISTANCE: f64 = 0.5;

/// Termination boundary model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationModel {
    /// Pressure release: p = 0.
    IdealOpenEnd,
    /// Low-frequency radiation impedance of a flanged open end.
    #[default]
    Flanged,
}

impl TerminationModel {
    /// Boundary state vector (p, U) at the foot.
    pub fn state_vector(
        &self,
        wave_number: f64,
        params: &PhysicalParameters,
        bore_radius: f64,
        flange_diameter: f64,
    ) -> StateVector {
        match self {
            TerminationModel::IdealOpenEnd => {
                StateVector::new(Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0))
            }
            TerminationModel::Flanged => StateVector::from_impedance(radiation_impedance(
                wave_number,
                params,
                bore_radius,
                flange_diameter / 2.0,
            )),
        }
    }
}

/// Radiation impedance Z0 (c_r (ka)² + j k δ a), with δ and c_r interpolated
/// between the unflanged and infinite-flange limits by a/b.
pub fn radiation_impedance(
    wave_number: f64,
    params: &PhysicalParameters,
    bore_radius: f64,
    flange_radius: f64,
) -> Complex64 {
    let ratio = if flange_radius > bore_radius {
        bore_radius / flange_radius
    } else {
        1.0
    };
    let end_correction =
        FLANGED_END_CORRECTION - (FLANGED_END_CORRECTION - UNFLANGED_END_CORRECTION) * ratio;
    let resistance = FLANGED_RESISTANCE - (FLANGED_RESISTANCE - UNFLANGED_RESISTANCE) * ratio;

    let ka = wave_number * bore_radius;
    params.calc_z0(bore_radius) * Complex64::new(resistance * ka * ka, ka * end_correction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ideal_open_end_releases_pressure() {
        let params = PhysicalParameters::default();
        let sv = TerminationModel::IdealOpenEnd.state_vector(5.0, &params, 0.01, 0.02);
        assert_eq!(sv.pressure(), Complex64::new(0.0, 0.0));
        assert_eq!(sv.flow(), Complex64::new(1.0, 0.0));
    }

    #[test]
    fn flange_lengthens_end_correction() {
        let params = PhysicalParameters::default();
        let k = params.calc_wave_number(440.0);
        let bare = radiation_impedance(k, &params, 0.01, 0.01);
        let wide = radiation_impedance(k, &params, 0.01, 1.0);
        assert!(wide.im > bare.im);
        assert!(wide.re > bare.re);

        let z0 = params.calc_z0(0.01);
        let ka = k * 0.01;
        assert!((bare.im / (z0 * ka) - UNFLANGED_END_CORRECTION).abs() < 1e-12);
    }

    #[test]
    fn flanged_state_vector_carries_radiation_impedance() {
        let params = PhysicalParameters::default();
        let k = params.calc_wave_number(300.0);
        let sv = TerminationModel::Flanged.state_vector(k, &params, 0.008, 0.03);
        let expected = radiation_impedance(k, &params, 0.008, 0.015);
        assert!((sv.impedance() - expected).norm() < 1e-9 * expected.norm());
    }
}
