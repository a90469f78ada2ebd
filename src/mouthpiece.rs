//! Air-jet mouthpiece models: transverse embouchure hole and fipple window.
//!
//! Both are lumped as a series element: the inertance of the air slug in the opening plus
//! its radiation resistance. The jet drives the bore at an impedance minimum, so resonance
//! is sought where the reflectance is −1.

use std::f64::consts::PI;

use num_complex::Complex64;

use crate::geometry::{EmbouchureHole, Fipple, Mouthpiece, MouthpieceKind};
use crate::physical_parameters::PhysicalParameters;
use crate::transfer_matrix::TransferMatrix;

/// Default lip-coverage factor for an embouchure hole.
pub const DEFAULT_EMBOUCHURE_BETA: f64 = 0.35;

/// Default empirical scale on the fipple window's effective length.
pub const DEFAULT_FIPPLE_FACTOR: f64 = 1.0;

impl Mouthpiece {
    /// Series two-port of the mouthpiece opening.
    pub fn transfer_matrix(&self, wave_number: f64, params: &PhysicalParameters) -> TransferMatrix {
        let (area, effective_length) = match &self.kind {
            MouthpieceKind::EmbouchureHole(hole) => embouchure_opening(hole, self.beta),
            MouthpieceKind::Fipple(fipple) => fipple_opening(fipple),
        };
        TransferMatrix::series(opening_impedance(
            area,
            effective_length,
            wave_number,
            params,
        ))
    }

    /// Sign applied to reflectance before the phase-zero resonance search.
    pub fn reflectance_multiplier(&self) -> i32 {
        match self.kind {
            MouthpieceKind::EmbouchureHole(_) | MouthpieceKind::Fipple(_) => -1,
        }
    }
}

/// Impedance of a short opening: Z0 (j k l + (k r)²/4), r the equivalent radius.
fn opening_impedance(
    area: f64,
    effective_length: f64,
    wave_number: f64,
    params: &PhysicalParameters,
) -> Complex64 {
    let radius = (area / PI).sqrt();
    let z0 = params.calc_z0(radius);
    let kr = wave_number * radius;
    z0 * Complex64::new(0.25 * kr * kr, wave_number * effective_length)
}

/// Embouchure hole: mean radius through the chimney, inner and lip-shaded outer corrections.
fn embouchure_opening(hole: &EmbouchureHole, beta: Option<f64>) -> (f64, f64) {
    let beta = beta.unwrap_or(DEFAULT_EMBOUCHURE_BETA);
    let radius = (hole.inner_diameter + hole.outer_diameter) / 4.0;
    let area = PI * radius * radius;
    let effective_length = hole.height + radius * (0.6133 + 0.8216 * (1.0 + beta));
    (area, effective_length)
}

/// Fipple window: rectangular opening through the labium wall.
fn fipple_opening(fipple: &Fipple) -> (f64, f64) {
    let area = fipple.window_width * fipple.window_length;
    let radius = (area / PI).sqrt();
    let factor = fipple.fipple_factor.unwrap_or(DEFAULT_FIPPLE_FACTOR);
    let wall = fipple.window_height.unwrap_or(0.0);
    let effective_length = factor * (wall + 1.7 * radius);
    (area, effective_length)
}
