//! Tone-hole two-port: symmetric T-network after Keefe (1990).
//!
//! The hole is a shunt branch of impedance Zs between two half series impedances Za/2.
//! Za carries the negative length correction of the hole's interaction with the bore;
//! Zs is the branch input impedance, open (radiating) or closed (a stopped chimney).

use num_complex::Complex64;

use crate::geometry::Hole;
use crate::physical_parameters::PhysicalParameters;
use crate::transfer_matrix::TransferMatrix;

const J: Complex64 = Complex64::new(0.0, 1.0);

impl Hole {
    /// Two-port of this hole at the given wave number, in a bore of radius `bore_radius`.
    pub fn transfer_matrix(
        &self,
        wave_number: f64,
        params: &PhysicalParameters,
        bore_radius: f64,
        is_open: bool,
    ) -> TransferMatrix {
        tone_hole_matrix(
            self.diameter / 2.0,
            self.height,
            bore_radius,
            wave_number,
            params,
            is_open,
        )
    }
}

/// Matching-volume length correction t_m.
fn matching_length(b: f64, delta: f64) -> f64 {
    b * delta * (1.0 + 0.207 * delta.powi(3)) / 8.0
}

/// Tone-hole matrix for hole radius `b`, chimney height `t` and bore radius `a`.
pub fn tone_hole_matrix(
    b: f64,
    t: f64,
    a: f64,
    wave_number: f64,
    params: &PhysicalParameters,
    is_open: bool,
) -> TransferMatrix {
    let k = wave_number;
    let delta = b / a;
    let delta2 = delta * delta;
    let delta4 = delta2 * delta2;
    let z0h = params.calc_z0(b);
    let tm = matching_length(b, delta);

    let (zs, ta) = if is_open {
        // Radiating chimney, effective length including the outer end correction.
        let kt = (k * t).tan();
        let te = (kt / k + b * (1.40 - 0.58 * delta2)) / (1.0 - 0.61 * k * b * kt) + tm;
        let zs = z0h * Complex64::new(0.25 * (k * b).powi(2), k * te);
        let ta = (-0.35 + 0.06 * (2.7 * t / b).tanh()) * b * delta4;
        (zs, ta)
    } else {
        let te = t + tm;
        let zs = -J * z0h / (k * te).tan();
        let ta = -0.47 * b * delta4 / ((1.84 * t / b).tanh() + 0.62 * delta2 + 0.64 * delta);
        (zs, ta)
    };

    let za = J * (z0h * k * ta);
    let ratio = za / zs;
    let diagonal = 1.0 + ratio / 2.0;
    TransferMatrix::new(diagonal, za * (1.0 + ratio / 4.0), 1.0 / zs, diagonal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hole() -> Hole {
        Hole::new(0.2, 0.007, 0.003)
    }

    #[test]
    fn hole_matrix_is_reciprocal() {
        let params = PhysicalParameters::default();
        for &f in &[200.0, 600.0, 2000.0] {
            let k = params.calc_wave_number(f);
            for open in [true, false] {
                let tm = hole().transfer_matrix(k, &params, 0.0075, open);
                assert!(
                    (tm.determinant() - Complex64::new(1.0, 0.0)).norm() < 1e-9,
                    "open = {}, f = {}",
                    open,
                    f
                );
            }
        }
    }

    #[test]
    fn open_hole_shunts_more_than_closed_hole() {
        let params = PhysicalParameters::default();
        let k = params.calc_wave_number(440.0);
        let open = hole().transfer_matrix(k, &params, 0.0075, true);
        let closed = hole().transfer_matrix(k, &params, 0.0075, false);
        // C = 1/Zs: the open branch has far lower impedance at low frequency
        assert!(open.c().norm() > 10.0 * closed.c().norm());
    }

    #[test]
    fn closed_hole_branch_is_compliant() {
        let params = PhysicalParameters::default().lossless();
        let k = params.calc_wave_number(440.0);
        let closed = hole().transfer_matrix(k, &params, 0.0075, false);
        // Stopped short chimney: Zs = -j Z0h cot(k te), so 1/Zs is positive imaginary
        assert!(closed.c().im > 0.0);
        assert!(closed.c().re.abs() < 1e-12 * closed.c().im);
    }
}
