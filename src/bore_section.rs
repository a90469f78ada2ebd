//! Transfer matrices for cylindrical and conical bore sections with visco-thermal loss.

use num_complex::Complex64;

use crate::geometry::BoreSection;
use crate::physical_parameters::PhysicalParameters;
use crate::transfer_matrix::TransferMatrix;
use crate::types::EQUAL_RADIUS_TOL;

const J: Complex64 = Complex64::new(0.0, 1.0);

impl BoreSection {
    /// Two-port of this section at the given wave number.
    ///
    /// Sections with equal end radii use the cylinder solution; all others use the
    /// spherical-wave cone solution.
    pub fn transfer_matrix(&self, wave_number: f64, params: &PhysicalParameters) -> TransferMatrix {
        if (self.right_radius - self.left_radius).abs() <= EQUAL_RADIUS_TOL {
            cylinder_matrix(self.length, self.left_radius, wave_number, params)
        } else {
            cone_matrix(
                self.length,
                self.left_radius,
                self.right_radius,
                wave_number,
                params,
            )
        }
    }

    pub fn is_cylindrical(&self) -> bool {
        (self.right_radius - self.left_radius).abs() <= EQUAL_RADIUS_TOL
    }
}

/// Lossy cylinder: Γ = jk + (1 + j)α.
pub fn cylinder_matrix(
    length: f64,
    radius: f64,
    wave_number: f64,
    params: &PhysicalParameters,
) -> TransferMatrix {
    let zc = params.calc_z0(radius);
    let alpha = params.calc_loss(wave_number, radius);
    let gamma = Complex64::new(alpha, wave_number + alpha);
    let gl = gamma * length;
    let cosh = gl.cosh();
    let sinh = gl.sinh();
    TransferMatrix::new(cosh, sinh * zc, sinh / zc, cosh)
}

/// Lossy cone between radii `r1` (upstream) and `r2` (downstream).
pub fn cone_matrix(
    length: f64,
    r1: f64,
    r2: f64,
    wave_number: f64,
    params: &PhysicalParameters,
) -> TransferMatrix {
    let ratio = r2 / r1;
    let zc1 = params.calc_z0(r1);
    let zc2 = params.calc_z0(r2);

    // Inverse apex distances; zero for a cylinder.
    let inv_x1 = (r2 - r1) / (r1 * length);
    let inv_x2 = (r2 - r1) / (r2 * length);

    let r_eq = if (r2 - r1).abs() <= EQUAL_RADIUS_TOL {
        r1
    } else {
        (r2 - r1) / ratio.ln()
    };
    let loss = params.alpha_constant() * wave_number.sqrt() / r_eq;
    let k = Complex64::new(wave_number + loss, -loss);

    let kl = k * length;
    let sin = kl.sin();
    let cos = kl.cos();

    let a = cos * ratio - sin * inv_x1 / k;
    let b = J * sin * (ratio * zc2);
    let c = J * (ratio / zc1)
        * (sin * (1.0 + inv_x1 * inv_x2 / (k * k)) + cos * (inv_x2 - inv_x1) / k);
    let d = cos / ratio + sin * inv_x2 / k;

    TransferMatrix::new(a, b, c, d)
}
