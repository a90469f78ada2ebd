//! Type aliases and shared constants for the woodwind acoustics library.

use nalgebra::{Matrix2, Vector2};
use num_complex::Complex64;

// Type aliases for the two-port algebra
pub type Matrix2c = Matrix2<Complex64>;
pub type Vector2c = Vector2<Complex64>;

/// Reference pitch for note-name resolution (Hz).
pub const A4_FREQUENCY: f64 = 440.0;

/// MIDI number of A4.
pub const A4_MIDI: i32 = 69;

/// Cents per octave.
pub const CENTS_PER_OCTAVE: f64 = 1200.0;

/// Smallest diameter used as a ratio denominator in bore-diameter mappings.
pub const MIN_RATIO_DENOMINATOR: f64 = 1e-6;

/// Radius below which two bore radii are treated as equal (m).
pub const EQUAL_RADIUS_TOL: f64 = 1e-12;

/// Default evaluation budget for a single-component objective.
pub const DEFAULT_MAX_EVALUATIONS: usize = 10_000;

/// Relative threshold of the value convergence checker.
pub const CONVERGENCE_RELATIVE_TOL: f64 = 1e-5;

/// Absolute threshold of the value convergence checker.
pub const CONVERGENCE_ABSOLUTE_TOL: f64 = 1e-7;

/// Brent univariate optimizer tolerances (relative, absolute).
pub const BRENT_RELATIVE_TOL: f64 = 1e-5;
pub const BRENT_ABSOLUTE_TOL: f64 = 1e-5;

/// Powell optimizer tolerances (relative, absolute).
pub const POWELL_RELATIVE_TOL: f64 = 1e-5;
pub const POWELL_ABSOLUTE_TOL: f64 = 1e-6;

/// Stopping trust-region radius as a fraction of the initial radius.
pub const TRUST_REGION_STOP_FRACTION: f64 = 1e-8;

/// CMA-ES stop fitness as a fraction of the initial error norm.
pub const CMAES_STOP_FITNESS_FRACTION: f64 = 0.01;

/// Half-width of the resonance search window around a target (cents).
pub const DEFAULT_WINDOW_CENTS: f64 = 600.0;

/// Grid spacing of the resonance bracket scan (cents).
pub const DEFAULT_STEP_CENTS: f64 = 25.0;

/// Largest window-to-step ratio of a resonance scan, per side.
pub const MAX_RESONANCE_GRID_STEPS: f64 = 1e5;

/// Penalty reported when no resonance is found, cent-deviation evaluator (cents).
pub const DIVERGENCE_PENALTY_CENTS: f64 = 1200.0;

/// Penalty reported when no resonance is found, frequency-deviation evaluator.
pub const DIVERGENCE_PENALTY_RELATIVE: f64 = 1.0;
