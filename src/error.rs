//! Error types for geometry validation, tuning evaluation and optimization.

use thiserror::Error;

/// Result type for design operations.
pub type DesignResult<T> = Result<T, DesignError>;

/// Invalid or degenerate instrument geometry.
///
/// A geometry error aborts the evaluation in progress; an optimization run that hits one
/// is reported as failed and the instrument is restored to its starting geometry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("instrument needs at least two bore points, found {0}")]
    TooFewBorePoints(usize),

    #[error("bore point {index} at {position} is not below the previous point at {previous}")]
    NonMonotonicBore {
        index: usize,
        position: f64,
        previous: f64,
    },

    #[error("bore diameter at position {position} must be positive, got {diameter}")]
    NonPositiveBoreDiameter { position: f64, diameter: f64 },

    #[error("hole {index} at {position} lies outside the bore [{start}, {end}]")]
    HoleOutsideBore {
        index: usize,
        position: f64,
        start: f64,
        end: f64,
    },

    #[error("hole {index} must have positive diameter and height (diameter {diameter}, height {height})")]
    InvalidHole {
        index: usize,
        diameter: f64,
        height: f64,
    },

    #[error("mouthpiece at {position} lies outside the bore [{start}, {end})")]
    MouthpieceOutsideBore { position: f64, start: f64, end: f64 },

    #[error("invalid mouthpiece: {0}")]
    InvalidMouthpiece(String),

    #[error("termination flange diameter must be positive, got {0}")]
    InvalidFlange(f64),

    #[error("geometry value is not finite: {0}")]
    NonFinite(String),
}

/// Errors raised by the acoustic model, the evaluators and the optimization layer.
#[derive(Error, Debug)]
pub enum DesignError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error("no resonance found near {target:.2} Hz for note {note}")]
    EvaluationDivergence { note: String, target: f64 },

    #[error("optimizer failure: {0}")]
    OptimizerFailure(String),

    #[error("expected a point with {expected} dimensions, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("fingering for {note} has {found} holes, instrument has {expected}")]
    FingeringMismatch {
        note: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid constraints: {0}")]
    InvalidConstraints(String),

    #[error("invalid resonance search: {0}")]
    InvalidResonanceSearch(String),

    #[error("unknown note: {0}")]
    UnknownNote(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl From<serde_json::Error> for DesignError {
    fn from(err: serde_json::Error) -> Self {
        DesignError::Json(err.to_string())
    }
}
