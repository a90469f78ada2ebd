//! Woodwind acoustics and tuning optimization.
//!
//! An instrument (bore profile, tone holes, mouthpiece, termination) is modelled as a chain
//! of 2×2 complex transfer matrices. The model predicts the playing frequency of each
//! fingering in a tuning; objective functions turn geometry vectors into tuning errors, and
//! the optimization driver adjusts the geometry to reduce them.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use woodwind_designer::{
//!     BorePoint, Fingering, Instrument, InstrumentCalculator, Mouthpiece, MouthpieceKind,
//!     Note, PhysicalParameters, Termination, Tuning, TuningEvaluator,
//! };
//! use woodwind_designer::geometry::EmbouchureHole;
//!
//! let instrument = Instrument::new(
//!     "tube",
//!     Mouthpiece {
//!         position: 0.0,
//!         beta: None,
//!         kind: MouthpieceKind::EmbouchureHole(EmbouchureHole {
//!             inner_diameter: 0.01,
//!             outer_diameter: 0.011,
//!             height: 0.004,
//!         }),
//!     },
//!     vec![BorePoint::new(0.0, 0.019), BorePoint::new(0.6, 0.019)],
//!     vec![],
//!     Termination { flange_diameter: 0.025 },
//! );
//! let tuning = Tuning::new(
//!     "tube",
//!     0,
//!     vec![Fingering::new(Note::from_frequency(280.0), vec![])],
//! );
//!
//! let calculator = InstrumentCalculator::new(Arc::new(PhysicalParameters::at_temperature(20.0)));
//! let model = calculator.prepare(&instrument).unwrap();
//! let notes = TuningEvaluator::default().evaluate(&model, &tuning).unwrap();
//! println!("predicted {:?} Hz", notes[0].predicted_frequency);
//! ```

pub mod acoustic_model;
pub mod bore_section;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod geometry;
pub mod hole;
pub mod mouthpiece;
pub mod optimization;
pub mod physical_parameters;
pub mod termination;
pub mod transfer_matrix;
pub mod tuning;
pub mod types;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use acoustic_model::{AcousticModel, Component, InstrumentCalculator};
pub use bore_section::{cone_matrix, cylinder_matrix};
pub use config::StudyConfig;
pub use error::{DesignError, DesignResult, GeometryError};
pub use evaluator::{EvaluatorKind, NoteEvaluation, ResonanceFinder, TuningEvaluator};
pub use geometry::{
    BorePoint, BoreSection, Hole, Instrument, LengthType, Mouthpiece, MouthpieceKind, Termination,
};
pub use hole::tone_hole_matrix;
pub use optimization::{
    build_objective, run_optimization, select_strategy, CancelToken, ObjectiveFunction,
    ObjectiveKind, OptimizationDriver, OptimizationOutcome, OptimizerType, RunState, Strategy,
};
pub use physical_parameters::{AmbientConditions, PhysicalParameters};
pub use termination::{radiation_impedance, TerminationModel};
pub use transfer_matrix::{StateVector, TransferMatrix};
pub use tuning::{note_name_to_frequency, Fingering, Note, Tuning};
