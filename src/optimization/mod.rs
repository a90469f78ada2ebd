//! Geometry optimization against a target tuning.
//!
//! Objective components map a flat vector onto instrument geometry; the driver picks a
//! strategy (Brent, Powell, simplex, BOBYQA-style trust region or CMA-ES), runs it under
//! an evaluation budget, optionally from several start points, and writes the best point
//! back into the instrument.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use woodwind_designer::optimization::{build_objective, ObjectiveKind, OptimizationDriver};
//! use woodwind_designer::{
//!     Instrument, InstrumentCalculator, PhysicalParameters, Tuning, TuningEvaluator,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let instrument = Instrument::from_json(&std::fs::read_to_string("whistle.json")?)?;
//! let tuning = Tuning::from_json(&std::fs::read_to_string("whistle-tuning.json")?)?;
//! let calculator = InstrumentCalculator::new(Arc::new(PhysicalParameters::at_temperature(20.0)));
//!
//! let mut objective = build_objective(
//!     ObjectiveKind::HoleSize,
//!     instrument,
//!     tuning,
//!     calculator,
//!     TuningEvaluator::default(),
//!     None,
//! )?;
//!
//! let mut driver = OptimizationDriver::new();
//! if driver.optimize(&mut objective, None) {
//!     println!("{}", driver.outcome());
//!     println!("{}", objective.instrument().to_json()?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bobyqa;
pub mod bore_objectives;
pub mod budget;
pub mod cmaes;
pub mod constraint;
pub mod driver;
pub mod hole_objectives;
pub mod merged;
pub mod multistart;
pub mod objective;
pub mod powell;
pub mod sampling;
pub mod simplex;
pub mod types;
pub mod univariate;

// Re-export commonly used items
pub use bore_objectives::{BoreDiameterObjective, BoreLengthAdjustment, BoreLengthObjective};
pub use budget::BudgetedFunction;
pub use constraint::{Constraint, ConstraintType, Constraints};
pub use driver::{
    run_optimization, run_strategy, select_strategy, strategy_settings, OptimizationDriver,
};
pub use hole_objectives::{HolePositionObjective, HoleSizeObjective};
pub use merged::MergedObjective;
pub use multistart::{run_multi_start, start_points};
pub use objective::{
    build_objective, GeometryComponent, ObjectiveFunction, ObjectiveKind, ObjectiveSettings,
};
pub use sampling::{grid_subset, latin_hypercube_sample, random_sample};
pub use types::{
    CancelToken, MultiStartConfig, OptimizationOutcome, OptimizerResult, OptimizerType, RunState,
    StartSampling, StopReason, Strategy, StrategySettings, ValueChecker,
};
pub use univariate::{bracket_minimum, brent_find_root, brent_minimize, UnivariatePoint};
