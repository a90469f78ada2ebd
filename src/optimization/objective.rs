//! Objective functions: map a geometry vector onto an instrument and score its tuning.
//!
//! A [`GeometryComponent`] knows how one family of dimensions (bore diameters, hole
//! positions, ...) is read from and written to an [`Instrument`], and what default bounds
//! apply. An [`ObjectiveFunction`] owns the instrument, the tuning and the evaluation
//! machinery, and exposes the vector-valued error and its squared norm to the optimizers.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::acoustic_model::InstrumentCalculator;
use crate::error::{DesignError, DesignResult};
use crate::evaluator::{NoteEvaluation, TuningEvaluator};
use crate::geometry::Instrument;
use crate::tuning::Tuning;
use crate::types::DEFAULT_MAX_EVALUATIONS;

use super::bore_objectives::{BoreDiameterObjective, BoreLengthAdjustment, BoreLengthObjective};
use super::constraint::Constraints;
use super::hole_objectives::{HolePositionObjective, HoleSizeObjective};
use super::merged::MergedObjective;
use super::types::{MultiStartConfig, OptimizerType};

/// One family of geometry dimensions.
pub trait GeometryComponent: Send + Sync + fmt::Debug {
    /// Stable identifier, used as the constraint set's objective name.
    fn name(&self) -> &str;

    fn display_name(&self) -> &str;

    fn nr_dimensions(&self) -> usize;

    /// Read the current geometry into a vector.
    fn geometry_point(&self, instrument: &Instrument) -> Vec<f64>;

    /// Write a vector into the geometry. `point.len()` equals `nr_dimensions()`.
    fn set_geometry_point(&self, instrument: &mut Instrument, point: &[f64]);

    /// Bounds around the current geometry.
    fn default_constraints(&self, instrument: &Instrument) -> Constraints;

    fn optimizer_type(&self) -> OptimizerType;

    fn max_evaluations(&self) -> usize {
        DEFAULT_MAX_EVALUATIONS
    }
}

/// Objective selection for [`build_objective`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ObjectiveKind {
    BoreDiameter {
        #[serde(default = "default_unchanged_bore_points")]
        unchanged_bore_points: usize,
    },
    BoreLength {
        #[serde(default)]
        adjustment: BoreLengthAdjustment,
    },
    HolePosition {
        #[serde(default)]
        adjustment: BoreLengthAdjustment,
    },
    HoleSize,
    /// Hole position and hole size.
    Hole {
        #[serde(default)]
        adjustment: BoreLengthAdjustment,
    },
    /// Hole position, hole size and bore diameter.
    HoleAndBoreDiameter {
        #[serde(default)]
        adjustment: BoreLengthAdjustment,
        #[serde(default = "default_unchanged_bore_points")]
        unchanged_bore_points: usize,
    },
}

fn default_unchanged_bore_points() -> usize {
    1
}

impl Default for ObjectiveKind {
    fn default() -> Self {
        ObjectiveKind::Hole {
            adjustment: BoreLengthAdjustment::default(),
        }
    }
}

impl ObjectiveKind {
    /// Build the geometry component for an instrument.
    pub fn component(&self, instrument: &Instrument) -> Arc<dyn GeometryComponent> {
        match *self {
            ObjectiveKind::BoreDiameter {
                unchanged_bore_points,
            } => Arc::new(BoreDiameterObjective::new(instrument, unchanged_bore_points)),
            ObjectiveKind::BoreLength { adjustment } => Arc::new(BoreLengthObjective::new(adjustment)),
            ObjectiveKind::HolePosition { adjustment } => {
                Arc::new(HolePositionObjective::new(instrument, adjustment))
            }
            ObjectiveKind::HoleSize => Arc::new(HoleSizeObjective::new(instrument)),
            ObjectiveKind::Hole { adjustment } => {
                Arc::new(MergedObjective::hole(instrument, adjustment))
            }
            ObjectiveKind::HoleAndBoreDiameter {
                adjustment,
                unchanged_bore_points,
            } => Arc::new(MergedObjective::hole_and_bore_diameter(
                instrument,
                adjustment,
                unchanged_bore_points,
            )),
        }
    }
}

/// Optional overrides of the optimizer hints an objective derives from its bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveSettings {
    pub max_evaluations: Option<usize>,
    pub nr_interpolations: Option<usize>,
    pub initial_trust_region_radius: Option<f64>,
    pub simplex_step_size: Option<Vec<f64>>,
    pub std_dev: Option<Vec<f64>>,
    pub multi_start: MultiStartConfig,
}

/// Tuning error as a function of a geometry vector.
#[derive(Debug, Clone)]
pub struct ObjectiveFunction {
    instrument: Instrument,
    tuning: Tuning,
    calculator: InstrumentCalculator,
    evaluator: TuningEvaluator,
    component: Arc<dyn GeometryComponent>,
    constraints: Constraints,
    settings: ObjectiveSettings,
    evaluations: usize,
    tunings: usize,
}

impl ObjectiveFunction {
    /// Take ownership of an instrument (converted to metres) and set default constraints.
    pub fn new(
        mut instrument: Instrument,
        tuning: Tuning,
        calculator: InstrumentCalculator,
        evaluator: TuningEvaluator,
        component: Arc<dyn GeometryComponent>,
    ) -> DesignResult<Self> {
        instrument.convert_to_metres();
        instrument.update_components();
        instrument.validate()?;
        check_tuning(&instrument, &tuning)?;

        let constraints = component.default_constraints(&instrument);
        constraints.validate(component.nr_dimensions())?;

        Ok(Self {
            instrument,
            tuning,
            calculator,
            evaluator,
            component,
            constraints,
            settings: ObjectiveSettings::default(),
            evaluations: 0,
            tunings: 0,
        })
    }

    pub fn with_settings(mut self, settings: ObjectiveSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ObjectiveSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ObjectiveSettings {
        &mut self.settings
    }

    pub fn name(&self) -> &str {
        self.component.name()
    }

    pub fn display_name(&self) -> &str {
        self.component.display_name()
    }

    pub fn component(&self) -> &Arc<dyn GeometryComponent> {
        &self.component
    }

    pub fn nr_dimensions(&self) -> usize {
        self.component.nr_dimensions()
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn into_instrument(self) -> Instrument {
        self.instrument
    }

    /// Replace the instrument wholesale (used to restore a saved geometry).
    pub fn restore_instrument(&mut self, instrument: Instrument) {
        self.instrument = instrument;
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn calculator(&self) -> &InstrumentCalculator {
        &self.calculator
    }

    pub fn evaluator(&self) -> &TuningEvaluator {
        &self.evaluator
    }

    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    /// Replace the constraint set after converting it to metres and checking dimension count
    /// and bound order.
    pub fn set_constraints(&mut self, mut constraints: Constraints) -> DesignResult<()> {
        constraints.convert_to_metres();
        constraints.validate(self.nr_dimensions())?;
        self.constraints = constraints;
        Ok(())
    }

    pub fn initial_point(&self) -> Vec<f64> {
        self.component.geometry_point(&self.instrument)
    }

    pub fn set_geometry_point(&mut self, point: &[f64]) -> DesignResult<()> {
        self.check_dimensions(point)?;
        self.component.set_geometry_point(&mut self.instrument, point);
        self.instrument.update_components();
        Ok(())
    }

    /// Apply `point` and return the weighted per-note errors.
    ///
    /// The geometry change stays on success. On error the instrument is left as it was.
    pub fn error_vector(&mut self, point: &[f64]) -> DesignResult<Vec<f64>> {
        self.check_dimensions(point)?;
        let saved = self.instrument.clone();
        self.set_geometry_point(point)?;
        match self.current_error_vector() {
            Ok(errors) => Ok(errors),
            Err(err) => {
                self.instrument = saved;
                Err(err)
            }
        }
    }

    fn current_error_vector(&mut self) -> DesignResult<Vec<f64>> {
        let model = self.calculator.prepare(&self.instrument)?;
        self.tunings += 1;
        self.evaluator.error_vector(&model, &self.tuning)
    }

    /// Squared norm of the error vector at `point`.
    pub fn value(&mut self, point: &[f64]) -> DesignResult<f64> {
        self.evaluations += 1;
        let errors = self.error_vector(point)?;
        Ok(Self::calc_norm(&errors))
    }

    /// Σ v².
    pub fn calc_norm(errors: &[f64]) -> f64 {
        errors.iter().map(|e| e * e).sum()
    }

    /// Per-note diagnostics for the current geometry.
    pub fn evaluate_tuning(&self) -> DesignResult<Vec<NoteEvaluation>> {
        let model = self.calculator.prepare(&self.instrument)?;
        self.evaluator.evaluate(&model, &self.tuning)
    }

    /// Norm of the instrument as it stands. Neither the geometry nor the counters change.
    pub fn current_norm(&self) -> DesignResult<f64> {
        let model = self.calculator.prepare(&self.instrument)?;
        let errors = self.evaluator.error_vector(&model, &self.tuning)?;
        Ok(Self::calc_norm(&errors))
    }

    pub fn lower_bounds(&self) -> Vec<f64> {
        self.constraints.lower_bounds()
    }

    pub fn upper_bounds(&self) -> Vec<f64> {
        self.constraints.upper_bounds()
    }

    fn ranges(&self) -> Vec<f64> {
        self.constraints.iter().map(|c| c.range()).collect()
    }

    pub fn optimizer_type(&self) -> OptimizerType {
        self.component.optimizer_type()
    }

    pub fn is_multi_start(&self) -> bool {
        self.settings.multi_start.is_multi_start()
    }

    pub fn multi_start(&self) -> &MultiStartConfig {
        &self.settings.multi_start
    }

    /// Interpolation points for the trust-region model: 2n + 1 by default.
    pub fn nr_interpolations(&self) -> usize {
        self.settings
            .nr_interpolations
            .unwrap_or(2 * self.nr_dimensions() + 1)
    }

    /// A quarter of the smallest non-empty bound range.
    pub fn initial_trust_region_radius(&self) -> f64 {
        if let Some(radius) = self.settings.initial_trust_region_radius {
            return radius;
        }
        let smallest = self
            .ranges()
            .into_iter()
            .filter(|r| *r > 0.0)
            .fold(f64::INFINITY, f64::min);
        if smallest.is_finite() {
            0.25 * smallest
        } else {
            1e-3
        }
    }

    /// One fifth of each bound range.
    pub fn simplex_step_size(&self) -> Vec<f64> {
        self.settings
            .simplex_step_size
            .clone()
            .unwrap_or_else(|| self.ranges().iter().map(|r| 0.2 * r).collect())
    }

    /// One fifth of each bound range.
    pub fn std_dev(&self) -> Vec<f64> {
        self.settings
            .std_dev
            .clone()
            .unwrap_or_else(|| self.ranges().iter().map(|r| 0.2 * r).collect())
    }

    pub fn max_evaluations(&self) -> usize {
        self.settings
            .max_evaluations
            .unwrap_or_else(|| self.component.max_evaluations())
    }

    pub fn set_max_evaluations(&mut self, max_evaluations: usize) {
        self.settings.max_evaluations = Some(max_evaluations);
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn tunings(&self) -> usize {
        self.tunings
    }

    /// Fold counters from a clone that ran elsewhere.
    pub fn add_counts(&mut self, evaluations: usize, tunings: usize) {
        self.evaluations += evaluations;
        self.tunings += tunings;
    }

    pub fn reset_counts(&mut self) {
        self.evaluations = 0;
        self.tunings = 0;
    }

    /// Value for an optimizer: `None` aborts the run.
    pub(crate) fn value_or_abort(&mut self, point: &[f64]) -> Option<f64> {
        match self.value(point) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(error = %err, "objective evaluation failed");
                None
            }
        }
    }

    fn check_dimensions(&self, point: &[f64]) -> DesignResult<()> {
        if point.len() != self.nr_dimensions() {
            return Err(DesignError::DimensionMismatch {
                expected: self.nr_dimensions(),
                found: point.len(),
            });
        }
        Ok(())
    }
}

fn check_tuning(instrument: &Instrument, tuning: &Tuning) -> DesignResult<()> {
    let expected = instrument.holes.len();
    for fingering in &tuning.fingerings {
        if fingering.open_holes.len() != expected {
            return Err(DesignError::FingeringMismatch {
                note: fingering.note.label(),
                expected,
                found: fingering.open_holes.len(),
            });
        }
    }
    Ok(())
}

/// Build an objective of the given kind, with optional constraint overrides.
pub fn build_objective(
    kind: ObjectiveKind,
    mut instrument: Instrument,
    tuning: Tuning,
    calculator: InstrumentCalculator,
    evaluator: TuningEvaluator,
    overrides: Option<&Constraints>,
) -> DesignResult<ObjectiveFunction> {
    instrument.convert_to_metres();
    instrument.update_components();
    let component = kind.component(&instrument);
    let mut objective = ObjectiveFunction::new(instrument, tuning, calculator, evaluator, component)?;
    if let Some(constraints) = overrides {
        objective.set_constraints(constraints.clone())?;
    }
    Ok(objective)
}

/// Bounds `[factor_lo·v, factor_hi·v]` widened to contain `v`, for positive quantities.
pub(crate) fn relative_bounds(value: f64, factor_lo: f64, factor_hi: f64) -> (f64, f64) {
    let lower = (factor_lo * value).min(value);
    let upper = (factor_hi * value).max(value);
    (lower, upper)
}
