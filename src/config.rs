//! Study configuration: air conditions, models, objective and optimizer choices in one
//! serde document.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::acoustic_model::InstrumentCalculator;
use crate::error::DesignResult;
use crate::evaluator::{EvaluatorKind, NoteEvaluation, TuningEvaluator};
use crate::geometry::Instrument;
use crate::optimization::bore_objectives::BoreLengthAdjustment;
use crate::optimization::constraint::Constraints;
use crate::optimization::driver::OptimizationDriver;
use crate::optimization::objective::{
    build_objective, ObjectiveFunction, ObjectiveKind, ObjectiveSettings,
};
use crate::optimization::types::{
    CancelToken, MultiStartConfig, OptimizationOutcome, OptimizerType, StartSampling,
};
use crate::physical_parameters::{AmbientConditions, PhysicalParameters};
use crate::termination::TerminationModel;
use crate::tuning::Tuning;

/// Everything needed to evaluate or optimize an instrument against a tuning.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StudyConfig {
    pub conditions: AmbientConditions,
    /// Fixed speed of sound (m/s) instead of the one derived from `conditions`.
    pub speed_of_sound: Option<f64>,
    pub termination: TerminationModel,
    pub evaluator: TuningEvaluator,
    pub objective: ObjectiveKind,
    pub preferred_optimizer: Option<OptimizerType>,
    /// Evaluation budget; the objective's own budget when absent.
    pub max_evaluations: Option<usize>,
    pub multi_start: MultiStartConfig,
    /// Replaces the objective's default constraints.
    pub constraints: Option<Constraints>,
}

impl StudyConfig {
    pub fn new(objective: ObjectiveKind) -> Self {
        Self {
            objective,
            ..Default::default()
        }
    }

    /// Hole positions and sizes against cent deviations, bell preserved.
    pub fn hole_study() -> Self {
        Self::new(ObjectiveKind::Hole {
            adjustment: BoreLengthAdjustment::PreserveBell,
        })
    }

    /// Holes and bore profile together, restarted from a Latin hypercube of start points.
    pub fn bore_profile_study(starts: usize, seed: u64) -> Self {
        Self::new(ObjectiveKind::HoleAndBoreDiameter {
            adjustment: BoreLengthAdjustment::PreserveTaper,
            unchanged_bore_points: 1,
        })
        .with_multi_start(
            MultiStartConfig::new(starts)
                .with_sampling(StartSampling::LatinHypercube)
                .with_seed(seed),
        )
    }

    pub fn from_json(json: &str) -> DesignResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that cannot drive an evaluation.
    pub fn validate(&self) -> DesignResult<()> {
        self.evaluator.finder.validate()
    }

    pub fn to_json(&self) -> DesignResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_conditions(mut self, conditions: AmbientConditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_speed_of_sound(mut self, speed_of_sound: f64) -> Self {
        self.speed_of_sound = Some(speed_of_sound);
        self
    }

    pub fn with_termination(mut self, termination: TerminationModel) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_evaluator_kind(mut self, kind: EvaluatorKind) -> Self {
        self.evaluator.kind = kind;
        self
    }

    pub fn with_optimizer(mut self, optimizer: OptimizerType) -> Self {
        self.preferred_optimizer = Some(optimizer);
        self
    }

    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = Some(max_evaluations);
        self
    }

    pub fn with_multi_start(mut self, multi_start: MultiStartConfig) -> Self {
        self.multi_start = multi_start;
        self
    }

    pub fn with_constraints(mut self, constraints: Constraints) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn params(&self) -> PhysicalParameters {
        let params = PhysicalParameters::new(self.conditions);
        match self.speed_of_sound {
            Some(c) => params.with_speed_of_sound(c),
            None => params,
        }
    }

    pub fn calculator(&self) -> InstrumentCalculator {
        InstrumentCalculator::new(Arc::new(self.params()))
            .with_termination_model(self.termination)
    }

    /// Objective with this study's budget, multi-start settings and constraint overrides.
    pub fn build_objective(
        &self,
        instrument: Instrument,
        tuning: Tuning,
    ) -> DesignResult<ObjectiveFunction> {
        self.validate()?;
        let objective = build_objective(
            self.objective,
            instrument,
            tuning,
            self.calculator(),
            self.evaluator,
            self.constraints.as_ref(),
        )?;
        Ok(objective.with_settings(ObjectiveSettings {
            max_evaluations: self.max_evaluations,
            multi_start: self.multi_start.clone(),
            ..Default::default()
        }))
    }

    /// Per-note predictions for an instrument as it stands.
    pub fn calculate_tuning(
        &self,
        instrument: &Instrument,
        tuning: &Tuning,
    ) -> DesignResult<Vec<NoteEvaluation>> {
        self.validate()?;
        let mut instrument = instrument.clone();
        instrument.convert_to_metres();
        instrument.update_components();
        let model = self.calculator().prepare(&instrument)?;
        self.evaluator.evaluate(&model, tuning)
    }

    /// Optimize and return the resulting instrument with the run's outcome.
    pub fn optimize(
        &self,
        instrument: Instrument,
        tuning: Tuning,
        cancel: Option<CancelToken>,
    ) -> DesignResult<(Instrument, OptimizationOutcome)> {
        let mut objective = self.build_objective(instrument, tuning)?;
        let mut driver = OptimizationDriver::new();
        if let Some(token) = cancel {
            driver = driver.with_cancel_token(token);
        }
        driver.optimize(&mut objective, self.preferred_optimizer);
        Ok((objective.into_instrument(), driver.into_outcome()))
    }
}
