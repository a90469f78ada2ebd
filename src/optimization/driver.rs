//! Optimization driver: strategy selection, strategy dispatch and run bookkeeping.

use tracing::{debug, info, warn};

use crate::types::{BRENT_ABSOLUTE_TOL, BRENT_RELATIVE_TOL};

use super::budget::BudgetedFunction;
use super::multistart::run_multi_start;
use super::objective::ObjectiveFunction;
use super::types::{
    CancelToken, OptimizationOutcome, OptimizerResult, OptimizerType, RunState, StopReason,
    Strategy, StrategySettings,
};
use super::univariate::brent_minimize;
use super::{bobyqa, cmaes, powell, simplex};

/// Choose the strategy for an objective.
///
/// A univariate (Brent) objective always gets Brent. Otherwise a preference overrides the
/// objective's own type, except that Brent cannot be preferred for several dimensions.
/// BOBYQA needs at least two dimensions; a one-dimensional BOBYQA request runs CMA-ES.
pub fn select_strategy(
    objective_type: OptimizerType,
    nr_dimensions: usize,
    preferred: Option<OptimizerType>,
) -> Strategy {
    if objective_type == OptimizerType::Brent && nr_dimensions <= 1 {
        return Strategy::Brent;
    }

    let fallback = match objective_type {
        OptimizerType::Brent => OptimizerType::Bobyqa,
        other => other,
    };
    let chosen = match preferred {
        Some(OptimizerType::Brent) if nr_dimensions > 1 => fallback,
        Some(preference) => preference,
        None => fallback,
    };

    match chosen {
        OptimizerType::Bobyqa if nr_dimensions < 2 => Strategy::CmaEs,
        other => other.into(),
    }
}

/// Settings for one strategy run, drawn from the objective's hints.
pub fn strategy_settings(objective: &ObjectiveFunction, max_evaluations: usize) -> StrategySettings {
    StrategySettings {
        lower_bounds: objective.lower_bounds(),
        upper_bounds: objective.upper_bounds(),
        max_evaluations,
        step_sizes: objective.simplex_step_size(),
        std_dev: objective.std_dev(),
        nr_interpolations: objective.nr_interpolations(),
        initial_trust_region_radius: objective.initial_trust_region_radius(),
        seed: objective.multi_start().seed,
    }
}

/// Run one strategy from `start` on `objective` with a hard evaluation cap.
///
/// The start is evaluated first, so the reported best point is never worse than it. The
/// objective's geometry is left at whatever point was evaluated last.
pub fn run_strategy(
    strategy: Strategy,
    objective: &mut ObjectiveFunction,
    start: &[f64],
    max_evaluations: usize,
    cancel: &CancelToken,
) -> OptimizerResult {
    let settings = strategy_settings(objective, max_evaluations);
    let mut f = BudgetedFunction::new(|x: &[f64]| objective.value_or_abort(x), max_evaluations)
        .with_cancel_token(cancel.clone());

    let outcome = f.evaluate(start).and_then(|start_value| {
        if start.is_empty() {
            return Ok(());
        }
        match strategy {
            Strategy::Brent => brent(&mut f, start, start_value, &settings),
            Strategy::Powell => powell::minimize(&mut f, start, start_value, &settings),
            Strategy::Simplex => simplex::minimize(&mut f, start, start_value, &settings),
            Strategy::Bobyqa => bobyqa::minimize(&mut f, start, start_value, &settings),
            Strategy::CmaEs => cmaes::minimize(&mut f, start, start_value, &settings),
        }
    });

    let (state, message) = match outcome {
        Ok(()) => (RunState::Converged, None),
        Err(StopReason::MaxEvaluations) => (RunState::MaxEvaluationsReached, None),
        Err(StopReason::Cancelled) => (
            RunState::Failed,
            Some("optimization cancelled".to_string()),
        ),
        Err(StopReason::Aborted(message)) => (RunState::Failed, Some(message)),
    };

    OptimizerResult {
        point: f
            .best_point()
            .map(<[f64]>::to_vec)
            .unwrap_or_else(|| start.to_vec()),
        value: f.best_value(),
        evaluations: f.evaluations(),
        state,
        message,
    }
}

/// Bounded Brent search on the single dimension.
fn brent<F>(
    f: &mut BudgetedFunction<F>,
    start: &[f64],
    start_value: f64,
    settings: &StrategySettings,
) -> Result<(), StopReason>
where
    F: FnMut(&[f64]) -> Option<f64>,
{
    let x0 = start[0];
    brent_minimize(
        |x: f64| {
            if x == x0 {
                Ok(start_value)
            } else {
                f.evaluate(&[x])
            }
        },
        settings.lower_bounds[0],
        settings.upper_bounds[0],
        Some(x0),
        BRENT_RELATIVE_TOL,
        BRENT_ABSOLUTE_TOL,
    )
    .map(|_| ())
}

/// Runs objectives and keeps the outcome of the last run.
#[derive(Debug, Clone, Default)]
pub struct OptimizationDriver {
    cancel: CancelToken,
    outcome: OptimizationOutcome,
}

impl OptimizationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the current run before its next evaluation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn outcome(&self) -> &OptimizationOutcome {
        &self.outcome
    }

    pub fn into_outcome(self) -> OptimizationOutcome {
        self.outcome
    }

    /// Optimize `objective` in place; returns whether the run succeeded.
    ///
    /// On success the best point is applied to the objective's instrument. On failure the
    /// instrument is restored to the geometry it had on entry.
    pub fn optimize(
        &mut self,
        objective: &mut ObjectiveFunction,
        preferred: Option<OptimizerType>,
    ) -> bool {
        let original = objective.instrument().clone();
        let evaluations_before = objective.evaluations();
        let tunings_before = objective.tunings();
        let n = objective.nr_dimensions();
        let strategy = select_strategy(objective.optimizer_type(), n, preferred);

        self.outcome = OptimizationOutcome {
            state: RunState::Initialized,
            strategy: Some(strategy),
            ..Default::default()
        };

        let start = objective.initial_point();
        let initial_norm = match objective.value(&start) {
            Ok(value) => value,
            Err(err) => {
                warn!(error = %err, "initial geometry could not be evaluated");
                objective.restore_instrument(original);
                self.outcome.state = RunState::Failed;
                self.outcome.message = Some(err.to_string());
                return false;
            }
        };
        self.outcome.initial_norm = initial_norm;
        self.outcome.state = RunState::Evaluating;

        let max_evaluations = objective.max_evaluations();
        info!(
            objective = objective.name(),
            strategy = %strategy,
            dimensions = n,
            max_evaluations,
            initial_norm,
            "starting optimization"
        );

        let result = if objective.is_multi_start() && !strategy.is_univariate() {
            run_multi_start(objective, strategy, max_evaluations, &self.cancel)
        } else {
            run_strategy(strategy, objective, &start, max_evaluations, &self.cancel)
        };
        debug!(evaluations = result.evaluations, state = ?result.state, "strategy finished");

        let counts_before = (evaluations_before, tunings_before);
        if result.state == RunState::Failed {
            warn!(message = ?result.message, "optimization failed, geometry restored");
            objective.restore_instrument(original);
            self.finish(objective, counts_before, start, initial_norm, result.message);
            self.outcome.state = RunState::Failed;
            return false;
        }

        // A multi-start whose first start failed may report a point worse than the start
        let (point, final_norm) = if result.value <= initial_norm {
            (result.point, result.value)
        } else {
            (start, initial_norm)
        };
        if let Err(err) = objective.set_geometry_point(&point) {
            warn!(error = %err, "best point could not be applied, geometry restored");
            objective.restore_instrument(original);
            self.finish(objective, counts_before, point, initial_norm, Some(err.to_string()));
            self.outcome.state = RunState::Failed;
            return false;
        }

        self.finish(objective, counts_before, point, final_norm, result.message);
        self.outcome.state = result.state;
        info!(
            state = ?self.outcome.state,
            initial_norm,
            final_norm,
            residual_percent = self.outcome.residual_percent(),
            evaluations = self.outcome.evaluations,
            tunings = self.outcome.tunings,
            "optimization finished"
        );
        true
    }

    fn finish(
        &mut self,
        objective: &ObjectiveFunction,
        (evaluations_before, tunings_before): (usize, usize),
        point: Vec<f64>,
        final_norm: f64,
        message: Option<String>,
    ) {
        self.outcome.point = point;
        self.outcome.final_norm = final_norm;
        self.outcome.message = message;
        self.outcome.evaluations = objective.evaluations() - evaluations_before;
        self.outcome.tunings = objective.tunings() - tunings_before;
    }
}

/// Optimize with a fresh driver and return its outcome.
pub fn run_optimization(
    objective: &mut ObjectiveFunction,
    preferred: Option<OptimizerType>,
) -> OptimizationOutcome {
    let mut driver = OptimizationDriver::new();
    driver.optimize(objective, preferred);
    driver.into_outcome()
}
