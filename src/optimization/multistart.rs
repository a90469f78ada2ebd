//! Multi-start layer: repeat a multivariate strategy from several start points and keep the
//! best outcome.
//!
//! The first start is always the objective's current geometry. Every start runs on its own
//! clone of the objective, so restarts never share an instrument.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::debug;

use super::driver::run_strategy;
use super::objective::ObjectiveFunction;
use super::sampling::{grid_subset, latin_hypercube_sample, random_sample};
use super::types::{
    CancelToken, MultiStartConfig, OptimizerResult, RunState, StartSampling, Strategy,
};

/// Start points: the current geometry, then `starts - 1` samples over the bounds.
///
/// Dimensions outside `vary_dimensions` (when it is non-empty) keep their current value.
pub fn start_points(objective: &ObjectiveFunction, config: &MultiStartConfig) -> Vec<Vec<f64>> {
    let current = objective.initial_point();
    let lower = objective.lower_bounds();
    let upper = objective.upper_bounds();
    let varied: Vec<usize> = if config.vary_dimensions.is_empty() {
        (0..current.len()).collect()
    } else {
        config
            .vary_dimensions
            .iter()
            .copied()
            .filter(|&i| i < current.len())
            .collect()
    };

    let extra = config.starts.saturating_sub(1);
    let bounds: Vec<(f64, f64)> = varied.iter().map(|&i| (lower[i], upper[i])).collect();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let samples = match config.sampling {
        StartSampling::Random => random_sample(&bounds, extra, &mut rng),
        StartSampling::LatinHypercube => latin_hypercube_sample(&bounds, extra, &mut rng),
        StartSampling::Grid => grid_subset(&bounds, extra),
    };

    let mut points = Vec::with_capacity(config.starts.max(1));
    points.push(current.clone());
    for sample in samples {
        let mut point = current.clone();
        for (&dimension, value) in varied.iter().zip(sample) {
            point[dimension] = value;
        }
        points.push(point);
    }
    points
}

/// Run `strategy` from every start point with an equal share of `max_evaluations`.
///
/// Evaluation and tuning counts of all restarts are added to `objective`. Starts that fail
/// are dropped; the run fails only if every start fails or the token is cancelled.
pub fn run_multi_start(
    objective: &mut ObjectiveFunction,
    strategy: Strategy,
    max_evaluations: usize,
    cancel: &CancelToken,
) -> OptimizerResult {
    let starts = start_points(objective, objective.multi_start());
    let per_start = (max_evaluations / starts.len()).max(1);
    debug!(starts = starts.len(), per_start, "running multi-start");

    let template: &ObjectiveFunction = objective;
    let run = |start: &Vec<f64>| {
        let mut local = template.clone();
        local.reset_counts();
        let result = run_strategy(strategy, &mut local, start, per_start, cancel);
        (result, local.evaluations(), local.tunings())
    };

    #[cfg(feature = "parallel")]
    let results: Vec<(OptimizerResult, usize, usize)> = starts.par_iter().map(run).collect();

    #[cfg(not(feature = "parallel"))]
    let results: Vec<(OptimizerResult, usize, usize)> = starts.iter().map(run).collect();

    let mut evaluations = 0;
    let mut best: Option<OptimizerResult> = None;
    let mut any_converged = false;
    for (result, start_evaluations, tunings) in results {
        objective.add_counts(start_evaluations, tunings);
        evaluations += result.evaluations;
        if result.state == RunState::Failed {
            continue;
        }
        any_converged |= result.state == RunState::Converged;
        if best.as_ref().map_or(true, |b| result.value < b.value) {
            best = Some(result);
        }
    }

    match best {
        Some(best) if !cancel.is_cancelled() => OptimizerResult {
            evaluations,
            state: if any_converged {
                RunState::Converged
            } else {
                RunState::MaxEvaluationsReached
            },
            ..best
        },
        _ => OptimizerResult {
            point: objective.initial_point(),
            value: f64::INFINITY,
            evaluations,
            state: RunState::Failed,
            message: Some(if cancel.is_cancelled() {
                "optimization cancelled".to_string()
            } else {
                "every start failed".to_string()
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::acoustic_model::InstrumentCalculator;
    use crate::evaluator::TuningEvaluator;
    use crate::geometry::tests::whistle;
    use crate::optimization::objective::{build_objective, ObjectiveKind, ObjectiveSettings};
    use crate::physical_parameters::PhysicalParameters;
    use crate::tuning::{Fingering, Note, Tuning};

    fn objective(config: MultiStartConfig) -> ObjectiveFunction {
        let tuning = Tuning::new(
            "whistle",
            6,
            vec![Fingering::new(Note::from_frequency(570.0), vec![false; 6])],
        );
        build_objective(
            ObjectiveKind::HoleSize,
            whistle(),
            tuning,
            InstrumentCalculator::new(Arc::new(PhysicalParameters::at_temperature(20.0))),
            TuningEvaluator::default(),
            None,
        )
        .unwrap()
        .with_settings(ObjectiveSettings {
            multi_start: config,
            ..Default::default()
        })
    }

    #[test]
    fn first_start_is_current_geometry() {
        let config = MultiStartConfig::new(5).with_seed(3);
        let objective = objective(config.clone());
        let points = start_points(&objective, &config);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], objective.initial_point());
        let (lower, upper) = (objective.lower_bounds(), objective.upper_bounds());
        for point in &points[1..] {
            for (i, v) in point.iter().enumerate() {
                assert!(*v >= lower[i] && *v <= upper[i]);
            }
        }
    }

    #[test]
    fn only_selected_dimensions_vary() {
        let config = MultiStartConfig::new(4)
            .with_sampling(StartSampling::LatinHypercube)
            .with_vary_dimensions(vec![2]);
        let objective = objective(config.clone());
        let current = objective.initial_point();
        for point in start_points(&objective, &config) {
            for (i, (v, c)) in point.iter().zip(&current).enumerate() {
                if i != 2 {
                    assert_eq!(v, c);
                }
            }
        }
    }

    #[test]
    fn sampling_is_reproducible() {
        let config = MultiStartConfig::new(6).with_seed(11);
        let objective = objective(config.clone());
        assert_eq!(
            start_points(&objective, &config),
            start_points(&objective, &config)
        );
        let grid = config.with_sampling(StartSampling::Grid);
        assert_eq!(start_points(&objective, &grid).len(), 6);
    }

    #[test]
    fn never_worse_than_current_geometry() {
        let config = MultiStartConfig::new(3).with_seed(5);
        let mut objective = objective(config);
        let initial = objective.current_norm().unwrap();
        let before = objective.evaluations();
        let result = run_multi_start(&mut objective, Strategy::Simplex, 90, &CancelToken::new());
        assert!(result.state.is_success());
        assert!(result.value <= initial);
        assert!(objective.evaluations() > before);
        assert!(result.evaluations <= 90);
    }

    #[test]
    fn cancelled_run_fails() {
        let mut objective = objective(MultiStartConfig::new(2));
        let token = CancelToken::new();
        token.cancel();
        let result = run_multi_start(&mut objective, Strategy::Bobyqa, 50, &token);
        assert_eq!(result.state, RunState::Failed);
    }
}
