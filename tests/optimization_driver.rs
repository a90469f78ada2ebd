mod common;

use std::sync::Arc;

use woodwind_designer::optimization::{
    Constraint, ConstraintType, Constraints, GeometryComponent, MultiStartConfig,
    ObjectiveSettings,
};
use woodwind_designer::{
    build_objective, run_optimization, CancelToken, Instrument, ObjectiveFunction, ObjectiveKind,
    OptimizationDriver, OptimizerType, RunState, Strategy, StudyConfig, TuningEvaluator,
};

use common::{calculator, whistle, whistle_tuning};

fn objective(kind: ObjectiveKind) -> ObjectiveFunction {
    build_objective(
        kind,
        whistle(),
        whistle_tuning(),
        calculator(),
        TuningEvaluator::default(),
        None,
    )
    .unwrap()
}

fn bore_diameter() -> ObjectiveFunction {
    objective(ObjectiveKind::BoreDiameter {
        unchanged_bore_points: 1,
    })
}

#[test]
fn one_dimensional_objective_runs_brent() {
    for preferred in [None, Some(OptimizerType::Bobyqa), Some(OptimizerType::CmaEs)] {
        let mut objective = bore_diameter();
        assert_eq!(objective.nr_dimensions(), 1);
        objective.set_max_evaluations(60);

        let outcome = run_optimization(&mut objective, preferred);
        assert_eq!(outcome.strategy, Some(Strategy::Brent));
        assert!(outcome.success(), "{}", outcome);
        assert!(outcome.final_norm <= outcome.initial_norm);

        let (lower, upper) = (objective.lower_bounds(), objective.upper_bounds());
        let diameter = objective.instrument().bore_points[2].diameter;
        assert!(diameter >= lower[0] && diameter <= upper[0]);
    }
}

#[test]
fn single_evaluation_budget_stops_at_start() {
    let mut objective = objective(ObjectiveKind::HoleSize);
    objective.set_max_evaluations(1);
    let start = objective.initial_point();

    let outcome = run_optimization(&mut objective, None);
    assert_eq!(outcome.strategy, Some(Strategy::Bobyqa));
    assert_eq!(outcome.state, RunState::MaxEvaluationsReached);
    assert!(outcome.final_norm <= outcome.initial_norm);
    assert_eq!(outcome.point, start);
    assert!(outcome.evaluations <= 2);
}

#[test]
fn hole_size_optimization_improves_tuning() {
    let mut objective = objective(ObjectiveKind::HoleSize);
    objective.set_max_evaluations(300);

    let mut driver = OptimizationDriver::new();
    assert!(driver.optimize(&mut objective, None));
    let outcome = driver.outcome();
    assert!(
        outcome.final_norm < outcome.initial_norm,
        "{} !< {}",
        outcome.final_norm,
        outcome.initial_norm
    );
    assert!(outcome.residual_percent() < 100.0);
    assert!(outcome.evaluations <= 301);
    assert!(outcome.tunings >= outcome.evaluations);

    // The best point is left applied to the instrument
    assert_eq!(objective.initial_point(), outcome.point);
    let norm = objective.current_norm().unwrap();
    assert!((norm - outcome.final_norm).abs() <= 1e-9 * outcome.final_norm.max(1.0));
}

#[test]
fn bounded_strategies_stay_within_bounds() {
    for preferred in [
        OptimizerType::Simplex,
        OptimizerType::Bobyqa,
        OptimizerType::CmaEs,
    ] {
        let mut objective = objective(ObjectiveKind::HoleSize);
        objective.set_max_evaluations(120);
        let outcome = run_optimization(&mut objective, Some(preferred));
        assert!(outcome.success(), "{:?}: {}", preferred, outcome);
        assert!(outcome.final_norm <= outcome.initial_norm, "{:?}", preferred);
        let (lower, upper) = (objective.lower_bounds(), objective.upper_bounds());
        for (i, v) in outcome.point.iter().enumerate() {
            assert!(*v >= lower[i] && *v <= upper[i], "{:?} dim {}", preferred, i);
        }
    }
}

#[test]
fn multi_start_is_never_worse() {
    let mut objective = objective(ObjectiveKind::HoleSize).with_settings(ObjectiveSettings {
        max_evaluations: Some(150),
        multi_start: MultiStartConfig::new(3).with_seed(7),
        ..Default::default()
    });
    assert!(objective.is_multi_start());

    let outcome = run_optimization(&mut objective, Some(OptimizerType::Simplex));
    assert!(outcome.success(), "{}", outcome);
    assert!(outcome.final_norm <= outcome.initial_norm);
    assert!(outcome.evaluations > 3);
    assert_eq!(objective.initial_point(), outcome.point);
}

#[test]
fn cancelled_run_restores_instrument() {
    let mut objective = objective(ObjectiveKind::HoleSize);
    let original = objective.instrument().clone();
    let token = CancelToken::new();
    token.cancel();

    let mut driver = OptimizationDriver::new().with_cancel_token(token);
    assert!(!driver.optimize(&mut objective, None));
    assert_eq!(driver.outcome().state, RunState::Failed);
    assert!(driver.outcome().message.is_some());
    assert_eq!(objective.instrument(), &original);
}

/// Writes the top bore diameter directly, with bounds that only admit invalid geometry.
#[derive(Debug)]
struct NegativeTopDiameter;

impl GeometryComponent for NegativeTopDiameter {
    fn name(&self) -> &str {
        "NegativeTopDiameter"
    }

    fn display_name(&self) -> &str {
        "Negative top diameter"
    }

    fn nr_dimensions(&self) -> usize {
        1
    }

    fn geometry_point(&self, instrument: &Instrument) -> Vec<f64> {
        vec![instrument.bore_points[0].diameter]
    }

    fn set_geometry_point(&self, instrument: &mut Instrument, point: &[f64]) {
        instrument.bore_points[0].diameter = point[0];
    }

    fn default_constraints(&self, instrument: &Instrument) -> Constraints {
        let mut constraints = Constraints::new(self.name(), self.display_name(), 6);
        constraints.push(
            Constraint::new(
                "Top diameter",
                "Bore diameters",
                ConstraintType::Dimensional,
                -1.0,
                -0.5,
            )
            .with_value(instrument.bore_points[0].diameter),
        );
        constraints
    }

    fn optimizer_type(&self) -> OptimizerType {
        OptimizerType::Brent
    }
}

#[test]
fn invalid_geometry_fails_and_restores() {
    let mut objective = ObjectiveFunction::new(
        whistle(),
        whistle_tuning(),
        calculator(),
        TuningEvaluator::default(),
        Arc::new(NegativeTopDiameter),
    )
    .unwrap();
    let original = objective.instrument().clone();

    let outcome = run_optimization(&mut objective, None);
    assert_eq!(outcome.strategy, Some(Strategy::Brent));
    assert_eq!(outcome.state, RunState::Failed);
    assert!(!outcome.success());
    assert!(outcome.message.is_some());
    assert_eq!(objective.instrument(), &original);
}

#[test]
fn study_optimizes_hole_geometry() {
    let study = StudyConfig::hole_study()
        .with_optimizer(OptimizerType::Simplex)
        .with_max_evaluations(200);
    let original = whistle();

    let (instrument, outcome) = study
        .optimize(original.clone(), whistle_tuning(), None)
        .unwrap();
    assert_eq!(outcome.strategy, Some(Strategy::Simplex));
    assert!(outcome.success(), "{}", outcome);
    assert!(outcome.final_norm <= outcome.initial_norm);
    assert_eq!(instrument.holes.len(), original.holes.len());
    instrument.validate().unwrap();
}
