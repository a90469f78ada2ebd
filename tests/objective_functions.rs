mod common;

use proptest::prelude::*;

use woodwind_designer::optimization::{
    BoreLengthAdjustment, Constraints, GeometryComponent, ObjectiveFunction, ObjectiveSettings,
};
use woodwind_designer::{
    build_objective, DesignError, Instrument, ObjectiveKind, OptimizerType, StudyConfig,
    TuningEvaluator,
};

use common::{calculator, four_point_whistle, whistle, whistle_tuning};

const TOL: f64 = 1e-12;

fn kinds() -> Vec<ObjectiveKind> {
    vec![
        ObjectiveKind::BoreDiameter {
            unchanged_bore_points: 0,
        },
        ObjectiveKind::BoreLength {
            adjustment: BoreLengthAdjustment::PreserveTaper,
        },
        ObjectiveKind::BoreLength {
            adjustment: BoreLengthAdjustment::PreserveBell,
        },
        ObjectiveKind::HolePosition {
            adjustment: BoreLengthAdjustment::PreserveBell,
        },
        ObjectiveKind::HoleSize,
        ObjectiveKind::Hole {
            adjustment: BoreLengthAdjustment::PreserveTaper,
        },
        ObjectiveKind::HoleAndBoreDiameter {
            adjustment: BoreLengthAdjustment::PreserveTaper,
            unchanged_bore_points: 1,
        },
    ]
}

fn objective(kind: ObjectiveKind, instrument: Instrument) -> ObjectiveFunction {
    build_objective(
        kind,
        instrument,
        whistle_tuning(),
        calculator(),
        TuningEvaluator::default(),
        None,
    )
    .unwrap()
}

proptest! {
    #[test]
    fn geometry_point_round_trips(
        kind_index in 0usize..7,
        fractions in prop::collection::vec(0.0f64..=1.0, 32),
    ) {
        let kind = kinds()[kind_index];
        let instrument = four_point_whistle();
        let component = kind.component(&instrument);
        let constraints = component.default_constraints(&instrument);
        let point: Vec<f64> = constraints
            .iter()
            .zip(&fractions)
            .map(|(c, t)| c.lower + t * c.range())
            .collect();
        prop_assert_eq!(point.len(), component.nr_dimensions());

        let mut moved = instrument.clone();
        component.set_geometry_point(&mut moved, &point);
        let read = component.geometry_point(&moved);
        prop_assert_eq!(read.len(), point.len());
        for (got, expected) in read.iter().zip(&point) {
            prop_assert!((got - expected).abs() < TOL, "{} != {}", got, expected);
        }
    }
}

#[test]
fn composite_dimensions_and_bounds_concatenate() {
    let instrument = four_point_whistle();
    let adjustment = BoreLengthAdjustment::PreserveTaper;
    let merged = objective(
        ObjectiveKind::HoleAndBoreDiameter {
            adjustment,
            unchanged_bore_points: 1,
        },
        instrument.clone(),
    );
    let parts = [
        objective(ObjectiveKind::HolePosition { adjustment }, instrument.clone()),
        objective(ObjectiveKind::HoleSize, instrument.clone()),
        objective(
            ObjectiveKind::BoreDiameter {
                unchanged_bore_points: 1,
            },
            instrument,
        ),
    ];

    let nr_dimensions: usize = parts.iter().map(|p| p.nr_dimensions()).sum();
    assert_eq!(merged.nr_dimensions(), nr_dimensions);
    assert_eq!(merged.nr_dimensions(), 7 + 6 + 2);

    let lower: Vec<f64> = parts.iter().flat_map(|p| p.lower_bounds()).collect();
    let upper: Vec<f64> = parts.iter().flat_map(|p| p.upper_bounds()).collect();
    let point: Vec<f64> = parts.iter().flat_map(|p| p.initial_point()).collect();
    assert_eq!(merged.lower_bounds(), lower);
    assert_eq!(merged.upper_bounds(), upper);
    assert_eq!(merged.initial_point(), point);
    assert_eq!(
        merged.constraints().categories(),
        vec!["Hole position", "Hole size", "Bore diameters"]
    );
}

#[test]
fn bore_diameter_dimensions_skip_unchanged_points() {
    let mut objective = objective(
        ObjectiveKind::BoreDiameter {
            unchanged_bore_points: 1,
        },
        four_point_whistle(),
    );
    assert_eq!(objective.nr_dimensions(), 2);
    assert_eq!(objective.optimizer_type(), OptimizerType::Bobyqa);

    let before = objective.instrument().bore_points.clone();
    let mut point = objective.initial_point();
    point[0] = 0.0131;
    objective.set_geometry_point(&point).unwrap();

    let after = &objective.instrument().bore_points;
    assert_eq!(after[3].diameter, 0.0131);
    assert_eq!(after[0], before[0]);
    assert_eq!(after[1], before[1]);
    // The ratio to the point below is kept
    let ratio = before[3].diameter / before[2].diameter;
    assert!((after[3].diameter / after[2].diameter - ratio).abs() < TOL);
}

#[test]
fn value_is_squared_error_norm() {
    let mut objective = objective(ObjectiveKind::HoleSize, whistle());
    let point = objective.initial_point();
    let errors = objective.error_vector(&point).unwrap();
    assert_eq!(errors.len(), 2);
    let value = objective.value(&point).unwrap();
    let norm: f64 = errors.iter().map(|e| e * e).sum();
    assert_eq!(value, norm);
    assert_eq!(ObjectiveFunction::calc_norm(&errors), norm);
}

#[test]
fn invalid_point_is_an_error() {
    let mut objective = objective(ObjectiveKind::HoleSize, whistle());
    let mut point = objective.initial_point();
    point[2] = -0.001;
    let err = objective.value(&point).unwrap_err();
    assert!(matches!(err, DesignError::Geometry(_)));

    let err = objective.value(&point[..3]).unwrap_err();
    assert!(matches!(err, DesignError::DimensionMismatch { expected: 6, found: 3 }));
}

#[test]
fn study_constraints_override_defaults() {
    let study = StudyConfig::new(ObjectiveKind::HoleSize);
    let defaults = study
        .build_objective(whistle(), whistle_tuning())
        .unwrap()
        .constraints()
        .clone();

    let mut constraints = Constraints::from_json(&defaults.to_json().unwrap()).unwrap();
    assert_eq!(constraints.len(), defaults.len());
    assert_eq!(constraints.objective_name, defaults.objective_name);
    constraints.constraints[1].lower = 0.005;
    constraints.constraints[1].upper = 0.008;

    let objective = study
        .clone()
        .with_constraints(constraints)
        .build_objective(whistle(), whistle_tuning())
        .unwrap();
    assert_eq!(objective.lower_bounds()[1], 0.005);
    assert_eq!(objective.upper_bounds()[1], 0.008);
    assert!((objective.lower_bounds()[0] - defaults.lower_bounds()[0]).abs() < TOL);

    let mut short = defaults.clone();
    short.constraints.truncate(4);
    let result = study
        .with_constraints(short)
        .build_objective(whistle(), whistle_tuning());
    assert!(matches!(
        result,
        Err(DesignError::DimensionMismatch {
            expected: 6,
            found: 4
        })
    ));
}

#[test]
fn study_budget_reaches_objective() {
    let objective = StudyConfig::new(ObjectiveKind::HoleSize)
        .with_max_evaluations(250)
        .build_objective(whistle(), whistle_tuning())
        .unwrap();
    assert_eq!(objective.max_evaluations(), 250);
    assert_eq!(
        objective.settings(),
        &ObjectiveSettings {
            max_evaluations: Some(250),
            ..Default::default()
        }
    );
}
