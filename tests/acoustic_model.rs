mod common;

use std::sync::Arc;

use woodwind_designer::{
    Fingering, Instrument, InstrumentCalculator, LengthType, Note, PhysicalParameters,
    TerminationModel, Tuning, TuningEvaluator,
};

use common::{calculator, plain_tube, whistle, whistle_tuning};

fn tube_tuning() -> Tuning {
    Tuning::new("tube", 0, vec![Fingering::new(Note::from_name("A4"), vec![])])
}

fn tube_calculator() -> InstrumentCalculator {
    InstrumentCalculator::new(Arc::new(
        PhysicalParameters::at_temperature(20.0).with_speed_of_sound(345.0),
    ))
}

#[test]
fn plain_tube_scores_single_note() {
    let model = tube_calculator().prepare(&plain_tube()).unwrap();
    let tuning = tube_tuning();
    let evaluator = TuningEvaluator::default();

    let first = evaluator.error_vector(&model, &tuning).unwrap();
    let second = evaluator.error_vector(&model, &tuning).unwrap();
    assert_eq!(first.len(), 1);
    assert!(first[0].is_finite());
    assert_eq!(first[0].to_bits(), second[0].to_bits());
}

#[test]
fn plain_tube_has_no_holes() {
    let model = tube_calculator().prepare(&plain_tube()).unwrap();
    assert_eq!(model.nr_holes(), 0);
    assert_eq!(model.reflectance_multiplier(), -1);
}

#[test]
fn impedance_is_reproducible() {
    let model = calculator().prepare(&whistle()).unwrap();
    let fingering = Fingering::new(Note::from_frequency(570.0), vec![false; 6]);
    for &f in &[300.0, 570.0, 1200.0] {
        let a = model.calc_z(f, &fingering).unwrap();
        let b = model.calc_z(f, &fingering).unwrap();
        assert_eq!(a.re.to_bits(), b.re.to_bits());
        assert_eq!(a.im.to_bits(), b.im.to_bits());
    }
}

#[test]
fn speed_of_sound_scales_prediction() {
    let tuning = whistle_tuning();
    let evaluator = TuningEvaluator::default();
    let slow = InstrumentCalculator::new(Arc::new(
        PhysicalParameters::at_temperature(20.0).with_speed_of_sound(330.0),
    ))
    .prepare(&whistle())
    .unwrap();
    let fast = InstrumentCalculator::new(Arc::new(
        PhysicalParameters::at_temperature(20.0).with_speed_of_sound(350.0),
    ))
    .prepare(&whistle())
    .unwrap();

    let slow_notes = evaluator.evaluate(&slow, &tuning).unwrap();
    let fast_notes = evaluator.evaluate(&fast, &tuning).unwrap();
    for (s, f) in slow_notes.iter().zip(&fast_notes) {
        if let (Some(s), Some(f)) = (s.predicted_frequency, f.predicted_frequency) {
            assert!(f > s, "faster air should sound higher: {} vs {}", f, s);
        }
    }
}

#[test]
fn termination_models_differ() {
    let fingering = Fingering::new(Note::from_frequency(570.0), vec![false; 6]);
    let flanged = calculator().prepare(&whistle()).unwrap();
    let ideal = calculator()
        .with_termination_model(TerminationModel::IdealOpenEnd)
        .prepare(&whistle())
        .unwrap();
    let a = flanged.calc_z(570.0, &fingering).unwrap();
    let b = ideal.calc_z(570.0, &fingering).unwrap();
    assert!((a - b).norm() > 0.0);
}

#[test]
fn instrument_json_in_millimetres_matches_metres() {
    let mut millimetres = whistle();
    millimetres.length_type = LengthType::MM;
    let json = millimetres.to_json().unwrap();
    assert!(json.contains("\"MM\""));

    let parsed = Instrument::from_json(&json).unwrap();
    assert!(parsed.is_in_metres());

    let fingering = Fingering::new(Note::from_frequency(570.0), vec![false; 6]);
    let a = calculator()
        .prepare(&parsed)
        .unwrap()
        .calc_z(570.0, &fingering)
        .unwrap();
    let b = calculator()
        .prepare(&whistle())
        .unwrap()
        .calc_z(570.0, &fingering)
        .unwrap();
    assert!((a - b).norm() <= 1e-9 * b.norm());
}
