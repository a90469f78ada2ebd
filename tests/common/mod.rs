//! Shared instruments and tunings for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use woodwind_designer::geometry::{EmbouchureHole, Fipple};
use woodwind_designer::{
    BorePoint, Fingering, Hole, Instrument, InstrumentCalculator, Mouthpiece, MouthpieceKind,
    Note, PhysicalParameters, Termination, Tuning,
};

/// Six-hole fipple whistle, about 27 cm long.
pub fn whistle() -> Instrument {
    let mouthpiece = Mouthpiece {
        position: 0.0,
        beta: None,
        kind: MouthpieceKind::Fipple(Fipple {
            window_width: 0.0085,
            window_length: 0.0055,
            fipple_factor: None,
            window_height: Some(0.0025),
            windway_length: Some(0.02),
            windway_height: Some(0.0012),
        }),
    };
    Instrument::new(
        "whistle",
        mouthpiece,
        vec![
            BorePoint::new(0.0, 0.0128),
            BorePoint::new(0.15, 0.0125),
            BorePoint::new(0.27, 0.0122),
        ],
        vec![
            Hole::named("1", 0.125, 0.0068, 0.0025),
            Hole::named("2", 0.148, 0.0071, 0.0025),
            Hole::named("3", 0.170, 0.0062, 0.0025),
            Hole::named("4", 0.195, 0.0066, 0.0025),
            Hole::named("5", 0.217, 0.0070, 0.0025),
            Hole::named("6", 0.238, 0.0058, 0.0025),
        ],
        Termination {
            flange_diameter: 0.016,
        },
    )
}

/// The whistle with an extra bore point, four in total.
pub fn four_point_whistle() -> Instrument {
    let mut instrument = whistle();
    instrument.bore_points.push(BorePoint::new(0.07, 0.0127));
    instrument.update_components();
    instrument
}

/// Two-point conical tube without holes: 18 mm at the head, 20 mm at the foot.
pub fn plain_tube() -> Instrument {
    let mouthpiece = Mouthpiece {
        position: 0.0,
        beta: None,
        kind: MouthpieceKind::EmbouchureHole(EmbouchureHole {
            inner_diameter: 0.010,
            outer_diameter: 0.011,
            height: 0.004,
        }),
    };
    Instrument::new(
        "tube",
        mouthpiece,
        vec![BorePoint::new(0.0, 0.018), BorePoint::new(0.36, 0.020)],
        vec![],
        Termination {
            flange_diameter: 0.024,
        },
    )
}

/// Low note with every hole closed, second note with the bottom hole open.
pub fn whistle_tuning() -> Tuning {
    Tuning::new(
        "whistle",
        6,
        vec![
            Fingering::new(Note::from_frequency(570.0), vec![false; 6]),
            Fingering::new(
                Note::from_frequency(640.0),
                vec![false, false, false, false, false, true],
            ),
        ],
    )
}

pub fn calculator() -> InstrumentCalculator {
    InstrumentCalculator::new(Arc::new(PhysicalParameters::at_temperature(20.0)))
}
