//! Instrument acoustic model: chains bore, hole, mouthpiece and termination elements into
//! an input impedance and reflectance at the mouthpiece.
//!
//! [`InstrumentCalculator`] is the factory: it is bound to one set of physical parameters
//! and a termination model, and prepares an [`AcousticModel`] from a validated instrument.
//! The model is rebuilt for every geometry change; evaluating it at a frequency is cheap.

use std::sync::Arc;

use num_complex::Complex64;

use crate::error::{DesignError, DesignResult, GeometryError};
use crate::geometry::{BoreSection, Hole, Instrument, Mouthpiece};
use crate::physical_parameters::PhysicalParameters;
use crate::termination::TerminationModel;
use crate::transfer_matrix::{StateVector, TransferMatrix};
use crate::tuning::Fingering;

/// Element of the chain between the mouthpiece and the foot.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    Bore(BoreSection),
    Hole {
        /// Index into the instrument's hole list (top to bottom).
        index: usize,
        hole: Hole,
        bore_radius: f64,
    },
}

impl Component {
    fn transfer_matrix(
        &self,
        wave_number: f64,
        params: &PhysicalParameters,
        fingering: &Fingering,
    ) -> TransferMatrix {
        match self {
            Component::Bore(section) => section.transfer_matrix(wave_number, params),
            Component::Hole {
                index,
                hole,
                bore_radius,
            } => hole.transfer_matrix(
                wave_number,
                params,
                *bore_radius,
                fingering.is_hole_open(*index),
            ),
        }
    }
}

/// Factory for acoustic models under fixed physical conditions.
#[derive(Debug, Clone)]
pub struct InstrumentCalculator {
    params: Arc<PhysicalParameters>,
    termination_model: TerminationModel,
}

impl InstrumentCalculator {
    pub fn new(params: Arc<PhysicalParameters>) -> Self {
        Self {
            params,
            termination_model: TerminationModel::default(),
        }
    }

    pub fn with_termination_model(mut self, model: TerminationModel) -> Self {
        self.termination_model = model;
        self
    }

    pub fn params(&self) -> &Arc<PhysicalParameters> {
        &self.params
    }

    pub fn termination_model(&self) -> TerminationModel {
        self.termination_model
    }

    /// Validate the instrument and build its element chain.
    pub fn prepare(&self, instrument: &Instrument) -> Result<AcousticModel, GeometryError> {
        instrument.validate()?;

        let mouthpiece_position = instrument.mouthpiece.position;
        let mut components = Vec::new();
        let mut upper = mouthpiece_position;
        for (index, hole) in instrument.holes.iter().enumerate() {
            components.extend(
                instrument
                    .sections_between(upper, hole.position)
                    .into_iter()
                    .map(Component::Bore),
            );
            components.push(Component::Hole {
                index,
                hole: hole.clone(),
                bore_radius: instrument.bore_diameter_at(hole.position) / 2.0,
            });
            upper = hole.position;
        }
        components.extend(
            instrument
                .sections_between(upper, instrument.bore_end())
                .into_iter()
                .map(Component::Bore),
        );

        // Headspace, walked from the mouthpiece up to the stopped top.
        let headspace = instrument
            .sections_between(instrument.bore_start(), mouthpiece_position)
            .iter()
            .rev()
            .map(|section| section.reversed(section.right_bore_position - section.length))
            .collect();

        let foot = instrument.bore_points.last().map_or(0.0, |p| p.diameter);

        Ok(AcousticModel {
            params: Arc::clone(&self.params),
            termination_model: self.termination_model,
            mouthpiece: instrument.mouthpiece,
            mouthpiece_radius: instrument.bore_diameter_at(mouthpiece_position) / 2.0,
            components,
            headspace,
            foot_radius: foot / 2.0,
            flange_diameter: instrument.termination.flange_diameter,
            nr_holes: instrument.holes.len(),
        })
    }
}

/// Prepared element chain for one instrument geometry.
#[derive(Debug, Clone)]
pub struct AcousticModel {
    params: Arc<PhysicalParameters>,
    termination_model: TerminationModel,
    mouthpiece: Mouthpiece,
    mouthpiece_radius: f64,
    components: Vec<Component>,
    headspace: Vec<BoreSection>,
    foot_radius: f64,
    flange_diameter: f64,
    nr_holes: usize,
}

impl AcousticModel {
    pub fn params(&self) -> &PhysicalParameters {
        &self.params
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn nr_holes(&self) -> usize {
        self.nr_holes
    }

    pub fn reflectance_multiplier(&self) -> i32 {
        self.mouthpiece.reflectance_multiplier()
    }

    pub fn wave_number(&self, frequency: f64) -> f64 {
        self.params.calc_wave_number(frequency)
    }

    /// Characteristic impedance at the mouthpiece bore radius.
    pub fn z0(&self) -> f64 {
        self.params.calc_z0(self.mouthpiece_radius)
    }

    /// State vector (p, U) at the mouthpiece input for a frequency and fingering.
    pub fn calc_state_vector(
        &self,
        frequency: f64,
        fingering: &Fingering,
    ) -> DesignResult<StateVector> {
        if fingering.open_holes.len() != self.nr_holes {
            return Err(DesignError::FingeringMismatch {
                note: fingering.note.label(),
                expected: self.nr_holes,
                found: fingering.open_holes.len(),
            });
        }

        let k = self.wave_number(frequency);
        let params = self.params.as_ref();

        let mut state = self.termination_model.state_vector(
            k,
            params,
            self.foot_radius,
            self.flange_diameter,
        );
        for component in self.components.iter().rev() {
            state = component.transfer_matrix(k, params, fingering).apply(&state);
        }

        if !self.headspace.is_empty() {
            let admittance = self.headspace_admittance(k);
            state = TransferMatrix::shunt(admittance).apply(&state);
        }

        Ok(self.mouthpiece.transfer_matrix(k, params).apply(&state))
    }

    /// Input admittance of the closed cavity above the mouthpiece.
    fn headspace_admittance(&self, wave_number: f64) -> Complex64 {
        let matrices: Vec<TransferMatrix> = self
            .headspace
            .iter()
            .map(|section| section.transfer_matrix(wave_number, &self.params))
            .collect();
        let stopped = StateVector::new(Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0));
        TransferMatrix::multiply_all(matrices.iter())
            .apply(&stopped)
            .admittance()
    }

    /// Input impedance Z = p/U at the mouthpiece.
    pub fn calc_z(&self, frequency: f64, fingering: &Fingering) -> DesignResult<Complex64> {
        Ok(self.calc_state_vector(frequency, fingering)?.impedance())
    }

    /// Reflectance at the mouthpiece, multiplied by the mouthpiece's reflectance multiplier.
    pub fn calc_reflectance(
        &self,
        frequency: f64,
        fingering: &Fingering,
    ) -> DesignResult<Complex64> {
        let reflectance = self
            .calc_state_vector(frequency, fingering)?
            .reflectance(self.z0());
        Ok(reflectance * f64::from(self.reflectance_multiplier()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::tests::whistle;
    use crate::tuning::Note;

    fn calculator() -> InstrumentCalculator {
        InstrumentCalculator::new(Arc::new(PhysicalParameters::at_temperature(20.0)))
    }

    fn closed(n: usize) -> Fingering {
        Fingering::new(Note::from_frequency(587.33), vec![false; n])
    }

    #[test]
    fn chain_alternates_bore_and_holes() {
        let model = calculator().prepare(&whistle()).unwrap();
        let holes: Vec<usize> = model
            .components()
            .iter()
            .filter_map(|c| match c {
                Component::Hole { index, .. } => Some(*index),
                _ => None,
            })
            .collect();
        assert_eq!(holes, vec![0, 1, 2, 3, 4, 5]);

        let bore_length: f64 = model
            .components()
            .iter()
            .filter_map(|c| match c {
                Component::Bore(s) => Some(s.length),
                _ => None,
            })
            .sum();
        assert!((bore_length - 0.27).abs() < 1e-12);
    }

    #[test]
    fn mismatched_fingering_is_rejected() {
        let model = calculator().prepare(&whistle()).unwrap();
        let err = model.calc_z(440.0, &closed(4)).unwrap_err();
        assert!(matches!(
            err,
            DesignError::FingeringMismatch {
                expected: 6,
                found: 4,
                ..
            }
        ));
    }

    #[test]
    fn invalid_geometry_fails_to_prepare() {
        let mut instrument = whistle();
        instrument.bore_points[0].diameter = -0.01;
        assert!(calculator().prepare(&instrument).is_err());
    }

    #[test]
    fn lossless_reflectance_has_unit_magnitude() {
        let params = PhysicalParameters::at_temperature(20.0).lossless();
        let model = InstrumentCalculator::new(Arc::new(params))
            .with_termination_model(TerminationModel::IdealOpenEnd)
            .prepare(&whistle())
            .unwrap();
        // Only the mouthpiece radiation resistance dissipates.
        let r = model.calc_reflectance(500.0, &closed(6)).unwrap();
        assert!(r.norm() <= 1.0 + 1e-9);
        assert!(r.norm() > 0.9);
    }

    #[test]
    fn headspace_adds_compliance() {
        let mut instrument = whistle();
        instrument.mouthpiece.position = 0.02;
        let with_head = calculator().prepare(&instrument).unwrap();
        let without_head = calculator().prepare(&whistle()).unwrap();
        let f = with_head.calc_z(400.0, &closed(6)).unwrap();
        let g = without_head.calc_z(400.0, &closed(6)).unwrap();
        assert!((f - g).norm() > 0.0);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let model = calculator().prepare(&whistle()).unwrap();
        let a = model.calc_reflectance(612.0, &closed(6)).unwrap();
        let b = model.calc_reflectance(612.0, &closed(6)).unwrap();
        assert_eq!(a, b);
    }
}
