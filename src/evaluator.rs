//! Tuning evaluation: find each fingering's playing frequency and score it against the
//! target note.
//!
//! A resonance is a zero of φ(f) = arg(m·R(f)), R the mouthpiece reflectance and m the
//! mouthpiece's reflectance multiplier. The search scans outward from the target on a
//! logarithmic grid and accepts only brackets where both ends satisfy |φ| < π/2, which
//! rejects the ±π wrap at anti-resonances. The nearest accepted bracket is refined with a
//! Brent root search.

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::acoustic_model::AcousticModel;
use crate::error::{DesignError, DesignResult};
use crate::optimization::univariate::brent_find_root;
use crate::tuning::{Fingering, Tuning};
use crate::types::{
    CENTS_PER_OCTAVE, DEFAULT_STEP_CENTS, DEFAULT_WINDOW_CENTS, DIVERGENCE_PENALTY_CENTS,
    DIVERGENCE_PENALTY_RELATIVE, MAX_RESONANCE_GRID_STEPS,
};

/// Frequency tolerance of the root refinement, relative to the target.
const ROOT_RELATIVE_TOL: f64 = 1e-9;

/// How a fingering's error is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    /// 1200·log₂(f / f_target)
    #[default]
    CentDeviation,
    /// (f − f_target) / f_target
    FrequencyDeviation,
    /// Phase of m·R at the target frequency; no resonance search.
    Reactance,
}

impl EvaluatorKind {
    fn divergence_penalty(self) -> f64 {
        match self {
            EvaluatorKind::CentDeviation => DIVERGENCE_PENALTY_CENTS,
            EvaluatorKind::FrequencyDeviation => DIVERGENCE_PENALTY_RELATIVE,
            EvaluatorKind::Reactance => std::f64::consts::PI,
        }
    }
}

/// Grid used to bracket a resonance around a target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResonanceFinder {
    /// Half-width of the search window (cents).
    pub window_cents: f64,
    /// Grid spacing (cents).
    pub step_cents: f64,
}

impl Default for ResonanceFinder {
    fn default() -> Self {
        Self {
            window_cents: DEFAULT_WINDOW_CENTS,
            step_cents: DEFAULT_STEP_CENTS,
        }
    }
}

impl ResonanceFinder {
    /// Window and step must be finite and positive, with at most
    /// [`MAX_RESONANCE_GRID_STEPS`] grid steps on each side of the target.
    pub fn validate(&self) -> DesignResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.window_cents) || !positive(self.step_cents) {
            return Err(DesignError::InvalidResonanceSearch(format!(
                "window {} and step {} cents must be finite and positive",
                self.window_cents, self.step_cents
            )));
        }
        let ratio = self.window_cents / self.step_cents;
        if ratio > MAX_RESONANCE_GRID_STEPS {
            return Err(DesignError::InvalidResonanceSearch(format!(
                "window {} cents at step {} cents needs {:.0} steps per side, limit is {}",
                self.window_cents, self.step_cents, ratio.ceil(), MAX_RESONANCE_GRID_STEPS
            )));
        }
        Ok(())
    }

    /// Grid steps on each side of the target.
    fn grid_steps(&self) -> DesignResult<i32> {
        self.validate()?;
        let steps = (self.window_cents / self.step_cents).ceil().max(1.0);
        Ok(steps as i32)
    }

    /// Playing frequency nearest `target`, or [`DesignError::EvaluationDivergence`].
    pub fn find_resonance(
        &self,
        model: &AcousticModel,
        fingering: &Fingering,
        target: f64,
    ) -> DesignResult<f64> {
        let phase = |f: f64| -> DesignResult<f64> {
            Ok(model.calc_reflectance(f, fingering)?.arg())
        };

        let step = self.step_cents;
        let steps = self.grid_steps()?;
        let grid = |i: i32| target * 2f64.powf(f64::from(i) * step / CENTS_PER_OCTAVE);

        // Phase cache indexed by grid offset + steps.
        let slots = steps
            .checked_mul(2)
            .and_then(|n| n.checked_add(1))
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                DesignError::InvalidResonanceSearch(format!("{} grid steps overflow", steps))
            })?;
        let mut cache: Vec<Option<f64>> = vec![None; slots];
        let mut phase_at = |i: i32| -> DesignResult<f64> {
            let slot = (i + steps) as usize;
            match cache[slot] {
                Some(p) => Ok(p),
                None => {
                    let p = phase(grid(i))?;
                    cache[slot] = Some(p);
                    Ok(p)
                }
            }
        };

        let accepts = |pa: f64, pb: f64| {
            pa.abs() < FRAC_PI_2 && pb.abs() < FRAC_PI_2 && pa * pb <= 0.0
        };
        let tol = ROOT_RELATIVE_TOL * target;

        for j in 0..steps {
            let mut roots = Vec::with_capacity(2);
            for (lo, hi) in [(j, j + 1), (-j - 1, -j)] {
                let (pa, pb) = (phase_at(lo)?, phase_at(hi)?);
                if accepts(pa, pb) {
                    if let Some(root) =
                        brent_find_root(phase, grid(lo), grid(hi), pa, pb, tol)?
                    {
                        roots.push(root);
                    }
                }
            }
            let nearest = roots.into_iter().min_by(|a, b| {
                (a / target).ln().abs().total_cmp(&(b / target).ln().abs())
            });
            if let Some(root) = nearest {
                return Ok(root);
            }
        }

        Err(DesignError::EvaluationDivergence {
            note: fingering.note.label(),
            target,
        })
    }
}

/// Result for one fingering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvaluation {
    pub note: String,
    pub target_frequency: f64,
    /// Predicted playing frequency; `None` when not searched or not found.
    pub predicted_frequency: Option<f64>,
    /// Signed error in the evaluator's unit (penalty when the search diverged).
    pub error: f64,
    pub weight: u32,
    pub diverged: bool,
}

/// Scores a tuning against an acoustic model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TuningEvaluator {
    pub kind: EvaluatorKind,
    #[serde(default)]
    pub finder: ResonanceFinder,
}

impl TuningEvaluator {
    pub fn new(kind: EvaluatorKind) -> Self {
        Self {
            kind,
            finder: ResonanceFinder::default(),
        }
    }

    /// Replace the resonance search grid after validating it.
    pub fn with_finder(mut self, finder: ResonanceFinder) -> DesignResult<Self> {
        finder.validate()?;
        self.finder = finder;
        Ok(self)
    }

    /// Evaluate every fingering, weight 0 included.
    pub fn evaluate(
        &self,
        model: &AcousticModel,
        tuning: &Tuning,
    ) -> DesignResult<Vec<NoteEvaluation>> {
        tuning
            .fingerings
            .iter()
            .map(|fingering| self.evaluate_fingering(model, fingering))
            .collect()
    }

    /// √w·error for each fingering with weight > 0, in tuning order.
    pub fn error_vector(&self, model: &AcousticModel, tuning: &Tuning) -> DesignResult<Vec<f64>> {
        tuning
            .weighted_fingerings()
            .map(|fingering| {
                let evaluation = self.evaluate_fingering(model, fingering)?;
                Ok(f64::from(evaluation.weight).sqrt() * evaluation.error)
            })
            .collect()
    }

    pub fn evaluate_fingering(
        &self,
        model: &AcousticModel,
        fingering: &Fingering,
    ) -> DesignResult<NoteEvaluation> {
        let target = fingering.note.target_frequency()?;
        let mut evaluation = NoteEvaluation {
            note: fingering.note.label(),
            target_frequency: target,
            predicted_frequency: None,
            error: 0.0,
            weight: fingering.weight(),
            diverged: false,
        };

        if self.kind == EvaluatorKind::Reactance {
            evaluation.error = model.calc_reflectance(target, fingering)?.arg();
            return Ok(evaluation);
        }

        match self.finder.find_resonance(model, fingering, target) {
            Ok(f) => {
                evaluation.predicted_frequency = Some(f);
                evaluation.error = match self.kind {
                    EvaluatorKind::FrequencyDeviation => (f - target) / target,
                    _ => CENTS_PER_OCTAVE * (f / target).log2(),
                };
            }
            Err(DesignError::EvaluationDivergence { note, target }) => {
                debug!(
                    note = %note,
                    target_frequency = target,
                    "no resonance in window, applying penalty"
                );
                evaluation.error = self.kind.divergence_penalty();
                evaluation.diverged = true;
            }
            Err(other) => return Err(other),
        }
        Ok(evaluation)
    }
}
