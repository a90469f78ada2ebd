//! Type definitions for geometry optimization.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Optimizer an objective asks for, or a caller prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptimizerType {
    /// Bounded univariate Brent search.
    Brent,
    /// Powell conjugate directions (unbounded).
    Powell,
    /// Multidirectional (Torczon) simplex.
    Simplex,
    /// Bounded quadratic-model trust region.
    Bobyqa,
    /// Covariance matrix adaptation evolution strategy.
    CmaEs,
}

impl fmt::Display for OptimizerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizerType::Brent => "Brent",
            OptimizerType::Powell => "Powell",
            OptimizerType::Simplex => "Simplex",
            OptimizerType::Bobyqa => "BOBYQA",
            OptimizerType::CmaEs => "CMA-ES",
        };
        f.write_str(name)
    }
}

/// Concrete strategy the driver runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    Brent,
    Powell,
    Simplex,
    Bobyqa,
    CmaEs,
}

impl Strategy {
    pub fn is_univariate(self) -> bool {
        matches!(self, Strategy::Brent)
    }
}

impl From<OptimizerType> for Strategy {
    fn from(value: OptimizerType) -> Self {
        match value {
            OptimizerType::Brent => Strategy::Brent,
            OptimizerType::Powell => Strategy::Powell,
            OptimizerType::Simplex => Strategy::Simplex,
            OptimizerType::Bobyqa => Strategy::Bobyqa,
            OptimizerType::CmaEs => Strategy::CmaEs,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let optimizer = match self {
            Strategy::Brent => OptimizerType::Brent,
            Strategy::Powell => OptimizerType::Powell,
            Strategy::Simplex => OptimizerType::Simplex,
            Strategy::Bobyqa => OptimizerType::Bobyqa,
            Strategy::CmaEs => OptimizerType::CmaEs,
        };
        optimizer.fmt(f)
    }
}

/// Lifecycle of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    #[default]
    Initialized,
    Evaluating,
    Converged,
    MaxEvaluationsReached,
    Failed,
}

impl RunState {
    /// Converged or ran out of budget with a usable best point.
    pub fn is_success(self) -> bool {
        matches!(self, RunState::Converged | RunState::MaxEvaluationsReached)
    }
}

/// Why an evaluation was refused.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    MaxEvaluations,
    Cancelled,
    /// The objective could not be evaluated (invalid geometry).
    Aborted(String),
}

/// Cooperative cancellation flag shared between a run and its caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Multi-start sampling method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartSampling {
    #[default]
    Random,
    LatinHypercube,
    Grid,
}

/// Multi-start settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiStartConfig {
    /// Total number of starts, including the current geometry.
    pub starts: usize,
    pub sampling: StartSampling,
    /// Dimensions to vary between starts; all when empty.
    pub vary_dimensions: Vec<usize>,
    /// Seed for start sampling.
    pub seed: u64,
}

impl Default for MultiStartConfig {
    fn default() -> Self {
        Self {
            starts: 1,
            sampling: StartSampling::Random,
            vary_dimensions: Vec::new(),
            seed: 0,
        }
    }
}

impl MultiStartConfig {
    pub fn new(starts: usize) -> Self {
        Self {
            starts,
            ..Default::default()
        }
    }

    pub fn with_sampling(mut self, sampling: StartSampling) -> Self {
        self.sampling = sampling;
        self
    }

    pub fn with_vary_dimensions(mut self, dimensions: Vec<usize>) -> Self {
        self.vary_dimensions = dimensions;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn is_multi_start(&self) -> bool {
        self.starts > 1
    }
}

/// Value convergence checker: successive values agree within a relative or absolute
/// threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueChecker {
    pub relative: f64,
    pub absolute: f64,
}

impl ValueChecker {
    pub fn new(relative: f64, absolute: f64) -> Self {
        Self { relative, absolute }
    }

    pub fn converged(&self, previous: f64, current: f64) -> bool {
        if !previous.is_finite() || !current.is_finite() {
            return false;
        }
        let difference = (previous - current).abs();
        let size = previous.abs().max(current.abs());
        difference <= size * self.relative || difference <= self.absolute
    }
}

/// Settings passed to a single strategy run.
#[derive(Debug, Clone)]
pub struct StrategySettings {
    pub lower_bounds: Vec<f64>,
    pub upper_bounds: Vec<f64>,
    pub max_evaluations: usize,
    /// Simplex edge lengths, also Powell direction scales.
    pub step_sizes: Vec<f64>,
    /// Initial CMA-ES sigmas.
    pub std_dev: Vec<f64>,
    pub nr_interpolations: usize,
    pub initial_trust_region_radius: f64,
    pub seed: u64,
}

/// Outcome of a strategy run on a budgeted function.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerResult {
    pub point: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
    pub state: RunState,
    pub message: Option<String>,
}

/// Summary of a driver run.
#[derive(Debug, Clone, Default)]
pub struct OptimizationOutcome {
    pub state: RunState,
    pub strategy: Option<Strategy>,
    pub initial_norm: f64,
    pub final_norm: f64,
    pub evaluations: usize,
    pub tunings: usize,
    pub point: Vec<f64>,
    pub message: Option<String>,
}

impl OptimizationOutcome {
    pub fn success(&self) -> bool {
        self.state.is_success()
    }

    /// Residual error as a percentage of the starting error.
    pub fn residual_percent(&self) -> f64 {
        if self.initial_norm > 0.0 {
            100.0 * self.final_norm / self.initial_norm
        } else {
            0.0
        }
    }
}

impl fmt::Display for OptimizationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Optimization Outcome:")?;
        if let Some(strategy) = self.strategy {
            writeln!(f, "  Strategy: {}", strategy)?;
        }
        writeln!(f, "  State: {:?}", self.state)?;
        writeln!(f, "  Initial error: {:.6}", self.initial_norm)?;
        writeln!(
            f,
            "  Final error: {:.6} ({:.2}% of initial)",
            self.final_norm,
            self.residual_percent()
        )?;
        writeln!(f, "  Evaluations: {}", self.evaluations)?;
        writeln!(f, "  Tunings: {}", self.tunings)?;
        if let Some(message) = &self.message {
            writeln!(f, "  Message: {}", message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn success_states() {
        assert!(RunState::Converged.is_success());
        assert!(RunState::MaxEvaluationsReached.is_success());
        assert!(!RunState::Failed.is_success());
        assert!(!RunState::Initialized.is_success());
    }

    #[test]
    fn outcome_display_mentions_strategy() {
        let outcome = OptimizationOutcome {
            state: RunState::Converged,
            strategy: Some(Strategy::Bobyqa),
            initial_norm: 100.0,
            final_norm: 4.0,
            ..Default::default()
        };
        let text = outcome.to_string();
        assert!(text.contains("BOBYQA"));
        assert!(text.contains("4.00% of initial"));
    }
}
