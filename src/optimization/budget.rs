//! Evaluation budget: counts calls, enforces the cap, tracks the best point.

use super::types::{CancelToken, StopReason};

/// Objective wrapper shared by every strategy.
///
/// The wrapped function returns `None` when the point cannot be evaluated; this stops
/// the run. Non-finite values are reported to the optimizer as `+∞`.
pub struct BudgetedFunction<F>
where
    F: FnMut(&[f64]) -> Option<f64>,
{
    f: F,
    max_evaluations: usize,
    evaluations: usize,
    cancel: Option<CancelToken>,
    best_point: Option<Vec<f64>>,
    best_value: f64,
    first_value: Option<f64>,
}

impl<F> BudgetedFunction<F>
where
    F: FnMut(&[f64]) -> Option<f64>,
{
    pub fn new(f: F, max_evaluations: usize) -> Self {
        Self {
            f,
            max_evaluations,
            evaluations: 0,
            cancel: None,
            best_point: None,
            best_value: f64::INFINITY,
            first_value: None,
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Evaluate `x`, or refuse with the reason the run must stop.
    pub fn evaluate(&mut self, x: &[f64]) -> Result<f64, StopReason> {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(StopReason::Cancelled);
        }
        if self.evaluations >= self.max_evaluations {
            return Err(StopReason::MaxEvaluations);
        }
        self.evaluations += 1;

        let value = match (self.f)(x) {
            Some(v) if v.is_finite() => v,
            Some(_) => f64::INFINITY,
            None => {
                return Err(StopReason::Aborted(format!(
                    "point could not be evaluated after {} evaluations",
                    self.evaluations
                )))
            }
        };

        if self.first_value.is_none() {
            self.first_value = Some(value);
        }
        if self.best_point.is_none() || value < self.best_value {
            self.best_value = value;
            self.best_point = Some(x.to_vec());
        }
        Ok(value)
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    pub fn max_evaluations(&self) -> usize {
        self.max_evaluations
    }

    pub fn remaining(&self) -> usize {
        self.max_evaluations.saturating_sub(self.evaluations)
    }

    pub fn best_point(&self) -> Option<&[f64]> {
        self.best_point.as_deref()
    }

    pub fn best_value(&self) -> f64 {
        self.best_value
    }

    /// Value at the first evaluated point (the start).
    pub fn first_value(&self) -> Option<f64> {
        self.first_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_best_and_enforces_cap() {
        let mut budget = BudgetedFunction::new(|x: &[f64]| Some(x[0] * x[0]), 3);
        assert_eq!(budget.evaluate(&[2.0]), Ok(4.0));
        assert_eq!(budget.evaluate(&[-1.0]), Ok(1.0));
        assert_eq!(budget.evaluate(&[3.0]), Ok(9.0));
        assert_eq!(budget.evaluate(&[0.0]), Err(StopReason::MaxEvaluations));
        assert_eq!(budget.best_point(), Some(&[-1.0][..]));
        assert_eq!(budget.best_value(), 1.0);
        assert_eq!(budget.first_value(), Some(4.0));
        assert_eq!(budget.evaluations(), 3);
    }

    #[test]
    fn non_finite_values_become_infinite() {
        let mut budget = BudgetedFunction::new(|_: &[f64]| Some(f64::NAN), 5);
        assert_eq!(budget.evaluate(&[1.0]), Ok(f64::INFINITY));
        assert_eq!(budget.best_point(), Some(&[1.0][..]));
    }

    #[test]
    fn abort_and_cancel_stop_evaluation() {
        let mut budget = BudgetedFunction::new(|_: &[f64]| None, 5);
        assert!(matches!(budget.evaluate(&[1.0]), Err(StopReason::Aborted(_))));

        let token = CancelToken::new();
        let mut budget =
            BudgetedFunction::new(|_: &[f64]| Some(1.0), 5).with_cancel_token(token.clone());
        assert_eq!(budget.evaluate(&[0.0]), Ok(1.0));
        token.cancel();
        assert_eq!(budget.evaluate(&[0.0]), Err(StopReason::Cancelled));
        assert_eq!(budget.evaluations(), 1);
    }
}
