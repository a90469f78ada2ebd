//! Covariance matrix adaptation evolution strategy, (μ/μ_w, λ) with rank-one and rank-μ
//! updates.
//!
//! The search runs in coordinates scaled by the per-dimension standard deviations, so the
//! initial step size is 1. Candidates outside the bounds are evaluated at the clipped
//! point with a quadratic penalty on the clipped distance.

use nalgebra::linalg::SymmetricEigen;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::types::CMAES_STOP_FITNESS_FRACTION;

use super::budget::BudgetedFunction;
use super::types::{StopReason, StrategySettings};

/// Step size below which the distribution has collapsed, in scaled units.
const STOP_STEP: f64 = 1e-12;
/// Best-fitness range below which progress has stalled.
const STOP_FLAT: f64 = 1e-13;

struct Parameters {
    lambda: usize,
    mu: usize,
    weights: Vec<f64>,
    mueff: f64,
    cc: f64,
    cs: f64,
    c1: f64,
    cmu: f64,
    damps: f64,
    chi_n: f64,
}

impl Parameters {
    fn new(n: usize, lambda: usize) -> Self {
        let nf = n as f64;
        let mu = lambda / 2;
        let raw: Vec<f64> = (0..mu)
            .map(|i| (mu as f64 + 0.5).ln() - ((i + 1) as f64).ln())
            .collect();
        let total: f64 = raw.iter().sum();
        let weights: Vec<f64> = raw.iter().map(|w| w / total).collect();
        let mueff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        let cc = (4.0 + mueff / nf) / (nf + 4.0 + 2.0 * mueff / nf);
        let cs = (mueff + 2.0) / (nf + mueff + 5.0);
        let c1 = 2.0 / ((nf + 1.3).powi(2) + mueff);
        let cmu = (1.0 - c1).min(2.0 * (mueff - 2.0 + 1.0 / mueff) / ((nf + 2.0).powi(2) + mueff));
        let damps = 1.0 + 2.0 * (((mueff - 1.0) / (nf + 1.0)).sqrt() - 1.0).max(0.0) + cs;
        let chi_n = nf.sqrt() * (1.0 - 1.0 / (4.0 * nf) + 1.0 / (21.0 * nf * nf));

        Self {
            lambda,
            mu,
            weights,
            mueff,
            cc,
            cs,
            c1,
            cmu,
            damps,
            chi_n,
        }
    }
}

/// Population size used for `n` dimensions.
pub fn population_size(requested: usize) -> usize {
    requested.max(4)
}

/// Minimize from `start`, whose value is already known.
pub fn minimize<F>(
    f: &mut BudgetedFunction<F>,
    start: &[f64],
    start_value: f64,
    settings: &StrategySettings,
) -> Result<(), StopReason>
where
    F: FnMut(&[f64]) -> Option<f64>,
{
    let n = start.len();
    if n == 0 {
        return Ok(());
    }
    let lower = &settings.lower_bounds;
    let upper = &settings.upper_bounds;
    let scale: Vec<f64> = (0..n)
        .map(|i| match settings.std_dev.get(i) {
            Some(&s) if s > 0.0 => s,
            _ => 1e-3 * start[i].abs().max(1e-3),
        })
        .collect();
    let stop_fitness = if start_value > 0.0 {
        CMAES_STOP_FITNESS_FRACTION * start_value
    } else {
        f64::NEG_INFINITY
    };

    let p = Parameters::new(n, population_size(settings.nr_interpolations));
    let history_length = 10 + (30 * n).div_ceil(p.lambda);
    let mut rng = StdRng::seed_from_u64(settings.seed);

    let mut mean = DVector::<f64>::zeros(n);
    let mut sigma = 1.0;
    let mut pc = DVector::<f64>::zeros(n);
    let mut ps = DVector::<f64>::zeros(n);
    let mut c = DMatrix::<f64>::identity(n, n);
    let mut b = DMatrix::<f64>::identity(n, n);
    let mut d = DVector::<f64>::from_element(n, 1.0);
    let mut history: Vec<f64> = Vec::with_capacity(history_length);

    for generation in 0usize.. {
        let mut offspring: Vec<(DVector<f64>, f64)> = Vec::with_capacity(p.lambda);
        for _ in 0..p.lambda {
            let z: DVector<f64> = DVector::from_fn(n, |_, _| StandardNormal.sample(&mut rng));
            let y = &b * d.component_mul(&z);
            let u = &mean + &y * sigma;

            let mut x = vec![0.0; n];
            let mut penalty = 0.0;
            for i in 0..n {
                let raw = start[i] + scale[i] * u[i];
                let clipped = raw.clamp(lower[i], upper[i].max(lower[i]));
                penalty += ((raw - clipped) / scale[i]).powi(2);
                x[i] = clipped;
            }
            let value = f.evaluate(&x)?;
            let fitness = if penalty > 0.0 {
                value + (value.abs() + 1.0) * penalty
            } else {
                value
            };
            offspring.push((u, fitness));
        }
        offspring.sort_by(|a, b| a.1.total_cmp(&b.1));

        let best_fitness = offspring[0].1;
        if best_fitness <= stop_fitness {
            return Ok(());
        }

        let old_mean = mean.clone();
        mean = DVector::zeros(n);
        for (weight, (u, _)) in p.weights.iter().zip(&offspring) {
            mean += u * *weight;
        }
        let shift = (&mean - &old_mean) / sigma;

        let inv_sqrt_c = &b * DMatrix::from_diagonal(&d.map(|v| 1.0 / v)) * b.transpose();
        ps = &ps * (1.0 - p.cs) + &inv_sqrt_c * &shift * (p.cs * (2.0 - p.cs) * p.mueff).sqrt();
        let ps_norm = ps.norm();
        let hsig = ps_norm
            / (1.0 - (1.0 - p.cs).powi(2 * (generation as i32 + 1))).sqrt()
            / p.chi_n
            < 1.4 + 2.0 / (n as f64 + 1.0);
        let hsig = if hsig { 1.0 } else { 0.0 };
        pc = &pc * (1.0 - p.cc) + &shift * (hsig * (p.cc * (2.0 - p.cc) * p.mueff).sqrt());

        let mut rank_mu = DMatrix::<f64>::zeros(n, n);
        for (weight, (u, _)) in p.weights.iter().zip(offspring.iter().take(p.mu)) {
            let y = (u - &old_mean) / sigma;
            rank_mu += &y * y.transpose() * *weight;
        }
        c = &c * (1.0 - p.c1 - p.cmu)
            + (&pc * pc.transpose() + &c * ((1.0 - hsig) * p.cc * (2.0 - p.cc))) * p.c1
            + rank_mu * p.cmu;
        c = (&c + c.transpose()) * 0.5;

        sigma *= ((p.cs / p.damps) * (ps_norm / p.chi_n - 1.0)).exp();

        let eigen = SymmetricEigen::new(c.clone());
        b = eigen.eigenvectors;
        d = eigen.eigenvalues.map(|v| v.max(1e-20).sqrt());

        if !sigma.is_finite() || sigma * d.max() < STOP_STEP {
            return Ok(());
        }

        history.push(best_fitness);
        if history.len() > history_length {
            history.remove(0);
        }
        if history.len() == history_length {
            let (lo, hi) = history
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            if hi - lo <= STOP_FLAT * hi.abs().max(1.0) {
                return Ok(());
            }
        }
    }
    Ok(())
}
