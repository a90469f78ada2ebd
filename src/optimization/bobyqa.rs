//! Bound-constrained trust-region search on a quadratic interpolation model.
//!
//! A least-squares quadratic is fitted through `m` points around the best point, in
//! coordinates scaled by the trust-region radius. The model step is a projected gradient
//! descent inside the bounds and the unit ball. The radius shrinks when the model
//! predicts badly and grows when a full-length step succeeds; the run converges once
//! the radius falls below a fixed fraction of its initial value.

use nalgebra::{DMatrix, DVector};

use crate::types::TRUST_REGION_STOP_FRACTION;

use super::budget::BudgetedFunction;
use super::types::{StopReason, StrategySettings};

const SHRINK_RATIO: f64 = 0.1;
const EXPAND_RATIO: f64 = 0.7;
/// Scaled steps shorter than this count as a failed model step.
const MIN_STEP: f64 = 1e-3;
const SVD_EPS: f64 = 1e-10;

type Sample = (Vec<f64>, f64);

/// Quadratic model `g·u + ½ uᵀHu` relative to the centre point.
#[derive(Debug, Clone)]
struct QuadraticModel {
    gradient: DVector<f64>,
    hessian: DMatrix<f64>,
}

impl QuadraticModel {
    fn predict(&self, u: &DVector<f64>) -> f64 {
        self.gradient.dot(u) + 0.5 * u.dot(&(&self.hessian * u))
    }
}

/// Number of interpolation points actually used for `n` dimensions.
pub fn interpolation_points(n: usize, requested: usize) -> usize {
    requested.clamp(n + 2, (n + 1) * (n + 2) / 2)
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

    let mut delta = settings.initial_trust_region_radius;
    if !(delta > 0.0 && delta.is_finite()) {
        delta = 1e-3;
    }
    let delta_end = TRUST_REGION_STOP_FRACTION * delta;
    let widest = lower
        .iter()
        .zip(upper)
        .map(|(lo, hi)| hi - lo)
        .filter(|r| r.is_finite())
        .fold(0.0, f64::max);
    let delta_max = if widest > 0.0 { widest } else { 1e3 * delta };

    let mut x0 = start.to_vec();
    clamp(&mut x0, lower, upper);
    let f0 = if x0 == start { start_value } else { f.evaluate(&x0)? };

    let m = interpolation_points(n, settings.nr_interpolations);
    let mut points = initial_design(f, (x0, f0), delta, m, lower, upper)?;
    let mut refreshes = 0usize;

    loop {
        if delta < delta_end {
            return Ok(());
        }
        let best = best_index(&points);
        let (centre, centre_value) = points[best].clone();

        let Some(model) = fit_model(&points, &centre, centre_value, delta) else {
            delta *= 0.5;
            refresh_geometry(f, &mut points, delta, &mut refreshes, lower, upper)?;
            continue;
        };

        let lower_u = DVector::from_iterator(
            n,
            lower.iter().zip(&centre).map(|(lo, c)| (lo - c) / delta),
        );
        let upper_u = DVector::from_iterator(
            n,
            upper.iter().zip(&centre).map(|(hi, c)| (hi - c) / delta),
        );
        let u = trust_region_step(&model, &lower_u, &upper_u);
        let predicted = -model.predict(&u);
        let step_norm = u.norm();

        if predicted.is_nan() || predicted <= 0.0 || step_norm < MIN_STEP {
            delta *= 0.5;
            refresh_geometry(f, &mut points, delta, &mut refreshes, lower, upper)?;
            continue;
        }

        let mut trial: Vec<f64> = centre
            .iter()
            .zip(u.iter())
            .map(|(c, ui)| c + delta * ui)
            .collect();
        clamp(&mut trial, lower, upper);
        let trial_value = f.evaluate(&trial)?;
        let ratio = (centre_value - trial_value) / predicted;

        let far = farthest_index(&points, &centre, best);
        points[far] = (trial, trial_value);

        if ratio < SHRINK_RATIO {
            delta *= 0.5;
            refresh_geometry(f, &mut points, delta, &mut refreshes, lower, upper)?;
        } else if ratio > EXPAND_RATIO && step_norm > 0.9 {
            delta = (2.0 * delta).min(delta_max);
        }
    }
}

fn clamp(x: &mut [f64], lower: &[f64], upper: &[f64]) {
    for ((xi, &lo), &hi) in x.iter_mut().zip(lower).zip(upper) {
        *xi = xi.clamp(lo, hi.max(lo));
    }
}

/// `base` moved by `amount` along `axis`, flipped if that leaves the box.
fn offset(base: &[f64], axis: usize, amount: f64, lower: &[f64], upper: &[f64]) -> Vec<f64> {
    let mut x = base.to_vec();
    x[axis] += amount;
    if x[axis] > upper[axis] || x[axis] < lower[axis] {
        x[axis] = base[axis] - amount;
    }
    clamp(&mut x, lower, upper);
    x
}

fn initial_design<F>(
    f: &mut BudgetedFunction<F>,
    start: Sample,
    delta: f64,
    m: usize,
    lower: &[f64],
    upper: &[f64],
) -> Result<Vec<Sample>, StopReason>
where
    F: FnMut(&[f64]) -> Option<f64>,
{
    let n = start.0.len();
    let x0 = start.0.clone();
    let mut candidates = Vec::with_capacity(m);
    for i in 0..n {
        candidates.push(offset(&x0, i, delta, lower, upper));
    }
    for i in 0..n {
        candidates.push(offset(&x0, i, -delta, lower, upper));
    }
    for i in 0..n {
        for j in (i + 1)..n {
            let x = offset(&x0, i, delta, lower, upper);
            candidates.push(offset(&x, j, delta, lower, upper));
        }
    }

    let mut points = Vec::with_capacity(m);
    points.push(start);
    for x in candidates.into_iter().take(m - 1) {
        let value = f.evaluate(&x)?;
        points.push((x, value));
    }
    Ok(points)
}

fn best_index(points: &[Sample]) -> usize {
    points
        .iter()
        .enumerate()
        .min_by(|a, b| a.1 .1.total_cmp(&b.1 .1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn farthest_index(points: &[Sample], centre: &[f64], skip: usize) -> usize {
    points
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != skip)
        .max_by(|a, b| distance(&a.1 .0, centre).total_cmp(&distance(&b.1 .0, centre)))
        .map(|(i, _)| i)
        .unwrap_or(skip)
}

/// Replace the point farthest from the best one by a coordinate step, if it lies
/// outside twice the current radius.
fn refresh_geometry<F>(
    f: &mut BudgetedFunction<F>,
    points: &mut [Sample],
    delta: f64,
    counter: &mut usize,
    lower: &[f64],
    upper: &[f64],
) -> Result<(), StopReason>
where
    F: FnMut(&[f64]) -> Option<f64>,
{
    let best = best_index(points);
    let centre = points[best].0.clone();
    let far = farthest_index(points, &centre, best);
    if far == best || distance(&points[far].0, &centre) <= 2.0 * delta {
        return Ok(());
    }

    let n = centre.len();
    let axis = *counter % n;
    let sign = if (*counter / n) % 2 == 0 { 1.0 } else { -1.0 };
    *counter += 1;

    let x = offset(&centre, axis, sign * delta, lower, upper);
    if x == centre {
        return Ok(());
    }
    let value = f.evaluate(&x)?;
    points[far] = (x, value);
    Ok(())
}

/// Quadratic basis in column order: constant, linear, squares, cross terms.
fn features(u: &[f64], columns: usize) -> Vec<f64> {
    let mut row = Vec::with_capacity(columns);
    row.push(1.0);
    row.extend_from_slice(u);
    row.extend(u.iter().map(|v| 0.5 * v * v));
    for i in 0..u.len() {
        for j in (i + 1)..u.len() {
            row.push(u[i] * u[j]);
        }
    }
    row.truncate(columns);
    row
}

fn fit_model(
    points: &[Sample],
    centre: &[f64],
    centre_value: f64,
    delta: f64,
) -> Option<QuadraticModel> {
    let n = centre.len();
    let usable: Vec<&Sample> = points.iter().filter(|(_, v)| v.is_finite()).collect();
    let full = 1 + 2 * n + n * n.saturating_sub(1) / 2;
    let columns = usable.len().min(full);
    if columns < 2 {
        return None;
    }

    let mut a = DMatrix::<f64>::zeros(usable.len(), columns);
    let mut b = DVector::<f64>::zeros(usable.len());
    for (row, (x, value)) in usable.iter().enumerate() {
        let u: Vec<f64> = x.iter().zip(centre).map(|(xi, c)| (xi - c) / delta).collect();
        for (col, feature) in features(&u, columns).into_iter().enumerate() {
            a[(row, col)] = feature;
        }
        b[row] = value - centre_value;
    }

    let coefficients = a.svd(true, true).solve(&b, SVD_EPS).ok()?;
    if coefficients.iter().any(|c| !c.is_finite()) {
        return None;
    }

    let coefficient = |k: usize| if k < columns { coefficients[k] } else { 0.0 };
    let gradient = DVector::from_fn(n, |i, _| coefficient(1 + i));
    let mut hessian = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        hessian[(i, i)] = coefficient(1 + n + i);
    }
    let mut k = 1 + 2 * n;
    for i in 0..n {
        for j in (i + 1)..n {
            hessian[(i, j)] = coefficient(k);
            hessian[(j, i)] = coefficient(k);
            k += 1;
        }
    }
    Some(QuadraticModel { gradient, hessian })
}

/// Clip to the box, then pull back into the unit ball. The box contains the origin.
fn project(v: DVector<f64>, lower: &DVector<f64>, upper: &DVector<f64>) -> DVector<f64> {
    let mut clipped = v.zip_zip_map(lower, upper, |x, lo, hi| x.clamp(lo, hi.max(lo)));
    let norm = clipped.norm();
    if norm > 1.0 {
        clipped /= norm;
    }
    clipped
}

fn trust_region_step(
    model: &QuadraticModel,
    lower: &DVector<f64>,
    upper: &DVector<f64>,
) -> DVector<f64> {
    let n = model.gradient.len();
    let curvature = model
        .hessian
        .row_iter()
        .map(|row| row.iter().map(|h| h.abs()).sum::<f64>())
        .fold(0.0, f64::max);
    let base_step = 1.0 / curvature.max(1e-8);

    let mut u = DVector::<f64>::zeros(n);
    let mut value = 0.0;
    for _ in 0..200 {
        let gradient = &model.gradient + &model.hessian * &u;
        let mut step = base_step;
        let mut moved = None;
        for _ in 0..40 {
            let candidate = project(&u - &gradient * step, lower, upper);
            let candidate_value = model.predict(&candidate);
            if candidate_value < value {
                moved = Some((candidate, candidate_value));
                break;
            }
            step *= 0.5;
        }
        match moved {
            Some((candidate, candidate_value)) => {
                let length = (&candidate - &u).norm();
                u = candidate;
                value = candidate_value;
                if length < 1e-10 {
                    break;
                }
            }
            None => break,
        }
    }
    u
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(n: usize, lo: f64, hi: f64) -> StrategySettings {
        StrategySettings {
            lower_bounds: vec![lo; n],
            upper_bounds: vec![hi; n],
            max_evaluations: 3000,
            step_sizes: vec![0.2 * (hi - lo); n],
            std_dev: vec![0.2 * (hi - lo); n],
            nr_interpolations: 2 * n + 1,
            initial_trust_region_radius: 0.25 * (hi - lo),
            seed: 0,
        }
    }

    #[test]
    fn interpolation_count_is_clamped() {
        assert_eq!(interpolation_points(3, 7), 7);
        assert_eq!(interpolation_points(3, 1), 5);
        assert_eq!(interpolation_points(3, 100), 10);
    }

    #[test]
    fn fits_exact_separable_quadratic() {
        let centre = vec![0.0, 0.0];
        let value = |x: &[f64]| 3.0 * x[0] - x[1] + 2.0 * x[0] * x[0] + 0.5 * x[1] * x[1];
        let points: Vec<Sample> = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [-1.0, 0.0], [0.0, -1.0]]
            .iter()
            .map(|p| (p.to_vec(), value(p)))
            .collect();
        let model = fit_model(&points, &centre, 0.0, 1.0).unwrap();
        assert!((model.gradient[0] - 3.0).abs() < 1e-9);
        assert!((model.gradient[1] + 1.0).abs() < 1e-9);
        assert!((model.hessian[(0, 0)] - 4.0).abs() < 1e-9);
        assert!((model.hessian[(1, 1)] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn step_respects_box_and_ball() {
        let model = QuadraticModel {
            gradient: DVector::from_vec(vec![-1.0, -1.0]),
            hessian: DMatrix::zeros(2, 2),
        };
        let lower = DVector::from_vec(vec![-1.0, -1.0]);
        let upper = DVector::from_vec(vec![0.25, 1.0]);
        let u = trust_region_step(&model, &lower, &upper);
        assert!(u[0] <= 0.25 + 1e-12);
        assert!(u.norm() <= 1.0 + 1e-12);
        assert!(model.predict(&u) < 0.0);
    }

    #[test]
    fn converges_on_shifted_bowl() {
        let mut f = BudgetedFunction::new(
            |x: &[f64]| {
                Some((x[0] - 0.3).powi(2) + 2.0 * (x[1] + 0.2).powi(2) + (x[2] - 0.1).powi(2))
            },
            3000,
        );
        let start = [1.0, 1.0, 1.0];
        let v0 = f.evaluate(&start).unwrap();
        assert_eq!(minimize(&mut f, &start, v0, &settings(3, -2.0, 2.0)), Ok(()));
        let best = f.best_point().unwrap();
        assert!((best[0] - 0.3).abs() < 1e-3, "{:?}", best);
        assert!((best[1] + 0.2).abs() < 1e-3, "{:?}", best);
        assert!((best[2] - 0.1).abs() < 1e-3, "{:?}", best);
    }

    #[test]
    fn minimum_on_the_boundary() {
        let mut f = BudgetedFunction::new(
            |x: &[f64]| {
                assert!(x.iter().all(|&v| (0.0..=1.0).contains(&v)));
                Some((x[0] - 2.0).powi(2) + (x[1] - 0.5).powi(2))
            },
            3000,
        );
        let start = [0.2, 0.2];
        let v0 = f.evaluate(&start).unwrap();
        let _ = minimize(&mut f, &start, v0, &settings(2, 0.0, 1.0));
        let best = f.best_point().unwrap();
        assert!((best[0] - 1.0).abs() < 1e-3, "{:?}", best);
        assert!((best[1] - 0.5).abs() < 1e-2, "{:?}", best);
    }

    #[test]
    fn budget_is_respected() {
        let mut f = BudgetedFunction::new(|x: &[f64]| Some(x[0] * x[0] + x[1] * x[1]), 4);
        let start = [1.0, 1.0];
        let v0 = f.evaluate(&start).unwrap();
        let result = minimize(&mut f, &start, v0, &settings(2, -2.0, 2.0));
        assert_eq!(result, Err(StopReason::MaxEvaluations));
        assert_eq!(f.evaluations(), 4);
        assert!(f.best_value() <= v0);
    }
}
