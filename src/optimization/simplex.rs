//! Multidirectional simplex search (Torczon), clamped to the bounds.
//!
//! Every iteration reflects all vertices through the best one; a successful reflection is
//! tried again with the expansion coefficient, a failed one is replaced by a contraction
//! toward the best vertex.

use crate::types::{CONVERGENCE_ABSOLUTE_TOL, CONVERGENCE_RELATIVE_TOL};

use super::budget::BudgetedFunction;
use super::types::{StopReason, StrategySettings, ValueChecker};

/// Expansion coefficient.
pub const KHI: f64 = 2.0;

/// Contraction coefficient.
pub const GAMMA: f64 = 0.5;

type Vertex = (Vec<f64>, f64);

fn clamp(x: &mut [f64], lower: &[f64], upper: &[f64]) {
    for ((xi, &lo), &hi) in x.iter_mut().zip(lower).zip(upper) {
        *xi = xi.clamp(lo, hi.max(lo));
    }
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
    let lower = &settings.lower_bounds;
    let upper = &settings.upper_bounds;
    let checker = ValueChecker::new(CONVERGENCE_RELATIVE_TOL, CONVERGENCE_ABSOLUTE_TOL);

    let mut x0 = start.to_vec();
    clamp(&mut x0, lower, upper);
    let f0 = if x0 == start { start_value } else { f.evaluate(&x0)? };

    let mut simplex: Vec<Vertex> = Vec::with_capacity(start.len() + 1);
    simplex.push((x0.clone(), f0));
    for i in 0..start.len() {
        let step = match settings.step_sizes.get(i) {
            Some(&s) if s > 0.0 => s,
            _ => 1e-3 * x0[i].abs().max(1e-3),
        };
        let mut vertex = x0.clone();
        vertex[i] += step;
        if vertex[i] > upper[i] {
            vertex[i] = x0[i] - step;
        }
        clamp(&mut vertex, lower, upper);
        let value = f.evaluate(&vertex)?;
        simplex.push((vertex, value));
    }
    sort(&mut simplex);

    loop {
        let previous: Vec<f64> = simplex.iter().map(|v| v.1).collect();
        let best_value = simplex[0].1;

        let reflected = transform(f, &simplex, 1.0, lower, upper)?;
        simplex = if reflected[0].1 < best_value {
            let expanded = transform(f, &simplex, KHI, lower, upper)?;
            if expanded[0].1 < reflected[0].1 {
                expanded
            } else {
                reflected
            }
        } else {
            transform(f, &simplex, -GAMMA, lower, upper)?
        };

        let converged = previous
            .iter()
            .zip(simplex.iter())
            .all(|(&p, v)| checker.converged(p, v.1));
        if converged || collapsed(&simplex) {
            return Ok(());
        }
    }
}

/// New simplex with vertices `best + coefficient·(best − vertex)`, sorted by value.
fn transform<F>(
    f: &mut BudgetedFunction<F>,
    simplex: &[Vertex],
    coefficient: f64,
    lower: &[f64],
    upper: &[f64],
) -> Result<Vec<Vertex>, StopReason>
where
    F: FnMut(&[f64]) -> Option<f64>,
{
    let best = &simplex[0].0;
    let mut result = Vec::with_capacity(simplex.len());
    result.push(simplex[0].clone());
    for (vertex, _) in &simplex[1..] {
        let mut moved: Vec<f64> = best
            .iter()
            .zip(vertex)
            .map(|(&b, &v)| b + coefficient * (b - v))
            .collect();
        clamp(&mut moved, lower, upper);
        let value = f.evaluate(&moved)?;
        result.push((moved, value));
    }
    sort(&mut result);
    Ok(result)
}

fn sort(simplex: &mut [Vertex]) {
    simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
}

/// All vertices coincide with the best one to rounding.
fn collapsed(simplex: &[Vertex]) -> bool {
    let best = &simplex[0].0;
    simplex[1..].iter().all(|(vertex, _)| {
        vertex
            .iter()
            .zip(best)
            .all(|(&v, &b)| (v - b).abs() <= 1e-14 * (1.0 + b.abs()))
    })
}
