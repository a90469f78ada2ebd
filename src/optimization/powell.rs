//! Powell's conjugate direction method.
//!
//! Unbounded: the objective itself rejects geometry it cannot evaluate. Line searches
//! bracket downhill then refine with Brent's method.

use crate::types::{POWELL_ABSOLUTE_TOL, POWELL_RELATIVE_TOL};

use super::budget::BudgetedFunction;
use super::types::{StopReason, StrategySettings};
use super::univariate::{bracket_minimum, brent_minimize};

/// Line search tolerances, in units of the search direction.
const LINE_RELATIVE_TOL: f64 = 1e-4;
const LINE_ABSOLUTE_TOL: f64 = 1e-6;

/// Golden expansions allowed while bracketing a line minimum.
const MAX_BRACKET_EXPANSIONS: usize = 6;

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
    let mut directions: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let step = match settings.step_sizes.get(i) {
                Some(&s) if s > 0.0 => s,
                _ => 1e-3 * start[i].abs().max(1e-3),
            };
            let mut direction = vec![0.0; n];
            direction[i] = step;
            direction
        })
        .collect();

    let mut x = start.to_vec();
    let mut fx = start_value;

    loop {
        let x_start = x.clone();
        let f_start = fx;
        let mut biggest = 0;
        let mut biggest_drop = 0.0;

        for (i, direction) in directions.iter().enumerate() {
            let f_before = fx;
            line_search(f, &mut x, &mut fx, direction)?;
            if f_before - fx > biggest_drop {
                biggest_drop = f_before - fx;
                biggest = i;
            }
        }

        if 2.0 * (f_start - fx)
            <= POWELL_RELATIVE_TOL * (f_start.abs() + fx.abs()) + POWELL_ABSOLUTE_TOL
        {
            return Ok(());
        }

        let new_direction: Vec<f64> = x.iter().zip(&x_start).map(|(a, b)| a - b).collect();
        let extrapolated: Vec<f64> = x.iter().zip(&x_start).map(|(a, b)| 2.0 * a - b).collect();
        let f_extrapolated = f.evaluate(&extrapolated)?;

        if f_extrapolated < f_start {
            let t = 2.0 * (f_start - 2.0 * fx + f_extrapolated)
                * (f_start - fx - biggest_drop).powi(2)
                - biggest_drop * (f_start - f_extrapolated).powi(2);
            if t < 0.0 {
                line_search(f, &mut x, &mut fx, &new_direction)?;
                directions[biggest] = directions[n - 1].clone();
                directions[n - 1] = new_direction;
            }
        }
    }
}

/// Move `x` to the minimum along `direction`, updating `fx`.
fn line_search<F>(
    f: &mut BudgetedFunction<F>,
    x: &mut Vec<f64>,
    fx: &mut f64,
    direction: &[f64],
) -> Result<(), StopReason>
where
    F: FnMut(&[f64]) -> Option<f64>,
{
    if direction.iter().all(|&d| d == 0.0) {
        return Ok(());
    }
    let origin = x.clone();
    let origin_value = *fx;
    let mut seen: Vec<(f64, f64)> = vec![(0.0, origin_value)];

    let mut along = |t: f64| -> Result<f64, StopReason> {
        if let Some(&(_, value)) = seen.iter().find(|(s, _)| *s == t) {
            return Ok(value);
        }
        let point: Vec<f64> = origin.iter().zip(direction).map(|(o, d)| o + t * d).collect();
        let value = f.evaluate(&point)?;
        seen.push((t, value));
        Ok(value)
    };

    let (lo, mid, hi) = bracket_minimum(&mut along, 0.0, 1.0, MAX_BRACKET_EXPANSIONS)?;
    let best = brent_minimize(
        &mut along,
        lo,
        hi,
        Some(mid),
        LINE_RELATIVE_TOL,
        LINE_ABSOLUTE_TOL,
    )?;

    if best.value < origin_value {
        for (xi, (o, d)) in x.iter_mut().zip(origin.iter().zip(direction)) {
            *xi = o + best.x * d;
        }
        *fx = best.value;
    }
    Ok(())
}
