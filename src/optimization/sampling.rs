//! Start-point designs over box bounds for multi-start runs.
//!
//! The random samplers take their generator as an argument; a seeded `StdRng` gives the
//! same starts on every run.

use rand::seq::SliceRandom;
use rand::Rng;

/// Uniform draw from `[lo, hi)`, or `lo` for an empty range.
fn uniform<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}

/// Latin hypercube design: every dimension is cut into `n_samples` equal strata and each
/// stratum holds exactly one sample.
pub fn latin_hypercube_sample<R: Rng + ?Sized>(
    bounds: &[(f64, f64)],
    n_samples: usize,
    rng: &mut R,
) -> Vec<Vec<f64>> {
    if n_samples == 0 || bounds.is_empty() {
        return Vec::new();
    }

    // Stratum order per dimension
    let permutations: Vec<Vec<usize>> = bounds
        .iter()
        .map(|_| {
            let mut perm: Vec<usize> = (0..n_samples).collect();
            perm.shuffle(rng);
            perm
        })
        .collect();

    (0..n_samples)
        .map(|i| {
            permutations
                .iter()
                .zip(bounds)
                .map(|(perm, &(lo, hi))| {
                    let stratum = (hi - lo) / n_samples as f64;
                    lo + (perm[i] as f64 + uniform(rng, 0.0, 1.0)) * stratum
                })
                .collect()
        })
        .collect()
}

/// Independent uniform draws inside the bounds.
pub fn random_sample<R: Rng + ?Sized>(
    bounds: &[(f64, f64)],
    n_samples: usize,
    rng: &mut R,
) -> Vec<Vec<f64>> {
    if bounds.is_empty() || n_samples == 0 {
        return Vec::new();
    }

    (0..n_samples)
        .map(|_| bounds.iter().map(|&(lo, hi)| uniform(rng, lo, hi)).collect())
        .collect()
}

/// Exactly `n_samples` points spread evenly over the smallest grid that holds them.
pub fn grid_subset(bounds: &[(f64, f64)], n_samples: usize) -> Vec<Vec<f64>> {
    if bounds.is_empty() || n_samples == 0 {
        return Vec::new();
    }
    let n_dims = bounds.len() as u32;
    let mut per_dim = 1usize;
    while per_dim.saturating_pow(n_dims) < n_samples {
        per_dim += 1;
    }
    let total = per_dim.saturating_pow(n_dims);
    let stride = total as f64 / n_samples as f64;
    (0..n_samples)
        .map(|i| {
            // Decode the grid index digit by digit instead of building the whole grid
            let mut index = ((i as f64 * stride) as usize).min(total - 1);
            bounds
                .iter()
                .map(|&(lo, hi)| {
                    let digit = index % per_dim;
                    index /= per_dim;
                    if per_dim == 1 {
                        (lo + hi) / 2.0
                    } else {
                        lo + (digit as f64) * (hi - lo) / ((per_dim - 1) as f64)
                    }
                })
                .collect()
        })
        .collect()
}
