//! Univariate Brent methods: bounded minimization, bracketing and root finding.
//!
//! All routines take a fallible function so that a stop request from the evaluation
//! budget (or any other error) propagates immediately through `?`.

const GOLDEN: f64 = 0.381_966_011_250_105_1;
const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;
const MAX_ITERATIONS: usize = 500;

/// Result of a univariate minimization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnivariatePoint {
    pub x: f64,
    pub value: f64,
}

/// Brent's bounded minimizer on `[lo, hi]`, started from `start` when it lies inside.
///
/// Stops when the bracket shrinks to `2·(rel_tol·|x| + abs_tol)` around the best point.
///
/// # Arguments
/// * `f` - Function to minimize
/// * `lo`, `hi` - Search interval
/// * `start` - Optional first point (defaults to the golden-section point)
/// * `rel_tol`, `abs_tol` - Convergence tolerances on x
pub fn brent_minimize<E, F>(
    mut f: F,
    lo: f64,
    hi: f64,
    start: Option<f64>,
    rel_tol: f64,
    abs_tol: f64,
) -> Result<UnivariatePoint, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let (mut a, mut b) = if lo <= hi { (lo, hi) } else { (hi, lo) };

    let mut x = match start {
        Some(s) if s >= a && s <= b => s,
        _ => a + GOLDEN * (b - a),
    };
    let mut fx = f(x)?;
    let (mut w, mut v) = (x, x);
    let (mut fw, mut fv) = (fx, fx);
    let mut d: f64 = 0.0;
    let mut e: f64 = 0.0;

    for _ in 0..MAX_ITERATIONS {
        let mid = 0.5 * (a + b);
        let tol1 = rel_tol * x.abs() + abs_tol;
        let tol2 = 2.0 * tol1;
        if (x - mid).abs() <= tol2 - 0.5 * (b - a) {
            break;
        }

        let mut golden_step = true;
        if e.abs() > tol1 {
            // Parabolic fit through x, w, v.
            let r = (x - w) * (fx - fv);
            let mut q = (x - v) * (fx - fw);
            let mut p = (x - v) * q - (x - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            } else {
                q = -q;
            }
            let previous_e = e;
            e = d;
            if p.abs() < (0.5 * q * previous_e).abs() && p > q * (a - x) && p < q * (b - x) {
                d = p / q;
                let u = x + d;
                if u - a < tol2 || b - u < tol2 {
                    d = if x <= mid { tol1 } else { -tol1 };
                }
                golden_step = false;
            }
        }
        if golden_step {
            e = if x < mid { b - x } else { a - x };
            d = GOLDEN * e;
        }

        let u = if d.abs() >= tol1 {
            x + d
        } else if d > 0.0 {
            x + tol1
        } else {
            x - tol1
        };
        let fu = f(u)?;

        if fu <= fx {
            if u < x {
                b = x;
            } else {
                a = x;
            }
            v = w;
            fv = fw;
            w = x;
            fw = fx;
            x = u;
            fx = fu;
        } else {
            if u < x {
                a = u;
            } else {
                b = u;
            }
            if fu <= fw || w == x {
                v = w;
                fv = fw;
                w = u;
                fw = fu;
            } else if fu <= fv || v == x || v == w {
                v = u;
                fv = fu;
            }
        }
    }

    Ok(UnivariatePoint { x, value: fx })
}

/// Bracket a minimum starting from the interval `[a, b]`, expanding downhill.
///
/// Returns `(lo, mid, hi)` with `f(mid)` not above either end, or the best point seen
/// after `max_expansions` golden expansions.
pub fn bracket_minimum<E, F>(
    mut f: F,
    a: f64,
    b: f64,
    max_expansions: usize,
) -> Result<(f64, f64, f64), E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    let (mut a, mut b) = (a, b);
    let mut fa = f(a)?;
    let mut fb = f(b)?;
    if fb > fa {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut fa, &mut fb);
    }
    let mut c = b + GOLDEN_RATIO * (b - a);
    let mut fc = f(c)?;

    let mut expansions = 0;
    while fb > fc && expansions < max_expansions {
        a = b;
        b = c;
        fb = fc;
        c = b + GOLDEN_RATIO * (b - a);
        fc = f(c)?;
        expansions += 1;
    }

    Ok(if a < c { (a, b, c) } else { (c, b, a) })
}

/// Brent's root finder on a bracket `[a, b]` with known end values of opposite sign.
///
/// Returns `None` if the end values do not bracket a root.
pub fn brent_find_root<E, F>(
    mut f: F,
    a: f64,
    b: f64,
    fa: f64,
    fb: f64,
    abs_tol: f64,
) -> Result<Option<f64>, E>
where
    F: FnMut(f64) -> Result<f64, E>,
{
    if fa == 0.0 {
        return Ok(Some(a));
    }
    if fb == 0.0 {
        return Ok(Some(b));
    }
    if fa * fb > 0.0 || !fa.is_finite() || !fb.is_finite() {
        return Ok(None);
    }

    let (mut a, mut b, mut fa, mut fb) = (a, b, fa, fb);
    let (mut c, mut fc) = (a, fa);
    let mut d = b - a;
    let mut e = d;

    for _ in 0..MAX_ITERATIONS {
        if fb * fc > 0.0 {
            c = a;
            fc = fa;
            d = b - a;
            e = d;
        }
        if fc.abs() < fb.abs() {
            a = b;
            b = c;
            c = a;
            fa = fb;
            fb = fc;
            fc = fa;
        }

        let tol = 2.0 * f64::EPSILON * b.abs() + 0.5 * abs_tol;
        let m = 0.5 * (c - b);
        if m.abs() <= tol || fb == 0.0 {
            return Ok(Some(b));
        }

        if e.abs() < tol || fa.abs() <= fb.abs() {
            d = m;
            e = m;
        } else {
            let s = fb / fa;
            let (mut p, mut q);
            if a == c {
                // Secant step
                p = 2.0 * m * s;
                q = 1.0 - s;
            } else {
                // Inverse quadratic interpolation
                let qa = fa / fc;
                let r = fb / fc;
                p = s * (2.0 * m * qa * (qa - r) - (b - a) * (r - 1.0));
                q = (qa - 1.0) * (r - 1.0) * (s - 1.0);
            }
            if p > 0.0 {
                q = -q;
            } else {
                p = -p;
            }
            if 2.0 * p < (3.0 * m * q - (tol * q).abs()).min((e * q).abs()) {
                e = d;
                d = p / q;
            } else {
                d = m;
                e = m;
            }
        }

        a = b;
        fa = fb;
        b += if d.abs() > tol {
            d
        } else if m > 0.0 {
            tol
        } else {
            -tol
        };
        fb = f(b)?;
    }

    Ok(Some(b))
}
