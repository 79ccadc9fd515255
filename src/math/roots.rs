//! Bracketing root finder for monotone scalar equations.
//!
//! The closed-form-free MLEs (Gamma shape, Weibull shape) reduce to a single
//! monotone equation in a positive parameter, so a bracket-expanding bisection
//! is both sufficient and robust.

/// Maximum number of times the upper bracket is doubled.
const MAX_EXPAND: usize = 200;

/// Find a root of `f` on `(lo, hi)` by bisection.
///
/// `f(lo)` and `f(hi)` must have opposite signs. If they do not, `hi` is
/// doubled until they do (up to a fixed cap). Returns `None` when no sign
/// change is found or `f` produces a non-finite value.
pub fn bisect<F: Fn(f64) -> f64>(f: F, lo: f64, mut hi: f64, rtol: f64, max_iter: usize) -> Option<f64> {
    let mut lo = lo;
    let f_lo = f(lo);
    if !f_lo.is_finite() {
        return None;
    }
    if f_lo == 0.0 {
        return Some(lo);
    }

    let mut f_hi = f(hi);
    let mut expand = 0usize;
    while f_hi.is_finite() && f_hi.signum() == f_lo.signum() && f_hi != 0.0 && expand < MAX_EXPAND {
        lo = hi;
        hi *= 2.0;
        f_hi = f(hi);
        expand += 1;
    }
    if !f_hi.is_finite() || (f_hi.signum() == f_lo.signum() && f_hi != 0.0) {
        return None;
    }
    if f_hi == 0.0 {
        return Some(hi);
    }

    let lo_sign = f(lo).signum();
    for _ in 0..max_iter {
        let mid = 0.5 * (lo + hi);
        let f_mid = f(mid);
        if !f_mid.is_finite() {
            return None;
        }
        if f_mid == 0.0 || (hi - lo) <= rtol * mid.abs().max(f64::MIN_POSITIVE) {
            return Some(mid);
        }
        if f_mid.signum() == lo_sign {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Some(0.5 * (lo + hi))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_square_root() {
        let r = bisect(|x| x * x - 2.0, 0.0, 1.0, 1e-14, 200).unwrap();
        assert!((r - 2.0f64.sqrt()).abs() < 1e-10, "got {r}");
    }

    #[test]
    fn expands_upper_bracket() {
        let r = bisect(|x| 1000.0 - x, 1.0, 2.0, 1e-12, 200).unwrap();
        assert!((r - 1000.0).abs() < 1e-6, "got {r}");
    }

    #[test]
    fn no_sign_change_is_none() {
        assert!(bisect(|x| x * x + 1.0, 0.0, 1.0, 1e-12, 100).is_none());
    }
}
