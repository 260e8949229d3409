/// log(0). The identity element of `log_add`.
pub const LOG_ZERO: f64 = f64::NEG_INFINITY;

/// Addition of two probabilities in log space, `log(exp(a) + exp(b))`.
///
/// With `a >= b`:
///
/// ```text
/// log(exp(a) + exp(b))
///  = a + log(1 + exp(b - a))
/// ```
///
/// If either operand is `LOG_ZERO` the other one is returned unchanged.
#[inline]
pub fn log_add(a: f64, b: f64) -> f64 {
    let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
    if lo == LOG_ZERO {
        hi
    } else {
        hi + (lo - hi).exp().ln_1p()
    }
}

/// log-sum-exp over an iterator of log values; `LOG_ZERO` for an empty one.
pub fn log_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().fold(LOG_ZERO, log_add)
}
