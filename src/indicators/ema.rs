// =============================================================================
// Exponential Moving Average (EMA)
// =============================================================================
//
// EMA gives more weight to recent prices, making it more responsive to new
// information than the SMA.
//
// Formula:
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// Seeding: the value at index `period - 1` is the SMA of the first `period`
// closes; the exponential recurrence runs from there.
// =============================================================================

use crate::indicators::mean;

/// Compute the EMA series for the given `closes` and `period`, aligned 1:1
/// with the input. The first `period - 1` entries are `None`; index
/// `period - 1` carries the SMA seed.
///
/// # Edge cases
/// - `period == 0` => all `None` (division-by-zero guard)
/// - `closes.len() < period` => all `None`
pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < period {
        return out;
    }

    let multiplier = 2.0 / (period + 1) as f64;

    let seed = mean(&closes[..period]);
    out[period - 1] = Some(seed);

    let mut prev = seed;
    for i in period..closes.len() {
        let ema = closes[i] * multiplier + prev * (1.0 - multiplier);
        out[i] = Some(ema);
        prev = ema;
    }

    out
}
