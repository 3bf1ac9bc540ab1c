// =============================================================================
// Moving Average Convergence/Divergence (MACD)
// =============================================================================
//
// MACD line  = EMA(fast) - EMA(slow), defined where both EMAs are.
// Signal     = EMA(signal_period) of the MACD line's defined suffix;
//              warm-up entries stay undefined.
// Histogram  = MACD - Signal, pointwise, undefined if either side is.
// =============================================================================

use crate::indicators::ema::calculate_ema;

/// The three aligned MACD sequences. Each has one entry per input close.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub macd: Vec<Option<f64>>,
    pub signal: Vec<Option<f64>>,
    pub histogram: Vec<Option<f64>>,
}

/// Compute MACD/signal/histogram for the given `closes`.
///
/// The MACD line becomes defined at index `slow - 1`; the signal line at
/// index `slow + signal_period - 2` (it needs `signal_period` defined MACD
/// values to seed its own EMA).
///
/// # Edge cases
/// - Any period of 0, or too few closes for the slow EMA => all `None`.
pub fn calculate_macd(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> MacdSeries {
    let n = closes.len();

    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    let macd: Vec<Option<f64>> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| match (f, s) {
            (Some(f), Some(s)) => Some(f - s),
            _ => None,
        })
        .collect();

    // Signal: an EMA over the defined suffix of the MACD line, written back
    // at the suffix's offset so everything stays aligned to the input.
    let mut signal = vec![None; n];
    if let Some(offset) = macd.iter().position(|v| v.is_some()) {
        let defined: Vec<f64> = macd.iter().flatten().copied().collect();
        for (j, v) in calculate_ema(&defined, signal_period).into_iter().enumerate() {
            signal[offset + j] = v;
        }
    }

    let histogram: Vec<Option<f64>> = macd
        .iter()
        .zip(signal.iter())
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => Some(m - s),
            _ => None,
        })
        .collect();

    MacdSeries {
        macd,
        signal,
        histogram,
    }
}
