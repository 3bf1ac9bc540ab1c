// =============================================================================
// Average True Range (ATR) - Wilder's Smoothing Method
// =============================================================================
//
// True Range (TR) for each bar:
//   TR = max(H - L, |H - prevClose|, |L - prevClose|)
//
// ATR is then the smoothed average of TR using Wilder's method:
//   ATR_seed = SMA of the first `period` TR values
//   ATR_t    = (ATR_{t-1} * (period - 1) + TR_t) / period
// =============================================================================

use crate::bar::Bar;
use crate::indicators::mean;

/// Compute the ATR series for the given `bars` (oldest first), aligned 1:1
/// with the input. The first `period` entries are `None` (each TR needs a
/// previous close, and the seed consumes `period` TR values).
///
/// # Edge cases
/// - `period == 0` => all `None`
/// - `bars.len() < period + 1` => all `None`
pub fn calculate_atr(bars: &[Bar], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; bars.len()];
    if period == 0 || bars.len() < period + 1 {
        return out;
    }

    let mut tr_values: Vec<f64> = Vec::with_capacity(bars.len() - 1);
    for i in 1..bars.len() {
        let high = bars[i].high;
        let low = bars[i].low;
        let prev_close = bars[i - 1].close;

        let hl = high - low;
        let hc = (high - prev_close).abs();
        let lc = (low - prev_close).abs();
        tr_values.push(hl.max(hc).max(lc));
    }

    let seed = mean(&tr_values[..period]);
    out[period] = Some(seed);

    let period_f = period as f64;
    let mut atr = seed;
    for (i, &tr) in tr_values.iter().enumerate().skip(period) {
        atr = (atr * (period_f - 1.0) + tr) / period_f;
        out[i + 1] = Some(atr);
    }

    out
}

/// Ratio of the current ATR to the mean ATR of the trailing `window`,
/// computed over the contiguous run of defined, strictly positive ATR
/// values only.
///
/// Undefined or zero ATR entries are skipped, not treated as zero, so the
/// result is a **compacted** sequence that is generally shorter than the
/// input - the one deliberate exception to the aligned-length convention,
/// kept for compatibility with downstream consumers. An aligned variant
/// would emit `None` for every skipped slot instead.
///
/// Empty when fewer than `window` valid ATR points exist.
pub fn calculate_atr_ratio(bars: &[Bar], atr_period: usize, window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }

    let valid: Vec<f64> = calculate_atr(bars, atr_period)
        .into_iter()
        .flatten()
        .filter(|v| *v > 0.0)
        .collect();

    if valid.len() < window {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(valid.len() - window + 1);
    for i in (window - 1)..valid.len() {
        let avg = mean(&valid[i + 1 - window..=i]);
        out.push(if avg > 0.0 { valid[i] / avg } else { 1.0 });
    }
    out
}
