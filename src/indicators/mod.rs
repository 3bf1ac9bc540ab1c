// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator implementations over a candle window.
// Every function returns a sequence aligned 1:1 with its input: entry `i`
// describes bar `i`, and `None` marks the warm-up span (or a locally
// undefined value such as a zero-width band). The single exception is
// `atr::calculate_atr_ratio`, which compacts its output - see its docs.
//
// Alignment holds even for inputs shorter than the look-back period: such
// calls return an all-`None` sequence of input length, never an empty vec.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod momentum;
pub mod roc;
pub mod rsi;
pub mod sma;
pub mod stochastic;
pub mod volume;

/// Arithmetic mean of a slice. 0.0 for an empty slice (callers guard length).
pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
