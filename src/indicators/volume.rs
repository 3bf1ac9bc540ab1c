// =============================================================================
// Volume Ratio
// =============================================================================
//
// Current volume divided by the mean volume of the trailing `window` bars.
// Already a ratio, so no further normalization is applied downstream.
// =============================================================================

use crate::bar::Bar;
use crate::indicators::mean;

/// Compute the volume-ratio series for the given `bars`, aligned 1:1 with
/// the input. The first `window - 1` entries are `None`.
///
/// # Edge cases
/// - `window == 0` => all `None`
/// - Non-positive trailing mean => 0.0 for that entry (documented fallback).
pub fn calculate_volume_ratio(bars: &[Bar], window: usize) -> Vec<Option<f64>> {
    let volumes: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let mut out = vec![None; volumes.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..volumes.len() {
        let avg = mean(&volumes[i + 1 - window..=i]);
        out[i] = Some(if avg > 0.0 { volumes[i] / avg } else { 0.0 });
    }
    out
}
