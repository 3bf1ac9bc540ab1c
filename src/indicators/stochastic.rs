// =============================================================================
// Stochastic Oscillator
// =============================================================================
//
// %K = 100 * (close - min(low, k_period)) / (max(high, k_period) - min(low, k_period))
// %D = SMA(d_period) of %K
//
// A zero high-low range defaults %K to 50.0 (mid-scale, no information).
// %D is undefined whenever any %K in its window is undefined.
// =============================================================================

use crate::bar::Bar;

/// The two aligned stochastic sequences. Each has one entry per input bar.
#[derive(Debug, Clone, PartialEq)]
pub struct StochasticSeries {
    pub k: Vec<Option<f64>>,
    pub d: Vec<Option<f64>>,
}

/// Compute the stochastic oscillator for the given `bars` (oldest first).
///
/// %K becomes defined at index `k_period - 1`; %D at
/// `k_period + d_period - 2`.
///
/// # Edge cases
/// - `k_period == 0` or `d_period == 0` => all `None`
/// - Zero range in the %K window => 50.0
pub fn calculate_stochastic(bars: &[Bar], k_period: usize, d_period: usize) -> StochasticSeries {
    let n = bars.len();
    let mut k = vec![None; n];
    let mut d = vec![None; n];

    if k_period == 0 || d_period == 0 {
        return StochasticSeries { k, d };
    }

    for i in (k_period - 1)..n {
        let window = &bars[i + 1 - k_period..=i];
        let high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);

        let range = high - low;
        k[i] = Some(if range != 0.0 {
            100.0 * (bars[i].close - low) / range
        } else {
            50.0
        });
    }

    for i in 0..n {
        if i + 1 < d_period {
            continue;
        }
        let window = &k[i + 1 - d_period..=i];
        if window.iter().all(|v| v.is_some()) {
            d[i] = Some(window.iter().flatten().sum::<f64>() / d_period as f64);
        }
    }

    StochasticSeries { k, d }
}
