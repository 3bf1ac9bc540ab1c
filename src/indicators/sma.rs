// =============================================================================
// Simple Moving Average (SMA)
// =============================================================================
//
// The unweighted mean of the trailing `period` closes. Defined from index
// `period - 1`; earlier entries are the warm-up span.
// =============================================================================

use crate::indicators::mean;

/// Compute the SMA series for the given `closes` and `period`.
///
/// The result has exactly `closes.len()` entries; the first `period - 1`
/// are `None`.
///
/// # Edge cases
/// - `period == 0` => all `None` (no meaningful window)
/// - `closes.len() < period` => all `None`
pub fn calculate_sma(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 {
        return out;
    }
    for i in (period - 1)..closes.len() {
        out[i] = Some(mean(&closes[i + 1 - period..=i]));
    }
    out
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_empty_input() {
        assert!(calculate_sma(&[], 20).is_empty());
    }

    #[test]
    fn sma_period_zero() {
        assert_eq!(calculate_sma(&[1.0, 2.0], 0), vec![None, None]);
    }

    #[test]
    fn sma_insufficient_data_stays_aligned() {
        // Shorter than the period: still one entry per close, all undefined.
        let out = calculate_sma(&[1.0, 2.0], 3);
        assert_eq!(out, vec![None, None]);
    }

    #[test]
    fn sma_scenario_from_daily_closes() {
        // SMA(3) of [100,102,101,105,110] => [-,-,101.0,102.67,105.33]
        let out = calculate_sma(&[100.0, 102.0, 101.0, 105.0, 110.0], 3);
        assert_eq!(out.len(), 5);
        assert!(out[0].is_none());
        assert!(out[1].is_none());
        assert!((out[2].unwrap() - 101.0).abs() < 1e-10);
        assert!((out[3].unwrap() - 102.0 - 2.0 / 3.0).abs() < 1e-10);
        assert!((out[4].unwrap() - 105.0 - 1.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn sma_defined_count_matches_period() {
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let out = calculate_sma(&closes, 4);
        assert_eq!(out.iter().filter(|v| v.is_some()).count(), 7);
        assert_eq!(out.iter().filter(|v| v.is_none()).count(), 3);
    }
}
