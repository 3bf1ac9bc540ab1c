// =============================================================================
// Bollinger Bands
// =============================================================================
//
// Middle = SMA(period)
// Upper  = middle + std_dev * sigma      (sigma = sample stdev, ddof = 1)
// Lower  = middle - std_dev * sigma
// %B     = (close - lower) / (upper - lower)
//
// %B is undefined when the band width is zero (flat window).
// =============================================================================

use crate::indicators::sma::calculate_sma;

/// The four aligned Bollinger sequences. Each has one entry per input close.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: Vec<Option<f64>>,
    pub middle: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
    pub percent_b: Vec<Option<f64>>,
}

/// Compute Bollinger Bands for the given `closes`.
///
/// # Edge cases
/// - `period < 2` => bands and %B all `None` (the sample standard deviation
///   needs at least two points); middle still carries the SMA.
/// - Zero band width => %B `None` for that entry.
pub fn calculate_bollinger(closes: &[f64], period: usize, std_dev: f64) -> BollingerSeries {
    let n = closes.len();
    let middle = calculate_sma(closes, period);

    let mut upper = vec![None; n];
    let mut lower = vec![None; n];
    let mut percent_b = vec![None; n];

    if period >= 2 {
        for i in (period - 1)..n {
            let m = match middle[i] {
                Some(m) => m,
                None => continue,
            };
            let window = &closes[i + 1 - period..=i];
            let variance = window.iter().map(|c| (c - m) * (c - m)).sum::<f64>()
                / (period - 1) as f64;
            let sigma = variance.sqrt();

            let up = m + std_dev * sigma;
            let low = m - std_dev * sigma;
            upper[i] = Some(up);
            lower[i] = Some(low);

            let width = up - low;
            if width != 0.0 {
                percent_b[i] = Some((closes[i] - low) / width);
            }
        }
    }

    BollingerSeries {
        upper,
        middle,
        lower,
        percent_b,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bollinger_empty_input() {
        let out = calculate_bollinger(&[], 20, 2.0);
        assert!(out.upper.is_empty());
        assert!(out.percent_b.is_empty());
    }

    #[test]
    fn bollinger_warm_up_span() {
        let closes: Vec<f64> = (1..=10).map(|x| x as f64).collect();
        let out = calculate_bollinger(&closes, 5, 2.0);
        assert!(out.upper[..4].iter().all(|v| v.is_none()));
        assert!(out.upper[4..].iter().all(|v| v.is_some()));
    }

    #[test]
    fn bollinger_known_window() {
        // Window [2,4,6]: mean 4, sample variance ((4+0+4)/2) = 4, sigma 2.
        let out = calculate_bollinger(&[2.0, 4.0, 6.0], 3, 2.0);
        assert!((out.middle[2].unwrap() - 4.0).abs() < 1e-10);
        assert!((out.upper[2].unwrap() - 8.0).abs() < 1e-10);
        assert!((out.lower[2].unwrap() - 0.0).abs() < 1e-10);
        // %B = (6 - 0) / 8 = 0.75
        assert!((out.percent_b[2].unwrap() - 0.75).abs() < 1e-10);
    }

    #[test]
    fn bollinger_flat_window_has_no_percent_b() {
        let out = calculate_bollinger(&[5.0; 10], 5, 2.0);
        // Bands collapse onto the middle; %B is undefined, not a sentinel.
        assert!((out.upper[6].unwrap() - 5.0).abs() < 1e-10);
        assert!((out.lower[6].unwrap() - 5.0).abs() < 1e-10);
        assert!(out.percent_b[6].is_none());
    }

    #[test]
    fn bollinger_period_one_has_no_bands() {
        let out = calculate_bollinger(&[1.0, 2.0, 3.0], 1, 2.0);
        assert!(out.middle.iter().all(|v| v.is_some()));
        assert!(out.upper.iter().all(|v| v.is_none()));
        assert!(out.percent_b.iter().all(|v| v.is_none()));
    }

    #[test]
    fn bollinger_close_inside_bands_percent_b_in_unit_range() {
        let closes: Vec<f64> = (1..=30)
            .map(|x| 100.0 + ((x * 7) % 11) as f64)
            .collect();
        let out = calculate_bollinger(&closes, 10, 2.0);
        for (i, pb) in out.percent_b.iter().enumerate() {
            if let Some(pb) = pb {
                let up = out.upper[i].unwrap();
                let low = out.lower[i].unwrap();
                assert!(closes[i] <= up + 1e-9 && closes[i] >= low - 1e-9);
                assert!((-0.001..=1.001).contains(pb));
            }
        }
    }
}
