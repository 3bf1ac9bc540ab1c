// =============================================================================
// Static metrics - scalar risk/return statistics over a bar window
// =============================================================================
//
// Pure, side-effect-free functions over the current buffer. All of them treat
// degenerate input as a documented fallback value (0.0), never an error:
// fewer than two bars simply means "no statistic yet".
//
// Log returns guard against a zero previous close by substituting a fixed
// ratio of 100 instead of dividing by zero.
// =============================================================================

use crate::bar::{Bar, Interval};

/// Substitute ratio when the previous close is zero.
const ZERO_CLOSE_RATIO: f64 = 100.0;

/// Per-bar log returns: `ln(close[i] / close[i-1])`.
///
/// Empty when fewer than two closes.
pub fn log_returns(closes: &[f64]) -> Vec<f64> {
    if closes.len() < 2 {
        return Vec::new();
    }
    closes
        .windows(2)
        .map(|w| {
            let ratio = if w[0] != 0.0 {
                w[1] / w[0]
            } else {
                ZERO_CLOSE_RATIO
            };
            ratio.ln()
        })
        .collect()
}

/// Annualized volatility: population stdev of log returns scaled by
/// `sqrt(annualization_factor)`. 0.0 when fewer than 2 bars.
pub fn volatility(closes: &[f64], interval: Interval) -> f64 {
    let returns = log_returns(closes);
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let variance =
        returns.iter().map(|r| (r - mean) * (r - mean)).sum::<f64>() / returns.len() as f64;
    variance.sqrt() * interval.annualization_factor().sqrt()
}

/// Annualized mean log return. 0.0 when fewer than 2 bars.
pub fn average_return(closes: &[f64], interval: Interval) -> f64 {
    let returns = log_returns(closes);
    if returns.is_empty() {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    mean * interval.annualization_factor()
}

/// Sharpe ratio: `(average_return - risk_free_rate) / volatility`.
/// 0.0 when volatility is 0.
pub fn sharpe_ratio(average_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if volatility == 0.0 {
        return 0.0;
    }
    (average_return - risk_free_rate) / volatility
}

/// Maximum drawdown in percent over the close series.
///
/// The running peak is the maximum close seen so far; bars with a zero close
/// are excluded from the walk. 0.0 when no usable closes remain.
pub fn max_drawdown(closes: &[f64]) -> f64 {
    let mut peak: Option<f64> = None;
    let mut max_dd = 0.0f64;

    for &price in closes.iter().filter(|&&c| c != 0.0) {
        let p = peak.map_or(price, |p| p.max(price));
        peak = Some(p);
        let dd = (p - price) / p;
        if dd > max_dd {
            max_dd = dd;
        }
    }
    max_dd * 100.0
}

/// Mean volume over the window. 0.0 when fewer than 2 bars.
pub fn average_volume(bars: &[Bar]) -> f64 {
    if bars.len() < 2 {
        return 0.0;
    }
    bars.iter().map(|b| b.volume).sum::<f64>() / bars.len() as f64
}

/// Mean of `volume * close` over the window. 0.0 when fewer than 2 bars.
pub fn average_price_volume(bars: &[Bar]) -> f64 {
    if bars.len() < 2 {
        return 0.0;
    }
    bars.iter().map(|b| b.volume * b.close).sum::<f64>() / bars.len() as f64
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(i as i64);
                Bar::new(c, c, c, c, 100.0 + i as f64, t)
            })
            .collect()
    }

    // ---- log returns / volatility ----------------------------------------

    #[test]
    fn log_returns_too_short() {
        assert!(log_returns(&[100.0]).is_empty());
        assert!(log_returns(&[]).is_empty());
    }

    #[test]
    fn log_returns_known_values() {
        let r = log_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(r.len(), 2);
        assert!((r[0] - (1.1f64).ln()).abs() < 1e-12);
        assert!((r[1] - (0.9f64).ln()).abs() < 1e-12);
    }

    #[test]
    fn log_returns_zero_close_uses_sentinel_ratio() {
        let r = log_returns(&[0.0, 50.0]);
        assert!((r[0] - 100.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn volatility_flat_series_is_zero() {
        assert!(volatility(&[100.0; 10], Interval::Daily).abs() < 1e-12);
    }

    #[test]
    fn volatility_too_short_is_zero() {
        assert_eq!(volatility(&[100.0], Interval::Daily), 0.0);
    }

    #[test]
    fn volatility_uses_annualization_factor() {
        let closes = [100.0, 105.0, 98.0, 103.0, 99.0];
        let daily = volatility(&closes, Interval::Daily);
        let hourly = volatility(&closes, Interval::Hourly);
        let expected = (2205.0f64 / 252.0).sqrt();
        assert!((hourly / daily - expected).abs() < 1e-10);
    }

    // ---- average return / sharpe -----------------------------------------

    #[test]
    fn average_return_constant_growth() {
        // 1% growth per bar => mean log return is ln(1.01).
        let closes: Vec<f64> = (0..10).map(|i| 100.0 * 1.01f64.powi(i)).collect();
        let avg = average_return(&closes, Interval::Daily);
        assert!((avg - 1.01f64.ln() * 252.0).abs() < 1e-9);
    }

    #[test]
    fn sharpe_zero_volatility_is_zero() {
        assert_eq!(sharpe_ratio(0.3, 0.0, 0.165), 0.0);
    }

    #[test]
    fn sharpe_known_value() {
        let s = sharpe_ratio(0.365, 0.2, 0.165);
        assert!((s - 1.0).abs() < 1e-12);
    }

    // ---- max drawdown ------------------------------------------------------

    #[test]
    fn max_drawdown_scenario() {
        // Peaks: 100,100,100,100,120; drawdowns: 0,10,5,20,0 (%).
        let dd = max_drawdown(&[100.0, 90.0, 95.0, 80.0, 120.0]);
        assert!((dd - 20.0).abs() < 1e-10);
    }

    #[test]
    fn max_drawdown_monotonic_rise_is_zero() {
        assert!(max_drawdown(&[1.0, 2.0, 3.0, 4.0]).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_ignores_zero_closes() {
        // The zero must not register as a 100% drawdown.
        let dd = max_drawdown(&[100.0, 0.0, 90.0]);
        assert!((dd - 10.0).abs() < 1e-10);
    }

    #[test]
    fn max_drawdown_empty_is_zero() {
        assert_eq!(max_drawdown(&[]), 0.0);
        assert_eq!(max_drawdown(&[0.0, 0.0]), 0.0);
    }

    // ---- volume averages ---------------------------------------------------

    #[test]
    fn average_volume_simple_mean() {
        let bars = bars_from_closes(&[10.0, 20.0, 30.0]);
        // Volumes are 100, 101, 102.
        assert!((average_volume(&bars) - 101.0).abs() < 1e-10);
    }

    #[test]
    fn average_price_volume_weighted() {
        let bars = bars_from_closes(&[10.0, 20.0]);
        // 10*100 + 20*101 = 3020; / 2 = 1510.
        assert!((average_price_volume(&bars) - 1510.0).abs() < 1e-10);
    }

    #[test]
    fn volume_metrics_too_short_are_zero() {
        let bars = bars_from_closes(&[10.0]);
        assert_eq!(average_volume(&bars), 0.0);
        assert_eq!(average_price_volume(&bars), 0.0);
    }
}
