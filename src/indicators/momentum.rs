// =============================================================================
// Momentum
// =============================================================================
//
// The raw price change over `period` bars: close_t - close_{t-period}.
// Defined from index `period`.
// =============================================================================

/// Compute the momentum series for the given `closes` and `period`, aligned
/// 1:1 with the input. The first `period` entries are `None`.
///
/// # Edge cases
/// - `period == 0` => all `None` (a zero look-back is meaningless)
/// - `closes.len() < period + 1` => all `None`
pub fn calculate_momentum(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 {
        return out;
    }
    for i in period..closes.len() {
        out[i] = Some(closes[i] - closes[i - period]);
    }
    out
}
