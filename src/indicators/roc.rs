// =============================================================================
// Rate of Change (ROC)
// =============================================================================
//
// Percentage change over `period` bars:
//   ROC_t = (close_t / close_{t-period} - 1) * 100
// =============================================================================

/// Compute the ROC series for the given `closes` and `period`, aligned 1:1
/// with the input. The first `period` entries are `None`; an entry whose
/// reference close is zero is also `None` (division guard), not a sentinel
/// number.
pub fn calculate_roc(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 {
        return out;
    }
    for i in period..closes.len() {
        let base = closes[i - period];
        if base != 0.0 {
            out[i] = Some((closes[i] / base - 1.0) * 100.0);
        }
    }
    out
}
