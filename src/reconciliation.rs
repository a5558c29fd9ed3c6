use crate::config::ReconciliationThresholds;
use crate::schema::{AllocatedLine, Amount, ReconciliationStatus};

/// Sum of per-line final totals. No further rounding happens here.
pub fn computed_grand_total(lines: &[AllocatedLine]) -> Amount {
    lines
        .iter()
        .fold(0, |acc: Amount, l| acc.saturating_add(l.final_total))
}

/// Classifies the gap between the computed and printed totals. Advisory only.
pub fn classify(delta: Option<Amount>, thresholds: &ReconciliationThresholds) -> ReconciliationStatus {
    let Some(delta) = delta else {
        return ReconciliationStatus::Mismatch;
    };

    let gap = delta.unsigned_abs();
    if gap <= thresholds.exact.unsigned_abs() {
        ReconciliationStatus::Exact
    } else if gap <= thresholds.acceptable.unsigned_abs() {
        ReconciliationStatus::Acceptable
    } else if gap <= thresholds.needs_review.unsigned_abs() {
        ReconciliationStatus::NeedsReview
    } else {
        ReconciliationStatus::Mismatch
    }
}

/// Computed total, delta against the printed total, and the resulting status.
pub fn reconcile(
    lines: &[AllocatedLine],
    printed_total: Option<Amount>,
    thresholds: &ReconciliationThresholds,
) -> (Amount, Option<Amount>, ReconciliationStatus) {
    let computed = computed_grand_total(lines);
    let delta = printed_total.map(|printed| computed.saturating_sub(printed));
    (computed, delta, classify(delta, thresholds))
}
