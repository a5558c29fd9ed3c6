use crate::schema::{InvoiceTotals, NormalizedLine};
use log::debug;

/// Sums the proration bases over the complete line set. Absent amounts contribute zero;
/// sums saturate at the `i64` bounds.
pub fn aggregate(lines: &[NormalizedLine]) -> InvoiceTotals {
    let totals = lines.iter().fold(InvoiceTotals::default(), |acc, line| {
        InvoiceTotals {
            sum_net: acc.sum_net.saturating_add(line.net_subtotal.unwrap_or(0)),
            sum_net_plus_internal: acc
                .sum_net_plus_internal
                .saturating_add(line.net_plus_internal()),
        }
    });

    debug!(
        "Invoice totals over {} lines: sum_net={}, sum_net_plus_internal={}",
        lines.len(),
        totals.sum_net,
        totals.sum_net_plus_internal
    );
    totals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(index: usize, net: Option<i64>, internal: Option<i64>) -> NormalizedLine {
        NormalizedLine {
            index,
            code: Some(format!("C{}", index)),
            description: None,
            quantity: Some(1),
            unit_price: None,
            discount_amount: None,
            net_subtotal: net,
            internal_tax: internal,
            vat: None,
        }
    }

    #[test]
    fn test_single_line_totals() {
        let totals = aggregate(&[line(0, Some(7_092_637), Some(79_563))]);
        assert_eq!(totals.sum_net, 7_092_637);
        assert_eq!(totals.sum_net_plus_internal, 7_172_200);
    }

    #[test]
    fn test_absent_amounts_contribute_zero() {
        let totals = aggregate(&[
            line(0, Some(1000), None),
            line(1, None, Some(50)),
            line(2, None, None),
        ]);
        assert_eq!(totals.sum_net, 1000);
        assert_eq!(totals.sum_net_plus_internal, 1050);
    }

    #[test]
    fn test_sums_saturate_instead_of_overflowing() {
        let big = i64::MAX / 2 + 1;
        let totals = aggregate(&[line(0, Some(big), Some(big)), line(1, Some(big), None)]);
        assert_eq!(totals.sum_net, i64::MAX);
        assert_eq!(totals.sum_net_plus_internal, i64::MAX);
    }

    #[test]
    fn test_empty_invoice() {
        assert_eq!(aggregate(&[]), InvoiceTotals::default());
    }
}
