use crate::schema::{AllocatedLine, Amount, InvoiceTotals, NormalizedFooter, NormalizedLine, Ratio};
use crate::utils::{div_round_half_away, package_size_from_description, prorate, saturate_i64};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Allocates the invoice-level provincial taxes over lines.
///
/// Every line is a pure function of itself and the precomputed [`InvoiceTotals`], so
/// lines can be processed in any order, or in parallel with the `parallel` feature.
pub struct Allocator {
    totals: InvoiceTotals,
    tax_a_total: Amount,
    tax_b_total: Amount,
}

impl Allocator {
    pub fn new(totals: InvoiceTotals, footer: &NormalizedFooter) -> Self {
        Self {
            totals,
            tax_a_total: footer.provincial_tax_a_total,
            tax_b_total: footer.provincial_tax_b_total,
        }
    }

    pub fn allocate(&self, lines: &[NormalizedLine]) -> Vec<AllocatedLine> {
        #[cfg(feature = "parallel")]
        {
            lines.par_iter().map(|line| self.allocate_line(line)).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            lines.iter().map(|line| self.allocate_line(line)).collect()
        }
    }

    pub fn allocate_line(&self, line: &NormalizedLine) -> AllocatedLine {
        let gross_value = match (line.quantity, line.unit_price) {
            (Some(quantity), Some(price)) => Some(saturate_i64(quantity as i128 * price as i128)),
            _ => None,
        };

        let discount_ratio = match (line.discount_amount, gross_value) {
            (Some(discount), Some(gross)) => Ratio::from_fraction(discount, gross),
            _ => None,
        };

        let net_plus_internal = line.net_plus_internal();

        let tax_a_share = if self.totals.sum_net > 0 {
            prorate(
                line.net_subtotal.unwrap_or(0),
                self.tax_a_total,
                self.totals.sum_net,
            )
        } else {
            None
        };

        let tax_b_share = if self.totals.sum_net_plus_internal > 0 {
            prorate(
                net_plus_internal,
                self.tax_b_total,
                self.totals.sum_net_plus_internal,
            )
        } else {
            None
        };

        let mut allocated = AllocatedLine {
            units_per_package: line
                .description
                .as_deref()
                .and_then(package_size_from_description),
            line: line.clone(),
            gross_value,
            discount_ratio,
            net_plus_internal,
            tax_a_share,
            tax_b_share,
            final_total: 0,
            unit_cost: None,
            piece_cost_cents: None,
        };
        finalize(&mut allocated);
        allocated
    }
}

/// Derives `final_total`, `unit_cost` and `piece_cost_cents` from the line's components.
/// Missing shares contribute zero.
pub fn finalize(allocated: &mut AllocatedLine) {
    allocated.final_total = saturate_i64(
        allocated.net_plus_internal as i128
            + allocated.line.vat.unwrap_or(0) as i128
            + allocated.tax_a_share.unwrap_or(0) as i128
            + allocated.tax_b_share.unwrap_or(0) as i128,
    );

    allocated.unit_cost = match allocated.line.quantity {
        Some(quantity) if quantity > 0 => {
            div_round_half_away(allocated.final_total as i128, quantity as i128)
        }
        _ => None,
    };

    allocated.piece_cost_cents = match (allocated.unit_cost, allocated.units_per_package) {
        (Some(cost), Some(units)) => div_round_half_away(cost as i128 * 100, units as i128),
        _ => None,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: Option<i64>, net: Option<i64>, internal: Option<i64>) -> NormalizedLine {
        NormalizedLine {
            index: 0,
            code: Some("2843".to_string()),
            description: Some("CC80 600CCX6.".to_string()),
            quantity,
            unit_price: Some(8581),
            discount_amount: Some(914_935),
            net_subtotal: net,
            internal_tax: internal,
            vat: Some(192_136),
        }
    }

    fn footer(a: i64, b: i64) -> NormalizedFooter {
        NormalizedFooter {
            printed_total: None,
            provincial_tax_a_total: a,
            provincial_tax_b_total: b,
        }
    }

    #[test]
    fn test_single_line_allocation() {
        let totals = InvoiceTotals {
            sum_net: 7_092_637,
            sum_net_plus_internal: 7_172_200,
        };
        let allocator = Allocator::new(totals, &footer(14_863, 1000));
        let allocated =
            allocator.allocate_line(&line(Some(2016), Some(7_092_637), Some(79_563)));

        assert_eq!(allocated.gross_value, Some(17_299_296));
        assert_eq!(allocated.discount_ratio.map(|r| r.ppm()), Some(52_889));
        assert_eq!(allocated.net_plus_internal, 7_172_200);
        assert_eq!(allocated.tax_a_share, Some(14_863));
        assert_eq!(allocated.tax_b_share, Some(1000));
        assert_eq!(allocated.final_total, 7_380_199);
        assert_eq!(allocated.unit_cost, Some(3661));
        assert_eq!(allocated.units_per_package, Some(6));
        // 3661 / 6 = 610.1666...
        assert_eq!(allocated.piece_cost_cents, Some(61_017));
    }

    #[test]
    fn test_proportional_shares() {
        let totals = InvoiceTotals {
            sum_net: 3000,
            sum_net_plus_internal: 4000,
        };
        let allocator = Allocator::new(totals, &footer(300, 100));
        let allocated = allocator.allocate_line(&line(Some(10), Some(1000), Some(1000)));

        assert_eq!(allocated.tax_a_share, Some(100));
        assert_eq!(allocated.tax_b_share, Some(50));
        assert_eq!(allocated.final_total, 2000 + 192_136 + 150);
    }

    #[test]
    fn test_zero_quantity_has_no_per_unit_values() {
        let totals = InvoiceTotals {
            sum_net: 1000,
            sum_net_plus_internal: 1000,
        };
        let allocator = Allocator::new(totals, &footer(10, 10));
        let allocated = allocator.allocate_line(&line(Some(0), Some(1000), None));

        assert_eq!(allocated.gross_value, Some(0));
        assert_eq!(allocated.discount_ratio, None);
        assert_eq!(allocated.unit_cost, None);
        assert_eq!(allocated.piece_cost_cents, None);
        assert_eq!(allocated.final_total, 1000 + 192_136 + 10 + 10);
    }

    #[test]
    fn test_zero_basis_yields_null_shares() {
        let allocator = Allocator::new(InvoiceTotals::default(), &footer(500, 500));
        let allocated = allocator.allocate_line(&line(Some(5), None, None));

        assert_eq!(allocated.tax_a_share, None);
        assert_eq!(allocated.tax_b_share, None);
        assert_eq!(allocated.final_total, 192_136);
        assert_eq!(allocated.unit_cost, Some(38_427));
    }

    #[test]
    fn test_allocation_is_order_independent() {
        let totals = InvoiceTotals {
            sum_net: 3000,
            sum_net_plus_internal: 3000,
        };
        let allocator = Allocator::new(totals, &footer(1000, 0));
        let mut a = line(Some(1), Some(1000), None);
        let mut b = line(Some(1), Some(2000), None);
        a.index = 0;
        b.index = 1;

        let forward = allocator.allocate(&[a.clone(), b.clone()]);
        let backward = allocator.allocate(&[b, a]);
        assert_eq!(forward[0], backward[1]);
        assert_eq!(forward[1], backward[0]);
    }
}
