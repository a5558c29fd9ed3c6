use crate::config::ResidualPolicy;
use crate::engine::finalize;
use crate::schema::{AllocatedLine, Amount, InvoiceTotals, NormalizedFooter};
use log::debug;

/// Tax total minus the sum of the shares allocated before settlement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResidualSettlement {
    pub tax_a_residual: Amount,
    pub tax_b_residual: Amount,
}

#[derive(Debug, Clone, Copy)]
enum ProvincialTax {
    A,
    B,
}

pub struct ResidualBalancer<'a> {
    policy: ResidualPolicy,
    totals: &'a InvoiceTotals,
    footer: &'a NormalizedFooter,
}

impl<'a> ResidualBalancer<'a> {
    pub fn new(
        policy: ResidualPolicy,
        totals: &'a InvoiceTotals,
        footer: &'a NormalizedFooter,
    ) -> Self {
        Self {
            policy,
            totals,
            footer,
        }
    }

    /// Measures the rounding residual of both taxes and, under
    /// [`ResidualPolicy::AbsorbIntoLargest`], plugs it into the line with the largest
    /// basis so the shares add up to the footer total exactly.
    pub fn settle(&self, lines: &mut [AllocatedLine]) -> ResidualSettlement {
        ResidualSettlement {
            tax_a_residual: self.settle_tax(lines, ProvincialTax::A),
            tax_b_residual: self.settle_tax(lines, ProvincialTax::B),
        }
    }

    fn settle_tax(&self, lines: &mut [AllocatedLine], tax: ProvincialTax) -> Amount {
        let (total, basis_sum) = match tax {
            ProvincialTax::A => (self.footer.provincial_tax_a_total, self.totals.sum_net),
            ProvincialTax::B => (
                self.footer.provincial_tax_b_total,
                self.totals.sum_net_plus_internal,
            ),
        };

        let allocated = lines
            .iter()
            .fold(0, |acc: Amount, l| acc.saturating_add(share(l, tax).unwrap_or(0)));
        let residual = total.saturating_sub(allocated);

        if residual == 0 || basis_sum <= 0 || self.policy == ResidualPolicy::Report {
            if residual != 0 {
                debug!(
                    "Provincial tax {:?}: residual {} left unallocated (total {}, allocated {})",
                    tax, residual, total, allocated
                );
            }
            return residual;
        }

        let Some(plug_idx) = largest_basis_line(lines, tax) else {
            return residual;
        };

        let plug = &mut lines[plug_idx];
        let slot = match tax {
            ProvincialTax::A => &mut plug.tax_a_share,
            ProvincialTax::B => &mut plug.tax_b_share,
        };
        *slot = Some(slot.unwrap_or(0).saturating_add(residual));
        finalize(plug);

        debug!(
            "Provincial tax {:?}: residual {} absorbed by line {}",
            tax, residual, plug.line.index
        );
        residual
    }
}

fn share(line: &AllocatedLine, tax: ProvincialTax) -> Option<Amount> {
    match tax {
        ProvincialTax::A => line.tax_a_share,
        ProvincialTax::B => line.tax_b_share,
    }
}

fn basis(line: &AllocatedLine, tax: ProvincialTax) -> Amount {
    match tax {
        ProvincialTax::A => line.line.net_subtotal.unwrap_or(0),
        ProvincialTax::B => line.net_plus_internal,
    }
}

/// First line in source order among those with the largest basis.
fn largest_basis_line(lines: &[AllocatedLine], tax: ProvincialTax) -> Option<usize> {
    let mut best: Option<(usize, Amount)> = None;
    for (idx, line) in lines.iter().enumerate() {
        let b = basis(line, tax);
        match best {
            Some((_, best_basis)) if b <= best_basis => {}
            _ => best = Some((idx, b)),
        }
    }
    best.map(|(idx, _)| idx)
}
