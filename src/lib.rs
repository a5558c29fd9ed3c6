//! # Invoice Costing Engine
//!
//! A deterministic engine that turns the line items extracted from a supplier invoice
//! (via OCR or an LLM) into a reconciled per-line breakdown of net, tax and landed
//! unit cost. The extraction layer only locates fields; every number is computed here.
//!
//! ## Pipeline
//!
//! 1. **Normalize**: locale-formatted amounts (`"7.092.636,97"`) become whole currency
//!    units; unparsable lines are rejected, incomplete ones flagged.
//! 2. **Aggregate**: invoice-wide proration bases (`sum_net`, `sum_net_plus_internal`)
//!    are computed from the complete line set.
//! 3. **Allocate**: each line receives its share of the two provincial taxes and a
//!    final total and landed cost per package.
//! 4. **Settle**: the rounding residual of each tax is measured and, when configured,
//!    plugged into the line with the largest basis.
//! 5. **Reconcile**: the computed grand total is checked against the printed total.
//!
//! ## Example
//!
//! ```rust
//! use invoice_costing_engine::*;
//!
//! let invoice = RawInvoice {
//!     invoice_number: Some("0607-00375731".to_string()),
//!     lines: vec![RawLine {
//!         code: Some("2843".to_string()),
//!         description: Some("CC80 600CCX6.".to_string()),
//!         quantity: Some("2016".into()),
//!         unit_price: Some("8.581".into()),
//!         discount_amount: Some("914.935".into()),
//!         net_subtotal: Some("7.092.636,97".into()),
//!         internal_tax: Some("79.563".into()),
//!         vat: Some("192.136".into()),
//!     }],
//!     footer: InvoiceFooter {
//!         printed_total: Some("7.380.200".into()),
//!         provincial_tax_a_total: Some("14.863".into()),
//!         provincial_tax_b_total: Some("1.000".into()),
//!     },
//! };
//!
//! let costed = cost_invoice(&invoice);
//! assert_eq!(costed.lines[0].final_total, 7_380_199);
//! assert_eq!(costed.lines[0].unit_cost, Some(3661));
//! assert_eq!(costed.report.status, ReconciliationStatus::Exact);
//! ```

pub mod aggregator;
pub mod balancer;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod normalizer;
pub mod overrides;
pub mod parsing;
pub mod reconciliation;
pub mod schema;
pub mod utils;

pub use aggregator::aggregate;
pub use balancer::{ResidualBalancer, ResidualSettlement};
pub use config::{EngineConfig, IncompleteLinePolicy, ReconciliationThresholds, ResidualPolicy};
pub use engine::Allocator;
pub use error::{CostingError, LineError, LineField, LineWarning, Result};
pub use ingestion::{ExtractedItem, ExtractionPayload};
pub use normalizer::{LineNormalizer, NormalizedEntry};
pub use overrides::{apply_corrections, LineCorrection};
pub use parsing::{parse_amount, AmountParseError};
pub use schema::*;

use log::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Default)]
pub struct InvoiceCostingEngine {
    config: EngineConfig,
}

impl InvoiceCostingEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the full pipeline. Never fails: bad lines come back as diagnostics and a
    /// total that does not match the paper shows up in the report status.
    pub fn process(&self, invoice: &RawInvoice) -> CostedInvoice {
        let normalizer = LineNormalizer::new(&self.config.currency_markers);
        let entries = normalizer.normalize(&invoice.lines);
        let (footer, footer_diagnostics) = normalizer.normalize_footer(&invoice.footer);

        let mut diagnostics = Vec::new();
        let mut financial_lines = Vec::with_capacity(entries.len());
        let mut lines_rejected = 0;
        let mut lines_flagged = 0;

        for entry in entries {
            if !entry.warnings.is_empty() {
                lines_flagged += 1;
            }
            let excluded = entry.is_incomplete()
                && self.config.incomplete_lines == IncompleteLinePolicy::Exclude;

            for warning in &entry.warnings {
                diagnostics.push(LineDiagnostic {
                    index: entry.index,
                    code: entry.code.clone(),
                    kind: DiagnosticKind::Warning(warning.clone()),
                });
            }

            match entry.outcome {
                Ok(line) if !excluded => financial_lines.push(line),
                Ok(line) => debug!("Line {} excluded from the financial pass", line.index),
                Err(e) => {
                    lines_rejected += 1;
                    diagnostics.push(LineDiagnostic {
                        index: entry.index,
                        code: entry.code,
                        kind: DiagnosticKind::Error(e),
                    });
                }
            }
        }

        // Barrier: every line is normalized and summed before any allocation.
        let totals = aggregate(&financial_lines);

        let mut lines = Allocator::new(totals, &footer).allocate(&financial_lines);
        let settlement =
            ResidualBalancer::new(self.config.residual_policy, &totals, &footer).settle(&mut lines);

        let (computed_grand_total, delta, status) =
            reconciliation::reconcile(&lines, footer.printed_total, &self.config.thresholds);

        let report = ReconciliationReport {
            invoice_number: invoice.invoice_number.clone(),
            computed_grand_total,
            printed_total: footer.printed_total,
            delta,
            status,
            lines_allocated: lines.len(),
            lines_rejected,
            lines_flagged,
            tax_a_residual: settlement.tax_a_residual,
            tax_b_residual: settlement.tax_b_residual,
        };

        let label = invoice.invoice_number.as_deref().unwrap_or("<unnumbered>");
        info!(
            "Invoice {}: {} lines allocated, {} rejected, {} flagged, computed total {}, status {}",
            label,
            report.lines_allocated,
            report.lines_rejected,
            report.lines_flagged,
            report.computed_grand_total,
            report.status.as_str()
        );
        if status == ReconciliationStatus::Mismatch {
            match delta {
                Some(delta) => warn!(
                    "Invoice {}: computed total differs from printed total by {}",
                    label, delta
                ),
                None => warn!("Invoice {}: no printed total to reconcile against", label),
            }
        }

        CostedInvoice {
            invoice_number: invoice.invoice_number.clone(),
            lines,
            totals,
            diagnostics,
            footer_diagnostics,
            report,
        }
    }

    /// One result per invoice, in input order. Invoices share no state.
    pub fn process_batch(&self, invoices: &[RawInvoice]) -> Vec<CostedInvoice> {
        debug!("Processing batch of {} invoices", invoices.len());

        #[cfg(feature = "parallel")]
        {
            invoices.par_iter().map(|inv| self.process(inv)).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            invoices.iter().map(|inv| self.process(inv)).collect()
        }
    }
}

/// Costs an invoice with the default configuration.
pub fn cost_invoice(invoice: &RawInvoice) -> CostedInvoice {
    InvoiceCostingEngine::default().process(invoice)
}
