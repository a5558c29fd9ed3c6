use crate::error::{LineError, LineField, LineWarning};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Whole currency units (pesos on the source invoices, cents dropped after rounding).
pub type Amount = i64;

/// An amount as it came out of the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawAmount {
    #[schemars(description = "A canonical number (no thousands separators). Will be rounded to an integer.")]
    Number(f64),

    #[schemars(
        description = "The amount exactly as printed, e.g. \"$ 7.092.636,97\". '.' groups thousands and ',' separates decimals."
    )]
    Text(String),
}

impl From<i64> for RawAmount {
    fn from(value: i64) -> Self {
        RawAmount::Number(value as f64)
    }
}

impl From<&str> for RawAmount {
    fn from(value: &str) -> Self {
        RawAmount::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawLine {
    #[schemars(description = "Product code from the CODIGO column (e.g. '2843'). Null for non-product rows.")]
    #[serde(default)]
    pub code: Option<String>,

    #[schemars(description = "Product description from the PRODUCTO column (e.g. 'CC80 600CCX6.')")]
    #[serde(default)]
    pub description: Option<String>,

    #[schemars(description = "Number of bulk packages (CANTIDAD column)")]
    #[serde(default)]
    pub quantity: Option<RawAmount>,

    #[schemars(description = "Price per package (P.UNITARIO column)")]
    #[serde(default)]
    pub unit_price: Option<RawAmount>,

    #[schemars(description = "Discount amount for the line (DESCUENTO column)")]
    #[serde(default)]
    pub discount_amount: Option<RawAmount>,

    #[schemars(description = "Net line subtotal after discount (SUBTOTAL column)")]
    #[serde(default)]
    pub net_subtotal: Option<RawAmount>,

    #[schemars(description = "Internal excise tax for the line (I.INTERNOS column)")]
    #[serde(default)]
    pub internal_tax: Option<RawAmount>,

    #[schemars(description = "VAT for the line (IVA 21% column), as printed")]
    #[serde(default)]
    pub vat: Option<RawAmount>,
}

impl RawLine {
    pub fn field(&self, field: LineField) -> Option<&RawAmount> {
        match field {
            LineField::Quantity => self.quantity.as_ref(),
            LineField::UnitPrice => self.unit_price.as_ref(),
            LineField::DiscountAmount => self.discount_amount.as_ref(),
            LineField::NetSubtotal => self.net_subtotal.as_ref(),
            LineField::InternalTax => self.internal_tax.as_ref(),
            LineField::Vat => self.vat.as_ref(),
        }
    }

    pub fn field_mut(&mut self, field: LineField) -> &mut Option<RawAmount> {
        match field {
            LineField::Quantity => &mut self.quantity,
            LineField::UnitPrice => &mut self.unit_price,
            LineField::DiscountAmount => &mut self.discount_amount,
            LineField::NetSubtotal => &mut self.net_subtotal,
            LineField::InternalTax => &mut self.internal_tax,
            LineField::Vat => &mut self.vat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FooterField {
    PrintedTotal,
    ProvincialTaxATotal,
    ProvincialTaxBTotal,
}

impl fmt::Display for FooterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FooterField::PrintedTotal => "printed_total",
            FooterField::ProvincialTaxATotal => "provincial_tax_a_total",
            FooterField::ProvincialTaxBTotal => "provincial_tax_b_total",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvoiceFooter {
    #[schemars(description = "The invoice grand total (IMP.TOTAL). Only used to cross-check the computed total.")]
    #[serde(default)]
    pub printed_total: Option<RawAmount>,

    #[schemars(description = "City-level provincial tax total (IB.CAP.FED), prorated over line net subtotals")]
    #[serde(default)]
    pub provincial_tax_a_total: Option<RawAmount>,

    #[schemars(
        description = "Regional-regime provincial tax total (PERC.RG.3337), prorated over line net plus internal tax"
    )]
    #[serde(default)]
    pub provincial_tax_b_total: Option<RawAmount>,
}

impl InvoiceFooter {
    pub fn field_mut(&mut self, field: FooterField) -> &mut Option<RawAmount> {
        match field {
            FooterField::PrintedTotal => &mut self.printed_total,
            FooterField::ProvincialTaxATotal => &mut self.provincial_tax_a_total,
            FooterField::ProvincialTaxBTotal => &mut self.provincial_tax_b_total,
        }
    }
}

/// Everything the extraction layer hands over for one invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RawInvoice {
    #[schemars(description = "Invoice number from the upper-right header, e.g. '0607-00375731'")]
    #[serde(default)]
    pub invoice_number: Option<String>,

    #[schemars(description = "Product rows in the exact order they appear on the invoice")]
    #[serde(default)]
    pub lines: Vec<RawLine>,

    #[serde(default)]
    pub footer: InvoiceFooter,
}

impl RawInvoice {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RawInvoice)
    }

    pub fn schema_as_json() -> Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

/// Footer amounts after parsing. Missing tax totals count as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedFooter {
    pub printed_total: Option<Amount>,
    pub provincial_tax_a_total: Amount,
    pub provincial_tax_b_total: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedLine {
    /// Position of the line in the extracted line list.
    pub index: usize,
    pub code: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<Amount>,
    pub unit_price: Option<Amount>,
    pub discount_amount: Option<Amount>,
    pub net_subtotal: Option<Amount>,
    pub internal_tax: Option<Amount>,
    pub vat: Option<Amount>,
}

impl NormalizedLine {
    pub fn field(&self, field: LineField) -> Option<Amount> {
        match field {
            LineField::Quantity => self.quantity,
            LineField::UnitPrice => self.unit_price,
            LineField::DiscountAmount => self.discount_amount,
            LineField::NetSubtotal => self.net_subtotal,
            LineField::InternalTax => self.internal_tax,
            LineField::Vat => self.vat,
        }
    }

    pub fn missing_fields(&self) -> Vec<LineField> {
        LineField::ALL
            .into_iter()
            .filter(|f| self.field(*f).is_none())
            .collect()
    }

    /// Net plus internal tax, absent parts contribute zero.
    pub fn net_plus_internal(&self) -> Amount {
        self.net_subtotal
            .unwrap_or(0)
            .saturating_add(self.internal_tax.unwrap_or(0))
    }
}

/// Invoice-wide proration bases. Built once from the complete line set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub sum_net: Amount,
    pub sum_net_plus_internal: Amount,
}

/// A fraction stored in parts per million.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ratio(i64);

impl Ratio {
    pub const SCALE: i64 = 1_000_000;

    /// `None` when the denominator is zero.
    pub fn from_fraction(numerator: Amount, denominator: Amount) -> Option<Self> {
        crate::utils::prorate(numerator, Self::SCALE, denominator).map(Ratio)
    }

    pub fn from_ppm(ppm: i64) -> Self {
        Ratio(ppm)
    }

    pub fn ppm(&self) -> i64 {
        self.0
    }

    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}%", self.as_f64() * 100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocatedLine {
    #[serde(flatten)]
    pub line: NormalizedLine,
    /// quantity x unit_price
    pub gross_value: Option<Amount>,
    pub discount_ratio: Option<Ratio>,
    pub net_plus_internal: Amount,
    pub tax_a_share: Option<Amount>,
    pub tax_b_share: Option<Amount>,
    pub final_total: Amount,
    /// Landed cost per package.
    pub unit_cost: Option<Amount>,
    pub units_per_package: Option<u32>,
    /// Landed cost per unit inside the package, in hundredths.
    pub piece_cost_cents: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReconciliationStatus {
    Exact,
    Acceptable,
    NeedsReview,
    Mismatch,
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Exact => "exact",
            ReconciliationStatus::Acceptable => "acceptable",
            ReconciliationStatus::NeedsReview => "needs_review",
            ReconciliationStatus::Mismatch => "mismatch",
        }
    }

    pub fn needs_attention(&self) -> bool {
        matches!(
            self,
            ReconciliationStatus::NeedsReview | ReconciliationStatus::Mismatch
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub invoice_number: Option<String>,
    pub computed_grand_total: Amount,
    pub printed_total: Option<Amount>,
    /// computed - printed
    pub delta: Option<Amount>,
    pub status: ReconciliationStatus,
    pub lines_allocated: usize,
    pub lines_rejected: usize,
    pub lines_flagged: usize,
    /// Tax total minus the sum of independently rounded shares, before settlement.
    pub tax_a_residual: Amount,
    pub tax_b_residual: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "severity", content = "detail", rename_all = "snake_case")]
pub enum DiagnosticKind {
    Error(LineError),
    Warning(LineWarning),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineDiagnostic {
    pub index: usize,
    pub code: Option<String>,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FooterDiagnostic {
    pub field: FooterField,
    pub raw: String,
    pub message: String,
}

/// The complete costing result for one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostedInvoice {
    pub invoice_number: Option<String>,
    pub lines: Vec<AllocatedLine>,
    pub totals: InvoiceTotals,
    pub diagnostics: Vec<LineDiagnostic>,
    pub footer_diagnostics: Vec<FooterDiagnostic>,
    pub report: ReconciliationReport,
}
