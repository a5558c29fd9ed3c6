use crate::error::{LineError, LineField, LineWarning};
use crate::parsing::parse_raw_amount;
use crate::schema::{
    Amount, FooterDiagnostic, FooterField, InvoiceFooter, NormalizedFooter, NormalizedLine,
    RawAmount, RawLine,
};
use log::{debug, warn};

/// One retained input line, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEntry {
    pub index: usize,
    pub code: Option<String>,
    pub outcome: Result<NormalizedLine, LineError>,
    pub warnings: Vec<LineWarning>,
}

impl NormalizedEntry {
    pub fn is_incomplete(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, LineWarning::IncompleteFields { .. }))
    }
}

pub struct LineNormalizer<'a> {
    currency_markers: &'a [String],
}

impl<'a> LineNormalizer<'a> {
    pub fn new(currency_markers: &'a [String]) -> Self {
        Self { currency_markers }
    }

    pub fn normalize(&self, lines: &[RawLine]) -> Vec<NormalizedEntry> {
        let entries: Vec<NormalizedEntry> = lines
            .iter()
            .enumerate()
            .filter_map(|(index, raw)| self.normalize_line(index, raw))
            .collect();

        debug!(
            "Normalized {} of {} extracted lines",
            entries.len(),
            lines.len()
        );
        entries
    }

    /// Returns `None` for rows that carry neither a code nor a number (section headers,
    /// summary rows).
    pub fn normalize_line(&self, index: usize, raw: &RawLine) -> Option<NormalizedEntry> {
        let code = clean_text(raw.code.as_deref());
        let description = clean_text(raw.description.as_deref());

        let mut values: [Option<Amount>; 6] = [None; 6];
        let mut first_error = None;

        for (slot, field) in values.iter_mut().zip(LineField::ALL) {
            let Some(amount) = raw.field(field) else {
                continue;
            };
            match parse_raw_amount(amount, self.currency_markers) {
                Ok(parsed) => *slot = parsed,
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some((field, amount, e));
                    }
                }
            }
        }

        let has_numbers = values.iter().any(Option::is_some);
        if code.is_none() && !has_numbers {
            debug!("Dropping line {}: no code and no numeric content", index);
            return None;
        }

        if let Some((field, amount, e)) = first_error {
            let raw_text = raw_text(amount);
            warn!(
                "Line {} ({}) rejected: {} {:?}: {}",
                index,
                code.as_deref().unwrap_or("no code"),
                field,
                raw_text,
                e
            );
            return Some(NormalizedEntry {
                index,
                code,
                outcome: Err(LineError::UnparsableNumber {
                    field,
                    raw: raw_text,
                }),
                warnings: Vec::new(),
            });
        }

        let [quantity, unit_price, discount_amount, net_subtotal, internal_tax, vat] = values;
        let line = NormalizedLine {
            index,
            code: code.clone(),
            description,
            quantity,
            unit_price,
            discount_amount,
            net_subtotal,
            internal_tax,
            vat,
        };

        let mut warnings = Vec::new();
        if code.is_none() {
            warnings.push(LineWarning::MissingCode);
        }
        let missing = line.missing_fields();
        if !missing.is_empty() {
            debug!("Line {} is missing {:?}", index, missing);
            warnings.push(LineWarning::IncompleteFields { missing });
        }

        Some(NormalizedEntry {
            index,
            code,
            outcome: Ok(line),
            warnings,
        })
    }

    /// Absent or unparsable tax totals count as zero; an unparsable printed total is absent.
    pub fn normalize_footer(&self, footer: &InvoiceFooter) -> (NormalizedFooter, Vec<FooterDiagnostic>) {
        let mut diagnostics = Vec::new();

        let printed_total = self.footer_amount(
            FooterField::PrintedTotal,
            footer.printed_total.as_ref(),
            &mut diagnostics,
        );
        let provincial_tax_a_total = self
            .footer_amount(
                FooterField::ProvincialTaxATotal,
                footer.provincial_tax_a_total.as_ref(),
                &mut diagnostics,
            )
            .unwrap_or(0);
        let provincial_tax_b_total = self
            .footer_amount(
                FooterField::ProvincialTaxBTotal,
                footer.provincial_tax_b_total.as_ref(),
                &mut diagnostics,
            )
            .unwrap_or(0);

        (
            NormalizedFooter {
                printed_total,
                provincial_tax_a_total,
                provincial_tax_b_total,
            },
            diagnostics,
        )
    }

    fn footer_amount(
        &self,
        field: FooterField,
        amount: Option<&RawAmount>,
        diagnostics: &mut Vec<FooterDiagnostic>,
    ) -> Option<Amount> {
        let amount = amount?;
        match parse_raw_amount(amount, self.currency_markers) {
            Ok(value) => value,
            Err(e) => {
                let raw = raw_text(amount);
                warn!("Footer {} {:?} could not be parsed: {}", field, raw, e);
                diagnostics.push(FooterDiagnostic {
                    field,
                    raw,
                    message: e.to_string(),
                });
                None
            }
        }
    }
}

fn clean_text(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn raw_text(amount: &RawAmount) -> String {
    match amount {
        RawAmount::Number(n) => n.to_string(),
        RawAmount::Text(t) => t.clone(),
    }
}
