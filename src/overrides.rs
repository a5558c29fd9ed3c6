use crate::error::{CostingError, LineField, Result};
use crate::schema::{FooterField, RawAmount, RawInvoice, RawLine};
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A reviewer's fix to an extracted invoice, submitted after a report needs attention.
/// Line indices refer to positions in the extracted line list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LineCorrection {
    /// Leave a line out of the costing (e.g. a misread summary row).
    Exclude { index: usize },

    /// Replace one numeric field with the value read off the paper.
    SetField {
        index: usize,
        field: LineField,
        value: RawAmount,
    },

    /// Mark a numeric field as unknown.
    ClearField { index: usize, field: LineField },

    SetCode { index: usize, code: String },

    SetFooter { field: FooterField, value: RawAmount },
}

/// Applies corrections to a copy of the invoice; the extracted original is left as is.
///
/// Excluded lines are blanked rather than removed, so indices in later diagnostics
/// still point at the same extracted rows.
pub fn apply_corrections(invoice: &RawInvoice, corrections: &[LineCorrection]) -> Result<RawInvoice> {
    let mut corrected = invoice.clone();

    for correction in corrections {
        debug!("Applying correction {:?}", correction);
        match correction {
            LineCorrection::Exclude { index } => {
                *line_mut(&mut corrected, *index)? = RawLine::default();
            }
            LineCorrection::SetField {
                index,
                field,
                value,
            } => {
                *line_mut(&mut corrected, *index)?.field_mut(*field) = Some(value.clone());
            }
            LineCorrection::ClearField { index, field } => {
                *line_mut(&mut corrected, *index)?.field_mut(*field) = None;
            }
            LineCorrection::SetCode { index, code } => {
                line_mut(&mut corrected, *index)?.code = Some(code.clone());
            }
            LineCorrection::SetFooter { field, value } => {
                *corrected.footer.field_mut(*field) = Some(value.clone());
            }
        }
    }

    Ok(corrected)
}

fn line_mut(invoice: &mut RawInvoice, index: usize) -> Result<&mut RawLine> {
    let len = invoice.lines.len();
    invoice.lines.get_mut(index).ok_or_else(|| {
        CostingError::InvalidCorrection(format!(
            "line index {} out of range (invoice has {} lines)",
            index, len
        ))
    })
}
