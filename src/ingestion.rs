//! Conversion from the flat JSON the invoice extractor emits into a [`RawInvoice`].
//!
//! The extractor's output uses the column names printed on the invoice (`Codigo`,
//! `bulto`, `neto`, `iva_21`, ...). Fields the model used to compute itself (`total_final`,
//! `costo_x_bulto`, `iibb_caba`, ...) are ignored: the engine recomputes all of them.

use crate::error::Result;
use crate::schema::{InvoiceFooter, RawAmount, RawInvoice, RawLine};
use log::debug;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractedItem {
    #[serde(rename = "Codigo", default, deserialize_with = "text_or_number")]
    pub codigo: Option<String>,
    #[serde(rename = "Descripcion", default, deserialize_with = "text_or_number")]
    pub descripcion: Option<String>,

    // The extractor repeats some columns under two names; the first one wins.
    #[serde(default)]
    pub bulto: Option<RawAmount>,
    #[serde(rename = "Cantidad", default)]
    pub cantidad: Option<RawAmount>,
    #[serde(default)]
    pub px_bulto: Option<RawAmount>,
    #[serde(rename = "PrecioUnitario", default)]
    pub precio_unitario: Option<RawAmount>,
    #[serde(default)]
    pub neto: Option<RawAmount>,
    #[serde(rename = "Subtotal", default)]
    pub subtotal: Option<RawAmount>,

    #[serde(default)]
    pub desc: Option<RawAmount>,
    #[serde(default)]
    pub imp_int: Option<RawAmount>,
    #[serde(default)]
    pub iva_21: Option<RawAmount>,
}

impl ExtractedItem {
    pub fn into_raw_line(self) -> RawLine {
        RawLine {
            code: self.codigo,
            description: self.descripcion,
            quantity: self.bulto.or(self.cantidad),
            unit_price: self.px_bulto.or(self.precio_unitario),
            discount_amount: self.desc,
            net_subtotal: self.neto.or(self.subtotal),
            internal_tax: self.imp_int,
            vat: self.iva_21,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionPayload {
    #[serde(default, deserialize_with = "text_or_number")]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub invoice_total: Option<RawAmount>,
    #[serde(default, alias = "IB_CAP_FED_TOTAL")]
    pub iibb_caba_total: Option<RawAmount>,
    #[serde(default, alias = "PERC_RG_3337_TOTAL")]
    pub iibb_reg_3337_total: Option<RawAmount>,
    #[serde(default)]
    pub items: Vec<ExtractedItem>,
}

/// Older extractor versions returned only the item list.
#[derive(Deserialize)]
#[serde(untagged)]
enum PayloadShape {
    // Tried first: a struct would also accept a JSON array positionally.
    ItemsOnly(Vec<ExtractedItem>),
    Full(ExtractionPayload),
}

impl ExtractionPayload {
    pub fn from_json(json: &str) -> Result<RawInvoice> {
        let payload = match serde_json::from_str::<PayloadShape>(json)? {
            PayloadShape::Full(payload) => payload,
            PayloadShape::ItemsOnly(items) => {
                debug!("Extraction payload has no header or footer, only items");
                ExtractionPayload {
                    items,
                    ..ExtractionPayload::default()
                }
            }
        };
        Ok(payload.into_raw_invoice())
    }

    pub fn into_raw_invoice(self) -> RawInvoice {
        RawInvoice {
            invoice_number: self.invoice_number,
            lines: self
                .items
                .into_iter()
                .map(ExtractedItem::into_raw_line)
                .collect(),
            footer: InvoiceFooter {
                printed_total: self.invoice_total,
                provincial_tax_a_total: self.iibb_caba_total,
                provincial_tax_b_total: self.iibb_reg_3337_total,
            },
        }
    }
}

/// Codes like `2843` come back as numbers as often as strings.
fn text_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
