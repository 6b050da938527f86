//! Catalog product model.
//!
//! Products are dynamic records in the remote store; this module pins them to
//! a fixed schema at the loader boundary so downstream code never deals with
//! missing-field ambiguity. Optional fields get explicit defaults here:
//! `details` falls back to empty text and a missing or empty `image` becomes
//! `None`.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use abshine_core::{Price, ProductId};

/// Errors produced while validating a raw catalog record.
#[derive(Debug, Error)]
pub enum ProductRecordError {
    /// The record is not a JSON object.
    #[error("record is not an object")]
    NotAnObject,

    /// A required field is missing.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A field has the wrong type or an unparseable value.
    #[error("invalid field `{0}`")]
    InvalidField(&'static str),

    /// The price field is negative.
    #[error("negative price: {0}")]
    NegativePrice(Decimal),
}

/// A product from the catalog snapshot.
///
/// Immutable once fetched; cart lines copy the fields they display so the
/// cart stays renderable even if a later snapshot drops the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Externally assigned document key.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Price,
    /// Long description; empty when the record carries none.
    #[serde(default)]
    pub details: String,
    /// Image URI, if the record carries one.
    #[serde(default)]
    pub image: Option<String>,
}

impl Product {
    /// Validate a raw store record into a `Product`.
    ///
    /// # Errors
    ///
    /// Returns [`ProductRecordError`] when `name` or `price` is missing or
    /// malformed, or when the price is negative.
    pub fn from_record(id: ProductId, record: &Value) -> Result<Self, ProductRecordError> {
        let fields = record.as_object().ok_or(ProductRecordError::NotAnObject)?;

        let name = fields
            .get("name")
            .ok_or(ProductRecordError::MissingField("name"))?
            .as_str()
            .ok_or(ProductRecordError::InvalidField("name"))?
            .to_owned();

        let amount = fields
            .get("price")
            .ok_or(ProductRecordError::MissingField("price"))
            .and_then(|value| {
                decimal_value(value).ok_or(ProductRecordError::InvalidField("price"))
            })?;
        let price =
            Price::new(amount).map_err(|_| ProductRecordError::NegativePrice(amount))?;

        let details = fields
            .get("details")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();

        let image = fields
            .get("image")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_owned);

        Ok(Self {
            id,
            name,
            price,
            details,
            image,
        })
    }
}

/// Parse a JSON value into a decimal amount.
///
/// Store records carry prices as JSON numbers; string-encoded amounts are
/// accepted too since some records were written by hand.
fn decimal_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}
