//! Shipping-bill data model.
//!
//! Three shapes of the same field set:
//!
//! * [`PartialRecord`] — what the extractor saw on **one page**. Every field
//!   is an `Option`: `None` means "not observed on this page".
//! * [`ShippingBillRecord`] — the finalised result for **one document**.
//!   Every scalar is a [`Field`]: either a value or [`Field::Unknown`]
//!   ("examined, not found"). Nothing is left uninitialised.
//! * [`LineItem`] — one good on the bill. Items are never merged field by
//!   field, so their fields are [`Field`]s from the moment they are parsed.
//!
//! The JSON field names (`csbNumber`, `fillingDate`, …) are the extraction
//! contract with the vision model and must not change.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A value that was either found or explicitly marked unknown.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field<T> {
    Known(T),
    Unknown,
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Unknown
    }
}

impl<T> Field<T> {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Field::Unknown)
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Field::Known(v) => Some(v),
            Field::Unknown => None,
        }
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Known(v) => Some(v),
            Field::Unknown => None,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Known(v),
            None => Field::Unknown,
        }
    }
}

impl Field<String> {
    /// Null-coalescing for text: blank strings count as unknown.
    pub fn text(value: Option<String>) -> Self {
        match value {
            Some(s) if !s.trim().is_empty() => Field::Known(s),
            _ => Field::Unknown,
        }
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_option().serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Field::from)
    }
}

/// Integer fields as models actually send them: `5`, `5.0` or `" 5 "`.
///
/// Fractional values and non-numeric text are still rejected.
mod lenient_int {
    use super::Field;
    use serde::de::{self, Deserializer, Unexpected, Visitor};
    use std::fmt;

    struct IntVisitor;

    impl<'de> Visitor<'de> for IntVisitor {
        type Value = Option<i64>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an integer, an integral float or a numeric string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            i64::try_from(v)
                .map(Some)
                .map_err(|_| E::invalid_value(Unexpected::Unsigned(v), &self))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            integral(v).map(Some).ok_or_else(|| E::invalid_value(Unexpected::Float(v), &self))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let t = v.trim();
            if t.is_empty() {
                return Ok(None);
            }
            t.parse::<i64>()
                .ok()
                .or_else(|| t.parse::<f64>().ok().and_then(integral))
                .map(Some)
                .ok_or_else(|| E::invalid_value(Unexpected::Str(v), &self))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(IntVisitor)
        }
    }

    fn integral(v: f64) -> Option<i64> {
        (v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64).then_some(v as i64)
    }

    pub fn option<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        d.deserialize_any(IntVisitor)
    }

    pub fn field<'de, D: Deserializer<'de>>(d: D) -> Result<Field<i64>, D::Error> {
        option(d).map(Field::from)
    }
}

/// One purchased good listed in the ITEM DETAILS section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineItem {
    pub description: Field<String>,
    pub sku: Field<String>,
    /// Customs tariff (CTSH) classification code.
    pub ctsh: Field<String>,
    #[serde(deserialize_with = "lenient_int::field")]
    pub quantity: Field<i64>,
    pub unit_price: Field<Decimal>,
    pub unit_price_currency: Field<String>,
    pub total_value: Field<Decimal>,
    pub unit_of_measure: Field<String>,
}

impl LineItem {
    /// Apply blank-string coalescing to every text field.
    pub fn normalised(self) -> Self {
        Self {
            description: Field::text(self.description.into_option()),
            sku: Field::text(self.sku.into_option()),
            ctsh: Field::text(self.ctsh.into_option()),
            unit_price_currency: Field::text(self.unit_price_currency.into_option()),
            unit_of_measure: Field::text(self.unit_of_measure.into_option()),
            ..self
        }
    }
}

/// Page-scoped extraction result; any field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub csb_number: Option<String>,
    #[serde(rename = "fillingDate", skip_serializing_if = "Option::is_none")]
    pub filing_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_registration_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub courier_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hawb_number: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_int::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub number_of_packages: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub declared_weight_kg: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airport_of_destination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignor_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignee_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignee_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fob_value_inr: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fob_value_foreign: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fob_currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_items: Option<Vec<LineItem>>,
}

/// The consolidated, immutable result for one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingBillRecord {
    pub file_name: String,
    pub csb_number: Field<String>,
    #[serde(rename = "fillingDate")]
    pub filing_date: Field<String>,
    pub courier_registration_number: Field<String>,
    pub courier_name: Field<String>,
    pub hawb_number: Field<String>,
    pub number_of_packages: Field<i64>,
    pub declared_weight_kg: Field<Decimal>,
    pub airport_of_destination: Field<String>,
    pub consignor_name: Field<String>,
    pub consignor_address: Field<String>,
    pub consignee_name: Field<String>,
    pub consignee_address: Field<String>,
    pub invoice_number: Field<String>,
    pub invoice_date: Field<String>,
    pub fob_value_inr: Field<Decimal>,
    pub fob_value_foreign: Field<Decimal>,
    pub fob_currency: Field<String>,
    pub line_items: Vec<LineItem>,
}

impl ShippingBillRecord {
    /// Finalise a merged page record: absent scalars become
    /// [`Field::Unknown`], absent line items become an empty list.
    pub fn from_merged(file_name: impl Into<String>, merged: PartialRecord) -> Self {
        Self {
            file_name: file_name.into(),
            csb_number: Field::text(merged.csb_number),
            filing_date: Field::text(merged.filing_date),
            courier_registration_number: Field::text(merged.courier_registration_number),
            courier_name: Field::text(merged.courier_name),
            hawb_number: Field::text(merged.hawb_number),
            number_of_packages: merged.number_of_packages.into(),
            declared_weight_kg: merged.declared_weight_kg.into(),
            airport_of_destination: Field::text(merged.airport_of_destination),
            consignor_name: Field::text(merged.consignor_name),
            consignor_address: Field::text(merged.consignor_address),
            consignee_name: Field::text(merged.consignee_name),
            consignee_address: Field::text(merged.consignee_address),
            invoice_number: Field::text(merged.invoice_number),
            invoice_date: Field::text(merged.invoice_date),
            fob_value_inr: merged.fob_value_inr.into(),
            fob_value_foreign: merged.fob_value_foreign.into(),
            fob_currency: Field::text(merged.fob_currency),
            line_items: merged
                .line_items
                .unwrap_or_default()
                .into_iter()
                .map(LineItem::normalised)
                .collect(),
        }
    }
}
