//! Order and business payloads received from the POS client
//!
//! The web client sends loosely typed JSON. Everything is parsed into typed
//! records here, at the boundary, with explicit fallbacks: unknown enum values
//! become `Other`, missing amounts become zero and missing names get a
//! placeholder.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Deserializer};

/// Body of `POST /print`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintRequest {
    /// Required; its absence is rejected as invalid order data
    pub order: Option<Order>,
    #[serde(default)]
    pub business_info: BusinessInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(default)]
    pub order_number: i64,
    #[serde(default)]
    pub order_type: OrderType,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub subtotal: Decimal,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub tax: Decimal,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total: Decimal,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub staff_name: Option<String>,
    /// Clients send either `"12"` or `12`
    #[serde(default, deserialize_with = "string_or_number")]
    pub table_number: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    #[serde(default = "default_item_name")]
    pub name: String,
    #[serde(default = "default_quantity", deserialize_with = "lenient_quantity")]
    pub quantity: u32,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_price: Decimal,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedOption {
    #[serde(default)]
    pub option_name: Option<String>,
}

fn default_item_name() -> String {
    "Item".to_string()
}

fn default_quantity() -> u32 {
    1
}

/// Business profile printed in the receipt header and footer
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub vat_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "Option<String>")]
pub enum OrderType {
    DineIn,
    #[default]
    Takeaway,
    Delivery,
    Other(String),
}

impl From<Option<String>> for OrderType {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            None => Self::default(),
            Some("DINE_IN") => Self::DineIn,
            Some("TAKEAWAY") => Self::Takeaway,
            Some("DELIVERY") => Self::Delivery,
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

impl OrderType {
    /// Banner printed under the header
    pub fn label(&self) -> &'static str {
        match self {
            Self::DineIn => "HIER OPETEN",
            Self::Takeaway => "AFHALEN",
            Self::Delivery => "BEZORGEN",
            Self::Other(_) => "BESTELLING",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "Option<String>")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Ideal,
    Bancontact,
    Other(String),
}

impl From<Option<String>> for PaymentMethod {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            None => Self::default(),
            Some("CASH") => Self::Cash,
            Some("CARD") => Self::Card,
            Some("IDEAL") => Self::Ideal,
            Some("BANCONTACT") => Self::Bancontact,
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

impl PaymentMethod {
    /// Label after "Betaald met:"; unknown methods print as sent
    pub fn label(&self) -> &str {
        match self {
            Self::Cash => "Contant",
            Self::Card => "PIN/Kaart",
            Self::Ideal => "iDEAL",
            Self::Bancontact => "Bancontact",
            Self::Other(raw) => raw,
        }
    }
}

/// Treat empty strings like absent fields
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Whole non-negative numbers (`2`, `2.0`, `"2"`); anything else is 1
fn lenient_quantity<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let quantity = match value {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(quantity
        .and_then(|q| u32::try_from(q).ok())
        .unwrap_or_else(default_quantity))
}

/// Numbers or numeric strings; `null` and anything unparsable is zero
fn lenient_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let amount = match value {
        Some(serde_json::Value::Number(n)) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Some(serde_json::Value::String(s)) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    };
    Ok(amount.unwrap_or(Decimal::ZERO))
}
