//! Order placement parameters

use serde::Serialize;

/// Form fields for placing or modifying an order.
///
/// Only fields that are set are sent. Modification typically sets a subset
/// (`quantity`, `price`, `order_type`, `trigger_price`, `validity`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrderParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tradingsymbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    /// `BUY` or `SELL`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    /// `MARKET`, `LIMIT`, `SL` or `SL-M`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// `CNC`, `NRML` or `MIS`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_price: Option<f64>,
    /// `DAY`, `IOC` or `TTL`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disclosed_quantity: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl OrderParams {
    /// Minimal market order.
    pub fn market(
        exchange: &str,
        tradingsymbol: &str,
        transaction_type: &str,
        quantity: u32,
        product: &str,
    ) -> Self {
        Self {
            tradingsymbol: Some(tradingsymbol.into()),
            exchange: Some(exchange.into()),
            transaction_type: Some(transaction_type.into()),
            order_type: Some("MARKET".into()),
            quantity: Some(quantity),
            product: Some(product.into()),
            ..Self::default()
        }
    }
}
