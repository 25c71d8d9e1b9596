//! Receipt domain types — the immutable output of extraction.
//!
//! A receipt is parsed once by an external multimodal model and then only
//! read. The serde shapes here double as the wire contract with the
//! extractor backends: missing `tip` defaults to zero, missing `quantity`
//! to one, because real receipts (and real models) omit both.

use serde::{Deserialize, Serialize};

/// A single line item on the receipt.
///
/// `price` is the line's full price as printed, not per-unit — a row of
/// "2x Lemonade  $8.00" carries `price: 8.0, quantity: 2` and is never
/// divided by `quantity` downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItem {
    /// Unique within a receipt, stable for the session. Extractor backends
    /// fill this in when the model omits it, so it may arrive empty on the
    /// wire but is never empty past extraction.
    #[serde(default)]
    pub id: String,

    /// The item name as printed
    pub name: String,

    /// Full line price (monetary)
    pub price: f64,

    /// Units on the line; informational only
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

/// The parsed receipt: line items plus declared totals.
///
/// `subtotal + tax + tip ≈ total` is a soft invariant — the extraction
/// source may be inconsistent, so nothing downstream assumes exactness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptData {
    #[serde(default)]
    pub items: Vec<ReceiptItem>,

    #[serde(default)]
    pub subtotal: f64,

    #[serde(default)]
    pub tax: f64,

    /// Absent on many receipts; defaults to zero
    #[serde(default)]
    pub tip: f64,

    #[serde(default)]
    pub total: f64,

    /// Currency symbol as printed (e.g. "$", "€")
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "$".into()
}

impl ReceiptData {
    /// Look up an item by id.
    pub fn item(&self, id: &str) -> Option<&ReceiptItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// True when extraction produced nothing worth keeping — used to reject
    /// an upload as unusable rather than creating an empty session.
    pub fn is_blank(&self) -> bool {
        self.items.is_empty() && self.total == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tip_and_quantity_default_when_absent() {
        let receipt: ReceiptData = serde_json::from_str(
            r#"{
                "items": [{"id": "1", "name": "Burger", "price": 10.0}],
                "subtotal": 10.0,
                "tax": 0.8,
                "total": 10.8,
                "currency": "$"
            }"#,
        )
        .unwrap();

        assert_eq!(receipt.tip, 0.0);
        assert_eq!(receipt.items[0].quantity, 1);
    }

    #[test]
    fn currency_defaults_to_dollar() {
        let receipt: ReceiptData = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert_eq!(receipt.currency, "$");
        assert!(receipt.is_blank());
    }

    #[test]
    fn item_lookup_by_id() {
        let receipt = ReceiptData {
            items: vec![
                ReceiptItem {
                    id: "1".into(),
                    name: "Burger".into(),
                    price: 10.0,
                    quantity: 1,
                },
                ReceiptItem {
                    id: "2".into(),
                    name: "Fries".into(),
                    price: 6.0,
                    quantity: 1,
                },
            ],
            subtotal: 16.0,
            tax: 1.6,
            tip: 3.2,
            total: 20.8,
            currency: "$".into(),
        };

        assert_eq!(receipt.item("2").unwrap().name, "Fries");
        assert!(receipt.item("99").is_none());
        assert!(!receipt.is_blank());
    }

    #[test]
    fn serialization_roundtrip() {
        let receipt = ReceiptData {
            items: vec![ReceiptItem {
                id: "1".into(),
                name: "Pad Thai".into(),
                price: 14.5,
                quantity: 1,
            }],
            subtotal: 14.5,
            tax: 1.2,
            tip: 2.9,
            total: 18.6,
            currency: "€".into(),
        };
        let json = serde_json::to_string(&receipt).unwrap();
        let back: ReceiptData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, receipt);
    }
}
