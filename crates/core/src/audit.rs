//! SplitAuditor trait — the capability "given the computed split, return a
//! prose fairness review".
//!
//! Purely advisory: the narrative never mutates state, and a failed audit
//! is displayed as a fixed fallback message rather than an error.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AuditError;
use crate::receipt::{ReceiptData, ReceiptItem};
use crate::settle::{PersonTotal, Settlement};

/// Everything the auditor gets to see: receipt totals plus the computed
/// breakdown. A value snapshot, so the session can release its lock while
/// the model call is in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRequest {
    pub currency: String,
    pub subtotal: f64,
    pub tax: f64,
    pub tip: f64,
    pub total: f64,
    pub people: Vec<PersonTotal>,
    pub unassigned: Vec<ReceiptItem>,
}

impl AuditRequest {
    pub fn new(receipt: &ReceiptData, settlement: &Settlement) -> Self {
        Self {
            currency: receipt.currency.clone(),
            subtotal: receipt.subtotal,
            tax: receipt.tax,
            tip: receipt.tip,
            total: receipt.total,
            people: settlement.people.clone(),
            unassigned: settlement.unassigned.clone(),
        }
    }
}

/// The audit capability. Returns a markdown report.
#[async_trait]
pub trait SplitAuditor: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Review the split for fairness.
    async fn audit(&self, request: &AuditRequest) -> std::result::Result<String, AuditError>;
}
