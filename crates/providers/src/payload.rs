//! Shared parsing of model output into domain values.
//!
//! Both backends funnel their raw responses through here, so the tolerance
//! rules (fenced JSON, missing item ids, blank receipts) are identical
//! regardless of which provider answered.

use std::collections::HashSet;

use tabsplit_core::error::{ExtractionError, InterpretationError};
use tabsplit_core::interpret::Interpretation;
use tabsplit_core::receipt::ReceiptData;

/// Pull the first JSON object out of model output text.
///
/// Models wrap JSON in markdown fences or prepend prose more often than
/// not; tolerate both.
pub(crate) fn json_from_text(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            let block = after[..end].trim();
            if !block.is_empty() {
                return Some(block);
            }
        }
    }

    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    (end >= start).then(|| &trimmed[start..=end])
}

/// Parse extraction output into a receipt, rejecting unusable payloads.
pub(crate) fn parse_receipt(text: &str) -> Result<ReceiptData, ExtractionError> {
    let json = json_from_text(text)
        .ok_or_else(|| ExtractionError::Unusable("no JSON object in model output".into()))?;

    let mut receipt: ReceiptData = serde_json::from_str(json)
        .map_err(|e| ExtractionError::Unusable(format!("receipt JSON did not parse: {e}")))?;

    if receipt.is_blank() {
        return Err(ExtractionError::Unusable(
            "no line items or totals found in the image".into(),
        ));
    }

    ensure_item_ids(&mut receipt);
    Ok(receipt)
}

/// Give every item a non-empty id unique within the receipt. Ids the model
/// provided are kept; empty or duplicate ones are replaced with the lowest
/// free positional number.
fn ensure_item_ids(receipt: &mut ReceiptData) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut next = 1usize;

    for item in &mut receipt.items {
        let id = item.id.trim().to_string();
        if id.is_empty() || seen.contains(&id) {
            while seen.contains(&next.to_string()) {
                next += 1;
            }
            item.id = next.to_string();
        } else {
            item.id = id;
        }
        seen.insert(item.id.clone());
    }
}

/// Parse the structured tool input into an interpretation.
pub(crate) fn parse_interpretation(
    value: serde_json::Value,
) -> Result<Interpretation, InterpretationError> {
    serde_json::from_value(value)
        .map_err(|e| InterpretationError::Unusable(format!("instruction payload did not parse: {e}")))
}
