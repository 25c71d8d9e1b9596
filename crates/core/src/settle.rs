//! The settlement calculator — from receipt + assignments to a per-person
//! breakdown.
//!
//! Pure and validation-free: inputs are treated as possibly inconsistent
//! (negative prices, surplus assignees, totals that don't add up) because
//! correctness of the extracted data is the extractor's concern, not ours.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::assignment::Assignments;
use crate::receipt::{ReceiptData, ReceiptItem};

/// One person's share of the bill. Derived, recomputed on every call,
/// never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonTotal {
    pub name: String,

    /// Sum of this person's equal shares of their items
    pub subtotal: f64,

    /// Tax, proportional to subtotal share
    pub tax: f64,

    /// Tip, proportional to subtotal share
    pub tip: f64,

    pub total: f64,

    /// Every item this person is on. A shared item appears in each
    /// assignee's list, so display layers must not re-sum `item.price`
    /// per person — the equal share is already folded into `subtotal`.
    pub items: Vec<ReceiptItem>,
}

/// The computed breakdown for the whole bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Per-person breakdowns, in first-seen order
    pub people: Vec<PersonTotal>,

    /// Items nobody is assigned to, in receipt order
    pub unassigned: Vec<ReceiptItem>,

    /// Sum of per-person subtotals. With unassigned items this is below the
    /// receipt's declared subtotal; surfaced rather than corrected.
    pub assigned_subtotal: f64,

    /// Sum of per-person totals, for "Assigned" vs "Receipt Total" rows
    pub assigned_total: f64,
}

/// Compute the per-person breakdown.
///
/// Shared items split equally among their assignees (`price / n`; `price`
/// is the full line price, so `quantity` plays no part). Tax and tip are
/// then distributed proportionally to each person's share of the receipt's
/// *declared* subtotal — not the assigned sum — so partial assignment
/// legitimately settles below the receipt total. A zero declared subtotal
/// degenerates to zero tax and tip for everyone; intentional, not a bug.
pub fn settle(receipt: &ReceiptData, assignments: &Assignments) -> Settlement {
    let mut people: IndexMap<String, PersonTotal> = IndexMap::new();
    let mut unassigned = Vec::new();

    for item in &receipt.items {
        let assignees = assignments
            .assignees(&item.id)
            .filter(|set| !set.is_empty());

        let Some(assignees) = assignees else {
            unassigned.push(item.clone());
            continue;
        };

        let share = item.price / assignees.len() as f64;
        for name in assignees {
            let person = people
                .entry(name.clone())
                .or_insert_with(|| PersonTotal {
                    name: name.clone(),
                    subtotal: 0.0,
                    tax: 0.0,
                    tip: 0.0,
                    total: 0.0,
                    items: Vec::new(),
                });
            person.subtotal += share;
            person.items.push(item.clone());
        }
    }

    let assigned_subtotal: f64 = people.values().map(|p| p.subtotal).sum();

    for person in people.values_mut() {
        let ratio = if receipt.subtotal > 0.0 {
            person.subtotal / receipt.subtotal
        } else {
            0.0
        };
        person.tax = receipt.tax * ratio;
        person.tip = receipt.tip * ratio;
        person.total = person.subtotal + person.tax + person.tip;
    }

    let assigned_total = people.values().map(|p| p.total).sum();

    Settlement {
        people: people.into_values().collect(),
        unassigned,
        assigned_subtotal,
        assigned_total,
    }
}
