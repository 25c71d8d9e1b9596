//! Item-to-person assignment state and the reducer that evolves it.
//!
//! [`Assignments`] is the single source of truth for "who owes what". It is
//! mutated only through [`Assignments::apply`], which folds a batch of
//! structured actions into a fresh value — the input is never touched, so
//! a failed command can simply drop the batch and keep the prior state.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::receipt::ReceiptData;

/// What a single instruction does to the items it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Assign,
    Unassign,
}

/// One structured instruction from the command interpreter.
///
/// This is the wire contract with the external model: a batch of these is
/// applied atomically, left to right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentAction {
    #[serde(default)]
    pub item_ids: Vec<String>,

    #[serde(default)]
    pub people: Vec<String>,

    pub action: ActionKind,
}

impl AssignmentAction {
    /// Build an assign action.
    pub fn assign(
        item_ids: impl IntoIterator<Item = impl Into<String>>,
        people: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            item_ids: item_ids.into_iter().map(Into::into).collect(),
            people: people.into_iter().map(Into::into).collect(),
            action: ActionKind::Assign,
        }
    }

    /// Build an unassign action.
    pub fn unassign(
        item_ids: impl IntoIterator<Item = impl Into<String>>,
        people: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            item_ids: item_ids.into_iter().map(Into::into).collect(),
            people: people.into_iter().map(Into::into).collect(),
            action: ActionKind::Unassign,
        }
    }
}

/// Who is currently responsible for each receipt item.
///
/// Maps item id → set of person names. Both the map and the per-item sets
/// preserve insertion order: previously-assigned people keep their relative
/// order and newly added people are appended, which makes output (and tests)
/// deterministic. An absent key means the same thing as an empty set:
/// unassigned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Assignments {
    by_item: IndexMap<String, IndexSet<String>>,
}

impl Assignments {
    /// An empty store with no item entries at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// One empty set per item id, in receipt order — the state right after
    /// a receipt is parsed.
    pub fn for_receipt(receipt: &ReceiptData) -> Self {
        let by_item = receipt
            .items
            .iter()
            .map(|item| (item.id.clone(), IndexSet::new()))
            .collect();
        Self { by_item }
    }

    /// The people assigned to `item_id`, if any entry exists.
    pub fn assignees(&self, item_id: &str) -> Option<&IndexSet<String>> {
        self.by_item.get(item_id)
    }

    /// Every distinct person across all items, in first-seen order. This is
    /// the "existing people" set handed to the interpreter so that
    /// "everyone" resolves against real names.
    pub fn people(&self) -> IndexSet<String> {
        let mut people = IndexSet::new();
        for assignees in self.by_item.values() {
            for name in assignees {
                people.insert(name.clone());
            }
        }
        people
    }

    /// Iterate `(item_id, assignees)` in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &IndexSet<String>)> {
        self.by_item.iter()
    }

    /// True when no item has anyone assigned.
    pub fn is_all_unassigned(&self) -> bool {
        self.by_item.values().all(IndexSet::is_empty)
    }

    /// Fold a batch of actions into a new store. The reducer.
    ///
    /// Actions apply left to right, so later actions in the same batch
    /// observe the effect of earlier ones. An action with an empty people
    /// list is a no-op for every item it names. Item ids that are not on
    /// the receipt are accepted and get an entry anyway — the interpreter
    /// may hallucinate ids, and reconciliation against the real item list
    /// happens at settlement time.
    #[must_use = "apply returns a new store; the input is unchanged"]
    pub fn apply(&self, actions: &[AssignmentAction]) -> Assignments {
        let mut next = self.clone();
        for action in actions {
            if action.people.is_empty() {
                continue;
            }
            for item_id in &action.item_ids {
                let assignees = next.by_item.entry(item_id.clone()).or_default();
                match action.action {
                    ActionKind::Assign => {
                        for person in &action.people {
                            assignees.insert(person.clone());
                        }
                    }
                    ActionKind::Unassign => {
                        for person in &action.people {
                            assignees.shift_remove(person);
                        }
                    }
                }
            }
        }
        next
    }
}
