//! CommandInterpreter trait — the capability "given text plus context,
//! return structured assignment actions".
//!
//! The free-text-to-action translation is delegated to an external model;
//! the core defines the action contract and the context the interpreter
//! must be supplied with.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::assignment::{AssignmentAction, Assignments};
use crate::error::InterpretationError;
use crate::receipt::ReceiptData;

/// A slim view of one receipt item, enough for the model to refer to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemRef {
    pub id: String,
    pub name: String,
    pub price: f64,
}

/// Read-only context supplied with every command.
///
/// `people` is the distinct set of already-assigned names, in first-seen
/// order, reflecting state *before* the current command — the interpreter
/// resolves "everyone"/"all"/"the group" against it instead of inventing
/// names (unless it is empty).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandContext {
    pub items: Vec<ItemRef>,
    pub people: Vec<String>,
}

impl CommandContext {
    /// Build the context from current session state.
    pub fn from_state(receipt: &ReceiptData, assignments: &Assignments) -> Self {
        Self {
            items: receipt
                .items
                .iter()
                .map(|item| ItemRef {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    price: item.price,
                })
                .collect(),
            people: assignments.people().into_iter().collect(),
        }
    }
}

/// What the interpreter hands back: a conversational reply plus the batch
/// of actions to fold into the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interpretation {
    pub reply: String,

    #[serde(default)]
    pub assignments: Vec<AssignmentAction>,
}

/// The interpretation capability.
///
/// Failure is terminal for that single command: the caller shows a fallback
/// message and must NOT mutate assignments.
#[async_trait]
pub trait CommandInterpreter: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Translate one user command into a reply and a batch of actions.
    async fn interpret(
        &self,
        text: &str,
        context: &CommandContext,
    ) -> std::result::Result<Interpretation, InterpretationError>;
}
