//! Prompt text and tool schemas shared by all model backends.
//!
//! The prompts ARE the behavioral contract with the external model: the
//! extraction prompt pins the JSON shape, and the interpretation prompt
//! pins the "everyone" resolution rule. Keep them backend-agnostic; each
//! backend only decides how to ship them over the wire.

use std::fmt::Write as _;

use tabsplit_core::audit::AuditRequest;
use tabsplit_core::interpret::CommandContext;

/// Instruction sent alongside the receipt photo.
pub const EXTRACT_PROMPT: &str = "\
You are reading a photo of a restaurant receipt. Extract every line item \
and the totals, and respond with ONLY a JSON object in exactly this shape:

{
  \"items\": [{\"id\": \"1\", \"name\": \"...\", \"price\": 0.0, \"quantity\": 1}],
  \"subtotal\": 0.0,
  \"tax\": 0.0,
  \"tip\": 0.0,
  \"total\": 0.0,
  \"currency\": \"$\"
}

Rules:
- Number item ids sequentially from \"1\" in receipt order.
- \"price\" is the full price printed on the line, NOT per unit.
- If no tip is printed, use 0 for \"tip\".
- \"currency\" is the currency symbol printed on the receipt.
- If a value is unreadable, use your best estimate rather than omitting it.
- No markdown, no commentary, JSON only.";

/// Name of the forced tool the interpreter answers through.
pub const SPLIT_TOOL_NAME: &str = "record_split_update";

/// Tool description shown to the model.
pub const SPLIT_TOOL_DESCRIPTION: &str = "Record the assignment changes requested by the user, plus a short conversational reply.";

/// JSON Schema for the interpreter's structured answer.
pub fn split_tool_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "reply": {
                "type": "string",
                "description": "Short friendly reply confirming what changed (or why nothing did)"
            },
            "assignments": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "item_ids": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Receipt item ids this action applies to"
                        },
                        "people": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Person names, capitalized consistently"
                        },
                        "action": {
                            "type": "string",
                            "enum": ["assign", "unassign"]
                        }
                    },
                    "required": ["item_ids", "people", "action"]
                }
            }
        },
        "required": ["reply"]
    })
}

/// Build the interpretation prompt from the user command plus current state.
pub fn interpret_prompt(text: &str, context: &CommandContext) -> String {
    let mut prompt = String::from(
        "You manage who pays for what on a shared restaurant bill. \
         Translate the user's instruction into assignment changes and call \
         the record_split_update tool with the result.\n\nReceipt items:\n",
    );

    for item in &context.items {
        let _ = writeln!(prompt, "- id {}: {} ({:.2})", item.id, item.name, item.price);
    }

    if context.people.is_empty() {
        prompt.push_str("\nNobody has been assigned to anything yet.\n");
    } else {
        let _ = writeln!(
            prompt,
            "\nPeople already on the bill: {}.",
            context.people.join(", ")
        );
    }

    prompt.push_str(
        "\nRules:\n\
         - \"everyone\", \"all\", \"the group\" and similar refer to the \
           people already on the bill; never invent names for them. Only \
           if that list is empty may you ask the user to name people in \
           your reply and make no changes.\n\
         - Match item references to the ids above (\"the burger\" → its id).\n\
         - Use one action per distinct group of items and people.\n\
         - To move an item between people, unassign then assign.\n\
         - If the instruction changes nothing, return an empty assignments \
           list and explain in the reply.\n\n",
    );

    let _ = write!(prompt, "User instruction: {text}");
    prompt
}

/// Build the audit prompt from a settlement snapshot.
pub fn audit_prompt(request: &AuditRequest) -> String {
    let cur = &request.currency;
    let mut prompt = String::from(
        "Review this bill split for fairness and respond with a short \
         markdown report (a few sentences plus bullets where useful). \
         Point out unassigned items, lopsided shares, and whether the \
         assigned amounts cover the receipt total.\n\nReceipt totals: ",
    );
    let _ = writeln!(
        prompt,
        "subtotal {cur}{:.2}, tax {cur}{:.2}, tip {cur}{:.2}, total {cur}{:.2}.",
        request.subtotal, request.tax, request.tip, request.total
    );

    prompt.push_str("\nPer-person breakdown:\n");
    if request.people.is_empty() {
        prompt.push_str("- nobody has been assigned anything yet\n");
    }
    for person in &request.people {
        let items: Vec<&str> = person.items.iter().map(|i| i.name.as_str()).collect();
        let _ = writeln!(
            prompt,
            "- {}: subtotal {cur}{:.2}, tax {cur}{:.2}, tip {cur}{:.2}, total {cur}{:.2} ({})",
            person.name,
            person.subtotal,
            person.tax,
            person.tip,
            person.total,
            items.join(", ")
        );
    }

    if !request.unassigned.is_empty() {
        prompt.push_str("\nStill unassigned:\n");
        for item in &request.unassigned {
            let _ = writeln!(prompt, "- {} ({cur}{:.2})", item.name, item.price);
        }
    }

    prompt
}
