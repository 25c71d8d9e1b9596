//! # Tabsplit Core
//!
//! Domain types, the assignment reducer, and the settlement calculator for
//! the tabsplit bill-splitting engine. This crate has **zero framework
//! dependencies** — it defines the data model and the pure algorithms that
//! all other crates build on.
//!
//! ## Design Philosophy
//!
//! The three external AI capabilities (receipt extraction, command
//! interpretation, split auditing) are defined as traits here. Backend
//! implementations live in `tabsplit-providers`. This enables:
//! - Swapping the backing model/service via configuration
//! - Easy testing with scripted/stub implementations
//! - Clean dependency graph (all crates depend inward on core)
//!
//! The reducer ([`Assignments::apply`]) and the calculator ([`settle`]) are
//! pure: they take read-only views and return new values, so they can be
//! called repeatedly without synchronization.

pub mod assignment;
pub mod audit;
pub mod error;
pub mod extract;
pub mod interpret;
pub mod receipt;
pub mod settle;

// Re-export key types at crate root for ergonomics
pub use assignment::{ActionKind, AssignmentAction, Assignments};
pub use audit::{AuditRequest, SplitAuditor};
pub use error::{Error, Result};
pub use extract::{ReceiptExtractor, ReceiptImage};
pub use interpret::{CommandContext, CommandInterpreter, Interpretation};
pub use receipt::{ReceiptData, ReceiptItem};
pub use settle::{PersonTotal, Settlement, settle};
