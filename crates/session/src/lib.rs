//! Session controller for tabsplit.
//!
//! A [`BillSession`] owns one bill's state — the parsed receipt, the
//! assignment store, and the chat transcript — and orchestrates the
//! external AI capabilities around the pure core: extract on upload,
//! interpret-then-reduce on each command, settle on demand.
//!
//! [`SharedSession`] wraps a session for concurrent callers and enforces
//! the concurrency contract: one command at a time (overlap is rejected,
//! not queued), and in-flight audit results are discarded when the session
//! has moved on underneath them.

pub mod controller;
pub mod transcript;

pub use controller::{
    AUDIT_FALLBACK, AuditOutcome, BillSession, CommandOutcome, INTERPRETATION_FALLBACK,
    SharedSession,
};
pub use transcript::{ChatEntry, Speaker};
