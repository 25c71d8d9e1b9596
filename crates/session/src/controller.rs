//! The bill session controller — thin orchestration over the pure core.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use tabsplit_core::assignment::Assignments;
use tabsplit_core::audit::{AuditRequest, SplitAuditor};
use tabsplit_core::error::{Error, Result};
use tabsplit_core::extract::{ReceiptExtractor, ReceiptImage};
use tabsplit_core::interpret::{CommandContext, CommandInterpreter};
use tabsplit_core::receipt::ReceiptData;
use tabsplit_core::settle::{Settlement, settle};

use crate::transcript::ChatEntry;

/// Fixed apology appended when interpretation fails. The split stays
/// exactly as it was.
pub const INTERPRETATION_FALLBACK: &str =
    "Sorry — I couldn't make sense of that instruction. Nothing was changed; try rephrasing it.";

/// Fixed message shown in place of a failed audit report.
pub const AUDIT_FALLBACK: &str =
    "The fairness review couldn't be completed right now. The split itself is unaffected.";

/// One bill's state plus the AI capabilities that operate on it.
///
/// Receipt and assignments are owned exclusively here; the capabilities
/// only ever see read-only views and return new values.
pub struct BillSession {
    extractor: Arc<dyn ReceiptExtractor>,
    interpreter: Arc<dyn CommandInterpreter>,
    auditor: Arc<dyn SplitAuditor>,
    receipt: Option<ReceiptData>,
    assignments: Assignments,
    transcript: Vec<ChatEntry>,
    epoch: u64,
}

/// What a processed command hands back to the caller.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// The interpreter's conversational reply (or the fixed fallback)
    pub reply: String,

    /// Assignment state after the command
    pub assignments: Assignments,

    /// Settlement recomputed from that state
    pub settlement: Settlement,

    /// False when interpretation failed and nothing was applied
    pub applied: bool,
}

/// Result of an audit call through [`SharedSession`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// The narrative (or the fixed fallback on model failure)
    Report(String),

    /// The session was reset or got a new receipt while the model call was
    /// in flight; the result was discarded, not applied
    Stale,
}

impl BillSession {
    pub fn new(
        extractor: Arc<dyn ReceiptExtractor>,
        interpreter: Arc<dyn CommandInterpreter>,
        auditor: Arc<dyn SplitAuditor>,
    ) -> Self {
        Self {
            extractor,
            interpreter,
            auditor,
            receipt: None,
            assignments: Assignments::new(),
            transcript: Vec::new(),
            epoch: 0,
        }
    }

    pub fn receipt(&self) -> Option<&ReceiptData> {
        self.receipt.as_ref()
    }

    pub fn assignments(&self) -> &Assignments {
        &self.assignments
    }

    pub fn transcript(&self) -> &[ChatEntry] {
        &self.transcript
    }

    /// Generation counter; bumped on every upload and reset so that late
    /// async results can be recognized as stale.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Parse an uploaded receipt photo and start a fresh bill from it.
    ///
    /// On extraction failure no state changes at all — the previous
    /// receipt (if any) stays current and the user simply retries.
    pub async fn load_receipt(&mut self, image: &ReceiptImage) -> Result<&ReceiptData> {
        let receipt = self.extractor.extract(image).await?;
        info!(
            items = receipt.items.len(),
            total = receipt.total,
            "Receipt parsed"
        );

        self.assignments = Assignments::for_receipt(&receipt);
        self.transcript.clear();
        self.transcript.push(ChatEntry::assistant(format!(
            "I read {} item(s) off the receipt. Tell me who had what — e.g. \"the burger was Tom's\" or \"split the fries between everyone\".",
            receipt.items.len()
        )));
        self.epoch += 1;
        Ok(self.receipt.insert(receipt))
    }

    /// Process one user command: interpret → reduce → settle.
    ///
    /// The context handed to the interpreter reflects state *before* this
    /// command, so "everyone" resolves against the people already on the
    /// bill. The action batch is folded in all-or-nothing: on
    /// interpretation failure the store is untouched and the fixed
    /// apology is appended instead.
    pub async fn handle_command(&mut self, text: &str) -> Result<CommandOutcome> {
        let receipt = self.receipt.clone().ok_or(Error::NoReceipt)?;
        let context = CommandContext::from_state(&receipt, &self.assignments);
        self.transcript.push(ChatEntry::user(text));

        match self.interpreter.interpret(text, &context).await {
            Ok(interpretation) => {
                debug!(
                    actions = interpretation.assignments.len(),
                    "Applying interpreted actions"
                );
                self.assignments = self.assignments.apply(&interpretation.assignments);
                self.transcript
                    .push(ChatEntry::assistant(&interpretation.reply));

                Ok(CommandOutcome {
                    reply: interpretation.reply,
                    settlement: settle(&receipt, &self.assignments),
                    assignments: self.assignments.clone(),
                    applied: true,
                })
            }
            Err(e) => {
                warn!(error = %e, "Interpretation failed; assignments unchanged");
                self.transcript
                    .push(ChatEntry::assistant(INTERPRETATION_FALLBACK));

                Ok(CommandOutcome {
                    reply: INTERPRETATION_FALLBACK.into(),
                    settlement: settle(&receipt, &self.assignments),
                    assignments: self.assignments.clone(),
                    applied: false,
                })
            }
        }
    }

    /// Recompute the settlement from current state.
    pub fn settlement(&self) -> Result<Settlement> {
        let receipt = self.receipt.as_ref().ok_or(Error::NoReceipt)?;
        Ok(settle(receipt, &self.assignments))
    }

    /// Snapshot everything an audit needs, plus the epoch to check the
    /// result against once the model call returns.
    pub fn audit_snapshot(&self) -> Result<(AuditRequest, u64)> {
        let receipt = self.receipt.as_ref().ok_or(Error::NoReceipt)?;
        let settlement = settle(receipt, &self.assignments);
        Ok((AuditRequest::new(receipt, &settlement), self.epoch))
    }

    /// Drop all bill state. The epoch bump invalidates any in-flight
    /// audit.
    pub fn reset(&mut self) {
        self.receipt = None;
        self.assignments = Assignments::new();
        self.transcript.clear();
        self.epoch += 1;
        info!("Session reset");
    }
}

/// A session behind a lock, safe to hand to concurrent callers.
///
/// Commands and uploads are single-flight: a second submission while one
/// is in flight is rejected with [`Error::Busy`] rather than queued,
/// because the reducer's read-modify-write must not interleave. Reads
/// (settlement, transcript) wait their turn instead.
#[derive(Clone)]
pub struct SharedSession {
    inner: Arc<Mutex<BillSession>>,
    auditor: Arc<dyn SplitAuditor>,
}

impl SharedSession {
    pub fn new(session: BillSession) -> Self {
        let auditor = session.auditor.clone();
        Self {
            inner: Arc::new(Mutex::new(session)),
            auditor,
        }
    }

    pub async fn load_receipt(&self, image: &ReceiptImage) -> Result<ReceiptData> {
        let mut session = self.inner.try_lock().map_err(|_| Error::Busy)?;
        session.load_receipt(image).await.map(|r| r.clone())
    }

    pub async fn handle_command(&self, text: &str) -> Result<CommandOutcome> {
        let mut session = self.inner.try_lock().map_err(|_| Error::Busy)?;
        session.handle_command(text).await
    }

    pub async fn settlement(&self) -> Result<Settlement> {
        self.inner.lock().await.settlement()
    }

    pub async fn receipt(&self) -> Option<ReceiptData> {
        self.inner.lock().await.receipt().cloned()
    }

    pub async fn transcript(&self) -> Vec<ChatEntry> {
        self.inner.lock().await.transcript().to_vec()
    }

    pub async fn reset(&self) {
        self.inner.lock().await.reset();
    }

    /// Run the fairness audit.
    ///
    /// The session lock is NOT held while the model call is in flight —
    /// commands keep working during a slow audit. If the session was reset
    /// or re-uploaded in the meantime the narrative no longer describes
    /// current state, so it is discarded as [`AuditOutcome::Stale`].
    pub async fn audit(&self) -> Result<AuditOutcome> {
        let (request, epoch) = {
            let session = self.inner.lock().await;
            session.audit_snapshot()?
        };

        let report = match self.auditor.audit(&request).await {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Audit failed; using fallback message");
                AUDIT_FALLBACK.to_string()
            }
        };

        let session = self.inner.lock().await;
        if session.epoch() != epoch {
            debug!("Discarding stale audit result");
            return Ok(AuditOutcome::Stale);
        }
        Ok(AuditOutcome::Report(report))
    }
}
