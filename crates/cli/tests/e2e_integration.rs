//! End-to-end integration tests for the tabsplit pipeline.
//!
//! These exercise the full path — receipt upload, chat commands,
//! settlement, audit — with scripted model backends, no network.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use tabsplit_core::assignment::AssignmentAction;
use tabsplit_core::audit::{AuditRequest, SplitAuditor};
use tabsplit_core::error::{AuditError, Error, ExtractionError, InterpretationError};
use tabsplit_core::extract::{ReceiptExtractor, ReceiptImage};
use tabsplit_core::interpret::{CommandContext, CommandInterpreter, Interpretation};
use tabsplit_core::receipt::{ReceiptData, ReceiptItem};
use tabsplit_session::{AuditOutcome, BillSession, INTERPRETATION_FALLBACK, SharedSession};

// ── Scripted backend ─────────────────────────────────────────────────────

/// One backend covering all three capabilities with scripted behavior.
struct ScriptedModel {
    receipt: ReceiptData,
    interpretations: Mutex<Vec<Result<Interpretation, InterpretationError>>>,
    contexts: Mutex<Vec<CommandContext>>,
    audit_requests: Mutex<Vec<AuditRequest>>,
}

impl ScriptedModel {
    fn new(
        receipt: ReceiptData,
        interpretations: Vec<Result<Interpretation, InterpretationError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            receipt,
            interpretations: Mutex::new(interpretations),
            contexts: Mutex::new(Vec::new()),
            audit_requests: Mutex::new(Vec::new()),
        })
    }

    fn reply(reply: &str, actions: Vec<AssignmentAction>) -> Result<Interpretation, InterpretationError> {
        Ok(Interpretation {
            reply: reply.into(),
            assignments: actions,
        })
    }
}

#[async_trait]
impl ReceiptExtractor for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn extract(&self, _image: &ReceiptImage) -> Result<ReceiptData, ExtractionError> {
        Ok(self.receipt.clone())
    }
}

#[async_trait]
impl CommandInterpreter for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn interpret(
        &self,
        _text: &str,
        context: &CommandContext,
    ) -> Result<Interpretation, InterpretationError> {
        self.contexts.lock().unwrap().push(context.clone());
        self.interpretations.lock().unwrap().remove(0)
    }
}

#[async_trait]
impl SplitAuditor for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn audit(&self, request: &AuditRequest) -> Result<String, AuditError> {
        self.audit_requests.lock().unwrap().push(request.clone());
        Ok("The split covers the whole bill and looks fair.".into())
    }
}

fn burger_fries_receipt() -> ReceiptData {
    ReceiptData {
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
    }
}

fn session_with(model: Arc<ScriptedModel>) -> SharedSession {
    SharedSession::new(BillSession::new(model.clone(), model.clone(), model))
}

async fn upload(session: &SharedSession) -> ReceiptData {
    session
        .load_receipt(&ReceiptImage::new(vec![0xFF, 0xD8], "image/jpeg"))
        .await
        .expect("extraction should succeed")
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_flow_from_upload_to_audit() {
    let model = ScriptedModel::new(
        burger_fries_receipt(),
        vec![
            ScriptedModel::reply(
                "Burger on Tom.",
                vec![AssignmentAction::assign(["1"], ["Tom"])],
            ),
            ScriptedModel::reply(
                "Fries split between Tom and Ana.",
                vec![AssignmentAction::assign(["2"], ["Tom", "Ana"])],
            ),
        ],
    );
    let session = session_with(model.clone());

    let receipt = upload(&session).await;
    assert_eq!(receipt.items.len(), 2);

    // Before any command, everything is unassigned.
    let settlement = session.settlement().await.unwrap();
    assert!(settlement.people.is_empty());
    assert_eq!(settlement.unassigned.len(), 2);

    session.handle_command("the burger was Tom's").await.unwrap();
    let outcome = session
        .handle_command("Tom and Ana shared the fries")
        .await
        .unwrap();

    assert!(outcome.applied);
    assert!(outcome.settlement.unassigned.is_empty());

    let tom = &outcome.settlement.people[0];
    assert_eq!(tom.name, "Tom");
    assert!((tom.subtotal - 13.0).abs() < 1e-9);
    assert!((tom.tax - 1.3).abs() < 1e-9);
    assert!((tom.tip - 2.6).abs() < 1e-9);
    assert!((tom.total - 16.9).abs() < 1e-9);

    let ana = &outcome.settlement.people[1];
    assert_eq!(ana.name, "Ana");
    assert!((ana.total - 3.9).abs() < 1e-9);

    assert!((outcome.settlement.assigned_total - 20.8).abs() < 1e-9);

    // The audit sees the same breakdown the caller got.
    let audit = session.audit().await.unwrap();
    assert!(matches!(audit, AuditOutcome::Report(_)));
    let requests = model.audit_requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].people.len(), 2);
    assert!(requests[0].unassigned.is_empty());
    assert_eq!(requests[0].total, 20.8);
}

#[tokio::test]
async fn interpreter_context_grows_with_each_command() {
    let model = ScriptedModel::new(
        burger_fries_receipt(),
        vec![
            ScriptedModel::reply(
                "Burger on Tom, fries on Ana.",
                vec![
                    AssignmentAction::assign(["1"], ["Tom"]),
                    AssignmentAction::assign(["2"], ["Ana"]),
                ],
            ),
            ScriptedModel::reply(
                "Everyone shares the fries now.",
                vec![AssignmentAction::assign(["2"], ["Tom", "Ana"])],
            ),
        ],
    );
    let session = session_with(model.clone());
    upload(&session).await;

    session
        .handle_command("burger for Tom, fries for Ana")
        .await
        .unwrap();
    session
        .handle_command("actually split the fries between everyone")
        .await
        .unwrap();

    let contexts = model.contexts.lock().unwrap();
    // First command sees an empty bill; the second sees the people the
    // first one created — the "everyone" set.
    assert!(contexts[0].people.is_empty());
    assert_eq!(contexts[1].people, ["Tom", "Ana"]);
    assert_eq!(contexts[1].items.len(), 2);
}

#[tokio::test]
async fn failed_command_does_not_disturb_the_split() {
    let model = ScriptedModel::new(
        burger_fries_receipt(),
        vec![
            ScriptedModel::reply(
                "Burger on Tom.",
                vec![AssignmentAction::assign(["1"], ["Tom"])],
            ),
            Err(InterpretationError::Unusable("model went sideways".into())),
            ScriptedModel::reply(
                "Fries on Ana.",
                vec![AssignmentAction::assign(["2"], ["Ana"])],
            ),
        ],
    );
    let session = session_with(model);
    upload(&session).await;

    session.handle_command("the burger was Tom's").await.unwrap();

    let failed = session.handle_command("???").await.unwrap();
    assert!(!failed.applied);
    assert_eq!(failed.reply, INTERPRETATION_FALLBACK);

    // Tom's burger survived the failure, and the session keeps working.
    let tom = &failed.settlement.people[0];
    assert!((tom.subtotal - 10.0).abs() < 1e-9);

    let recovered = session.handle_command("fries for Ana").await.unwrap();
    assert!(recovered.applied);
    assert!(recovered.settlement.unassigned.is_empty());
}

#[tokio::test]
async fn reset_starts_over() {
    let model = ScriptedModel::new(
        burger_fries_receipt(),
        vec![ScriptedModel::reply(
            "Burger on Tom.",
            vec![AssignmentAction::assign(["1"], ["Tom"])],
        )],
    );
    let session = session_with(model);
    upload(&session).await;
    session.handle_command("the burger was Tom's").await.unwrap();

    session.reset().await;

    assert!(session.receipt().await.is_none());
    assert!(matches!(
        session.settlement().await,
        Err(Error::NoReceipt)
    ));
    assert!(session.transcript().await.is_empty());
}

#[tokio::test]
async fn reupload_replaces_the_bill() {
    let model = ScriptedModel::new(
        burger_fries_receipt(),
        vec![ScriptedModel::reply(
            "Burger on Tom.",
            vec![AssignmentAction::assign(["1"], ["Tom"])],
        )],
    );
    let session = session_with(model);

    upload(&session).await;
    session.handle_command("the burger was Tom's").await.unwrap();

    // A second upload starts a fresh bill: assignments are gone.
    upload(&session).await;
    let settlement = session.settlement().await.unwrap();
    assert!(settlement.people.is_empty());
    assert_eq!(settlement.unassigned.len(), 2);
}
