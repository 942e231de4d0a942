use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::service::{
    ManualPayment, PaymentSubmission, PaymentWorkflow, ReviewRequest, SubmissionReceipt,
};
use crate::adapters::{Mailer, ProofFile, ProofStorage, PropertyStore};
use crate::domain::{Payment, PaymentId, PaymentMethod, PaymentType, ReviewDecision, UserId};

/// Query half of a proof upload; the request body is the raw file.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionParams {
    pub user_id: String,
    pub amount: u32,
    #[serde(default)]
    pub currency: Option<String>,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub payment_type: PaymentType,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResubmissionParams {
    pub user_id: String,
    #[serde(default)]
    pub reference_number: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewBody {
    pub reviewer_id: String,
    pub decision: ReviewDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkPaidBody {
    pub manager_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepParams {
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// Router exposing submission, review and settlement endpoints.
pub fn payment_router<S, P, M>(workflow: Arc<PaymentWorkflow<S, P, M>>) -> Router
where
    S: PropertyStore + 'static,
    P: ProofStorage + 'static,
    M: Mailer + 'static,
{
    // Oversized proofs must reach validation to get a descriptive error.
    let body_limit = workflow.config().max_proof_bytes.saturating_mul(2);
    Router::new()
        .route("/api/v1/payments", post(record_handler::<S, P, M>))
        .route(
            "/api/v1/payment-submissions",
            post(submit_handler::<S, P, M>),
        )
        .route(
            "/api/v1/payment-submissions/pending",
            get(pending_handler::<S, P, M>),
        )
        .route(
            "/api/v1/payments/:payment_id/review",
            post(review_handler::<S, P, M>),
        )
        .route(
            "/api/v1/payments/:payment_id/mark-paid",
            post(mark_paid_handler::<S, P, M>),
        )
        .route(
            "/api/v1/payments/:payment_id/resubmit",
            post(resubmit_handler::<S, P, M>),
        )
        .route(
            "/api/v1/users/:user_id/payments",
            get(tenant_payments_handler::<S, P, M>),
        )
        .route(
            "/api/v1/maintenance/flag-overdue",
            post(overdue_handler::<S, P, M>),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(workflow)
}

fn proof_from(headers: &HeaderMap, file_name: Option<String>, body: Bytes) -> Option<ProofFile> {
    if body.is_empty() {
        return None;
    }
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    Some(ProofFile {
        file_name: file_name.unwrap_or_else(|| "proof".to_string()),
        content_type,
        bytes: body.to_vec(),
    })
}

fn receipt_payload(receipt: &SubmissionReceipt) -> serde_json::Value {
    json!({
        "payment": receipt.payment.view(),
        "notifications": receipt.notifications,
        "degradations": receipt.degradations,
    })
}

fn list_payload(payments: &[Payment]) -> serde_json::Value {
    let views: Vec<_> = payments.iter().map(Payment::view).collect();
    json!({ "payments": views })
}

pub(crate) async fn submit_handler<S, P, M>(
    State(workflow): State<Arc<PaymentWorkflow<S, P, M>>>,
    Query(params): Query<SubmissionParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: PropertyStore + 'static,
    P: ProofStorage + 'static,
    M: Mailer + 'static,
{
    let submission = PaymentSubmission {
        amount: params.amount,
        currency: params.currency,
        payment_method: params.payment_method,
        payment_type: params.payment_type,
        payment_date: params.payment_date,
        reference_number: params.reference_number,
        proof: proof_from(&headers, params.file_name, body),
    };
    match workflow.submit_payment(&UserId(params.user_id), submission) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt_payload(&receipt))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn resubmit_handler<S, P, M>(
    State(workflow): State<Arc<PaymentWorkflow<S, P, M>>>,
    Path(payment_id): Path<String>,
    Query(params): Query<ResubmissionParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    S: PropertyStore + 'static,
    P: ProofStorage + 'static,
    M: Mailer + 'static,
{
    let proof = proof_from(&headers, params.file_name, body);
    match workflow.resubmit_payment(
        &PaymentId(payment_id),
        &UserId(params.user_id),
        proof,
        params.reference_number,
    ) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt_payload(&receipt))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn review_handler<S, P, M>(
    State(workflow): State<Arc<PaymentWorkflow<S, P, M>>>,
    Path(payment_id): Path<String>,
    axum::Json(body): axum::Json<ReviewBody>,
) -> Response
where
    S: PropertyStore + 'static,
    P: ProofStorage + 'static,
    M: Mailer + 'static,
{
    let request = ReviewRequest {
        payment_id: PaymentId(payment_id),
        reviewer_id: UserId(body.reviewer_id),
        decision: body.decision,
        notes: body.notes,
    };
    match workflow.review_payment(request) {
        Ok(payment) => (StatusCode::OK, axum::Json(payment.view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn mark_paid_handler<S, P, M>(
    State(workflow): State<Arc<PaymentWorkflow<S, P, M>>>,
    Path(payment_id): Path<String>,
    axum::Json(body): axum::Json<MarkPaidBody>,
) -> Response
where
    S: PropertyStore + 'static,
    P: ProofStorage + 'static,
    M: Mailer + 'static,
{
    match workflow.mark_as_paid(&PaymentId(payment_id), &UserId(body.manager_id)) {
        Ok(payment) => (StatusCode::OK, axum::Json(payment.view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn record_handler<S, P, M>(
    State(workflow): State<Arc<PaymentWorkflow<S, P, M>>>,
    axum::Json(entry): axum::Json<ManualPayment>,
) -> Response
where
    S: PropertyStore + 'static,
    P: ProofStorage + 'static,
    M: Mailer + 'static,
{
    match workflow.record_payment(entry) {
        Ok(payment) => (StatusCode::CREATED, axum::Json(payment.view())).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn pending_handler<S, P, M>(
    State(workflow): State<Arc<PaymentWorkflow<S, P, M>>>,
) -> Response
where
    S: PropertyStore + 'static,
    P: ProofStorage + 'static,
    M: Mailer + 'static,
{
    match workflow.awaiting_review() {
        Ok(payments) => (StatusCode::OK, axum::Json(list_payload(&payments))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn tenant_payments_handler<S, P, M>(
    State(workflow): State<Arc<PaymentWorkflow<S, P, M>>>,
    Path(user_id): Path<String>,
) -> Response
where
    S: PropertyStore + 'static,
    P: ProofStorage + 'static,
    M: Mailer + 'static,
{
    match workflow.payments_for_tenant(&UserId(user_id)) {
        Ok(payments) => (StatusCode::OK, axum::Json(list_payload(&payments))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn overdue_handler<S, P, M>(
    State(workflow): State<Arc<PaymentWorkflow<S, P, M>>>,
    Query(params): Query<SweepParams>,
) -> Response
where
    S: PropertyStore + 'static,
    P: ProofStorage + 'static,
    M: Mailer + 'static,
{
    let today = params.today.unwrap_or_else(|| Utc::now().date_naive());
    match workflow.flag_overdue(today) {
        Ok(payments) => (StatusCode::OK, axum::Json(list_payload(&payments))).into_response(),
        Err(err) => err.into_response(),
    }
}
