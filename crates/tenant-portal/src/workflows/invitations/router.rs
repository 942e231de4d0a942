use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::service::{AcceptInvitationRequest, InvitationRequest, InvitationWorkflow};
use crate::adapters::{IdentityProvider, Mailer, PropertyStore};
use crate::domain::InvitationId;

/// Credentials from the invitation email, used for the first sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub email: String,
    pub password: String,
}

/// Router exposing the invitation lifecycle.
pub fn invitation_router<S, I, M>(workflow: Arc<InvitationWorkflow<S, I, M>>) -> Router
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
    M: Mailer + 'static,
{
    Router::new()
        .route("/api/v1/invitations", post(send_handler::<S, I, M>))
        .route(
            "/api/v1/invitations/:invitation_id/accept",
            post(accept_handler::<S, I, M>),
        )
        .route(
            "/api/v1/invitations/:invitation_id/resume",
            post(resume_handler::<S, I, M>),
        )
        .route(
            "/api/v1/invitations/:invitation_id/decline",
            post(decline_handler::<S, I, M>),
        )
        .route(
            "/api/v1/maintenance/expire-invitations",
            post(expire_handler::<S, I, M>),
        )
        .route("/api/v1/auth/activate", post(activate_handler::<S, I, M>))
        .with_state(workflow)
}

pub(crate) async fn send_handler<S, I, M>(
    State(workflow): State<Arc<InvitationWorkflow<S, I, M>>>,
    axum::Json(request): axum::Json<InvitationRequest>,
) -> Response
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
    M: Mailer + 'static,
{
    match workflow.send_invitation(request) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn accept_handler<S, I, M>(
    State(workflow): State<Arc<InvitationWorkflow<S, I, M>>>,
    Path(invitation_id): Path<String>,
    axum::Json(request): axum::Json<AcceptInvitationRequest>,
) -> Response
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
    M: Mailer + 'static,
{
    match workflow.accept_invitation(&InvitationId(invitation_id), request) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn resume_handler<S, I, M>(
    State(workflow): State<Arc<InvitationWorkflow<S, I, M>>>,
    Path(invitation_id): Path<String>,
) -> Response
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
    M: Mailer + 'static,
{
    match workflow.resume_invitation(&InvitationId(invitation_id)) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn decline_handler<S, I, M>(
    State(workflow): State<Arc<InvitationWorkflow<S, I, M>>>,
    Path(invitation_id): Path<String>,
) -> Response
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
    M: Mailer + 'static,
{
    match workflow.decline_invitation(&InvitationId(invitation_id)) {
        Ok(invitation) => (StatusCode::OK, axum::Json(invitation)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn expire_handler<S, I, M>(
    State(workflow): State<Arc<InvitationWorkflow<S, I, M>>>,
) -> Response
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
    M: Mailer + 'static,
{
    match workflow.expire_invitations(Utc::now()) {
        Ok(expired) => {
            let ids: Vec<&InvitationId> = expired.iter().map(|invitation| &invitation.id).collect();
            let payload = json!({ "expired": expired.len(), "invitation_ids": ids });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn activate_handler<S, I, M>(
    State(workflow): State<Arc<InvitationWorkflow<S, I, M>>>,
    axum::Json(request): axum::Json<ActivationRequest>,
) -> Response
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
    M: Mailer + 'static,
{
    match workflow.complete_first_sign_in(&request.email, &request.password) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(err) => err.into_response(),
    }
}
