use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::adapters::{IdentityError, IdentityProvider, PropertyStore, Session};
use crate::domain::UserProfile;
use crate::workflows::error::{
    Degradation, Recorded, ValidationError, WorkflowError, WorkflowStep,
};
use crate::workflows::normalize_email;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Session plus the portal profile, when it could be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedIn {
    pub session: Session,
    pub profile: Option<UserProfile>,
    pub degradations: Vec<Degradation>,
}

/// Sign-in and password recovery against the identity provider.
pub struct AccessService<S, I> {
    store: Arc<S>,
    identity: Arc<I>,
}

impl<S, I> AccessService<S, I>
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
{
    pub fn new(store: Arc<S>, identity: Arc<I>) -> Self {
        Self { store, identity }
    }

    #[instrument(skip(self, password))]
    pub fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, WorkflowError> {
        let email = normalize_email(email)?;
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        let session = self
            .identity
            .sign_in(&email, password)
            .map_err(|err| match err {
                IdentityError::InvalidCredentials => {
                    WorkflowError::from(ValidationError::InvalidCredentials)
                }
                other => WorkflowError::dependency(WorkflowStep::SignIn, other, Recorded::Nothing),
            })?;

        let mut degradations = Vec::new();
        let profile = match self.store.fetch_profile(&session.user_id) {
            Ok(profile) => profile,
            Err(err) => {
                warn!(user_id = %session.user_id, error = %err, "signed in without a profile");
                degradations.push(Degradation::store(WorkflowStep::LoadProfile, &err));
                None
            }
        };

        let role = profile
            .as_ref()
            .map_or("unknown", |profile| profile.user_type.label());
        info!(user_id = %session.user_id, role, "signed in");
        Ok(SignedIn {
            session,
            profile,
            degradations,
        })
    }

    #[instrument(skip(self))]
    pub fn request_password_reset(&self, email: &str) -> Result<(), WorkflowError> {
        let email = normalize_email(email)?;
        self.identity
            .send_password_reset(&email)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::PasswordReset, err, Recorded::Nothing)
            })?;
        info!("password reset requested");
        Ok(())
    }
}

pub fn access_router<S, I>(service: Arc<AccessService<S, I>>) -> Router
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
{
    Router::new()
        .route("/api/v1/auth/sign-in", post(sign_in_handler::<S, I>))
        .route(
            "/api/v1/auth/password-reset",
            post(password_reset_handler::<S, I>),
        )
        .with_state(service)
}

pub(crate) async fn sign_in_handler<S, I>(
    State(service): State<Arc<AccessService<S, I>>>,
    axum::Json(request): axum::Json<SignInRequest>,
) -> Response
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
{
    match service.sign_in(&request.email, &request.password) {
        Ok(signed_in) => (StatusCode::OK, axum::Json(signed_in)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn password_reset_handler<S, I>(
    State(service): State<Arc<AccessService<S, I>>>,
    axum::Json(request): axum::Json<PasswordResetRequest>,
) -> Response
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
{
    match service.request_password_reset(&request.email) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            axum::Json(json!({ "status": "reset_requested" })),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
