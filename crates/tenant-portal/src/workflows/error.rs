use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::adapters::{IdentityError, NotificationError, RepositoryError, StorageError};
use crate::domain::{InvitationStatus, PaymentState};

/// Named step of a workflow run, reported with every dependency failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    LoadBuilding,
    LoadApartment,
    LoadInvitation,
    LoadTenant,
    LoadPayment,
    CreateAccount,
    CreateProfile,
    RecordInvitation,
    SendInvitationEmail,
    CreateTenant,
    MarkApartmentOccupied,
    AcceptInvitation,
    ClaimTenancy,
    CloseInvitation,
    ReleaseApartment,
    SignIn,
    LoadProfile,
    PasswordReset,
    UploadProof,
    ResolveTenant,
    RecordPayment,
    UpdatePayment,
    Notify,
    RecordBuilding,
    RecordApartment,
    RecordVendor,
    EndTenancy,
    ListRecords,
}

impl WorkflowStep {
    pub const fn label(self) -> &'static str {
        match self {
            Self::LoadBuilding => "load building",
            Self::LoadApartment => "load apartment",
            Self::LoadInvitation => "load invitation",
            Self::LoadTenant => "load tenant",
            Self::LoadPayment => "load payment",
            Self::CreateAccount => "create account",
            Self::CreateProfile => "create profile",
            Self::RecordInvitation => "record invitation",
            Self::SendInvitationEmail => "send invitation email",
            Self::CreateTenant => "create tenant",
            Self::MarkApartmentOccupied => "mark apartment occupied",
            Self::AcceptInvitation => "accept invitation",
            Self::ClaimTenancy => "claim tenancy",
            Self::CloseInvitation => "close invitation",
            Self::ReleaseApartment => "release apartment",
            Self::SignIn => "sign in",
            Self::LoadProfile => "load profile",
            Self::PasswordReset => "password reset",
            Self::UploadProof => "upload proof",
            Self::ResolveTenant => "resolve tenant",
            Self::RecordPayment => "record payment",
            Self::UpdatePayment => "update payment",
            Self::Notify => "notify",
            Self::RecordBuilding => "record building",
            Self::RecordApartment => "record apartment",
            Self::RecordVendor => "record vendor",
            Self::EndTenancy => "end tenancy",
            Self::ListRecords => "list records",
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the aborted run left behind. No run rolls back, so callers need to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recorded {
    Nothing,
    Partial,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Building,
    Apartment,
    Invitation,
    Tenant,
    Payment,
    Vendor,
    Account,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Entity::Building => "building",
            Entity::Apartment => "apartment",
            Entity::Invitation => "invitation",
            Entity::Tenant => "tenant",
            Entity::Payment => "payment",
            Entity::Vendor => "vendor",
            Entity::Account => "account",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("a valid email address is required")]
    InvalidEmail,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("email does not match the invitation")]
    EmailMismatch,
    #[error("apartment {apartment} does not belong to building {building}")]
    ApartmentOutsideBuilding { apartment: String, building: String },
    #[error("amount must be greater than zero")]
    NonPositiveAmount,
    #[error("a proof of payment file is required")]
    MissingProof,
    #[error("proof files of type '{0}' are not accepted")]
    UnsupportedProofType(String),
    #[error("proof file is {size} bytes; the limit is {limit} bytes")]
    ProofTooLarge { size: usize, limit: usize },
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("vendor import is missing the '{0}' column")]
    MissingImportColumn(&'static str),
    #[error("vendor import could not be read: {0}")]
    MalformedImport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictReason {
    #[error("the apartment is already occupied")]
    ApartmentOccupied,
    #[error("the apartment has already been claimed by another tenant")]
    ApartmentClaimed,
    #[error("an open invitation already exists for this email")]
    InvitationPending,
    #[error("the invitation is {} and can no longer be used", .status.label())]
    InvitationNotOpen { status: InvitationStatus },
    #[error("the invitation has expired")]
    InvitationExpired,
    #[error("an account already exists for this email")]
    EmailInUse,
    #[error("an account was already created for this invitation; sign in with the emailed credential")]
    AccountAlreadyProvisioned,
    #[error("the payment has already been reviewed ({state:?})")]
    PaymentAlreadyReviewed { state: PaymentState },
    #[error("the payment was rejected and must be resubmitted before it can be completed")]
    PaymentRejected,
    #[error("the payment is already completed")]
    PaymentAlreadySettled,
    #[error("the payment has not been submitted for review")]
    PaymentNotSubmitted,
    #[error("only rejected payments can be resubmitted ({state:?})")]
    NotResubmittable { state: PaymentState },
    #[error("the payment was changed by someone else; reload it and try again")]
    PaymentChanged,
    #[error("only the tenant who submitted the payment can resubmit it")]
    NotSubmitter,
    #[error("the tenancy has already ended")]
    TenancyEnded,
    #[error("{0}")]
    Duplicate(String),
}

/// Adapter error that aborted a step.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DependencyFailure {
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error(transparent)]
    Store(#[from] RepositoryError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Classified failure of a workflow operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{step} failed: {cause}")]
    Dependency {
        step: WorkflowStep,
        #[source]
        cause: DependencyFailure,
        recorded: Recorded,
    },
    #[error("{reason}")]
    Conflict {
        reason: ConflictReason,
        recorded: Recorded,
    },
    #[error("{0} not found")]
    NotFound(Entity),
}

impl WorkflowError {
    pub fn dependency(
        step: WorkflowStep,
        cause: impl Into<DependencyFailure>,
        recorded: Recorded,
    ) -> Self {
        Self::Dependency {
            step,
            cause: cause.into(),
            recorded,
        }
    }

    pub fn conflict(reason: ConflictReason) -> Self {
        Self::Conflict {
            reason,
            recorded: Recorded::Nothing,
        }
    }

    pub fn partial_conflict(reason: ConflictReason) -> Self {
        Self::Conflict {
            reason,
            recorded: Recorded::Partial,
        }
    }

    pub fn recorded(&self) -> Recorded {
        match self {
            Self::Dependency { recorded, .. } | Self::Conflict { recorded, .. } => *recorded,
            Self::Validation(_) | Self::NotFound(_) => Recorded::Nothing,
        }
    }

    pub fn step(&self) -> Option<WorkflowStep> {
        match self {
            Self::Dependency { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Dependency { .. } => "dependency",
            Self::Conflict { .. } => "conflict",
            Self::NotFound(_) => "not_found",
        }
    }

    /// Message for end users; says whether anything was saved.
    pub fn user_message(&self) -> String {
        match self.recorded() {
            Recorded::Nothing => format!("{self}. Nothing was saved; you can try again."),
            Recorded::Partial => format!(
                "{self}. Part of this request was saved; please contact support so it can be \
                 completed."
            ),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Dependency { .. } => StatusCode::BAD_GATEWAY,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for WorkflowError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "step": self.step(),
            "recorded": self.recorded(),
            "message": self.user_message(),
        }));
        (self.status_code(), body).into_response()
    }
}

/// Non-fatal step failure carried on a successful outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Degradation {
    pub step: WorkflowStep,
    pub kind: &'static str,
    pub detail: String,
}

impl Degradation {
    pub fn identity(step: WorkflowStep, error: &IdentityError) -> Self {
        Self {
            step,
            kind: error.kind(),
            detail: error.to_string(),
        }
    }

    pub fn store(step: WorkflowStep, error: &RepositoryError) -> Self {
        let kind = match error {
            RepositoryError::Conflict(_) => "store_conflict",
            RepositoryError::NotFound => "store_not_found",
            RepositoryError::Unavailable(_) => "store_unavailable",
        };
        Self {
            step,
            kind,
            detail: error.to_string(),
        }
    }
}
