use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ApartmentId, BuildingId, UserId, UserType};

/// Role metadata stored on the identity account at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    pub building_id: Option<BuildingId>,
    pub apartment_id: Option<ApartmentId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub email: String,
    pub credential: String,
    /// Skip the provider's confirmation mail. Requires the elevated service credential.
    pub auto_confirm: bool,
    pub metadata: AccountMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: UserId,
    pub email: String,
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Hosted authentication service.
pub trait IdentityProvider: Send + Sync {
    fn create_account(&self, account: NewAccount) -> Result<UserId, IdentityError>;
    fn sign_in(&self, email: &str, credential: &str) -> Result<Session, IdentityError>;
    fn send_password_reset(&self, email: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    #[error("an account already exists for this email")]
    EmailTaken,
    #[error("elevated service credential is not configured")]
    MissingServiceCredential,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

impl IdentityError {
    /// Stable identifier used in degradation reports and API payloads.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::EmailTaken => "email_taken",
            Self::MissingServiceCredential => "missing_service_credential",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Unavailable(_) => "identity_unavailable",
        }
    }
}
