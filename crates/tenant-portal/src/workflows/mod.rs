//! Orchestration of the multi-step tenant onboarding and payment processes.
//!
//! Every operation is a fixed sequence of adapter calls. Each step is either fatal (abort and
//! report which step failed and whether anything was recorded) or non-fatal (log, record a
//! [`Degradation`], continue). Nothing is rolled back automatically.

pub mod access;
pub mod error;
pub mod invitations;
pub mod payments;
pub mod property;

#[cfg(test)]
pub(crate) mod testing;

use tracing::warn;

use crate::adapters::{EmailMessage, Mailer};

pub use access::{access_router, AccessService, PasswordResetRequest, SignInRequest, SignedIn};
pub use error::{
    ConflictReason, Degradation, DependencyFailure, Entity, Recorded, ValidationError,
    WorkflowError, WorkflowStep,
};

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

/// Trims and lower-cases an address after a structural check.
pub(crate) fn normalize_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim().to_ascii_lowercase();
    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::InvalidEmail);
    };
    let domain_ok = domain
        .split_once('.')
        .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'));
    if local.is_empty() || !domain_ok || email.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(email)
}

pub(crate) fn require(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

/// Tally of best-effort notifications sent during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct NotificationReport {
    pub delivered: usize,
    pub failed: usize,
}

impl NotificationReport {
    /// Sends without letting a transport failure escape.
    pub(crate) fn deliver<M: Mailer + ?Sized>(&mut self, mailer: &M, message: EmailMessage) {
        let template = message.template.label();
        let recipient = message.to.clone();
        match mailer.send(message) {
            Ok(()) => self.delivered += 1,
            Err(err) => {
                self.failed += 1;
                warn!(template, %recipient, error = %err, "notification dropped");
            }
        }
    }
}
