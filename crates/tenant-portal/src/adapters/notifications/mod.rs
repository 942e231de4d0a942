use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

mod templates;

pub use templates::RenderedEmail;

/// Outbound email transport.
pub trait Mailer: Send + Sync {
    fn send(&self, message: EmailMessage) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTemplate {
    TenantInvitation,
    PaymentSubmitted,
    PaymentReviewRequested,
    PaymentApproved,
    PaymentRejected,
}

impl EmailTemplate {
    pub const fn label(self) -> &'static str {
        match self {
            Self::TenantInvitation => "tenant_invitation",
            Self::PaymentSubmitted => "payment_submitted",
            Self::PaymentReviewRequested => "payment_review_requested",
            Self::PaymentApproved => "payment_approved",
            Self::PaymentRejected => "payment_rejected",
        }
    }
}

/// Templated message; params are substituted when the transport renders it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub template: EmailTemplate,
    pub params: BTreeMap<String, String>,
}

impl EmailMessage {
    pub fn new(to: impl Into<String>, template: EmailTemplate) -> Self {
        Self {
            to: to.into(),
            template,
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn render(&self) -> RenderedEmail {
        templates::render(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("email transport unavailable: {0}")]
    Transport(String),
    #[error("recipient rejected: {0}")]
    Rejected(String),
}
