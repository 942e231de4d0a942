use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ApartmentId, PaymentId, TenantId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    BankTransfer,
    Cash,
    Check,
    CreditCard,
    Online,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    #[default]
    Rent,
    SecurityDeposit,
    LateFee,
    Utility,
    Other,
}

/// Settlement status as exposed to clients and stored in the `status` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Submitted,
    Completed,
    Overdue,
    Failed,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Submitted => "submitted",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
            Self::Failed => "failed",
        }
    }
}

/// Review outcome of a tenant submission, independent of settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

/// Single lifecycle state behind the `(status, submission_status)` column pair.
///
/// The backing table reports an awaiting-review payment as `status = pending`, the same label
/// as a payment nobody has submitted yet. Internally the two are distinct states; the column
/// labels are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentState {
    /// Expected but not yet submitted.
    Due,
    Overdue,
    Failed,
    /// Submitted with proof, waiting for a manager.
    AwaitingReview,
    /// Proof rejected; the tenant may resubmit.
    Rejected,
    /// Submission approved and settled.
    Approved,
    /// Settled by a manager without a tenant submission.
    Settled,
}

impl PaymentState {
    pub const fn status(self) -> PaymentStatus {
        match self {
            Self::Due | Self::AwaitingReview | Self::Rejected => PaymentStatus::Pending,
            Self::Overdue => PaymentStatus::Overdue,
            Self::Failed => PaymentStatus::Failed,
            Self::Approved | Self::Settled => PaymentStatus::Completed,
        }
    }

    pub const fn submission_status(self) -> Option<SubmissionStatus> {
        match self {
            Self::AwaitingReview => Some(SubmissionStatus::Pending),
            Self::Rejected => Some(SubmissionStatus::Rejected),
            Self::Approved => Some(SubmissionStatus::Approved),
            Self::Due | Self::Overdue | Self::Failed | Self::Settled => None,
        }
    }

    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Approved | Self::Settled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub tenant_id: Option<TenantId>,
    pub apartment_id: Option<ApartmentId>,
    pub amount: u32,
    pub currency: String,
    pub payment_type: PaymentType,
    pub payment_method: PaymentMethod,
    pub state: PaymentState,
    pub proof_url: Option<String>,
    pub reference_number: Option<String>,
    pub submitted_by: Option<UserId>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<UserId>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    /// Recorded without a resolvable tenant; an operator must link it.
    pub needs_reconciliation: bool,
}

impl Payment {
    pub fn status(&self) -> PaymentStatus {
        self.state.status()
    }

    pub fn submission_status(&self) -> Option<SubmissionStatus> {
        self.state.submission_status()
    }

    pub fn view(&self) -> PaymentView {
        PaymentView {
            payment_id: self.id.clone(),
            tenant_id: self.tenant_id.clone(),
            apartment_id: self.apartment_id.clone(),
            amount: self.amount,
            currency: self.currency.clone(),
            payment_type: self.payment_type,
            payment_method: self.payment_method,
            status: self.status().label(),
            submission_status: self.submission_status().map(SubmissionStatus::label),
            proof_url: self.proof_url.clone(),
            reference_number: self.reference_number.clone(),
            submitted_at: self.submitted_at,
            reviewed_at: self.reviewed_at,
            review_notes: self.review_notes.clone(),
            due_date: self.due_date,
            paid_date: self.paid_date,
            needs_reconciliation: self.needs_reconciliation,
        }
    }
}

/// Insert payload; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub tenant_id: Option<TenantId>,
    pub apartment_id: Option<ApartmentId>,
    pub amount: u32,
    pub currency: String,
    pub payment_type: PaymentType,
    pub payment_method: PaymentMethod,
    pub state: PaymentState,
    pub proof_url: Option<String>,
    pub reference_number: Option<String>,
    pub submitted_by: Option<UserId>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub needs_reconciliation: bool,
}

/// Column-shaped representation returned by the HTTP API.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub payment_id: PaymentId,
    pub tenant_id: Option<TenantId>,
    pub apartment_id: Option<ApartmentId>,
    pub amount: u32,
    pub currency: String,
    pub payment_type: PaymentType,
    pub payment_method: PaymentMethod,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_status: Option<&'static str>,
    pub proof_url: Option<String>,
    pub reference_number: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub paid_date: Option<NaiveDate>,
    pub needs_reconciliation: bool,
}
