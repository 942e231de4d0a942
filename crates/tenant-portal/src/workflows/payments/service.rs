use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use super::proof::{proof_path, validate_proof, with_media_type};
use crate::adapters::{
    EmailMessage, EmailTemplate, Mailer, ProofFile, ProofStorage, PropertyStore, RepositoryError,
};
use crate::config::PortalConfig;
use crate::domain::{
    NewPayment, Payment, PaymentId, PaymentMethod, PaymentState, PaymentType, ReviewDecision,
    TenantId, UserId, UserType,
};
use crate::workflows::error::{
    ConflictReason, Degradation, Entity, Recorded, ValidationError, WorkflowError, WorkflowStep,
};
use crate::workflows::NotificationReport;

pub const DEFAULT_CURRENCY: &str = "USD";

/// Tenant-submitted payment with its proof document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSubmission {
    pub amount: u32,
    pub currency: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_type: PaymentType,
    pub payment_date: NaiveDate,
    pub reference_number: Option<String>,
    pub proof: Option<ProofFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub payment_id: PaymentId,
    pub reviewer_id: UserId,
    pub decision: ReviewDecision,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Manager-entered charge, created as due.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualPayment {
    pub tenant_id: TenantId,
    pub amount: u32,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_type: PaymentType,
    pub payment_method: PaymentMethod,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub reference_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReceipt {
    pub payment: Payment,
    pub notifications: NotificationReport,
    pub degradations: Vec<Degradation>,
}

/// Proof upload, manager review and settlement of rent payments.
pub struct PaymentWorkflow<S, P, M> {
    store: Arc<S>,
    storage: Arc<P>,
    mailer: Arc<M>,
    config: PortalConfig,
}

impl<S, P, M> PaymentWorkflow<S, P, M>
where
    S: PropertyStore + 'static,
    P: ProofStorage + 'static,
    M: Mailer + 'static,
{
    pub fn new(store: Arc<S>, storage: Arc<P>, mailer: Arc<M>, config: PortalConfig) -> Self {
        Self {
            store,
            storage,
            mailer,
            config,
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Upload the proof, then record the payment as awaiting review.
    ///
    /// A payment whose submitter has no active tenancy is still recorded, flagged for
    /// reconciliation. Notifications never fail the submission.
    #[instrument(skip(self, submission), fields(amount = submission.amount))]
    pub fn submit_payment(
        &self,
        tenant_user_id: &UserId,
        submission: PaymentSubmission,
    ) -> Result<SubmissionReceipt, WorkflowError> {
        if submission.amount == 0 {
            return Err(ValidationError::NonPositiveAmount.into());
        }
        let media_type =
            validate_proof(submission.proof.as_ref(), self.config.max_proof_bytes)?;
        let proof = with_media_type(
            submission.proof.ok_or(ValidationError::MissingProof)?,
            &media_type,
        );
        let currency = normalize_currency(submission.currency.as_deref());
        let reference_number = trimmed(submission.reference_number);

        let now = Utc::now();
        let path = proof_path(tenant_user_id, &media_type, now);
        let proof_url = self.storage.upload(&path, &proof).map_err(|err| {
            error!(%path, error = %err, "proof upload failed");
            WorkflowError::dependency(WorkflowStep::UploadProof, err, Recorded::Nothing)
        })?;

        let mut degradations = Vec::new();
        let tenancy = match self.store.active_tenant_for_user(tenant_user_id) {
            Ok(tenancy) => tenancy,
            Err(err) => {
                warn!(user_id = %tenant_user_id, error = %err, "tenant lookup failed");
                degradations.push(Degradation::store(WorkflowStep::ResolveTenant, &err));
                None
            }
        };
        if tenancy.is_none() {
            warn!(user_id = %tenant_user_id, "recording payment without a tenant");
        }
        let needs_reconciliation = tenancy.is_none();
        let (tenant_id, apartment_id) = match tenancy {
            Some(tenant) => (Some(tenant.id), Some(tenant.apartment_id)),
            None => (None, None),
        };

        // The proof is already stored, so a failed insert leaves an orphaned object.
        let payment = self
            .store
            .insert_payment(NewPayment {
                tenant_id,
                apartment_id,
                amount: submission.amount,
                currency,
                payment_type: submission.payment_type,
                payment_method: submission.payment_method,
                state: PaymentState::AwaitingReview,
                proof_url: Some(proof_url),
                reference_number,
                submitted_by: Some(tenant_user_id.clone()),
                submitted_at: Some(now),
                due_date: None,
                payment_date: Some(submission.payment_date),
                needs_reconciliation,
            })
            .map_err(|err| {
                error!(%path, error = %err, "payment not recorded after upload");
                WorkflowError::dependency(WorkflowStep::RecordPayment, err, Recorded::Partial)
            })?;

        let mut notifications = NotificationReport::default();
        self.notify_submitter(&payment, EmailTemplate::PaymentSubmitted, &mut notifications);
        self.notify_reviewers(&payment, &mut notifications, &mut degradations);

        info!(
            payment = %payment.id,
            reconcile = payment.needs_reconciliation,
            delivered = notifications.delivered,
            "payment submitted"
        );

        Ok(SubmissionReceipt {
            payment,
            notifications,
            degradations,
        })
    }

    /// Send a rejected payment back for review with a new proof.
    #[instrument(skip(self, proof, reference_number))]
    pub fn resubmit_payment(
        &self,
        payment_id: &PaymentId,
        tenant_user_id: &UserId,
        proof: Option<ProofFile>,
        reference_number: Option<String>,
    ) -> Result<SubmissionReceipt, WorkflowError> {
        let media_type = validate_proof(proof.as_ref(), self.config.max_proof_bytes)?;
        let proof = with_media_type(proof.ok_or(ValidationError::MissingProof)?, &media_type);

        let payment = self.load_payment(payment_id)?;
        if payment.state != PaymentState::Rejected {
            return Err(WorkflowError::conflict(ConflictReason::NotResubmittable {
                state: payment.state,
            }));
        }
        if payment.submitted_by.as_ref() != Some(tenant_user_id) {
            return Err(WorkflowError::conflict(ConflictReason::NotSubmitter));
        }

        let now = Utc::now();
        let path = proof_path(tenant_user_id, &media_type, now);
        let proof_url = self.storage.upload(&path, &proof).map_err(|err| {
            error!(%path, error = %err, "proof upload failed");
            WorkflowError::dependency(WorkflowStep::UploadProof, err, Recorded::Nothing)
        })?;

        let updated = Payment {
            state: PaymentState::AwaitingReview,
            proof_url: Some(proof_url),
            reference_number: trimmed(reference_number).or(payment.reference_number.clone()),
            submitted_at: Some(now),
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            paid_date: None,
            ..payment
        };
        let payment = self.transition(updated, PaymentState::Rejected, Recorded::Partial)?;

        let mut notifications = NotificationReport::default();
        let mut degradations = Vec::new();
        self.notify_reviewers(&payment, &mut notifications, &mut degradations);

        info!(payment = %payment.id, "payment resubmitted");
        Ok(SubmissionReceipt {
            payment,
            notifications,
            degradations,
        })
    }

    /// Approve or reject a payment awaiting review.
    ///
    /// Decided payments are final here; a rejected one comes back through
    /// [`Self::resubmit_payment`].
    #[instrument(skip(self, request), fields(payment = %request.payment_id, decision = ?request.decision))]
    pub fn review_payment(&self, request: ReviewRequest) -> Result<Payment, WorkflowError> {
        let payment = self.load_payment(&request.payment_id)?;
        match payment.state {
            PaymentState::AwaitingReview => {}
            PaymentState::Approved | PaymentState::Rejected => {
                return Err(WorkflowError::conflict(
                    ConflictReason::PaymentAlreadyReviewed {
                        state: payment.state,
                    },
                ))
            }
            PaymentState::Settled => {
                return Err(WorkflowError::conflict(
                    ConflictReason::PaymentAlreadySettled,
                ))
            }
            PaymentState::Due | PaymentState::Overdue | PaymentState::Failed => {
                return Err(WorkflowError::conflict(
                    ConflictReason::PaymentNotSubmitted,
                ))
            }
        }

        let now = Utc::now();
        let (state, paid_date, template) = match request.decision {
            ReviewDecision::Approved => (
                PaymentState::Approved,
                Some(now.date_naive()),
                EmailTemplate::PaymentApproved,
            ),
            ReviewDecision::Rejected => (PaymentState::Rejected, None, EmailTemplate::PaymentRejected),
        };
        let updated = Payment {
            state,
            paid_date,
            reviewed_by: Some(request.reviewer_id.clone()),
            reviewed_at: Some(now),
            review_notes: trimmed(request.notes),
            ..payment
        };
        let payment = self.transition(updated, PaymentState::AwaitingReview, Recorded::Nothing)?;

        let mut notifications = NotificationReport::default();
        self.notify_submitter(&payment, template, &mut notifications);

        info!(payment = %payment.id, reviewer = %request.reviewer_id, state = ?payment.state, "payment reviewed");
        Ok(payment)
    }

    /// Manager shortcut that settles a payment without the review step.
    #[instrument(skip(self))]
    pub fn mark_as_paid(
        &self,
        payment_id: &PaymentId,
        manager_id: &UserId,
    ) -> Result<Payment, WorkflowError> {
        let payment = self.load_payment(payment_id)?;
        let now = Utc::now();
        let prior = payment.state;

        let updated = match prior {
            PaymentState::Rejected => {
                warn!(payment = %payment.id, "refusing to settle a rejected payment");
                return Err(WorkflowError::conflict(ConflictReason::PaymentRejected));
            }
            PaymentState::Approved | PaymentState::Settled => {
                return Err(WorkflowError::conflict(
                    ConflictReason::PaymentAlreadySettled,
                ))
            }
            PaymentState::AwaitingReview => Payment {
                state: PaymentState::Approved,
                reviewed_by: Some(manager_id.clone()),
                reviewed_at: Some(now),
                paid_date: Some(now.date_naive()),
                ..payment
            },
            PaymentState::Due | PaymentState::Overdue | PaymentState::Failed => Payment {
                state: PaymentState::Settled,
                paid_date: Some(now.date_naive()),
                ..payment
            },
        };

        let payment = self.transition(updated, prior, Recorded::Nothing)?;
        info!(payment = %payment.id, manager = %manager_id, "payment marked as paid");
        Ok(payment)
    }

    #[instrument(skip(self, entry), fields(tenant = %entry.tenant_id))]
    pub fn record_payment(&self, entry: ManualPayment) -> Result<Payment, WorkflowError> {
        if entry.amount == 0 {
            return Err(ValidationError::NonPositiveAmount.into());
        }
        let tenant = self
            .store
            .fetch_tenant(&entry.tenant_id)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::LoadTenant, err, Recorded::Nothing)
            })?
            .ok_or(WorkflowError::NotFound(Entity::Tenant))?;

        let payment = self
            .store
            .insert_payment(NewPayment {
                tenant_id: Some(tenant.id),
                apartment_id: Some(tenant.apartment_id),
                amount: entry.amount,
                currency: normalize_currency(entry.currency.as_deref()),
                payment_type: entry.payment_type,
                payment_method: entry.payment_method,
                state: PaymentState::Due,
                proof_url: None,
                reference_number: trimmed(entry.reference_number),
                submitted_by: None,
                submitted_at: None,
                due_date: Some(entry.due_date),
                payment_date: None,
                needs_reconciliation: false,
            })
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::RecordPayment, err, Recorded::Nothing)
            })?;

        info!(payment = %payment.id, due = %entry.due_date, "payment recorded");
        Ok(payment)
    }

    /// Move every due payment whose due date has passed to overdue.
    #[instrument(skip(self))]
    pub fn flag_overdue(&self, today: NaiveDate) -> Result<Vec<Payment>, WorkflowError> {
        let late: Vec<Payment> = self
            .store
            .payments_in_state(PaymentState::Due)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::ListRecords, err, Recorded::Nothing)
            })?
            .into_iter()
            .filter(|payment| payment.due_date.is_some_and(|due| due < today))
            .collect();

        let mut flagged = Vec::with_capacity(late.len());
        for payment in late {
            let updated = Payment {
                state: PaymentState::Overdue,
                ..payment
            };
            match self.store.transition_payment(updated, PaymentState::Due) {
                Ok(payment) => flagged.push(payment),
                Err(RepositoryError::Conflict(_)) => continue,
                Err(err) => {
                    let recorded = if flagged.is_empty() {
                        Recorded::Nothing
                    } else {
                        Recorded::Partial
                    };
                    return Err(WorkflowError::dependency(
                        WorkflowStep::UpdatePayment,
                        err,
                        recorded,
                    ));
                }
            }
        }

        if !flagged.is_empty() {
            info!(count = flagged.len(), "flagged overdue payments");
        }
        Ok(flagged)
    }

    /// Payments of the user's active tenancy, newest first.
    pub fn payments_for_tenant(&self, user_id: &UserId) -> Result<Vec<Payment>, WorkflowError> {
        let Some(tenant) = self
            .store
            .active_tenant_for_user(user_id)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::ResolveTenant, err, Recorded::Nothing)
            })?
        else {
            return Ok(Vec::new());
        };

        let mut payments = self.store.payments_for_tenant(&tenant.id).map_err(|err| {
            WorkflowError::dependency(WorkflowStep::ListRecords, err, Recorded::Nothing)
        })?;
        payments.sort_by(|a, b| {
            b.payment_date
                .or(b.due_date)
                .cmp(&a.payment_date.or(a.due_date))
        });
        Ok(payments)
    }

    /// Review queue, oldest submission first.
    pub fn awaiting_review(&self) -> Result<Vec<Payment>, WorkflowError> {
        let mut payments = self
            .store
            .payments_in_state(PaymentState::AwaitingReview)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::ListRecords, err, Recorded::Nothing)
            })?;
        payments.sort_by_key(|payment| payment.submitted_at);
        Ok(payments)
    }

    fn load_payment(&self, payment_id: &PaymentId) -> Result<Payment, WorkflowError> {
        self.store
            .fetch_payment(payment_id)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::LoadPayment, err, Recorded::Nothing)
            })?
            .ok_or(WorkflowError::NotFound(Entity::Payment))
    }

    fn transition(
        &self,
        payment: Payment,
        expected: PaymentState,
        recorded: Recorded,
    ) -> Result<Payment, WorkflowError> {
        let payment_id = payment.id.clone();
        self.store
            .transition_payment(payment, expected)
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => {
                    warn!(payment = %payment_id, "payment changed during update");
                    WorkflowError::Conflict {
                        reason: ConflictReason::PaymentChanged,
                        recorded,
                    }
                }
                RepositoryError::NotFound => WorkflowError::NotFound(Entity::Payment),
                other => {
                    error!(payment = %payment_id, error = %other, "payment update failed");
                    WorkflowError::dependency(WorkflowStep::UpdatePayment, other, recorded)
                }
            })
    }

    fn payment_email(&self, to: &str, payment: &Payment, template: EmailTemplate) -> EmailMessage {
        let mut message = EmailMessage::new(to, template)
            .with_param("payment_id", payment.id.as_str())
            .with_param("amount", payment.amount.to_string())
            .with_param("currency", &payment.currency)
            .with_param(
                "reference_number",
                payment.reference_number.as_deref().unwrap_or("n/a"),
            );
        if let Some(submitted_by) = &payment.submitted_by {
            message = message.with_param("submitted_by", submitted_by.as_str());
        }
        if let Some(proof_url) = &payment.proof_url {
            message = message.with_param("proof_url", proof_url);
        }
        if let Some(paid_date) = payment.paid_date {
            message = message.with_param("paid_date", paid_date.to_string());
        }
        if let Some(notes) = &payment.review_notes {
            message = message.with_param("review_notes", notes);
        }
        message
    }

    fn notify_submitter(
        &self,
        payment: &Payment,
        template: EmailTemplate,
        report: &mut NotificationReport,
    ) {
        let Some(user_id) = &payment.submitted_by else {
            return;
        };
        match self.store.fetch_profile(user_id) {
            Ok(Some(profile)) => {
                report.deliver(
                    self.mailer.as_ref(),
                    self.payment_email(&profile.email, payment, template),
                );
            }
            Ok(None) => {
                warn!(%user_id, template = template.label(), "no profile to notify");
                report.failed += 1;
            }
            Err(err) => {
                warn!(%user_id, error = %err, "profile lookup failed; notification skipped");
                report.failed += 1;
            }
        }
    }

    fn notify_reviewers(
        &self,
        payment: &Payment,
        report: &mut NotificationReport,
        degradations: &mut Vec<Degradation>,
    ) {
        let mut recipients: BTreeSet<String> = self
            .config
            .admin_emails
            .iter()
            .map(|email| email.to_ascii_lowercase())
            .collect();
        match self.store.profiles_by_type(UserType::Admin) {
            Ok(admins) => recipients.extend(admins.into_iter().map(|admin| admin.email)),
            Err(err) => {
                warn!(error = %err, "admin lookup failed; notifying configured recipients only");
                degradations.push(Degradation::store(WorkflowStep::Notify, &err));
            }
        }
        if recipients.is_empty() {
            warn!(payment = %payment.id, "no reviewers configured");
        }

        for recipient in recipients {
            report.deliver(
                self.mailer.as_ref(),
                self.payment_email(&recipient, payment, EmailTemplate::PaymentReviewRequested),
            );
        }
    }
}

fn normalize_currency(raw: Option<&str>) -> String {
    raw.map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_ascii_uppercase)
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string())
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}
