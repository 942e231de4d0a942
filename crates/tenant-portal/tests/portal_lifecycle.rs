use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

use chrono::{Duration, NaiveDate, Utc};
use tenant_portal::adapters::{
    EmailMessage, EmailTemplate, IdentityError, IdentityProvider, InMemoryPropertyStore, Mailer,
    NewAccount, NotificationError, ProofFile, ProofStorage, PropertyStore, Session, StorageError,
};
use tenant_portal::config::PortalConfig;
use tenant_portal::domain::{
    Apartment, Building, NewApartment, NewBuilding, PaymentMethod, PaymentStatus, PaymentType,
    ReviewDecision, SubmissionStatus, UserId,
};
use tenant_portal::workflows::invitations::{InvitationRequest, InvitationWorkflow};
use tenant_portal::workflows::payments::{PaymentSubmission, PaymentWorkflow, ReviewRequest};
use tenant_portal::workflows::{
    ConflictReason, Recorded, ValidationError, WorkflowError, WorkflowStep,
};

const INVITEE: &str = "dana@example.com";

#[derive(Default)]
struct StubIdentity {
    accounts: Mutex<HashMap<String, (UserId, String)>>,
}

impl IdentityProvider for StubIdentity {
    fn create_account(&self, account: NewAccount) -> Result<UserId, IdentityError> {
        let mut accounts = self.accounts.lock().expect("identity mutex");
        if accounts.contains_key(&account.email) {
            return Err(IdentityError::EmailTaken);
        }
        let user_id = UserId(format!("usr-{}", accounts.len() + 1));
        accounts.insert(account.email, (user_id.clone(), account.credential));
        Ok(user_id)
    }

    fn sign_in(&self, email: &str, credential: &str) -> Result<Session, IdentityError> {
        let accounts = self.accounts.lock().expect("identity mutex");
        match accounts.get(email) {
            Some((user_id, stored)) if stored == credential => Ok(Session {
                user_id: user_id.clone(),
                email: email.to_string(),
                access_token: "token".to_string(),
                expires_at: Utc::now() + Duration::hours(1),
            }),
            _ => Err(IdentityError::InvalidCredentials),
        }
    }

    fn send_password_reset(&self, _email: &str) -> Result<(), IdentityError> {
        Ok(())
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<EmailMessage>>,
    offline: AtomicBool,
}

impl Outbox {
    fn with_template(&self, template: EmailTemplate) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .expect("outbox mutex")
            .iter()
            .filter(|message| message.template == template)
            .cloned()
            .collect()
    }
}

impl Mailer for Outbox {
    fn send(&self, message: EmailMessage) -> Result<(), NotificationError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(NotificationError::Transport("smtp offline".to_string()));
        }
        self.sent.lock().expect("outbox mutex").push(message);
        Ok(())
    }
}

#[derive(Default)]
struct Bucket {
    objects: Mutex<Vec<String>>,
}

impl ProofStorage for Bucket {
    fn upload(&self, path: &str, _file: &ProofFile) -> Result<String, StorageError> {
        self.objects
            .lock()
            .expect("bucket mutex")
            .push(path.to_string());
        Ok(format!("https://files.example.com/{path}"))
    }
}

struct Portal {
    store: Arc<InMemoryPropertyStore>,
    outbox: Arc<Outbox>,
    bucket: Arc<Bucket>,
    building: Building,
    apartment: Apartment,
    invitations: Arc<InvitationWorkflow<InMemoryPropertyStore, StubIdentity, Outbox>>,
    payments: PaymentWorkflow<InMemoryPropertyStore, Bucket, Outbox>,
}

fn portal() -> Portal {
    let store = Arc::new(InMemoryPropertyStore::new());
    let building = store
        .insert_building(NewBuilding {
            name: "Maple Court".to_string(),
            address: "12 Maple St".to_string(),
            city: "Des Moines".to_string(),
            total_units: 12,
        })
        .expect("building");
    let apartment = store
        .insert_apartment(NewApartment {
            building_id: building.id.clone(),
            unit_number: "A101".to_string(),
            floor: 1,
            monthly_rent: 1000,
        })
        .expect("apartment");
    let config = PortalConfig {
        portal_url: "https://portal.example.com".to_string(),
        admin_emails: vec!["manager@example.com".to_string()],
        ..PortalConfig::default()
    };
    let identity = Arc::new(StubIdentity::default());
    let outbox = Arc::new(Outbox::default());
    let bucket = Arc::new(Bucket::default());
    let invitations = Arc::new(InvitationWorkflow::new(
        store.clone(),
        identity,
        outbox.clone(),
        config.clone(),
    ));
    let payments = PaymentWorkflow::new(store.clone(), bucket.clone(), outbox.clone(), config);
    Portal {
        store,
        outbox,
        bucket,
        building,
        apartment,
        invitations,
        payments,
    }
}

fn invite(portal: &Portal) -> InvitationRequest {
    InvitationRequest {
        email: INVITEE.to_string(),
        first_name: "Dana".to_string(),
        last_name: "Reyes".to_string(),
        building_id: portal.building.id.clone(),
        apartment_id: portal.apartment.id.clone(),
        message: Some("Welcome home".to_string()),
    }
}

fn emailed_credential(portal: &Portal) -> String {
    portal
        .outbox
        .with_template(EmailTemplate::TenantInvitation)
        .last()
        .and_then(|message| message.param("temporary_password"))
        .expect("temporary password in invitation email")
        .to_string()
}

fn rent_submission(proof: Option<ProofFile>) -> PaymentSubmission {
    PaymentSubmission {
        amount: 500,
        currency: None,
        payment_method: PaymentMethod::BankTransfer,
        payment_type: PaymentType::Rent,
        payment_date: NaiveDate::from_ymd_opt(2026, 10, 1).expect("valid"),
        reference_number: Some("TX-1001".to_string()),
        proof,
    }
}

fn pdf_proof() -> ProofFile {
    ProofFile {
        file_name: "valid.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.7 receipt".to_vec(),
    }
}

#[test]
fn invited_tenant_signs_in_and_pays_rent() {
    let portal = portal();

    let receipt = portal
        .invitations
        .send_invitation(invite(&portal))
        .expect("invitation sent");
    assert!(!receipt.is_degraded());
    assert_eq!(receipt.tenant.deposit_amount, 2000);
    assert!(!receipt.tenant.is_active);
    assert!(receipt.apartment.is_occupied);

    let accepted = portal
        .invitations
        .complete_first_sign_in(INVITEE, &emailed_credential(&portal))
        .expect("first sign-in");
    assert!(accepted.tenant.is_active);
    assert_eq!(accepted.tenant.id, receipt.tenant.id);
    let user_id = accepted.tenant.user_id.clone().expect("linked account");

    let submitted = portal
        .payments
        .submit_payment(&user_id, rent_submission(Some(pdf_proof())))
        .expect("submitted");
    assert_eq!(submitted.payment.status(), PaymentStatus::Pending);
    assert_eq!(
        submitted.payment.submission_status(),
        Some(SubmissionStatus::Pending)
    );
    assert_eq!(submitted.payment.tenant_id, Some(accepted.tenant.id.clone()));
    assert_eq!(portal.bucket.objects.lock().expect("bucket mutex").len(), 1);

    let approved = portal
        .payments
        .review_payment(ReviewRequest {
            payment_id: submitted.payment.id.clone(),
            reviewer_id: UserId::from("usr-manager"),
            decision: ReviewDecision::Approved,
            notes: None,
        })
        .expect("approved");
    assert_eq!(approved.status(), PaymentStatus::Completed);
    assert_eq!(approved.submission_status(), Some(SubmissionStatus::Approved));
    assert_eq!(approved.paid_date, Some(Utc::now().date_naive()));
    assert_eq!(
        portal
            .outbox
            .with_template(EmailTemplate::PaymentApproved)
            .len(),
        1
    );
}

#[test]
fn submission_without_proof_records_nothing() {
    let portal = portal();

    let err = portal
        .payments
        .submit_payment(&UserId::from("usr-1"), rent_submission(None))
        .expect_err("proof required");

    assert_eq!(err, WorkflowError::Validation(ValidationError::MissingProof));
    assert!(portal.bucket.objects.lock().expect("bucket mutex").is_empty());
    assert!(portal.payments.awaiting_review().expect("pending").is_empty());
}

#[test]
fn undelivered_invitation_is_partial_until_resumed() {
    let portal = portal();
    portal.outbox.offline.store(true, Ordering::SeqCst);

    let err = portal
        .invitations
        .send_invitation(invite(&portal))
        .expect_err("email fails");
    assert_eq!(err.step(), Some(WorkflowStep::SendInvitationEmail));
    assert_eq!(err.recorded(), Recorded::Partial);
    let invitation = portal
        .store
        .open_invitation_for_email(INVITEE)
        .expect("lookup")
        .expect("invitation kept");
    assert!(portal
        .store
        .tenants_for_apartment(&portal.apartment.id)
        .expect("tenants")
        .is_empty());

    portal.outbox.offline.store(false, Ordering::SeqCst);
    let resumed = portal
        .invitations
        .resume_invitation(&invitation.id)
        .expect("resumed");
    let again = portal
        .invitations
        .resume_invitation(&invitation.id)
        .expect("resumed twice");

    assert_eq!(resumed.tenant.id, again.tenant.id);
    assert!(again.apartment.is_occupied);
    assert_eq!(
        portal
            .store
            .tenants_for_apartment(&portal.apartment.id)
            .expect("tenants")
            .len(),
        1
    );
}

#[test]
fn second_first_sign_in_is_rejected() {
    let portal = portal();
    portal
        .invitations
        .send_invitation(invite(&portal))
        .expect("invitation sent");
    let credential = emailed_credential(&portal);
    portal
        .invitations
        .complete_first_sign_in(INVITEE, &credential)
        .expect("first sign-in");

    let err = portal
        .invitations
        .complete_first_sign_in(INVITEE, &credential)
        .expect_err("already accepted");

    assert!(matches!(
        err,
        WorkflowError::Conflict {
            reason: ConflictReason::InvitationNotOpen { .. },
            ..
        }
    ));
}

#[test]
fn concurrent_first_sign_ins_leave_one_active_tenant() {
    let portal = portal();
    portal
        .invitations
        .send_invitation(invite(&portal))
        .expect("invitation sent");
    let credential = emailed_credential(&portal);

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let workflow = Arc::clone(&portal.invitations);
            let barrier = Arc::clone(&barrier);
            let credential = credential.clone();
            thread::spawn(move || {
                barrier.wait();
                workflow.complete_first_sign_in(INVITEE, &credential)
            })
        })
        .collect();
    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread"))
        .collect();

    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|outcome| matches!(
        outcome,
        Err(WorkflowError::Conflict { .. })
    )));
    let active = portal
        .store
        .tenants_for_apartment(&portal.apartment.id)
        .expect("tenants")
        .into_iter()
        .filter(|tenant| tenant.is_active)
        .count();
    assert_eq!(active, 1);
}
