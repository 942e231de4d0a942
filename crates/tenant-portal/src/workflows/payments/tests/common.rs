use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::adapters::{InMemoryPropertyStore, ProofFile, PropertyStore};
use crate::domain::{
    Apartment, NewTenant, PaymentMethod, PaymentType, Tenant, UserId, UserProfile, UserType,
};
use crate::workflows::payments::{PaymentSubmission, PaymentWorkflow};
use crate::workflows::testing::{
    portal_config, seeded_store, MemoryProofStorage, RecordingMailer,
};

pub(super) type Workflow = PaymentWorkflow<InMemoryPropertyStore, MemoryProofStorage, RecordingMailer>;

pub(super) const TENANT_EMAIL: &str = "dana@example.com";
pub(super) const SECOND_ADMIN: &str = "owner@example.com";

pub(super) struct Harness {
    pub(super) store: Arc<InMemoryPropertyStore>,
    pub(super) storage: Arc<MemoryProofStorage>,
    pub(super) mailer: Arc<RecordingMailer>,
    pub(super) apartment: Apartment,
    pub(super) tenant: Tenant,
    pub(super) tenant_user: UserId,
    pub(super) manager: UserId,
    pub(super) workflow: Arc<Workflow>,
}

fn profile(id: &UserId, user_type: UserType, email: &str) -> UserProfile {
    UserProfile {
        id: id.clone(),
        user_type,
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        email: email.to_string(),
    }
}

pub(super) fn harness() -> Harness {
    let (store, _building, apartment) = seeded_store();
    let tenant_user = UserId::from("usr-tenant");
    let manager = UserId::from("usr-manager");
    store
        .insert_profile(profile(&tenant_user, UserType::Tenant, TENANT_EMAIL))
        .expect("tenant profile");
    store
        .insert_profile(profile(
            &UserId::from("usr-admin"),
            UserType::Admin,
            SECOND_ADMIN,
        ))
        .expect("admin profile");
    let tenant = store
        .insert_tenant(NewTenant {
            user_id: Some(tenant_user.clone()),
            invitation_id: None,
            apartment_id: apartment.id.clone(),
            lease_start_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid"),
            lease_end_date: NaiveDate::from_ymd_opt(2027, 1, 1).expect("valid"),
            deposit_amount: 2000,
            is_active: true,
        })
        .expect("tenant");

    let storage = Arc::new(MemoryProofStorage::default());
    let mailer = Arc::new(RecordingMailer::default());
    let workflow = Arc::new(PaymentWorkflow::new(
        store.clone(),
        storage.clone(),
        mailer.clone(),
        portal_config(),
    ));
    Harness {
        store,
        storage,
        mailer,
        apartment,
        tenant,
        tenant_user,
        manager,
        workflow,
    }
}

pub(super) fn pdf_proof() -> ProofFile {
    ProofFile {
        file_name: "valid.pdf".to_string(),
        content_type: "application/pdf".to_string(),
        bytes: b"%PDF-1.7 receipt".to_vec(),
    }
}

pub(super) fn submission(amount: u32, proof: Option<ProofFile>) -> PaymentSubmission {
    PaymentSubmission {
        amount,
        currency: None,
        payment_method: PaymentMethod::BankTransfer,
        payment_type: PaymentType::Rent,
        payment_date: Utc::now().date_naive(),
        reference_number: Some(" TRX-2291 ".to_string()),
        proof,
    }
}
