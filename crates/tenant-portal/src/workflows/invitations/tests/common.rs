use std::sync::Arc;

use chrono::{Duration, Utc};

use crate::adapters::{InMemoryPropertyStore, PropertyStore};
use crate::domain::{Apartment, Building, Invitation, NewApartment, NewInvitation};
use crate::workflows::invitations::{
    AcceptInvitationRequest, InvitationRequest, InvitationWorkflow,
};
use crate::workflows::testing::{portal_config, seeded_store, FakeIdentity, RecordingMailer};

pub(super) type Workflow = InvitationWorkflow<InMemoryPropertyStore, FakeIdentity, RecordingMailer>;

pub(super) const INVITEE: &str = "dana@example.com";

pub(super) struct Harness {
    pub(super) store: Arc<InMemoryPropertyStore>,
    pub(super) identity: Arc<FakeIdentity>,
    pub(super) mailer: Arc<RecordingMailer>,
    pub(super) building: Building,
    pub(super) apartment: Apartment,
    pub(super) workflow: Arc<Workflow>,
}

pub(super) fn harness() -> Harness {
    harness_with(FakeIdentity::default())
}

pub(super) fn harness_with(identity: FakeIdentity) -> Harness {
    let (store, building, apartment) = seeded_store();
    let identity = Arc::new(identity);
    let mailer = Arc::new(RecordingMailer::default());
    let workflow = Arc::new(InvitationWorkflow::new(
        store.clone(),
        identity.clone(),
        mailer.clone(),
        portal_config(),
    ));
    Harness {
        store,
        identity,
        mailer,
        building,
        apartment,
        workflow,
    }
}

pub(super) fn invite_request(harness: &Harness) -> InvitationRequest {
    InvitationRequest {
        email: " Dana@Example.com ".to_string(),
        first_name: "Dana".to_string(),
        last_name: "Reyes".to_string(),
        building_id: harness.building.id.clone(),
        apartment_id: harness.apartment.id.clone(),
        message: Some("Keys are at the front desk.".to_string()),
    }
}

pub(super) fn acceptance(password: &str) -> AcceptInvitationRequest {
    AcceptInvitationRequest {
        email: Some(INVITEE.to_string()),
        password: password.to_string(),
        confirm_password: password.to_string(),
    }
}

pub(super) fn second_apartment(harness: &Harness, unit: &str) -> Apartment {
    harness
        .store
        .insert_apartment(NewApartment {
            building_id: harness.building.id.clone(),
            unit_number: unit.to_string(),
            floor: 2,
            monthly_rent: 1250,
        })
        .expect("apartment")
}

/// Records an invitation without an account, skipping the send workflow.
pub(super) fn stored_invitation(
    harness: &Harness,
    email: &str,
    apartment: &Apartment,
    expires_in: Duration,
) -> Invitation {
    let now = Utc::now();
    harness
        .store
        .insert_invitation(NewInvitation {
            email: email.to_string(),
            first_name: "Sam".to_string(),
            last_name: "Okafor".to_string(),
            building_id: harness.building.id.clone(),
            apartment_id: apartment.id.clone(),
            message: None,
            auth_user_id: None,
            created_at: now - Duration::days(1),
            expires_at: now + expires_in,
        })
        .expect("invitation")
}
