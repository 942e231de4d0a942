use chrono::{Duration, Utc};

use super::common::*;
use crate::adapters::PropertyStore;
use crate::domain::InvitationStatus;
use crate::workflows::error::{ConflictReason, Entity, WorkflowError};
use crate::workflows::testing::FakeIdentity;

#[test]
fn reinvite_after_decline_claims_its_own_placeholder() {
    let harness = harness_with(FakeIdentity::without_service_key());
    let declined = harness
        .workflow
        .send_invitation(invite_request(&harness))
        .expect("first invitation sent");
    harness
        .workflow
        .decline_invitation(&declined.invitation.id)
        .expect("declined");
    let reinvited = harness
        .workflow
        .send_invitation(invite_request(&harness))
        .expect("second invitation sent");
    assert_ne!(reinvited.tenant.id, declined.tenant.id);

    let receipt = harness
        .workflow
        .accept_invitation(&reinvited.invitation.id, acceptance("correct-horse"))
        .expect("accepted");

    assert_eq!(receipt.tenant.id, reinvited.tenant.id);
    assert_eq!(
        receipt.tenant.invitation_id.as_ref(),
        Some(&reinvited.invitation.id)
    );
    let stale = harness
        .store
        .fetch_tenant(&declined.tenant.id)
        .expect("store")
        .expect("declined placeholder");
    assert_eq!(stale.user_id, None);
    assert!(!stale.is_active);
    let active = harness
        .store
        .tenants_for_apartment(&harness.apartment.id)
        .expect("store")
        .into_iter()
        .filter(|tenant| tenant.is_active)
        .count();
    assert_eq!(active, 1);
}

#[test]
fn resume_after_decline_does_not_reuse_the_declined_placeholder() {
    let harness = harness_with(FakeIdentity::without_service_key());
    let declined = harness
        .workflow
        .send_invitation(invite_request(&harness))
        .expect("first invitation sent");
    harness
        .workflow
        .decline_invitation(&declined.invitation.id)
        .expect("declined");

    harness.mailer.set_failing(true);
    assert!(harness
        .workflow
        .send_invitation(invite_request(&harness))
        .is_err());
    harness.mailer.set_failing(false);
    let pending = harness
        .store
        .open_invitation_for_email(INVITEE)
        .expect("store")
        .expect("interrupted invitation");

    let resumed = harness
        .workflow
        .resume_invitation(&pending.id)
        .expect("resumed");

    assert_ne!(resumed.tenant.id, declined.tenant.id);
    assert_eq!(resumed.tenant.invitation_id.as_ref(), Some(&pending.id));
    let again = harness
        .workflow
        .resume_invitation(&pending.id)
        .expect("resumed twice");
    assert_eq!(again.tenant.id, resumed.tenant.id);
}

#[test]
fn decline_releases_the_reserved_apartment() {
    let harness = harness_with(FakeIdentity::without_service_key());
    let sent = harness
        .workflow
        .send_invitation(invite_request(&harness))
        .expect("invitation sent");

    let declined = harness
        .workflow
        .decline_invitation(&sent.invitation.id)
        .expect("declined");

    assert_eq!(declined.status, InvitationStatus::Declined);
    let apartment = harness
        .store
        .fetch_apartment(&harness.apartment.id)
        .expect("store")
        .expect("apartment");
    assert!(!apartment.is_occupied);

    assert_eq!(
        harness.workflow.decline_invitation(&sent.invitation.id),
        Err(WorkflowError::conflict(ConflictReason::InvitationNotOpen {
            status: InvitationStatus::Declined
        }))
    );
    assert_eq!(
        harness.workflow.decline_invitation(&"inv-404".into()),
        Err(WorkflowError::NotFound(Entity::Invitation))
    );
}

#[test]
fn decline_keeps_an_apartment_with_an_active_tenant() {
    let harness = harness_with(FakeIdentity::without_service_key());
    let accepted = harness
        .workflow
        .send_invitation(invite_request(&harness))
        .expect("invitation sent");
    harness
        .workflow
        .accept_invitation(&accepted.invitation.id, acceptance("correct-horse"))
        .expect("accepted");
    let stray = stored_invitation(
        &harness,
        "stray@example.com",
        &harness.apartment,
        Duration::days(2),
    );

    harness
        .workflow
        .decline_invitation(&stray.id)
        .expect("declined");

    let apartment = harness
        .store
        .fetch_apartment(&harness.apartment.id)
        .expect("store")
        .expect("apartment");
    assert!(apartment.is_occupied);
}

#[test]
fn expiry_sweep_closes_only_stale_invitations() {
    let harness = harness();
    let other = second_apartment(&harness, "C303");
    harness
        .store
        .set_apartment_occupied(&other.id, true)
        .expect("reserve");
    let stale = stored_invitation(&harness, "late@example.com", &other, Duration::hours(-2));
    let fresh = harness
        .workflow
        .send_invitation(invite_request(&harness))
        .expect("invitation sent");

    let expired = harness
        .workflow
        .expire_invitations(Utc::now())
        .expect("sweep");

    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].id, stale.id);
    assert_eq!(expired[0].status, InvitationStatus::Expired);
    let released = harness
        .store
        .fetch_apartment(&other.id)
        .expect("store")
        .expect("apartment");
    assert!(!released.is_occupied);

    let still_open = harness
        .store
        .fetch_invitation(&fresh.invitation.id)
        .expect("store")
        .expect("invitation");
    assert_eq!(still_open.status, InvitationStatus::Sent);

    let again = harness
        .workflow
        .expire_invitations(Utc::now())
        .expect("sweep");
    assert!(again.is_empty());
}
