use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use crate::adapters::{
    AccountMetadata, EmailMessage, EmailTemplate, IdentityError, IdentityProvider, Mailer,
    NewAccount, PropertyStore, RepositoryError,
};
use crate::config::PortalConfig;
use crate::domain::{
    Apartment, ApartmentId, Building, BuildingId, Invitation, InvitationId, InvitationStatus,
    NewInvitation, NewTenant, TenancyClaim, Tenant, UserId, UserProfile, UserType,
};
use crate::workflows::error::{
    ConflictReason, Degradation, Entity, Recorded, ValidationError, WorkflowError, WorkflowStep,
};
use crate::workflows::{normalize_email, require, MIN_PASSWORD_LEN};

const TEMPORARY_CREDENTIAL_LEN: usize = 16;

/// Manager-supplied invite form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvitationRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub building_id: BuildingId,
    pub apartment_id: ApartmentId,
    #[serde(default)]
    pub message: Option<String>,
}

/// Self-service signup against an invitation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptInvitationRequest {
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvitationReceipt {
    pub invitation: Invitation,
    pub tenant: Tenant,
    pub apartment: Apartment,
    /// Account provisioned for the invitee, if the identity step succeeded.
    pub account: Option<UserId>,
    pub degradations: Vec<Degradation>,
}

impl InvitationReceipt {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptanceReceipt {
    pub invitation: Invitation,
    pub tenant: Tenant,
    pub apartment: Apartment,
    pub degradations: Vec<Degradation>,
}

impl AcceptanceReceipt {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }
}

/// Provisions tenant access and the lease record behind each invitation.
pub struct InvitationWorkflow<S, I, M> {
    store: Arc<S>,
    identity: Arc<I>,
    mailer: Arc<M>,
    config: PortalConfig,
}

impl<S, I, M> InvitationWorkflow<S, I, M>
where
    S: PropertyStore + 'static,
    I: IdentityProvider + 'static,
    M: Mailer + 'static,
{
    pub fn new(store: Arc<S>, identity: Arc<I>, mailer: Arc<M>, config: PortalConfig) -> Self {
        Self {
            store,
            identity,
            mailer,
            config,
        }
    }

    /// Invite a tenant to an unoccupied apartment.
    ///
    /// Account and profile creation may fail without aborting; the receipt lists those as
    /// degradations. The email must be delivered before the tenant row and the occupancy flag
    /// are written.
    #[instrument(skip(self, request), fields(apartment = %request.apartment_id))]
    pub fn send_invitation(
        &self,
        request: InvitationRequest,
    ) -> Result<InvitationReceipt, WorkflowError> {
        let email = normalize_email(&request.email)?;
        let first_name = require("first_name", &request.first_name)?;
        let last_name = require("last_name", &request.last_name)?;
        let message = request
            .message
            .map(|note| note.trim().to_string())
            .filter(|note| !note.is_empty());

        let building = self.load_building(&request.building_id, Recorded::Nothing)?;
        let apartment = self.load_apartment(&request.apartment_id, Recorded::Nothing)?;
        if apartment.building_id != building.id {
            return Err(ValidationError::ApartmentOutsideBuilding {
                apartment: apartment.id.0.clone(),
                building: building.id.0.clone(),
            }
            .into());
        }
        if apartment.is_occupied {
            return Err(WorkflowError::conflict(ConflictReason::ApartmentOccupied));
        }
        let pending = self
            .store
            .open_invitation_for_email(&email)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::LoadInvitation, err, Recorded::Nothing)
            })?;
        if pending.is_some() {
            return Err(WorkflowError::conflict(ConflictReason::InvitationPending));
        }

        let now = Utc::now();
        let mut degradations = Vec::new();
        let credential = generate_temporary_credential();

        let account = match self.identity.create_account(NewAccount {
            email: email.clone(),
            credential: credential.clone(),
            auto_confirm: true,
            metadata: AccountMetadata {
                user_type: UserType::Tenant,
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                building_id: Some(building.id.clone()),
                apartment_id: Some(apartment.id.clone()),
            },
        }) {
            Ok(user_id) => Some(user_id),
            Err(err) => {
                warn!(error = %err, kind = err.kind(), "continuing invitation without an account");
                degradations.push(Degradation::identity(WorkflowStep::CreateAccount, &err));
                None
            }
        };

        if let Some(user_id) = &account {
            let profile = UserProfile {
                id: user_id.clone(),
                user_type: UserType::Tenant,
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                email: email.clone(),
            };
            if let Err(err) = self.store.insert_profile(profile) {
                warn!(%user_id, error = %err, "profile not created for invited account");
                degradations.push(Degradation::store(WorkflowStep::CreateProfile, &err));
            }
        }

        // An account created above outlives a failed insert, so that case is partial.
        let recorded_without_invitation = if account.is_some() {
            Recorded::Partial
        } else {
            Recorded::Nothing
        };
        let invitation = self
            .store
            .insert_invitation(NewInvitation {
                email,
                first_name,
                last_name,
                building_id: building.id.clone(),
                apartment_id: apartment.id.clone(),
                message,
                auth_user_id: account.clone(),
                created_at: now,
                expires_at: now + self.config.invitation_ttl(),
            })
            .map_err(|err| {
                error!(error = %err, "invitation not recorded");
                match err {
                    RepositoryError::Conflict(_) => WorkflowError::Conflict {
                        reason: ConflictReason::InvitationPending,
                        recorded: recorded_without_invitation,
                    },
                    other => WorkflowError::dependency(
                        WorkflowStep::RecordInvitation,
                        other,
                        recorded_without_invitation,
                    ),
                }
            })?;

        let credential_for_email = account.as_ref().map(|_| credential.as_str());
        let email_message =
            self.invitation_email(&invitation, &building, &apartment, credential_for_email, false);
        self.mailer.send(email_message).map_err(|err| {
            error!(invitation = %invitation.id, error = %err, "invitation email not delivered");
            WorkflowError::dependency(WorkflowStep::SendInvitationEmail, err, Recorded::Partial)
        })?;

        let tenant = self
            .store
            .insert_tenant(self.placeholder_tenant(&invitation, &apartment, account.clone(), now))
            .map_err(|err| {
                error!(invitation = %invitation.id, error = %err, "tenant row not created");
                WorkflowError::dependency(WorkflowStep::CreateTenant, err, Recorded::Partial)
            })?;

        let apartment = self
            .store
            .set_apartment_occupied(&apartment.id, true)
            .map_err(|err| {
                error!(invitation = %invitation.id, error = %err, "apartment not marked occupied");
                WorkflowError::dependency(
                    WorkflowStep::MarkApartmentOccupied,
                    err,
                    Recorded::Partial,
                )
            })?;

        info!(
            invitation = %invitation.id,
            tenant = %tenant.id,
            provisioned = account.is_some(),
            degraded = !degradations.is_empty(),
            "invitation sent"
        );

        Ok(InvitationReceipt {
            invitation,
            tenant,
            apartment,
            account,
            degradations,
        })
    }

    /// Self-service path: the invitee creates their own account from the invitation link.
    #[instrument(skip(self, request), fields(invitation = %invitation_id))]
    pub fn accept_invitation(
        &self,
        invitation_id: &InvitationId,
        request: AcceptInvitationRequest,
    ) -> Result<AcceptanceReceipt, WorkflowError> {
        if request.password != request.confirm_password {
            return Err(ValidationError::PasswordMismatch.into());
        }
        if request.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            }
            .into());
        }
        let requested_email = request
            .email
            .as_deref()
            .map(normalize_email)
            .transpose()?;

        let now = Utc::now();
        let invitation = self.load_open_invitation(invitation_id, now)?;
        if let Some(email) = requested_email {
            if !invitation.matches_email(&email) {
                return Err(ValidationError::EmailMismatch.into());
            }
        }
        if invitation.auth_user_id.is_some() {
            return Err(WorkflowError::conflict(
                ConflictReason::AccountAlreadyProvisioned,
            ));
        }
        let apartment = self.load_apartment(&invitation.apartment_id, Recorded::Nothing)?;
        self.ensure_unheld(&apartment, None)?;

        let user_id = self
            .identity
            .create_account(NewAccount {
                email: invitation.email.clone(),
                credential: request.password,
                auto_confirm: false,
                metadata: AccountMetadata {
                    user_type: UserType::Tenant,
                    first_name: invitation.first_name.clone(),
                    last_name: invitation.last_name.clone(),
                    building_id: Some(invitation.building_id.clone()),
                    apartment_id: Some(invitation.apartment_id.clone()),
                },
            })
            .map_err(|err| match err {
                IdentityError::EmailTaken => WorkflowError::conflict(ConflictReason::EmailInUse),
                other => {
                    error!(error = %other, "account not created for invitation");
                    WorkflowError::dependency(WorkflowStep::CreateAccount, other, Recorded::Nothing)
                }
            })?;

        let mut degradations = Vec::new();
        self.ensure_profile(&invitation, &user_id, &mut degradations);
        self.complete_acceptance(invitation, apartment, user_id, now, degradations)
    }

    /// Finalize an invitation whose account was provisioned when it was sent.
    #[instrument(skip(self, credential))]
    pub fn complete_first_sign_in(
        &self,
        email: &str,
        credential: &str,
    ) -> Result<AcceptanceReceipt, WorkflowError> {
        let email = normalize_email(email)?;
        if credential.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        let session = self
            .identity
            .sign_in(&email, credential)
            .map_err(|err| match err {
                IdentityError::InvalidCredentials => {
                    WorkflowError::from(ValidationError::InvalidCredentials)
                }
                other => WorkflowError::dependency(WorkflowStep::SignIn, other, Recorded::Nothing),
            })?;

        let now = Utc::now();
        let invitation = self
            .store
            .invitation_for_account(&session.user_id)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::LoadInvitation, err, Recorded::Nothing)
            })?
            .ok_or(WorkflowError::NotFound(Entity::Invitation))?;
        check_open(&invitation, now)?;
        let apartment = self.load_apartment(&invitation.apartment_id, Recorded::Nothing)?;
        self.ensure_unheld(&apartment, Some(&session.user_id))?;

        let mut degradations = Vec::new();
        self.ensure_profile(&invitation, &session.user_id, &mut degradations);
        self.complete_acceptance(invitation, apartment, session.user_id, now, degradations)
    }

    /// Re-run the email, tenant and occupancy steps of an invitation that stopped part way.
    ///
    /// Steps already applied are detected from the stored rows and skipped, so repeated calls
    /// converge on one tenant row.
    #[instrument(skip(self))]
    pub fn resume_invitation(
        &self,
        invitation_id: &InvitationId,
    ) -> Result<InvitationReceipt, WorkflowError> {
        let now = Utc::now();
        let invitation = self.load_open_invitation(invitation_id, now)?;
        let building = self.load_building(&invitation.building_id, Recorded::Partial)?;
        let apartment = self.load_apartment(&invitation.apartment_id, Recorded::Partial)?;

        let mut degradations = Vec::new();
        let mut reset_requested = false;
        if invitation.auth_user_id.is_some() {
            match self.identity.send_password_reset(&invitation.email) {
                Ok(()) => reset_requested = true,
                Err(err) => {
                    warn!(error = %err, "password reset not requested for resumed invitation");
                    degradations.push(Degradation::identity(WorkflowStep::PasswordReset, &err));
                }
            }
        }

        let email_message =
            self.invitation_email(&invitation, &building, &apartment, None, reset_requested);
        self.mailer.send(email_message).map_err(|err| {
            error!(invitation = %invitation.id, error = %err, "invitation email not delivered");
            WorkflowError::dependency(WorkflowStep::SendInvitationEmail, err, Recorded::Partial)
        })?;

        let rows = self
            .store
            .tenants_for_apartment(&apartment.id)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::LoadTenant, err, Recorded::Partial)
            })?;
        let held_by_other = rows.iter().any(|tenant| {
            tenant.is_active && tenant.user_id.as_ref() != invitation.auth_user_id.as_ref()
        });
        if held_by_other {
            return Err(WorkflowError::partial_conflict(
                ConflictReason::ApartmentClaimed,
            ));
        }
        let existing = rows.into_iter().find(|tenant| {
            tenant.invitation_id.as_ref() == Some(&invitation.id)
                || (invitation.auth_user_id.is_some()
                    && tenant.user_id.as_ref() == invitation.auth_user_id.as_ref())
        });

        let tenant = match existing {
            Some(tenant) => tenant,
            None => self
                .store
                .insert_tenant(self.placeholder_tenant(
                    &invitation,
                    &apartment,
                    invitation.auth_user_id.clone(),
                    now,
                ))
                .map_err(|err| {
                    WorkflowError::dependency(WorkflowStep::CreateTenant, err, Recorded::Partial)
                })?,
        };

        let apartment = self
            .store
            .set_apartment_occupied(&apartment.id, true)
            .map_err(|err| {
                WorkflowError::dependency(
                    WorkflowStep::MarkApartmentOccupied,
                    err,
                    Recorded::Partial,
                )
            })?;

        info!(invitation = %invitation.id, tenant = %tenant.id, "invitation resumed");

        let account = invitation.auth_user_id.clone();
        Ok(InvitationReceipt {
            invitation,
            tenant,
            apartment,
            account,
            degradations,
        })
    }

    #[instrument(skip(self))]
    pub fn decline_invitation(
        &self,
        invitation_id: &InvitationId,
    ) -> Result<Invitation, WorkflowError> {
        let invitation = self.close(invitation_id, InvitationStatus::Declined)?;
        self.release_if_unclaimed(&invitation.apartment_id)?;
        info!(invitation = %invitation.id, "invitation declined");
        Ok(invitation)
    }

    /// Expire every `sent` invitation past its deadline and free apartments nobody claimed.
    #[instrument(skip(self))]
    pub fn expire_invitations(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Invitation>, WorkflowError> {
        let stale: Vec<Invitation> = self
            .store
            .list_invitations()
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::ListRecords, err, Recorded::Nothing)
            })?
            .into_iter()
            .filter(|invitation| {
                invitation.status == InvitationStatus::Sent && invitation.is_expired(now)
            })
            .collect();

        let mut expired = Vec::with_capacity(stale.len());
        for invitation in stale {
            let recorded = if expired.is_empty() {
                Recorded::Nothing
            } else {
                Recorded::Partial
            };
            let closed = match self
                .store
                .close_invitation(&invitation.id, InvitationStatus::Expired)
            {
                Ok(closed) => closed,
                Err(RepositoryError::Conflict(_)) => continue,
                Err(err) => {
                    return Err(WorkflowError::dependency(
                        WorkflowStep::CloseInvitation,
                        err,
                        recorded,
                    ))
                }
            };
            self.release_if_unclaimed(&closed.apartment_id)?;
            expired.push(closed);
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "expired stale invitations");
        }
        Ok(expired)
    }

    fn complete_acceptance(
        &self,
        invitation: Invitation,
        apartment: Apartment,
        user_id: UserId,
        now: DateTime<Utc>,
        degradations: Vec<Degradation>,
    ) -> Result<AcceptanceReceipt, WorkflowError> {
        let invitation = self
            .store
            .accept_invitation(&invitation.id, &user_id, now)
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => {
                    let status = self
                        .store
                        .fetch_invitation(&invitation.id)
                        .ok()
                        .flatten()
                        .map(|current| current.status)
                        .unwrap_or(InvitationStatus::Accepted);
                    WorkflowError::partial_conflict(ConflictReason::InvitationNotOpen { status })
                }
                other => {
                    error!(invitation = %invitation.id, error = %other, "invitation not marked accepted");
                    WorkflowError::dependency(
                        WorkflowStep::AcceptInvitation,
                        other,
                        Recorded::Partial,
                    )
                }
            })?;

        let lease_start = now.date_naive();
        let tenant = self
            .store
            .claim_tenancy(TenancyClaim {
                invitation_id: invitation.id.clone(),
                apartment_id: apartment.id.clone(),
                user_id: user_id.clone(),
                lease_start_date: lease_start,
                lease_end_date: lease_start + self.config.lease_term(),
                deposit_amount: self.deposit_for(&apartment),
            })
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => {
                    warn!(invitation = %invitation.id, apartment = %apartment.id, "apartment claimed by another tenant");
                    WorkflowError::partial_conflict(ConflictReason::ApartmentClaimed)
                }
                other => {
                    error!(invitation = %invitation.id, error = %other, "tenancy not claimed");
                    WorkflowError::dependency(WorkflowStep::ClaimTenancy, other, Recorded::Partial)
                }
            })?;

        let apartment = self
            .store
            .set_apartment_occupied(&apartment.id, true)
            .map_err(|err| {
                error!(invitation = %invitation.id, error = %err, "apartment not marked occupied");
                WorkflowError::dependency(
                    WorkflowStep::MarkApartmentOccupied,
                    err,
                    Recorded::Partial,
                )
            })?;

        info!(invitation = %invitation.id, tenant = %tenant.id, %user_id, "invitation accepted");

        Ok(AcceptanceReceipt {
            invitation,
            tenant,
            apartment,
            degradations,
        })
    }

    fn ensure_profile(
        &self,
        invitation: &Invitation,
        user_id: &UserId,
        degradations: &mut Vec<Degradation>,
    ) {
        match self.store.fetch_profile(user_id) {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(err) => {
                warn!(%user_id, error = %err, "profile lookup failed");
                degradations.push(Degradation::store(WorkflowStep::LoadProfile, &err));
                return;
            }
        }

        let profile = UserProfile {
            id: user_id.clone(),
            user_type: UserType::Tenant,
            first_name: invitation.first_name.clone(),
            last_name: invitation.last_name.clone(),
            email: invitation.email.clone(),
        };
        if let Err(err) = self.store.insert_profile(profile) {
            warn!(%user_id, error = %err, "profile not created for accepted invitation");
            degradations.push(Degradation::store(WorkflowStep::CreateProfile, &err));
        }
    }

    fn close(
        &self,
        invitation_id: &InvitationId,
        status: InvitationStatus,
    ) -> Result<Invitation, WorkflowError> {
        self.store
            .close_invitation(invitation_id, status)
            .map_err(|err| match err {
                RepositoryError::NotFound => WorkflowError::NotFound(Entity::Invitation),
                RepositoryError::Conflict(_) => {
                    let status = self
                        .store
                        .fetch_invitation(invitation_id)
                        .ok()
                        .flatten()
                        .map(|current| current.status)
                        .unwrap_or(status);
                    WorkflowError::conflict(ConflictReason::InvitationNotOpen { status })
                }
                other => WorkflowError::dependency(
                    WorkflowStep::CloseInvitation,
                    other,
                    Recorded::Nothing,
                ),
            })
    }

    /// Refuses early when someone else already holds the apartment, before the invitation is
    /// marked accepted. `claim_tenancy` still decides races that start after this check.
    fn ensure_unheld(
        &self,
        apartment: &Apartment,
        user_id: Option<&UserId>,
    ) -> Result<(), WorkflowError> {
        let rows = self.store.tenants_for_apartment(&apartment.id).map_err(|err| {
            WorkflowError::dependency(WorkflowStep::LoadTenant, err, Recorded::Nothing)
        })?;
        let held_by_other = rows
            .iter()
            .any(|tenant| tenant.is_active && tenant.user_id.as_ref() != user_id);
        if held_by_other {
            warn!(apartment = %apartment.id, "apartment already held by another tenant");
            return Err(WorkflowError::conflict(ConflictReason::ApartmentClaimed));
        }
        Ok(())
    }

    fn release_if_unclaimed(&self, apartment_id: &ApartmentId) -> Result<(), WorkflowError> {
        let rows = self.store.tenants_for_apartment(apartment_id).map_err(|err| {
            WorkflowError::dependency(WorkflowStep::LoadTenant, err, Recorded::Partial)
        })?;
        if rows.iter().any(|tenant| tenant.is_active) {
            return Ok(());
        }
        self.store
            .set_apartment_occupied(apartment_id, false)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::ReleaseApartment, err, Recorded::Partial)
            })?;
        Ok(())
    }

    fn load_open_invitation(
        &self,
        invitation_id: &InvitationId,
        now: DateTime<Utc>,
    ) -> Result<Invitation, WorkflowError> {
        let invitation = self
            .store
            .fetch_invitation(invitation_id)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::LoadInvitation, err, Recorded::Nothing)
            })?
            .ok_or(WorkflowError::NotFound(Entity::Invitation))?;
        check_open(&invitation, now)?;
        Ok(invitation)
    }

    fn load_building(
        &self,
        building_id: &BuildingId,
        recorded: Recorded,
    ) -> Result<Building, WorkflowError> {
        self.store
            .fetch_building(building_id)
            .map_err(|err| WorkflowError::dependency(WorkflowStep::LoadBuilding, err, recorded))?
            .ok_or(WorkflowError::NotFound(Entity::Building))
    }

    fn load_apartment(
        &self,
        apartment_id: &ApartmentId,
        recorded: Recorded,
    ) -> Result<Apartment, WorkflowError> {
        self.store
            .fetch_apartment(apartment_id)
            .map_err(|err| WorkflowError::dependency(WorkflowStep::LoadApartment, err, recorded))?
            .ok_or(WorkflowError::NotFound(Entity::Apartment))
    }

    fn deposit_for(&self, apartment: &Apartment) -> u32 {
        apartment
            .monthly_rent
            .saturating_mul(self.config.deposit_multiplier)
    }

    fn placeholder_tenant(
        &self,
        invitation: &Invitation,
        apartment: &Apartment,
        user_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> NewTenant {
        let lease_start = now.date_naive();
        NewTenant {
            user_id,
            invitation_id: Some(invitation.id.clone()),
            apartment_id: apartment.id.clone(),
            lease_start_date: lease_start,
            lease_end_date: lease_start + self.config.lease_term(),
            deposit_amount: self.deposit_for(apartment),
            is_active: false,
        }
    }

    fn invitation_email(
        &self,
        invitation: &Invitation,
        building: &Building,
        apartment: &Apartment,
        temporary_credential: Option<&str>,
        reset_requested: bool,
    ) -> EmailMessage {
        let mut message = EmailMessage::new(&invitation.email, EmailTemplate::TenantInvitation)
            .with_param("first_name", &invitation.first_name)
            .with_param("building_name", &building.name)
            .with_param("unit_number", &apartment.unit_number)
            .with_param("login_url", self.config.login_url())
            .with_param("accept_url", self.config.accept_url(invitation.id.as_str()))
            .with_param(
                "expires_at",
                invitation.expires_at.format("%Y-%m-%d").to_string(),
            );
        if let Some(note) = &invitation.message {
            message = message.with_param("message", note);
        }
        if let Some(credential) = temporary_credential {
            message = message.with_param("temporary_password", credential);
        }
        if reset_requested {
            message = message.with_param("password_reset_requested", "true");
        }
        message
    }
}

fn check_open(invitation: &Invitation, now: DateTime<Utc>) -> Result<(), WorkflowError> {
    if invitation.status != InvitationStatus::Sent {
        return Err(WorkflowError::conflict(ConflictReason::InvitationNotOpen {
            status: invitation.status,
        }));
    }
    if invitation.is_expired(now) {
        return Err(WorkflowError::conflict(ConflictReason::InvitationExpired));
    }
    Ok(())
}

fn generate_temporary_credential() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ\
                             abcdefghijkmnopqrstuvwxyz\
                             23456789\
                             !@#$%*-_";

    let mut rng = rand::rng();
    (0..TEMPORARY_CREDENTIAL_LEN)
        .map(|_| CHARSET[rng.random_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod credential_tests {
    use super::*;

    #[test]
    fn temporary_credentials_are_long_enough_to_sign_in() {
        let credential = generate_temporary_credential();
        assert_eq!(credential.chars().count(), TEMPORARY_CREDENTIAL_LEN);
        assert!(credential.chars().count() >= MIN_PASSWORD_LEN);
        assert_ne!(credential, generate_temporary_credential());
    }
}
