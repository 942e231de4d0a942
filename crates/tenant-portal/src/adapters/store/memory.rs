use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{PropertyStore, RepositoryError, StoreOperation};
use crate::domain::{
    Apartment, ApartmentId, Building, BuildingId, Invitation, InvitationId, InvitationStatus,
    InvitationType, NewApartment, NewBuilding, NewInvitation, NewPayment, NewTenant, NewVendor,
    Payment, PaymentId, PaymentState, TenancyClaim, Tenant, TenantId, UserId, UserProfile,
    UserType, Vendor, VendorId,
};

#[derive(Debug, Default)]
struct Tables {
    buildings: BTreeMap<BuildingId, Building>,
    apartments: BTreeMap<ApartmentId, Apartment>,
    profiles: BTreeMap<UserId, UserProfile>,
    invitations: BTreeMap<InvitationId, Invitation>,
    tenants: BTreeMap<TenantId, Tenant>,
    payments: BTreeMap<PaymentId, Payment>,
    vendors: BTreeMap<VendorId, Vendor>,
}

/// Process-local store used by the demo service and the test suites.
///
/// All tables sit behind one lock, so the conditional writes are atomic the same way a
/// row-level constraint would make them in the hosted database.
#[derive(Debug, Default)]
pub struct InMemoryPropertyStore {
    tables: Mutex<Tables>,
    sequence: AtomicU64,
    failures: Mutex<HashSet<StoreOperation>>,
}

impl InMemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `operation` fail with `Unavailable` until cleared.
    pub fn inject_failure(&self, operation: StoreOperation) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(operation);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.clear();
        }
    }

    fn check(&self, operation: StoreOperation) -> Result<(), RepositoryError> {
        let failures = self
            .failures
            .lock()
            .map_err(|_| RepositoryError::Unavailable("failure registry poisoned".to_string()))?;
        if failures.contains(&operation) {
            return Err(RepositoryError::Unavailable(format!(
                "injected failure for {operation:?}"
            )));
        }
        Ok(())
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    fn next_id(&self, prefix: &str) -> String {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{prefix}-{id:06}")
    }
}

impl PropertyStore for InMemoryPropertyStore {
    fn insert_building(&self, building: NewBuilding) -> Result<Building, RepositoryError> {
        let record = Building {
            id: BuildingId(self.next_id("bld")),
            name: building.name,
            address: building.address,
            city: building.city,
            total_units: building.total_units,
        };
        self.tables()?
            .buildings
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch_building(&self, id: &BuildingId) -> Result<Option<Building>, RepositoryError> {
        Ok(self.tables()?.buildings.get(id).cloned())
    }

    fn list_buildings(&self) -> Result<Vec<Building>, RepositoryError> {
        Ok(self.tables()?.buildings.values().cloned().collect())
    }

    fn insert_apartment(&self, apartment: NewApartment) -> Result<Apartment, RepositoryError> {
        let mut tables = self.tables()?;
        if !tables.buildings.contains_key(&apartment.building_id) {
            return Err(RepositoryError::Conflict(
                "apartment references an unknown building".to_string(),
            ));
        }
        let duplicate = tables.apartments.values().any(|existing| {
            existing.building_id == apartment.building_id
                && existing.unit_number == apartment.unit_number
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "unit {} already exists in building {}",
                apartment.unit_number, apartment.building_id
            )));
        }

        let record = Apartment {
            id: ApartmentId(self.next_id("apt")),
            building_id: apartment.building_id,
            unit_number: apartment.unit_number,
            floor: apartment.floor,
            monthly_rent: apartment.monthly_rent,
            is_occupied: false,
        };
        tables.apartments.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch_apartment(&self, id: &ApartmentId) -> Result<Option<Apartment>, RepositoryError> {
        self.check(StoreOperation::FetchApartment)?;
        Ok(self.tables()?.apartments.get(id).cloned())
    }

    fn apartments_in_building(
        &self,
        building_id: &BuildingId,
    ) -> Result<Vec<Apartment>, RepositoryError> {
        Ok(self
            .tables()?
            .apartments
            .values()
            .filter(|apartment| &apartment.building_id == building_id)
            .cloned()
            .collect())
    }

    fn set_apartment_occupied(
        &self,
        id: &ApartmentId,
        occupied: bool,
    ) -> Result<Apartment, RepositoryError> {
        self.check(StoreOperation::SetApartmentOccupied)?;
        let mut tables = self.tables()?;
        let apartment = tables
            .apartments
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        apartment.is_occupied = occupied;
        Ok(apartment.clone())
    }

    fn insert_profile(&self, profile: UserProfile) -> Result<UserProfile, RepositoryError> {
        self.check(StoreOperation::InsertProfile)?;
        let mut tables = self.tables()?;
        if tables.profiles.contains_key(&profile.id) {
            return Err(RepositoryError::Conflict(
                "profile already exists for this account".to_string(),
            ));
        }
        tables.profiles.insert(profile.id.clone(), profile.clone());
        Ok(profile)
    }

    fn fetch_profile(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError> {
        self.check(StoreOperation::FetchProfile)?;
        Ok(self.tables()?.profiles.get(id).cloned())
    }

    fn profiles_by_type(&self, user_type: UserType) -> Result<Vec<UserProfile>, RepositoryError> {
        Ok(self
            .tables()?
            .profiles
            .values()
            .filter(|profile| profile.user_type == user_type)
            .cloned()
            .collect())
    }

    fn insert_invitation(&self, invitation: NewInvitation) -> Result<Invitation, RepositoryError> {
        self.check(StoreOperation::InsertInvitation)?;
        let mut tables = self.tables()?;
        let open_duplicate = tables.invitations.values().any(|existing| {
            existing.status == InvitationStatus::Sent
                && existing.email.eq_ignore_ascii_case(&invitation.email)
        });
        if open_duplicate {
            return Err(RepositoryError::Conflict(
                "an open invitation already exists for this email".to_string(),
            ));
        }

        let record = Invitation {
            id: InvitationId(self.next_id("inv")),
            email: invitation.email,
            first_name: invitation.first_name,
            last_name: invitation.last_name,
            building_id: invitation.building_id,
            apartment_id: invitation.apartment_id,
            invitation_type: InvitationType::Tenant,
            message: invitation.message,
            status: InvitationStatus::Sent,
            auth_user_id: invitation.auth_user_id,
            created_at: invitation.created_at,
            expires_at: invitation.expires_at,
            accepted_at: None,
        };
        tables.invitations.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch_invitation(&self, id: &InvitationId) -> Result<Option<Invitation>, RepositoryError> {
        Ok(self.tables()?.invitations.get(id).cloned())
    }

    fn open_invitation_for_email(
        &self,
        email: &str,
    ) -> Result<Option<Invitation>, RepositoryError> {
        Ok(self
            .tables()?
            .invitations
            .values()
            .find(|invitation| {
                invitation.status == InvitationStatus::Sent && invitation.matches_email(email)
            })
            .cloned())
    }

    fn invitation_for_account(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Invitation>, RepositoryError> {
        let tables = self.tables()?;
        let mut bound: Vec<&Invitation> = tables
            .invitations
            .values()
            .filter(|invitation| invitation.auth_user_id.as_ref() == Some(user_id))
            .collect();
        bound.sort_by_key(|invitation| invitation.created_at);
        Ok(bound.last().map(|invitation| (*invitation).clone()))
    }

    fn list_invitations(&self) -> Result<Vec<Invitation>, RepositoryError> {
        Ok(self.tables()?.invitations.values().cloned().collect())
    }

    fn accept_invitation(
        &self,
        id: &InvitationId,
        auth_user_id: &UserId,
        accepted_at: DateTime<Utc>,
    ) -> Result<Invitation, RepositoryError> {
        self.check(StoreOperation::AcceptInvitation)?;
        let mut tables = self.tables()?;
        let invitation = tables
            .invitations
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if invitation.status != InvitationStatus::Sent {
            return Err(RepositoryError::Conflict(format!(
                "invitation is {}",
                invitation.status.label()
            )));
        }
        invitation.status = InvitationStatus::Accepted;
        invitation.accepted_at = Some(accepted_at);
        invitation.auth_user_id = Some(auth_user_id.clone());
        Ok(invitation.clone())
    }

    fn close_invitation(
        &self,
        id: &InvitationId,
        status: InvitationStatus,
    ) -> Result<Invitation, RepositoryError> {
        let mut tables = self.tables()?;
        let invitation = tables
            .invitations
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        if invitation.status != InvitationStatus::Sent {
            return Err(RepositoryError::Conflict(format!(
                "invitation is {}",
                invitation.status.label()
            )));
        }
        invitation.status = status;
        Ok(invitation.clone())
    }

    fn insert_tenant(&self, tenant: NewTenant) -> Result<Tenant, RepositoryError> {
        self.check(StoreOperation::InsertTenant)?;
        let mut tables = self.tables()?;
        if tenant.is_active
            && tables
                .tenants
                .values()
                .any(|existing| existing.is_active && existing.apartment_id == tenant.apartment_id)
        {
            return Err(RepositoryError::Conflict(
                "apartment already has an active tenant".to_string(),
            ));
        }

        let record = Tenant {
            id: TenantId(self.next_id("ten")),
            user_id: tenant.user_id,
            invitation_id: tenant.invitation_id,
            apartment_id: tenant.apartment_id,
            lease_start_date: tenant.lease_start_date,
            lease_end_date: tenant.lease_end_date,
            deposit_amount: tenant.deposit_amount,
            is_active: tenant.is_active,
        };
        tables.tenants.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        Ok(self.tables()?.tenants.get(id).cloned())
    }

    fn tenants_for_apartment(
        &self,
        apartment_id: &ApartmentId,
    ) -> Result<Vec<Tenant>, RepositoryError> {
        Ok(self
            .tables()?
            .tenants
            .values()
            .filter(|tenant| &tenant.apartment_id == apartment_id)
            .cloned()
            .collect())
    }

    fn active_tenant_for_user(&self, user_id: &UserId) -> Result<Option<Tenant>, RepositoryError> {
        self.check(StoreOperation::ActiveTenantForUser)?;
        Ok(self
            .tables()?
            .tenants
            .values()
            .find(|tenant| tenant.is_active && tenant.user_id.as_ref() == Some(user_id))
            .cloned())
    }

    fn claim_tenancy(&self, claim: TenancyClaim) -> Result<Tenant, RepositoryError> {
        self.check(StoreOperation::ClaimTenancy)?;
        let mut tables = self.tables()?;

        let holder = tables
            .tenants
            .values()
            .find(|tenant| tenant.is_active && tenant.apartment_id == claim.apartment_id);
        if let Some(holder) = holder {
            if holder.user_id.as_ref() == Some(&claim.user_id) {
                return Ok(holder.clone());
            }
            return Err(RepositoryError::Conflict(
                "apartment already has an active tenant".to_string(),
            ));
        }

        // Rows reserved by other invitations are never taken over, even after those close.
        let reserved = tables
            .tenants
            .values()
            .find(|tenant| {
                tenant.apartment_id == claim.apartment_id
                    && tenant.invitation_id.as_ref() == Some(&claim.invitation_id)
            })
            .or_else(|| {
                tables.tenants.values().find(|tenant| {
                    tenant.apartment_id == claim.apartment_id
                        && tenant.user_id.as_ref() == Some(&claim.user_id)
                })
            })
            .map(|tenant| tenant.id.clone());

        if let Some(tenant_id) = reserved {
            let tenant = tables
                .tenants
                .get_mut(&tenant_id)
                .ok_or(RepositoryError::NotFound)?;
            tenant.user_id = Some(claim.user_id);
            tenant.is_active = true;
            return Ok(tenant.clone());
        }

        let record = Tenant {
            id: TenantId(self.next_id("ten")),
            user_id: Some(claim.user_id),
            invitation_id: Some(claim.invitation_id),
            apartment_id: claim.apartment_id,
            lease_start_date: claim.lease_start_date,
            lease_end_date: claim.lease_end_date,
            deposit_amount: claim.deposit_amount,
            is_active: true,
        };
        tables.tenants.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn deactivate_tenant(&self, id: &TenantId) -> Result<Tenant, RepositoryError> {
        let mut tables = self.tables()?;
        let tenant = tables.tenants.get_mut(id).ok_or(RepositoryError::NotFound)?;
        tenant.is_active = false;
        Ok(tenant.clone())
    }

    fn insert_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError> {
        self.check(StoreOperation::InsertPayment)?;
        let record = Payment {
            id: PaymentId(self.next_id("pay")),
            tenant_id: payment.tenant_id,
            apartment_id: payment.apartment_id,
            amount: payment.amount,
            currency: payment.currency,
            payment_type: payment.payment_type,
            payment_method: payment.payment_method,
            state: payment.state,
            proof_url: payment.proof_url,
            reference_number: payment.reference_number,
            submitted_by: payment.submitted_by,
            submitted_at: payment.submitted_at,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
            due_date: payment.due_date,
            payment_date: payment.payment_date,
            paid_date: None,
            needs_reconciliation: payment.needs_reconciliation,
        };
        self.tables()?
            .payments
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch_payment(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError> {
        Ok(self.tables()?.payments.get(id).cloned())
    }

    fn transition_payment(
        &self,
        payment: Payment,
        expected: PaymentState,
    ) -> Result<Payment, RepositoryError> {
        self.check(StoreOperation::TransitionPayment)?;
        let mut tables = self.tables()?;
        let current = tables
            .payments
            .get_mut(&payment.id)
            .ok_or(RepositoryError::NotFound)?;
        if current.state != expected {
            return Err(RepositoryError::Conflict(format!(
                "payment moved to {:?} concurrently",
                current.state
            )));
        }
        *current = payment.clone();
        Ok(payment)
    }

    fn payments_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<Payment>, RepositoryError> {
        Ok(self
            .tables()?
            .payments
            .values()
            .filter(|payment| payment.tenant_id.as_ref() == Some(tenant_id))
            .cloned()
            .collect())
    }

    fn payments_in_state(&self, state: PaymentState) -> Result<Vec<Payment>, RepositoryError> {
        Ok(self
            .tables()?
            .payments
            .values()
            .filter(|payment| payment.state == state)
            .cloned()
            .collect())
    }

    fn insert_vendor(&self, vendor: NewVendor) -> Result<Vendor, RepositoryError> {
        self.check(StoreOperation::InsertVendor)?;
        let record = Vendor {
            id: VendorId(self.next_id("vnd")),
            name: vendor.name,
            category: vendor.category,
            email: vendor.email,
            phone: vendor.phone,
            notes: vendor.notes,
            is_active: true,
        };
        self.tables()?
            .vendors
            .insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch_vendor(&self, id: &VendorId) -> Result<Option<Vendor>, RepositoryError> {
        Ok(self.tables()?.vendors.get(id).cloned())
    }

    fn update_vendor(&self, vendor: Vendor) -> Result<Vendor, RepositoryError> {
        let mut tables = self.tables()?;
        match tables.vendors.get_mut(&vendor.id) {
            Some(existing) => {
                *existing = vendor.clone();
                Ok(vendor)
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn delete_vendor(&self, id: &VendorId) -> Result<(), RepositoryError> {
        self.tables()?
            .vendors
            .remove(id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn list_vendors(&self) -> Result<Vec<Vendor>, RepositoryError> {
        Ok(self.tables()?.vendors.values().cloned().collect())
    }
}
