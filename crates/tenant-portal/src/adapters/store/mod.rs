use chrono::{DateTime, Utc};

use crate::domain::{
    Apartment, ApartmentId, Building, BuildingId, Invitation, InvitationId, InvitationStatus,
    NewApartment, NewBuilding, NewInvitation, NewPayment, NewTenant, NewVendor, Payment,
    PaymentId, PaymentState, TenancyClaim, Tenant, TenantId, UserId, UserProfile, UserType,
    Vendor, VendorId,
};

mod memory;

pub use memory::InMemoryPropertyStore;

/// Typed access to the hosted relational store.
///
/// Plain updates are last-write-wins. The conditional writes (`accept_invitation`,
/// `claim_tenancy`, `transition_payment`) must be atomic in the backing store; they carry the
/// invariants that workflow sequencing alone cannot.
pub trait PropertyStore: Send + Sync {
    fn insert_building(&self, building: NewBuilding) -> Result<Building, RepositoryError>;
    fn fetch_building(&self, id: &BuildingId) -> Result<Option<Building>, RepositoryError>;
    fn list_buildings(&self) -> Result<Vec<Building>, RepositoryError>;

    fn insert_apartment(&self, apartment: NewApartment) -> Result<Apartment, RepositoryError>;
    fn fetch_apartment(&self, id: &ApartmentId) -> Result<Option<Apartment>, RepositoryError>;
    fn apartments_in_building(
        &self,
        building_id: &BuildingId,
    ) -> Result<Vec<Apartment>, RepositoryError>;
    fn set_apartment_occupied(
        &self,
        id: &ApartmentId,
        occupied: bool,
    ) -> Result<Apartment, RepositoryError>;

    fn insert_profile(&self, profile: UserProfile) -> Result<UserProfile, RepositoryError>;
    fn fetch_profile(&self, id: &UserId) -> Result<Option<UserProfile>, RepositoryError>;
    fn profiles_by_type(&self, user_type: UserType) -> Result<Vec<UserProfile>, RepositoryError>;

    fn insert_invitation(&self, invitation: NewInvitation) -> Result<Invitation, RepositoryError>;
    fn fetch_invitation(&self, id: &InvitationId) -> Result<Option<Invitation>, RepositoryError>;
    /// Invitation in `sent` status for the email, regardless of expiry.
    fn open_invitation_for_email(&self, email: &str)
        -> Result<Option<Invitation>, RepositoryError>;
    fn invitation_for_account(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Invitation>, RepositoryError>;
    fn list_invitations(&self) -> Result<Vec<Invitation>, RepositoryError>;
    /// Moves a `sent` invitation to `accepted`; `Conflict` when it is no longer `sent`.
    fn accept_invitation(
        &self,
        id: &InvitationId,
        auth_user_id: &UserId,
        accepted_at: DateTime<Utc>,
    ) -> Result<Invitation, RepositoryError>;
    /// Moves a `sent` invitation to `status`; `Conflict` when it is no longer `sent`.
    fn close_invitation(
        &self,
        id: &InvitationId,
        status: InvitationStatus,
    ) -> Result<Invitation, RepositoryError>;

    fn insert_tenant(&self, tenant: NewTenant) -> Result<Tenant, RepositoryError>;
    fn fetch_tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError>;
    fn tenants_for_apartment(
        &self,
        apartment_id: &ApartmentId,
    ) -> Result<Vec<Tenant>, RepositoryError>;
    fn active_tenant_for_user(&self, user_id: &UserId) -> Result<Option<Tenant>, RepositoryError>;
    /// Claim-if-unclaimed under the "one active tenant per apartment" constraint.
    fn claim_tenancy(&self, claim: TenancyClaim) -> Result<Tenant, RepositoryError>;
    fn deactivate_tenant(&self, id: &TenantId) -> Result<Tenant, RepositoryError>;

    fn insert_payment(&self, payment: NewPayment) -> Result<Payment, RepositoryError>;
    fn fetch_payment(&self, id: &PaymentId) -> Result<Option<Payment>, RepositoryError>;
    /// Replaces the row only while its state still equals `expected`.
    fn transition_payment(
        &self,
        payment: Payment,
        expected: PaymentState,
    ) -> Result<Payment, RepositoryError>;
    fn payments_for_tenant(&self, tenant_id: &TenantId) -> Result<Vec<Payment>, RepositoryError>;
    fn payments_in_state(&self, state: PaymentState) -> Result<Vec<Payment>, RepositoryError>;

    fn insert_vendor(&self, vendor: NewVendor) -> Result<Vendor, RepositoryError>;
    fn fetch_vendor(&self, id: &VendorId) -> Result<Option<Vendor>, RepositoryError>;
    fn update_vendor(&self, vendor: Vendor) -> Result<Vendor, RepositoryError>;
    fn delete_vendor(&self, id: &VendorId) -> Result<(), RepositoryError>;
    fn list_vendors(&self) -> Result<Vec<Vendor>, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("constraint violated: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Store calls that [`InMemoryPropertyStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    FetchApartment,
    SetApartmentOccupied,
    InsertProfile,
    FetchProfile,
    InsertInvitation,
    AcceptInvitation,
    InsertTenant,
    ActiveTenantForUser,
    ClaimTenancy,
    InsertPayment,
    TransitionPayment,
    InsertVendor,
}
