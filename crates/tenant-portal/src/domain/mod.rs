//! Entities persisted in the property store.
//!
//! Workflows never hold these records durably; every run reloads them through
//! [`crate::adapters::store::PropertyStore`] and reconstructs progress from the status fields.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod invitation;
pub mod payment;
pub mod profile;
pub mod property;

pub use invitation::{Invitation, InvitationStatus, InvitationType, NewInvitation};
pub use payment::{
    NewPayment, Payment, PaymentMethod, PaymentState, PaymentStatus, PaymentType, PaymentView,
    ReviewDecision, SubmissionStatus,
};
pub use profile::{UserProfile, UserType};
pub use property::{
    Apartment, Building, NewApartment, NewBuilding, NewTenant, NewVendor, TenancyClaim, Tenant,
    Vendor, VendorCategory,
};

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

entity_id!(
    /// Identity-provider account id; also the primary key of the matching profile.
    UserId
);
entity_id!(BuildingId);
entity_id!(ApartmentId);
entity_id!(TenantId);
entity_id!(InvitationId);
entity_id!(PaymentId);
entity_id!(VendorId);
