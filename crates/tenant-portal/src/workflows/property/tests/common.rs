use std::sync::Arc;

use chrono::NaiveDate;

use crate::adapters::{InMemoryPropertyStore, PropertyStore};
use crate::domain::{Apartment, Building, NewTenant, NewVendor, Tenant, UserId, VendorCategory};
use crate::workflows::property::PropertyDirectory;
use crate::workflows::testing::seeded_store;

pub(super) struct Harness {
    pub(super) store: Arc<InMemoryPropertyStore>,
    pub(super) building: Building,
    pub(super) apartment: Apartment,
    pub(super) directory: Arc<PropertyDirectory<InMemoryPropertyStore>>,
}

pub(super) fn harness() -> Harness {
    let (store, building, apartment) = seeded_store();
    let directory = Arc::new(PropertyDirectory::new(store.clone()));
    Harness {
        store,
        building,
        apartment,
        directory,
    }
}

pub(super) fn vendor(name: &str, category: VendorCategory) -> NewVendor {
    NewVendor {
        name: name.to_string(),
        category,
        email: None,
        phone: None,
        notes: None,
    }
}

/// Active tenant in the seeded apartment, with the apartment marked occupied.
pub(super) fn occupy(harness: &Harness, user: &str) -> Tenant {
    let tenant = harness
        .store
        .insert_tenant(NewTenant {
            user_id: Some(UserId::from(user)),
            invitation_id: None,
            apartment_id: harness.apartment.id.clone(),
            lease_start_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid"),
            lease_end_date: NaiveDate::from_ymd_opt(2027, 1, 1).expect("valid"),
            deposit_amount: 2000,
            is_active: true,
        })
        .expect("tenant");
    harness
        .store
        .set_apartment_occupied(&harness.apartment.id, true)
        .expect("occupied");
    tenant
}
