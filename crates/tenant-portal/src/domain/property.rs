use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{ApartmentId, BuildingId, InvitationId, TenantId, UserId, VendorId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    pub address: String,
    pub city: String,
    pub total_units: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBuilding {
    pub name: String,
    pub address: String,
    pub city: String,
    pub total_units: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Apartment {
    pub id: ApartmentId,
    pub building_id: BuildingId,
    pub unit_number: String,
    pub floor: i16,
    pub monthly_rent: u32,
    pub is_occupied: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApartment {
    pub building_id: BuildingId,
    pub unit_number: String,
    pub floor: i16,
    pub monthly_rent: u32,
}

/// Lease-holding occupant of an apartment. `user_id` stays empty until an account is linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub user_id: Option<UserId>,
    /// Invitation that reserved this row; empty for tenants entered directly.
    pub invitation_id: Option<InvitationId>,
    pub apartment_id: ApartmentId,
    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,
    pub deposit_amount: u32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTenant {
    pub user_id: Option<UserId>,
    pub invitation_id: Option<InvitationId>,
    pub apartment_id: ApartmentId,
    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,
    pub deposit_amount: u32,
    pub is_active: bool,
}

/// Request to bind an apartment to exactly one active tenant.
///
/// The store resolves it atomically. It activates the row reserved by `invitation_id` or one
/// already bound to the caller, otherwise inserts a new active row. It refuses when another
/// user already holds the apartment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenancyClaim {
    pub invitation_id: InvitationId,
    pub apartment_id: ApartmentId,
    pub user_id: UserId,
    pub lease_start_date: NaiveDate,
    pub lease_end_date: NaiveDate,
    pub deposit_amount: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VendorCategory {
    Plumbing,
    Electrical,
    Hvac,
    Cleaning,
    Landscaping,
    Security,
    General,
}

impl VendorCategory {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Plumbing => "plumbing",
            Self::Electrical => "electrical",
            Self::Hvac => "hvac",
            Self::Cleaning => "cleaning",
            Self::Landscaping => "landscaping",
            Self::Security => "security",
            Self::General => "general",
        }
    }
}

impl FromStr for VendorCategory {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "plumbing" | "plumber" => Ok(Self::Plumbing),
            "electrical" | "electrician" => Ok(Self::Electrical),
            "hvac" | "heating" => Ok(Self::Hvac),
            "cleaning" | "janitorial" => Ok(Self::Cleaning),
            "landscaping" | "gardening" => Ok(Self::Landscaping),
            "security" => Ok(Self::Security),
            "" | "general" | "handyman" | "maintenance" => Ok(Self::General),
            other => Err(format!("unknown vendor category '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub category: VendorCategory,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVendor {
    pub name: String,
    pub category: VendorCategory,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}
