use serde::{Deserialize, Serialize};

use super::UserId;

/// Role stored on the profile and in the identity account metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Tenant,
    PropertyManager,
    BuildingOwner,
    Admin,
}

impl UserType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::PropertyManager => "property_manager",
            Self::BuildingOwner => "building_owner",
            Self::Admin => "admin",
        }
    }
}

/// One row per identity account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub user_type: UserType,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl UserProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}
