use std::io::Read;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::import::{parse_vendor_rows, ImportReport, RejectedRow};
use crate::adapters::{PropertyStore, RepositoryError};
use crate::domain::{
    Apartment, Building, BuildingId, NewApartment, NewBuilding, NewVendor, Tenant, TenantId,
    Vendor, VendorCategory, VendorId,
};
use crate::workflows::error::{
    ConflictReason, Entity, Recorded, ValidationError, WorkflowError, WorkflowStep,
};
use crate::workflows::{normalize_email, require};

/// Unit to add under an existing building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApartmentRequest {
    pub unit_number: String,
    #[serde(default)]
    pub floor: i16,
    pub monthly_rent: u32,
}

/// Plain record keeping for buildings, apartments and vendors.
pub struct PropertyDirectory<S> {
    store: Arc<S>,
}

impl<S> PropertyDirectory<S>
where
    S: PropertyStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, building), fields(name = %building.name))]
    pub fn create_building(&self, building: NewBuilding) -> Result<Building, WorkflowError> {
        let building = NewBuilding {
            name: require("name", &building.name)?,
            address: require("address", &building.address)?,
            city: require("city", &building.city)?,
            total_units: building.total_units,
        };
        let building = self
            .store
            .insert_building(building)
            .map_err(|err| record_error(WorkflowStep::RecordBuilding, err))?;
        info!(building_id = %building.id, "building created");
        Ok(building)
    }

    pub fn list_buildings(&self) -> Result<Vec<Building>, WorkflowError> {
        let mut buildings = self.store.list_buildings().map_err(list_error)?;
        buildings.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buildings)
    }

    #[instrument(skip(self, request), fields(unit = %request.unit_number))]
    pub fn add_apartment(
        &self,
        building_id: &BuildingId,
        request: ApartmentRequest,
    ) -> Result<Apartment, WorkflowError> {
        let unit_number = require("unit_number", &request.unit_number)?;
        if request.monthly_rent == 0 {
            return Err(ValidationError::NonPositiveAmount.into());
        }
        self.load_building(building_id)?;

        let apartment = self
            .store
            .insert_apartment(NewApartment {
                building_id: building_id.clone(),
                unit_number,
                floor: request.floor,
                monthly_rent: request.monthly_rent,
            })
            .map_err(|err| record_error(WorkflowStep::RecordApartment, err))?;
        info!(apartment_id = %apartment.id, "apartment added");
        Ok(apartment)
    }

    /// Unoccupied units of a building, ordered by unit number.
    pub fn vacant_apartments(
        &self,
        building_id: &BuildingId,
    ) -> Result<Vec<Apartment>, WorkflowError> {
        self.load_building(building_id)?;
        let mut vacant: Vec<Apartment> = self
            .store
            .apartments_in_building(building_id)
            .map_err(list_error)?
            .into_iter()
            .filter(|apartment| !apartment.is_occupied)
            .collect();
        vacant.sort_by(|a, b| a.unit_number.cmp(&b.unit_number));
        Ok(vacant)
    }

    #[instrument(skip(self, vendor), fields(name = %vendor.name))]
    pub fn register_vendor(&self, vendor: NewVendor) -> Result<Vendor, WorkflowError> {
        let vendor = clean_vendor(vendor)?;
        let vendor = self
            .store
            .insert_vendor(vendor)
            .map_err(|err| record_error(WorkflowStep::RecordVendor, err))?;
        info!(vendor_id = %vendor.id, category = vendor.category.label(), "vendor registered");
        Ok(vendor)
    }

    #[instrument(skip(self, changes))]
    pub fn update_vendor(
        &self,
        vendor_id: &VendorId,
        changes: NewVendor,
    ) -> Result<Vendor, WorkflowError> {
        let changes = clean_vendor(changes)?;
        let existing = self
            .store
            .fetch_vendor(vendor_id)
            .map_err(|err| record_error(WorkflowStep::RecordVendor, err))?
            .ok_or(WorkflowError::NotFound(Entity::Vendor))?;

        let vendor = self
            .store
            .update_vendor(Vendor {
                id: existing.id,
                name: changes.name,
                category: changes.category,
                email: changes.email,
                phone: changes.phone,
                notes: changes.notes,
                is_active: existing.is_active,
            })
            .map_err(|err| match err {
                RepositoryError::NotFound => WorkflowError::NotFound(Entity::Vendor),
                other => record_error(WorkflowStep::RecordVendor, other),
            })?;
        info!("vendor updated");
        Ok(vendor)
    }

    #[instrument(skip(self))]
    pub fn remove_vendor(&self, vendor_id: &VendorId) -> Result<(), WorkflowError> {
        self.store
            .delete_vendor(vendor_id)
            .map_err(|err| match err {
                RepositoryError::NotFound => WorkflowError::NotFound(Entity::Vendor),
                other => record_error(WorkflowStep::RecordVendor, other),
            })?;
        info!("vendor removed");
        Ok(())
    }

    /// Vendors ordered by name, optionally narrowed to one category.
    pub fn list_vendors(
        &self,
        category: Option<VendorCategory>,
    ) -> Result<Vec<Vendor>, WorkflowError> {
        let mut vendors: Vec<Vendor> = self
            .store
            .list_vendors()
            .map_err(list_error)?
            .into_iter()
            .filter(|vendor| category.map_or(true, |wanted| vendor.category == wanted))
            .collect();
        vendors.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(vendors)
    }

    /// Imports vendors from CSV. Bad rows are reported and skipped; a store failure stops the
    /// import with whatever was saved before it.
    #[instrument(skip(self, reader))]
    pub fn import_vendors<R: Read>(&self, reader: R) -> Result<ImportReport, WorkflowError> {
        let rows = parse_vendor_rows(reader)?;
        let mut report = ImportReport::default();

        for row in rows {
            let vendor = match row.vendor {
                Ok(vendor) => vendor,
                Err(reason) => {
                    warn!(line = row.line, %reason, "vendor row skipped");
                    report.rejected.push(RejectedRow {
                        line: row.line,
                        reason,
                    });
                    continue;
                }
            };
            match self.store.insert_vendor(vendor) {
                Ok(vendor) => report.imported.push(vendor),
                Err(err) => {
                    let recorded = if report.imported.is_empty() {
                        Recorded::Nothing
                    } else {
                        Recorded::Partial
                    };
                    return Err(WorkflowError::dependency(
                        WorkflowStep::RecordVendor,
                        err,
                        recorded,
                    ));
                }
            }
        }

        info!(
            imported = report.imported.len(),
            rejected = report.rejected.len(),
            "vendor import finished"
        );
        Ok(report)
    }

    /// Deactivate the tenant, then release the apartment unless another active tenant holds it.
    #[instrument(skip(self))]
    pub fn end_tenancy(&self, tenant_id: &TenantId) -> Result<Tenant, WorkflowError> {
        let tenant = self
            .store
            .fetch_tenant(tenant_id)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::LoadTenant, err, Recorded::Nothing)
            })?
            .ok_or(WorkflowError::NotFound(Entity::Tenant))?;
        if !tenant.is_active {
            return Err(WorkflowError::conflict(ConflictReason::TenancyEnded));
        }

        let tenant = self.store.deactivate_tenant(tenant_id).map_err(|err| {
            WorkflowError::dependency(WorkflowStep::EndTenancy, err, Recorded::Nothing)
        })?;

        let still_held = self
            .store
            .tenants_for_apartment(&tenant.apartment_id)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::ReleaseApartment, err, Recorded::Partial)
            })?
            .iter()
            .any(|other| other.is_active);
        if still_held {
            warn!(apartment_id = %tenant.apartment_id, "apartment still has an active tenant");
        } else {
            self.store
                .set_apartment_occupied(&tenant.apartment_id, false)
                .map_err(|err| {
                    WorkflowError::dependency(
                        WorkflowStep::ReleaseApartment,
                        err,
                        Recorded::Partial,
                    )
                })?;
        }

        info!(apartment_id = %tenant.apartment_id, released = !still_held, "tenancy ended");
        Ok(tenant)
    }

    fn load_building(&self, building_id: &BuildingId) -> Result<Building, WorkflowError> {
        self.store
            .fetch_building(building_id)
            .map_err(|err| {
                WorkflowError::dependency(WorkflowStep::LoadBuilding, err, Recorded::Nothing)
            })?
            .ok_or(WorkflowError::NotFound(Entity::Building))
    }
}

fn clean_vendor(vendor: NewVendor) -> Result<NewVendor, ValidationError> {
    let email = match vendor.email.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(raw) => Some(normalize_email(raw)?),
    };
    Ok(NewVendor {
        name: require("name", &vendor.name)?,
        category: vendor.category,
        email,
        phone: non_empty(vendor.phone),
        notes: non_empty(vendor.notes),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn record_error(step: WorkflowStep, err: RepositoryError) -> WorkflowError {
    match err {
        RepositoryError::Conflict(detail) => {
            WorkflowError::conflict(ConflictReason::Duplicate(detail))
        }
        other => WorkflowError::dependency(step, other, Recorded::Nothing),
    }
}

fn list_error(err: RepositoryError) -> WorkflowError {
    WorkflowError::dependency(WorkflowStep::ListRecords, err, Recorded::Nothing)
}
