use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::service::{ApartmentRequest, PropertyDirectory};
use crate::adapters::PropertyStore;
use crate::domain::{BuildingId, NewBuilding, NewVendor, TenantId, VendorCategory, VendorId};

#[derive(Debug, Clone, Deserialize)]
pub struct VendorFilter {
    #[serde(default)]
    pub category: Option<VendorCategory>,
}

pub fn property_router<S>(directory: Arc<PropertyDirectory<S>>) -> Router
where
    S: PropertyStore + 'static,
{
    Router::new()
        .route(
            "/api/v1/buildings",
            get(list_buildings_handler::<S>).post(create_building_handler::<S>),
        )
        .route(
            "/api/v1/buildings/:building_id/apartments",
            post(add_apartment_handler::<S>),
        )
        .route(
            "/api/v1/buildings/:building_id/vacancies",
            get(vacancies_handler::<S>),
        )
        .route(
            "/api/v1/vendors",
            get(list_vendors_handler::<S>).post(register_vendor_handler::<S>),
        )
        .route(
            "/api/v1/vendors/:vendor_id",
            put(update_vendor_handler::<S>).delete(remove_vendor_handler::<S>),
        )
        .route("/api/v1/vendor-imports", post(import_vendors_handler::<S>))
        .route(
            "/api/v1/tenants/:tenant_id/end",
            post(end_tenancy_handler::<S>),
        )
        .with_state(directory)
}

pub(crate) async fn create_building_handler<S>(
    State(directory): State<Arc<PropertyDirectory<S>>>,
    axum::Json(building): axum::Json<NewBuilding>,
) -> Response
where
    S: PropertyStore + 'static,
{
    match directory.create_building(building) {
        Ok(building) => (StatusCode::CREATED, axum::Json(building)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_buildings_handler<S>(
    State(directory): State<Arc<PropertyDirectory<S>>>,
) -> Response
where
    S: PropertyStore + 'static,
{
    match directory.list_buildings() {
        Ok(buildings) => {
            (StatusCode::OK, axum::Json(json!({ "buildings": buildings }))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn add_apartment_handler<S>(
    State(directory): State<Arc<PropertyDirectory<S>>>,
    Path(building_id): Path<String>,
    axum::Json(request): axum::Json<ApartmentRequest>,
) -> Response
where
    S: PropertyStore + 'static,
{
    match directory.add_apartment(&BuildingId(building_id), request) {
        Ok(apartment) => (StatusCode::CREATED, axum::Json(apartment)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn vacancies_handler<S>(
    State(directory): State<Arc<PropertyDirectory<S>>>,
    Path(building_id): Path<String>,
) -> Response
where
    S: PropertyStore + 'static,
{
    match directory.vacant_apartments(&BuildingId(building_id)) {
        Ok(apartments) => {
            (StatusCode::OK, axum::Json(json!({ "apartments": apartments }))).into_response()
        }
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn list_vendors_handler<S>(
    State(directory): State<Arc<PropertyDirectory<S>>>,
    Query(filter): Query<VendorFilter>,
) -> Response
where
    S: PropertyStore + 'static,
{
    match directory.list_vendors(filter.category) {
        Ok(vendors) => (StatusCode::OK, axum::Json(json!({ "vendors": vendors }))).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn register_vendor_handler<S>(
    State(directory): State<Arc<PropertyDirectory<S>>>,
    axum::Json(vendor): axum::Json<NewVendor>,
) -> Response
where
    S: PropertyStore + 'static,
{
    match directory.register_vendor(vendor) {
        Ok(vendor) => (StatusCode::CREATED, axum::Json(vendor)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn update_vendor_handler<S>(
    State(directory): State<Arc<PropertyDirectory<S>>>,
    Path(vendor_id): Path<String>,
    axum::Json(changes): axum::Json<NewVendor>,
) -> Response
where
    S: PropertyStore + 'static,
{
    match directory.update_vendor(&VendorId(vendor_id), changes) {
        Ok(vendor) => (StatusCode::OK, axum::Json(vendor)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn remove_vendor_handler<S>(
    State(directory): State<Arc<PropertyDirectory<S>>>,
    Path(vendor_id): Path<String>,
) -> Response
where
    S: PropertyStore + 'static,
{
    match directory.remove_vendor(&VendorId(vendor_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

/// Accepts the raw CSV document as the request body.
pub(crate) async fn import_vendors_handler<S>(
    State(directory): State<Arc<PropertyDirectory<S>>>,
    body: String,
) -> Response
where
    S: PropertyStore + 'static,
{
    match directory.import_vendors(body.as_bytes()) {
        Ok(report) => (StatusCode::OK, axum::Json(report)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn end_tenancy_handler<S>(
    State(directory): State<Arc<PropertyDirectory<S>>>,
    Path(tenant_id): Path<String>,
) -> Response
where
    S: PropertyStore + 'static,
{
    match directory.end_tenancy(&TenantId(tenant_id)) {
        Ok(tenant) => (StatusCode::OK, axum::Json(tenant)).into_response(),
        Err(err) => err.into_response(),
    }
}
