//! Building, apartment and vendor records plus the end of a tenancy.

mod import;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use import::{ImportReport, RejectedRow};
pub use router::property_router;
pub use service::{ApartmentRequest, PropertyDirectory};
