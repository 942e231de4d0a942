//! Tenant onboarding and rent payment workflows for a residential property portfolio.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod telemetry;
pub mod workflows;
