//! Domain models for SchoolHub.
//!
//! Tenant-scoped entities carry a `tenant_id`; modules, roles and
//! permissions are global.

pub mod academic_year;
pub mod admin;
pub mod authority;
pub mod identity;
pub mod module;
pub mod permission;
pub mod profile;
pub mod provisioning;
pub mod role;
pub mod scope;
pub mod tenant;
pub mod user;
