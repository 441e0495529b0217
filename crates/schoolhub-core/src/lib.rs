//! SchoolHub Core: domain models, error taxonomy and repository traits
//! for the tenant provisioning and entitlement core.

pub mod error;
pub mod models;
pub mod repository;

pub use error::{SchoolError, SchoolResult};
