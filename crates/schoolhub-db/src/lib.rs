//! SchoolHub Database: SurrealDB connection management, schema
//! migrations, catalog seeding and the repository implementations of
//! the `schoolhub-core` traits.

mod connection;
mod error;
pub mod repository;
mod schema;
mod seed;

pub use connection::{DbConfig, DbManager};
pub use error::DbError;
pub use schema::run_migrations;
pub use seed::{
    DELEGATED_ADMIN_ROLE, SCHOOL_ADMIN_ROLE, SeedData, SeedModule, SeedReport, SeedRole,
    seed_defaults,
};
