//! SchoolHub migrate: applies schema migrations and seeds the global
//! role and module catalogs. Safe to run on every deployment.

use anyhow::Context;
use schoolhub_db::{DbConfig, DbManager, SeedData};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "schoolhub=info";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MigrateSettings {
    database: DbConfig,
    /// Overrides `RUST_LOG` when set.
    log_filter: Option<String>,
}

impl MigrateSettings {
    /// `schoolhub.toml` (optional) overlaid with `SCHOOLHUB__*` variables,
    /// e.g. `SCHOOLHUB__DATABASE__URL`.
    fn load() -> anyhow::Result<Self> {
        config::Config::builder()
            .add_source(config::File::with_name("schoolhub").required(false))
            .add_source(config::Environment::with_prefix("SCHOOLHUB").separator("__"))
            .build()
            .context("reading configuration")?
            .try_deserialize()
            .context("parsing configuration")
    }
}

fn init_tracing(filter: Option<&str>) -> anyhow::Result<()> {
    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives)?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))?,
    };
    tracing_subscriber::fmt().with_env_filter(filter).json().init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = MigrateSettings::load()?;
    init_tracing(settings.log_filter.as_deref())?;

    tracing::info!("Starting SchoolHub migration...");

    let manager = DbManager::connect(&settings.database)
        .await
        .with_context(|| format!("connecting to {}", settings.database.url))?;
    let report = manager
        .prepare(&SeedData::default())
        .await
        .context("applying migrations and seed data")?;

    tracing::info!(
        roles_created = report.roles_created,
        permissions_created = report.permissions_created,
        grants_created = report.grants_created,
        modules_created = report.modules_created,
        "SchoolHub database is up to date"
    );
    Ok(())
}
