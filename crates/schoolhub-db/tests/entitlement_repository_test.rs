//! Integration tests for the module catalog and entitlement
//! repositories using in-memory SurrealDB.

use schoolhub_core::error::SchoolError;
use schoolhub_core::models::module::CreateModule;
use schoolhub_core::repository::{EntitlementRepository, ModuleRepository};
use schoolhub_db::repository::{SurrealEntitlementRepository, SurrealModuleRepository};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    schoolhub_db::run_migrations(&db).await.unwrap();
    db
}

#[tokio::test]
async fn module_create_derives_display_name() {
    let db = setup().await;
    let repo = SurrealModuleRepository::new(db);

    let module = repo
        .create(CreateModule {
            key: "LEAVE_MANAGEMENT".into(),
            name: None,
        })
        .await
        .unwrap();
    assert_eq!(module.name, "Leave Management");
    assert_eq!(repo.get_by_key("LEAVE_MANAGEMENT").await.unwrap().id, module.id);
}

#[tokio::test]
async fn duplicate_module_key_is_rejected() {
    let db = setup().await;
    let repo = SurrealModuleRepository::new(db);
    let input = CreateModule {
        key: "FEES".into(),
        name: Some("Fees".into()),
    };

    repo.create(input.clone()).await.unwrap();
    let err = repo.create(input).await.unwrap_err();
    assert!(
        matches!(err, SchoolError::DuplicateModule { ref key } if key == "FEES"),
        "got {err:?}"
    );
}

#[tokio::test]
async fn get_by_keys_skips_unknown_keys() {
    let db = setup().await;
    let repo = SurrealModuleRepository::new(db);
    for key in ["EXAMS", "FEES"] {
        repo.create(CreateModule {
            key: key.into(),
            name: None,
        })
        .await
        .unwrap();
    }

    let found = repo
        .get_by_keys(&["FEES".into(), "NOPE".into(), "EXAMS".into()])
        .await
        .unwrap();
    let keys: Vec<&str> = found.iter().map(|m| m.key.as_str()).collect();
    assert_eq!(keys, vec!["EXAMS", "FEES"]);
    assert!(repo.get_by_keys(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn upsert_keeps_one_row_per_pair() {
    let db = setup().await;
    let repo = SurrealEntitlementRepository::new(db);
    let tenant = Uuid::new_v4();
    let module = Uuid::new_v4();

    repo.upsert(tenant, module, true).await.unwrap();
    repo.upsert(tenant, module, true).await.unwrap();
    let last = repo.upsert(tenant, module, false).await.unwrap();
    assert!(!last.enabled);

    let rows = repo.list_for_tenant(tenant).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert!(!rows[0].enabled);
}

#[tokio::test]
async fn disable_requires_an_existing_row() {
    let db = setup().await;
    let repo = SurrealEntitlementRepository::new(db);
    let tenant = Uuid::new_v4();
    let module = Uuid::new_v4();

    let err = repo.disable(tenant, module).await.unwrap_err();
    assert!(matches!(err, SchoolError::EntitlementNotFound { .. }), "got {err:?}");
    assert!(repo.get(tenant, module).await.unwrap().is_none());

    repo.upsert(tenant, module, true).await.unwrap();
    let disabled = repo.disable(tenant, module).await.unwrap();
    assert!(!disabled.enabled);
}
