//! Integration tests for tenant provisioning and lifecycle using
//! in-memory SurrealDB.

use chrono::{Duration, Utc};
use schoolhub_core::error::SchoolError;
use schoolhub_core::models::identity::IdentityKind;
use schoolhub_core::models::provisioning::ProvisionTenant;
use schoolhub_core::models::tenant::{TenantKind, UpdateTenant};
use schoolhub_core::repository::{
    AcademicYearRepository, AuthIdentityRepository, EntitlementRepository, ModuleRepository,
    Pagination, ProvisioningRepository, TenantRepository, UserRepository,
};
use schoolhub_db::repository::{
    SurrealAcademicYearRepository, SurrealAuthIdentityRepository, SurrealEntitlementRepository,
    SurrealModuleRepository, SurrealProvisioningRepository, SurrealTenantRepository,
    SurrealUserRepository,
};
use schoolhub_db::{SCHOOL_ADMIN_ROLE, SeedData};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    schoolhub_db::run_migrations(&db).await.unwrap();
    schoolhub_db::seed_defaults(&db, &SeedData::default())
        .await
        .unwrap();
    db
}

fn bundle(code: &str, subdomain: &str) -> ProvisionTenant {
    let start = Utc::now();
    ProvisionTenant {
        name: format!("School {code}"),
        code: code.into(),
        subdomain: subdomain.into(),
        kind: TenantKind::School,
        year_name: "2025-26".into(),
        year_start: start,
        year_end: start + Duration::days(364),
        admin_role_name: SCHOOL_ADMIN_ROLE.into(),
        admin_name: "Principal".into(),
        admin_email: format!("admin@{subdomain}.test"),
        admin_secret: "$argon2id$stub".into(),
        module_ids: Vec::new(),
    }
}

async fn count(db: &Surreal<Db>, table: &str) -> usize {
    let mut result = db
        .query(format!("SELECT VALUE id FROM {table}"))
        .await
        .unwrap();
    let ids: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    ids.len()
}

#[tokio::test]
async fn provision_creates_the_whole_bundle() {
    let db = setup().await;
    let modules = SurrealModuleRepository::new(db.clone());
    let attendance = modules.get_by_key("ATTENDANCE").await.unwrap();

    let mut input = bundle("DPS01", "dps");
    input.module_ids = vec![attendance.id];
    let summary = SurrealProvisioningRepository::new(db.clone())
        .provision_tenant(input)
        .await
        .unwrap();

    let tenant = SurrealTenantRepository::new(db.clone())
        .get_by_id(summary.tenant_id)
        .await
        .unwrap();
    assert_eq!(tenant.code, "DPS01");
    assert!(tenant.is_active);

    let active = SurrealAcademicYearRepository::new(db.clone())
        .get_active(summary.tenant_id)
        .await
        .unwrap()
        .expect("provisioned year is active");
    assert_eq!(active.id, summary.academic_year.id);

    let admin = SurrealUserRepository::new(db.clone())
        .get_by_id(summary.tenant_id, summary.admin.user_id)
        .await
        .unwrap();
    assert_eq!(admin.name, "Principal");

    let identity = SurrealAuthIdentityRepository::new(db.clone())
        .find_by_value(summary.tenant_id, IdentityKind::Email, "ADMIN@dps.test")
        .await
        .unwrap()
        .expect("email identity exists");
    assert!(identity.verified);
    assert_eq!(identity.user_id, admin.id);

    let entitlement = SurrealEntitlementRepository::new(db)
        .get(summary.tenant_id, attendance.id)
        .await
        .unwrap()
        .expect("entitlement row exists");
    assert!(entitlement.enabled);
}

#[tokio::test]
async fn duplicate_code_leaves_no_partial_rows() {
    let db = setup().await;
    let repo = SurrealProvisioningRepository::new(db.clone());
    repo.provision_tenant(bundle("DPS01", "dps")).await.unwrap();

    let before = (count(&db, "user").await, count(&db, "academic_year").await);

    let err = repo
        .provision_tenant(bundle("DPS01", "elsewhere"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, SchoolError::DuplicateTenant { ref code, .. } if code == "DPS01"),
        "got {err:?}"
    );

    let after = (count(&db, "user").await, count(&db, "academic_year").await);
    assert_eq!(before, after);
    assert_eq!(count(&db, "tenant").await, 1);
}

#[tokio::test]
async fn duplicate_subdomain_is_rejected() {
    let db = setup().await;
    let repo = SurrealProvisioningRepository::new(db);
    repo.provision_tenant(bundle("A1", "shared")).await.unwrap();

    let err = repo.provision_tenant(bundle("B2", "shared")).await.unwrap_err();
    assert!(matches!(err, SchoolError::DuplicateTenant { .. }), "got {err:?}");
}

#[tokio::test]
async fn unseeded_role_aborts_provisioning() {
    let db = setup().await;
    let mut input = bundle("X1", "x1");
    input.admin_role_name = "NO_SUCH_ROLE".into();

    let err = SurrealProvisioningRepository::new(db.clone())
        .provision_tenant(input)
        .await
        .unwrap_err();
    assert!(
        matches!(err, SchoolError::RoleNotFound { ref name } if name == "NO_SUCH_ROLE"),
        "got {err:?}"
    );
    assert_eq!(count(&db, "tenant").await, 0);
}

#[tokio::test]
async fn tenant_lookup_update_and_list() {
    let db = setup().await;
    let provisioning = SurrealProvisioningRepository::new(db.clone());
    let first = provisioning
        .provision_tenant(bundle("T1", "t1"))
        .await
        .unwrap();
    provisioning
        .provision_tenant(bundle("T2", "t2"))
        .await
        .unwrap();

    let tenants = SurrealTenantRepository::new(db);
    assert_eq!(tenants.get_by_code("T1").await.unwrap().id, first.tenant_id);
    assert_eq!(tenants.get_by_subdomain("t1").await.unwrap().id, first.tenant_id);
    assert!(tenants.get_by_code("NOPE").await.unwrap_err().is_not_found());

    let updated = tenants
        .update(
            first.tenant_id,
            UpdateTenant {
                name: Some("Renamed".into()),
                kind: Some(TenantKind::College),
                is_active: Some(false),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.kind, TenantKind::College);
    assert!(!updated.is_active);

    let page = tenants
        .list(Pagination {
            offset: 0,
            limit: 1,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn deleting_a_tenant_removes_owned_records() {
    let db = setup().await;
    let summary = SurrealProvisioningRepository::new(db.clone())
        .provision_tenant(bundle("GONE", "gone"))
        .await
        .unwrap();

    let tenants = SurrealTenantRepository::new(db.clone());
    tenants.delete(summary.tenant_id).await.unwrap();

    assert!(matches!(
        tenants.get_by_id(summary.tenant_id).await,
        Err(SchoolError::TenantNotFound(_))
    ));
    assert_eq!(count(&db, "user").await, 0);
    assert_eq!(count(&db, "academic_year").await, 0);
    assert_eq!(count(&db, "auth_identity").await, 0);
}
