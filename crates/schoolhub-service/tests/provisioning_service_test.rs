//! Integration tests for tenant provisioning and credential checks.

use schoolhub_core::error::SchoolError;
use schoolhub_core::models::provisioning::CreateTenantRequest;
use schoolhub_core::repository::{EntitlementRepository, ModuleRepository, TenantRepository};
use schoolhub_db::SeedData;
use schoolhub_db::repository::{
    SurrealAuthIdentityRepository, SurrealEntitlementRepository, SurrealModuleRepository,
    SurrealProvisioningRepository, SurrealTenantRepository, SurrealUserRepository,
};
use schoolhub_service::{CredentialService, ServiceConfig, TenantProvisioningService};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};

type Provisioner = TenantProvisioningService<SurrealProvisioningRepository<Db>, SurrealModuleRepository<Db>>;

async fn setup_db(seed: bool) -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    schoolhub_db::run_migrations(&db).await.unwrap();
    if seed {
        schoolhub_db::seed_defaults(&db, &SeedData::default())
            .await
            .unwrap();
    }
    db
}

fn provisioner(db: &Surreal<Db>) -> Provisioner {
    TenantProvisioningService::new(
        SurrealProvisioningRepository::new(db.clone()),
        SurrealModuleRepository::new(db.clone()),
        ServiceConfig::default(),
    )
}

fn request(code: &str, subdomain: &str) -> CreateTenantRequest {
    CreateTenantRequest {
        name: "Delhi Public School".into(),
        code: code.into(),
        subdomain: subdomain.into(),
        kind: None,
        academic_year_name: "2025-26".into(),
        academic_year_start: None,
        admin_name: "Principal".into(),
        admin_email: "Principal@DPS.test".into(),
        admin_password: Some("s3cure-pass".into()),
        module_keys: Some(vec!["ATTENDANCE".into(), "EXAMS".into(), "ROBOTICS".into()]),
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
async fn provisioning_enables_only_known_modules() {
    let db = setup_db(true).await;
    let summary = provisioner(&db)
        .create_tenant(request("DPS01", "dps"))
        .await
        .unwrap();

    assert_eq!(summary.code, "DPS01");
    assert_eq!(summary.admin.email, "principal@dps.test");
    assert_eq!(summary.academic_year.name, "2025-26");
    assert_eq!(summary.enabled_modules, vec!["ATTENDANCE", "EXAMS"]);

    let rows = SurrealEntitlementRepository::new(db.clone())
        .list_for_tenant(summary.tenant_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.enabled));
}

#[tokio::test]
async fn omitted_module_list_uses_configured_defaults() {
    let db = setup_db(true).await;
    let mut req = request("DEF01", "def");
    req.module_keys = None;

    let summary = provisioner(&db).create_tenant(req).await.unwrap();
    let mut expected = ServiceConfig::default().default_module_keys;
    expected.sort();
    assert_eq!(summary.enabled_modules, expected);

    let mut none = request("NONE01", "none");
    none.module_keys = Some(Vec::new());
    let summary = provisioner(&db).create_tenant(none).await.unwrap();
    assert!(summary.enabled_modules.is_empty());
}

#[tokio::test]
async fn repeated_module_keys_enable_the_module_once() {
    let db = setup_db(true).await;
    let mut req = request("REP01", "rep");
    req.module_keys = Some(vec!["EXAMS".into(), "EXAMS".into()]);

    let summary = provisioner(&db).create_tenant(req).await.unwrap();
    assert_eq!(summary.enabled_modules, vec!["EXAMS"]);
    let rows = SurrealEntitlementRepository::new(db)
        .list_for_tenant(summary.tenant_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn duplicate_code_fails_without_partial_rows() {
    let db = setup_db(true).await;
    let service = provisioner(&db);
    service.create_tenant(request("DPS01", "dps")).await.unwrap();

    let users_before = count(&db, "user").await;
    let years_before = count(&db, "academic_year").await;

    let err = service
        .create_tenant(request("DPS01", "dps-north"))
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::DuplicateTenant { .. }), "got {err:?}");

    assert_eq!(count(&db, "tenant").await, 1);
    assert_eq!(count(&db, "user").await, users_before);
    assert_eq!(count(&db, "academic_year").await, years_before);
    assert!(
        SurrealTenantRepository::new(db)
            .get_by_subdomain("dps-north")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_any_write() {
    let db = setup_db(true).await;
    let service = provisioner(&db);

    let mut bad_email = request("V1", "v1");
    bad_email.admin_email = "not-an-email".into();
    assert!(service.create_tenant(bad_email).await.unwrap_err().is_validation());

    let mut short = request("V2", "v2");
    short.admin_password = Some("abc".into());
    assert!(service.create_tenant(short).await.unwrap_err().is_validation());

    let mut blank = request("V3", "v3");
    blank.academic_year_name = "  ".into();
    assert!(service.create_tenant(blank).await.unwrap_err().is_validation());

    assert_eq!(count(&db, "tenant").await, 0);
}

#[tokio::test]
async fn missing_seed_surfaces_as_provisioning_failure() {
    let db = setup_db(false).await;
    let err = provisioner(&db)
        .create_tenant(request("X1", "x1"))
        .await
        .unwrap_err();

    assert!(matches!(err, SchoolError::ProvisioningFailed(_)), "got {err:?}");
    assert!(matches!(err.root_cause(), SchoolError::RoleNotFound { .. }));
    assert_eq!(count(&db, "tenant").await, 0);
}

#[tokio::test]
async fn provisioned_admin_can_authenticate() {
    let db = setup_db(true).await;
    let summary = provisioner(&db)
        .create_tenant(request("AUTH1", "auth1"))
        .await
        .unwrap();

    let credentials = CredentialService::new(
        SurrealAuthIdentityRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        ServiceConfig::default(),
    );

    let user = credentials
        .authenticate(summary.tenant_id, "principal@dps.test", "s3cure-pass")
        .await
        .unwrap();
    assert_eq!(user.id, summary.admin.user_id);

    let wrong = credentials
        .authenticate(summary.tenant_id, "principal@dps.test", "nope-nope")
        .await
        .unwrap_err();
    let unknown = credentials
        .authenticate(summary.tenant_id, "ghost@dps.test", "s3cure-pass")
        .await
        .unwrap_err();
    assert!(matches!(wrong, SchoolError::AuthenticationFailed { .. }));
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[tokio::test]
async fn omitted_password_falls_back_to_configured_default() {
    let db = setup_db(true).await;
    let mut req = request("FB1", "fb1");
    req.admin_password = None;
    let summary = provisioner(&db).create_tenant(req).await.unwrap();

    let credentials = CredentialService::new(
        SurrealAuthIdentityRepository::new(db.clone()),
        SurrealUserRepository::new(db.clone()),
        ServiceConfig::default(),
    );
    credentials
        .authenticate(
            summary.tenant_id,
            "principal@dps.test",
            &ServiceConfig::default().default_admin_password,
        )
        .await
        .unwrap();

    // The catalog itself is untouched by provisioning.
    let modules = SurrealModuleRepository::new(db).list().await.unwrap();
    assert_eq!(modules.len(), SeedData::default().modules.len());
}
