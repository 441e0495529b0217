//! Integration tests for roles, permissions, identities, admin scopes
//! and delegated administrators using in-memory SurrealDB.

use schoolhub_core::error::SchoolError;
use schoolhub_core::models::admin::{DelegatedAdminChanges, NewDelegatedAdmin};
use schoolhub_core::models::identity::{CreateAuthIdentity, IdentityKind};
use schoolhub_core::models::role::CreateRole;
use schoolhub_core::models::scope::{AdminScopeSet, ScopeKind, ScopeTarget};
use schoolhub_core::models::user::CreateUser;
use schoolhub_core::repository::{
    AdminScopeRepository, AuthIdentityRepository, DelegatedAdminRepository,
    PermissionRepository, RoleRepository, UserRepository,
};
use schoolhub_db::repository::{
    SurrealAdminScopeRepository, SurrealAuthIdentityRepository, SurrealDelegatedAdminRepository,
    SurrealPermissionRepository, SurrealRoleRepository, SurrealUserRepository,
};
use schoolhub_db::{DELEGATED_ADMIN_ROLE, SCHOOL_ADMIN_ROLE, SeedData};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    schoolhub_db::run_migrations(&db).await.unwrap();
    schoolhub_db::seed_defaults(&db, &SeedData::default())
        .await
        .unwrap();
    db
}

fn names(perms: &[schoolhub_core::models::permission::Permission]) -> Vec<&str> {
    perms.iter().map(|p| p.name.as_str()).collect()
}

#[tokio::test]
async fn seeded_roles_resolve_by_name_only() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db);

    let admin = roles.get_by_name(SCHOOL_ADMIN_ROLE).await.unwrap();
    assert_eq!(roles.get_by_id(admin.id).await.unwrap().name, SCHOOL_ADMIN_ROLE);

    let err = roles.get_by_name("PRINCIPAL").await.unwrap_err();
    assert!(matches!(err, SchoolError::RoleNotFound { .. }));

    let dup = roles
        .create(CreateRole {
            name: SCHOOL_ADMIN_ROLE.into(),
            description: "again".into(),
        })
        .await
        .unwrap_err();
    assert!(dup.is_conflict());
}

#[tokio::test]
async fn role_grants_are_idempotent() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let perms = SurrealPermissionRepository::new(db);

    let teacher = roles.get_by_name("TEACHER").await.unwrap();
    let before = perms.get_role_permissions(teacher.id).await.unwrap();
    assert_eq!(names(&before), vec!["MARK_ATTENDANCE", "VIEW_STUDENTS"]);

    let extra = perms.get_or_create("VIEW_TIMETABLE").await.unwrap();
    perms.grant_to_role(teacher.id, extra.id).await.unwrap();
    perms.grant_to_role(teacher.id, extra.id).await.unwrap();
    assert_eq!(perms.get_role_permissions(teacher.id).await.unwrap().len(), 3);

    perms.revoke_from_role(teacher.id, extra.id).await.unwrap();
    assert_eq!(perms.get_role_permissions(teacher.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn get_or_create_returns_the_same_permission() {
    let db = setup().await;
    let perms = SurrealPermissionRepository::new(db);

    let a = perms.get_or_create("PUBLISH_RESULTS").await.unwrap();
    let b = perms.get_or_create("PUBLISH_RESULTS").await.unwrap();
    assert_eq!(a.id, b.id);
    // Names are case-sensitive.
    let c = perms.get_or_create("publish_results").await.unwrap();
    assert_ne!(a.id, c.id);
}

#[tokio::test]
async fn direct_grants_are_scoped_to_the_users_tenant() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let users = SurrealUserRepository::new(db.clone());
    let perms = SurrealPermissionRepository::new(db);

    let tenant = Uuid::new_v4();
    let role = roles.get_by_name(DELEGATED_ADMIN_ROLE).await.unwrap();
    let user = users
        .create(CreateUser {
            tenant_id: tenant,
            name: "Coordinator".into(),
            role_id: role.id,
            photo: None,
        })
        .await
        .unwrap();
    let perm = perms.get_or_create("VIEW_FEES").await.unwrap();

    perms.grant_to_user(tenant, user.id, perm.id).await.unwrap();
    let direct = perms.get_user_permissions(tenant, user.id).await.unwrap();
    assert_eq!(names(&direct), vec!["VIEW_FEES"]);

    let other_tenant = Uuid::new_v4();
    assert!(
        perms
            .get_user_permissions(other_tenant, user.id)
            .await
            .unwrap_err()
            .is_not_found()
    );

    perms.revoke_from_user(tenant, user.id, perm.id).await.unwrap();
    assert!(perms.get_user_permissions(tenant, user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_email_identity_within_tenant() {
    let db = setup().await;
    let identities = SurrealAuthIdentityRepository::new(db);
    let tenant = Uuid::new_v4();
    let input = CreateAuthIdentity {
        tenant_id: tenant,
        user_id: Uuid::new_v4(),
        kind: IdentityKind::Email,
        value: "Teacher@School.test".into(),
        secret: "h".into(),
        verified: false,
    };

    let created = identities.create(input.clone()).await.unwrap();
    assert_eq!(created.value, "teacher@school.test");

    let err = identities
        .create(CreateAuthIdentity {
            value: "teacher@school.test ".into(),
            ..input.clone()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::DuplicateEmail { .. }), "got {err:?}");

    // Same address in another tenant is a different identity.
    identities
        .create(CreateAuthIdentity {
            tenant_id: Uuid::new_v4(),
            ..input
        })
        .await
        .unwrap();

    let verified = identities.mark_verified(tenant, created.id).await.unwrap();
    assert!(verified.verified);
}

#[tokio::test]
async fn scope_kinds_are_replaced_independently() {
    let db = setup().await;
    let scopes = SurrealAdminScopeRepository::new(db);
    let tenant = Uuid::new_v4();
    let user = Uuid::new_v4();
    let (c1, c2, s1) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    scopes
        .replace_kind(tenant, user, ScopeKind::Class, &[c1])
        .await
        .unwrap();
    scopes
        .replace_kind(tenant, user, ScopeKind::Section, &[s1])
        .await
        .unwrap();
    let rows = scopes
        .replace_kind(tenant, user, ScopeKind::Class, &[c2])
        .await
        .unwrap();

    let set = AdminScopeSet::from_rows(&rows);
    assert!(set.covers(ScopeTarget::Class(c2)));
    assert!(!set.covers(ScopeTarget::Class(c1)));
    assert!(set.covers(ScopeTarget::Section(s1)));

    let cleared = scopes
        .replace_kind(tenant, user, ScopeKind::Class, &[])
        .await
        .unwrap();
    assert_eq!(cleared.len(), 1);
}

#[tokio::test]
async fn delegated_admin_create_and_replace() {
    let db = setup().await;
    let roles = SurrealRoleRepository::new(db.clone());
    let perms = SurrealPermissionRepository::new(db.clone());
    let scopes = SurrealAdminScopeRepository::new(db.clone());
    let admins = SurrealDelegatedAdminRepository::new(db);

    let tenant = Uuid::new_v4();
    let role = roles.get_by_name(DELEGATED_ADMIN_ROLE).await.unwrap();
    let view = perms.get_or_create("VIEW_STUDENTS").await.unwrap();
    let edit = perms.get_or_create("EDIT_STUDENTS").await.unwrap();
    let (class_a, section_b) = (Uuid::new_v4(), Uuid::new_v4());

    let user = admins
        .create(NewDelegatedAdmin {
            tenant_id: tenant,
            name: "Wing Head".into(),
            role_id: role.id,
            email: "wing@school.test".into(),
            secret: "h".into(),
            permission_ids: vec![view.id],
            scopes: vec![ScopeTarget::Class(class_a), ScopeTarget::Section(section_b)],
        })
        .await
        .unwrap();
    assert_eq!(user.role_id, role.id);

    let updated = admins
        .apply_changes(
            tenant,
            user.id,
            DelegatedAdminChanges {
                name: Some("Senior Wing Head".into()),
                permission_ids: Some(vec![edit.id]),
                class_ids: Some(Vec::new()),
                section_ids: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Senior Wing Head");

    let direct = perms.get_user_permissions(tenant, user.id).await.unwrap();
    assert_eq!(names(&direct), vec!["EDIT_STUDENTS"]);

    let set = AdminScopeSet::from_rows(&scopes.list_for_user(tenant, user.id).await.unwrap());
    assert!(set.class_ids.is_empty());
    assert!(set.section_ids.contains(&section_b));

    let dup = admins
        .create(NewDelegatedAdmin {
            tenant_id: tenant,
            name: "Impostor".into(),
            role_id: role.id,
            email: "WING@school.test".into(),
            secret: "h".into(),
            permission_ids: vec![view.id],
            scopes: Vec::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(dup, SchoolError::DuplicateEmail { .. }), "got {dup:?}");
}
