//! Integration tests for the AcademicYear repository using in-memory
//! SurrealDB.

use chrono::{Duration, TimeZone, Utc};
use schoolhub_core::error::SchoolError;
use schoolhub_core::models::academic_year::{
    AcademicYearStatus, CreateAcademicYear, UpdateAcademicYear,
};
use schoolhub_core::repository::AcademicYearRepository;
use schoolhub_db::repository::SurrealAcademicYearRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> SurrealAcademicYearRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    schoolhub_db::run_migrations(&db).await.unwrap();
    SurrealAcademicYearRepository::new(db)
}

fn year(tenant_id: Uuid, name: &str, status: Option<AcademicYearStatus>) -> CreateAcademicYear {
    let start = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
    CreateAcademicYear {
        tenant_id,
        name: name.into(),
        start_date: start,
        end_date: start + Duration::days(364),
        status,
    }
}

#[tokio::test]
async fn create_defaults_to_planned() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();

    let created = repo.create(year(tenant, "2025-26", None)).await.unwrap();
    assert_eq!(created.status, AcademicYearStatus::Planned);
    assert_eq!(created.tenant_id, tenant);

    let fetched = repo.get_by_id(tenant, created.id).await.unwrap();
    assert_eq!(fetched.name, "2025-26");
}

#[tokio::test]
async fn second_active_year_is_rejected_with_the_existing_one() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();

    let first = repo
        .create(year(tenant, "2025-26", Some(AcademicYearStatus::Active)))
        .await
        .unwrap();

    let err = repo
        .create(year(tenant, "2026-27", Some(AcademicYearStatus::Active)))
        .await
        .unwrap_err();
    match err {
        SchoolError::ConflictingActiveYear {
            existing_id,
            existing_name,
        } => {
            assert_eq!(existing_id, first.id);
            assert_eq!(existing_name, "2025-26");
        }
        other => panic!("expected ConflictingActiveYear, got {other:?}"),
    }
    assert_eq!(repo.list_by_tenant(tenant).await.unwrap().len(), 1);
}

#[tokio::test]
async fn active_years_are_independent_per_tenant() {
    let repo = setup().await;
    for _ in 0..2 {
        repo.create(year(Uuid::new_v4(), "2025-26", Some(AcademicYearStatus::Active)))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn update_to_active_checks_other_years_only() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();
    let active = repo
        .create(year(tenant, "2025-26", Some(AcademicYearStatus::Active)))
        .await
        .unwrap();

    // Re-asserting Active on the active year itself is fine.
    repo.update(
        tenant,
        active.id,
        UpdateAcademicYear {
            status: Some(AcademicYearStatus::Active),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let planned = repo.create(year(tenant, "2026-27", None)).await.unwrap();
    let err = repo
        .update(
            tenant,
            planned.id,
            UpdateAcademicYear {
                status: Some(AcademicYearStatus::Active),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SchoolError::ConflictingActiveYear { .. }));

    repo.update(
        tenant,
        active.id,
        UpdateAcademicYear {
            status: Some(AcademicYearStatus::Archived),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let promoted = repo
        .update(
            tenant,
            planned.id,
            UpdateAcademicYear {
                status: Some(AcademicYearStatus::Active),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(promoted.status, AcademicYearStatus::Active);
    assert_eq!(
        repo.get_active(tenant).await.unwrap().map(|y| y.id),
        Some(planned.id)
    );
}

#[tokio::test]
async fn years_are_invisible_to_other_tenants() {
    let repo = setup().await;
    let owner = Uuid::new_v4();
    let created = repo.create(year(owner, "2025-26", None)).await.unwrap();

    let stranger = Uuid::new_v4();
    assert!(repo.get_by_id(stranger, created.id).await.unwrap_err().is_not_found());
    assert!(
        repo.update(
            stranger,
            created.id,
            UpdateAcademicYear {
                name: Some("hijack".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err()
        .is_not_found()
    );
}

#[tokio::test]
async fn distinct_names_span_tenants_newest_first() {
    let repo = setup().await;
    for name in ["A", "B", "C", "A"] {
        repo.create(year(Uuid::new_v4(), name, None)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let names: Vec<String> = repo
        .list_distinct_names()
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.name)
        .collect();
    assert_eq!(names, ["A", "C", "B"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_activations_leave_one_active_year() {
    let repo = setup().await;

    for _ in 0..5 {
        let tenant = Uuid::new_v4();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = repo.clone();
                tokio::spawn(async move {
                    repo.create(year(tenant, &format!("Y{i}"), Some(AcademicYearStatus::Active)))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => created += 1,
                Err(SchoolError::ConflictingActiveYear { .. }) => {}
                Err(other) => panic!("expected ConflictingActiveYear, got {other:?}"),
            }
        }
        assert_eq!(created, 1);

        let active = repo
            .list_by_tenant(tenant)
            .await
            .unwrap()
            .into_iter()
            .filter(|y| y.status == AcademicYearStatus::Active)
            .count();
        assert_eq!(active, 1);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_promotions_leave_one_active_year() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();

    let mut ids = Vec::new();
    for i in 0..6 {
        ids.push(repo.create(year(tenant, &format!("P{i}"), None)).await.unwrap().id);
    }

    let handles: Vec<_> = ids
        .into_iter()
        .map(|id| {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.update(
                    tenant,
                    id,
                    UpdateAcademicYear {
                        status: Some(AcademicYearStatus::Active),
                        ..Default::default()
                    },
                )
                .await
            })
        })
        .collect();
    for handle in handles {
        let _ = handle.await.unwrap();
    }

    let active = repo
        .list_by_tenant(tenant)
        .await
        .unwrap()
        .into_iter()
        .filter(|y| y.status == AcademicYearStatus::Active)
        .count();
    assert_eq!(active, 1);
}

#[tokio::test]
async fn update_checks_range_against_stored_bounds() {
    let repo = setup().await;
    let tenant = Uuid::new_v4();
    let created = repo.create(year(tenant, "2025-26", None)).await.unwrap();

    let err = repo
        .update(
            tenant,
            created.id,
            UpdateAcademicYear {
                end_date: Some(created.start_date - Duration::days(1)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    match err {
        SchoolError::InvalidDateRange { start, end } => {
            assert_eq!(start, created.start_date);
            assert_eq!(end, created.start_date - Duration::days(1));
        }
        other => panic!("expected InvalidDateRange, got {other:?}"),
    }

    let stored = repo.get_by_id(tenant, created.id).await.unwrap();
    assert_eq!(stored.end_date, created.end_date);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bound_moves_cannot_invert_the_range() {
    let repo = setup().await;

    for _ in 0..10 {
        let tenant = Uuid::new_v4();
        let created = repo.create(year(tenant, "2025-26", None)).await.unwrap();
        let id = created.id;
        // Each move is valid against the stored range, but not together.
        let new_start = created.end_date - Duration::days(2);
        let new_end = created.start_date + Duration::days(2);

        let move_start = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.update(
                    tenant,
                    id,
                    UpdateAcademicYear {
                        start_date: Some(new_start),
                        ..Default::default()
                    },
                )
                .await
            })
        };
        let move_end = {
            let repo = repo.clone();
            tokio::spawn(async move {
                repo.update(
                    tenant,
                    id,
                    UpdateAcademicYear {
                        end_date: Some(new_end),
                        ..Default::default()
                    },
                )
                .await
            })
        };

        let results = [move_start.await.unwrap(), move_end.await.unwrap()];
        assert!(results.iter().any(|r| r.is_ok()));
        for result in &results {
            if let Err(err) = result {
                assert!(matches!(err, SchoolError::InvalidDateRange { .. }), "got {err:?}");
            }
        }

        let stored = repo.get_by_id(tenant, id).await.unwrap();
        assert!(stored.end_date > stored.start_date);
    }
}
