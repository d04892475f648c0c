use std::sync::Arc;
use std::thread;

use checklist_engine_lib::commands::AppState;
use checklist_engine_lib::db::repositories::catalog_repository::CatalogRepository;
use checklist_engine_lib::db::DbPool;
use checklist_engine_lib::models::catalog::{
    CategoryInsert, CategoryType, ClassificationCriteria, ItemInsert, ItemOwner,
};
use checklist_engine_lib::models::employee_score::FinalClassification;
use checklist_engine_lib::models::monthly::{Classification, MonthlyDayInput};
use checklist_engine_lib::models::role::{Caller, Role};
use checklist_engine_lib::services::settings_service::SettingsService;
use tempfile::{tempdir, TempDir};

fn setup() -> (TempDir, AppState) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("scoring.sqlite")).expect("db pool");
    (dir, AppState::new(pool, SettingsService::default()))
}

fn seed_item(
    pool: &DbPool,
    category_type: CategoryType,
    criteria: ClassificationCriteria,
    score: f64,
    baseline: Option<f64>,
) -> String {
    pool.with_connection(|conn| {
        let category = CatalogRepository::insert_category(
            conn,
            &CategoryInsert {
                name: format!("{} checks", category_type.as_str()),
                category_type,
                description: None,
                classification_criteria: criteria,
                sort_order: 1,
            },
        )?;
        let item = CatalogRepository::insert_item(
            conn,
            &ItemInsert {
                item_number: None,
                name: "Clean the display fridge".into(),
                score,
                baseline,
                category_id: category.id,
                owner: ItemOwner::Employee,
                task_type: None,
                sort_order: 1,
                notes: None,
            },
        )?;
        Ok(item.id)
    })
    .expect("seed item")
}

fn employee() -> Caller {
    Caller::new(Role::Employee, "staff-1", vec!["store-1".into()])
}

fn check_days(state: &AppState, item_id: &str, month: u32, year: i32, days: impl Iterator<Item = u32>) {
    for day in days {
        state
            .checklist()
            .upsert_monthly_day(
                &employee(),
                MonthlyDayInput {
                    item_id: item_id.to_string(),
                    staff_id: None,
                    store_id: None,
                    month,
                    year,
                    day,
                    checked: true,
                },
            )
            .expect("set day");
    }
}

#[test]
fn daily_item_checked_26_of_30_days_scores_full_marks() {
    let (_dir, state) = setup();
    let item_id = seed_item(&state.db(), CategoryType::Daily, Default::default(), 10.0, None);

    check_days(&state, &item_id, 4, 2024, 1..=26);

    let record = state
        .tracking()
        .find(&item_id, "staff-1", 4, 2024)
        .expect("find")
        .expect("tracking record");
    assert_eq!(record.successful_completions, 26);
    assert!((record.achievement_percentage - 100.0).abs() < 1e-9);
    assert_eq!(record.score_achieved, 10.0);
    assert_eq!(record.classification, Some(Classification::A));

    let aggregate = state
        .checklist()
        .employee_score(&employee(), None, 4, 2024)
        .expect("score")
        .expect("aggregate");
    assert_eq!(aggregate.total_score, 10.0);
    assert_eq!(aggregate.final_classification, FinalClassification::D);
    assert_eq!(aggregate.store_id, "store-1");
}

#[test]
fn half_the_baseline_scores_half() {
    let (_dir, state) = setup();
    let item_id = seed_item(&state.db(), CategoryType::Daily, Default::default(), 10.0, None);

    check_days(&state, &item_id, 6, 2024, 1..=13);

    let record = state
        .tracking()
        .find(&item_id, "staff-1", 6, 2024)
        .expect("find")
        .expect("tracking record");
    assert_eq!(record.successful_completions, 13);
    assert_eq!(record.achievement_percentage, 50.0);
    assert_eq!(record.score_achieved, 5.0);
    assert_eq!(record.classification, Some(Classification::B));
}

#[test]
fn category_baseline_override_applies_to_daily_items() {
    let (_dir, state) = setup();
    let item_id = seed_item(
        &state.db(),
        CategoryType::Daily,
        ClassificationCriteria {
            thresholds: None,
            baseline: Some(20.0),
        },
        10.0,
        None,
    );

    check_days(&state, &item_id, 1, 2024, 1..=10);

    let record = state
        .tracking()
        .find(&item_id, "staff-1", 1, 2024)
        .expect("find")
        .expect("tracking record");
    assert_eq!(record.achievement_percentage, 50.0);
    assert_eq!(record.score_achieved, 5.0);
}

#[test]
fn partially_configured_thresholds_keep_remaining_defaults() {
    let (_dir, state) = setup();
    let item_id = seed_item(&state.db(), CategoryType::Daily, Default::default(), 10.0, None);
    state
        .db()
        .with_connection(|conn| {
            conn.execute(
                "UPDATE detail_categories SET classification_criteria = ?1
                 WHERE id = (SELECT category_id FROM checklist_items WHERE id = ?2)",
                [r#"{"thresholds":{"A":9}}"#, item_id.as_str()],
            )?;
            Ok(())
        })
        .expect("store partial criteria");

    check_days(&state, &item_id, 3, 2024, 1..=22);

    let record = state
        .tracking()
        .find(&item_id, "staff-1", 3, 2024)
        .expect("find")
        .expect("tracking record");
    assert_eq!(record.successful_completions, 22);
    assert_eq!(record.score_achieved, 8.46);
    // 8.46 would be an A under the default cut-points.
    assert_eq!(record.classification, Some(Classification::B));
}

#[test]
fn aggregate_tracks_every_item_of_the_month() {
    let (_dir, state) = setup();
    let first = seed_item(&state.db(), CategoryType::Weekly, Default::default(), 50.0, Some(4.0));
    let second = seed_item(&state.db(), CategoryType::Monthly, Default::default(), 40.0, Some(4.0));

    check_days(&state, &first, 3, 2024, [1, 8, 15, 22].into_iter());
    check_days(&state, &second, 3, 2024, [2, 9, 16, 23].into_iter());

    let aggregate = state
        .checklist()
        .employee_score(&employee(), None, 3, 2024)
        .expect("score")
        .expect("aggregate");
    assert_eq!(aggregate.total_score, 90.0);
    assert_eq!(aggregate.final_classification, FinalClassification::A);

    state
        .checklist()
        .upsert_monthly_day(
            &employee(),
            MonthlyDayInput {
                item_id: second.clone(),
                staff_id: None,
                store_id: None,
                month: 3,
                year: 2024,
                day: 23,
                checked: false,
            },
        )
        .expect("uncheck");

    let aggregate = state
        .checklist()
        .employee_score(&employee(), None, 3, 2024)
        .expect("score")
        .expect("aggregate");
    assert_eq!(aggregate.total_score, 80.0);
    assert_eq!(aggregate.final_classification, FinalClassification::B);
}

#[test]
fn soft_deleted_records_drop_out_of_the_aggregate() {
    let (_dir, state) = setup();
    let first = seed_item(&state.db(), CategoryType::Weekly, Default::default(), 50.0, Some(4.0));
    let second = seed_item(&state.db(), CategoryType::Weekly, Default::default(), 40.0, Some(4.0));

    check_days(&state, &first, 3, 2024, [1, 8, 15, 22].into_iter());
    check_days(&state, &second, 3, 2024, [2, 9, 16, 23].into_iter());

    state
        .db()
        .with_connection(|conn| {
            conn.execute(
                "UPDATE monthly_tracking_records SET is_deleted = 1 WHERE item_id = ?1",
                [&second],
            )?;
            Ok(())
        })
        .expect("soft delete");

    let outcome = state
        .scoring()
        .recompute(&first, "staff-1", "store-1", 3, 2024)
        .expect("recompute")
        .expect("outcome");

    // Exactly 50 stays a D.
    assert_eq!(outcome.aggregate.total_score, 50.0);
    assert_eq!(outcome.aggregate.final_classification, FinalClassification::D);
}

#[test]
fn recompute_without_tracking_record_is_a_no_op() {
    let (_dir, state) = setup();
    let item_id = seed_item(&state.db(), CategoryType::Daily, Default::default(), 10.0, None);

    let outcome = state
        .scoring()
        .recompute(&item_id, "staff-1", "store-1", 5, 2024)
        .expect("recompute");
    assert!(outcome.is_none());
    assert!(state
        .checklist()
        .employee_score(&employee(), None, 5, 2024)
        .expect("score")
        .is_none());
}

#[test]
fn recompute_is_idempotent() {
    let (_dir, state) = setup();
    let item_id = seed_item(&state.db(), CategoryType::Daily, Default::default(), 10.0, None);
    check_days(&state, &item_id, 2, 2024, 1..=7);

    let first = state
        .scoring()
        .recompute(&item_id, "staff-1", "store-1", 2, 2024)
        .expect("recompute")
        .expect("outcome");
    let second = state
        .scoring()
        .recompute(&item_id, "staff-1", "store-1", 2, 2024)
        .expect("recompute")
        .expect("outcome");

    assert_eq!(first.tracking.successful_completions, second.tracking.successful_completions);
    assert_eq!(first.tracking.score_achieved, second.tracking.score_achieved);
    assert_eq!(first.tracking.classification, second.tracking.classification);
    assert_eq!(first.aggregate.id, second.aggregate.id);
    assert_eq!(first.aggregate.total_score, second.aggregate.total_score);
}

#[test]
fn leap_day_counts_in_february_2024() {
    let (_dir, state) = setup();
    let item_id = seed_item(&state.db(), CategoryType::Daily, Default::default(), 10.0, None);

    check_days(&state, &item_id, 2, 2024, std::iter::once(29));
    let record = state
        .tracking()
        .find(&item_id, "staff-1", 2, 2024)
        .expect("find")
        .expect("tracking record");
    assert_eq!(record.successful_completions, 1);

    let err = state.checklist().upsert_monthly_day(
        &employee(),
        MonthlyDayInput {
            item_id: item_id.clone(),
            staff_id: None,
            store_id: None,
            month: 2,
            year: 2023,
            day: 29,
            checked: true,
        },
    );
    assert!(err.is_err());
}

#[test]
fn concurrent_day_writes_are_not_lost() {
    let (_dir, state) = setup();
    let item_id = seed_item(&state.db(), CategoryType::Daily, Default::default(), 10.0, None);
    let service = state.checklist();
    let item_id = Arc::new(item_id);

    thread::scope(|scope| {
        for day in 1..=12u32 {
            let service = Arc::clone(&service);
            let item_id = Arc::clone(&item_id);
            scope.spawn(move || {
                service
                    .upsert_monthly_day(
                        &employee(),
                        MonthlyDayInput {
                            item_id: item_id.to_string(),
                            staff_id: None,
                            store_id: None,
                            month: 7,
                            year: 2024,
                            day,
                            checked: true,
                        },
                    )
                    .expect("concurrent set day")
            });
        }
    });

    let record = state
        .tracking()
        .find(&item_id, "staff-1", 7, 2024)
        .expect("find")
        .expect("tracking record");
    assert_eq!(record.daily_checks.count_checked(31), 12);
    assert_eq!(record.successful_completions, 12);
}
