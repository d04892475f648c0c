use chrono::NaiveDate;
use checklist_engine_lib::commands::AppState;
use checklist_engine_lib::db::repositories::catalog_repository::CatalogRepository;
use checklist_engine_lib::db::DbPool;
use checklist_engine_lib::models::approval::{ApprovalUpsert, ColumnValues};
use checklist_engine_lib::models::catalog::{CategoryInsert, CategoryType, ItemInsert, ItemOwner};
use checklist_engine_lib::models::monthly::MonthlyDayInput;
use checklist_engine_lib::models::role::{Caller, ChecklistColumn, Role};
use checklist_engine_lib::services::settings_service::SettingsService;
use tempfile::{tempdir, TempDir};

fn setup() -> (TempDir, AppState, String) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("sweep.sqlite")).expect("db pool");
    let item_id = pool
        .with_connection(|conn| {
            let category = CatalogRepository::insert_category(
                conn,
                &CategoryInsert {
                    name: "Closing".into(),
                    category_type: CategoryType::Daily,
                    description: None,
                    classification_criteria: Default::default(),
                    sort_order: 1,
                },
            )?;
            let item = CatalogRepository::insert_item(
                conn,
                &ItemInsert {
                    item_number: Some("3".into()),
                    name: "Lock the back door".into(),
                    score: 10.0,
                    baseline: None,
                    category_id: category.id,
                    owner: ItemOwner::Employee,
                    task_type: None,
                    sort_order: 1,
                    notes: None,
                },
            )?;
            Ok(item.id)
        })
        .expect("seed item");
    (dir, AppState::new(pool, SettingsService::default()), item_id)
}

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).expect("date")
}

fn approve(state: &AppState, item_id: &str, staff_id: &str, day: u32, columns: ColumnValues) {
    state
        .approvals()
        .upsert(&ApprovalUpsert {
            item_id: item_id.to_string(),
            staff_id: staff_id.to_string(),
            store_id: "store-1".into(),
            assessment_date: jan(day),
            columns,
        })
        .expect("approval upsert");
}

fn track(state: &AppState, item_id: &str, staff_id: &str, day: u32) {
    let caller = Caller::new(Role::Employee, staff_id, vec!["store-1".into()]);
    state
        .checklist()
        .upsert_monthly_day(
            &caller,
            MonthlyDayInput {
                item_id: item_id.to_string(),
                staff_id: None,
                store_id: None,
                month: 1,
                year: 2024,
                day,
                checked: true,
            },
        )
        .expect("monthly day");
}

fn self_report() -> ColumnValues {
    ColumnValues::single(ChecklistColumn::EmployeeChecked, true)
}

#[test]
fn overdue_self_report_is_locked_and_removed_from_the_month() {
    let (_dir, state, item_id) = setup();
    approve(&state, &item_id, "staff-1", 10, self_report());
    track(&state, &item_id, "staff-1", 9);
    track(&state, &item_id, "staff-1", 10);

    let before = state
        .tracking()
        .find(&item_id, "staff-1", 1, 2024)
        .expect("find")
        .expect("tracking");
    assert_eq!(before.successful_completions, 2);

    let report = state.sweeper().sweep_at(jan(14)).expect("sweep");
    assert_eq!(report.invalidated_count, 1);
    assert_eq!(report.cascaded_count, 1);
    assert!(report.failed_records.is_empty());
    assert!(!report.skipped);

    let record = state
        .approvals()
        .find(&item_id, "staff-1", jan(10))
        .expect("find")
        .expect("approval");
    assert!(!record.employee_checked);
    assert!(record.is_locked);
    assert!(record.locked_at.is_some());
    assert_eq!(record.deadline_date, jan(13));

    let after = state
        .tracking()
        .find(&item_id, "staff-1", 1, 2024)
        .expect("find")
        .expect("tracking");
    assert!(!after.daily_checks.is_checked(10));
    assert!(after.daily_checks.is_checked(9));
    assert_eq!(after.successful_completions, 1);

    let caller = Caller::new(Role::Employee, "staff-1", vec!["store-1".into()]);
    let aggregate = state
        .checklist()
        .employee_score(&caller, None, 1, 2024)
        .expect("score")
        .expect("aggregate");
    assert_eq!(aggregate.total_score, after.score_achieved);
}

#[test]
fn record_on_its_deadline_day_is_left_alone() {
    let (_dir, state, item_id) = setup();
    approve(&state, &item_id, "staff-1", 10, self_report());

    let report = state.sweeper().sweep_at(jan(13)).expect("sweep");
    assert_eq!(report.invalidated_count, 0);
    assert_eq!(report.cascaded_count, 0);

    let record = state
        .approvals()
        .find(&item_id, "staff-1", jan(10))
        .expect("find")
        .expect("approval");
    assert!(record.employee_checked);
    assert!(!record.is_locked);
}

#[test]
fn second_sweep_invalidates_nothing() {
    let (_dir, state, item_id) = setup();
    approve(&state, &item_id, "staff-1", 10, self_report());

    let first = state.sweeper().sweep_at(jan(14)).expect("first sweep");
    let second = state.sweeper().sweep_at(jan(14)).expect("second sweep");

    assert_eq!(first.invalidated_count, 1);
    assert_eq!(second.invalidated_count, 0);
    assert_eq!(second.cascaded_count, 0);
}

#[test]
fn countersigned_and_unreported_records_are_untouched() {
    let (_dir, state, item_id) = setup();
    let mut signed = self_report();
    signed.set(ChecklistColumn::ChtChecked, true);
    approve(&state, &item_id, "staff-1", 5, signed);
    approve(
        &state,
        &item_id,
        "staff-2",
        5,
        ColumnValues::single(ChecklistColumn::AsmChecked, true),
    );

    let report = state.sweeper().sweep_at(jan(20)).expect("sweep");
    assert_eq!(report.invalidated_count, 0);

    let signed = state
        .approvals()
        .find(&item_id, "staff-1", jan(5))
        .expect("find")
        .expect("approval");
    assert!(signed.employee_checked && signed.cht_checked);
    assert!(!signed.is_locked);

    let unreported = state
        .approvals()
        .find(&item_id, "staff-2", jan(5))
        .expect("find")
        .expect("approval");
    assert!(!unreported.is_locked);
}

#[test]
fn later_writes_never_unlock_a_swept_record() {
    let (_dir, state, item_id) = setup();
    approve(&state, &item_id, "staff-1", 10, self_report());
    state.sweeper().sweep_at(jan(14)).expect("sweep");

    approve(
        &state,
        &item_id,
        "staff-1",
        10,
        ColumnValues::single(ChecklistColumn::ChtChecked, true),
    );

    let record = state
        .approvals()
        .find(&item_id, "staff-1", jan(10))
        .expect("find")
        .expect("approval");
    assert!(record.is_locked);
    assert!(record.cht_checked);
}

#[test]
fn failed_cascade_does_not_block_others_and_is_retried() {
    let (_dir, state, item_id) = setup();
    approve(&state, &item_id, "staff-1", 10, self_report());
    approve(&state, &item_id, "staff-broken", 10, self_report());

    state
        .db()
        .with_connection(|conn| {
            conn.execute_batch(
                r#"
                CREATE TRIGGER fail_broken_tracking
                BEFORE INSERT ON monthly_tracking_records
                WHEN NEW.staff_id = 'staff-broken'
                BEGIN
                    SELECT RAISE(ABORT, 'tracking store unavailable');
                END;
                "#,
            )?;
            Ok(())
        })
        .expect("install trigger");

    let report = state.sweeper().sweep_at(jan(14)).expect("sweep");
    assert_eq!(report.invalidated_count, 2);
    assert_eq!(report.cascaded_count, 1);
    assert_eq!(report.failed_records.len(), 1);

    let broken = state
        .approvals()
        .find(&item_id, "staff-broken", jan(10))
        .expect("find")
        .expect("approval");
    assert!(broken.is_locked);
    assert_eq!(report.failed_records, vec![broken.id.clone()]);
    assert!(state
        .tracking()
        .find(&item_id, "staff-broken", 1, 2024)
        .expect("find")
        .is_none());

    state
        .db()
        .with_connection(|conn| {
            conn.execute_batch("DROP TRIGGER fail_broken_tracking;")?;
            Ok(())
        })
        .expect("drop trigger");

    let retry = state.sweeper().sweep_at(jan(15)).expect("retry sweep");
    assert_eq!(retry.invalidated_count, 0);
    assert_eq!(retry.cascaded_count, 1);
    assert!(retry.failed_records.is_empty());

    let tracking = state
        .tracking()
        .find(&item_id, "staff-broken", 1, 2024)
        .expect("find")
        .expect("tracking");
    assert!(!tracking.daily_checks.is_checked(10));
}
