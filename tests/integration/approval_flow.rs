use std::sync::Arc;
use std::thread;

use chrono::NaiveDate;
use checklist_engine_lib::db::repositories::catalog_repository::CatalogRepository;
use checklist_engine_lib::db::DbPool;
use checklist_engine_lib::error::AppError;
use checklist_engine_lib::models::approval::{ApprovalUpsert, ApprovalWriteInput, ColumnValues};
use checklist_engine_lib::models::catalog::{CategoryInsert, CategoryType, ItemInsert, ItemOwner};
use checklist_engine_lib::models::role::{Caller, ChecklistColumn, Role};
use checklist_engine_lib::models::settings::EngineSettings;
use checklist_engine_lib::services::approval_service::ApprovalService;
use checklist_engine_lib::services::settings_service::SettingsService;
use tempfile::{tempdir, TempDir};

struct Fixture {
    _dir: TempDir,
    pool: DbPool,
    service: ApprovalService,
    item_id: String,
}

fn fixture() -> Fixture {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("approval.sqlite")).expect("db pool");
    let item_id = seed_item(&pool);
    let service = ApprovalService::new(pool.clone(), Arc::new(SettingsService::default()));
    Fixture {
        _dir: dir,
        pool,
        service,
        item_id,
    }
}

fn seed_item(pool: &DbPool) -> String {
    pool.with_connection(|conn| {
        let category = CatalogRepository::insert_category(
            conn,
            &CategoryInsert {
                name: "Store opening".into(),
                category_type: CategoryType::Daily,
                description: None,
                classification_criteria: Default::default(),
                sort_order: 1,
            },
        )?;
        let item = CatalogRepository::insert_item(
            conn,
            &ItemInsert {
                item_number: Some("1.1".into()),
                name: "Count the cash drawer".into(),
                score: 10.0,
                baseline: None,
                category_id: category.id,
                owner: ItemOwner::Employee,
                task_type: Some("opening".into()),
                sort_order: 1,
                notes: None,
            },
        )?;
        Ok(item.id)
    })
    .expect("seed catalog")
}

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).expect("date")
}

fn upsert(item_id: &str, column: ChecklistColumn, value: bool) -> ApprovalUpsert {
    ApprovalUpsert {
        item_id: item_id.to_string(),
        staff_id: "staff-1".into(),
        store_id: "store-1".into(),
        assessment_date: jan(10),
        columns: ColumnValues::single(column, value),
    }
}

fn employee() -> Caller {
    Caller::new(Role::Employee, "staff-1", vec!["store-1".into()])
}

fn supervisor() -> Caller {
    Caller::new(Role::Cht, "cht-1", vec!["store-1".into(), "store-2".into()])
}

#[test]
fn first_write_sets_deadline_and_stamps_checked_column() {
    let fx = fixture();
    let record = fx
        .service
        .upsert(&upsert(&fx.item_id, ChecklistColumn::EmployeeChecked, true))
        .expect("upsert");

    assert_eq!(record.assessment_date, jan(10));
    assert_eq!(record.deadline_date, jan(13));
    assert!(record.employee_checked);
    assert!(record.employee_checked_at.is_some());
    assert!(!record.cht_checked);
    assert!(record.cht_checked_at.is_none());
    assert!(!record.is_locked);
}

#[test]
fn repeated_identical_upsert_keeps_state_and_timestamps() {
    let fx = fixture();
    let input = upsert(&fx.item_id, ChecklistColumn::EmployeeChecked, true);

    let first = fx.service.upsert(&input).expect("first upsert");
    let second = fx.service.upsert(&input).expect("second upsert");

    assert_eq!(first.id, second.id);
    assert_eq!(first.employee_checked_at, second.employee_checked_at);
    assert_eq!(first.deadline_date, second.deadline_date);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(
        (first.employee_checked, first.cht_checked, first.asm_checked),
        (second.employee_checked, second.cht_checked, second.asm_checked)
    );
}

#[test]
fn deadline_is_never_rewritten() {
    let fx = fixture();
    fx.service
        .upsert(&upsert(&fx.item_id, ChecklistColumn::EmployeeChecked, true))
        .expect("upsert");

    let mut settings = EngineSettings::default();
    settings.approval_deadline_days = 7;
    let longer = ApprovalService::new(
        fx.pool.clone(),
        Arc::new(SettingsService::new(settings).expect("settings")),
    );
    let record = longer
        .upsert(&upsert(&fx.item_id, ChecklistColumn::ChtChecked, true))
        .expect("second upsert");

    assert_eq!(record.deadline_date, jan(13));
    assert!(record.employee_checked);
    assert!(record.cht_checked);
}

#[test]
fn unchecking_keeps_previous_timestamp() {
    let fx = fixture();
    let checked = fx
        .service
        .upsert(&upsert(&fx.item_id, ChecklistColumn::AsmChecked, true))
        .expect("check");
    let unchecked = fx
        .service
        .upsert(&upsert(&fx.item_id, ChecklistColumn::AsmChecked, false))
        .expect("uncheck");

    assert!(!unchecked.asm_checked);
    assert_eq!(unchecked.asm_checked_at, checked.asm_checked_at);
}

#[test]
fn concurrent_writers_of_different_columns_merge() {
    let fx = fixture();

    thread::scope(|scope| {
        for column in ChecklistColumn::ALL {
            let service = fx.service.clone();
            let input = upsert(&fx.item_id, column, true);
            scope.spawn(move || service.upsert(&input).expect("concurrent upsert"));
        }
    });

    let record = fx
        .service
        .find(&fx.item_id, "staff-1", jan(10))
        .expect("find")
        .expect("record exists");
    assert!(record.employee_checked && record.cht_checked && record.asm_checked);

    let rows: i64 = fx
        .pool
        .with_connection(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM approval_records WHERE item_id = ?1",
                [&fx.item_id],
                |row| row.get(0),
            )?)
        })
        .expect("count");
    assert_eq!(rows, 1);
}

#[test]
fn caller_write_defaults_staff_and_store() {
    let fx = fixture();
    let response = fx
        .service
        .upsert_for_caller(
            &employee(),
            ApprovalWriteInput {
                item_id: fx.item_id.clone(),
                staff_id: None,
                store_id: None,
                assessment_date: "2024-01-10".into(),
                columns: ColumnValues::single(ChecklistColumn::EmployeeChecked, true),
            },
        )
        .expect("caller upsert");

    assert!(response.success);
    let record = response.record.expect("record");
    assert_eq!(record.staff_id, "staff-1");
    assert_eq!(record.store_id, "store-1");
}

#[test]
fn supervisor_cannot_write_employee_column() {
    let fx = fixture();
    let err = fx
        .service
        .upsert_for_caller(
            &supervisor(),
            ApprovalWriteInput {
                item_id: fx.item_id.clone(),
                staff_id: Some("staff-1".into()),
                store_id: None,
                assessment_date: "2024-01-10".into(),
                columns: ColumnValues::single(ChecklistColumn::EmployeeChecked, true),
            },
        )
        .expect_err("denied");

    match err {
        AppError::ColumnDenied {
            role,
            denied_columns,
        } => {
            assert_eq!(role, Role::Cht);
            assert_eq!(denied_columns, vec![ChecklistColumn::EmployeeChecked]);
        }
        other => panic!("unexpected error: {other:?}"),
    }

    assert!(fx
        .service
        .find(&fx.item_id, "staff-1", jan(10))
        .expect("find")
        .is_none());
}

#[test]
fn supervisor_countersigns_for_staff_member() {
    let fx = fixture();
    let response = fx
        .service
        .upsert_for_caller(
            &supervisor(),
            ApprovalWriteInput {
                item_id: fx.item_id.clone(),
                staff_id: Some("staff-1".into()),
                store_id: Some("store-2".into()),
                assessment_date: "2024-01-10".into(),
                columns: ColumnValues::single(ChecklistColumn::ChtChecked, true),
            },
        )
        .expect("countersign");

    let record = response.record.expect("record");
    assert_eq!(record.staff_id, "staff-1");
    assert_eq!(record.store_id, "store-2");
    assert!(record.cht_checked);
    assert!(!record.employee_checked);
}

#[test]
fn employee_cannot_write_for_someone_else() {
    let fx = fixture();
    let err = fx
        .service
        .upsert_for_caller(
            &employee(),
            ApprovalWriteInput {
                item_id: fx.item_id.clone(),
                staff_id: Some("staff-2".into()),
                store_id: None,
                assessment_date: "2024-01-10".into(),
                columns: ColumnValues::single(ChecklistColumn::EmployeeChecked, true),
            },
        )
        .expect_err("forbidden");
    assert!(matches!(err, AppError::Forbidden { .. }));
}

#[test]
fn write_to_foreign_store_is_rejected() {
    let fx = fixture();
    let err = fx
        .service
        .upsert_for_caller(
            &employee(),
            ApprovalWriteInput {
                item_id: fx.item_id.clone(),
                staff_id: None,
                store_id: Some("store-9".into()),
                assessment_date: "2024-01-10".into(),
                columns: ColumnValues::single(ChecklistColumn::EmployeeChecked, true),
            },
        )
        .expect_err("forbidden");
    assert!(matches!(err, AppError::Forbidden { .. }));
}

#[test]
fn unknown_item_and_empty_write_are_validation_errors() {
    let fx = fixture();
    let unknown = fx
        .service
        .upsert_for_caller(
            &employee(),
            ApprovalWriteInput {
                item_id: "missing".into(),
                staff_id: None,
                store_id: None,
                assessment_date: "2024-01-10".into(),
                columns: ColumnValues::single(ChecklistColumn::EmployeeChecked, true),
            },
        )
        .expect_err("unknown item");
    assert!(matches!(unknown, AppError::Validation { .. }));

    let empty = fx
        .service
        .upsert_for_caller(
            &employee(),
            ApprovalWriteInput {
                item_id: fx.item_id.clone(),
                staff_id: None,
                store_id: None,
                assessment_date: "2024-01-10".into(),
                columns: ColumnValues::default(),
            },
        )
        .expect_err("empty write");
    assert!(matches!(empty, AppError::Validation { .. }));
}
