// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 运行记录与台账的保存 / 按台账顺序读取 / 级联删除
// ==========================================

mod test_helpers;

use chrono::{NaiveDate, Utc};
use schedule_reconcile::db::{open_sqlite_connection, read_schema_version, CURRENT_SCHEMA_VERSION};
use schedule_reconcile::domain::{OriginClass, SplitTransferRecord, TransferLedger, WholeTransferRecord};
use schedule_reconcile::repository::{ReconcileRunEntity, RepositoryError, TransferRunRepository};
use std::sync::{Arc, Mutex};

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 3, day).unwrap()
}

fn run(run_id: &str) -> ReconcileRunEntity {
    let now = Utc::now().naive_utc();
    ReconcileRunEntity {
        run_id: run_id.to_string(),
        started_at: now,
        finished_at: now,
        config_snapshot: r#"{"fail_fast":false}"#.to_string(),
        item_count: 3,
        succeeded_count: 2,
        failure_count: 1,
    }
}

fn ledger() -> TransferLedger {
    TransferLedger {
        whole: vec![
            WholeTransferRecord {
                item_id: "E2".to_string(),
                total_quantity: 3,
                origin_class: OriginClass::Internal,
                lot_id: "Z".to_string(),
                from_date: date(8),
                to_date: date(1),
            },
            WholeTransferRecord {
                item_id: "E1".to_string(),
                total_quantity: 7,
                origin_class: OriginClass::External,
                lot_id: "A".to_string(),
                from_date: date(1),
                to_date: date(15),
            },
        ],
        split: vec![SplitTransferRecord {
            item_id: "E1".to_string(),
            lot_id: "B".to_string(),
            lot_total_quantity: 4,
            from_date: date(8),
            moved_quantity: 2,
            to_date: date(1),
        }],
    }
}

#[test]
fn test_save_and_load_run() {
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();
    let repo = TransferRunRepository::new(&db_path).unwrap();

    let entity = run("run-1");
    repo.save_run(&entity, &ledger()).unwrap();

    let loaded = repo.find_run("run-1").unwrap().unwrap();
    assert_eq!(loaded.item_count, 3);
    assert_eq!(loaded.failure_count, 1);
    assert_eq!(loaded.config_snapshot, entity.config_snapshot);

    // 台账顺序保持（不按 item 排序）
    let restored = repo.load_ledger("run-1").unwrap();
    assert_eq!(restored, ledger());

    assert!(repo.find_run("missing").unwrap().is_none());
    assert_eq!(repo.list_runs().unwrap().len(), 1);

    let conn = open_sqlite_connection(&db_path).unwrap();
    assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
}

#[test]
fn test_duplicate_run_id_rejected() {
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();
    let repo = TransferRunRepository::new(&db_path).unwrap();

    repo.save_run(&run("run-1"), &ledger()).unwrap();
    let err = repo.save_run(&run("run-1"), &TransferLedger::default()).unwrap_err();
    assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

    // 事务回滚: 原台账不受影响
    assert_eq!(repo.load_ledger("run-1").unwrap().whole.len(), 2);
}

#[test]
fn test_delete_run_cascades() {
    let (_temp_file, db_path) = test_helpers::create_test_db().unwrap();
    let conn = open_sqlite_connection(&db_path).unwrap();
    let repo = TransferRunRepository::from_connection(Arc::new(Mutex::new(conn))).unwrap();

    repo.save_run(&run("run-1"), &ledger()).unwrap();
    assert!(repo.delete_run("run-1").unwrap());
    assert!(!repo.delete_run("run-1").unwrap());

    assert!(repo.find_whole_transfers("run-1").unwrap().is_empty());
    assert!(repo.find_split_transfers("run-1").unwrap().is_empty());
}
