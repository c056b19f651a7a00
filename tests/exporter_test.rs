// ==========================================
// 导出层测试
// ==========================================
// 测试目标: 整批文件 / 按迭代拆分的文件 / resolved 文件的内容与命名
// ==========================================

mod test_helpers;

use chrono::NaiveDate;
use schedule_reconcile::domain::{OriginClass, SplitTransferRecord, TransferLedger, WholeTransferRecord};
use schedule_reconcile::exporter::CsvLedgerExporter;
use std::fs;
use tempfile::tempdir;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 3, day).unwrap()
}

fn split(lot: &str, total: u32, from: u32, moved: u32, to: u32) -> SplitTransferRecord {
    SplitTransferRecord {
        item_id: "E1".to_string(),
        lot_id: lot.to_string(),
        lot_total_quantity: total,
        from_date: date(from),
        moved_quantity: moved,
        to_date: date(to),
    }
}

fn ledger() -> TransferLedger {
    TransferLedger {
        whole: vec![WholeTransferRecord {
            item_id: "E1".to_string(),
            total_quantity: 3,
            origin_class: OriginClass::Internal,
            lot_id: "A1".to_string(),
            from_date: date(8),
            to_date: date(1),
        }],
        split: vec![
            split("B2", 10, 15, 2, 1),
            split("B2", 10, 15, 3, 8),
            split("B2", 10, 15, 5, 22),
            split("C3", 4, 8, 1, 1),
        ],
    }
}

#[test]
fn test_export_writes_iteration_files() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    let exporter = CsvLedgerExporter::new(&out, "transfers", "split_transfers");

    let summary = exporter.export(&ledger()).unwrap();
    assert_eq!(summary.whole_rows, 1);
    assert_eq!(summary.split_rows, 4);
    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.resolved_rows, 1);
    assert_eq!(summary.files.len(), 4);

    let whole = fs::read_to_string(out.join("transfers.csv")).unwrap();
    assert_eq!(
        whole,
        "item_id,total_quantity,origin_class,lot_id,from_date,to_date\nE1,3,2,A1,08.03.2019,01.03.2019\n"
    );

    let iter0 = fs::read_to_string(out.join("split_transfers(iter-0).csv")).unwrap();
    assert_eq!(iter0.lines().count(), 3);
    assert!(iter0.contains("E1,B2,10,15.03.2019,2,01.03.2019"));
    assert!(iter0.contains("E1,C3,4,08.03.2019,1,01.03.2019"));

    // 第二个碎片: 总量扣减前一个碎片
    let iter1 = fs::read_to_string(out.join("split_transfers(iter-1).csv")).unwrap();
    assert!(iter1.contains("E1,B2,8,15.03.2019,3,08.03.2019"));

    // 第三个碎片恰好等于剩余总量
    let resolved = fs::read_to_string(out.join("split_transfers(resolved).csv")).unwrap();
    assert!(resolved.contains("E1,B2,5,15.03.2019,5,22.03.2019"));
}

#[test]
fn test_empty_ledger_writes_header_only() {
    let dir = tempdir().unwrap();
    let exporter = CsvLedgerExporter::new(dir.path(), "whole", "split");

    let summary = exporter.export(&TransferLedger::default()).unwrap();
    assert_eq!(summary.files, vec![dir.path().join("whole.csv")]);
    assert_eq!(summary.iterations, 0);
    assert!(!dir.path().join("split(resolved).csv").exists());
}

#[test]
fn test_rerun_removes_split_files_of_previous_run() {
    let dir = tempdir().unwrap();
    let exporter = CsvLedgerExporter::new(dir.path(), "whole", "split");
    let previous = TransferLedger {
        whole: Vec::new(),
        split: vec![split("A", 10, 8, 4, 1), split("A", 10, 8, 6, 15)],
    };
    exporter.export(&previous).unwrap();
    assert!(dir.path().join("split(iter-0).csv").exists());
    assert!(dir.path().join("split(resolved).csv").exists());

    // 其他文件不受影响
    fs::write(dir.path().join("notes.csv"), "x\n").unwrap();
    fs::write(dir.path().join("other(iter-0).csv"), "x\n").unwrap();

    let summary = exporter.export(&TransferLedger::default()).unwrap();
    assert_eq!(summary.files, vec![dir.path().join("whole.csv")]);

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["notes.csv", "other(iter-0).csv", "whole.csv"]);
}
