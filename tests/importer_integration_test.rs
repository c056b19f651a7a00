// ==========================================
// 导入层集成测试
// ==========================================
// 测试目标: 三张 CSV 源表 → 周日历 + 排产行（含标题行偏移、日期格式、来源标签）
// ==========================================

mod test_helpers;

use schedule_reconcile::config::{ColumnNames, TableSource};
use schedule_reconcile::domain::OriginClass;
use schedule_reconcile::importer::{ImportError, ScheduleImporter, UniversalFileParser};
use tempfile::tempdir;
use test_helpers::{first_friday, write_csv};

fn sources(dir: &std::path::Path, orders: &[&str]) -> (TableSource, TableSource, TableSource) {
    let schedule = write_csv(
        dir,
        "schedule.csv",
        &[
            "Weekly schedule",
            "ID_125,Gr10,Pl10,Gr11,Pl11,Gr12,Pl12",
            "E1,5,,,5,,",
            "E2,,2,,,2,",
        ],
    );
    let calendar = write_csv(
        dir,
        "dates.csv",
        &["т,тт", "10,01.03.2019", "11,2019-03-08 00:00:00", "12,43539"],
    );
    let orders = write_csv(dir, "orders.csv", orders);
    (
        TableSource::new(schedule, None, 1),
        TableSource::new(calendar, None, 0),
        TableSource::new(orders, None, 2),
    )
}

#[test]
fn test_import_from_csv_sources() {
    let dir = tempdir().unwrap();
    let (schedule, calendar, orders) = sources(
        dir.path(),
        &[
            "Orders",
            "exported 2019-03-01",
            "Id_125,Заказ,Дата кон.,План,вн/внутр",
            "E1,ZK-1*A-3/2019,08.03.2019,3,внешний",
            "E1,ZK-1*A-3/2019,08.03.2019,2,внешний",
            "E2,ZK-7*B-1/2019,01.03.2019,2,внутренний",
            "E9,ZK-9*C-1/2019,01.03.2019,1,1",
        ],
    );

    let importer = ScheduleImporter::new(ColumnNames::default(), true);
    let imported = importer
        .import(&UniversalFileParser, &schedule, &calendar, &orders)
        .unwrap();

    assert_eq!(imported.week_numbers, vec![10, 11, 12]);
    assert_eq!(imported.calendar.date(0), Some(first_friday()));
    assert_eq!(imported.skipped_orders, 1);
    assert_eq!(imported.rows.len(), 2);

    let e1 = &imported.rows[0];
    assert_eq!(e1.item_id, "E1");
    assert_eq!(e1.imbalance, vec![5, -5, 0]);
    assert_eq!(e1.week_lots[1].get("ZK-1*A-3/2019"), Some(&5));
    assert_eq!(e1.lots["ZK-1*A-3/2019"].total_quantity, 5);

    let e2 = &imported.rows[1];
    assert_eq!(e2.imbalance, vec![-2, 0, 2]);
    assert_eq!(e2.lots["ZK-7*B-1/2019"].origin_class, OriginClass::Internal);
}

#[test]
fn test_invalid_origin_label_names_row() {
    let dir = tempdir().unwrap();
    let (schedule, calendar, orders) = sources(
        dir.path(),
        &[
            "Orders",
            "Id_125,Заказ,Дата кон.,План,вн/внутр",
            "E1,A,08.03.2019,5,partner",
        ],
    );
    let orders = TableSource::new(orders.path, None, 1);

    let err = ScheduleImporter::new(ColumnNames::default(), true)
        .import(&UniversalFileParser, &schedule, &calendar, &orders)
        .unwrap_err();
    match err {
        ImportError::InvalidOriginClass { row, value } => {
            assert_eq!(row, 3);
            assert_eq!(value, "partner");
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_missing_order_column() {
    let dir = tempdir().unwrap();
    let (schedule, calendar, orders) = sources(
        dir.path(),
        &["Orders", "Id_125,Заказ,План", "E1,A,5"],
    );
    let orders = TableSource::new(orders.path, None, 1);

    let err = ScheduleImporter::new(ColumnNames::default(), true)
        .import(&UniversalFileParser, &schedule, &calendar, &orders)
        .unwrap_err();
    assert!(matches!(err, ImportError::MissingColumn { column, .. } if column == "Дата кон."));
}

#[test]
fn test_unsupported_extension() {
    let dir = tempdir().unwrap();
    let path = write_csv(dir.path(), "schedule.txt", &["ID_125"]);
    let source = TableSource::new(path, None, 0);

    let err = ScheduleImporter::new(ColumnNames::default(), true)
        .import(&UniversalFileParser, &source, &source, &source)
        .unwrap_err();
    assert!(matches!(err, ImportError::UnsupportedFormat(ext) if ext == "txt"));
}
