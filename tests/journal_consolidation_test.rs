// ==========================================
// 转移台账合并集成测试
// ==========================================
// 测试目标: 多次移动折叠为“起点 → 当前位置”的记录；整批记录被拆分；
//           数量恰好相等时原地推进；同源碎片合并；跨行合并与带日期输出
// ==========================================

mod test_helpers;

use schedule_reconcile::domain::{Lot, OriginClass, Quantity, Week};
use schedule_reconcile::engine::{JournalEntry, TransferJournal};
use test_helpers::{calendar, first_friday};

fn lot(id: &str, total: Quantity) -> Lot {
    Lot {
        id: id.to_string(),
        total_quantity: total,
        origin_class: OriginClass::External,
    }
}

fn splits(journal: &TransferJournal) -> Vec<(Week, Quantity, Week)> {
    journal
        .split_transfers()
        .map(|s| (s.from_week, s.moved_quantity, s.to_week))
        .collect()
}

#[test]
fn test_whole_record_split_on_partial_move() {
    let a = lot("A", 5);
    let mut journal = TransferJournal::new();

    journal.mark_transition("E1", &a, 0, 1, None).unwrap();
    assert_eq!(journal.whole_transfers().count(), 1);
    assert!(!journal.is_fragmented("E1", "A"));

    journal.mark_transition("E1", &a, 1, 2, Some(2)).unwrap();
    assert_eq!(journal.whole_transfers().count(), 0);
    assert_eq!(splits(&journal), vec![(0, 3, 1), (0, 2, 2)]);
    assert_eq!(journal.journaled_quantity("E1", "A"), 5);
    assert!(journal.is_fragmented("E1", "A"));
}

#[test]
fn test_exact_quantity_advances_record_in_place() {
    let a = lot("A", 5);
    let mut journal = TransferJournal::new();
    journal.mark_transition("E1", &a, 0, 1, None).unwrap();
    journal.mark_transition("E1", &a, 1, 2, Some(2)).unwrap();

    journal.mark_transition("E1", &a, 2, 3, Some(2)).unwrap();
    assert_eq!(splits(&journal), vec![(0, 3, 1), (0, 2, 3)]);
    assert_eq!(journal.len(), 2);
}

#[test]
fn test_same_origin_fragments_merge() {
    let b = lot("B", 6);
    let mut journal = TransferJournal::new();

    journal.mark_transition("E1", &b, 0, 1, Some(2)).unwrap();
    journal.mark_transition("E1", &b, 1, 2, Some(2)).unwrap();
    journal.mark_transition("E1", &b, 0, 2, Some(1)).unwrap();

    assert_eq!(splits(&journal), vec![(0, 3, 2)]);
    assert_eq!(journal.journaled_quantity("E1", "B"), 3);
}

#[test]
fn test_records_keep_item_boundaries() {
    let a = lot("A", 4);
    let mut first = TransferJournal::new();
    first.mark_transition("E1", &a, 1, 0, None).unwrap();

    let mut second = TransferJournal::new();
    second.mark_transition("E2", &a, 1, 0, Some(1)).unwrap();

    first.absorb(second);
    assert_eq!(first.len(), 2);
    assert_eq!(first.lot_entries("E1", "A").count(), 1);
    assert!(matches!(
        first.lot_entries("E2", "A").next(),
        Some(JournalEntry::Split(_))
    ));
    assert_eq!(first.journaled_quantity("E1", "A"), 4);
    assert_eq!(first.journaled_quantity("E2", "A"), 1);
}

#[test]
fn test_ledger_carries_calendar_dates() {
    let a = lot("A", 4);
    let mut journal = TransferJournal::new();
    journal.mark_transition("E1", &a, 2, 0, None).unwrap();

    let ledger = journal.to_ledger(&calendar(3)).unwrap();
    assert_eq!(ledger.whole.len(), 1);
    let record = &ledger.whole[0];
    assert_eq!(record.from_date, first_friday() + chrono::Duration::weeks(2));
    assert_eq!(record.to_date, first_friday());
    assert_eq!(record.origin_class, OriginClass::External);

    // 周索引超出日历
    assert!(journal.to_ledger(&calendar(2)).is_err());
}
