// ==========================================
// 单行平衡扫描集成测试
// ==========================================
// 测试目标: 数量守恒 / 终止时不平衡为 0 / 台账回放完整 /
//           重复记账幂等 / 批次排序确定
// ==========================================

mod test_helpers;

use proptest::prelude::*;
use schedule_reconcile::domain::{ItemRow, Lot, OriginClass, Quantity, Week};
use schedule_reconcile::engine::{ItemSweep, ReconcileError, TransferJournal};
use schedule_reconcile::logging;
use test_helpers::{lot_totals, replay, row};

// ==========================================
// 示例场景
// ==========================================

#[test]
fn test_pull_whole_lot_then_split() {
    logging::init_test();

    let row = row("E1", &[5, -5], &[(1, "A", 3), (1, "B", 4)]);
    let mut sweep = ItemSweep::new(&row).unwrap();
    sweep.normalize().unwrap();

    assert_eq!(sweep.imbalance(), &[0, 0]);
    let whole: Vec<_> = sweep.journal().whole_transfers().collect();
    assert_eq!(whole.len(), 1);
    assert_eq!((whole[0].lot_id.as_str(), whole[0].from_week, whole[0].to_week), ("A", 1, 0));

    let split: Vec<_> = sweep.journal().split_transfers().collect();
    assert_eq!(split.len(), 1);
    assert_eq!(split[0].lot_id, "B");
    assert_eq!(split[0].moved_quantity, 2);
    assert_eq!(split[0].lot_total_quantity, 4);

    let weeks = sweep.ledger().snapshot();
    assert_eq!(weeks[1].get("B"), Some(&2));
    assert_eq!(weeks[1].len(), 1);
}

#[test]
fn test_push_deficit_splits_lot_forward() {
    let row = row("E1", &[0, 0, -4, 4], &[(2, "C", 10)]);
    let mut sweep = ItemSweep::new(&row).unwrap();
    sweep.normalize().unwrap();

    assert!(sweep.is_balanced());
    let split: Vec<_> = sweep.journal().split_transfers().collect();
    assert_eq!(split.len(), 1);
    assert_eq!((split[0].from_week, split[0].moved_quantity, split[0].to_week), (2, 4, 3));

    let carried = sweep.carried_lots();
    assert_eq!(carried.len(), 1);
    assert_eq!(carried[0].lot_id, "C");
    assert_eq!(carried[0].origin_week, 2);
    assert!(carried[0].fragmented);
}

#[test]
fn test_infeasible_deficit_rejected_before_mutation() {
    let row = row("E1", &[-10, 10], &[(1, "A", 6)]);
    match ItemSweep::new(&row) {
        Err(ReconcileError::InfeasibleDeficit {
            item_id,
            week,
            deficit,
            ..
        }) => {
            assert_eq!(item_id, "E1");
            assert_eq!(week, 0);
            assert_eq!(deficit, 10);
        }
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_every_deficit_week_is_prechecked() {
    // 第 1 周缺口 3，该周仅有 2 件
    let short = row("E1", &[3, -3], &[(0, "A", 1), (1, "B", 2)]);
    assert!(matches!(
        ItemSweep::new(&short),
        Err(ReconcileError::InfeasibleDeficit { week: 1, deficit: 3, available: 2, .. })
    ));

    // 第 2 周缺口 3，该周没有批次
    let empty = row("E2", &[3, 0, -3], &[(1, "B", 2)]);
    assert!(matches!(
        ItemSweep::new(&empty),
        Err(ReconcileError::InfeasibleDeficit { week: 2, available: 0, .. })
    ));

    let enough = row("E3", &[3, -3], &[(1, "B", 5)]);
    let mut sweep = ItemSweep::new(&enough).unwrap();
    sweep.normalize().unwrap();
    assert!(sweep.is_balanced());
}

#[test]
fn test_chained_push_consolidates_into_one_record() {
    let row = row("E1", &[-5, 0, 0, 5], &[(0, "L", 5)]);
    let mut sweep = ItemSweep::new(&row).unwrap();
    sweep.normalize().unwrap();

    assert_eq!(sweep.moves(), 3);
    let whole: Vec<_> = sweep.journal().whole_transfers().collect();
    assert_eq!(whole.len(), 1);
    assert_eq!((whole[0].from_week, whole[0].to_week), (0, 3));
    assert_eq!(replay(&row, sweep.journal()), sweep.ledger().snapshot());
}

// ==========================================
// 排序确定性
// ==========================================

#[test]
fn test_move_left_takes_smaller_key_first() {
    // "X3*A-1" → (3,1), "X3*A-2" → (3,2)
    let row = row("E1", &[0, 0], &[(1, "X3*A-2", 4), (1, "X3*A-1", 4)]);
    let mut sweep = ItemSweep::new(&row).unwrap();
    sweep.move_left(1, 0, 3).unwrap();

    let weeks = sweep.ledger().snapshot();
    assert_eq!(weeks[0].get("X3*A-1"), Some(&3));
    assert_eq!(weeks[0].get("X3*A-2"), None);
}

#[test]
fn test_move_right_takes_larger_key_first() {
    let row = row("E1", &[0, 0], &[(0, "X3*A-1", 4), (0, "X3*A-2", 4)]);
    let mut sweep = ItemSweep::new(&row).unwrap();
    sweep.move_right(0, 1, 5).unwrap();

    let weeks = sweep.ledger().snapshot();
    assert_eq!(weeks[1].get("X3*A-2"), Some(&4));
    assert_eq!(weeks[1].get("X3*A-1"), Some(&1));
}

// ==========================================
// 幂等
// ==========================================

#[test]
fn test_repeated_transition_is_not_journaled_twice() {
    let lot = Lot {
        id: "A".to_string(),
        total_quantity: 6,
        origin_class: OriginClass::Internal,
    };
    let mut journal = TransferJournal::new();

    assert!(journal.mark_transition("E1", &lot, 1, 2, Some(2)).unwrap());
    assert!(!journal.mark_transition("E1", &lot, 1, 2, Some(2)).unwrap());
    assert_eq!(journal.journaled_quantity("E1", "A"), 2);

    // 空转移不记账
    assert!(!journal.mark_transition("E1", &lot, 3, 3, Some(1)).unwrap());
    assert!(!journal.mark_transition("E1", &lot, 1, 3, Some(0)).unwrap());

    // 超出批次总量的转移被拒绝且台账不变
    let err = journal.mark_transition("E1", &lot, 1, 0, None).unwrap_err();
    assert!(matches!(err, ReconcileError::JournalOverflow { .. }));
    assert!(err.is_internal());
    assert_eq!(journal.journaled_quantity("E1", "A"), 2);
}

// ==========================================
// 随机输入: 成功则满足全部性质，失败则必须是输入类错误
// ==========================================

const LOT_NAMES: [&str; 5] = ["A1", "B2", "Q3*A-1/19", "Q3*B-2/19", "Z"];

/// 2..=6 周；批次可分布在多个周；不平衡向量合计为 0
fn arb_row() -> impl Strategy<Value = ItemRow> {
    (2usize..=6)
        .prop_flat_map(|weeks| {
            (
                prop::collection::vec((0..weeks, 0..LOT_NAMES.len(), 1u32..=6), 1..10),
                prop::collection::vec(-4i64..=4, weeks - 1),
            )
        })
        .prop_map(|(placements, mut imbalance)| {
            imbalance.push(-imbalance.iter().sum::<i64>());
            let lots: Vec<(Week, &str, Quantity)> = placements
                .into_iter()
                .map(|(week, name, quantity)| (week, LOT_NAMES[name], quantity))
                .collect();
            row("E1", &imbalance, &lots)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn prop_generated_rows_hold_properties(row in arb_row()) {
        let before = lot_totals(&test_helpers::initial_weeks(&row));

        match ItemSweep::new(&row).and_then(|mut sweep| sweep.normalize().map(|_| sweep)) {
            Ok(sweep) => {
                prop_assert!(sweep.is_balanced(), "{:?}", sweep.imbalance());
                let after = sweep.ledger().snapshot();
                prop_assert_eq!(lot_totals(&after), before.clone());
                prop_assert_eq!(replay(&row, sweep.journal()), after);
                for (lot_id, total) in &before {
                    prop_assert!(
                        u64::from(sweep.journal().journaled_quantity(&row.item_id, lot_id)) <= *total
                    );
                }
            }
            Err(err) => prop_assert!(!err.is_internal(), "{}", err),
        }
    }
}
