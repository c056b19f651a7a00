// ==========================================
// 周排产订单平衡系统 - 整表平衡驱动
// ==========================================
// 职责:
// - 按行顺序对每个产品执行一次 ItemSweep
// - 单行失败只中止该行: 行内台账在成功后才并入整表台账
// - 可选回放校验: 行内台账回放到起始状态，必须得到扫描后的周台账
// ==========================================

use crate::domain::schedule::{ItemRow, WeekCalendar};
use crate::domain::transfer::{CarriedLot, TransferLedger};
use crate::domain::types::Quantity;
use crate::engine::error::{ReconcileError, ReconcileResult};
use crate::engine::journal::TransferJournal;
use crate::engine::sweep::ItemSweep;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::{error, info, instrument, warn};

/// 驱动选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerOptions {
    /// 任一行失败即中止整表
    pub fail_fast: bool,
    /// 每行结束后回放台账并与最终周台账比对
    pub verify_journal: bool,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            fail_fast: false,
            verify_journal: true,
        }
    }
}

/// 单行处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub item_id: String,
    pub final_weeks: Vec<BTreeMap<String, Quantity>>,
    pub moves: usize,
    pub records: usize,
    pub carried_lots: Vec<CarriedLot>,
}

/// 失败行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    pub row_index: usize,
    pub item_id: String,
    pub error: ReconcileError,
}

/// 整表处理报告
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    pub outcomes: Vec<ItemOutcome>,
    pub failures: Vec<RowFailure>,
    pub ledger: TransferLedger,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ==========================================
// Reconciler
// ==========================================
pub struct Reconciler {
    calendar: WeekCalendar,
    options: ReconcilerOptions,
    journal: TransferJournal,
    seen_items: HashSet<String>,
}

impl Reconciler {
    pub fn new(calendar: WeekCalendar, options: ReconcilerOptions) -> Self {
        Self {
            calendar,
            options,
            journal: TransferJournal::new(),
            seen_items: HashSet::new(),
        }
    }

    pub fn calendar(&self) -> &WeekCalendar {
        &self.calendar
    }

    /// 整表台账（已成功的行）
    pub fn journal(&self) -> &TransferJournal {
        &self.journal
    }

    /// 处理单行
    #[instrument(skip(self, row), fields(item_id = %row.item_id))]
    pub fn reconcile_row(&mut self, row: &ItemRow) -> ReconcileResult<ItemOutcome> {
        if !self.seen_items.insert(row.item_id.clone()) {
            return Err(ReconcileError::DuplicateItem {
                item_id: row.item_id.clone(),
            });
        }

        if row.imbalance.len() != self.calendar.len() || row.week_lots.len() != self.calendar.len() {
            return Err(ReconcileError::ShapeMismatch {
                item_id: row.item_id.clone(),
                calendar_weeks: self.calendar.len(),
                imbalance_weeks: row.imbalance.len(),
                lot_weeks: row.week_lots.len(),
            });
        }

        let mut sweep = ItemSweep::new(row)?;
        sweep.normalize()?;

        let final_weeks = sweep.ledger().snapshot();
        if self.options.verify_journal {
            verify_replay(row, sweep.journal(), &final_weeks)?;
        }

        let outcome = ItemOutcome {
            item_id: row.item_id.clone(),
            final_weeks,
            moves: sweep.moves(),
            records: sweep.journal().len(),
            carried_lots: sweep.carried_lots(),
        };
        self.journal.absorb(sweep.into_journal());
        Ok(outcome)
    }

    /// 依次处理全部行
    ///
    /// fail_fast 时首个失败直接返回错误；否则收集失败行继续处理
    pub fn reconcile_all(mut self, rows: &[ItemRow]) -> ReconcileResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for (row_index, row) in rows.iter().enumerate() {
            match self.reconcile_row(row) {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(err) => {
                    if err.is_internal() {
                        error!(row_index, item_id = %row.item_id, error = %err, "内部一致性故障");
                    } else {
                        warn!(row_index, item_id = %row.item_id, error = %err, "排产行处理失败");
                    }
                    if self.options.fail_fast {
                        return Err(err);
                    }
                    report.failures.push(RowFailure {
                        row_index,
                        item_id: row.item_id.clone(),
                        error: err,
                    });
                }
            }
        }

        report.ledger = self.journal.to_ledger(&self.calendar)?;
        info!(
            rows = rows.len(),
            succeeded = report.outcomes.len(),
            failed = report.failures.len(),
            whole = report.ledger.whole.len(),
            split = report.ledger.split.len(),
            "整表平衡完成"
        );
        Ok(report)
    }
}

/// 回放校验: 起始状态 + 台账 == 最终状态
fn verify_replay(
    row: &ItemRow,
    journal: &TransferJournal,
    final_weeks: &[BTreeMap<String, Quantity>],
) -> ReconcileResult<()> {
    let mut replayed: Vec<BTreeMap<String, Quantity>> = row
        .week_lots
        .iter()
        .map(|m| m.iter().filter(|(_, q)| **q > 0).map(|(k, q)| (k.clone(), *q)).collect())
        .collect();
    journal.replay_onto(&row.item_id, &mut replayed)?;

    if let Some(week) = (0..final_weeks.len()).find(|w| replayed[*w] != final_weeks[*w]) {
        return Err(ReconcileError::JournalReplayMismatch {
            item_id: row.item_id.clone(),
            week,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::OriginClass;
    use chrono::NaiveDate;

    fn calendar(weeks: usize) -> WeekCalendar {
        let start = NaiveDate::from_ymd_opt(2019, 3, 1).unwrap();
        WeekCalendar::new(
            (0..weeks)
                .map(|w| start + chrono::Duration::weeks(w as i64))
                .collect(),
        )
    }

    fn row(item_id: &str, imbalance: &[i64], lots: &[(usize, &str, Quantity)]) -> ItemRow {
        let mut row = ItemRow::new(item_id, imbalance.len());
        for (week, value) in imbalance.iter().enumerate() {
            row.add_imbalance(week, *value).unwrap();
        }
        for (week, id, quantity) in lots {
            row.place_lot(*week, id, *quantity, OriginClass::Internal).unwrap();
        }
        row
    }

    #[test]
    fn test_failed_row_leaves_no_records() {
        let rows = vec![
            row("E1", &[2, -2], &[(1, "A", 2)]),
            row("E2", &[-5, 5], &[(0, "B", 3), (1, "C", 2)]),
            row("E3", &[0, 0], &[]),
        ];
        let report = Reconciler::new(calendar(2), ReconcilerOptions::default())
            .reconcile_all(&rows)
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].item_id, "E2");
        assert_eq!(report.failures[0].row_index, 1);
        assert!(report.ledger.whole.iter().all(|r| r.item_id == "E1"));
        assert_eq!(report.ledger.whole.len(), 1);
    }

    #[test]
    fn test_fail_fast_returns_first_error() {
        let rows = vec![row("E1", &[1, 0], &[(1, "A", 2)])];
        let options = ReconcilerOptions {
            fail_fast: true,
            verify_journal: true,
        };
        let err = Reconciler::new(calendar(2), options)
            .reconcile_all(&rows)
            .unwrap_err();
        assert!(matches!(err, ReconcileError::ImbalanceNotConserved { .. }));
    }

    #[test]
    fn test_duplicate_item_rejected() {
        let mut reconciler = Reconciler::new(calendar(2), ReconcilerOptions::default());
        reconciler.reconcile_row(&row("E1", &[0, 0], &[])).unwrap();
        let err = reconciler.reconcile_row(&row("E1", &[0, 0], &[])).unwrap_err();
        assert_eq!(err, ReconcileError::DuplicateItem { item_id: "E1".to_string() });
    }

    #[test]
    fn test_shape_must_match_calendar() {
        let mut reconciler = Reconciler::new(calendar(3), ReconcilerOptions::default());
        let err = reconciler.reconcile_row(&row("E1", &[0, 0], &[])).unwrap_err();
        assert!(matches!(err, ReconcileError::ShapeMismatch { calendar_weeks: 3, .. }));
    }
}
