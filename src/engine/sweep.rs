// ==========================================
// 周排产订单平衡系统 - 单行平衡扫描 (normalize)
// ==========================================
// 输入: 一行排产（不平衡向量 + 周台账）
// 规则: 周 0..N-1 严格自左向右处理一次，不回溯
// - imbalance[i] > 0: 从 i+1, i+2, ... 依次拉入批次 (move_left)，直到 imbalance[i] == 0
// - imbalance[i] < 0: 把 -imbalance[i] 件从 i 推到 i+1 (move_right)，缺口随之转移到 i+1
// 终止: 所有 imbalance == 0
// 每次实际移动都写入本行台账；台账由 Reconciler 在本行成功后并入整表台账
// ==========================================

use crate::domain::schedule::ItemRow;
use crate::domain::transfer::CarriedLot;
use crate::domain::types::{Imbalance, Quantity, Week};
use crate::engine::error::{MoveDirection, ReconcileError, ReconcileResult};
use crate::engine::journal::TransferJournal;
use crate::engine::week_ledger::{LotIx, WeekLedger};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// 未来移动标记: 批次第一次被推向更晚的周时记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FutureMoveMarker {
    pub origin_week: Week,
    pub split: bool, // 推出过程中是否被拆分过
}

// ==========================================
// ItemSweep - 单产品平衡扫描
// ==========================================
#[derive(Debug, Clone)]
pub struct ItemSweep {
    ledger: WeekLedger,
    imbalance: Vec<Imbalance>,
    markers: BTreeMap<LotIx, FutureMoveMarker>,
    journal: TransferJournal,
    moves: usize,
}

impl ItemSweep {
    /// 构建扫描状态并做变更前校验
    ///
    /// 校验顺序:
    /// 1) 不平衡向量与批次周数一致
    /// 2) 不平衡量合计为 0 (ImbalanceNotConserved)
    /// 3) 批次元数据完整、数量守恒（见 WeekLedger::from_row）
    /// 4) 任一周缺口不超过该周现有批次数量 (InfeasibleDeficit)
    pub fn new(row: &ItemRow) -> ReconcileResult<Self> {
        if row.imbalance.len() != row.week_lots.len() {
            return Err(ReconcileError::RowShapeMismatch {
                item_id: row.item_id.clone(),
                imbalance_weeks: row.imbalance.len(),
                lot_weeks: row.week_lots.len(),
            });
        }

        let sum = row.imbalance_sum();
        if sum != 0 {
            return Err(ReconcileError::ImbalanceNotConserved {
                item_id: row.item_id.clone(),
                sum,
                imbalance: row.imbalance.clone(),
            });
        }

        let ledger = WeekLedger::from_row(row)?;

        for (week, &value) in row.imbalance.iter().enumerate() {
            if value >= 0 {
                continue;
            }
            let deficit = to_quantity(&row.item_id, -value)?;
            let available = ledger.week_total(week);
            if deficit > available {
                return Err(ReconcileError::InfeasibleDeficit {
                    item_id: row.item_id.clone(),
                    week,
                    deficit,
                    available,
                });
            }
        }

        Ok(Self {
            ledger,
            imbalance: row.imbalance.clone(),
            markers: BTreeMap::new(),
            journal: TransferJournal::new(),
            moves: 0,
        })
    }

    pub fn item_id(&self) -> &str {
        self.ledger.item_id()
    }

    pub fn imbalance(&self) -> &[Imbalance] {
        &self.imbalance
    }

    pub fn ledger(&self) -> &WeekLedger {
        &self.ledger
    }

    pub fn journal(&self) -> &TransferJournal {
        &self.journal
    }

    /// 实际移动次数（每个批次每次移动计一次）
    pub fn moves(&self) -> usize {
        self.moves
    }

    pub fn marker(&self, lot_id: &str) -> Option<FutureMoveMarker> {
        let ix = self.ledger.lot_ix(lot_id)?;
        self.markers.get(&ix).copied()
    }

    /// 被推迟到到期周之后的批次
    pub fn carried_lots(&self) -> Vec<CarriedLot> {
        self.markers
            .iter()
            .map(|(ix, marker)| CarriedLot {
                lot_id: self.ledger.lot(*ix).id.clone(),
                origin_week: marker.origin_week,
                fragmented: marker.split,
            })
            .collect()
    }

    pub fn is_balanced(&self) -> bool {
        self.imbalance.iter().all(|v| *v == 0)
    }

    /// 拆出台账（扫描结束后交给 Reconciler）
    pub fn into_journal(self) -> TransferJournal {
        self.journal
    }

    // ==========================================
    // 主流程
    // ==========================================

    /// 逐周消除不平衡
    #[instrument(skip(self), fields(item_id = %self.ledger.item_id(), weeks = self.imbalance.len()))]
    pub fn normalize(&mut self) -> ReconcileResult<()> {
        for week in 0..self.imbalance.len() {
            let value = self.imbalance[week];
            if value > 0 {
                self.pull_surplus(week)?;
            } else if value < 0 {
                self.push_deficit(week)?;
            }
        }
        debug!(moves = self.moves, records = self.journal.len(), "本行平衡完成");
        Ok(())
    }

    /// 超前周: 从右侧最近的周依次拉入
    fn pull_surplus(&mut self, week: Week) -> ReconcileResult<()> {
        let weeks = self.imbalance.len();
        let mut source = week + 1;
        while self.imbalance[week] != 0 {
            let need = to_quantity(self.item_id(), self.imbalance[week])?;
            if source >= weeks {
                return Err(ReconcileError::SupplyExhausted {
                    item_id: self.item_id().to_string(),
                    week,
                    shortfall: need,
                });
            }

            let week_total = self.ledger.week_total(source);
            if week_total == 0 {
                source += 1;
                continue;
            }

            if week_total >= need {
                self.move_left(source, week, need)?;
                self.imbalance[source] += Imbalance::from(need);
                self.imbalance[week] = 0;
            } else {
                self.move_left(source, week, week_total)?;
                self.imbalance[source] += Imbalance::from(week_total);
                self.imbalance[week] -= Imbalance::from(week_total);
                source += 1;
            }
        }
        Ok(())
    }

    /// 落后周: 整个缺口推到下一周
    fn push_deficit(&mut self, week: Week) -> ReconcileResult<()> {
        let deficit = to_quantity(self.item_id(), -self.imbalance[week])?;
        let available = self.ledger.week_total(week);
        let target = week + 1;
        if target >= self.imbalance.len() || deficit > available {
            return Err(ReconcileError::InfeasibleDeficit {
                item_id: self.item_id().to_string(),
                week,
                deficit,
                available: if target >= self.imbalance.len() { 0 } else { available },
            });
        }

        self.move_right(week, target, deficit)?;
        self.imbalance[target] += self.imbalance[week];
        self.imbalance[week] = 0;
        Ok(())
    }

    // ==========================================
    // 移动原语（带记账）
    // ==========================================

    /// 把 `delta` 件从 `from` 拉到更早的 `to`
    ///
    /// 批次按排序键升序消费；整批消费的批次记整批转移，最后一个只消费部分的批次记拆分转移
    pub fn move_left(&mut self, from: Week, to: Week, delta: Quantity) -> ReconcileResult<Quantity> {
        if to >= from {
            return Err(self.invalid_order(MoveDirection::Left, from, to));
        }
        self.ensure_available(from, delta)?;

        let mut remaining = delta;
        for (ix, quantity) in self.ledger.lots_ascending(from) {
            if remaining == 0 {
                break;
            }
            let moved = remaining.min(quantity);
            self.ledger.move_lot(from, to, ix, Some(moved))?;
            self.journal_move(ix, from, to, moved)?;
            remaining -= moved;
            debug!(lot_id = %self.ledger.lot(ix).id, from, to, moved, "批次前移");
        }
        Ok(delta)
    }

    /// 把 `delta` 件从 `from` 推到更晚的 `to`
    ///
    /// 批次按排序键降序处理（最晚到期的批次最先推出）
    pub fn move_right(&mut self, from: Week, to: Week, delta: Quantity) -> ReconcileResult<Quantity> {
        if to <= from {
            return Err(self.invalid_order(MoveDirection::Right, from, to));
        }
        self.ensure_available(from, delta)?;

        let mut remaining = delta;
        for (ix, quantity) in self.ledger.lots_descending(from) {
            if remaining == 0 {
                break;
            }
            let origin_week = self
                .markers
                .entry(ix)
                .or_insert(FutureMoveMarker {
                    origin_week: from,
                    split: false,
                })
                .origin_week;

            let moved = remaining.min(quantity);
            self.ledger.move_lot(from, to, ix, Some(moved))?;
            let split = self.journal_move(ix, from, to, moved)?;
            if split {
                if let Some(marker) = self.markers.get_mut(&ix) {
                    marker.split = true;
                }
            }
            remaining -= moved;
            debug!(lot_id = %self.ledger.lot(ix).id, from, to, moved, origin_week, "批次后推");
        }
        Ok(delta)
    }

    /// 记账一次实际移动
    ///
    /// 移动量等于批次总量且批次从未拆分 → 整批转移；否则按拆分转移记账。
    /// 返回是否按拆分记账
    fn journal_move(&mut self, ix: LotIx, from: Week, to: Week, moved: Quantity) -> ReconcileResult<bool> {
        let lot = self.ledger.lot(ix);
        let item_id = self.ledger.item_id();
        let whole = moved == lot.total_quantity && !self.journal.is_fragmented(item_id, &lot.id);
        let quantity = if whole { None } else { Some(moved) };
        self.journal.mark_transition(item_id, lot, from, to, quantity)?;
        self.moves += 1;
        Ok(!whole)
    }

    fn ensure_available(&self, week: Week, delta: Quantity) -> ReconcileResult<()> {
        let available = self.ledger.week_total(week);
        if available < delta {
            return Err(ReconcileError::InsufficientQuantity {
                item_id: self.item_id().to_string(),
                week,
                lot_id: None,
                requested: delta,
                available,
            });
        }
        Ok(())
    }

    fn invalid_order(&self, direction: MoveDirection, from: Week, to: Week) -> ReconcileError {
        ReconcileError::InvalidMoveOrder {
            item_id: self.item_id().to_string(),
            direction,
            from,
            to,
        }
    }
}

fn to_quantity(item_id: &str, value: Imbalance) -> ReconcileResult<Quantity> {
    Quantity::try_from(value).map_err(|_| ReconcileError::QuantityOverflow {
        item_id: item_id.to_string(),
        value,
    })
}
