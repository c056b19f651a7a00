// ==========================================
// 周排产订单平衡系统 - 周台账（单产品状态）
// ==========================================
// 结构: 批次存于 arena（按批次排序键排好序），每周一个 BTreeMap<LotIx, 剩余数量>
// 由于 LotIx 即排序名次，周内迭代顺序天然就是批次排序键顺序
// 不变量:
// - 任一批次在所有周的剩余量之和 == 其总量（只搬移，不增减）
// - 周内出现的批次剩余量恒 > 0（归零即删除）
// 所有变更只经由 move_lot
// ==========================================

use crate::domain::lot::Lot;
use crate::domain::schedule::ItemRow;
use crate::domain::types::{Quantity, Week};
use crate::engine::error::{ReconcileError, ReconcileResult};
use crate::engine::lot_key::compare_lots;
use std::collections::{BTreeMap, HashMap};

/// 批次在 arena 中的下标（同时是周内排序名次）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LotIx(usize);

impl LotIx {
    pub fn index(self) -> usize {
        self.0
    }
}

// ==========================================
// WeekLedger - 周台账
// ==========================================
#[derive(Debug, Clone)]
pub struct WeekLedger {
    item_id: String,
    lots: Vec<Lot>,
    by_id: HashMap<String, LotIx>,
    weeks: Vec<BTreeMap<LotIx, Quantity>>,
}

impl WeekLedger {
    /// 由排产行构建周台账
    ///
    /// 校验:
    /// - 周内出现的批次必须有元数据 (UnknownLot)
    /// - 批次各周数量之和必须等于声明总量 (LotQuantityMismatch)
    ///
    /// 数量为 0 的条目直接丢弃
    pub fn from_row(row: &ItemRow) -> ReconcileResult<Self> {
        let item_id = row.item_id.clone();

        for week_map in &row.week_lots {
            if let Some(lot_id) = week_map.keys().find(|id| !row.lots.contains_key(*id)) {
                return Err(ReconcileError::UnknownLot {
                    item_id,
                    lot_id: lot_id.clone(),
                });
            }
        }

        let mut ids: Vec<&String> = row.lots.keys().collect();
        ids.sort_by(|a, b| compare_lots(a, b));

        let mut lots = Vec::with_capacity(ids.len());
        let mut by_id = HashMap::with_capacity(ids.len());
        for (rank, id) in ids.into_iter().enumerate() {
            lots.push(Lot::new(id.clone(), row.lots[id]));
            by_id.insert(id.clone(), LotIx(rank));
        }

        let mut weeks = vec![BTreeMap::new(); row.week_lots.len()];
        let mut placed: Vec<u64> = vec![0; lots.len()];
        for (week, week_map) in row.week_lots.iter().enumerate() {
            for (lot_id, &quantity) in week_map {
                if quantity == 0 {
                    continue;
                }
                let ix = by_id[lot_id];
                weeks[week].insert(ix, quantity);
                placed[ix.0] += u64::from(quantity);
            }
        }

        for (lot, &placed_total) in lots.iter().zip(&placed) {
            if placed_total != u64::from(lot.total_quantity) {
                return Err(ReconcileError::LotQuantityMismatch {
                    item_id,
                    lot_id: lot.id.clone(),
                    declared: lot.total_quantity,
                    placed: Quantity::try_from(placed_total).unwrap_or(Quantity::MAX),
                });
            }
        }

        Ok(Self {
            item_id,
            lots,
            by_id,
            weeks,
        })
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    /// 周数
    pub fn weeks(&self) -> usize {
        self.weeks.len()
    }

    pub fn lot(&self, ix: LotIx) -> &Lot {
        &self.lots[ix.0]
    }

    pub fn lot_ix(&self, lot_id: &str) -> Option<LotIx> {
        self.by_id.get(lot_id).copied()
    }

    /// 某周某批次的剩余量（不存在为 0）
    pub fn quantity(&self, week: Week, ix: LotIx) -> Quantity {
        self.weeks
            .get(week)
            .and_then(|m| m.get(&ix))
            .copied()
            .unwrap_or(0)
    }

    /// 某周全部批次剩余量合计
    pub fn week_total(&self, week: Week) -> Quantity {
        self.weeks
            .get(week)
            .map(|m| m.values().fold(0, |acc: Quantity, q| acc.saturating_add(*q)))
            .unwrap_or(0)
    }

    pub fn is_week_empty(&self, week: Week) -> bool {
        self.weeks.get(week).map_or(true, |m| m.is_empty())
    }

    /// 某周批次快照，按批次排序键升序
    pub fn lots_ascending(&self, week: Week) -> Vec<(LotIx, Quantity)> {
        self.weeks
            .get(week)
            .map(|m| m.iter().map(|(ix, q)| (*ix, *q)).collect())
            .unwrap_or_default()
    }

    /// 某周批次快照，按批次排序键降序（最晚到期的批次在前）
    pub fn lots_descending(&self, week: Week) -> Vec<(LotIx, Quantity)> {
        let mut lots = self.lots_ascending(week);
        lots.reverse();
        lots
    }

    /// 批次在所有周的剩余量之和
    pub fn placed_total(&self, ix: LotIx) -> u64 {
        self.weeks
            .iter()
            .filter_map(|m| m.get(&ix))
            .map(|q| u64::from(*q))
            .sum()
    }

    /// 守恒检查: 每个批次各周合计 == 总量
    pub fn is_conserved(&self) -> bool {
        self.lots
            .iter()
            .enumerate()
            .all(|(i, lot)| self.placed_total(LotIx(i)) == u64::from(lot.total_quantity))
    }

    /// 移动原语
    ///
    /// 把批次 `ix` 从 `from` 周移到 `to` 周:
    /// - quantity 为 None 或等于剩余量时整体移动，并从 `from` 删除该批次
    /// - 否则只移动 quantity，`from` 保留余量
    /// - `to` 周已有该批次则累加
    ///
    /// 本原语不关心方向和台账。返回实际移动数量
    pub fn move_lot(
        &mut self,
        from: Week,
        to: Week,
        ix: LotIx,
        quantity: Option<Quantity>,
    ) -> ReconcileResult<Quantity> {
        self.check_week(from)?;
        self.check_week(to)?;

        let available = self.quantity(from, ix);
        let requested = quantity.unwrap_or(available);
        if requested == 0 {
            return Ok(0);
        }
        if available < requested {
            return Err(ReconcileError::InsufficientQuantity {
                item_id: self.item_id.clone(),
                week: from,
                lot_id: Some(self.lots[ix.0].id.clone()),
                requested,
                available,
            });
        }
        if from == to {
            return Ok(requested);
        }

        if requested == available {
            self.weeks[from].remove(&ix);
        } else if let Some(slot) = self.weeks[from].get_mut(&ix) {
            *slot -= requested;
        }
        *self.weeks[to].entry(ix).or_insert(0) += requested;

        Ok(requested)
    }

    /// 以批次名表示的各周快照
    pub fn snapshot(&self) -> Vec<BTreeMap<String, Quantity>> {
        self.weeks
            .iter()
            .map(|m| {
                m.iter()
                    .map(|(ix, q)| (self.lots[ix.0].id.clone(), *q))
                    .collect()
            })
            .collect()
    }

    fn check_week(&self, week: Week) -> ReconcileResult<()> {
        if week >= self.weeks.len() {
            return Err(ReconcileError::WeekOutOfRange {
                week,
                weeks: self.weeks.len(),
            });
        }
        Ok(())
    }
}
