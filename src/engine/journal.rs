// ==========================================
// 周排产订单平衡系统 - 转移台账（整批 + 拆分）
// ==========================================
// 每条记录表示: 原在 from_week 的 N 件批次，当前位于 to_week
// 索引: (item_id, lot_id, 当前所在周) → 记录列表，O(1) 查找/更新
// 合并规则:
// - 整批移动: 找到当前位于 from 的整批记录则原地更新 to_week，否则新建
// - 拆分移动: 整批记录首次被拆分时，余量改记为拆分记录（保留原始周），再为移出部分新建拆分记录；
//   否则消费位于 from 的拆分记录（数量恰好相等时原地推进，否则扣减并为移出部分建新记录，
//   沿用原始周）；仍不足的部分视为该周原生数量，新建拆分记录
// - 同一批次、同一原始周、同一当前周的拆分碎片合并为一条
// 不变量:
// - 任一记录数量 > 0
// - 批次全部记录数量之和 <= 总量；批次曾整批记账后恒等于总量
// - 同一 (item, lot, from, to, quantity) 转移重复提交不产生重复记录
// ==========================================

use crate::domain::lot::Lot;
use crate::domain::schedule::WeekCalendar;
use crate::domain::transfer::{
    SplitTransfer, SplitTransferRecord, TransferLedger, WholeTransfer, WholeTransferRecord,
};
use crate::domain::types::{Quantity, Week};
use crate::engine::error::{ReconcileError, ReconcileResult};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

/// 台账记录在 arena 中的下标
pub type EntryId = usize;

/// 台账记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    Whole(WholeTransfer),
    Split(SplitTransfer),
}

impl JournalEntry {
    pub fn item_id(&self) -> &str {
        match self {
            JournalEntry::Whole(w) => &w.item_id,
            JournalEntry::Split(s) => &s.item_id,
        }
    }

    pub fn lot_id(&self) -> &str {
        match self {
            JournalEntry::Whole(w) => &w.lot_id,
            JournalEntry::Split(s) => &s.lot_id,
        }
    }

    /// 原始所在周
    pub fn origin(&self) -> Week {
        match self {
            JournalEntry::Whole(w) => w.from_week,
            JournalEntry::Split(s) => s.from_week,
        }
    }

    /// 当前所在周
    pub fn location(&self) -> Week {
        match self {
            JournalEntry::Whole(w) => w.to_week,
            JournalEntry::Split(s) => s.to_week,
        }
    }

    pub fn quantity(&self) -> Quantity {
        match self {
            JournalEntry::Whole(w) => w.total_quantity,
            JournalEntry::Split(s) => s.moved_quantity,
        }
    }

    fn set_location(&mut self, week: Week) {
        match self {
            JournalEntry::Whole(w) => w.to_week = week,
            JournalEntry::Split(s) => s.to_week = week,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LotKeyRef {
    item_id: String,
    lot_id: String,
}

impl LotKeyRef {
    fn new(item_id: &str, lot_id: &str) -> Self {
        Self {
            item_id: item_id.to_string(),
            lot_id: lot_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LocationKey {
    lot: LotKeyRef,
    week: Week,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TransitionKey {
    lot: LotKeyRef,
    from: Week,
    to: Week,
    quantity: Option<Quantity>,
}

// ==========================================
// TransferJournal - 转移台账
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct TransferJournal {
    entries: Vec<Option<JournalEntry>>,
    at: HashMap<LocationKey, Vec<EntryId>>,
    journaled: HashMap<LotKeyRef, Quantity>,
    fragmented: HashSet<LotKeyRef>,
    applied: HashSet<TransitionKey>,
}

impl TransferJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// 有效记录数
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 全部有效记录（按首次记账顺序）
    pub fn entries(&self) -> impl Iterator<Item = &JournalEntry> {
        self.entries.iter().flatten()
    }

    pub fn whole_transfers(&self) -> impl Iterator<Item = &WholeTransfer> {
        self.entries().filter_map(|e| match e {
            JournalEntry::Whole(w) => Some(w),
            JournalEntry::Split(_) => None,
        })
    }

    pub fn split_transfers(&self) -> impl Iterator<Item = &SplitTransfer> {
        self.entries().filter_map(|e| match e {
            JournalEntry::Split(s) => Some(s),
            JournalEntry::Whole(_) => None,
        })
    }

    /// 某批次的全部记录
    pub fn lot_entries<'a>(
        &'a self,
        item_id: &'a str,
        lot_id: &'a str,
    ) -> impl Iterator<Item = &'a JournalEntry> + 'a {
        self.entries()
            .filter(move |e| e.item_id() == item_id && e.lot_id() == lot_id)
    }

    /// 某批次已记账数量
    pub fn journaled_quantity(&self, item_id: &str, lot_id: &str) -> Quantity {
        self.journaled
            .get(&LotKeyRef::new(item_id, lot_id))
            .copied()
            .unwrap_or(0)
    }

    /// 批次是否已有拆分记录
    pub fn is_fragmented(&self, item_id: &str, lot_id: &str) -> bool {
        self.fragmented.contains(&LotKeyRef::new(item_id, lot_id))
    }

    // ==========================================
    // 记账入口
    // ==========================================

    /// 记录一次批次转移
    ///
    /// - quantity 为 None: 整批转移
    /// - quantity 为 Some(n): 拆分转移 n 件
    ///
    /// 返回 false 表示该转移已记过（或为空转移），台账未变化
    pub fn mark_transition(
        &mut self,
        item_id: &str,
        lot: &Lot,
        from: Week,
        to: Week,
        quantity: Option<Quantity>,
    ) -> ReconcileResult<bool> {
        if from == to || quantity == Some(0) {
            return Ok(false);
        }

        let key = TransitionKey {
            lot: LotKeyRef::new(item_id, &lot.id),
            from,
            to,
            quantity,
        };
        if self.applied.contains(&key) {
            debug!(item_id, lot_id = %lot.id, from, to, ?quantity, "转移已记账，跳过");
            return Ok(false);
        }

        match quantity {
            None => self.transit_whole(item_id, lot, from, to)?,
            Some(q) => self.transit_split(item_id, lot, from, to, q)?,
        }
        self.applied.insert(key);
        Ok(true)
    }

    fn transit_whole(&mut self, item_id: &str, lot: &Lot, from: Week, to: Week) -> ReconcileResult<()> {
        let loc = LocationKey {
            lot: LotKeyRef::new(item_id, &lot.id),
            week: from,
        };

        if let Some(id) = self.find_whole(&loc) {
            self.relocate(id, to);
            return Ok(());
        }

        // 批次已有拆分历史: 按拆分口径记账（数量为全部）
        if self.is_fragmented(item_id, &lot.id) {
            return self.transit_split(item_id, lot, from, to, lot.total_quantity);
        }

        let journaled = self.journaled_quantity(item_id, &lot.id);
        if journaled > 0 {
            return Err(ReconcileError::JournalOverflow {
                item_id: item_id.to_string(),
                lot_id: lot.id.clone(),
                journaled: journaled.saturating_add(lot.total_quantity),
                total: lot.total_quantity,
            });
        }

        self.insert_entry(JournalEntry::Whole(WholeTransfer {
            item_id: item_id.to_string(),
            lot_id: lot.id.clone(),
            total_quantity: lot.total_quantity,
            origin_class: lot.origin_class,
            from_week: from,
            to_week: to,
        }));
        Ok(())
    }

    fn transit_split(
        &mut self,
        item_id: &str,
        lot: &Lot,
        from: Week,
        to: Week,
        quantity: Quantity,
    ) -> ReconcileResult<()> {
        let overflow = |journaled: Quantity| ReconcileError::JournalOverflow {
            item_id: item_id.to_string(),
            lot_id: lot.id.clone(),
            journaled,
            total: lot.total_quantity,
        };
        if quantity > lot.total_quantity {
            return Err(overflow(quantity));
        }

        let loc = LocationKey {
            lot: LotKeyRef::new(item_id, &lot.id),
            week: from,
        };

        // 1) 整批记录首次被拆分
        if let Some(id) = self.find_whole(&loc) {
            if quantity == lot.total_quantity {
                self.relocate(id, to);
                return Ok(());
            }
            let origin = self.entry(id).map(JournalEntry::origin).unwrap_or(from);
            self.remove_entry(id);
            self.place_split(item_id, lot, origin, from, lot.total_quantity - quantity);
            self.place_split(item_id, lot, origin, to, quantity);
            return Ok(());
        }

        // 2) 消费位于 from 的拆分记录，不足部分为 from 周原生数量
        let ids: Vec<EntryId> = self.at.get(&loc).cloned().unwrap_or_default();
        let in_flight: u64 = ids
            .iter()
            .filter_map(|id| self.entry(*id))
            .map(|e| u64::from(e.quantity()))
            .sum();
        let fresh = u64::from(quantity).saturating_sub(in_flight);
        if fresh > 0 {
            let journaled = u64::from(self.journaled_quantity(item_id, &lot.id));
            if journaled + fresh > u64::from(lot.total_quantity) {
                return Err(overflow(
                    Quantity::try_from(journaled + fresh).unwrap_or(Quantity::MAX),
                ));
            }
        }

        let mut left = quantity;
        for id in ids {
            if left == 0 {
                break;
            }
            let Some(entry) = self.entry(id) else {
                continue;
            };
            let (available, origin) = (entry.quantity(), entry.origin());
            if left >= available {
                // 数量恰好相等: 原地推进
                self.relocate(id, to);
                left -= available;
            } else {
                self.shrink(id, left);
                self.place_split(item_id, lot, origin, to, left);
                left = 0;
            }
        }

        if left > 0 {
            self.place_split(item_id, lot, from, to, left);
        }
        Ok(())
    }

    // ==========================================
    // 内部维护
    // ==========================================

    fn entry(&self, id: EntryId) -> Option<&JournalEntry> {
        self.entries.get(id).and_then(Option::as_ref)
    }

    fn location_key(entry: &JournalEntry) -> LocationKey {
        LocationKey {
            lot: LotKeyRef::new(entry.item_id(), entry.lot_id()),
            week: entry.location(),
        }
    }

    fn find_whole(&self, loc: &LocationKey) -> Option<EntryId> {
        self.at.get(loc)?.iter().copied().find(|id| {
            matches!(self.entry(*id), Some(JournalEntry::Whole(_)))
        })
    }

    fn find_split(&self, loc: &LocationKey, origin: Week) -> Option<EntryId> {
        self.at.get(loc)?.iter().copied().find(|id| {
            matches!(self.entry(*id), Some(JournalEntry::Split(s)) if s.from_week == origin)
        })
    }

    fn insert_entry(&mut self, entry: JournalEntry) -> EntryId {
        let lot = LotKeyRef::new(entry.item_id(), entry.lot_id());
        *self.journaled.entry(lot.clone()).or_insert(0) += entry.quantity();
        if matches!(entry, JournalEntry::Split(_)) {
            self.fragmented.insert(lot);
        }

        let id = self.entries.len();
        self.at.entry(Self::location_key(&entry)).or_default().push(id);
        self.entries.push(Some(entry));
        id
    }

    fn unindex(&mut self, id: EntryId) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let loc = Self::location_key(entry);
        if let Some(ids) = self.at.get_mut(&loc) {
            ids.retain(|x| *x != id);
            if ids.is_empty() {
                self.at.remove(&loc);
            }
        }
    }

    fn remove_entry(&mut self, id: EntryId) {
        self.unindex(id);
        if let Some(entry) = self.entries.get_mut(id).and_then(Option::take) {
            let lot = LotKeyRef::new(entry.item_id(), entry.lot_id());
            if let Some(total) = self.journaled.get_mut(&lot) {
                *total = total.saturating_sub(entry.quantity());
            }
        }
    }

    /// 扣减拆分记录数量（调用方保证扣减后仍 > 0）
    fn shrink(&mut self, id: EntryId, by: Quantity) {
        let lot = match self.entries.get_mut(id).and_then(Option::as_mut) {
            Some(JournalEntry::Split(s)) => {
                s.moved_quantity -= by;
                LotKeyRef::new(&s.item_id, &s.lot_id)
            }
            _ => return,
        };
        if let Some(total) = self.journaled.get_mut(&lot) {
            *total = total.saturating_sub(by);
        }
    }

    /// 把记录推进到新的当前周
    ///
    /// 回到原始周的记录直接删除；拆分记录与目标周同源碎片合并
    fn relocate(&mut self, id: EntryId, to: Week) {
        let Some(entry) = self.entry(id) else {
            return;
        };
        let (is_split, quantity, origin) = (
            matches!(entry, JournalEntry::Split(_)),
            entry.quantity(),
            entry.origin(),
        );
        if origin == to {
            self.remove_entry(id);
            return;
        }

        self.unindex(id);
        let Some(slot) = self.entries.get_mut(id).and_then(Option::as_mut) else {
            return;
        };
        slot.set_location(to);
        let loc = Self::location_key(slot);

        if is_split {
            if let Some(existing) = self.find_split(&loc, origin) {
                if let Some(JournalEntry::Split(s)) =
                    self.entries.get_mut(existing).and_then(Option::as_mut)
                {
                    s.moved_quantity += quantity;
                }
                // 数量已并入 existing，journaled 合计不变
                self.entries[id] = None;
                return;
            }
        }
        self.at.entry(loc).or_default().push(id);
    }

    /// 在 location 放置一个拆分碎片（同源同周则合并）
    fn place_split(&mut self, item_id: &str, lot: &Lot, origin: Week, location: Week, quantity: Quantity) {
        if quantity == 0 || origin == location {
            return;
        }
        let loc = LocationKey {
            lot: LotKeyRef::new(item_id, &lot.id),
            week: location,
        };
        if let Some(existing) = self.find_split(&loc, origin) {
            if let Some(JournalEntry::Split(s)) =
                self.entries.get_mut(existing).and_then(Option::as_mut)
            {
                s.moved_quantity += quantity;
            }
            *self.journaled.entry(loc.lot).or_insert(0) += quantity;
            return;
        }

        self.insert_entry(JournalEntry::Split(SplitTransfer {
            item_id: item_id.to_string(),
            lot_id: lot.id.clone(),
            lot_total_quantity: lot.total_quantity,
            from_week: origin,
            moved_quantity: quantity,
            to_week: location,
        }));
    }

    // ==========================================
    // 跨行合并 / 回放 / 输出
    // ==========================================

    /// 合并另一份台账（单行处理成功后并入整表台账）
    pub fn absorb(&mut self, other: TransferJournal) {
        for entry in other.entries.into_iter().flatten() {
            self.insert_entry(entry);
        }
        self.fragmented.extend(other.fragmented);
        self.applied.extend(other.applied);
    }

    /// 把某产品的全部记录回放到起始周状态上
    ///
    /// 每条记录: 从原始周扣除数量，加到当前周
    pub fn replay_onto(
        &self,
        item_id: &str,
        weeks: &mut [BTreeMap<String, Quantity>],
    ) -> ReconcileResult<()> {
        let entries: Vec<&JournalEntry> = self.entries().filter(|e| e.item_id() == item_id).collect();
        let week_count = weeks.len();
        let out_of_range = |week: Week| ReconcileError::WeekOutOfRange {
            week,
            weeks: week_count,
        };

        for entry in &entries {
            let origin = entry.origin();
            let slot = weeks
                .get_mut(origin)
                .ok_or_else(|| out_of_range(origin))?;
            let available = slot.get(entry.lot_id()).copied().unwrap_or(0);
            if available < entry.quantity() {
                return Err(ReconcileError::InsufficientQuantity {
                    item_id: item_id.to_string(),
                    week: origin,
                    lot_id: Some(entry.lot_id().to_string()),
                    requested: entry.quantity(),
                    available,
                });
            }
            if available == entry.quantity() {
                slot.remove(entry.lot_id());
            } else {
                slot.insert(entry.lot_id().to_string(), available - entry.quantity());
            }
        }

        for entry in &entries {
            let location = entry.location();
            let slot = weeks
                .get_mut(location)
                .ok_or_else(|| out_of_range(location))?;
            *slot.entry(entry.lot_id().to_string()).or_insert(0) += entry.quantity();
        }
        Ok(())
    }

    /// 按周日历输出带日期的台账
    pub fn to_ledger(&self, calendar: &WeekCalendar) -> ReconcileResult<TransferLedger> {
        let date = |week: Week| {
            calendar.date(week).ok_or(ReconcileError::WeekOutOfRange {
                week,
                weeks: calendar.len(),
            })
        };

        let mut ledger = TransferLedger::default();
        for entry in self.entries() {
            match entry {
                JournalEntry::Whole(w) => ledger.whole.push(WholeTransferRecord {
                    item_id: w.item_id.clone(),
                    total_quantity: w.total_quantity,
                    origin_class: w.origin_class,
                    lot_id: w.lot_id.clone(),
                    from_date: date(w.from_week)?,
                    to_date: date(w.to_week)?,
                }),
                JournalEntry::Split(s) => ledger.split.push(SplitTransferRecord {
                    item_id: s.item_id.clone(),
                    lot_id: s.lot_id.clone(),
                    lot_total_quantity: s.lot_total_quantity,
                    from_date: date(s.from_week)?,
                    moved_quantity: s.moved_quantity,
                    to_date: date(s.to_week)?,
                }),
            }
        }
        Ok(ledger)
    }
}
