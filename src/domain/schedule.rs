// ==========================================
// 周排产订单平衡系统 - 排产行与周日历
// ==========================================
// 职责: 承载一行排产（一个产品）的核心输入
// - imbalance: 每周不平衡量，长度 = 周数
// - week_lots: 每周 批次id → 剩余数量
// - lots: 批次id → (总量, 来源)
// ==========================================

use crate::domain::lot::LotMeta;
use crate::domain::types::{Imbalance, OriginClass, Quantity, Week};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ==========================================
// WeekCalendar - 周索引 ↔ 日期
// ==========================================
// 同一张排产表的所有行共享一个日历
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekCalendar {
    dates: Vec<NaiveDate>,
}

impl WeekCalendar {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        Self { dates }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// 周索引对应的日期
    pub fn date(&self, week: Week) -> Option<NaiveDate> {
        self.dates.get(week).copied()
    }

    /// 日期对应的周索引（按天精确匹配）
    pub fn week_of(&self, date: NaiveDate) -> Option<Week> {
        self.dates.iter().position(|d| *d == date)
    }

    /// 日期是否严格递增
    pub fn is_monotonic(&self) -> bool {
        self.dates.windows(2).all(|w| w[0] < w[1])
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }
}

/// 排产行编辑错误
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowEditError {
    #[error("周索引越界: week={week}, weeks={weeks}")]
    WeekOutOfRange { week: Week, weeks: usize },

    #[error("数量累加溢出: week={week}")]
    Overflow { week: Week },
}

// ==========================================
// ItemRow - 单个产品的一行排产输入
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRow {
    pub item_id: String,
    pub imbalance: Vec<Imbalance>,
    pub week_lots: Vec<BTreeMap<String, Quantity>>,
    pub lots: BTreeMap<String, LotMeta>,
}

impl ItemRow {
    /// 创建空行（所有周不平衡为 0，无批次）
    pub fn new(item_id: impl Into<String>, weeks: usize) -> Self {
        Self {
            item_id: item_id.into(),
            imbalance: vec![0; weeks],
            week_lots: vec![BTreeMap::new(); weeks],
            lots: BTreeMap::new(),
        }
    }

    pub fn weeks(&self) -> usize {
        self.imbalance.len()
    }

    /// 累加某周的不平衡量
    pub fn add_imbalance(&mut self, week: Week, delta: Imbalance) -> Result<(), RowEditError> {
        let weeks = self.imbalance.len();
        let slot = self
            .imbalance
            .get_mut(week)
            .ok_or(RowEditError::WeekOutOfRange { week, weeks })?;
        *slot = slot.checked_add(delta).ok_or(RowEditError::Overflow { week })?;
        Ok(())
    }

    /// 在某周放置批次数量（同一批次重复放置时累加，总量同步累加）
    ///
    /// 来源以第一次放置为准。越界或溢出时行保持不变
    pub fn place_lot(
        &mut self,
        week: Week,
        lot_id: &str,
        quantity: Quantity,
        origin_class: OriginClass,
    ) -> Result<(), RowEditError> {
        let weeks = self.week_lots.len();
        let week_map = self
            .week_lots
            .get_mut(week)
            .ok_or(RowEditError::WeekOutOfRange { week, weeks })?;

        let placed = week_map
            .get(lot_id)
            .copied()
            .unwrap_or(0)
            .checked_add(quantity)
            .ok_or(RowEditError::Overflow { week })?;
        let total = match self.lots.get(lot_id) {
            Some(meta) => meta
                .total_quantity
                .checked_add(quantity)
                .ok_or(RowEditError::Overflow { week })?,
            None => quantity,
        };

        week_map.insert(lot_id.to_string(), placed);
        self.lots
            .entry(lot_id.to_string())
            .and_modify(|meta| meta.total_quantity = total)
            .or_insert(LotMeta {
                total_quantity: total,
                origin_class,
            });
        Ok(())
    }

    /// 不平衡量合计（合法输入应为 0）
    ///
    /// 溢出时返回 Imbalance::MAX，按不平衡处理
    pub fn imbalance_sum(&self) -> Imbalance {
        let sum: i128 = self.imbalance.iter().map(|v| i128::from(*v)).sum();
        Imbalance::try_from(sum).unwrap_or(Imbalance::MAX)
    }
}
