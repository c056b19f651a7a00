// ==========================================
// 周排产订单平衡系统 - 平衡引擎错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类:
// - 输入不可行（调用方可见，变更前校验）: ImbalanceNotConserved / InfeasibleDeficit / SupplyExhausted 及形状类错误
// - 内部一致性故障（合法输入下不可达）: InvalidMoveOrder / InsufficientQuantity / JournalOverflow / JournalReplayMismatch
// 所有错误只中止当前排产行，不影响已完成行的台账
// ==========================================

use crate::domain::types::{Imbalance, Quantity, Week};
use std::fmt;
use thiserror::Error;

/// 移动方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Left,  // 拉入更早的周 (to < from)
    Right, // 推向更晚的周 (to > from)
}

impl fmt::Display for MoveDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveDirection::Left => write!(f, "move_left"),
            MoveDirection::Right => write!(f, "move_right"),
        }
    }
}

/// 平衡引擎错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    // ===== 输入不可行 =====
    #[error("不平衡量合计不为 0 (item={item_id}): sum={sum}, imbalance={imbalance:?}")]
    ImbalanceNotConserved {
        item_id: String,
        sum: Imbalance,
        imbalance: Vec<Imbalance>,
    },

    #[error("计划与订单不符 (item={item_id}, week={week}): 缺口 {deficit} 超过该周可推出数量 {available}")]
    InfeasibleDeficit {
        item_id: String,
        week: Week,
        deficit: Quantity,
        available: Quantity,
    },

    #[error("右侧已无可拉入的批次 (item={item_id}, week={week}): 仍缺 {shortfall}")]
    SupplyExhausted {
        item_id: String,
        week: Week,
        shortfall: Quantity,
    },

    // ===== 输入形状错误 =====
    #[error("周数不一致 (item={item_id}): 日历 {calendar_weeks} 周, 不平衡向量 {imbalance_weeks} 周, 批次 {lot_weeks} 周")]
    ShapeMismatch {
        item_id: String,
        calendar_weeks: usize,
        imbalance_weeks: usize,
        lot_weeks: usize,
    },

    #[error("排产行周数不一致 (item={item_id}): 不平衡向量 {imbalance_weeks} 周, 批次 {lot_weeks} 周")]
    RowShapeMismatch {
        item_id: String,
        imbalance_weeks: usize,
        lot_weeks: usize,
    },

    #[error("批次缺少元数据 (item={item_id}): lot={lot_id}")]
    UnknownLot { item_id: String, lot_id: String },

    #[error("批次总量不一致 (item={item_id}, lot={lot_id}): 声明 {declared}, 各周合计 {placed}")]
    LotQuantityMismatch {
        item_id: String,
        lot_id: String,
        declared: Quantity,
        placed: Quantity,
    },

    #[error("同一排产表中产品重复: item={item_id}")]
    DuplicateItem { item_id: String },

    #[error("数量超出范围 (item={item_id}): {value}")]
    QuantityOverflow { item_id: String, value: i64 },

    // ===== 内部一致性故障 =====
    #[error("移动方向错误 (item={item_id}): {direction} from={from} to={to}")]
    InvalidMoveOrder {
        item_id: String,
        direction: MoveDirection,
        from: Week,
        to: Week,
    },

    #[error("可移动数量不足 (item={item_id}, week={week}, lot={lot_id:?}): 请求 {requested}, 现有 {available}")]
    InsufficientQuantity {
        item_id: String,
        week: Week,
        lot_id: Option<String>,
        requested: Quantity,
        available: Quantity,
    },

    #[error("台账数量超出批次总量 (item={item_id}, lot={lot_id}): 已记录 {journaled}, 总量 {total}")]
    JournalOverflow {
        item_id: String,
        lot_id: String,
        journaled: Quantity,
        total: Quantity,
    },

    #[error("台账回放结果与最终周台账不一致 (item={item_id}, week={week})")]
    JournalReplayMismatch { item_id: String, week: Week },

    #[error("周索引超出日历范围: week={week}, weeks={weeks}")]
    WeekOutOfRange { week: Week, weeks: usize },
}

impl ReconcileError {
    /// 是否为内部一致性故障（合法输入下不应出现）
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ReconcileError::InvalidMoveOrder { .. }
                | ReconcileError::InsufficientQuantity { .. }
                | ReconcileError::JournalOverflow { .. }
                | ReconcileError::JournalReplayMismatch { .. }
                | ReconcileError::WeekOutOfRange { .. }
        )
    }

    /// 错误关联的产品（日历类错误没有产品）
    pub fn item_id(&self) -> Option<&str> {
        match self {
            ReconcileError::ImbalanceNotConserved { item_id, .. }
            | ReconcileError::InfeasibleDeficit { item_id, .. }
            | ReconcileError::SupplyExhausted { item_id, .. }
            | ReconcileError::ShapeMismatch { item_id, .. }
            | ReconcileError::RowShapeMismatch { item_id, .. }
            | ReconcileError::UnknownLot { item_id, .. }
            | ReconcileError::LotQuantityMismatch { item_id, .. }
            | ReconcileError::DuplicateItem { item_id }
            | ReconcileError::QuantityOverflow { item_id, .. }
            | ReconcileError::InvalidMoveOrder { item_id, .. }
            | ReconcileError::InsufficientQuantity { item_id, .. }
            | ReconcileError::JournalOverflow { item_id, .. }
            | ReconcileError::JournalReplayMismatch { item_id, .. } => Some(item_id),
            ReconcileError::WeekOutOfRange { .. } => None,
        }
    }
}

/// Result 类型别名
pub type ReconcileResult<T> = Result<T, ReconcileError>;
