// ==========================================
// 周排产订单平衡系统 - 订单批次
// ==========================================
// 批次 = 某产品下一个具名订单承诺，总量在处理开始时确定且不变
// 批次在各周的剩余量由周台账 (WeekLedger) 维护，不记录在批次上
// ==========================================

use crate::domain::types::{OriginClass, Quantity};
use serde::{Deserialize, Serialize};

/// 批次元数据（一行排产内固定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotMeta {
    pub total_quantity: Quantity, // 起始总量（不变）
    pub origin_class: OriginClass,
}

/// 批次（id + 元数据）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: String,
    pub total_quantity: Quantity,
    pub origin_class: OriginClass,
}

impl Lot {
    pub fn new(id: impl Into<String>, meta: LotMeta) -> Self {
        Self {
            id: id.into(),
            total_quantity: meta.total_quantity,
            origin_class: meta.origin_class,
        }
    }
}
