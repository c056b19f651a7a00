// ==========================================
// 周排产订单平衡系统 - 转移记录
// ==========================================
// 两类台账:
// - 整批转移: 批次整体从 from_week 移至 to_week（同一批次再次整体移动时原地更新 to_week）
// - 拆分转移: 批次部分数量的移动，一个批次可有多条（每条代表一个碎片的当前位置）
// 周索引形式在核心内部使用；导出时经 WeekCalendar 转为日期
// ==========================================

use crate::domain::types::{OriginClass, Quantity, Week};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 整批转移（周索引形式）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WholeTransfer {
    pub item_id: String,
    pub lot_id: String,
    pub total_quantity: Quantity,
    pub origin_class: OriginClass,
    pub from_week: Week, // 批次原始所在周
    pub to_week: Week,   // 批次当前所在周
}

/// 拆分转移（周索引形式）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitTransfer {
    pub item_id: String,
    pub lot_id: String,
    pub lot_total_quantity: Quantity,
    pub from_week: Week,
    pub moved_quantity: Quantity, // 恒 > 0
    pub to_week: Week,
}

/// 整批转移输出行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WholeTransferRecord {
    pub item_id: String,
    pub total_quantity: Quantity,
    pub origin_class: OriginClass,
    pub lot_id: String,
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
}

/// 拆分转移输出行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitTransferRecord {
    pub item_id: String,
    pub lot_id: String,
    pub lot_total_quantity: Quantity,
    pub from_date: NaiveDate,
    pub moved_quantity: Quantity,
    pub to_date: NaiveDate,
}

/// 整张排产表的转移台账（交给导出/落库）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferLedger {
    pub whole: Vec<WholeTransferRecord>,
    pub split: Vec<SplitTransferRecord>,
}

impl TransferLedger {
    pub fn is_empty(&self) -> bool {
        self.whole.is_empty() && self.split.is_empty()
    }
}

/// 被推迟到到期周之后的批次（来自未来移动标记）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarriedLot {
    pub lot_id: String,
    pub origin_week: Week, // 第一次被向右推出时所在周
    pub fragmented: bool,  // 推出过程中是否被拆分
}
