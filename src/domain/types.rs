// ==========================================
// 周排产订单平衡系统 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 周索引（0..N-1，按日历时间单调递增）
pub type Week = usize;

/// 批次数量（台/件），只在周之间搬移，总量守恒
pub type Quantity = u32;

/// 周不平衡量: 正数=超前于订单（需从右侧周拉入批次），负数=落后（需向右侧周推出批次）
pub type Imbalance = i64;

// ==========================================
// 订单来源 (Origin Class)
// ==========================================
// 核心内部只使用枚举，编码（1/2）只在导出边界进行
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OriginClass {
    External, // 外部订单
    Internal, // 内部订单
}

impl OriginClass {
    /// 导出编码: 外部=1, 内部=2
    pub fn code(self) -> u8 {
        match self {
            OriginClass::External => 1,
            OriginClass::Internal => 2,
        }
    }

    /// 解析源表中的来源标签
    ///
    /// 支持: external/internal（不区分大小写）、внешний/внутренний、编码 1/2
    pub fn parse_label(raw: &str) -> Option<Self> {
        let value = raw.trim().to_lowercase();
        match value.as_str() {
            "external" | "внешний" | "1" => Some(OriginClass::External),
            "internal" | "внутренний" | "2" => Some(OriginClass::Internal),
            _ => None,
        }
    }
}

impl fmt::Display for OriginClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginClass::External => write!(f, "EXTERNAL"),
            OriginClass::Internal => write!(f, "INTERNAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_class_labels() {
        assert_eq!(OriginClass::parse_label("External"), Some(OriginClass::External));
        assert_eq!(OriginClass::parse_label(" внешний "), Some(OriginClass::External));
        assert_eq!(OriginClass::parse_label("внутренний"), Some(OriginClass::Internal));
        assert_eq!(OriginClass::parse_label("2"), Some(OriginClass::Internal));
        assert_eq!(OriginClass::parse_label("other"), None);
    }

    #[test]
    fn test_origin_class_code() {
        assert_eq!(OriginClass::External.code(), 1);
        assert_eq!(OriginClass::Internal.code(), 2);
        assert_eq!(OriginClass::Internal.to_string(), "INTERNAL");
    }
}
