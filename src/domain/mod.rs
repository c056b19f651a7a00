// ==========================================
// 周排产订单平衡系统 - 领域模型层
// ==========================================
// 职责: 定义周、批次、排产行、转移记录等领域类型
// 红线: 不含平衡算法,不含文件/数据库访问
// ==========================================

pub mod lot;
pub mod schedule;
pub mod transfer;
pub mod types;

// 重导出核心类型
pub use lot::{Lot, LotMeta};
pub use schedule::{ItemRow, RowEditError, WeekCalendar};
pub use transfer::{
    CarriedLot, SplitTransfer, SplitTransferRecord, TransferLedger, WholeTransfer,
    WholeTransferRecord,
};
pub use types::{Imbalance, OriginClass, Quantity, Week};
