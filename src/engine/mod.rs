// ==========================================
// 周排产订单平衡系统 - 引擎层
// ==========================================
// 职责: 周不平衡消除 + 批次转移记账
// 红线: 引擎不读写文件/数据库；数量只搬移不增减
// ==========================================

pub mod error;
pub mod iterations;
pub mod journal;
pub mod lot_key;
pub mod reconciler;
pub mod sweep;
pub mod week_ledger;

// 重导出核心类型
pub use error::{MoveDirection, ReconcileError, ReconcileResult};
pub use iterations::{split_into_iterations, SplitIterations};
pub use journal::{JournalEntry, TransferJournal};
pub use lot_key::{compare_lots, sort_lot_ids, LotKey};
pub use reconciler::{ItemOutcome, ReconcileReport, Reconciler, ReconcilerOptions, RowFailure};
pub use sweep::{FutureMoveMarker, ItemSweep};
pub use week_ledger::{LotIx, WeekLedger};
