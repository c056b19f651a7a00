// ==========================================
// 周排产订单平衡系统 - 数据仓储层
// ==========================================
// 职责: 平衡运行与转移台账的持久化（SQLite）
// ==========================================

pub mod error;
pub mod transfer_run_repo;

// 重导出
pub use error::{RepositoryError, RepositoryResult};
pub use transfer_run_repo::{ReconcileRunEntity, TransferRunRepository};
