// ==========================================
// 周排产订单平衡系统 - API 层
// ==========================================
// 职责: 对外的一次调用入口（CLI 使用）
// ==========================================

pub mod error;
pub mod reconcile_api;

pub use error::{ApiError, ApiResult};
pub use reconcile_api::{ReconcileApi, ReconcileRunResponse, RowFailureView};
