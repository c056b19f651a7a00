// ==========================================
// 周排产订单平衡系统 - API层错误类型
// ==========================================
// 职责: 汇总各层错误，保留原始错误作为 source
// ==========================================

use crate::config::ConfigError;
use crate::engine::ReconcileError;
use crate::exporter::ExportError;
use crate::importer::ImportError;
use crate::repository::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    #[error("文件导入失败: {0}")]
    Import(#[from] ImportError),

    #[error("排产平衡失败: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("台账导出失败: {0}")]
    Export(#[from] ExportError),

    #[error("数据库错误: {0}")]
    Repository(#[from] RepositoryError),

    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// 是否为内部一致性故障（而非输入问题）
    pub fn is_internal(&self) -> bool {
        matches!(self, ApiError::Reconcile(err) if err.is_internal())
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
