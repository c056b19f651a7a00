// ==========================================
// 周排产订单平衡系统 - 配置层
// ==========================================
// 职责: 运行配置加载、环境变量覆写、校验、快照
// 存储: JSON 配置文件（serde）
// ==========================================

pub mod config_manager;

// 重导出核心配置类型
pub use config_manager::{
    env_keys, get_default_db_path, ColumnNames, ConfigError, ConfigManager, ConfigOverrides,
    ConfigResult,
    ReconcileConfig, TableSource,
};
