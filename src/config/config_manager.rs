// ==========================================
// 周排产订单平衡系统 - 配置管理器
// ==========================================
// 职责: 配置加载、默认值、环境变量覆写、校验
// 格式: JSON（所有字段均有默认值，可只写需要改的部分）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

// ==========================================
// 环境变量键
// ==========================================
pub mod env_keys {
    /// 覆写 db_path
    pub const DB_PATH: &str = "SCHEDULE_RECONCILE_DB_PATH";
    /// 覆写 output_dir
    pub const OUTPUT_DIR: &str = "SCHEDULE_RECONCILE_OUTPUT_DIR";
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 ({path}): {message}")]
    ReadError { path: String, message: String },

    #[error("配置文件写入失败 ({path}): {message}")]
    WriteError { path: String, message: String },

    #[error("配置格式错误: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("配置值错误 (key: {key}): {message}")]
    InvalidValue { key: String, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ==========================================
// 数据源
// ==========================================

/// 单张源表的位置
///
/// sheet 仅对 Excel 生效；为空时取第一个工作表
/// header_row: 表头之前需要跳过的行数（源表上方常有标题行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSource {
    pub path: PathBuf,
    pub sheet: Option<String>,
    pub header_row: usize,
}

impl TableSource {
    pub fn new(path: impl Into<PathBuf>, sheet: Option<&str>, header_row: usize) -> Self {
        Self {
            path: path.into(),
            sheet: sheet.map(str::to_string),
            header_row,
        }
    }
}

impl Default for TableSource {
    fn default() -> Self {
        Self::new("input.xlsx", None, 0)
    }
}

/// 源表列名
///
/// 默认值对应生产数据表的俄文表头
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    // 排产表
    pub schedule_item_id: String,
    pub graph_prefix: String,
    pub plan_prefix: String,
    // 日历表
    pub calendar_week: String,
    pub calendar_date: String,
    // 订单表
    pub order_item_id: String,
    pub order_lot_id: String,
    pub order_due_date: String,
    pub order_quantity: String,
    pub order_origin_class: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            schedule_item_id: "ID_125".to_string(),
            graph_prefix: "Gr".to_string(),
            plan_prefix: "Pl".to_string(),
            calendar_week: "т".to_string(),
            calendar_date: "тт".to_string(),
            order_item_id: "Id_125".to_string(),
            order_lot_id: "Заказ".to_string(),
            order_due_date: "Дата кон.".to_string(),
            order_quantity: "План".to_string(),
            order_origin_class: "вн/внутр".to_string(),
        }
    }
}

// ==========================================
// ReconcileConfig - 运行配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub orders: TableSource,
    pub calendar: TableSource,
    pub schedule: TableSource,
    pub columns: ColumnNames,
    pub output_dir: PathBuf,
    pub whole_file_name: String,
    pub split_file_name: String,
    pub db_path: Option<PathBuf>,
    pub fail_fast: bool,
    pub strict_schedule_check: bool,
    pub verify_journal: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            orders: TableSource::new("input.xlsx", Some("orders"), 2),
            calendar: TableSource::new("input.xlsx", Some("dates"), 0),
            schedule: TableSource::new("input.xlsx", Some("schedule"), 1),
            columns: ColumnNames::default(),
            output_dir: PathBuf::from("output"),
            whole_file_name: "transfers".to_string(),
            split_file_name: "split_transfers".to_string(),
            db_path: None,
            fail_fast: false,
            strict_schedule_check: true,
            verify_journal: true,
        }
    }
}

impl ReconcileConfig {
    /// 校验配置值
    pub fn validate(&self) -> ConfigResult<()> {
        let required = [
            ("columns.schedule_item_id", &self.columns.schedule_item_id),
            ("columns.graph_prefix", &self.columns.graph_prefix),
            ("columns.plan_prefix", &self.columns.plan_prefix),
            ("columns.calendar_week", &self.columns.calendar_week),
            ("columns.calendar_date", &self.columns.calendar_date),
            ("columns.order_item_id", &self.columns.order_item_id),
            ("columns.order_lot_id", &self.columns.order_lot_id),
            ("columns.order_due_date", &self.columns.order_due_date),
            ("columns.order_quantity", &self.columns.order_quantity),
            ("columns.order_origin_class", &self.columns.order_origin_class),
            ("whole_file_name", &self.whole_file_name),
            ("split_file_name", &self.split_file_name),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(invalid(key, "不能为空"));
            }
        }

        // Gr/Pl 前缀互为前缀时无法区分列
        let (graph, plan) = (&self.columns.graph_prefix, &self.columns.plan_prefix);
        if graph.starts_with(plan.as_str()) || plan.starts_with(graph.as_str()) {
            return Err(invalid(
                "columns.plan_prefix",
                &format!("与 graph_prefix 冲突: {} / {}", graph, plan),
            ));
        }

        if self.whole_file_name == self.split_file_name {
            return Err(invalid("split_file_name", "不能与 whole_file_name 相同"));
        }

        for (key, source) in [
            ("orders.path", &self.orders),
            ("calendar.path", &self.calendar),
            ("schedule.path", &self.schedule),
        ] {
            if source.path.as_os_str().is_empty() {
                return Err(invalid(key, "不能为空"));
            }
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(invalid("output_dir", "不能为空"));
        }
        Ok(())
    }

    /// 配置快照（JSON），随运行记录一起保存
    pub fn snapshot(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

fn invalid(key: &str, message: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// 命令行覆写项
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_dir: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub fail_fast: bool,
}

// ==========================================
// ConfigManager - 配置加载
// ==========================================
pub struct ConfigManager;

impl ConfigManager {
    /// 从 JSON 文件加载配置，应用环境变量覆写并校验
    ///
    /// 源表路径为相对路径时，相对配置文件所在目录解析
    pub fn load(path: &Path) -> ConfigResult<ReconcileConfig> {
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let mut config = Self::from_json(&raw)?;
        if let Some(base) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config.orders.path = resolve(base, &config.orders.path);
            config.calendar.path = resolve(base, &config.calendar.path);
            config.schedule.path = resolve(base, &config.schedule.path);
        }

        Self::apply_env_overrides(&mut config);
        config.validate()?;
        info!(path = %path.display(), "配置已加载");
        Ok(config)
    }

    /// 解析 JSON 配置（不做覆写/校验）
    pub fn from_json(raw: &str) -> ConfigResult<ReconcileConfig> {
        Ok(serde_json::from_str(raw)?)
    }

    /// 环境变量覆写
    pub fn apply_env_overrides(config: &mut ReconcileConfig) {
        if let Some(db_path) = env_value(env_keys::DB_PATH) {
            debug!(db_path = %db_path, "db_path 由环境变量覆写");
            config.db_path = Some(PathBuf::from(db_path));
        }
        if let Some(output_dir) = env_value(env_keys::OUTPUT_DIR) {
            debug!(output_dir = %output_dir, "output_dir 由环境变量覆写");
            config.output_dir = PathBuf::from(output_dir);
        }
    }

    /// 命令行覆写，覆写后重新校验
    pub fn apply_overrides(
        config: &mut ReconcileConfig,
        overrides: ConfigOverrides,
    ) -> ConfigResult<()> {
        if let Some(output_dir) = overrides.output_dir {
            config.output_dir = output_dir;
        }
        if overrides.db_path.is_some() {
            config.db_path = overrides.db_path;
        }
        if overrides.fail_fast {
            config.fail_fast = true;
        }
        config.validate()
    }

    /// 写出默认配置文件
    ///
    /// with_db 为 true 时 db_path 取默认数据库路径
    pub fn write_default(path: &Path, with_db: bool) -> ConfigResult<()> {
        let mut config = ReconcileConfig::default();
        if with_db {
            config.db_path = Some(get_default_db_path());
        }
        let raw = serde_json::to_string_pretty(&config)?;
        fs::write(path, raw).map_err(|e| ConfigError::WriteError {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// 默认数据库路径
///
/// 优先级: SCHEDULE_RECONCILE_DB_PATH > 系统数据目录 > 当前目录
pub fn get_default_db_path() -> PathBuf {
    if let Some(db_path) = env_value(env_keys::DB_PATH) {
        return PathBuf::from(db_path);
    }

    match dirs::data_dir() {
        Some(dir) => dir.join("schedule-reconcile").join("reconcile.db"),
        None => PathBuf::from("reconcile.db"),
    }
}
