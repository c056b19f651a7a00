// ==========================================
// 周排产订单平衡系统 - 核心库
// ==========================================
// 职责: 按周对账排产（图表/计划）与订单批次，
//       通过整批/拆分搬移消除每周不平衡，并生成转移台账
// 技术栈: Rust + SQLite (可选落库)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 平衡与记账
pub mod engine;

// 导入层 - 源表
pub mod importer;

// 导出层 - CSV 台账
pub mod exporter;

// 数据仓储层 - 运行记录
pub mod repository;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 一次运行入口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::{
    CarriedLot, ItemRow, Lot, LotMeta, OriginClass, Quantity, SplitTransferRecord, TransferLedger,
    Week, WeekCalendar, WholeTransferRecord,
};

// 引擎
pub use engine::{ItemSweep, ReconcileError, ReconcileReport, Reconciler, ReconcilerOptions, TransferJournal};

// API
pub use api::{ApiError, ReconcileApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "周排产订单平衡系统";
