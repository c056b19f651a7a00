// ==========================================
// 周排产订单平衡系统 - 导出层
// ==========================================
// 职责: 转移台账 → CSV 文件
// ==========================================

pub mod csv_exporter;
pub mod error;

// 重导出核心类型
pub use csv_exporter::{write_split, write_whole, CsvLedgerExporter, ExportSummary, DATE_FORMAT};
pub use error::{ExportError, ExportResult};
