// ==========================================
// 周排产订单平衡系统 - 导入层
// ==========================================
// 职责: 源表（Excel/CSV）→ 周日历 + 排产行
// ==========================================

pub mod error;
pub mod file_parser;
pub mod schedule_importer;

// 重导出核心类型
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRow, RawTable, UniversalFileParser};
pub use schedule_importer::{parse_date, parse_quantity, parse_signed, ImportedSchedule, ScheduleImporter};
