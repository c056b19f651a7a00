// ==========================================
// 周排产订单平衡系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 行号均为源表中的行号（从 1 开始，含表头上方的标题行）
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    #[error("工作表不存在: {0}")]
    SheetNotFound(String),

    #[error("表头行缺失 ({table}): 跳过 {header_row} 行后无数据")]
    HeaderRowMissing { table: String, header_row: usize },

    // ===== 数据映射错误 =====
    #[error("缺少列 ({table}): {column}")]
    MissingColumn { table: String, column: String },

    #[error("排产表没有周列（前缀 {graph_prefix}/{plan_prefix}）")]
    NoWeekColumns {
        graph_prefix: String,
        plan_prefix: String,
    },

    #[error("主键缺失 ({table}, 行 {row}): {field} 为空")]
    PrimaryKeyMissing {
        table: String,
        row: usize,
        field: String,
    },

    #[error("类型转换失败 ({table}, 行 {row}, 字段 {field}): 期望非负整数，实际 {value}")]
    TypeConversionError {
        table: String,
        row: usize,
        field: String,
        value: String,
    },

    #[error("日期格式错误 ({table}, 行 {row}, 字段 {field}): {value}")]
    DateFormatError {
        table: String,
        row: usize,
        field: String,
        value: String,
    },

    #[error("订单来源无法识别 (行 {row}): {value}")]
    InvalidOriginClass { row: usize, value: String },

    // ===== 日历错误 =====
    #[error("周 {week_no} 在日历表中没有日期")]
    MissingWeekDate { week_no: u32 },

    #[error("日历表中周号重复: {week_no}")]
    DuplicateWeekNumber { week_no: u32 },

    #[error("日历日期未按周号递增")]
    CalendarNotMonotonic,

    #[error("订单交期不在日历内 (行 {row}, lot={lot_id}): {date}")]
    DateOutsideCalendar {
        row: usize,
        lot_id: String,
        date: String,
    },

    // ===== 数据质量错误 =====
    #[error("排产表图表与计划合计不一致: {items:?}")]
    UnbalancedScheduleRows { items: Vec<String> },
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
