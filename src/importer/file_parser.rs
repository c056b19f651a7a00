// ==========================================
// 周排产订单平衡系统 - 文件解析器实现
// ==========================================
// 阶段 0: 文件读取与解析 → 原始表（表头 + 行）
// 支持: Excel (.xlsx/.xls, 可指定工作表) / CSV (.csv)
// 表头上方的标题行由 TableSource.header_row 跳过
// ==========================================

use crate::config::TableSource;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// 原始数据行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// 源表行号（从 1 开始）
    pub line: usize,
    pub cells: HashMap<String, String>,
}

impl RawRow {
    /// 单元格值（列不存在时为空串）
    pub fn get(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or("")
    }
}

/// 原始表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn require_column(&self, column: &str) -> ImportResult<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(ImportError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
        }
    }
}

/// 文件解析接口
pub trait FileParser {
    fn parse_table(&self, source: &TableSource) -> ImportResult<RawTable>;
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_table(&self, source: &TableSource) -> ImportResult<RawTable> {
        let path = source.path.as_path();
        check_exists(path)?;

        // 检查扩展名
        if extension(path) != "csv" {
            return Err(ImportError::UnsupportedFormat(extension(path)));
        }

        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let name = table_name(source);
        let mut records = reader.records().skip(source.header_row);

        // 表头
        let header = records
            .next()
            .ok_or_else(|| ImportError::HeaderRowMissing {
                table: name.clone(),
                header_row: source.header_row,
            })??;
        let headers: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

        // 数据行
        let mut rows = Vec::new();
        for result in records {
            let record = result?;
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or_default();
            push_row(&mut rows, &headers, line, record.iter().map(str::to_string));
        }

        Ok(RawTable { name, headers, rows })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_table(&self, source: &TableSource) -> ImportResult<RawTable> {
        let path = source.path.as_path();
        check_exists(path)?;

        let ext = extension(path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(path)?;

        // 指定工作表，未指定时取第一个
        let sheet_names = workbook.sheet_names();
        let sheet_name = match &source.sheet {
            Some(sheet) if sheet_names.iter().any(|s| s == sheet) => sheet.clone(),
            Some(sheet) => return Err(ImportError::SheetNotFound(sheet.clone())),
            None => sheet_names
                .first()
                .cloned()
                .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?,
        };

        let range = workbook.worksheet_range(&sheet_name)?;
        let name = table_name(source);

        // Range 从第一个非空单元格开始，需换算绝对行号
        let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
        let skip = source.header_row.saturating_sub(first_row);
        let mut rows_iter = range.rows().enumerate().skip(skip);

        let header_row = rows_iter
            .next()
            .map(|(_, row)| row)
            .ok_or_else(|| ImportError::HeaderRowMissing {
                table: name.clone(),
                header_row: source.header_row,
            })?;
        let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();

        let mut rows = Vec::new();
        for (offset, data_row) in rows_iter {
            let line = first_row + offset + 1;
            push_row(&mut rows, &headers, line, data_row.iter().map(cell_to_string));
        }

        Ok(RawTable { name, headers, rows })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_table(&self, source: &TableSource) -> ImportResult<RawTable> {
        match extension(&source.path).as_str() {
            "csv" => CsvParser.parse_table(source),
            "xlsx" | "xls" => ExcelParser.parse_table(source),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn check_exists(path: &Path) -> ImportResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ImportError::FileNotFound(path.display().to_string()))
    }
}

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

fn table_name(source: &TableSource) -> String {
    match &source.sheet {
        Some(sheet) => sheet.clone(),
        None => source
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
    }
}

/// 日期单元格统一输出为 Excel 序列号，由导入器解析
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

fn push_row(
    rows: &mut Vec<RawRow>,
    headers: &[String],
    line: usize,
    values: impl Iterator<Item = String>,
) {
    let mut cells = HashMap::new();
    for (header, value) in headers.iter().zip(values) {
        if !header.is_empty() {
            cells.insert(header.clone(), value.trim().to_string());
        }
    }

    // 跳过完全空白的行
    if cells.values().all(|v| v.is_empty()) {
        return;
    }
    rows.push(RawRow { line, cells });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_csv_parser_skips_title_rows() {
        let file = csv_file(&["Orders report", "Id_125, Заказ ,План", "E1,A-1,5", "E1,A-2,3"]);
        let source = TableSource::new(file.path(), None, 1);

        let table = CsvParser.parse_table(&source).unwrap();
        assert_eq!(table.headers, vec!["Id_125", "Заказ", "План"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("Заказ"), "A-1");
        assert_eq!(table.rows[0].line, 3);
        assert_eq!(table.rows[1].get("missing"), "");
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let file = csv_file(&["a,b", "1,2", ",", "3,4"]);
        let table = CsvParser.parse_table(&TableSource::new(file.path(), None, 0)).unwrap();
        assert_eq!(table.rows.len(), 2);
    }

    #[test]
    fn test_missing_file_and_header() {
        let missing = TableSource::new("non_existent.csv", None, 0);
        assert!(matches!(
            UniversalFileParser.parse_table(&missing),
            Err(ImportError::FileNotFound(_))
        ));

        let file = csv_file(&["only one line"]);
        let result = CsvParser.parse_table(&TableSource::new(file.path(), None, 3));
        assert!(matches!(result, Err(ImportError::HeaderRowMissing { header_row: 3, .. })));
    }

    #[test]
    fn test_require_column() {
        let file = csv_file(&["a,b", "1,2"]);
        let table = CsvParser.parse_table(&TableSource::new(file.path(), None, 0)).unwrap();
        assert!(table.require_column("a").is_ok());
        assert!(matches!(
            table.require_column("c"),
            Err(ImportError::MissingColumn { .. })
        ));
    }
}
