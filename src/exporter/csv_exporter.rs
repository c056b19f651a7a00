// ==========================================
// 周排产订单平衡系统 - 转移台账 CSV 导出
// ==========================================
// 输出文件:
// - <whole_file_name>.csv                 整批转移
// - <split_file_name>(iter-<k>).csv       拆分转移第 k 次迭代
// - <split_file_name>(resolved).csv       已完全分配的碎片（非空时）
// 导出前删除同名前缀的旧拆分文件
// 编码: origin_class 1=外部 2=内部；日期 DD.MM.YYYY
// ==========================================

use crate::domain::transfer::{SplitTransferRecord, TransferLedger, WholeTransferRecord};
use crate::engine::iterations::split_into_iterations;
use crate::exporter::error::{ExportError, ExportResult};
use chrono::NaiveDate;
use csv::Writer;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 日期输出格式
pub const DATE_FORMAT: &str = "%d.%m.%Y";

// CSV 表头
const WHOLE_HEADER: &[&str] = &[
    "item_id",
    "total_quantity",
    "origin_class",
    "lot_id",
    "from_date",
    "to_date",
];

const SPLIT_HEADER: &[&str] = &[
    "item_id",
    "lot_id",
    "lot_total_quantity",
    "from_date",
    "moved_quantity",
    "to_date",
];

/// 导出摘要
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub files: Vec<PathBuf>,
    pub whole_rows: usize,
    pub split_rows: usize,
    pub iterations: usize,
    pub resolved_rows: usize,
}

// ==========================================
// CsvLedgerExporter
// ==========================================
pub struct CsvLedgerExporter {
    output_dir: PathBuf,
    whole_file_name: String,
    split_file_name: String,
}

impl CsvLedgerExporter {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        whole_file_name: impl Into<String>,
        split_file_name: impl Into<String>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            whole_file_name: whole_file_name.into(),
            split_file_name: split_file_name.into(),
        }
    }

    pub fn whole_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.csv", self.whole_file_name))
    }

    pub fn iteration_path(&self, iteration: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}(iter-{}).csv", self.split_file_name, iteration))
    }

    pub fn resolved_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}(resolved).csv", self.split_file_name))
    }

    /// 导出整表台账
    pub fn export(&self, ledger: &TransferLedger) -> ExportResult<ExportSummary> {
        fs::create_dir_all(&self.output_dir).map_err(|e| ExportError::CreateDirError {
            path: self.output_dir.display().to_string(),
            message: e.to_string(),
        })?;
        self.remove_stale_split_files()?;

        let mut summary = ExportSummary {
            whole_rows: ledger.whole.len(),
            split_rows: ledger.split.len(),
            ..ExportSummary::default()
        };

        let whole_path = self.whole_path();
        write_whole(create_file(&whole_path)?, &ledger.whole)?;
        summary.files.push(whole_path);

        let grouped = split_into_iterations(&ledger.split);
        for (iteration, records) in grouped.iterations.iter().enumerate() {
            let path = self.iteration_path(iteration);
            write_split(create_file(&path)?, records)?;
            summary.files.push(path);
        }
        summary.iterations = grouped.iterations.len();

        if !grouped.resolved.is_empty() {
            let path = self.resolved_path();
            write_split(create_file(&path)?, &grouped.resolved)?;
            summary.files.push(path);
            summary.resolved_rows = grouped.resolved.len();
        }

        info!(
            output_dir = %self.output_dir.display(),
            files = summary.files.len(),
            whole = summary.whole_rows,
            split = summary.split_rows,
            "转移台账已导出"
        );
        Ok(summary)
    }

    /// 清除上次运行留下的拆分文件（迭代数可能变少，resolved 可能为空）
    fn remove_stale_split_files(&self) -> ExportResult<()> {
        let iter_prefix = format!("{}(iter-", self.split_file_name);
        let resolved_name = format!("{}(resolved).csv", self.split_file_name);

        for entry in fs::read_dir(&self.output_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let stale = name == resolved_name
                || (name.starts_with(&iter_prefix) && name.ends_with(").csv"));
            if stale && entry.file_type()?.is_file() {
                let path = entry.path();
                fs::remove_file(&path).map_err(|e| ExportError::FileWriteError {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                debug!(path = %path.display(), "删除旧拆分文件");
            }
        }
        Ok(())
    }
}

fn create_file(path: &Path) -> ExportResult<File> {
    File::create(path).map_err(|e| ExportError::FileWriteError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 写整批转移
pub fn write_whole<W: Write>(writer: W, records: &[WholeTransferRecord]) -> ExportResult<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(WHOLE_HEADER)?;
    for record in records {
        wtr.write_record([
            record.item_id.clone(),
            record.total_quantity.to_string(),
            record.origin_class.code().to_string(),
            record.lot_id.clone(),
            format_date(record.from_date),
            format_date(record.to_date),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// 写拆分转移
pub fn write_split<W: Write>(writer: W, records: &[SplitTransferRecord]) -> ExportResult<()> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(SPLIT_HEADER)?;
    for record in records {
        wtr.write_record([
            record.item_id.clone(),
            record.lot_id.clone(),
            record.lot_total_quantity.to_string(),
            format_date(record.from_date),
            record.moved_quantity.to_string(),
            format_date(record.to_date),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}
