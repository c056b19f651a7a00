// ==========================================
// 周排产订单平衡系统 - 平衡运行 API
// ==========================================
// 流程: 导入 → 逐行平衡 → 导出 CSV → （可选）落库
// ==========================================

use crate::api::error::ApiResult;
use crate::config::ReconcileConfig;
use crate::engine::{ReconcileReport, Reconciler, ReconcilerOptions};
use crate::exporter::CsvLedgerExporter;
use crate::importer::{FileParser, ImportedSchedule, ScheduleImporter, UniversalFileParser};
use crate::repository::{ReconcileRunEntity, TransferRunRepository};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument};
use uuid::Uuid;

/// 失败行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFailureView {
    pub row_index: usize,
    pub item_id: String,
    pub message: String,
    /// 内部一致性故障（合法输入下不应出现）
    pub internal: bool,
}

/// 运行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileRunResponse {
    pub run_id: String,
    pub weeks: usize,
    pub items: usize,
    pub succeeded: usize,
    pub failures: Vec<RowFailureView>,
    pub skipped_orders: usize,
    pub whole_transfers: usize,
    pub split_transfers: usize,
    pub split_iterations: usize,
    pub resolved_fragments: usize,
    /// 推迟到交期之后的批次数
    pub carried_lots: usize,
    pub files: Vec<PathBuf>,
    pub persisted: bool,
    pub elapsed_ms: i64,
}

// ==========================================
// ReconcileApi
// ==========================================
pub struct ReconcileApi {
    config: ReconcileConfig,
}

impl ReconcileApi {
    pub fn new(config: ReconcileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// 按配置读取源表
    pub fn import(&self) -> ApiResult<ImportedSchedule> {
        self.import_with(&UniversalFileParser)
    }

    pub fn import_with<P: FileParser>(&self, parser: &P) -> ApiResult<ImportedSchedule> {
        let importer = ScheduleImporter::new(
            self.config.columns.clone(),
            self.config.strict_schedule_check,
        );
        Ok(importer.import(
            parser,
            &self.config.schedule,
            &self.config.calendar,
            &self.config.orders,
        )?)
    }

    /// 对已导入的排产表执行平衡
    pub fn reconcile(&self, imported: &ImportedSchedule) -> ApiResult<ReconcileReport> {
        let options = ReconcilerOptions {
            fail_fast: self.config.fail_fast,
            verify_journal: self.config.verify_journal,
        };
        Ok(Reconciler::new(imported.calendar.clone(), options).reconcile_all(&imported.rows)?)
    }

    /// 完整运行
    #[instrument(skip(self))]
    pub fn run(&self) -> ApiResult<ReconcileRunResponse> {
        let clock = Instant::now();
        let started_at = Utc::now().naive_utc();
        let run_id = Uuid::new_v4().to_string();

        let imported = self.import()?;
        let report = self.reconcile(&imported)?;

        let exporter = CsvLedgerExporter::new(
            &self.config.output_dir,
            &self.config.whole_file_name,
            &self.config.split_file_name,
        );
        let export = exporter.export(&report.ledger)?;

        let persisted = match &self.config.db_path {
            Some(db_path) => {
                let run = ReconcileRunEntity {
                    run_id: run_id.clone(),
                    started_at,
                    finished_at: Utc::now().naive_utc(),
                    config_snapshot: self.config.snapshot()?,
                    item_count: imported.rows.len(),
                    succeeded_count: report.outcomes.len(),
                    failure_count: report.failures.len(),
                };
                persist(db_path, &run, &report)?;
                true
            }
            None => false,
        };

        let response = ReconcileRunResponse {
            run_id,
            weeks: imported.calendar.len(),
            items: imported.rows.len(),
            succeeded: report.outcomes.len(),
            failures: report
                .failures
                .iter()
                .map(|f| RowFailureView {
                    row_index: f.row_index,
                    item_id: f.item_id.clone(),
                    message: f.error.to_string(),
                    internal: f.error.is_internal(),
                })
                .collect(),
            skipped_orders: imported.skipped_orders,
            whole_transfers: export.whole_rows,
            split_transfers: export.split_rows,
            split_iterations: export.iterations,
            resolved_fragments: export.resolved_rows,
            carried_lots: report.outcomes.iter().map(|o| o.carried_lots.len()).sum(),
            files: export.files,
            persisted,
            elapsed_ms: clock.elapsed().as_millis() as i64,
        };

        info!(
            run_id = %response.run_id,
            items = response.items,
            failed = response.failures.len(),
            elapsed_ms = response.elapsed_ms,
            "平衡运行完成"
        );
        Ok(response)
    }
}

fn persist(db_path: &Path, run: &ReconcileRunEntity, report: &ReconcileReport) -> ApiResult<()> {
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let repo = TransferRunRepository::new(&db_path.to_string_lossy())?;
    repo.save_run(run, &report.ledger)?;
    Ok(())
}
