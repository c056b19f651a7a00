// ==========================================
// 周排产订单平衡系统 - 平衡运行仓储
// ==========================================
// 职责: 管理 reconcile_run / whole_transfer / split_transfer 表
// 红线: 一次运行的表头与两类台账在同一事务中写入；读取按台账顺序 (seq)
// ==========================================

use crate::db::{configure_sqlite_connection, init_schema, open_sqlite_connection};
use crate::domain::transfer::{SplitTransferRecord, TransferLedger, WholeTransferRecord};
use crate::domain::types::OriginClass;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// 运行记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileRunEntity {
    pub run_id: String,
    pub started_at: NaiveDateTime,
    pub finished_at: NaiveDateTime,
    pub config_snapshot: String, // JSON
    pub item_count: usize,
    pub succeeded_count: usize,
    pub failure_count: usize,
}

pub struct TransferRunRepository {
    conn: Arc<Mutex<Connection>>,
}

impl TransferRunRepository {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建（重新应用 PRAGMA 并建表，均幂等）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        let repo = Self { conn };
        {
            let conn = repo.get_conn()?;
            configure_sqlite_connection(&conn)?;
            init_schema(&conn)?;
        }
        Ok(repo)
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存一次运行及其台账
    pub fn save_run(&self, run: &ReconcileRunEntity, ledger: &TransferLedger) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"INSERT INTO reconcile_run (
                   run_id, started_at, finished_at, config_snapshot,
                   item_count, succeeded_count, failure_count
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            params![
                &run.run_id,
                run.started_at,
                run.finished_at,
                &run.config_snapshot,
                run.item_count as i64,
                run.succeeded_count as i64,
                run.failure_count as i64,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"INSERT INTO whole_transfer (
                       run_id, seq, item_id, total_quantity, origin_class,
                       lot_id, from_date, to_date
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            )?;
            for (seq, record) in ledger.whole.iter().enumerate() {
                stmt.execute(params![
                    &run.run_id,
                    seq as i64,
                    &record.item_id,
                    record.total_quantity,
                    record.origin_class.to_string(),
                    &record.lot_id,
                    record.from_date,
                    record.to_date,
                ])?;
            }

            let mut stmt = tx.prepare(
                r#"INSERT INTO split_transfer (
                       run_id, seq, item_id, lot_id, lot_total_quantity,
                       from_date, moved_quantity, to_date
                   ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
            )?;
            for (seq, record) in ledger.split.iter().enumerate() {
                stmt.execute(params![
                    &run.run_id,
                    seq as i64,
                    &record.item_id,
                    &record.lot_id,
                    record.lot_total_quantity,
                    record.from_date,
                    record.moved_quantity,
                    record.to_date,
                ])?;
            }
        }

        tx.commit()?;
        debug!(
            run_id = %run.run_id,
            whole = ledger.whole.len(),
            split = ledger.split.len(),
            "运行记录已保存"
        );
        Ok(())
    }

    /// 按 run_id 查询运行记录
    pub fn find_run(&self, run_id: &str) -> RepositoryResult<Option<ReconcileRunEntity>> {
        let conn = self.get_conn()?;

        match conn.query_row(
            r#"SELECT run_id, started_at, finished_at, config_snapshot,
                      item_count, succeeded_count, failure_count
               FROM reconcile_run
               WHERE run_id = ?"#,
            params![run_id],
            map_run_row,
        ) {
            Ok(run) => Ok(Some(run)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 全部运行记录（最新在前）
    pub fn list_runs(&self) -> RepositoryResult<Vec<ReconcileRunEntity>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT run_id, started_at, finished_at, config_snapshot,
                      item_count, succeeded_count, failure_count
               FROM reconcile_run
               ORDER BY started_at DESC"#,
        )?;

        let runs = stmt
            .query_map([], map_run_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    /// 整批转移（台账顺序）
    pub fn find_whole_transfers(&self, run_id: &str) -> RepositoryResult<Vec<WholeTransferRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT item_id, total_quantity, origin_class, lot_id, from_date, to_date
               FROM whole_transfer
               WHERE run_id = ?
               ORDER BY seq"#,
        )?;

        let records = stmt
            .query_map(params![run_id], |row| {
                let raw_origin: String = row.get(2)?;
                let origin_class = OriginClass::parse_label(&raw_origin).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        Type::Text,
                        Box::new(RepositoryError::FieldValueError {
                            field: "origin_class".to_string(),
                            message: raw_origin.clone(),
                        }),
                    )
                })?;
                Ok(WholeTransferRecord {
                    item_id: row.get(0)?,
                    total_quantity: row.get(1)?,
                    origin_class,
                    lot_id: row.get(3)?,
                    from_date: row.get(4)?,
                    to_date: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 拆分转移（台账顺序）
    pub fn find_split_transfers(&self, run_id: &str) -> RepositoryResult<Vec<SplitTransferRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"SELECT item_id, lot_id, lot_total_quantity, from_date, moved_quantity, to_date
               FROM split_transfer
               WHERE run_id = ?
               ORDER BY seq"#,
        )?;

        let records = stmt
            .query_map(params![run_id], |row| {
                Ok(SplitTransferRecord {
                    item_id: row.get(0)?,
                    lot_id: row.get(1)?,
                    lot_total_quantity: row.get(2)?,
                    from_date: row.get(3)?,
                    moved_quantity: row.get(4)?,
                    to_date: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// 读取一次运行的完整台账
    pub fn load_ledger(&self, run_id: &str) -> RepositoryResult<TransferLedger> {
        Ok(TransferLedger {
            whole: self.find_whole_transfers(run_id)?,
            split: self.find_split_transfers(run_id)?,
        })
    }

    /// 删除运行记录（台账级联删除），返回是否存在
    pub fn delete_run(&self, run_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM reconcile_run WHERE run_id = ?", params![run_id])?;
        Ok(affected > 0)
    }
}

fn map_run_row(row: &rusqlite::Row) -> rusqlite::Result<ReconcileRunEntity> {
    Ok(ReconcileRunEntity {
        run_id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_snapshot: row.get(3)?,
        item_count: row.get::<_, i64>(4)? as usize,
        succeeded_count: row.get::<_, i64>(5)? as usize,
        failure_count: row.get::<_, i64>(6)? as usize,
    })
}
