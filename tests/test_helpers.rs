// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 构造排产行/日历、临时 CSV 源表、临时数据库
// ==========================================

#![allow(dead_code)]

use chrono::{Duration, NaiveDate};
use schedule_reconcile::domain::{ItemRow, OriginClass, Quantity, Week, WeekCalendar};
use schedule_reconcile::engine::TransferJournal;
use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// 第 0 周日期（周五）
pub fn first_friday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 3, 1).unwrap()
}

/// 连续 weeks 个周五的日历
pub fn calendar(weeks: usize) -> WeekCalendar {
    WeekCalendar::new(
        (0..weeks)
            .map(|w| first_friday() + Duration::weeks(w as i64))
            .collect(),
    )
}

/// 构造排产行（批次来源均为外部）
pub fn row(item_id: &str, imbalance: &[i64], lots: &[(Week, &str, Quantity)]) -> ItemRow {
    let mut row = ItemRow::new(item_id, imbalance.len());
    for (week, value) in imbalance.iter().enumerate() {
        row.add_imbalance(week, *value).unwrap();
    }
    for (week, lot_id, quantity) in lots {
        row.place_lot(*week, lot_id, *quantity, OriginClass::External).unwrap();
    }
    row
}

/// 排产行的起始周台账（去掉 0 数量）
pub fn initial_weeks(row: &ItemRow) -> Vec<BTreeMap<String, Quantity>> {
    row.week_lots
        .iter()
        .map(|week| {
            week.iter()
                .filter(|(_, q)| **q > 0)
                .map(|(id, q)| (id.clone(), *q))
                .collect()
        })
        .collect()
}

/// 起始状态 + 台账回放
pub fn replay(row: &ItemRow, journal: &TransferJournal) -> Vec<BTreeMap<String, Quantity>> {
    let mut weeks = initial_weeks(row);
    journal.replay_onto(&row.item_id, &mut weeks).unwrap();
    weeks
}

/// 各批次在所有周的合计
pub fn lot_totals(weeks: &[BTreeMap<String, Quantity>]) -> BTreeMap<String, u64> {
    let mut totals = BTreeMap::new();
    for week in weeks {
        for (id, q) in week {
            *totals.entry(id.clone()).or_insert(0u64) += u64::from(*q);
        }
    }
    totals
}

/// 写一个 CSV 源表
pub fn write_csv(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

/// 创建临时测试数据库文件
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("非 UTF-8 路径")?.to_string();
    Ok((temp_file, db_path))
}
