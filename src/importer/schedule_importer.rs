// ==========================================
// 周排产订单平衡系统 - 排产表导入器
// ==========================================
// 三张源表 → 周日历 + 排产行:
// - 排产表: 每行一个产品，Gr<周号>/Pl<周号> 列，不平衡量 = Σ图表 − Σ计划
// - 日历表: 周号 → 日期
// - 订单表: 批次按交期落入对应周，同批次同周累加
// ==========================================

use crate::config::{ColumnNames, TableSource};
use crate::domain::schedule::{ItemRow, RowEditError, WeekCalendar};
use crate::domain::types::{Imbalance, OriginClass, Quantity};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{FileParser, RawRow, RawTable};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// 导入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedSchedule {
    pub calendar: WeekCalendar,
    /// 周索引 → 源表周号
    pub week_numbers: Vec<u32>,
    pub rows: Vec<ItemRow>,
    /// 产品不在排产表中的订单行数
    pub skipped_orders: usize,
}

/// 排产表中一个周列
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WeekColumnKind {
    Graph,
    Plan,
}

// ==========================================
// ScheduleImporter
// ==========================================
pub struct ScheduleImporter {
    columns: ColumnNames,
    strict_schedule_check: bool,
}

impl ScheduleImporter {
    pub fn new(columns: ColumnNames, strict_schedule_check: bool) -> Self {
        Self {
            columns,
            strict_schedule_check,
        }
    }

    /// 读取三张源表并构建排产输入
    #[instrument(skip_all)]
    pub fn import<P: FileParser>(
        &self,
        parser: &P,
        schedule: &TableSource,
        calendar: &TableSource,
        orders: &TableSource,
    ) -> ImportResult<ImportedSchedule> {
        let schedule_table = parser.parse_table(schedule)?;
        let calendar_table = parser.parse_table(calendar)?;
        let order_table = parser.parse_table(orders)?;
        self.import_tables(&schedule_table, &calendar_table, &order_table)
    }

    /// 由已解析的原始表构建排产输入
    pub fn import_tables(
        &self,
        schedule: &RawTable,
        calendar: &RawTable,
        orders: &RawTable,
    ) -> ImportResult<ImportedSchedule> {
        let week_columns = self.week_columns(schedule)?;
        let mut week_numbers: Vec<u32> = week_columns.values().map(|(no, _)| *no).collect();
        week_numbers.sort_unstable();
        week_numbers.dedup();

        let calendar = self.build_calendar(calendar, &week_numbers)?;
        let mut rows = self.build_rows(schedule, &week_columns, &week_numbers)?;

        if self.strict_schedule_check {
            let items: Vec<String> = rows
                .iter()
                .filter(|row| row.imbalance_sum() != 0)
                .map(|row| row.item_id.clone())
                .collect();
            if !items.is_empty() {
                return Err(ImportError::UnbalancedScheduleRows { items });
            }
        }

        let skipped_orders = self.place_orders(orders, &calendar, &mut rows)?;

        info!(
            weeks = calendar.len(),
            items = rows.len(),
            skipped_orders,
            "排产表导入完成"
        );
        Ok(ImportedSchedule {
            calendar,
            week_numbers,
            rows,
            skipped_orders,
        })
    }

    /// 识别 Gr/Pl 周列: 列名 → (周号, 类型)
    fn week_columns(&self, table: &RawTable) -> ImportResult<HashMap<String, (u32, WeekColumnKind)>> {
        table.require_column(&self.columns.schedule_item_id)?;

        let mut columns = HashMap::new();
        for header in &table.headers {
            let parsed = week_suffix(header, &self.columns.graph_prefix)
                .map(|no| (no, WeekColumnKind::Graph))
                .or_else(|| {
                    week_suffix(header, &self.columns.plan_prefix).map(|no| (no, WeekColumnKind::Plan))
                });
            if let Some(column) = parsed {
                columns.insert(header.clone(), column);
            }
        }

        if columns.is_empty() {
            return Err(ImportError::NoWeekColumns {
                graph_prefix: self.columns.graph_prefix.clone(),
                plan_prefix: self.columns.plan_prefix.clone(),
            });
        }
        Ok(columns)
    }

    fn build_calendar(&self, table: &RawTable, week_numbers: &[u32]) -> ImportResult<WeekCalendar> {
        let week_field = &self.columns.calendar_week;
        let date_field = &self.columns.calendar_date;
        table.require_column(week_field)?;
        table.require_column(date_field)?;

        let mut by_week: HashMap<u32, NaiveDate> = HashMap::new();
        for row in &table.rows {
            let raw_week = row.get(week_field);
            if raw_week.is_empty() {
                continue;
            }
            let week_no = parse_count(raw_week)
                .ok_or_else(|| conversion_error(table, row, week_field))?;
            let date = parse_date(row.get(date_field)).ok_or_else(|| ImportError::DateFormatError {
                table: table.name.clone(),
                row: row.line,
                field: date_field.clone(),
                value: row.get(date_field).to_string(),
            })?;
            if by_week.insert(week_no, date).is_some() {
                return Err(ImportError::DuplicateWeekNumber { week_no });
            }
        }

        let dates = week_numbers
            .iter()
            .map(|week_no| {
                by_week
                    .get(week_no)
                    .copied()
                    .ok_or(ImportError::MissingWeekDate { week_no: *week_no })
            })
            .collect::<ImportResult<Vec<_>>>()?;

        let calendar = WeekCalendar::new(dates);
        if !calendar.is_monotonic() {
            return Err(ImportError::CalendarNotMonotonic);
        }
        Ok(calendar)
    }

    fn build_rows(
        &self,
        table: &RawTable,
        week_columns: &HashMap<String, (u32, WeekColumnKind)>,
        week_numbers: &[u32],
    ) -> ImportResult<Vec<ItemRow>> {
        let index_of: HashMap<u32, usize> = week_numbers
            .iter()
            .enumerate()
            .map(|(index, no)| (*no, index))
            .collect();

        let mut rows = Vec::with_capacity(table.rows.len());
        for raw in &table.rows {
            let item_id = raw.get(&self.columns.schedule_item_id);
            if item_id.is_empty() {
                return Err(ImportError::PrimaryKeyMissing {
                    table: table.name.clone(),
                    row: raw.line,
                    field: self.columns.schedule_item_id.clone(),
                });
            }

            let mut row = ItemRow::new(item_id, week_numbers.len());
            for (column, (week_no, kind)) in week_columns {
                let value = parse_signed(raw.get(column))
                    .ok_or_else(|| conversion_error(table, raw, column))?;
                let delta = match kind {
                    WeekColumnKind::Graph => value,
                    WeekColumnKind::Plan => -value,
                };
                if let Some(week) = index_of.get(week_no) {
                    row.add_imbalance(*week, delta)
                        .map_err(|_| conversion_error(table, raw, column))?;
                }
            }
            rows.push(row);
        }
        Ok(rows)
    }

    /// 订单落周，返回跳过的订单行数
    fn place_orders(
        &self,
        table: &RawTable,
        calendar: &WeekCalendar,
        rows: &mut [ItemRow],
    ) -> ImportResult<usize> {
        let columns = &self.columns;
        for column in [
            &columns.order_item_id,
            &columns.order_lot_id,
            &columns.order_due_date,
            &columns.order_quantity,
            &columns.order_origin_class,
        ] {
            table.require_column(column)?;
        }

        // 产品 → 排产行（重复产品的每一行都放置，由平衡驱动拒绝重复）
        let mut by_item: HashMap<String, Vec<usize>> = HashMap::new();
        for (index, row) in rows.iter().enumerate() {
            by_item.entry(row.item_id.clone()).or_default().push(index);
        }

        let mut skipped = 0;
        for raw in &table.rows {
            let item_id = raw.get(&columns.order_item_id);
            let Some(targets) = by_item.get(item_id) else {
                debug!(row = raw.line, item_id, "订单产品不在排产表中，跳过");
                skipped += 1;
                continue;
            };

            let lot_id = raw.get(&columns.order_lot_id);
            if lot_id.is_empty() {
                return Err(ImportError::PrimaryKeyMissing {
                    table: table.name.clone(),
                    row: raw.line,
                    field: columns.order_lot_id.clone(),
                });
            }

            let raw_date = raw.get(&columns.order_due_date);
            let due_date = parse_date(raw_date).ok_or_else(|| ImportError::DateFormatError {
                table: table.name.clone(),
                row: raw.line,
                field: columns.order_due_date.clone(),
                value: raw_date.to_string(),
            })?;
            let week = calendar
                .week_of(due_date)
                .ok_or_else(|| ImportError::DateOutsideCalendar {
                    row: raw.line,
                    lot_id: lot_id.to_string(),
                    date: due_date.format("%d.%m.%Y").to_string(),
                })?;

            let quantity = parse_quantity(raw.get(&columns.order_quantity))
                .ok_or_else(|| conversion_error(table, raw, &columns.order_quantity))?;
            if quantity == 0 {
                continue;
            }

            let raw_origin = raw.get(&columns.order_origin_class);
            let origin_class =
                OriginClass::parse_label(raw_origin).ok_or_else(|| ImportError::InvalidOriginClass {
                    row: raw.line,
                    value: raw_origin.to_string(),
                })?;

            for index in targets {
                match rows[*index].place_lot(week, lot_id, quantity, origin_class) {
                    Ok(()) => {}
                    Err(RowEditError::WeekOutOfRange { .. }) => {
                        warn!(row = raw.line, week, "周索引越界，订单未放置");
                    }
                    Err(RowEditError::Overflow { .. }) => {
                        return Err(conversion_error(table, raw, &columns.order_quantity));
                    }
                }
            }
        }
        Ok(skipped)
    }
}

// ==========================================
// 单元格解析
// ==========================================

fn conversion_error(table: &RawTable, row: &RawRow, field: &str) -> ImportError {
    ImportError::TypeConversionError {
        table: table.name.clone(),
        row: row.line,
        field: field.to_string(),
        value: row.get(field).to_string(),
    }
}

/// 列名 "<前缀><周号>" → 周号
fn week_suffix(header: &str, prefix: &str) -> Option<u32> {
    header.strip_prefix(prefix)?.trim().parse().ok()
}

/// 整数或整值浮点数；空白为 0
pub fn parse_signed(value: &str) -> Option<Imbalance> {
    let value = value.trim();
    if value.is_empty() {
        return Some(0);
    }
    if let Ok(number) = value.parse::<i64>() {
        return Some(number);
    }
    let number: f64 = value.parse().ok()?;
    if number.fract() != 0.0 || !number.is_finite() || number.abs() > i64::MAX as f64 {
        return None;
    }
    Some(number as i64)
}

/// 非负数量；空白为 0
pub fn parse_quantity(value: &str) -> Option<Quantity> {
    parse_signed(value).and_then(|number| Quantity::try_from(number).ok())
}

fn parse_count(value: &str) -> Option<u32> {
    parse_quantity(value)
}

/// 日期解析
///
/// 支持: YYYY-MM-DD / YYYY-MM-DD HH:MM:SS / DD.MM.YYYY / Excel 序列号
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(value, "%d.%m.%Y").ok())
        .or_else(|| excel_serial_date(value))
}

/// Excel 序列号（1900 日期系统，含 1900-02-29 偏移）
fn excel_serial_date(value: &str) -> Option<NaiveDate> {
    let serial: f64 = value.parse().ok()?;
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}
