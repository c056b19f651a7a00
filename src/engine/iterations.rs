// ==========================================
// 周排产订单平衡系统 - 拆分转移迭代视图
// ==========================================
// 导出前对拆分台账做纯展示分组（不改变台账）:
// - 按 (item_id, lot_id, lot_total_quantity, from_date) 分组，保持台账顺序
// - 组内第 1 个碎片 → 第 0 次迭代（原样）
// - 组内第 k 个碎片 → 第 k-1 次迭代，lot_total_quantity 扣除组内此前碎片数量
// - 若某个后续碎片的数量恰好等于扣减后的总量 → 归入 resolved（已完全分配）
// ==========================================

use crate::domain::transfer::SplitTransferRecord;
use crate::domain::types::Quantity;
use chrono::NaiveDate;
use std::collections::HashMap;

/// 分组后的拆分台账
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitIterations {
    pub iterations: Vec<Vec<SplitTransferRecord>>,
    pub resolved: Vec<SplitTransferRecord>,
}

#[derive(Hash, PartialEq, Eq)]
struct GroupKey {
    item_id: String,
    lot_id: String,
    lot_total_quantity: Quantity,
    from_date: NaiveDate,
}

struct GroupState {
    next_iteration: usize,
    consumed: Quantity,
}

/// 把拆分台账分成迭代
pub fn split_into_iterations(records: &[SplitTransferRecord]) -> SplitIterations {
    let mut result = SplitIterations::default();
    let mut groups: HashMap<GroupKey, GroupState> = HashMap::new();

    for record in records {
        let key = GroupKey {
            item_id: record.item_id.clone(),
            lot_id: record.lot_id.clone(),
            lot_total_quantity: record.lot_total_quantity,
            from_date: record.from_date,
        };

        match groups.get_mut(&key) {
            None => {
                push_iteration(&mut result.iterations, 0, record.clone());
                groups.insert(
                    key,
                    GroupState {
                        next_iteration: 1,
                        consumed: record.moved_quantity,
                    },
                );
            }
            Some(state) => {
                let mut row = record.clone();
                row.lot_total_quantity = record.lot_total_quantity.saturating_sub(state.consumed);
                state.consumed = state.consumed.saturating_add(record.moved_quantity);

                if row.moved_quantity == row.lot_total_quantity {
                    result.resolved.push(row);
                } else {
                    push_iteration(&mut result.iterations, state.next_iteration, row);
                    state.next_iteration += 1;
                }
            }
        }
    }

    result
}

fn push_iteration(iterations: &mut Vec<Vec<SplitTransferRecord>>, index: usize, row: SplitTransferRecord) {
    while iterations.len() <= index {
        iterations.push(Vec::new());
    }
    iterations[index].push(row);
}
