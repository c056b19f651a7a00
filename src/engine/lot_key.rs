// ==========================================
// 周排产订单平衡系统 - 批次排序键
// ==========================================
// 批次名形如 "ЗК-12*...-3/2019":
// - num1: '*' 之前部分末尾的连续数字（从低位向高位扫描，遇非数字停止）
// - num2: 仅当名称含 '*' 时，取最后一个 '-' 之后、'/' 之前的部分整体解析为整数
// 无法解析的部分一律取 0
// 同周内按 (num1, num2) 升序，键相同时按批次名排序
// ==========================================

use std::cmp::Ordering;

const PRIMARY_SEPARATOR: char = '*';
const SECONDARY_SEPARATOR: char = '-';
const SUFFIX_SEPARATOR: char = '/';

/// 批次排序键
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LotKey {
    pub num1: u64,
    pub num2: u64,
}

impl LotKey {
    /// 从批次名解析排序键
    pub fn parse(lot_id: &str) -> Self {
        let mut parts = lot_id.split(PRIMARY_SEPARATOR);
        let head = parts.next().unwrap_or("");
        let has_primary = parts.next().is_some();

        let num2 = if has_primary {
            parse_num2(lot_id)
        } else {
            0
        };

        Self {
            num1: trailing_number(head),
            num2,
        }
    }
}

/// 末尾连续数字
fn trailing_number(text: &str) -> u64 {
    let start = text.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    text[start..].parse().unwrap_or(0)
}

fn parse_num2(lot_id: &str) -> u64 {
    let mut segments = lot_id.rsplit(SECONDARY_SEPARATOR);
    let last = segments.next().unwrap_or("");
    // 没有 '-' 时 rsplit 只返回整个字符串
    if segments.next().is_none() {
        return 0;
    }
    let prefix = last.split(SUFFIX_SEPARATOR).next().unwrap_or("");
    prefix.trim().parse().unwrap_or(0)
}

/// 同周内批次的全序: 先比较排序键，再比较批次名
pub fn compare_lots(a: &str, b: &str) -> Ordering {
    LotKey::parse(a)
        .cmp(&LotKey::parse(b))
        .then_with(|| a.cmp(b))
}

/// 按排序键升序排列批次名
pub fn sort_lot_ids<S: AsRef<str>>(ids: &mut [S]) {
    ids.sort_by(|a, b| compare_lots(a.as_ref(), b.as_ref()));
}
