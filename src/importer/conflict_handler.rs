// ==========================================
// 学校纪律追踪系统 - 冲突处理器
// ==========================================
// 职责: 检测同一文件内重复 hash；组装与库中记录冲突的重复项
// ==========================================

use crate::domain::infraction::{DuplicateRecord, InfractionRecord, TransformedRow};
use std::collections::HashMap;

pub struct ConflictHandler;

impl ConflictHandler {
    /// 拆分同一文件内的重复 hash
    ///
    /// # 返回
    /// - (首次出现的行, [(重复行, 首次出现行号)])
    pub fn split_in_file_duplicates(
        rows: Vec<TransformedRow>,
    ) -> (Vec<TransformedRow>, Vec<(TransformedRow, usize)>) {
        let mut first_occurrence: HashMap<String, usize> = HashMap::new();
        let mut unique = Vec::with_capacity(rows.len());
        let mut duplicates = Vec::new();

        for row in rows {
            match first_occurrence.get(&row.record.hash) {
                Some(&first_row) => duplicates.push((row, first_row)),
                None => {
                    first_occurrence.insert(row.record.hash.clone(), row.row_number);
                    unique.push(row);
                }
            }
        }

        (unique, duplicates)
    }

    /// 组装跨批次重复项（库中版本 + 新解析版本）
    pub fn describe_duplicate(row: &TransformedRow, existing: InfractionRecord) -> DuplicateRecord {
        let has_changes = existing.differs_from(&row.record);
        DuplicateRecord {
            hash: row.record.hash.clone(),
            row_number: row.row_number,
            existing,
            incoming: row.record.clone(),
            has_changes,
        }
    }
}
