// ==========================================
// 学校纪律追踪系统 - 学期归属解析
// ==========================================
// 规则: start_date <= date <= end_date（两端均包含）
// 红线: 不假设输入有序；0 个或多个命中都要如实报告，不擅自挑选
// 用途: 仅用于诊断与学期探测，导入路径使用上传人员选定的学期
// ==========================================

use crate::domain::period::AcademicPeriod;
use crate::importer::error::PeriodResolutionError;
use chrono::NaiveDate;

pub struct PeriodResolver;

impl PeriodResolver {
    /// 查找覆盖 date 的学期
    ///
    /// # 返回
    /// - Ok(&AcademicPeriod): 恰好一个学期覆盖
    /// - Err(NotCovered): 没有学期覆盖
    /// - Err(Ambiguous): 多个学期覆盖（候选按输入顺序列出）
    pub fn resolve(
        date: NaiveDate,
        periods: &[AcademicPeriod],
    ) -> Result<&AcademicPeriod, PeriodResolutionError> {
        let matches: Vec<&AcademicPeriod> = periods.iter().filter(|p| p.contains(date)).collect();

        match matches.as_slice() {
            [] => Err(PeriodResolutionError::NotCovered { date }),
            [single] => Ok(single),
            many => Err(PeriodResolutionError::Ambiguous {
                date,
                candidates: many.iter().map(|p| p.trimester_id.clone()).collect(),
            }),
        }
    }
}
