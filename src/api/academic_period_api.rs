// ==========================================
// 学校纪律追踪系统 - 学年/学期 API
// ==========================================
// 职责: 学期区间查询、按日期探测学期、学年/学期初始化
// 说明: 按日期探测仅用于诊断，导入时一律使用上传人员选定的学期
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::period::{AcademicPeriod, SchoolYear, Trimester};
use crate::importer::{PeriodResolutionError, PeriodResolver};
use crate::repository::{AcademicPeriodRepository, AcademicPeriodSource};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

pub struct AcademicPeriodApi {
    period_repo: AcademicPeriodRepository,
}

impl AcademicPeriodApi {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            period_repo: AcademicPeriodRepository::from_connection(conn),
        }
    }

    /// 列出学期区间（按开始日期排序）
    pub async fn list_academic_periods(
        &self,
        school_year_id: Option<&str>,
    ) -> ApiResult<Vec<AcademicPeriod>> {
        Ok(self.period_repo.list_academic_periods(school_year_id).await?)
    }

    /// 按日期探测所属学期
    ///
    /// # 参数
    /// - date: 日期
    /// - school_year_id: 限定学年；None 时使用激活学年，无激活学年则搜索全部
    ///
    /// # 返回
    /// - Err(NotFound): 没有学期覆盖该日期
    /// - Err(BusinessRuleViolation): 学期区间重叠（配置错误）
    pub async fn detect_academic_period(
        &self,
        date: NaiveDate,
        school_year_id: Option<&str>,
    ) -> ApiResult<AcademicPeriod> {
        let scope = match school_year_id {
            Some(id) => Some(id.to_string()),
            None => self.period_repo.find_active_school_year_id()?,
        };
        let periods = self
            .period_repo
            .list_academic_periods(scope.as_deref())
            .await?;
        debug!(date = %date, candidates = periods.len(), "按日期探测学期");

        match PeriodResolver::resolve(date, &periods) {
            Ok(period) => Ok(period.clone()),
            Err(e @ PeriodResolutionError::NotCovered { .. }) => {
                Err(ApiError::NotFound(e.to_string()))
            }
            Err(e @ PeriodResolutionError::Ambiguous { .. }) => {
                Err(ApiError::BusinessRuleViolation(e.to_string()))
            }
        }
    }

    /// 创建学年及其三个学期（单次提交）
    ///
    /// # 校验
    /// - 恰好 3 个学期，均归属该学年
    /// - 按 order 排序后首尾相接：后一学期开始日 = 前一学期结束日的次日
    pub fn create_school_year_with_trimesters(
        &self,
        year: &SchoolYear,
        trimesters: &[Trimester],
    ) -> ApiResult<()> {
        if trimesters.len() != 3 {
            return Err(ApiError::InvalidInput(format!(
                "学年应包含 3 个学期，实际 {} 个",
                trimesters.len()
            )));
        }
        if let Some(foreign) = trimesters
            .iter()
            .find(|t| t.school_year_id != year.school_year_id)
        {
            return Err(ApiError::InvalidInput(format!(
                "学期 {} 归属学年 {}，应为 {}",
                foreign.trimester_id, foreign.school_year_id, year.school_year_id
            )));
        }

        let mut sorted: Vec<Trimester> = trimesters.to_vec();
        sorted.sort_by_key(|t| t.order);
        for pair in sorted.windows(2) {
            if pair[0].end_date >= pair[1].start_date {
                return Err(ApiError::InvalidInput(format!(
                    "学期区间重叠: {} 与 {}",
                    pair[0].name, pair[1].name
                )));
            }
            if pair[0].end_date.succ_opt() != Some(pair[1].start_date) {
                return Err(ApiError::InvalidInput(format!(
                    "学期区间不连续: {} 结束于 {}，{} 开始于 {}",
                    pair[0].name, pair[0].end_date, pair[1].name, pair[1].start_date
                )));
            }
        }

        self.period_repo
            .create_school_year_with_trimesters(year, &sorted)?;

        info!(school_year_id = %year.school_year_id, "学年与学期已创建");
        Ok(())
    }
}
