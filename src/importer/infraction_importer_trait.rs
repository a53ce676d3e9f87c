// ==========================================
// 学校纪律追踪系统 - 违纪导入 Trait
// ==========================================
// 职责: 定义违纪导入接口（不包含实现）
// ==========================================

use crate::domain::infraction::{
    DuplicateDecision, ImportOutcome, PeriodDiagnosticReport,
};
use crate::domain::types::{FaultType, ImportPhase};
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// ImportRequest - 一次上传的批次参数
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub fault_type: FaultType,
    pub trimester_id: String,
    // None: 预览（首次上传）；Some: 提交，未列出的 hash 视为 ignore
    pub decisions: Option<Vec<DuplicateDecision>>,
}

impl ImportRequest {
    pub fn preview(fault_type: FaultType, trimester_id: impl Into<String>) -> Self {
        Self {
            fault_type,
            trimester_id: trimester_id.into(),
            decisions: None,
        }
    }

    pub fn commit(
        fault_type: FaultType,
        trimester_id: impl Into<String>,
        decisions: Vec<DuplicateDecision>,
    ) -> Self {
        Self {
            fault_type,
            trimester_id: trimester_id.into(),
            decisions: Some(decisions),
        }
    }

    pub fn phase(&self) -> ImportPhase {
        match self.decisions {
            Some(_) => ImportPhase::Commit,
            None => ImportPhase::Preview,
        }
    }
}

// ==========================================
// InfractionImporter Trait
// ==========================================
// 用途: 违纪导入主接口
// 实现者: BatchReconciler
#[async_trait]
pub trait InfractionImporter: Send + Sync {
    /// 从 CSV 文件导入
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 行级错误包含在结果中
    /// - Err: 文件不存在 / 格式错误 / 学期不存在 等致命错误
    ///
    /// # 导入流程
    /// 1. 解析（分号分隔，表头去空白）
    /// 2. 逐行转换（失败记入 errors，继续）
    /// 3. 文件内重复检测
    /// 4. 按 hash 查询已存在记录，拆分新记录/重复记录
    /// 5. 新记录立即落库；重复记录按决定 update / ignore（预览阶段只返回）
    /// 6. 写入批次台账
    async fn import_file(
        &self,
        file_path: &Path,
        request: &ImportRequest,
    ) -> ImportResult<ImportOutcome>;

    /// 从上传内容导入
    async fn import_bytes(
        &self,
        file_name: Option<&str>,
        bytes: &[u8],
        request: &ImportRequest,
    ) -> ImportResult<ImportOutcome>;

    /// 按日期自动探测每行所属学期（只读诊断，不落库）
    async fn diagnose_periods(
        &self,
        file_path: &Path,
        school_year_id: Option<&str>,
    ) -> ImportResult<PeriodDiagnosticReport>;
}
