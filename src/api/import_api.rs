// ==========================================
// 学校纪律追踪系统 - 违纪导入API
// ==========================================
// 职责: 封装上传契约（文件 + faultType + trimesterId + duplicateHandling）
// 流程: 请求校验 → 组装 BatchReconciler → 预览或提交 → ImportOutcome
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::domain::infraction::{
    DuplicateHandling, ImportBatch, ImportOutcome, PeriodDiagnosticReport,
};
use crate::domain::types::FaultType;
use crate::importer::{BatchReconciler, ImportError, ImportRequest, InfractionImporter};
use crate::repository::{
    AcademicPeriodRepository, ImportBatchRepository, InfractionRepository, StudentRepository,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 批次台账默认返回条数
pub const DEFAULT_BATCH_LIST_LIMIT: usize = 20;
const MAX_BATCH_LIST_LIMIT: usize = 200;

/// 上传请求
///
/// 首次上传不带 duplicate_handling（预览）；
/// 第二次提交携带 `{action, duplicateHashes[]}`，未列出的 hash 一律 ignore
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportInfractionsRequest {
    pub file_path: String,
    pub fault_type: String,
    pub trimester_id: String,
    #[serde(default)]
    pub duplicate_handling: Option<DuplicateHandling>,
}

type SqliteReconciler = BatchReconciler<InfractionRepository, ConfigManager>;

/// 违纪导入API
pub struct ImportApi {
    conn: Arc<Mutex<Connection>>,
}

impl ImportApi {
    /// 创建新的ImportApi实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 导入违纪 CSV
    ///
    /// # 参数
    /// - request: 上传请求
    ///
    /// # 返回
    /// - Ok(ImportOutcome): 行级错误包含在结果中，success 恒为 true
    /// - Err(ApiError): 请求无效 / 文件无法读取 / 学期不存在
    pub async fn import_infractions(
        &self,
        request: ImportInfractionsRequest,
    ) -> ApiResult<ImportOutcome> {
        let import_request = Self::build_request(
            &request.fault_type,
            &request.trimester_id,
            request.duplicate_handling,
        )?;
        let reconciler = self.create_reconciler().await?;

        let outcome = reconciler
            .import_file(Path::new(&request.file_path), &import_request)
            .await?;

        info!(
            batch_id = %outcome.batch_id,
            phase = %outcome.phase,
            created = outcome.created,
            duplicates = outcome.duplicates.len(),
            errors = outcome.errors.len(),
            "导入请求完成"
        );
        Ok(outcome)
    }

    /// 导入上传内容（multipart 表单中的文件字节）
    pub async fn import_infractions_bytes(
        &self,
        file_name: Option<&str>,
        bytes: &[u8],
        fault_type: &str,
        trimester_id: &str,
        duplicate_handling: Option<DuplicateHandling>,
    ) -> ApiResult<ImportOutcome> {
        if let Some(name) = file_name {
            let is_csv = Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
            if !is_csv {
                return Err(ImportError::UnsupportedFormat(name.to_string()).into());
            }
        }

        let import_request = Self::build_request(fault_type, trimester_id, duplicate_handling)?;
        let reconciler = self.create_reconciler().await?;
        Ok(reconciler
            .import_bytes(file_name, bytes, &import_request)
            .await?)
    }

    /// 按日期诊断每行所属学期（不落库）
    pub async fn diagnose_periods(
        &self,
        file_path: &str,
        school_year_id: Option<&str>,
    ) -> ApiResult<PeriodDiagnosticReport> {
        let reconciler = self.create_reconciler().await?;
        Ok(reconciler
            .diagnose_periods(Path::new(file_path), school_year_id)
            .await?)
    }

    /// 列出最近的导入批次
    pub fn list_import_batches(&self, limit: Option<usize>) -> ApiResult<Vec<ImportBatch>> {
        let limit = limit
            .unwrap_or(DEFAULT_BATCH_LIST_LIMIT)
            .clamp(1, MAX_BATCH_LIST_LIMIT);
        let repo = ImportBatchRepository::from_connection(self.conn.clone());
        Ok(repo.list_recent(limit)?)
    }

    /// 校验并组装批次参数
    fn build_request(
        fault_type: &str,
        trimester_id: &str,
        duplicate_handling: Option<DuplicateHandling>,
    ) -> ApiResult<ImportRequest> {
        let fault_type = FaultType::from_str(fault_type)
            .ok_or_else(|| ApiError::from(ImportError::InvalidFaultType(fault_type.to_string())))?;

        let trimester_id = trimester_id.trim();
        if trimester_id.is_empty() {
            return Err(ApiError::InvalidInput("trimesterId 不能为空".to_string()));
        }

        Ok(match duplicate_handling {
            Some(handling) => {
                ImportRequest::commit(fault_type, trimester_id, handling.into_decisions())
            }
            None => ImportRequest::preview(fault_type, trimester_id),
        })
    }

    /// 组装导入器（学生自动创建开关按当次配置决定）
    async fn create_reconciler(&self) -> ApiResult<SqliteReconciler> {
        let config = ConfigManager::from_connection(self.conn.clone())
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        let auto_create = match config.get_auto_create_students().await {
            Ok(flag) => flag,
            Err(e) => {
                warn!(error = %e, "读取 auto_create_students 失败，使用默认值 true");
                true
            }
        };

        let store = InfractionRepository::from_connection(self.conn.clone());
        let students =
            StudentRepository::from_connection(self.conn.clone()).with_auto_create(auto_create);
        let periods = AcademicPeriodRepository::from_connection(self.conn.clone());
        let ledger = ImportBatchRepository::from_connection(self.conn.clone());

        Ok(
            BatchReconciler::new(store, config, Box::new(students), Box::new(periods))
                .with_ledger(Box::new(ledger)),
        )
    }
}
