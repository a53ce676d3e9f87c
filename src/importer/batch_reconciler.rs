// ==========================================
// 学校纪律追踪系统 - 批次核对器
// ==========================================
// 职责: 驱动整次导入，从文件到数据库
// 状态: 解析 → 转换 → 重复检测 → {等待决定 | 提交} → 完成
// 流程: 解析 → 逐行转换 → 文件内重复 → 按 hash 查库 → 新记录落库
//       → 重复记录返回（预览）或按决定 update/ignore（提交）→ 台账
// 红线: 单行失败只记录 ProcessingError，批次继续
// 红线: 未被点名的重复 hash 一律 ignore，永不静默覆盖
// 红线: hash 唯一约束冲突视为"并发变成了重复"，记为行错误
// ==========================================

use crate::config::{config_keys, ImportConfigReader};
use crate::domain::infraction::{
    DuplicateRecord, ImportBatch, ImportOutcome, PeriodDiagnosticReport, PeriodDiagnosticRow,
    ProcessingError, ProcessingErrorKind, TransformedRow,
};
use crate::domain::period::AcademicPeriod;
use crate::domain::types::{DuplicateAction, ImportPhase};
use crate::importer::conflict_handler::ConflictHandler;
use crate::importer::error::{
    row_message, ImportError, ImportResult, PeriodResolutionError, RowRejection,
    RowValidationError,
};
use crate::importer::file_parser::{CsvParser, ParsedCsv};
use crate::importer::infraction_importer_trait::{ImportRequest, InfractionImporter};
use crate::importer::period_resolver::PeriodResolver;
use crate::importer::row_transformer::{
    columns, parse_date_column, RowTransformer, RowView, TransformContext,
};
use crate::repository::infraction_import_repo::{
    AcademicPeriodSource, ImportBatchLedger, InfractionStore, StudentResolver,
};
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 单次导入读取的配置
struct ImportSettings {
    delimiter: u8,
    max_upload_bytes: u64,
    locale: String,
}

/// 重复检测结果
struct DuplicateCheck {
    fresh: Vec<TransformedRow>,
    duplicates: Vec<(TransformedRow, DuplicateRecord)>,
}

/// 累计计数
#[derive(Default)]
struct Tally {
    created: usize,
    updated: usize,
    ignored: usize,
}

// ==========================================
// BatchReconciler - 批次核对器
// ==========================================
pub struct BatchReconciler<S, C>
where
    S: InfractionStore,
    C: ImportConfigReader,
{
    // 数据访问层
    store: S,

    // 配置读取器
    config: C,

    // 协作者
    students: Box<dyn StudentResolver>,
    periods: Box<dyn AcademicPeriodSource>,
    ledger: Option<Box<dyn ImportBatchLedger>>,
}

impl<S, C> BatchReconciler<S, C>
where
    S: InfractionStore,
    C: ImportConfigReader,
{
    /// 创建新的 BatchReconciler 实例
    ///
    /// # 参数
    /// - store: 违纪记录存储
    /// - config: 配置读取器
    /// - students: 学生查找/创建
    /// - periods: 学期区间来源
    pub fn new(
        store: S,
        config: C,
        students: Box<dyn StudentResolver>,
        periods: Box<dyn AcademicPeriodSource>,
    ) -> Self {
        Self {
            store,
            config,
            students,
            periods,
            ledger: None,
        }
    }

    /// 附加批次台账
    pub fn with_ledger(mut self, ledger: Box<dyn ImportBatchLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    async fn load_settings(&self) -> ImportResult<ImportSettings> {
        let delimiter = self
            .config
            .get_csv_delimiter()
            .await
            .map_err(|e| config_error(config_keys::CSV_DELIMITER, e.to_string()))?;
        let max_upload_bytes = self
            .config
            .get_max_upload_bytes()
            .await
            .map_err(|e| config_error(config_keys::MAX_UPLOAD_BYTES, e.to_string()))?;
        let locale = self
            .config
            .get_ui_locale()
            .await
            .map_err(|e| config_error(config_keys::UI_LOCALE, e.to_string()))?;

        Ok(ImportSettings {
            delimiter,
            max_upload_bytes,
            locale,
        })
    }

    /// 解析上传内容（超过上限或结构无法解析即为致命错误）
    fn parse_upload(&self, bytes: &[u8], settings: &ImportSettings) -> ImportResult<ParsedCsv> {
        if bytes.len() as u64 > settings.max_upload_bytes {
            let max = settings.max_upload_bytes.to_string();
            return Err(ImportError::FileFormatError(crate::i18n::t_in(
                &settings.locale,
                "import.file_too_large",
                &[("max", &max)],
            )));
        }
        CsvParser::with_delimiter(settings.delimiter).parse_bytes(bytes)
    }

    async fn find_target_period(&self, trimester_id: &str) -> ImportResult<AcademicPeriod> {
        self.periods
            .find_period(trimester_id)
            .await?
            .ok_or_else(|| ImportError::TrimesterNotFound(trimester_id.to_string()))
    }

    /// 逐行转换；失败行记入 errors
    async fn transform_rows(
        &self,
        parsed: &ParsedCsv,
        ctx: &TransformContext,
        locale: &str,
        errors: &mut Vec<ProcessingError>,
    ) -> Vec<TransformedRow> {
        let mut transformed = Vec::with_capacity(parsed.rows.len());

        for row in &parsed.rows {
            match RowTransformer::transform(row, ctx, self.students.as_ref()).await {
                Ok(record) => transformed.push(TransformedRow {
                    row_number: row.row_number,
                    record,
                    raw: row.fields.clone(),
                }),
                Err(e) => {
                    warn!(row_number = row.row_number, error = %e, "行转换失败");
                    errors.push(row_error(locale, &e, &row.fields));
                }
            }
        }

        transformed
    }

    /// 按 hash 查库，拆分新记录与重复记录
    async fn check_duplicates(
        &self,
        rows: Vec<TransformedRow>,
        locale: &str,
        errors: &mut Vec<ProcessingError>,
    ) -> DuplicateCheck {
        let mut fresh = Vec::new();
        let mut duplicates = Vec::new();

        for row in rows {
            let lookup = self.store.find_infraction_by_hash(&row.record.hash).await;
            match lookup {
                Ok(None) => fresh.push(row),
                Ok(Some(existing)) => {
                    let duplicate = ConflictHandler::describe_duplicate(&row, existing);
                    duplicates.push((row, duplicate));
                }
                Err(e) => {
                    warn!(row_number = row.row_number, error = %e, "按 hash 查询失败");
                    errors.push(ProcessingError::new(
                        row.row_number,
                        ProcessingErrorKind::Storage,
                        row_message(
                            locale,
                            row.row_number,
                            "row.lookup_failed",
                            &[("detail", e.to_string())],
                        ),
                        &row.raw,
                    ));
                }
            }
        }

        DuplicateCheck { fresh, duplicates }
    }

    /// 新记录落库
    async fn persist_fresh(
        &self,
        rows: &[TransformedRow],
        locale: &str,
        tally: &mut Tally,
        errors: &mut Vec<ProcessingError>,
    ) {
        for row in rows {
            let result = self.store.create_infraction(&row.record).await;
            match result {
                Ok(()) => tally.created += 1,
                Err(e) if e.is_unique_violation() => {
                    warn!(row_number = row.row_number, hash = %row.record.hash, "落库时 hash 已存在（并发上传）");
                    errors.push(ProcessingError::new(
                        row.row_number,
                        ProcessingErrorKind::StorageConflict,
                        row_message(locale, row.row_number, "row.storage_conflict", &[]),
                        &row.raw,
                    ));
                }
                Err(e) => {
                    warn!(row_number = row.row_number, error = %e, "落库失败");
                    errors.push(ProcessingError::new(
                        row.row_number,
                        ProcessingErrorKind::Storage,
                        row_message(
                            locale,
                            row.row_number,
                            "row.write_failed",
                            &[("detail", e.to_string())],
                        ),
                        &row.raw,
                    ));
                }
            }
        }
    }

    /// 按决定处理重复记录（提交阶段）
    async fn apply_decisions(
        &self,
        duplicates: Vec<(TransformedRow, DuplicateRecord)>,
        decisions: &HashMap<String, DuplicateAction>,
        locale: &str,
        tally: &mut Tally,
        errors: &mut Vec<ProcessingError>,
    ) {
        for (row, duplicate) in duplicates {
            let action = decisions.get(&duplicate.hash).copied().unwrap_or_default();
            if action == DuplicateAction::Ignore {
                tally.ignored += 1;
                continue;
            }

            let result = self.store.update_infraction(&duplicate.hash, &row.record).await;
            match result {
                Ok(true) => {
                    debug!(row_number = row.row_number, hash = %duplicate.hash, changed = duplicate.has_changes, "重复记录已覆盖");
                    tally.updated += 1;
                }
                Ok(false) => errors.push(ProcessingError::new(
                    row.row_number,
                    ProcessingErrorKind::Storage,
                    row_message(locale, row.row_number, "row.update_target_missing", &[]),
                    &row.raw,
                )),
                Err(e) => errors.push(ProcessingError::new(
                    row.row_number,
                    ProcessingErrorKind::Storage,
                    row_message(
                        locale,
                        row.row_number,
                        "row.update_failed",
                        &[("detail", e.to_string())],
                    ),
                    &row.raw,
                )),
            }
        }
    }

    async fn record_ledger(&self, batch: &ImportBatch) {
        if let Some(ledger) = &self.ledger {
            if let Err(e) = ledger.record_batch(batch).await {
                warn!(batch_id = %batch.batch_id, error = %e, "批次台账写入失败");
            }
        }
    }
}

#[async_trait::async_trait]
impl<S, C> InfractionImporter for BatchReconciler<S, C>
where
    S: InfractionStore + Send + Sync,
    C: ImportConfigReader + Send + Sync,
{
    async fn import_file(
        &self,
        file_path: &Path,
        request: &ImportRequest,
    ) -> ImportResult<ImportOutcome> {
        let bytes = CsvParser::read_file(file_path)?;
        let file_name = file_path.file_name().and_then(|n| n.to_str());
        self.import_bytes(file_name, &bytes, request).await
    }

    #[instrument(skip(self, bytes, request), fields(batch_id, phase = %request.phase()))]
    async fn import_bytes(
        &self,
        file_name: Option<&str>,
        bytes: &[u8],
        request: &ImportRequest,
    ) -> ImportResult<ImportOutcome> {
        let start_time = Instant::now();
        let batch_id = Uuid::new_v4().to_string();
        let phase = request.phase();
        tracing::Span::current().record("batch_id", batch_id.as_str());

        info!(
            batch_id = %batch_id,
            file_name = file_name.unwrap_or("upload"),
            fault_type = %request.fault_type,
            trimester_id = %request.trimester_id,
            "开始导入违纪记录"
        );

        // === 步骤 1: 批次上下文与解析 ===
        let settings = self.load_settings().await?;
        let target_period = self.find_target_period(&request.trimester_id).await?;
        let parsed = self.parse_upload(bytes, &settings)?;
        let total_rows = parsed.rows.len();
        info!(total_rows = total_rows, "文件解析完成");

        // === 步骤 2: 逐行转换 ===
        let ctx = TransformContext {
            fault_type: request.fault_type,
            target_period,
        };
        let mut errors = Vec::new();
        let transformed = self
            .transform_rows(&parsed, &ctx, &settings.locale, &mut errors)
            .await;

        // === 步骤 3: 文件内重复 ===
        let (unique, in_file) = ConflictHandler::split_in_file_duplicates(transformed);
        for (row, first_row) in in_file {
            let err =
                RowValidationError::new(row.row_number, RowRejection::DuplicateInFile { first_row });
            errors.push(row_error(&settings.locale, &err, &row.raw));
        }
        let processed_rows = unique.len();
        debug!(processed = processed_rows, errors = errors.len(), "行转换完成");

        // === 步骤 4: 重复检测 ===
        let check = self
            .check_duplicates(unique, &settings.locale, &mut errors)
            .await;
        info!(
            fresh = check.fresh.len(),
            duplicates = check.duplicates.len(),
            "重复检测完成"
        );

        // === 步骤 5: 落库 ===
        let mut tally = Tally::default();
        self.persist_fresh(&check.fresh, &settings.locale, &mut tally, &mut errors)
            .await;

        let duplicates = match &request.decisions {
            None => check.duplicates.into_iter().map(|(_, d)| d).collect(),
            Some(decisions) => {
                let by_hash: HashMap<String, DuplicateAction> = decisions
                    .iter()
                    .map(|d| (d.hash.clone(), d.action))
                    .collect();
                self.apply_decisions(
                    check.duplicates,
                    &by_hash,
                    &settings.locale,
                    &mut tally,
                    &mut errors,
                )
                .await;
                Vec::new()
            }
        };

        errors.sort_by_key(|e| e.row_number);

        let message = outcome_message(&settings.locale, phase, &tally, duplicates.len(), errors.len());
        let elapsed_ms = start_time.elapsed().as_millis() as i64;

        // === 步骤 6: 批次台账 ===
        let batch = ImportBatch {
            batch_id: batch_id.clone(),
            phase,
            file_name: file_name.map(str::to_string),
            fault_type: request.fault_type,
            trimester_id: request.trimester_id.clone(),
            total_rows: total_rows as i64,
            processed_rows: processed_rows as i64,
            created_rows: tally.created as i64,
            updated_rows: tally.updated as i64,
            duplicate_rows: duplicates.len() as i64,
            error_rows: errors.len() as i64,
            errors_json: if errors.is_empty() {
                None
            } else {
                serde_json::to_string(&errors).ok()
            },
            imported_at: Utc::now(),
            elapsed_ms,
        };
        self.record_ledger(&batch).await;

        info!(
            batch_id = %batch_id,
            total = total_rows,
            processed = processed_rows,
            created = tally.created,
            updated = tally.updated,
            ignored = tally.ignored,
            duplicates = duplicates.len(),
            errors = errors.len(),
            elapsed_ms = elapsed_ms,
            "违纪记录导入完成"
        );

        Ok(ImportOutcome {
            batch_id,
            phase,
            success: true,
            message,
            total_rows,
            processed_rows,
            created: tally.created,
            updated: tally.updated,
            ignored: tally.ignored,
            duplicates,
            errors,
        })
    }

    #[instrument(skip(self))]
    async fn diagnose_periods(
        &self,
        file_path: &Path,
        school_year_id: Option<&str>,
    ) -> ImportResult<PeriodDiagnosticReport> {
        let settings = self.load_settings().await?;
        let bytes = CsvParser::read_file(file_path)?;
        let parsed = self.parse_upload(&bytes, &settings)?;
        let periods = self.periods.list_academic_periods(school_year_id).await?;

        let mut resolved = Vec::new();
        let mut errors = Vec::new();

        for row in &parsed.rows {
            let view = RowView::new(row);
            let occurred_on = match parse_date_column(&view, columns::OCCURRED_ON) {
                Ok(date) => date,
                Err(reason) => {
                    let err = RowValidationError::new(row.row_number, reason);
                    errors.push(row_error(&settings.locale, &err, &row.fields));
                    continue;
                }
            };

            match PeriodResolver::resolve(occurred_on, &periods) {
                Ok(period) => resolved.push(PeriodDiagnosticRow {
                    row_number: row.row_number,
                    occurred_on,
                    trimester_id: period.trimester_id.clone(),
                    trimester_label: period.label(),
                }),
                Err(e) => {
                    let kind = match e {
                        PeriodResolutionError::Ambiguous { .. } => {
                            ProcessingErrorKind::PeriodResolutionAmbiguity
                        }
                        PeriodResolutionError::NotCovered { .. } => {
                            ProcessingErrorKind::PeriodNotCovered
                        }
                    };
                    errors.push(ProcessingError::new(
                        row.row_number,
                        kind,
                        e.localized(&settings.locale, row.row_number),
                        &row.fields,
                    ));
                }
            }
        }

        info!(
            total = parsed.rows.len(),
            resolved = resolved.len(),
            errors = errors.len(),
            "学期诊断完成"
        );

        Ok(PeriodDiagnosticReport {
            total_rows: parsed.rows.len(),
            resolved,
            errors,
        })
    }
}

// ==========================================
// 辅助函数
// ==========================================

fn config_error(key: &str, message: String) -> ImportError {
    ImportError::ConfigReadError {
        key: key.to_string(),
        message,
    }
}

fn row_error(
    locale: &str,
    err: &RowValidationError,
    raw: &HashMap<String, String>,
) -> ProcessingError {
    let kind = match err.reason {
        RowRejection::InvalidDate { .. } => ProcessingErrorKind::DateFormat,
        _ => ProcessingErrorKind::RowValidation,
    };
    ProcessingError::new(err.row, kind, err.localized(locale), raw)
}

fn outcome_message(
    locale: &str,
    phase: ImportPhase,
    tally: &Tally,
    duplicates: usize,
    errors: usize,
) -> String {
    let created = tally.created.to_string();
    let updated = tally.updated.to_string();
    let ignored = tally.ignored.to_string();
    let duplicates = duplicates.to_string();
    let errors = errors.to_string();

    match phase {
        ImportPhase::Preview => crate::i18n::t_in(
            locale,
            "import.preview_completed",
            &[
                ("created", &created),
                ("duplicates", &duplicates),
                ("errors", &errors),
            ],
        ),
        ImportPhase::Commit => crate::i18n::t_in(
            locale,
            "import.commit_completed",
            &[
                ("created", &created),
                ("updated", &updated),
                ("ignored", &ignored),
                ("errors", &errors),
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::infraction::{DuplicateDecision, InfractionRecord};
    use crate::domain::student::StudentProfile;
    use crate::domain::types::FaultType;
    use crate::repository::error::{RepositoryError, RepositoryResult};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::error::Error;
    use std::sync::{Arc, Mutex};

    // ===== 内存协作者 =====

    #[derive(Clone, Default)]
    struct MemoryStore {
        records: Arc<Mutex<HashMap<String, InfractionRecord>>>,
        // 模拟并发: 这些 hash 在查询时不存在，落库时已存在
        racing: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl InfractionStore for MemoryStore {
        async fn find_infraction_by_hash(
            &self,
            hash: &str,
        ) -> RepositoryResult<Option<InfractionRecord>> {
            Ok(self.records.lock().unwrap().get(hash).cloned())
        }

        async fn create_infraction(&self, record: &InfractionRecord) -> RepositoryResult<()> {
            if self.racing.lock().unwrap().contains(&record.hash) {
                return Err(RepositoryError::UniqueConstraintViolation(
                    "UNIQUE constraint failed: infraction.hash".to_string(),
                ));
            }
            let mut records = self.records.lock().unwrap();
            if records.contains_key(&record.hash) {
                return Err(RepositoryError::UniqueConstraintViolation(record.hash.clone()));
            }
            records.insert(record.hash.clone(), record.clone());
            Ok(())
        }

        async fn update_infraction(
            &self,
            hash: &str,
            record: &InfractionRecord,
        ) -> RepositoryResult<bool> {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(hash) {
                Some(slot) => {
                    *slot = record.clone();
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    struct AnyStudent;

    #[async_trait]
    impl StudentResolver for AnyStudent {
        async fn find_or_create_student(
            &self,
            code: &str,
            _profile: &StudentProfile,
        ) -> RepositoryResult<String> {
            Ok(format!("student-{}", code))
        }
    }

    struct FixedPeriods(Vec<AcademicPeriod>);

    #[async_trait]
    impl AcademicPeriodSource for FixedPeriods {
        async fn list_academic_periods(
            &self,
            school_year_id: Option<&str>,
        ) -> RepositoryResult<Vec<AcademicPeriod>> {
            Ok(self
                .0
                .iter()
                .filter(|p| school_year_id.map_or(true, |id| p.school_year_id == id))
                .cloned()
                .collect())
        }

        async fn find_period(&self, trimester_id: &str) -> RepositoryResult<Option<AcademicPeriod>> {
            Ok(self.0.iter().find(|p| p.trimester_id == trimester_id).cloned())
        }
    }

    struct MockConfig {
        max_upload_bytes: u64,
    }

    #[async_trait]
    impl ImportConfigReader for MockConfig {
        async fn get_csv_delimiter(&self) -> Result<u8, Box<dyn Error>> {
            Ok(b';')
        }
        async fn get_auto_create_students(&self) -> Result<bool, Box<dyn Error>> {
            Ok(true)
        }
        async fn get_max_upload_bytes(&self) -> Result<u64, Box<dyn Error>> {
            Ok(self.max_upload_bytes)
        }
        async fn get_ui_locale(&self) -> Result<String, Box<dyn Error>> {
            Ok("en".to_string())
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn periods() -> Vec<AcademicPeriod> {
        let mk = |id: &str, order: u8, start: NaiveDate, end: NaiveDate| AcademicPeriod {
            school_year_id: "sy-2025".to_string(),
            school_year_name: "2025".to_string(),
            is_active: true,
            trimester_id: id.to_string(),
            trimester_name: format!("Trimestre {}", order),
            order,
            start_date: start,
            end_date: end,
        };
        vec![
            mk("t1", 1, d(2025, 1, 20), d(2025, 4, 30)),
            mk("t2", 2, d(2025, 5, 1), d(2025, 8, 31)),
            mk("t3", 3, d(2025, 9, 1), d(2025, 11, 30)),
        ]
    }

    fn reconciler(store: MemoryStore, periods: Vec<AcademicPeriod>) -> BatchReconciler<MemoryStore, MockConfig> {
        BatchReconciler::new(
            store,
            MockConfig {
                max_upload_bytes: 1024 * 1024,
            },
            Box::new(AnyStudent),
            Box::new(FixedPeriods(periods)),
        )
    }

    const HEADER: &str = "Id;Código;Persona;Sección;Fecha De Creación;Autor;Fecha ;Descripcion de la falta;Acciones Reparadoras";

    fn csv(rows: &[&str]) -> Vec<u8> {
        let mut out = String::from(HEADER);
        for r in rows {
            out.push('\n');
            out.push_str(r);
        }
        out.push('\n');
        out.into_bytes()
    }

    #[tokio::test]
    async fn test_preview_persists_new_rows_only() {
        let store = MemoryStore::default();
        let r = reconciler(store.clone(), periods());
        let bytes = csv(&[
            "1;3314;Ana;Quinto A;27/08/2025 10:28;Prof;26/08/2025;texto X;",
            "2;3315;Luis;Sexto B;27/08/2025 11:00;Prof;26/08/2025;texto Y;",
        ]);

        let first = r
            .import_bytes(None, &bytes, &ImportRequest::preview(FaultType::TypeI, "t2"))
            .await
            .unwrap();
        assert!(first.success);
        assert_eq!(first.phase, ImportPhase::Preview);
        assert_eq!((first.total_rows, first.processed_rows, first.created), (2, 2, 2));
        assert!(first.duplicates.is_empty());

        // 再次预览: 全部为重复，均未改动
        let second = r
            .import_bytes(None, &bytes, &ImportRequest::preview(FaultType::TypeI, "t2"))
            .await
            .unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.duplicates.len(), 2);
        assert!(second.duplicates.iter().all(|dup| !dup.has_changes));
        assert_eq!(store.records.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unlisted_duplicates_default_to_ignore() {
        let store = MemoryStore::default();
        let r = reconciler(store.clone(), periods());
        let original = csv(&[
            "1;3314;Ana;Quinto A;27/08/2025 10:28;Prof;26/08/2025;texto X;",
            "2;3315;Luis;Sexto B;27/08/2025 11:00;Prof;26/08/2025;texto Y;",
        ]);
        r.import_bytes(None, &original, &ImportRequest::preview(FaultType::TypeI, "t2"))
            .await
            .unwrap();

        // 重新导出: 补救措施有变动
        let edited = csv(&[
            "1;3314;Ana;Quinto A;27/08/2025 10:28;Prof;26/08/2025;texto X;Llamado de atención",
            "2;3315;Luis;Sexto B;27/08/2025 11:00;Prof;26/08/2025;texto Y;Citación",
        ]);
        let preview = r
            .import_bytes(None, &edited, &ImportRequest::preview(FaultType::TypeI, "t2"))
            .await
            .unwrap();
        assert!(preview.duplicates.iter().all(|dup| dup.has_changes));
        let first_hash = preview.duplicates[0].hash.clone();

        let commit = r
            .import_bytes(
                None,
                &edited,
                &ImportRequest::commit(
                    FaultType::TypeI,
                    "t2",
                    vec![DuplicateDecision {
                        hash: first_hash.clone(),
                        action: DuplicateAction::Update,
                    }],
                ),
            )
            .await
            .unwrap();

        assert_eq!(commit.phase, ImportPhase::Commit);
        assert_eq!((commit.created, commit.updated, commit.ignored), (0, 1, 1));
        assert!(commit.message.contains("1 updated"));

        let records = store.records.lock().unwrap();
        assert!(records[&first_hash].remedial_actions.is_some());
        let other = records.values().find(|rec| rec.hash != first_hash).unwrap();
        assert_eq!(other.remedial_actions, None);
    }

    #[tokio::test]
    async fn test_in_file_repeat_is_row_error() {
        let r = reconciler(MemoryStore::default(), periods());
        let bytes = csv(&[
            "1;3314;Ana;Quinto A;27/08/2025 10:28;Prof;26/08/2025;texto X;",
            "9;3314;Ana;Quinto A;28/08/2025 09:00;Otro;26/08/2025;texto   X;",
        ]);
        let outcome = r
            .import_bytes(None, &bytes, &ImportRequest::preview(FaultType::TypeII, "t2"))
            .await
            .unwrap();

        assert_eq!(outcome.created, 1);
        assert_eq!(outcome.processed_rows, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].row_number, 2);
        assert_eq!(outcome.errors[0].kind, ProcessingErrorKind::RowValidation);
    }

    #[tokio::test]
    async fn test_unique_violation_becomes_storage_conflict() {
        let store = MemoryStore::default();
        let r = reconciler(store.clone(), periods());
        let bytes = csv(&["1;3314;Ana;Quinto A;27/08/2025 10:28;Prof;26/08/2025;texto X;"]);

        // 先算出该行的 hash，再标记为"并发写入"
        let hash = crate::importer::record_hasher::RecordHasher::hash(
            &crate::importer::record_hasher::HashFields {
                student_code: "3314",
                occurred_on: d(2025, 8, 26),
                description: "texto X",
            },
        );
        store.racing.lock().unwrap().push(hash);

        let outcome = r
            .import_bytes(None, &bytes, &ImportRequest::preview(FaultType::TypeI, "t2"))
            .await
            .unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.created, 0);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].kind, ProcessingErrorKind::StorageConflict);
    }

    #[tokio::test]
    async fn test_fatal_errors() {
        let r = reconciler(MemoryStore::default(), periods());
        let bytes = csv(&["1;3314;Ana;Quinto A;27/08/2025;Prof;26/08/2025;texto X;"]);

        let err = r
            .import_bytes(None, &bytes, &ImportRequest::preview(FaultType::TypeI, "missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::TrimesterNotFound(_)));

        let small = BatchReconciler::new(
            MemoryStore::default(),
            MockConfig { max_upload_bytes: 10 },
            Box::new(AnyStudent),
            Box::new(FixedPeriods(periods())),
        );
        let err = small
            .import_bytes(None, &bytes, &ImportRequest::preview(FaultType::TypeI, "t2"))
            .await
            .unwrap_err();
        assert!(matches!(err, ImportError::FileFormatError(_)));
    }

    #[tokio::test]
    async fn test_diagnose_reports_overlap_and_gaps() {
        let mut overlapping = periods();
        let misconfigured = AcademicPeriod {
            trimester_id: "t2-bis".to_string(),
            start_date: d(2025, 8, 15),
            end_date: d(2025, 9, 15),
            ..overlapping[1].clone()
        };
        overlapping.push(misconfigured);
        let r = reconciler(MemoryStore::default(), overlapping);

        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        std::io::Write::write_all(
            &mut file,
            &csv(&[
                "1;1;A;;01/02/2025;P;03/02/2025;a;",
                "2;2;B;;01/02/2025;P;26/08/2025;b;",
                "3;3;C;;01/02/2025;P;15/12/2025;c;",
                "4;4;D;;01/02/2025;P;fecha;d;",
            ]),
        )
        .unwrap();

        let report = r.diagnose_periods(file.path(), None).await.unwrap();
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.resolved.len(), 1);
        assert_eq!(report.resolved[0].trimester_id, "t1");

        let kinds: Vec<_> = report.errors.iter().map(|e| (e.row_number, e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (2, ProcessingErrorKind::PeriodResolutionAmbiguity),
                (3, ProcessingErrorKind::PeriodNotCovered),
                (4, ProcessingErrorKind::DateFormat),
            ]
        );
    }
}
