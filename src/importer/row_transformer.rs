// ==========================================
// 学校纪律追踪系统 - 行转换器
// ==========================================
// 职责: 原始 CSV 行 + 批次上下文 → InfractionRecord
// 流程: 必填列校验 → 日期解析（创建/发生分别解析）→ 学段分类
//       → 学生查找/创建 → 条目号提取 → 指纹 → 挂接选定学期
// 红线: 学期由上传人员为整个批次指定，不按日期逐行推断
// 红线: 行级失败以 RowValidationError 返回，不中断批次
// ==========================================

use crate::domain::infraction::InfractionRecord;
use crate::domain::period::AcademicPeriod;
use crate::domain::student::StudentProfile;
use crate::domain::types::{AcademicLevel, FaultType};
use crate::importer::date_interpreter::DateInterpreter;
use crate::importer::error::{DateFormatError, RowRejection, RowValidationError};
use crate::importer::file_parser::RawCsvRow;
use crate::importer::level_classifier::{normalize, AcademicLevelClassifier};
use crate::importer::record_hasher::{HashFields, RecordHasher};
use crate::repository::infraction_import_repo::StudentResolver;
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

// ==========================================
// 列名常量（源系统导出的固定表头）
// ==========================================
pub mod columns {
    pub const EXTERNAL_ID: &str = "Id";
    pub const STUDENT_CODE: &str = "Código";
    pub const STUDENT_NAME: &str = "Persona";
    pub const SECTION: &str = "Sección";
    pub const CREATED_AT: &str = "Fecha De Creación";
    pub const AUTHOR: &str = "Autor";
    pub const OCCURRED_ON: &str = "Fecha";
    pub const DESCRIPTION: &str = "Descripcion de la falta";
    pub const REMEDIAL_ACTIONS: &str = "Acciones Reparadoras";
    pub const DETAIL: &str = "Detalle";
    pub const MANUAL_REFERENCE: &str = "Falta según Manual de Convivencia";
    pub const LAST_EDITED_AT: &str = "Fecha Última Edición";
    pub const LAST_EDITOR: &str = "Último Editor";
}

/// 批次级上下文（整批共用）
#[derive(Debug, Clone)]
pub struct TransformContext {
    pub fault_type: FaultType,
    pub target_period: AcademicPeriod,
}

// ==========================================
// RowView - 行字段访问
// ==========================================
// 列名先精确匹配，再按规范化后（去重音/大小写）匹配，
// 以容忍 "Descripción de la falta" 之类的表头变体
pub(crate) struct RowView<'a> {
    row: &'a RawCsvRow,
    normalized: HashMap<String, &'a str>,
}

impl<'a> RowView<'a> {
    pub(crate) fn new(row: &'a RawCsvRow) -> Self {
        let normalized = row
            .fields
            .iter()
            .map(|(k, v)| (normalize(k), v.as_str()))
            .collect();
        Self { row, normalized }
    }

    /// 列是否存在（值可为空）
    fn raw(&self, column: &str) -> Option<&'a str> {
        self.row
            .fields
            .get(column)
            .map(|v| v.as_str())
            .or_else(|| self.normalized.get(&normalize(column)).copied())
    }

    /// 非空值
    pub(crate) fn text(&self, column: &str) -> Option<String> {
        self.raw(column)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// 必填列（列缺失即报错，值可为空）
    pub(crate) fn required(&self, column: &str) -> Result<&'a str, RowRejection> {
        self.raw(column)
            .map(str::trim)
            .ok_or_else(|| RowRejection::MissingColumn(column.to_string()))
    }
}

pub struct RowTransformer;

impl RowTransformer {
    /// 转换单行
    ///
    /// # 参数
    /// - row: 原始行
    /// - ctx: 违纪类型与选定学期
    /// - students: 学生查找/创建协作者
    ///
    /// # 返回
    /// - Ok(InfractionRecord)
    /// - Err(RowValidationError): 缺列 / 学号为空 / 日期无法解析 / 学生查找失败
    pub async fn transform(
        row: &RawCsvRow,
        ctx: &TransformContext,
        students: &dyn StudentResolver,
    ) -> Result<InfractionRecord, RowValidationError> {
        let reject = |reason: RowRejection| RowValidationError::new(row.row_number, reason);
        let view = RowView::new(row);

        // 1. 必填列与日期（先于任何存储调用）
        let student_code = view.required(columns::STUDENT_CODE).map_err(reject)?;
        if student_code.is_empty() {
            return Err(reject(RowRejection::MissingStudentCode));
        }
        let student_code = student_code.to_string();

        let occurred_on = parse_date_column(&view, columns::OCCURRED_ON).map_err(reject)?;
        let reported_at = parse_timestamp_column(&view, columns::CREATED_AT).map_err(reject)?;
        let description = view.required(columns::DESCRIPTION).map_err(reject)?.to_string();

        // 编辑时间为可选列；有值但无法解析同样拒绝
        let last_edited_at = match view.text(columns::LAST_EDITED_AT) {
            Some(raw) => Some(DateInterpreter::parse_timestamp(&raw).map_err(|e| {
                reject(RowRejection::InvalidDate {
                    column: columns::LAST_EDITED_AT.to_string(),
                    source: e,
                })
            })?),
            None => None,
        };

        // 2. 学段
        let section = view.text(columns::SECTION);
        let academic_level = section
            .as_deref()
            .map(AcademicLevelClassifier::classify)
            .unwrap_or(AcademicLevel::Unclassified);

        // 3. 学生
        let profile = StudentProfile {
            full_name: view.text(columns::STUDENT_NAME),
            section: section.clone(),
            academic_level,
        };
        let student_id = students
            .find_or_create_student(&student_code, &profile)
            .await
            .map_err(|e| reject(RowRejection::StudentLookup(e.to_string())))?;

        // 4. 指纹
        let hash = RecordHasher::hash(&HashFields {
            student_code: &student_code,
            occurred_on,
            description: &description,
        });

        Ok(InfractionRecord {
            hash,
            student_id,
            student_code,
            fault_type: ctx.fault_type,
            fault_number: view
                .text(columns::MANUAL_REFERENCE)
                .and_then(|r| extract_fault_number(&r)),
            description,
            detail: view.text(columns::DETAIL),
            remedial_actions: view.text(columns::REMEDIAL_ACTIONS),
            author: view.text(columns::AUTHOR),
            occurred_on,
            reported_at,
            last_edited_at,
            last_editor: view.text(columns::LAST_EDITOR),
            section,
            academic_level,
            trimester_id: ctx.target_period.trimester_id.clone(),
            school_year_id: ctx.target_period.school_year_id.clone(),
            external_id: view.text(columns::EXTERNAL_ID),
        })
    }
}

pub(crate) fn parse_date_column(view: &RowView<'_>, column: &str) -> Result<NaiveDate, RowRejection> {
    let raw = view.required(column)?;
    DateInterpreter::parse(raw).map_err(|e| invalid_date(column, e))
}

fn parse_timestamp_column(view: &RowView<'_>, column: &str) -> Result<NaiveDateTime, RowRejection> {
    let raw = view.required(column)?;
    DateInterpreter::parse_timestamp(raw).map_err(|e| invalid_date(column, e))
}

fn invalid_date(column: &str, source: DateFormatError) -> RowRejection {
    RowRejection::InvalidDate {
        column: column.to_string(),
        source,
    }
}

/// 手册引用文本开头的整数（"3. Agresión verbal" → 3）
pub fn extract_fault_number(reference: &str) -> Option<u32> {
    let digits: String = reference
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
