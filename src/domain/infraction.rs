// ==========================================
// 学校纪律追踪系统 - 违纪记录领域模型
// ==========================================
// 主实体: InfractionRecord（以 hash 为主标识）
// 导入产物: ProcessingError / DuplicateRecord / ImportOutcome / ImportBatch
// ==========================================

use crate::domain::types::{AcademicLevel, DuplicateAction, FaultType, ImportPhase};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ==========================================
// InfractionRecord - 违纪记录
// ==========================================
// 红线: hash 只由内容稳定字段决定（学号/发生日期/描述）
//       作者、编辑人、编辑时间变化不改变 hash
// 用途: 导入层写入；重复记录仅在显式选择 update 时原地覆盖
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfractionRecord {
    // ===== 主标识 =====
    pub hash: String,

    // ===== 学生 =====
    pub student_id: String,
    pub student_code: String,

    // ===== 违纪内容 =====
    pub fault_type: FaultType,           // 批次级违纪类型
    pub fault_number: Option<u32>,       // 手册条目号（从手册引用文本开头提取）
    pub description: String,             // 违纪描述
    pub detail: Option<String>,          // 补充说明
    pub remedial_actions: Option<String>, // 补救措施
    pub author: Option<String>,          // 报告人

    // ===== 时间 =====
    pub occurred_on: NaiveDate,              // 发生日期（"Fecha" 列）
    pub reported_at: NaiveDateTime,          // 源系统创建时间（"Fecha De Creación" 列）
    pub last_edited_at: Option<NaiveDateTime>,
    pub last_editor: Option<String>,

    // ===== 班级与学段 =====
    pub section: Option<String>,
    pub academic_level: AcademicLevel,

    // ===== 学期归属（上传人员选定）=====
    pub trimester_id: String,
    pub school_year_id: String,

    // ===== 源系统标识 =====
    pub external_id: Option<String>,
}

impl InfractionRecord {
    /// 与另一版本相比是否存在字段差异（忽略 hash 本身）
    pub fn differs_from(&self, other: &InfractionRecord) -> bool {
        self.student_id != other.student_id
            || self.student_code != other.student_code
            || self.fault_type != other.fault_type
            || self.fault_number != other.fault_number
            || self.description != other.description
            || self.detail != other.detail
            || self.remedial_actions != other.remedial_actions
            || self.author != other.author
            || self.occurred_on != other.occurred_on
            || self.reported_at != other.reported_at
            || self.last_edited_at != other.last_edited_at
            || self.last_editor != other.last_editor
            || self.section != other.section
            || self.academic_level != other.academic_level
            || self.trimester_id != other.trimester_id
            || self.school_year_id != other.school_year_id
            || self.external_id != other.external_id
    }
}

// ==========================================
// TransformedRow - 单行转换结果
// ==========================================
// 用途: 行转换 → 重复检测 之间的中间产物
// 生命周期: 仅在导入流程内
#[derive(Debug, Clone)]
pub struct TransformedRow {
    pub row_number: usize,
    pub record: InfractionRecord,
    pub raw: HashMap<String, String>,
}

// ==========================================
// DuplicateDecision - 调用方对单个重复 hash 的处理决定
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateDecision {
    pub hash: String,
    pub action: DuplicateAction,
}

// ==========================================
// DuplicateHandling - 上传表单中的 duplicateHandling 载荷
// ==========================================
// 形如: {"action": "update", "duplicateHashes": ["...", "..."]}
// 未列出的 hash 一律视为 ignore
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateHandling {
    pub action: DuplicateAction,
    #[serde(default)]
    pub duplicate_hashes: Vec<String>,
}

impl DuplicateHandling {
    /// 展开为逐 hash 决定
    pub fn into_decisions(self) -> Vec<DuplicateDecision> {
        let action = self.action;
        self.duplicate_hashes
            .into_iter()
            .map(|hash| DuplicateDecision { hash, action })
            .collect()
    }
}

// ==========================================
// DuplicateRecord - 与库中记录冲突的行
// ==========================================
// 同时携带库中版本与新解析版本,供人工决定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRecord {
    pub hash: String,
    pub row_number: usize,
    pub existing: InfractionRecord,
    pub incoming: InfractionRecord,
    pub has_changes: bool,
}

// ==========================================
// ProcessingErrorKind - 行级错误分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingErrorKind {
    RowValidation,            // 必填列缺失/学号缺失/文件内重复
    DateFormat,               // 日期无法解析
    PeriodResolutionAmbiguity, // 学期配置重叠: 日期落入多个学期
    PeriodNotCovered,         // 没有学期覆盖该日期（仅诊断）
    StorageConflict,          // 落库时 hash 已被并发写入
    Storage,                  // 其他存储错误（仅影响本行）
}

// ==========================================
// ProcessingError - 行级错误（累积,不中断批次）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingError {
    pub row_number: usize,
    pub kind: ProcessingErrorKind,
    pub message: String,
    pub offending_data: BTreeMap<String, String>,
}

impl ProcessingError {
    pub fn new(
        row_number: usize,
        kind: ProcessingErrorKind,
        message: impl Into<String>,
        raw: &HashMap<String, String>,
    ) -> Self {
        Self {
            row_number,
            kind,
            message: message.into(),
            offending_data: raw.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

// ==========================================
// ImportOutcome - 导入结果（每个终态都返回）
// ==========================================
// success: 无文件级致命错误即为 true,与行级错误无关
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub batch_id: String,
    pub phase: ImportPhase,
    pub success: bool,
    pub message: String,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub created: usize,
    pub updated: usize,
    pub ignored: usize,
    pub duplicates: Vec<DuplicateRecord>,
    pub errors: Vec<ProcessingError>,
}

// ==========================================
// ImportBatch - 导入批次台账
// ==========================================
// 用途: 每一次导入（预览或提交）的作业状态记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportBatch {
    pub batch_id: String,
    pub phase: ImportPhase,
    pub file_name: Option<String>,
    pub fault_type: FaultType,
    pub trimester_id: String,
    pub total_rows: i64,
    pub processed_rows: i64,
    pub created_rows: i64,
    pub updated_rows: i64,
    pub duplicate_rows: i64,
    pub error_rows: i64,
    pub errors_json: Option<String>,
    pub imported_at: DateTime<Utc>,
    pub elapsed_ms: i64,
}

// ==========================================
// 学期诊断（自动按日期归属,仅用于排查）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDiagnosticRow {
    pub row_number: usize,
    pub occurred_on: NaiveDate,
    pub trimester_id: String,
    pub trimester_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodDiagnosticReport {
    pub total_rows: usize,
    pub resolved: Vec<PeriodDiagnosticRow>,
    pub errors: Vec<ProcessingError>,
}
