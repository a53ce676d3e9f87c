// ==========================================
// 学校纪律追踪系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分层: 文件级（致命,中断批次） / 行级（累积,批次继续）
// ==========================================

use crate::i18n::t_in;
use crate::repository::error::RepositoryError;
use thiserror::Error;

// ==========================================
// ImportError - 文件级错误
// ==========================================
/// 导入模块错误类型（只有无法读取整份文件时才返回给调用方）
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("文件结构无法解析: {0}")]
    FileFormatError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 上下文错误 =====
    #[error("学期不存在: {0}")]
    TrimesterNotFound(String),

    #[error("违纪类型无效: {0}（应为 Tipo I / Tipo II / Tipo III）")]
    InvalidFaultType(String),

    // ===== 存储错误 =====
    #[error("hash 已被并发写入: {0}")]
    StorageConflict(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    // ===== 配置错误 =====
    #[error("配置读取失败 (key: {key}): {message}")]
    ConfigReadError { key: String, message: String },

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for ImportError {
    fn from(err: rusqlite::Error) -> Self {
        ImportError::DatabaseError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<RepositoryError> for ImportError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::UniqueConstraintViolation(msg) => ImportError::StorageConflict(msg),
            other => ImportError::DatabaseError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;

// ==========================================
// DateFormatError - 日期无法解析
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("日期格式错误: '{value}'（{reason}）")]
pub struct DateFormatError {
    pub value: String,
    pub reason: String,
}

impl DateFormatError {
    pub fn new(value: &str, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

// ==========================================
// PeriodResolutionError - 学期归属失败
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodResolutionError {
    #[error("没有学期覆盖日期 {date}")]
    NotCovered { date: chrono::NaiveDate },

    #[error("日期 {date} 同时落入多个学期 {candidates:?}（学期配置重叠）")]
    Ambiguous {
        date: chrono::NaiveDate,
        candidates: Vec<String>,
    },
}

// ==========================================
// RowValidationError - 单行校验失败
// ==========================================
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("第 {row} 行: {reason}")]
pub struct RowValidationError {
    pub row: usize,
    pub reason: RowRejection,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowRejection {
    #[error("缺少必填列 '{0}'")]
    MissingColumn(String),

    #[error("学号为空")]
    MissingStudentCode,

    #[error("列 '{column}' {source}")]
    InvalidDate {
        column: String,
        #[source]
        source: DateFormatError,
    },

    #[error("学生查找失败: {0}")]
    StudentLookup(String),

    #[error("与第 {first_row} 行为同一条记录（文件内重复）")]
    DuplicateInFile { first_row: usize },
}

impl RowValidationError {
    pub fn new(row: usize, reason: RowRejection) -> Self {
        Self { row, reason }
    }

    /// 按界面语言生成行级消息（Display 仅用于日志）
    pub fn localized(&self, locale: &str) -> String {
        let (key, args) = self.reason.message_args();
        row_message(locale, self.row, key, &args)
    }
}

impl RowRejection {
    fn message_args(&self) -> (&'static str, Vec<(&'static str, String)>) {
        match self {
            RowRejection::MissingColumn(column) => {
                ("row.missing_column", vec![("column", column.clone())])
            }
            RowRejection::MissingStudentCode => ("row.missing_student_code", Vec::new()),
            RowRejection::InvalidDate { column, source } => (
                "row.invalid_date",
                vec![("column", column.clone()), ("value", source.value.clone())],
            ),
            RowRejection::StudentLookup(detail) => {
                ("row.student_lookup", vec![("detail", detail.clone())])
            }
            RowRejection::DuplicateInFile { first_row } => (
                "row.duplicate_in_file",
                vec![("first_row", first_row.to_string())],
            ),
        }
    }
}

impl PeriodResolutionError {
    /// 按界面语言生成行级消息
    pub fn localized(&self, locale: &str, row: usize) -> String {
        match self {
            PeriodResolutionError::NotCovered { date } => row_message(
                locale,
                row,
                "row.period_not_covered",
                &[("date", date.format("%d/%m/%Y").to_string())],
            ),
            PeriodResolutionError::Ambiguous { date, candidates } => row_message(
                locale,
                row,
                "row.period_ambiguous",
                &[
                    ("date", date.format("%d/%m/%Y").to_string()),
                    ("candidates", candidates.join(", ")),
                ],
            ),
        }
    }
}

/// "第 N 行: ..." 的多语言版本
///
/// # 参数
/// - key: locales 中 row.* 下的明细键
/// - args: 明细占位符
pub fn row_message(locale: &str, row: usize, key: &str, args: &[(&str, String)]) -> String {
    let args: Vec<(&str, &str)> = args.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let detail = t_in(locale, key, &args);
    let row = row.to_string();
    t_in(locale, "row.prefix", &[("row", &row), ("detail", &detail)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_storage_conflict() {
        let err: ImportError =
            RepositoryError::UniqueConstraintViolation("infraction.hash".to_string()).into();
        assert!(matches!(err, ImportError::StorageConflict(_)));
    }

    #[test]
    fn test_row_error_message_names_row_and_column() {
        let err = RowValidationError::new(
            5,
            RowRejection::InvalidDate {
                column: "Fecha".to_string(),
                source: DateFormatError::new("31/04/2025", "日历上不存在的日期"),
            },
        );
        let msg = err.to_string();
        assert!(msg.contains("第 5 行"));
        assert!(msg.contains("Fecha"));
        assert!(msg.contains("31/04/2025"));

        let es = err.localized("es");
        assert_eq!(
            es,
            "Fila 5: la columna 'Fecha' contiene una fecha inválida '31/04/2025' (se espera DD/MM/AAAA)"
        );
        let en = err.localized("en");
        assert!(en.starts_with("Row 5: column 'Fecha'"));
    }

    #[test]
    fn test_localized_messages_fill_every_placeholder() {
        let reasons = [
            RowRejection::MissingColumn("Código".to_string()),
            RowRejection::MissingStudentCode,
            RowRejection::StudentLookup("Student(id=9002)".to_string()),
            RowRejection::DuplicateInFile { first_row: 1 },
        ];
        for reason in reasons {
            let err = RowValidationError::new(2, reason);
            for locale in ["es", "en"] {
                let msg = err.localized(locale);
                assert!(!msg.contains("%{"), "{}", msg);
                assert!(!msg.contains("第"), "{}", msg);
            }
        }

        let date = chrono::NaiveDate::from_ymd_opt(2025, 8, 26).unwrap();
        let ambiguous = PeriodResolutionError::Ambiguous {
            date,
            candidates: vec!["t2".to_string(), "b1".to_string()],
        };
        assert_eq!(
            ambiguous.localized("en", 3),
            "Row 3: the date 26/08/2025 falls in several trimesters (t2, b1); check the trimester configuration"
        );
        let gap = PeriodResolutionError::NotCovered { date };
        assert_eq!(
            gap.localized("es", 4),
            "Fila 4: ningún trimestre cubre la fecha 26/08/2025"
        );
    }
}
