// ==========================================
// 学校纪律追踪系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把仓储/导入层错误转换为调用方可读的错误
// 说明: 行级错误不经过这里，它们随 ImportOutcome.errors 返回
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 请求错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 并发错误
    // ==========================================
    #[error("记录已被并发写入: {0}")]
    StorageConflict(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导入错误
    // ==========================================
    #[error("文件导入失败: {0}")]
    ImportError(String),

    #[error("配置读取失败: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定的错误代码（供前端/CLI 分支判断）
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BusinessRuleViolation(_) => "BUSINESS_RULE_VIOLATION",
            ApiError::StorageConflict(_) => "STORAGE_CONFLICT",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::ImportError(_) => "IMPORT_ERROR",
            ApiError::ConfigError(_) => "CONFIG_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => ApiError::StorageConflict(msg),
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::FieldValueError { field, message } => {
                ApiError::InvalidInput(format!("字段{}错误: {}", field, message))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::FileNotFound(path) => ApiError::NotFound(format!("文件不存在: {}", path)),
            ImportError::TrimesterNotFound(id) => {
                ApiError::NotFound(format!("学期不存在: {}", id))
            }
            e @ ImportError::InvalidFaultType(_) => ApiError::InvalidInput(e.to_string()),
            e @ (ImportError::UnsupportedFormat(_)
            | ImportError::FileReadError(_)
            | ImportError::FileFormatError(_)
            | ImportError::CsvParseError(_)) => ApiError::ImportError(e.to_string()),
            ImportError::StorageConflict(msg) => ApiError::StorageConflict(msg),
            ImportError::DatabaseError(msg) => ApiError::DatabaseError(msg),
            e @ ImportError::ConfigReadError { .. } => ApiError::ConfigError(e.to_string()),
            ImportError::Other(err) => ApiError::Other(err),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_conversion() {
        let repo_err = RepositoryError::NotFound {
            entity: "Student".to_string(),
            id: "3314".to_string(),
        };
        let api_err: ApiError = repo_err.into();
        match api_err {
            ApiError::NotFound(msg) => {
                assert!(msg.contains("Student"));
                assert!(msg.contains("3314"));
            }
            _ => panic!("Expected NotFound"),
        }

        let api_err: ApiError =
            RepositoryError::UniqueConstraintViolation("infraction.hash".to_string()).into();
        assert_eq!(api_err.code(), "STORAGE_CONFLICT");
    }

    #[test]
    fn test_import_error_conversion() {
        let api_err: ApiError = ImportError::TrimesterNotFound("t9".to_string()).into();
        assert_eq!(api_err.code(), "NOT_FOUND");
        assert!(api_err.to_string().contains("t9"));

        let api_err: ApiError = ImportError::FileFormatError("空文件".to_string()).into();
        assert_eq!(api_err.code(), "IMPORT_ERROR");
        assert!(api_err.to_string().contains("空文件"));

        let api_err: ApiError = ImportError::ConfigReadError {
            key: "csv_delimiter".to_string(),
            message: "bad".to_string(),
        }
        .into();
        assert_eq!(api_err.code(), "CONFIG_ERROR");
    }
}
