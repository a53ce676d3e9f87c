// ==========================================
// 学校纪律追踪系统 - 应用命令
// ==========================================
// 职责: 命令定义,连接调用方（CLI）与后端 API
// 约定: 成功返回 JSON 字符串；失败返回 ErrorResponse 的 JSON 字符串
// ==========================================

use crate::api::error::ApiError;
use crate::api::ImportInfractionsRequest;
use crate::app::state::AppState;
use crate::domain::infraction::DuplicateHandling;
use crate::domain::period::{SchoolYear, Trimester};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// 公共工具：错误映射、日期解析
// ==========================================

/// 错误响应（返回给调用方）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// 错误代码
    pub code: String,

    /// 错误消息
    pub message: String,
}

/// 将ApiError转换为JSON字符串
pub fn map_api_error(err: ApiError) -> String {
    let error_response = ErrorResponse {
        code: err.code().to_string(),
        message: err.to_string(),
    };

    serde_json::to_string(&error_response).unwrap_or_else(|_| err.to_string())
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("序列化失败: {}", e))
}

/// 解析日期字符串（YYYY-MM-DD）
pub fn parse_date(date_str: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
        map_api_error(ApiError::InvalidInput(format!(
            "日期格式错误（应为YYYY-MM-DD）: {}",
            e
        )))
    })
}

// ==========================================
// 违纪导入相关命令
// ==========================================

/// 导入违纪 CSV
///
/// duplicate_handling 为 `{"action": "...", "duplicateHashes": [...]}` 的 JSON 文本
pub async fn import_infractions(
    state: &AppState,
    file_path: String,
    fault_type: String,
    trimester_id: String,
    duplicate_handling: Option<String>,
) -> Result<String, String> {
    tracing::info!(file_path = %file_path, fault_type = %fault_type, trimester_id = %trimester_id, "[import_infractions] 收到请求");

    let duplicate_handling = match duplicate_handling {
        Some(raw) => Some(serde_json::from_str::<DuplicateHandling>(&raw).map_err(|e| {
            map_api_error(ApiError::InvalidInput(format!(
                "duplicateHandling 无法解析: {}",
                e
            )))
        })?),
        None => None,
    };

    let request = ImportInfractionsRequest {
        file_path,
        fault_type,
        trimester_id,
        duplicate_handling,
    };

    let outcome = state
        .import_api
        .import_infractions(request)
        .await
        .map_err(|e| {
            tracing::error!(error = ?e, "[import_infractions] 导入失败");
            map_api_error(e)
        })?;

    to_json(&outcome)
}

/// 按日期诊断文件中每行所属学期
pub async fn diagnose_periods(
    state: &AppState,
    file_path: String,
    school_year_id: Option<String>,
) -> Result<String, String> {
    let report = state
        .import_api
        .diagnose_periods(&file_path, school_year_id.as_deref())
        .await
        .map_err(map_api_error)?;
    to_json(&report)
}

/// 列出最近的导入批次
pub fn list_import_batches(state: &AppState, limit: Option<usize>) -> Result<String, String> {
    let batches = state
        .import_api
        .list_import_batches(limit)
        .map_err(map_api_error)?;
    to_json(&batches)
}

// ==========================================
// 学年/学期相关命令
// ==========================================

/// 学年初始化载荷（seed-periods 的 JSON 文件格式）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolYearSeed {
    pub school_year: SchoolYear,
    pub trimesters: Vec<Trimester>,
}

/// 创建学年与学期
pub fn seed_periods(state: &AppState, seed_json: &str) -> Result<String, String> {
    let seed: SchoolYearSeed = serde_json::from_str(seed_json).map_err(|e| {
        map_api_error(ApiError::InvalidInput(format!("学年载荷无法解析: {}", e)))
    })?;

    state
        .period_api
        .create_school_year_with_trimesters(&seed.school_year, &seed.trimesters)
        .map_err(map_api_error)?;

    to_json(&seed)
}

/// 列出学期区间
pub async fn list_academic_periods(
    state: &AppState,
    school_year_id: Option<String>,
) -> Result<String, String> {
    let periods = state
        .period_api
        .list_academic_periods(school_year_id.as_deref())
        .await
        .map_err(map_api_error)?;
    to_json(&periods)
}

/// 按日期探测所属学期
pub async fn detect_academic_period(
    state: &AppState,
    date: String,
    school_year_id: Option<String>,
) -> Result<String, String> {
    let date = parse_date(&date)?;
    let period = state
        .period_api
        .detect_academic_period(date, school_year_id.as_deref())
        .await
        .map_err(map_api_error)?;
    to_json(&period)
}

// ==========================================
// 配置相关命令
// ==========================================

/// 读取全部 global 配置
pub fn get_config_snapshot(state: &AppState) -> Result<String, String> {
    state
        .config_manager
        .get_config_snapshot()
        .map_err(|e| map_api_error(ApiError::ConfigError(e.to_string())))
}

/// 写入 global 配置
pub fn set_config_value(state: &AppState, key: &str, value: &str) -> Result<String, String> {
    state
        .config_manager
        .set_global_config_value(key, value)
        .map_err(|e| map_api_error(ApiError::ConfigError(e.to_string())))?;
    tracing::info!(key = %key, value = %value, "配置已更新");
    get_config_snapshot(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_api_error_json() {
        let json = map_api_error(ApiError::NotFound("学期不存在: t9".to_string()));
        let parsed: ErrorResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.code, "NOT_FOUND");
        assert!(parsed.message.contains("t9"));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-08-26").unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 26).unwrap()
        );
        let err = parse_date("26/08/2025").unwrap_err();
        assert!(err.contains("INVALID_INPUT"));
    }
}
