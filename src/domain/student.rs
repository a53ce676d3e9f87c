// ==========================================
// 学校纪律追踪系统 - 学生领域模型
// ==========================================

use crate::domain::types::AcademicLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// Student - 学生主数据
// ==========================================
// 主键: student_id（UUID）
// 业务唯一键: code（学校学号，CSV "Código" 列）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub student_id: String,
    pub code: String,
    pub full_name: Option<String>,
    pub section: Option<String>,
    pub academic_level: AcademicLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ==========================================
// StudentProfile - 导入时随行携带的学生信息
// ==========================================
// 用途: 查找或惰性创建学生时写入/刷新的字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub full_name: Option<String>,
    pub section: Option<String>,
    pub academic_level: AcademicLevel,
}
