// ==========================================
// 学校纪律追踪系统 - 学年/学期领域模型
// ==========================================
// 学年由三个首尾相接、互不重叠的学期组成（order 1..3）
// 同一时刻最多一个学年处于激活状态
// 对核心导入流程只读
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// SchoolYear - 学年
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolYear {
    pub school_year_id: String,  // 学年 ID
    pub name: String,            // 学年名称（如 "2025"）
    pub is_active: bool,         // 是否为当前学年
    pub start_date: NaiveDate,   // 学年开始日期
    pub end_date: NaiveDate,     // 学年结束日期
}

// ==========================================
// Trimester - 学期
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trimester {
    pub trimester_id: String,    // 学期 ID
    pub school_year_id: String,  // 所属学年（FK）
    pub name: String,            // 学期名称（如 "Primer Trimestre"）
    pub order: u8,               // 学年内顺序（1..3）
    pub start_date: NaiveDate,   // 开始日期（含）
    pub end_date: NaiveDate,     // 结束日期（含）
}

// ==========================================
// AcademicPeriod - 学期 + 所属学年的扁平视图
// ==========================================
// 用途: 学期归属解析 / 上传时选定的目标学期
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicPeriod {
    pub school_year_id: String,
    pub school_year_name: String,
    pub is_active: bool,
    pub trimester_id: String,
    pub trimester_name: String,
    pub order: u8,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl AcademicPeriod {
    /// 日期是否落在区间内（两端均包含）
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// 诊断用标签: "2025 / Primer Trimestre"
    pub fn label(&self) -> String {
        format!("{} / {}", self.school_year_name, self.trimester_name)
    }
}
