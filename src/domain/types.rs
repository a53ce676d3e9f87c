// ==========================================
// 学校纪律追踪系统 - 领域类型定义
// ==========================================
// 违纪类型 / 学段 / 重复处理动作 / 导入阶段
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 违纪类型 (Fault Type)
// ==========================================
// 由上传人员按批次指定,不从内容推断
// 序列化格式: "Tipo I" / "Tipo II" / "Tipo III"（与上传表单一致）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FaultType {
    #[serde(rename = "Tipo I")]
    TypeI,
    #[serde(rename = "Tipo II")]
    TypeII,
    #[serde(rename = "Tipo III")]
    TypeIII,
}

impl fmt::Display for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl FaultType {
    /// 从表单/数据库字符串解析（容忍大小写与多余空白）
    pub fn from_str(s: &str) -> Option<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_uppercase().as_str() {
            "TIPO I" | "TYPEI" | "TYPE I" | "I" => Some(FaultType::TypeI),
            "TIPO II" | "TYPEII" | "TYPE II" | "II" => Some(FaultType::TypeII),
            "TIPO III" | "TYPEIII" | "TYPE III" | "III" => Some(FaultType::TypeIII),
            _ => None,
        }
    }

    /// 转换为数据库存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            FaultType::TypeI => "Tipo I",
            FaultType::TypeII => "Tipo II",
            FaultType::TypeIII => "Tipo III",
        }
    }
}

// ==========================================
// 学段 (Academic Level)
// ==========================================
// 有序闭集: EarlyChildhood < Preschool < Elementary < MiddleSchool < HighSchool
// Unclassified 排在最后,表示无法识别的班级文本
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AcademicLevel {
    EarlyChildhood, // 幼儿段（Maternal / Párvulos）
    Preschool,      // 学前（Prekínder / Kínder / Transición）
    Elementary,     // 小学（1-5 年级）
    MiddleSchool,   // 初中（6-9 年级）
    HighSchool,     // 高中（10-12 年级）
    Unclassified,   // 未识别
}

impl fmt::Display for AcademicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl AcademicLevel {
    /// 所有可分类学段（不含 Unclassified），从低到高
    pub const ORDERED: [AcademicLevel; 5] = [
        AcademicLevel::EarlyChildhood,
        AcademicLevel::Preschool,
        AcademicLevel::Elementary,
        AcademicLevel::MiddleSchool,
        AcademicLevel::HighSchool,
    ];

    /// 从数据库字符串解析（未知值视为 Unclassified）
    pub fn from_str(s: &str) -> Self {
        match s.trim() {
            "EARLY_CHILDHOOD" => AcademicLevel::EarlyChildhood,
            "PRESCHOOL" => AcademicLevel::Preschool,
            "ELEMENTARY" => AcademicLevel::Elementary,
            "MIDDLE_SCHOOL" => AcademicLevel::MiddleSchool,
            "HIGH_SCHOOL" => AcademicLevel::HighSchool,
            _ => AcademicLevel::Unclassified,
        }
    }

    /// 转换为数据库存储字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AcademicLevel::EarlyChildhood => "EARLY_CHILDHOOD",
            AcademicLevel::Preschool => "PRESCHOOL",
            AcademicLevel::Elementary => "ELEMENTARY",
            AcademicLevel::MiddleSchool => "MIDDLE_SCHOOL",
            AcademicLevel::HighSchool => "HIGH_SCHOOL",
            AcademicLevel::Unclassified => "UNCLASSIFIED",
        }
    }
}

// ==========================================
// 重复记录处理动作 (Duplicate Action)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateAction {
    Ignore, // 保留库中记录不变
    Update, // 用新解析的字段覆盖库中记录
}

impl Default for DuplicateAction {
    fn default() -> Self {
        DuplicateAction::Ignore
    }
}

impl fmt::Display for DuplicateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DuplicateAction::Ignore => write!(f, "ignore"),
            DuplicateAction::Update => write!(f, "update"),
        }
    }
}

// ==========================================
// 导入阶段 (Import Phase)
// ==========================================
// PREVIEW: 首次上传,未提供处理策略
// COMMIT: 携带重复处理策略的第二次提交
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportPhase {
    Preview,
    Commit,
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl ImportPhase {
    pub fn from_str(s: &str) -> Self {
        match s.trim() {
            "COMMIT" => ImportPhase::Commit,
            _ => ImportPhase::Preview,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ImportPhase::Preview => "PREVIEW",
            ImportPhase::Commit => "COMMIT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_type_from_form_value() {
        assert_eq!(FaultType::from_str("Tipo I"), Some(FaultType::TypeI));
        assert_eq!(FaultType::from_str("  tipo   ii "), Some(FaultType::TypeII));
        assert_eq!(FaultType::from_str("Tipo III"), Some(FaultType::TypeIII));
        assert_eq!(FaultType::from_str("Tipo IV"), None);
    }

    #[test]
    fn test_fault_type_serde_uses_form_labels() {
        let json = serde_json::to_string(&FaultType::TypeII).unwrap();
        assert_eq!(json, "\"Tipo II\"");
        let parsed: FaultType = serde_json::from_str("\"Tipo III\"").unwrap();
        assert_eq!(parsed, FaultType::TypeIII);
    }

    #[test]
    fn test_academic_level_order() {
        assert!(AcademicLevel::EarlyChildhood < AcademicLevel::Preschool);
        assert!(AcademicLevel::Elementary < AcademicLevel::MiddleSchool);
        assert!(AcademicLevel::MiddleSchool < AcademicLevel::HighSchool);
        for level in AcademicLevel::ORDERED {
            assert_eq!(AcademicLevel::from_str(level.to_db_str()), level);
        }
    }

    #[test]
    fn test_duplicate_action_default_is_ignore() {
        assert_eq!(DuplicateAction::default(), DuplicateAction::Ignore);
        let parsed: DuplicateAction = serde_json::from_str("\"update\"").unwrap();
        assert_eq!(parsed, DuplicateAction::Update);
    }
}
