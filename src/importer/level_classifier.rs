// ==========================================
// 学校纪律追踪系统 - 学段分类器
// ==========================================
// 输入: 班级文本（CSV "Sección" 列，如 "Décimo Segundo A"）
// 流程: 规范化 → 已知班级名精确匹配 → 前缀匹配 → 关键词/数字回退
// 红线: 已知班级名按长度降序尝试（"decimo segundo" 先于 "decimo"）
// 红线: 永不失败，无法识别时返回 Unclassified
// ==========================================
// 已知缺陷: 关键词回退基于子串，"1" 包含于 "10"/"11"/"12" 之中，
//           只能靠"高年级先查"缓解，属于尽力而为的路径
// ==========================================

use crate::domain::types::AcademicLevel;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// 已知班级名（已规范化）
const SECTION_CATALOG: &[(AcademicLevel, &[&str])] = &[
    (
        AcademicLevel::EarlyChildhood,
        &["maternal", "caminadores", "parvulos", "prejardin", "pre jardin"],
    ),
    (
        AcademicLevel::Preschool,
        &["jardin", "prekinder", "pre kinder", "kinder", "transicion"],
    ),
    (
        AcademicLevel::Elementary,
        &["primero", "segundo", "tercero", "cuarto", "quinto"],
    ),
    (
        AcademicLevel::MiddleSchool,
        &["sexto", "septimo", "octavo", "noveno"],
    ),
    (
        AcademicLevel::HighSchool,
        &[
            "decimo",
            "decimo primero",
            "decimo segundo",
            "undecimo",
            "duodecimo",
            "once",
            "doce",
        ],
    ),
];

// 回退关键词: 高年级在前
const KEYWORD_FALLBACK: &[(AcademicLevel, &[&str])] = &[
    (
        AcademicLevel::HighSchool,
        &["duodecimo", "doce", "12", "undecimo", "once", "11", "decimo", "10"],
    ),
    (
        AcademicLevel::MiddleSchool,
        &["noveno", "9", "octavo", "8", "septimo", "7", "sexto", "6"],
    ),
    (
        AcademicLevel::Elementary,
        &["quinto", "5", "cuarto", "4", "tercero", "3", "segundo", "2", "primero", "1"],
    ),
    (AcademicLevel::Preschool, &["transicion", "kinder", "jardin"]),
    (
        AcademicLevel::EarlyChildhood,
        &["parvulos", "maternal", "caminadores"],
    ),
];

/// 匹配方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrategy {
    Exact,
    Prefix,
    Keyword,
    Unmatched,
}

/// 分类明细（用于诊断与测试）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelMatch {
    pub level: AcademicLevel,
    pub matched: Option<&'static str>,
    pub strategy: MatchStrategy,
}

pub struct AcademicLevelClassifier;

impl AcademicLevelClassifier {
    /// 班级文本 → 学段
    pub fn classify(section: &str) -> AcademicLevel {
        Self::classify_detailed(section).level
    }

    /// 班级文本 → 学段 + 命中的规则
    pub fn classify_detailed(section: &str) -> LevelMatch {
        let text = normalize(section);
        if text.is_empty() {
            return LevelMatch {
                level: AcademicLevel::Unclassified,
                matched: None,
                strategy: MatchStrategy::Unmatched,
            };
        }

        let catalog = sorted_catalog();

        // 1. 精确匹配
        if let Some((label, level)) = catalog.iter().find(|(label, _)| *label == text) {
            return LevelMatch {
                level: *level,
                matched: Some(*label),
                strategy: MatchStrategy::Exact,
            };
        }

        // 2. 前缀匹配（需落在词边界上: "quinto a" 命中 "quinto"，"oncefoo" 不命中 "once"）
        if let Some((label, level)) = catalog.iter().find(|(label, _)| {
            text.strip_prefix(*label)
                .map(|rest| rest.starts_with(' '))
                .unwrap_or(false)
        }) {
            return LevelMatch {
                level: *level,
                matched: Some(*label),
                strategy: MatchStrategy::Prefix,
            };
        }

        // 3. 关键词/数字回退
        for (level, keywords) in KEYWORD_FALLBACK {
            if let Some(keyword) = keywords.iter().find(|k| text.contains(*k)) {
                return LevelMatch {
                    level: *level,
                    matched: Some(*keyword),
                    strategy: MatchStrategy::Keyword,
                };
            }
        }

        LevelMatch {
            level: AcademicLevel::Unclassified,
            matched: None,
            strategy: MatchStrategy::Unmatched,
        }
    }
}

/// 规范化: 去重音（NFD 后丢弃组合符）→ 小写 → 非字母数字替换为空格 → 合并空白
pub fn normalize(value: &str) -> String {
    let stripped: String = value
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(|c| c.to_lowercase())
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

// 全部已知班级名，按长度降序（同长按字典序，保证确定性）
fn sorted_catalog() -> &'static [(&'static str, AcademicLevel)] {
    static CATALOG: OnceLock<Vec<(&'static str, AcademicLevel)>> = OnceLock::new();
    CATALOG.get_or_init(|| {
        let mut entries: Vec<(&'static str, AcademicLevel)> = SECTION_CATALOG
            .iter()
            .flat_map(|(level, labels)| labels.iter().map(move |label| (*label, *level)))
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
        entries
    })
}
