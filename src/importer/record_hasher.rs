// ==========================================
// 学校纪律追踪系统 - 记录指纹
// ==========================================
// 规范串: "{学号}|{YYYY-MM-DD}|{描述}"
// 摘要:   SHA-256，64 位小写十六进制
// 红线: 不纳入作者、编辑人、编辑时间、违纪类型
// ==========================================

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

const FIELD_SEPARATOR: char = '|';

/// 参与指纹计算的稳定字段
#[derive(Debug, Clone, Copy)]
pub struct HashFields<'a> {
    pub student_code: &'a str,
    pub occurred_on: NaiveDate,
    pub description: &'a str,
}

pub struct RecordHasher;

impl RecordHasher {
    /// 计算记录指纹
    pub fn hash(fields: &HashFields<'_>) -> String {
        let canonical = Self::canonical(fields);
        format!("{:x}", Sha256::digest(canonical.as_bytes()))
    }

    /// 规范串
    ///
    /// 学号与描述先去首尾空白、合并内部连续空白；
    /// 学号中的分隔符被转义，描述位于末尾无需转义
    pub fn canonical(fields: &HashFields<'_>) -> String {
        let code = collapse_whitespace(fields.student_code)
            .replace('\\', "\\\\")
            .replace(FIELD_SEPARATOR, "\\|");
        format!(
            "{code}{sep}{date}{sep}{desc}",
            code = code,
            sep = FIELD_SEPARATOR,
            date = fields.occurred_on.format("%Y-%m-%d"),
            desc = collapse_whitespace(fields.description),
        )
    }
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields<'a>(code: &'a str, desc: &'a str) -> HashFields<'a> {
        HashFields {
            student_code: code,
            occurred_on: NaiveDate::from_ymd_opt(2025, 8, 27).unwrap(),
            description: desc,
        }
    }

    #[test]
    fn test_canonical_form_uses_separator() {
        assert_eq!(
            RecordHasher::canonical(&fields("1234", "description text")),
            "1234|2025-08-27|description text"
        );
    }

    #[test]
    fn test_hash_is_stable_hex_digest() {
        let a = RecordHasher::hash(&fields("3314", "texto X"));
        let b = RecordHasher::hash(&fields("3314", "texto X"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_incidental_whitespace_does_not_change_hash() {
        assert_eq!(
            RecordHasher::hash(&fields("3314", "texto   X ")),
            RecordHasher::hash(&fields(" 3314", "texto X"))
        );
    }

    #[test]
    fn test_description_and_date_change_hash() {
        let base = RecordHasher::hash(&fields("3314", "texto X"));
        assert_ne!(base, RecordHasher::hash(&fields("3314", "texto Y")));

        let mut other_day = fields("3314", "texto X");
        other_day.occurred_on = NaiveDate::from_ymd_opt(2025, 8, 28).unwrap();
        assert_ne!(base, RecordHasher::hash(&other_day));
    }

    #[test]
    fn test_field_boundaries_are_unambiguous() {
        // "12" + "3|..." 与 "123" + "..." 不得相撞
        assert_ne!(
            RecordHasher::canonical(&fields("12|3", "x")),
            RecordHasher::canonical(&fields("12", "3|x"))
        );
    }
}
