// ==========================================
// 学校纪律追踪系统 - 日期列读写工具
// ==========================================
// 职责: 统一 NaiveDate / NaiveDateTime 的存储格式
// 格式: DATE = "%Y-%m-%d"，DATETIME = "%Y-%m-%d %H:%M:%S"
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 日期 → 存储字符串
pub fn fmt_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// 日期时间 → 存储字符串
pub fn fmt_datetime(ts: NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

/// 读取 DATE 列
///
/// 格式错误时返回 FromSqlConversionFailure（不静默替换为默认日期）
pub fn parse_date_column(raw: &str, col: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, Type::Text, Box::new(e))
    })
}

/// 读取 DATETIME 列
pub fn parse_datetime_column(raw: &str, col: usize) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(col, Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_column_round_trip() {
        let d = NaiveDate::from_ymd_opt(2025, 8, 26).unwrap();
        assert_eq!(fmt_date(d), "2025-08-26");
        assert_eq!(parse_date_column("2025-08-26", 0).unwrap(), d);
        assert!(parse_date_column("26/08/2025", 0).is_err());
    }

    #[test]
    fn test_datetime_column_format() {
        let ts = NaiveDate::from_ymd_opt(2025, 8, 27)
            .unwrap()
            .and_hms_opt(10, 28, 0)
            .unwrap();
        assert_eq!(fmt_datetime(ts), "2025-08-27 10:28:00");
        assert_eq!(parse_datetime_column("2025-08-27 10:28:00", 3).unwrap(), ts);
    }
}
