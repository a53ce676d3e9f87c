// ==========================================
// 学校纪律追踪系统 - 日期解析器
// ==========================================
// 输入格式: DD/MM/YYYY，可带时间部分（"27/08/2025 10:28"）
// 红线: 固定按 日/月/年 解释，不做 MM/DD 回退
// 红线: 只构造无时区的 NaiveDate，任何运行时区下结果一致
// ==========================================

use crate::importer::error::DateFormatError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

const TIME_FORMATS: [&str; 4] = ["%H:%M:%S", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

pub struct DateInterpreter;

impl DateInterpreter {
    /// 解析日期（丢弃时间部分）
    ///
    /// # 返回
    /// - Ok(NaiveDate)
    /// - Err(DateFormatError): 无日期段 / 段数不为 3 / 非数字 / 年份非四位 / 日历上不存在
    pub fn parse(raw: &str) -> Result<NaiveDate, DateFormatError> {
        let date_token = raw
            .split_whitespace()
            .next()
            .ok_or_else(|| DateFormatError::new(raw, "空值"))?;
        Self::parse_date_token(raw, date_token)
    }

    /// 解析创建时间（保留时间部分，缺省 00:00）
    pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, DateFormatError> {
        let mut tokens = raw.split_whitespace();
        let date_token = tokens
            .next()
            .ok_or_else(|| DateFormatError::new(raw, "空值"))?;
        let date = Self::parse_date_token(raw, date_token)?;

        let time_part = tokens.collect::<Vec<_>>().join(" ");
        if time_part.is_empty() {
            return Ok(date.and_time(NaiveTime::MIN));
        }

        // "10:28 a. m." → "10:28 AM"
        let normalized = time_part
            .to_uppercase()
            .replace("A. M.", "AM")
            .replace("P. M.", "PM")
            .replace("A.M.", "AM")
            .replace("P.M.", "PM");

        TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(&normalized, fmt).ok())
            .map(|time| date.and_time(time))
            .ok_or_else(|| DateFormatError::new(raw, format!("时间部分 '{}' 无法识别", time_part)))
    }

    fn parse_date_token(raw: &str, token: &str) -> Result<NaiveDate, DateFormatError> {
        let segments: Vec<&str> = token.split('/').collect();
        if segments.len() != 3 {
            return Err(DateFormatError::new(raw, "应为 DD/MM/YYYY"));
        }
        if segments
            .iter()
            .any(|s| s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(DateFormatError::new(raw, "日期段必须为数字"));
        }
        if segments[2].len() != 4 {
            return Err(DateFormatError::new(raw, "年份必须为四位数字"));
        }

        let day: u32 = parse_segment(raw, segments[0])?;
        let month: u32 = parse_segment(raw, segments[1])?;
        let year: i32 = parse_segment(raw, segments[2])?;

        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| DateFormatError::new(raw, "日历上不存在的日期"))
    }
}

fn parse_segment<T: std::str::FromStr>(raw: &str, segment: &str) -> Result<T, DateFormatError> {
    segment
        .parse::<T>()
        .map_err(|_| DateFormatError::new(raw, format!("日期段 '{}' 超出范围", segment)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_time_component_is_dropped() {
        assert_eq!(DateInterpreter::parse("27/08/2025 10:28").unwrap(), ymd(2025, 8, 27));
        assert_eq!(DateInterpreter::parse("27/08/2025").unwrap(), ymd(2025, 8, 27));
        assert_eq!(DateInterpreter::parse("  27/08/2025  ").unwrap(), ymd(2025, 8, 27));
    }

    #[test]
    fn test_day_month_order_is_fixed() {
        // 03/04 永远是 4 月 3 日
        assert_eq!(DateInterpreter::parse("03/04/2025").unwrap(), ymd(2025, 4, 3));
        // 第二段 > 12 不会被交换解释
        assert!(DateInterpreter::parse("08/27/2025").is_err());
    }

    #[test]
    fn test_result_independent_of_process_timezone() {
        let before = DateInterpreter::parse("26/08/2025").unwrap();
        std::env::set_var("TZ", "America/Bogota");
        let bogota = DateInterpreter::parse("26/08/2025").unwrap();
        std::env::set_var("TZ", "Asia/Tokyo");
        let tokyo = DateInterpreter::parse("26/08/2025").unwrap();
        assert_eq!(before, ymd(2025, 8, 26));
        assert_eq!(bogota, before);
        assert_eq!(tokyo, before);
    }

    #[test]
    fn test_rejects_impossible_and_malformed_dates() {
        for raw in [
            "31/04/2025",
            "29/02/2025",
            "00/01/2025",
            "2025-08-27",
            "27/08",
            "27/08/25",
            "aa/08/2025",
            "27//2025",
            "",
            "   ",
        ] {
            assert!(DateInterpreter::parse(raw).is_err(), "应拒绝: {:?}", raw);
        }
        assert_eq!(DateInterpreter::parse("29/02/2024").unwrap(), ymd(2024, 2, 29));
    }

    #[test]
    fn test_parse_timestamp_keeps_time() {
        let ts = DateInterpreter::parse_timestamp("27/08/2025 10:28").unwrap();
        assert_eq!(ts, ymd(2025, 8, 27).and_hms_opt(10, 28, 0).unwrap());

        let ts = DateInterpreter::parse_timestamp("27/08/2025 3:05 p. m.").unwrap();
        assert_eq!(ts, ymd(2025, 8, 27).and_hms_opt(15, 5, 0).unwrap());

        let midnight = DateInterpreter::parse_timestamp("27/08/2025").unwrap();
        assert_eq!(midnight, ymd(2025, 8, 27).and_hms_opt(0, 0, 0).unwrap());

        let err = DateInterpreter::parse_timestamp("27/08/2025 25:99").unwrap_err();
        assert!(err.reason.contains("25:99"));
    }
}
