// ==========================================
// 班组管理系统 - 文本规范化工具
// ==========================================
// 培训项目名清洗 / 考核扣分提取 / 日期规范化
// ==========================================

use chrono::{Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// 项目名开头的序号模式（多级编号在前，纯数字在最后）
fn numbering_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"^\d+(\.\d+)+\s+",
            r"^\d+\.\s*",
            r"^\d+、\s*",
            r"^（\d+）\s*",
            r"^\(\d+\)\s*",
            r"^\[\d+\]\s*",
            r"^【\d+】\s*",
            r"^\d+\s+",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

fn trailing_punctuation() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"[，。、；：！？]+$").ok())
        .as_ref()
}

fn number_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"\d+(?:\.\d+)?").ok())
        .as_ref()
}

/// 清洗培训项目名称: 去掉开头序号和结尾中文标点
///
/// # 示例
/// - "1. 安全培训，" → "安全培训"
/// - "（3）应急处理" → "应急处理"
pub fn normalize_project_name(name: &str) -> String {
    let mut result = name.trim().to_string();
    for pattern in numbering_patterns() {
        result = pattern.replace(&result, "").into_owned();
    }
    if let Some(tail) = trailing_punctuation() {
        result = tail.replace(&result, "").into_owned();
    }
    result.trim().to_string()
}

/// 从考核文本中提取扣分值，如 "扣3分" → 3.0；无数字返回 0.0
pub fn extract_score_from_assessment(text: Option<&str>) -> f64 {
    let Some(text) = text.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0.0;
    };
    number_pattern()
        .and_then(|re| re.find(text))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Excel 序列日期基准 (1899-12-30)
fn excel_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Excel 序列号转日期
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    excel_epoch()?.checked_add_signed(Duration::days(serial.trunc() as i64))
}

/// 日期规范化
///
/// 支持 YYYY-MM-DD / YYYY/MM/DD / YYYY.MM.DD / YYYYMMDD，
/// 年月格式取当月1日，纯数字（≤5位整数部分）按 Excel 序列号处理
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%Y年%m月%d日"] {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d);
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    for (sep, suffix) in [("-", ""), ("/", ""), (".", ""), ("年", "月")] {
        let body = raw.strip_suffix(suffix).unwrap_or(raw);
        if suffix.is_empty() || body.len() != raw.len() {
            if let Some((y, m)) = body.split_once(sep) {
                if let (Ok(y), Ok(m)) = (y.parse::<i32>(), m.parse::<u32>()) {
                    if y >= 1000 {
                        if let Some(d) = NaiveDate::from_ymd_opt(y, m, 1) {
                            return Some(d);
                        }
                    }
                }
            }
        }
    }

    if raw.chars().all(|c| c.is_ascii_digit()) {
        return match raw.len() {
            8 => NaiveDate::from_ymd_opt(
                raw[..4].parse().ok()?,
                raw[4..6].parse().ok()?,
                raw[6..].parse().ok()?,
            ),
            6 => NaiveDate::from_ymd_opt(raw[..4].parse().ok()?, raw[4..].parse().ok()?, 1),
            1..=5 => excel_serial_to_date(raw.parse().ok()?),
            _ => None,
        };
    }
    match raw.parse::<f64>() {
        Ok(serial) if serial < 100_000.0 => excel_serial_to_date(serial),
        _ => None,
    }
}

/// 规范化为 "YYYY-MM-DD" 字符串，无法解析时返回 None
pub fn normalize_date_str(raw: &str) -> Option<String> {
    normalize_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_project_name() {
        assert_eq!(normalize_project_name("1. 安全培训，"), "安全培训");
        assert_eq!(normalize_project_name("2、消防演练。"), "消防演练");
        assert_eq!(normalize_project_name("（3）应急处理"), "应急处理");
        assert_eq!(normalize_project_name("(4)设备点检"), "设备点检");
        assert_eq!(normalize_project_name("【5】 调车作业"), "调车作业");
        assert_eq!(normalize_project_name("1.2.3 规章学习"), "规章学习");
        assert_eq!(normalize_project_name("10 机车整备"), "机车整备");
        assert_eq!(normalize_project_name("  普通项目  "), "普通项目");
    }

    #[test]
    fn test_extract_score() {
        assert_eq!(extract_score_from_assessment(Some("扣3分")), 3.0);
        assert_eq!(extract_score_from_assessment(Some("考核2.5分")), 2.5);
        assert_eq!(extract_score_from_assessment(Some("3")), 3.0);
        assert_eq!(extract_score_from_assessment(Some("口头警告")), 0.0);
        assert_eq!(extract_score_from_assessment(None), 0.0);
    }

    #[test]
    fn test_normalize_date_formats() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day);
        assert_eq!(normalize_date("2024-03-15"), d(2024, 3, 15));
        assert_eq!(normalize_date("2024/3/5"), d(2024, 3, 5));
        assert_eq!(normalize_date("2024.03.15"), d(2024, 3, 15));
        assert_eq!(normalize_date("20240315"), d(2024, 3, 15));
        assert_eq!(normalize_date("2024-03"), d(2024, 3, 1));
        assert_eq!(normalize_date("1990年7月"), d(1990, 7, 1));
        assert_eq!(normalize_date("2024-03-15 08:30:00"), d(2024, 3, 15));
        assert_eq!(normalize_date("45366"), d(2024, 3, 15));
        assert_eq!(normalize_date("45366.0"), d(2024, 3, 15));
        assert_eq!(normalize_date("不详"), None);
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date_str("2024/3/5").as_deref(), Some("2024-03-05"));
    }
}
