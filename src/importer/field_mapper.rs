// ==========================================
// 班组管理系统 - 字段映射器
// ==========================================
// 职责: 表头别名归一 + 单元格类型转换
// ==========================================

use crate::engine::text::normalize_date;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::RawRow;
use chrono::NaiveDate;

/// 标准列名 → 可接受的表头（首项为标准名）
fn aliases(key: &str) -> &[&str] {
    match key {
        "所属部门" => &["所属部门", "部门"],
        "取证时间" => &["取证时间", "取证日期"],
        "单独驾驶时间" => &["单独驾驶时间", "单独驾驶日期"],
        "婚姻状况" => &["婚姻状况", "婚否"],
        "特长及兴趣爱好" => &["特长及兴趣爱好", "特长"],
        "得分" => &["得分", "分数"],
        _ => &[],
    }
}

/// 校验必需列，任一别名出现即视为存在
pub fn require_headers(headers: &[String], required: &[&str]) -> ImportResult<()> {
    let missing: Vec<String> = required
        .iter()
        .filter(|key| {
            let names = aliases(key);
            if names.is_empty() {
                !headers.iter().any(|h| h == *key)
            } else {
                !headers.iter().any(|h| names.contains(&h.as_str()))
            }
        })
        .map(|key| key.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ImportError::MissingHeaders(missing))
    }
}

/// 行读取器
pub struct FieldMapper<'a> {
    row: &'a RawRow,
}

impl<'a> FieldMapper<'a> {
    pub fn new(row: &'a RawRow) -> Self {
        Self { row }
    }

    pub fn row_number(&self) -> usize {
        self.row.row_number
    }

    /// 提取字符串字段，空白视为缺失
    pub fn get_string(&self, key: &str) -> Option<String> {
        let names = aliases(key);
        let candidates: &[&str] = if names.is_empty() { &[key] } else { names };
        candidates.iter().find_map(|name| {
            self.row
                .cells
                .get(*name)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
    }

    /// 必填字符串
    pub fn require_string(&self, key: &str) -> ImportResult<String> {
        self.get_string(key).ok_or_else(|| self.conversion_error(key, "不能为空"))
    }

    pub fn parse_f64(&self, key: &str) -> ImportResult<Option<f64>> {
        match self.get_string(key) {
            None => Ok(None),
            Some(value) => value
                .parse::<f64>()
                .map(Some)
                .map_err(|_| self.conversion_error(key, &format!("无法解析为数字: {}", value))),
        }
    }

    /// 解析整数，兼容 "2024.0" 这类 Excel 数值
    pub fn parse_i64(&self, key: &str) -> ImportResult<Option<i64>> {
        match self.get_string(key) {
            None => Ok(None),
            Some(value) => {
                if let Ok(v) = value.parse::<i64>() {
                    return Ok(Some(v));
                }
                match value.parse::<f64>() {
                    Ok(f) if f.fract() == 0.0 => Ok(Some(f as i64)),
                    _ => Err(self.conversion_error(key, &format!("无法解析为整数: {}", value))),
                }
            }
        }
    }

    /// 宽松日期: 无法识别时视为空
    pub fn parse_date_lenient(&self, key: &str) -> Option<NaiveDate> {
        self.get_string(key).and_then(|v| normalize_date(&v))
    }

    /// 严格日期: 缺失或无法识别均报错
    pub fn require_date(&self, key: &str) -> ImportResult<NaiveDate> {
        let raw = self.require_string(key)?;
        normalize_date(&raw)
            .ok_or_else(|| self.conversion_error(key, &format!("无法识别的日期: {}", raw)))
    }

    /// 是/否 类字段，空值取默认
    pub fn parse_bool(&self, key: &str, default: bool) -> ImportResult<bool> {
        match self.get_string(key) {
            None => Ok(default),
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "是" | "合格" | "true" | "1" | "y" | "yes" | "√" => Ok(true),
                "否" | "不合格" | "false" | "0" | "n" | "no" | "×" => Ok(false),
                _ => Err(self.conversion_error(key, &format!("无法识别的是否值: {}", value))),
            },
        }
    }

    fn conversion_error(&self, key: &str, message: &str) -> ImportError {
        ImportError::InvalidCell {
            row: self.row.row_number,
            column: key.to_string(),
            message: message.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn row(pairs: &[(&str, &str)]) -> RawRow {
        RawRow {
            row_number: 5,
            cells: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_alias_lookup() {
        let r = row(&[("部门", "甲班"), ("婚否", "已婚"), ("分数", "95")]);
        let m = FieldMapper::new(&r);
        assert_eq!(m.get_string("所属部门").as_deref(), Some("甲班"));
        assert_eq!(m.get_string("婚姻状况").as_deref(), Some("已婚"));
        assert_eq!(m.parse_f64("得分").unwrap(), Some(95.0));
        assert_eq!(m.get_string("籍贯"), None);
    }

    #[test]
    fn test_require_headers_with_aliases() {
        let headers: Vec<String> = ["工号", "姓名", "部门"].iter().map(|s| s.to_string()).collect();
        assert!(require_headers(&headers, &["工号", "姓名", "所属部门"]).is_ok());
        match require_headers(&headers, &["工号", "年份", "月份"]) {
            Err(ImportError::MissingHeaders(missing)) => assert_eq!(missing, vec!["年份", "月份"]),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_typed_getters() {
        let r = row(&[("年份", "2024.0"), ("月份", "x"), ("培训日期", "2024/3/5"), ("是否合格", "否")]);
        let m = FieldMapper::new(&r);
        assert_eq!(m.parse_i64("年份").unwrap(), Some(2024));
        assert!(matches!(
            m.parse_i64("月份"),
            Err(ImportError::InvalidCell { row: 5, .. })
        ));
        assert_eq!(m.require_date("培训日期").unwrap(), NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
        assert!(!m.parse_bool("是否合格", true).unwrap());
        assert!(m.parse_bool("是否失格", false).is_ok_and(|v| !v));
        assert!(m.require_string("工号").is_err());
    }
}
