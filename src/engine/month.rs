// ==========================================
// 班组管理系统 - 年月工具
// ==========================================
// 统计周期按自然月划分，格式 YYYY-MM
// ==========================================

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 自然月 (year, month)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// 解析 "YYYY-MM"（也接受 "YYYY-MM-DD"，取前7位）
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let head = s.get(..7).unwrap_or(s);
        let (y, m) = head.split_once('-')?;
        let year = y.parse::<i32>().ok()?;
        let month = m.parse::<u32>().ok()?;
        Self::new(year, month)
    }

    /// 连续月序号: year * 12 + (month - 1)
    pub fn index(&self) -> i32 {
        self.year * 12 + (self.month as i32 - 1)
    }

    pub fn from_index(idx: i32) -> Self {
        Self {
            year: idx.div_euclid(12),
            month: (idx.rem_euclid(12) + 1) as u32,
        }
    }

    pub fn shift(&self, delta: i32) -> Self {
        Self::from_index(self.index() + delta)
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.shift(1)
            .first_day()
            .pred_opt()
            .unwrap_or_else(|| self.first_day())
    }

    /// 两个月之间的月数差 (self - other)
    pub fn months_since(&self, other: &YearMonth) -> i32 {
        self.index() - other.index()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        YearMonth::parse(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("无效的年月: {}", s)))
    }
}

/// 闭区间月份序列，start 晚于 end 时为空
pub fn month_range(start: YearMonth, end: YearMonth) -> Vec<YearMonth> {
    (start.index()..=end.index()).map(YearMonth::from_index).collect()
}
