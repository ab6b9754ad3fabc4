// ==========================================
// 班组管理系统 - 人员派生字段与统计图表数据
// ==========================================

use crate::domain::employee::{Employee, PersonnelView};
use crate::engine::round_to;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

const DAYS_PER_YEAR: f64 = 365.25;
const EMPTY_LABEL: &str = "未填写";

/// 周岁
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years.max(0)
}

/// 距今年数（天数 / 365.25，保留1位）；未来日期记 0
pub fn years_since(date: NaiveDate, today: NaiveDate) -> f64 {
    if date > today {
        return 0.0;
    }
    round_to((today - date).num_days() as f64 / DAYS_PER_YEAR, 1)
}

/// 组装人员视图（附带派生字段）
pub fn personnel_view(
    employee: Employee,
    department_name: Option<String>,
    today: NaiveDate,
) -> PersonnelView {
    let since = |d: Option<NaiveDate>| d.map(|d| years_since(d, today));
    PersonnelView {
        age: employee.birth_date.map(|b| age_on(b, today)),
        working_years: since(employee.work_start_date),
        tenure_years: since(employee.entry_date),
        certification_years: since(employee.certification_date),
        solo_driving_years: since(employee.solo_driving_date),
        department_name,
        employee,
    }
}

/// 单个图表序列
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<u32>,
}

impl ChartSeries {
    fn from_buckets(labels: &[&str], values: Vec<u32>) -> Self {
        Self {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            values,
        }
    }

    fn from_counter(counter: BTreeMap<String, u32>) -> Self {
        let (labels, values) = counter.into_iter().unzip();
        Self { labels, values }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonnelCharts {
    pub age: ChartSeries,
    pub education: ChartSeries,
    pub tenure: ChartSeries,
    pub department: ChartSeries,
}

/// 年龄 / 学历 / 司龄 / 部门人数分布
pub fn personnel_charts(rows: &[PersonnelView]) -> PersonnelCharts {
    let mut age = vec![0u32; 4];
    let mut tenure = vec![0u32; 5];
    let mut education: BTreeMap<String, u32> = BTreeMap::new();
    let mut department: BTreeMap<String, u32> = BTreeMap::new();

    for row in rows {
        if let Some(a) = row.age {
            let idx = match a {
                i32::MIN..=25 => 0,
                26..=35 => 1,
                36..=45 => 2,
                _ => 3,
            };
            age[idx] += 1;
        }
        if let Some(t) = row.tenure_years {
            let idx = if t < 1.0 {
                0
            } else if t < 3.0 {
                1
            } else if t < 5.0 {
                2
            } else if t < 10.0 {
                3
            } else {
                4
            };
            tenure[idx] += 1;
        }
        let edu = row
            .employee
            .education
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(EMPTY_LABEL);
        *education.entry(edu.to_string()).or_default() += 1;

        let dept = row
            .department_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(EMPTY_LABEL);
        *department.entry(dept.to_string()).or_default() += 1;
    }

    PersonnelCharts {
        age: ChartSeries::from_buckets(&["25岁及以下", "26-35岁", "36-45岁", "46岁及以上"], age),
        education: ChartSeries::from_counter(education),
        tenure: ChartSeries::from_buckets(&["1年以下", "1-3年", "3-5年", "5-10年", "10年以上"], tenure),
        department: ChartSeries::from_counter(department),
    }
}

// ==========================================
// 司机队伍分析
// ==========================================
// 统计口径: 岗位含"司机"且不含"队长"；政治面貌统计全部人员

const HENAN_CITIES: [&str; 18] = [
    "郑州", "开封", "洛阳", "平顶山", "安阳", "鹤壁", "新乡", "焦作", "濮阳", "许昌", "漯河",
    "三门峡", "南阳", "商丘", "信阳", "周口", "驻马店", "济源",
];

const HENAN_COUNTIES: [&str; 36] = [
    "巩义", "荥阳", "新密", "新郑", "登封", "中牟", "兰考", "杞县", "通许", "尉氏", "偃师", "孟津",
    "新安", "栾川", "嵩县", "汝阳", "宜阳", "洛宁", "伊川", "汝州", "舞钢", "林州", "卫辉", "辉县",
    "沁阳", "孟州", "禹州", "长葛", "义马", "灵宝", "永城", "项城", "邓州", "固始", "鹿邑", "新蔡",
];

const PROVINCES: [&str; 33] = [
    "北京", "天津", "上海", "重庆", "河北", "山西", "辽宁", "吉林", "黑龙江", "江苏", "浙江",
    "安徽", "福建", "江西", "山东", "湖北", "湖南", "广东", "海南", "四川", "贵州", "云南", "陕西",
    "甘肃", "青海", "台湾", "内蒙古", "广西", "西藏", "宁夏", "新疆", "香港", "澳门",
];

const RISK_LABELS: [&str; 5] = ["新手(<1年)", "成长(1-3年)", "熟练(3-5年)", "资深(≥5年)", "未知"];
const POLITICAL_LABELS: [&str; 5] = ["中共党员", "中共预备党员", "共青团员", "群众", "其它"];

/// 司机岗位（排除队长、副队长）
pub fn is_driver(position: Option<&str>) -> bool {
    let position = position.map(str::trim).unwrap_or("");
    !position.contains("队长") && position.contains("司机")
}

/// 经验分类: 取证年限 × 单独驾驶年限
pub fn categorize_experience(cert_years: f64, solo_years: f64) -> &'static str {
    if cert_years >= 5.0 && solo_years < 3.0 {
        "准师傅"
    } else if cert_years >= 5.0 && solo_years >= 5.0 {
        "资深师傅"
    } else if cert_years < 2.0 {
        "新手"
    } else {
        "普通"
    }
}

/// 职业稳定性分类: 入司前工作年限 = 工龄 - 司龄
pub fn categorize_stability(tenure: f64, working: f64) -> &'static str {
    if working - tenure < 1.0 {
        "应届入职"
    } else if tenure < 3.0 {
        "社招(新)"
    } else {
        "社招(老)"
    }
}

/// 籍贯归类: 河南省内到市/县，省外到省份
pub fn extract_location(hometown: Option<&str>) -> String {
    let hometown = match hometown.map(str::trim).filter(|h| !h.is_empty() && *h != EMPTY_LABEL) {
        Some(h) => h,
        None => return EMPTY_LABEL.to_string(),
    };

    let in_henan = hometown.contains("河南")
        || HENAN_CITIES
            .iter()
            .chain(HENAN_COUNTIES.iter())
            .any(|place| hometown.contains(place));
    if in_henan {
        // 县级优先
        return HENAN_COUNTIES
            .iter()
            .chain(HENAN_CITIES.iter())
            .find(|place| hometown.contains(*place))
            .map(|place| format!("河南·{}", place))
            .unwrap_or_else(|| "河南·未详".to_string());
    }

    PROVINCES
        .iter()
        .find(|p| hometown.contains(*p))
        .map(|p| format!("省外·{}", p))
        .unwrap_or_else(|| "省外·其他".to_string())
}

fn risk_bucket(solo_years: Option<f64>) -> usize {
    match solo_years {
        None => 4,
        Some(y) if y < 1.0 => 0,
        Some(y) if y < 3.0 => 1,
        Some(y) if y < 5.0 => 2,
        Some(_) => 3,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        round_to(values.iter().sum::<f64>() / values.len() as f64, 1)
    }
}

/// 末级部门的司机战力
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TeamPower {
    pub department_id: i64,
    pub team: String,
    pub avg_tenure: f64,
    pub avg_solo: f64,
    pub avg_cert: f64,
    pub member_count: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExperiencePoint {
    pub emp_no: String,
    pub name: String,
    pub cert_years: f64,
    pub solo_years: f64,
    pub category: &'static str,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StabilityPoint {
    pub emp_no: String,
    pub name: String,
    pub tenure: f64,
    pub working: f64,
    pub category: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonnelAnalytics {
    pub risk_distribution: ChartSeries,
    pub team_power: Vec<TeamPower>,
    pub experience_scatter: Vec<ExperiencePoint>,
    pub hometown_stats: ChartSeries,
    pub political_stats: ChartSeries,
    pub stability_scatter: Vec<StabilityPoint>,
    pub total_count: usize,
    pub driver_count: usize,
}

/// 司机队伍分析
///
/// `leaf_departments` 为范围内没有子部门的部门（id, 名称），决定 team_power 的行与顺序
pub fn personnel_analytics(
    rows: &[PersonnelView],
    leaf_departments: &[(i64, String)],
) -> PersonnelAnalytics {
    let drivers: Vec<&PersonnelView> = rows
        .iter()
        .filter(|r| is_driver(r.employee.position.as_deref()))
        .collect();

    let mut risk = vec![0u32; RISK_LABELS.len()];
    let mut hometown: BTreeMap<String, u32> = BTreeMap::new();
    let mut experience_scatter = Vec::new();
    let mut stability_scatter = Vec::new();

    for row in &drivers {
        risk[risk_bucket(row.solo_driving_years)] += 1;
        *hometown
            .entry(extract_location(row.employee.hometown.as_deref()))
            .or_default() += 1;

        if let (Some(cert), Some(solo)) = (row.certification_years, row.solo_driving_years) {
            experience_scatter.push(ExperiencePoint {
                emp_no: row.employee.emp_no.clone(),
                name: row.employee.name.clone(),
                cert_years: round_to(cert, 1),
                solo_years: round_to(solo, 1),
                category: categorize_experience(cert, solo),
            });
        }
        if let (Some(tenure), Some(working)) = (row.tenure_years, row.working_years) {
            stability_scatter.push(StabilityPoint {
                emp_no: row.employee.emp_no.clone(),
                name: row.employee.name.clone(),
                tenure: round_to(tenure, 1),
                working: round_to(working, 1),
                category: categorize_stability(tenure, working),
            });
        }
    }

    let team_power = leaf_departments
        .iter()
        .filter_map(|(id, name)| {
            let members: Vec<&&PersonnelView> = drivers
                .iter()
                .filter(|r| r.employee.department_id == Some(*id))
                .collect();
            if members.is_empty() {
                return None;
            }
            let collect = |f: fn(&PersonnelView) -> Option<f64>| -> Vec<f64> {
                members.iter().filter_map(|r| f(r)).collect()
            };
            Some(TeamPower {
                department_id: *id,
                team: name.clone(),
                avg_tenure: mean(&collect(|r| r.tenure_years)),
                avg_solo: mean(&collect(|r| r.solo_driving_years)),
                avg_cert: mean(&collect(|r| r.certification_years)),
                member_count: members.len() as u32,
            })
        })
        .collect();

    let mut political = vec![0u32; POLITICAL_LABELS.len()];
    for row in rows {
        let status = row.employee.political_status.as_deref().map(str::trim).unwrap_or("");
        let idx = POLITICAL_LABELS[..4]
            .iter()
            .position(|l| *l == status)
            .unwrap_or(4);
        political[idx] += 1;
    }

    PersonnelAnalytics {
        risk_distribution: ChartSeries::from_buckets(&RISK_LABELS, risk),
        team_power,
        experience_scatter,
        hometown_stats: ChartSeries::from_counter(hometown),
        political_stats: ChartSeries::from_buckets(&POLITICAL_LABELS, political),
        stability_scatter,
        total_count: rows.len(),
        driver_count: drivers.len(),
    }
}
