// ==========================================
// 班组管理系统 - 综合分析 API
// ==========================================
// 职责: 个人五维画像、人才九宫格、重点人员、九宫格导出
// 数据: 绩效/培训按工号关联，安全检查按被检查人姓名关联
// 配置: 统一取当前生效的算法配置
// ==========================================

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::{debug, instrument};

use crate::api::algorithm_config_api::AlgorithmConfigApi;
use crate::api::error::{ApiError, ApiResult};
use crate::config::AlgorithmConfig;
use crate::domain::employee::Employee;
use crate::domain::performance::PerformanceRecord;
use crate::domain::training::{TrainingFilter, TrainingRecord};
use crate::domain::user::AuthUser;
use crate::engine::access::AccessScope;
use crate::engine::learning::LearningEngine;
use crate::engine::month::{month_range, YearMonth};
use crate::engine::performance::{MonthlyPerformanceScore, PerformanceEngine, PeriodPerformanceScore};
use crate::engine::personnel_stats::years_since;
use crate::engine::text::extract_score_from_assessment;
use crate::engine::{
    comprehensive_score, key_personnel, nine_grid_placement, DimensionScores, GridPlacement,
    KeyPersonnelVerdict, LearningScore, SafetyEngine, SafetyScore, StabilityEngine,
    StabilityScore, TrainingEngine, TrainingSample, TrainingScore,
};
use crate::importer::{write_sheet, XlsxCell};
use crate::repository::{
    DepartmentRepository, EmployeeRepository, PerformanceRepository, SafetyRepository,
    TrainingRepository,
};

/// 单月且仅有一条记录时缺失的原始分
const DEFAULT_RAW_SCORE: f64 = 95.0;
/// 无法计算班组均值时的默认值
const DEFAULT_GROUP_AVG: f64 = 1.0;

const NINE_GRID_HEADERS: [&str; 12] = [
    "工号", "姓名", "部门", "X分数", "Y分数", "九宫格位置", "绩效", "安全", "培训", "稳定性",
    "学习能力", "综合分",
];

/// 九宫格格子名称（行自上而下，列自左而右）
pub fn grid_label(row: u8, col: u8) -> &'static str {
    match (row, col) {
        (1, 1) => "培养对象",
        (1, 2) => "潜力新星",
        (1, 3) => "明星员工",
        (2, 1) => "改善对象",
        (2, 2) => "中坚力量",
        (2, 3) => "骨干员工",
        (3, 1) => "问题员工",
        (3, 2) => "需关注",
        _ => "待观察稳定",
    }
}

// ==========================================
// 返回结构
// ==========================================

/// 统计周期（闭区间，按自然月）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnalysisPeriod {
    pub start: YearMonth,
    pub end: YearMonth,
}

impl AnalysisPeriod {
    /// 解析统计周期: 均缺省取当月；仅给开始月则到当月；仅给结束月则为单月
    pub fn resolve(
        start: Option<YearMonth>,
        end: Option<YearMonth>,
        today: YearMonth,
    ) -> ApiResult<Self> {
        let (start, end) = match (start, end) {
            (None, None) => (today, today),
            (Some(s), None) => (s, today.max(s)),
            (None, Some(e)) => (e, e),
            (Some(s), Some(e)) => (s, e),
        };
        if start > end {
            return Err(ApiError::InvalidInput(format!(
                "开始月份 {} 晚于结束月份 {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn is_monthly(&self) -> bool {
        self.start == self.end
    }

    pub fn months(&self) -> Vec<YearMonth> {
        month_range(self.start, self.end)
    }

    pub fn month_count(&self) -> u32 {
        (self.end.months_since(&self.start) + 1).max(1) as u32
    }

    pub fn first_day(&self) -> NaiveDate {
        self.start.first_day()
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end.last_day()
    }

    fn contains(&self, date: NaiveDate) -> bool {
        date >= self.first_day() && date <= self.last_day()
    }
}

/// 绩效维度结果: 单月快照或周期加权
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PerformanceResult {
    Monthly(MonthlyPerformanceScore),
    Period(PeriodPerformanceScore),
}

impl PerformanceResult {
    pub fn radar_value(&self) -> f64 {
        match self {
            PerformanceResult::Monthly(m) => m.radar_value,
            PerformanceResult::Period(p) => p.radar_value,
        }
    }
}

/// 学习能力维度结果；单月时附带判定明细
#[derive(Debug, Clone, Serialize)]
pub struct LearningResult {
    pub score: f64,
    pub detail: Option<LearningScore>,
}

/// 个人五维画像
#[derive(Debug, Clone, Serialize)]
pub struct EmployeeProfile {
    pub emp_no: String,
    pub name: String,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub period: AnalysisPeriod,
    pub performance: PerformanceResult,
    pub safety: SafetyScore,
    pub training: TrainingScore,
    pub learning: LearningResult,
    pub stability: StabilityScore,
    pub scores: DimensionScores,
    pub comprehensive_score: f64,
    pub key_personnel: KeyPersonnelVerdict,
    pub grid: GridPlacement,
    pub grid_label: String,
}

/// 九宫格成员
#[derive(Debug, Clone, Serialize)]
pub struct NineGridMember {
    pub emp_no: String,
    pub name: String,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub scores: DimensionScores,
    pub comprehensive_score: f64,
    #[serde(flatten)]
    pub placement: GridPlacement,
    pub grid_label: String,
}

/// 九宫格格子汇总
#[derive(Debug, Clone, Serialize)]
pub struct NineGridCell {
    pub grid_row: u8,
    pub grid_col: u8,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct NineGridReport {
    pub period: AnalysisPeriod,
    pub members: Vec<NineGridMember>,
    pub cells: Vec<NineGridCell>,
}

/// 重点人员
#[derive(Debug, Clone, Serialize)]
pub struct KeyPersonnelEntry {
    pub emp_no: String,
    pub name: String,
    pub department_id: Option<i64>,
    pub department_name: Option<String>,
    pub comprehensive_score: f64,
    pub violation_count: usize,
    pub avg_freq: u32,
    pub reasons: Vec<String>,
}

// ==========================================
// 周期数据快照
// ==========================================

/// 一次分析所需的原始记录，按人员分组
struct PeriodData {
    period: AnalysisPeriod,
    stability_window: (YearMonth, YearMonth),
    /// 工号 → 周期内绩效记录（时间升序）
    performance: HashMap<String, Vec<PerformanceRecord>>,
    /// 工号 → 周期内培训记录
    training: HashMap<String, Vec<TrainingRecord>>,
    /// 姓名 → 违规（日期, 扣分），覆盖稳定度查询窗口与周期前一月
    violations: HashMap<String, Vec<(NaiveDate, f64)>>,
}

impl PeriodData {
    fn violations_of(&self, name: &str) -> &[(NaiveDate, f64)] {
        self.violations.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    fn count_in(&self, name: &str, month: YearMonth) -> u32 {
        self.violations_of(name)
            .iter()
            .filter(|(d, _)| month.contains(*d))
            .count() as u32
    }

    /// 班组人均月违规数: 周期内违规总数 / 有违规人数 / 月数
    fn group_average(&self, names: &[&str]) -> f64 {
        let mut total = 0usize;
        let mut persons = 0usize;
        for name in names.iter().collect::<HashSet<_>>() {
            let n = self
                .violations_of(name)
                .iter()
                .filter(|(d, _)| self.period.contains(*d))
                .count();
            if n > 0 {
                total += n;
                persons += 1;
            }
        }
        if persons == 0 {
            return DEFAULT_GROUP_AVG;
        }
        total as f64 / persons as f64 / self.period.month_count() as f64
    }
}

/// 单人评估结果
struct Evaluation {
    performance: PerformanceResult,
    safety: SafetyScore,
    training: TrainingScore,
    learning: LearningResult,
    stability: StabilityScore,
    scores: DimensionScores,
    comprehensive: f64,
    verdict: KeyPersonnelVerdict,
    grid: GridPlacement,
}

fn evaluate(
    config: &AlgorithmConfig,
    employee: &Employee,
    data: &PeriodData,
    group_avg: f64,
    today: NaiveDate,
) -> Evaluation {
    let period = data.period;
    let today_month = YearMonth::from_date(today);

    // 绩效
    let perf_engine = PerformanceEngine::new(&config.performance);
    let records = data
        .performance
        .get(&employee.emp_no)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let performance = match records {
        [only] if period.is_monthly() => PerformanceResult::Monthly(perf_engine.monthly(
            perf_engine
                .effective_grade(only.grade.as_deref(), only.score)
                .as_deref(),
            only.score.unwrap_or(DEFAULT_RAW_SCORE),
        )),
        _ => {
            let graded: Vec<(String, YearMonth)> = records
                .iter()
                .filter_map(|r| {
                    let grade = perf_engine.effective_grade(r.grade.as_deref(), r.score)?;
                    Some((grade, YearMonth::new(r.year, r.month)?))
                })
                .collect();
            let grades: Vec<Option<String>> =
                graded.iter().map(|(g, _)| Some(g.clone())).collect();
            let months: Vec<YearMonth> = graded.iter().map(|(_, m)| *m).collect();
            PerformanceResult::Period(perf_engine.period(&grades, Some(&months), today_month))
        }
    };

    // 安全
    let in_period: Vec<f64> = data
        .violations_of(&employee.name)
        .iter()
        .filter(|(d, _)| period.contains(*d))
        .map(|(_, deduction)| *deduction)
        .collect();
    let safety = SafetyEngine::new(&config.safety).dual_track(&in_period, period.month_count());

    // 培训
    let samples: Vec<TrainingSample> = data
        .training
        .get(&employee.emp_no)
        .map(|rows| {
            rows.iter()
                .map(|r| TrainingSample {
                    score: r.score,
                    is_qualified: r.is_qualified,
                    is_disqualified: r.is_disqualified,
                })
                .collect()
        })
        .unwrap_or_default();
    let duration_days = (period.last_day() - period.first_day()).num_days() + 1;
    let cert_years = employee.certification_date.map(|d| years_since(d, today));
    let training =
        TrainingEngine::new(&config.training).with_penalty(&samples, duration_days, cert_years);

    // 学习能力
    let learning_engine = LearningEngine::new(&config.learning_new);
    let previous = data.count_in(&employee.name, period.start.shift(-1));
    let learning = if period.is_monthly() {
        let current = data.count_in(&employee.name, period.start);
        let detail = learning_engine.ability(current, Some(previous), group_avg);
        LearningResult {
            score: detail.score,
            detail: Some(detail),
        }
    } else {
        let counts: Vec<u32> = period
            .months()
            .into_iter()
            .map(|m| data.count_in(&employee.name, m))
            .collect();
        LearningResult {
            score: learning_engine.period(&counts, Some(previous), group_avg),
            detail: None,
        }
    };

    // 稳定度
    let (window_start, window_end) = data.stability_window;
    let stability_engine = StabilityEngine::new(config);
    let query_start = stability_engine.query_start(window_start, window_end).first_day();
    let mut by_month: BTreeMap<YearMonth, Vec<f64>> = BTreeMap::new();
    for (date, deduction) in data.violations_of(&employee.name) {
        if *date >= query_start && *date <= window_end.last_day() {
            by_month
                .entry(YearMonth::from_date(*date))
                .or_default()
                .push(*deduction);
        }
    }
    let stability =
        stability_engine.evaluate(window_start, window_end, &by_month, Some(safety.final_score));

    let scores = DimensionScores {
        performance: performance.radar_value(),
        safety: safety.final_score,
        training: training.radar_score,
        stability: stability.stability_score,
        learning: learning.score,
    };
    let weights = &config.comprehensive.score_weights;
    let comprehensive = comprehensive_score(&scores, weights);
    let verdict = key_personnel(comprehensive, safety.avg_freq, &config.key_personnel);
    let grid = nine_grid_placement(&scores, weights, &config.nine_grid.y_axis_weights);

    Evaluation {
        performance,
        safety,
        training,
        learning,
        stability,
        scores,
        comprehensive,
        verdict,
        grid,
    }
}

// ==========================================
// AnalyticsApi - 综合分析
// ==========================================
pub struct AnalyticsApi {
    employee_repo: Arc<EmployeeRepository>,
    department_repo: Arc<DepartmentRepository>,
    performance_repo: Arc<PerformanceRepository>,
    training_repo: Arc<TrainingRepository>,
    safety_repo: Arc<SafetyRepository>,
    config_api: Arc<AlgorithmConfigApi>,
}

impl AnalyticsApi {
    pub fn new(
        employee_repo: Arc<EmployeeRepository>,
        department_repo: Arc<DepartmentRepository>,
        performance_repo: Arc<PerformanceRepository>,
        training_repo: Arc<TrainingRepository>,
        safety_repo: Arc<SafetyRepository>,
        config_api: Arc<AlgorithmConfigApi>,
    ) -> Self {
        Self {
            employee_repo,
            department_repo,
            performance_repo,
            training_repo,
            safety_repo,
            config_api,
        }
    }

    fn scope(&self, user: &AuthUser) -> ApiResult<AccessScope> {
        let departments = self.department_repo.list_all()?;
        Ok(AccessScope::resolve(user, &departments))
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// 加载周期快照
    fn load(&self, config: &AlgorithmConfig, period: AnalysisPeriod, today: NaiveDate) -> ApiResult<PeriodData> {
        let stability_engine = StabilityEngine::new(config);
        let window = stability_engine.resolve_window(
            Some(period.start),
            Some(period.end),
            YearMonth::from_date(today),
        );
        let query_start = stability_engine
            .query_start(window.0, window.1)
            .min(period.start.shift(-1));
        let query_end = period.end.max(window.1);

        let mut performance: HashMap<String, Vec<PerformanceRecord>> = HashMap::new();
        for record in self.performance_repo.list(None, None, None)? {
            let in_range = YearMonth::new(record.year, record.month)
                .map_or(false, |m| m >= period.start && m <= period.end);
            if in_range {
                performance.entry(record.emp_no.clone()).or_default().push(record);
            }
        }
        for rows in performance.values_mut() {
            rows.sort_by_key(|r| (r.year, r.month));
        }

        let mut training: HashMap<String, Vec<TrainingRecord>> = HashMap::new();
        let filter = TrainingFilter {
            start_date: Some(period.first_day()),
            end_date: Some(period.last_day()),
            ..Default::default()
        };
        for record in self.training_repo.list_records(&filter)? {
            training.entry(record.emp_no.clone()).or_default().push(record);
        }

        let mut violations: HashMap<String, Vec<(NaiveDate, f64)>> = HashMap::new();
        for record in self
            .safety_repo
            .list_between(query_start.first_day(), query_end.last_day())?
        {
            let Some(person) = record.inspected_person.as_deref().map(str::trim) else {
                continue;
            };
            let deduction = extract_score_from_assessment(record.assessment.as_deref());
            if !person.is_empty() && deduction > 0.0 {
                violations
                    .entry(person.to_string())
                    .or_default()
                    .push((record.inspection_date, deduction));
            }
        }

        Ok(PeriodData {
            period,
            stability_window: window,
            performance,
            training,
            violations,
        })
    }

    /// 范围内人员（附部门名），可按部门筛选
    fn employees_in_scope(
        &self,
        scope: &AccessScope,
        department_id: Option<i64>,
    ) -> ApiResult<Vec<(Employee, Option<String>)>> {
        if department_id.is_some() {
            scope.ensure_department(department_id)?;
        }
        Ok(self
            .employee_repo
            .list(department_id, None)?
            .into_iter()
            .filter(|(e, _)| scope.can_view_department(e.department_id))
            .collect())
    }

    /// 批量评估: 班组均值按部门分组计算
    fn evaluate_all(
        &self,
        employees: &[(Employee, Option<String>)],
        period: AnalysisPeriod,
    ) -> ApiResult<Vec<Evaluation>> {
        let config = self.config_api.current_config()?;
        let today = Self::today();
        let data = self.load(&config, period, today)?;

        let mut names_by_dept: HashMap<Option<i64>, Vec<&str>> = HashMap::new();
        for (e, _) in employees {
            names_by_dept.entry(e.department_id).or_default().push(e.name.as_str());
        }
        let group_avgs: HashMap<Option<i64>, f64> = names_by_dept
            .iter()
            .map(|(dept, names)| (*dept, data.group_average(names)))
            .collect();

        Ok(employees
            .iter()
            .map(|(e, _)| {
                let avg = group_avgs
                    .get(&e.department_id)
                    .copied()
                    .unwrap_or(DEFAULT_GROUP_AVG);
                evaluate(&config, e, &data, avg, today)
            })
            .collect())
    }

    /// 个人五维画像
    ///
    /// # 参数
    /// - `start_month` / `end_month`: 统计周期，缺省为当月
    #[instrument(skip(self, user))]
    pub fn employee_profile(
        &self,
        user: &AuthUser,
        emp_no: &str,
        start_month: Option<YearMonth>,
        end_month: Option<YearMonth>,
    ) -> ApiResult<EmployeeProfile> {
        let scope = self.scope(user)?;
        let (employee, department_name) = self
            .employee_repo
            .find_by_emp_no(emp_no)?
            .ok_or_else(|| ApiError::not_found("Employee", emp_no))?;
        scope.ensure_department(employee.department_id)?;

        let today = Self::today();
        let period = AnalysisPeriod::resolve(start_month, end_month, YearMonth::from_date(today))?;
        let config = self.config_api.current_config()?;
        let data = self.load(&config, period, today)?;

        let group = match employee.department_id {
            Some(dept) => self.employee_repo.list(Some(dept), None)?,
            None => vec![(employee.clone(), None)],
        };
        let names: Vec<&str> = group.iter().map(|(e, _)| e.name.as_str()).collect();
        let group_avg = data.group_average(&names);
        debug!(emp_no, group_avg, "班组均值");

        let ev = evaluate(&config, &employee, &data, group_avg, today);
        Ok(EmployeeProfile {
            emp_no: employee.emp_no,
            name: employee.name,
            department_id: employee.department_id,
            department_name,
            period,
            grid_label: grid_label(ev.grid.grid_row, ev.grid.grid_col).to_string(),
            performance: ev.performance,
            safety: ev.safety,
            training: ev.training,
            learning: ev.learning,
            stability: ev.stability,
            scores: ev.scores,
            comprehensive_score: ev.comprehensive,
            key_personnel: ev.verdict,
            grid: ev.grid,
        })
    }

    /// 人才九宫格
    #[instrument(skip(self, user))]
    pub fn nine_grid(
        &self,
        user: &AuthUser,
        start_month: Option<YearMonth>,
        end_month: Option<YearMonth>,
        department_id: Option<i64>,
    ) -> ApiResult<NineGridReport> {
        let scope = self.scope(user)?;
        let period =
            AnalysisPeriod::resolve(start_month, end_month, YearMonth::from_date(Self::today()))?;
        let employees = self.employees_in_scope(&scope, department_id)?;
        let evaluations = self.evaluate_all(&employees, period)?;

        let mut counts: BTreeMap<(u8, u8), usize> = BTreeMap::new();
        let members: Vec<NineGridMember> = employees
            .into_iter()
            .zip(evaluations)
            .map(|((e, department_name), ev)| {
                *counts.entry((ev.grid.grid_row, ev.grid.grid_col)).or_default() += 1;
                NineGridMember {
                    emp_no: e.emp_no,
                    name: e.name,
                    department_id: e.department_id,
                    department_name,
                    scores: ev.scores,
                    comprehensive_score: ev.comprehensive,
                    grid_label: grid_label(ev.grid.grid_row, ev.grid.grid_col).to_string(),
                    placement: ev.grid,
                }
            })
            .collect();

        let mut cells = Vec::with_capacity(9);
        for row in 1..=3u8 {
            for col in 1..=3u8 {
                cells.push(NineGridCell {
                    grid_row: row,
                    grid_col: col,
                    label: grid_label(row, col).to_string(),
                    count: counts.get(&(row, col)).copied().unwrap_or(0),
                });
            }
        }

        Ok(NineGridReport {
            period,
            members,
            cells,
        })
    }

    /// 重点人员名单（按综合分升序）
    #[instrument(skip(self, user))]
    pub fn key_personnel(
        &self,
        user: &AuthUser,
        start_month: Option<YearMonth>,
        end_month: Option<YearMonth>,
    ) -> ApiResult<Vec<KeyPersonnelEntry>> {
        let scope = self.scope(user)?;
        let period =
            AnalysisPeriod::resolve(start_month, end_month, YearMonth::from_date(Self::today()))?;
        let employees = self.employees_in_scope(&scope, None)?;
        let evaluations = self.evaluate_all(&employees, period)?;

        let mut entries: Vec<KeyPersonnelEntry> = employees
            .into_iter()
            .zip(evaluations)
            .filter(|(_, ev)| ev.verdict.is_key_personnel)
            .map(|((e, department_name), ev)| KeyPersonnelEntry {
                emp_no: e.emp_no,
                name: e.name,
                department_id: e.department_id,
                department_name,
                comprehensive_score: ev.comprehensive,
                violation_count: ev.safety.violation_count,
                avg_freq: ev.safety.avg_freq,
                reasons: ev.verdict.reasons,
            })
            .collect();
        entries.sort_by(|a, b| {
            a.comprehensive_score
                .total_cmp(&b.comprehensive_score)
                .then_with(|| a.emp_no.cmp(&b.emp_no))
        });
        Ok(entries)
    }

    /// 导出九宫格明细
    pub fn export_nine_grid(
        &self,
        user: &AuthUser,
        start_month: Option<YearMonth>,
        end_month: Option<YearMonth>,
        department_id: Option<i64>,
    ) -> ApiResult<Vec<u8>> {
        let report = self.nine_grid(user, start_month, end_month, department_id)?;
        let rows: Vec<Vec<XlsxCell>> = report
            .members
            .into_iter()
            .map(|m| {
                vec![
                    XlsxCell::from(m.emp_no),
                    XlsxCell::from(m.name),
                    XlsxCell::from(m.department_name),
                    XlsxCell::from(m.placement.x_score),
                    XlsxCell::from(m.placement.y_score),
                    XlsxCell::from(m.grid_label),
                    XlsxCell::from(m.scores.performance),
                    XlsxCell::from(m.scores.safety),
                    XlsxCell::from(m.scores.training),
                    XlsxCell::from(m.scores.stability),
                    XlsxCell::from(m.scores.learning),
                    XlsxCell::from(m.comprehensive_score),
                ]
            })
            .collect();
        Ok(write_sheet("人才九宫格", &NINE_GRID_HEADERS, &rows)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::safety::NewSafetyRecord;
    use crate::domain::types::UserRole;
    use crate::repository::performance_repo::PerformanceUpsert;
    use crate::repository::test_support::setup_conn;
    use crate::repository::{AlgorithmConfigRepository, UserRepository};

    struct Fixture {
        api: AnalyticsApi,
        admin: AuthUser,
        manager: AuthUser,
        other_dept: i64,
    }

    fn ym(y: i32, m: u32) -> Option<YearMonth> {
        YearMonth::new(y, m)
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn fixture() -> Fixture {
        let conn = setup_conn();
        let dept_repo = Arc::new(DepartmentRepository::from_connection(conn.clone()));
        let root = dept_repo.find_by_id(1).unwrap().unwrap();
        let own = dept_repo.create("甲班", Some(&root), None, None).unwrap();
        let other = dept_repo.create("乙班", Some(&root), None, None).unwrap();

        let employee_repo = Arc::new(EmployeeRepository::from_connection(conn.clone()));
        for (no, name, dept) in [
            ("E001", "张三", own.id),
            ("E002", "李四", own.id),
            ("E003", "王五", other.id),
        ] {
            employee_repo
                .upsert(
                    &Employee {
                        emp_no: no.to_string(),
                        name: name.to_string(),
                        department_id: Some(dept),
                        ..Default::default()
                    },
                    None,
                )
                .unwrap();
        }

        let performance_repo = Arc::new(PerformanceRepository::from_connection(conn.clone()));
        for (no, name, grade) in [("E001", "张三", "B"), ("E002", "李四", "A")] {
            performance_repo
                .upsert(&PerformanceUpsert {
                    emp_no: no,
                    name,
                    year: 2024,
                    month: 3,
                    score: Some(90.0),
                    grade: Some(grade),
                    src_file: None,
                    created_by: None,
                })
                .unwrap();
        }

        let safety_repo = Arc::new(SafetyRepository::from_connection(conn.clone()));
        for day in ["2024-03-05", "2024-03-12", "2024-03-20"] {
            safety_repo
                .insert(
                    &NewSafetyRecord {
                        inspection_date: date(day),
                        inspected_person: Some("张三".to_string()),
                        assessment: Some("扣2分".to_string()),
                        category: None,
                        location: None,
                        hazard_description: None,
                        corrective_measures: None,
                        deadline_date: None,
                        responsible_team: None,
                        rectification_status: None,
                        rectifier: None,
                        work_type: None,
                        responsibility_location: None,
                        inspection_item: None,
                        source_file: None,
                    },
                    None,
                )
                .unwrap();
        }

        let config_api = Arc::new(AlgorithmConfigApi::new(Arc::new(
            AlgorithmConfigRepository::from_connection(conn.clone()),
        )));
        let api = AnalyticsApi::new(
            employee_repo,
            dept_repo,
            performance_repo,
            Arc::new(TrainingRepository::from_connection(conn.clone())),
            safety_repo,
            config_api,
        );
        let admin = UserRepository::from_connection(conn)
            .load_auth_user(1)
            .unwrap()
            .unwrap();
        let manager = AuthUser {
            id: 7,
            username: "m".to_string(),
            display_name: None,
            role: UserRole::Manager,
            department_id: Some(own.id),
            department_name: Some(own.name.clone()),
            department_path: Some(own.path),
        };
        Fixture {
            api,
            admin,
            manager,
            other_dept: other.id,
        }
    }

    #[test]
    fn test_period_resolution() {
        let today = YearMonth::new(2024, 6).unwrap();
        let p = AnalysisPeriod::resolve(None, None, today).unwrap();
        assert!(p.is_monthly());
        assert_eq!(p.start, today);

        let p = AnalysisPeriod::resolve(ym(2024, 1), ym(2024, 3), today).unwrap();
        assert_eq!(p.month_count(), 3);
        assert_eq!(p.first_day(), date("2024-01-01"));
        assert_eq!(p.last_day(), date("2024-03-31"));

        assert!(matches!(
            AnalysisPeriod::resolve(ym(2024, 5), ym(2024, 3), today),
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_grid_labels() {
        assert_eq!(grid_label(1, 3), "明星员工");
        assert_eq!(grid_label(2, 2), "中坚力量");
        assert_eq!(grid_label(3, 1), "问题员工");
    }

    #[test]
    fn test_profile_flags_frequent_violator() {
        let f = fixture();
        let zhang = f
            .api
            .employee_profile(&f.admin, "E001", ym(2024, 3), ym(2024, 3))
            .unwrap();
        let li = f
            .api
            .employee_profile(&f.admin, "E002", ym(2024, 3), ym(2024, 3))
            .unwrap();

        assert_eq!(zhang.safety.violation_count, 3);
        assert_eq!(zhang.safety.avg_freq, 3);
        assert!(zhang.scores.safety < li.scores.safety);
        assert!(zhang.key_personnel.is_key_personnel);
        assert!(zhang.key_personnel.reasons.iter().any(|r| r.contains("月均违规")));
        assert!(!li.key_personnel.reasons.iter().any(|r| r.contains("月均违规")));

        assert!(matches!(zhang.performance, PerformanceResult::Monthly(_)));
        assert!(zhang.learning.detail.is_some());
        assert_eq!(zhang.department_name.as_deref(), Some("甲班"));
    }

    #[test]
    fn test_profile_period_mode_uses_weighted_learning() {
        let f = fixture();
        let p = f
            .api
            .employee_profile(&f.admin, "E001", ym(2024, 1), ym(2024, 3))
            .unwrap();
        assert!(matches!(p.performance, PerformanceResult::Period(_)));
        assert!(p.learning.detail.is_none());
        assert_eq!(p.safety.avg_freq, 1);
    }

    #[test]
    fn test_profile_respects_department_scope() {
        let f = fixture();
        assert!(matches!(
            f.api.employee_profile(&f.manager, "E003", ym(2024, 3), ym(2024, 3)),
            Err(ApiError::PermissionDenied(_))
        ));
        assert!(matches!(
            f.api.employee_profile(&f.admin, "E999", None, None),
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_nine_grid_counts_match_members() {
        let f = fixture();
        let report = f.api.nine_grid(&f.admin, ym(2024, 3), ym(2024, 3), None).unwrap();
        assert_eq!(report.members.len(), 3);
        assert_eq!(report.cells.len(), 9);
        assert_eq!(report.cells.iter().map(|c| c.count).sum::<usize>(), 3);
        for m in &report.members {
            assert!((1..=3).contains(&m.placement.grid_row));
            assert!((1..=3).contains(&m.placement.grid_col));
        }

        let scoped = f.api.nine_grid(&f.manager, ym(2024, 3), ym(2024, 3), None).unwrap();
        assert_eq!(scoped.members.len(), 2);
        assert!(matches!(
            f.api.nine_grid(&f.manager, ym(2024, 3), ym(2024, 3), Some(f.other_dept)),
            Err(ApiError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_key_personnel_list() {
        let f = fixture();
        let list = f.api.key_personnel(&f.admin, ym(2024, 3), ym(2024, 3)).unwrap();
        assert!(list.iter().any(|e| e.emp_no == "E001"));
        let zhang = list.iter().find(|e| e.emp_no == "E001").unwrap();
        assert_eq!(zhang.violation_count, 3);
    }

    #[test]
    fn test_export_nine_grid_is_xlsx() {
        let f = fixture();
        let bytes = f
            .api
            .export_nine_grid(&f.admin, ym(2024, 3), ym(2024, 3), None)
            .unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }
}
