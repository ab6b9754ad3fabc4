// ==========================================
// 班组管理系统 - 绩效 API
// ==========================================
// 职责: 月度绩效增删查、导入、季度等级汇总与人工覆盖
// 季度等级: 周期算法（不衰减）得分 → grade_ranges 下限映射；覆盖值优先
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::api::algorithm_config_api::AlgorithmConfigApi;
use crate::api::error::{ApiError, ApiResult};
use crate::api::import_api::{ImportApi, ImportApiResponse};
use crate::domain::performance::{
    match_grade_option, validate_period, GradeOption, MonthGrade, PerformanceFilter,
    PerformanceInput, PerformanceRecord, QuarterGradeRow,
};
use crate::domain::user::AuthUser;
use crate::engine::access::AccessScope;
use crate::engine::performance::{quarter_months, PerformanceEngine};
use crate::importer::PerformanceImporter;
use crate::repository::{DepartmentRepository, EmployeeRepository, PerformanceRepository, PerformanceUpsert};

pub struct PerformanceApi {
    performance_repo: Arc<PerformanceRepository>,
    employee_repo: Arc<EmployeeRepository>,
    department_repo: Arc<DepartmentRepository>,
    config_api: Arc<AlgorithmConfigApi>,
    import_api: Arc<ImportApi>,
    importer: PerformanceImporter,
}

impl PerformanceApi {
    pub fn new(
        performance_repo: Arc<PerformanceRepository>,
        employee_repo: Arc<EmployeeRepository>,
        department_repo: Arc<DepartmentRepository>,
        config_api: Arc<AlgorithmConfigApi>,
        import_api: Arc<ImportApi>,
    ) -> Self {
        let importer = PerformanceImporter::new(employee_repo.clone(), performance_repo.clone());
        Self {
            performance_repo,
            employee_repo,
            department_repo,
            config_api,
            import_api,
            importer,
        }
    }

    fn scope(&self, user: &AuthUser) -> ApiResult<AccessScope> {
        let departments = self.department_repo.list_all()?;
        Ok(AccessScope::resolve(user, &departments))
    }

    // ==========================================
    // 月度绩效
    // ==========================================

    pub fn list_performance(&self, user: &AuthUser, filter: &PerformanceFilter) -> ApiResult<Vec<PerformanceRecord>> {
        let scope = self.scope(user)?;
        if let Some(dept) = filter.department_id {
            scope.ensure_department(Some(dept))?;
        }
        Ok(self
            .performance_repo
            .list(filter.year, filter.month, filter.emp_no.as_deref())?
            .into_iter()
            .filter(|r| scope.can_view_department(r.department_id))
            .filter(|r| filter.department_id.is_none() || r.department_id == filter.department_id)
            .collect())
    }

    /// 新增或覆盖 (工号, 年, 月) 的绩效
    ///
    /// # 返回
    /// - Err(InvalidInput): 年月越界 / 等级不在选项中 / 得分与等级均为空
    /// - Err(PermissionDenied): 人员不在可写范围
    #[instrument(skip(self, user, input), fields(emp_no = %input.emp_no, year = input.year, month = input.month))]
    pub fn upsert_performance(&self, user: &AuthUser, input: PerformanceInput) -> ApiResult<()> {
        let scope = self.scope(user)?;
        validate_period(input.year, input.month).map_err(ApiError::InvalidInput)?;
        let (employee, _) = self
            .employee_repo
            .find_by_emp_no(input.emp_no.trim())?
            .ok_or_else(|| ApiError::not_found("Employee", &input.emp_no))?;
        scope.ensure_can_write_department(employee.department_id)?;

        let grade = match input.grade.as_deref().map(str::trim).filter(|g| !g.is_empty()) {
            Some(raw) => {
                let options = self.performance_repo.list_grade_options()?;
                Some(
                    match_grade_option(raw, &options)
                        .ok_or_else(|| ApiError::InvalidInput(format!("无效的绩效等级: {}", raw)))?,
                )
            }
            None => None,
        };
        let score = match (input.score, grade.as_ref()) {
            (Some(s), _) => Some(s),
            (None, Some(g)) => self.performance_repo.grade_map()?.get(g).copied(),
            (None, None) => return Err(ApiError::InvalidInput("得分与等级不能同时为空".to_string())),
        };

        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&employee.name);
        self.performance_repo.upsert(&PerformanceUpsert {
            emp_no: &employee.emp_no,
            name,
            year: input.year,
            month: input.month,
            score,
            grade: grade.as_deref(),
            src_file: None,
            created_by: Some(user.id),
        })?;
        info!("绩效已保存");
        Ok(())
    }

    pub fn delete_performance(&self, user: &AuthUser, id: i64) -> ApiResult<()> {
        let scope = self.scope(user)?;
        let record = self
            .performance_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("PerformanceRecord", id))?;
        scope.ensure_can_write_department(record.department_id)?;
        self.performance_repo.delete(id)?;
        info!(id, emp_no = %record.emp_no, "绩效已删除");
        Ok(())
    }

    pub fn import_performance(&self, user: &AuthUser, file_name: &str, bytes: &[u8]) -> ApiResult<ImportApiResponse> {
        self.import_api.run_import(user, &self.importer, file_name, bytes)
    }

    // ==========================================
    // 季度等级
    // ==========================================

    pub fn list_grade_options(&self) -> ApiResult<Vec<GradeOption>> {
        Ok(self.performance_repo.list_grade_options()?)
    }

    /// 季度等级汇总: 范围内每位人员一行
    #[instrument(skip(self, user))]
    pub fn list_quarter_grades(
        &self,
        user: &AuthUser,
        year: i32,
        quarter: u32,
        department_id: Option<i64>,
    ) -> ApiResult<Vec<QuarterGradeRow>> {
        let scope = self.scope(user)?;
        validate_quarter(year, quarter)?;
        if let Some(dept) = department_id {
            scope.ensure_department(Some(dept))?;
        }

        let months = quarter_months(quarter);
        let mut records: HashMap<String, Vec<PerformanceRecord>> = HashMap::new();
        for rec in self
            .performance_repo
            .list_by_months(year, months[0], months[2])?
        {
            records.entry(rec.emp_no.clone()).or_default().push(rec);
        }
        let overrides = self.performance_repo.list_overrides(year, quarter)?;
        let config = self.config_api.current_config()?;
        let engine = PerformanceEngine::new(&config.performance);

        let rows = self
            .employee_repo
            .list(department_id, None)?
            .into_iter()
            .filter(|(e, _)| scope.can_view_department(e.department_id))
            .map(|(employee, department_name)| {
                let recs = records.remove(&employee.emp_no).unwrap_or_default();
                let monthly = months
                    .iter()
                    .map(|&m| {
                        let rec = recs.iter().find(|r| r.month == m);
                        MonthGrade {
                            month: m,
                            grade: rec.and_then(|r| r.grade.clone()),
                            score: rec.and_then(|r| r.score),
                        }
                    })
                    .collect();
                let grades: Vec<Option<String>> = recs
                    .iter()
                    .filter_map(|r| engine.effective_grade(r.grade.as_deref(), r.score))
                    .map(Some)
                    .collect();
                let computed = engine.quarter_grade(&grades);
                let override_grade = overrides.get(&employee.emp_no).map(|o| o.grade.clone());
                let computed_grade = computed.as_ref().map(|c| c.grade.clone());
                QuarterGradeRow {
                    final_grade: override_grade.clone().or_else(|| computed_grade.clone()),
                    is_overridden: override_grade.is_some(),
                    emp_no: employee.emp_no,
                    name: employee.name,
                    department_id: employee.department_id,
                    department_name,
                    monthly,
                    computed_score: computed.map(|c| c.score),
                    computed_grade,
                    override_grade,
                }
            })
            .collect();
        Ok(rows)
    }

    /// 设置季度等级覆盖（全局生效）
    #[instrument(skip(self, user))]
    pub fn set_quarter_override(
        &self,
        user: &AuthUser,
        emp_no: &str,
        year: i32,
        quarter: u32,
        grade: &str,
    ) -> ApiResult<String> {
        validate_quarter(year, quarter)?;
        self.ensure_employee_writable(user, emp_no)?;
        let options = self.performance_repo.list_grade_options()?;
        let grade = match_grade_option(grade, &options)
            .ok_or_else(|| ApiError::InvalidInput(format!("无效的季度等级: {}", grade)))?;
        self.performance_repo
            .upsert_override(emp_no, year, quarter, &grade, Some(user.id))?;
        info!(grade = %grade, "季度等级已覆盖");
        Ok(grade)
    }

    /// 清除覆盖，返回是否存在过覆盖
    pub fn clear_quarter_override(&self, user: &AuthUser, emp_no: &str, year: i32, quarter: u32) -> ApiResult<bool> {
        validate_quarter(year, quarter)?;
        self.ensure_employee_writable(user, emp_no)?;
        Ok(self.performance_repo.delete_override(emp_no, year, quarter)?)
    }

    fn ensure_employee_writable(&self, user: &AuthUser, emp_no: &str) -> ApiResult<()> {
        let scope = self.scope(user)?;
        let (employee, _) = self
            .employee_repo
            .find_by_emp_no(emp_no)?
            .ok_or_else(|| ApiError::not_found("Employee", emp_no))?;
        scope.ensure_can_write_department(employee.department_id)?;
        Ok(())
    }
}

fn validate_quarter(year: i32, quarter: u32) -> ApiResult<()> {
    if !(1..=4).contains(&quarter) {
        return Err(ApiError::InvalidInput(format!("季度超出范围: {}", quarter)));
    }
    validate_period(year, 1).map_err(ApiError::InvalidInput)
}
