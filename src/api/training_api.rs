// ==========================================
// 班组管理系统 - 培训 API
// ==========================================
// 职责: 项目分类/项目维护、培训记录增删查、补考、导入、统计
// 权限: 记录按工号所属部门过滤；工号不在人员表中的记录仅管理员可见
// ==========================================

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::import_api::{ImportApi, ImportApiResponse};
use crate::domain::training::{
    NewTrainingRecord, ProjectCount, TrainingCategory, TrainingFilter, TrainingInput,
    TrainingProject, TrainingRecord, TrainingStats,
};
use crate::domain::user::AuthUser;
use crate::engine::access::AccessScope;
use crate::engine::round_to;
use crate::engine::text::{normalize_date, normalize_project_name};
use crate::importer::TrainingImporter;
use crate::repository::{DepartmentRepository, EmployeeRepository, TrainingRepository};

/// 未关联项目的统计标签
const NO_PROJECT_LABEL: &str = "未分类";

pub struct TrainingApi {
    training_repo: Arc<TrainingRepository>,
    employee_repo: Arc<EmployeeRepository>,
    department_repo: Arc<DepartmentRepository>,
    import_api: Arc<ImportApi>,
    importer: TrainingImporter,
}

impl TrainingApi {
    pub fn new(
        training_repo: Arc<TrainingRepository>,
        employee_repo: Arc<EmployeeRepository>,
        department_repo: Arc<DepartmentRepository>,
        import_api: Arc<ImportApi>,
    ) -> Self {
        let importer = TrainingImporter::new(employee_repo.clone(), training_repo.clone());
        Self {
            training_repo,
            employee_repo,
            department_repo,
            import_api,
            importer,
        }
    }

    fn scope(&self, user: &AuthUser) -> ApiResult<AccessScope> {
        let departments = self.department_repo.list_all()?;
        Ok(AccessScope::resolve(user, &departments))
    }

    /// 工号 → 部门
    fn employee_departments(&self) -> ApiResult<HashMap<String, Option<i64>>> {
        Ok(self
            .employee_repo
            .list(None, None)?
            .into_iter()
            .map(|(e, _)| (e.emp_no, e.department_id))
            .collect())
    }

    // ==========================================
    // 分类与项目
    // ==========================================

    pub fn list_categories(&self) -> ApiResult<Vec<TrainingCategory>> {
        Ok(self.training_repo.list_categories()?)
    }

    pub fn create_category(&self, user: &AuthUser, name: &str) -> ApiResult<i64> {
        self.scope(user)?.ensure_can_write()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("分类名称不能为空".to_string()));
        }
        if self.training_repo.find_category_by_name(name)?.is_some() {
            return Err(ApiError::Conflict(format!("分类已存在: {}", name)));
        }
        let id = self.training_repo.create_category(name)?;
        info!(id, name, "培训分类已创建");
        Ok(id)
    }

    pub fn list_projects(&self, category_id: Option<i64>) -> ApiResult<Vec<TrainingProject>> {
        Ok(self.training_repo.list_projects(category_id)?)
    }

    /// 新建项目: 名称规范化后在同一分类内不得重复
    pub fn create_project(&self, user: &AuthUser, name: &str, category_id: Option<i64>) -> ApiResult<i64> {
        self.scope(user)?.ensure_can_write()?;
        let name = normalize_project_name(name);
        if name.is_empty() {
            return Err(ApiError::InvalidInput("项目名称不能为空".to_string()));
        }
        if let Some(cid) = category_id {
            if !self.training_repo.category_exists(cid)? {
                return Err(ApiError::not_found("TrainingCategory", cid));
            }
        }
        let duplicate = self
            .training_repo
            .list_projects(category_id)?
            .into_iter()
            .filter(|p| p.category_id == category_id)
            .any(|p| normalize_project_name(&p.name) == name);
        if duplicate {
            return Err(ApiError::Conflict(format!("项目已存在: {}", name)));
        }
        let id = self.training_repo.create_project(&name, category_id)?;
        info!(id, name = %name, "培训项目已创建");
        Ok(id)
    }

    pub fn delete_project(&self, user: &AuthUser, id: i64) -> ApiResult<()> {
        self.scope(user)?.ensure_can_write()?;
        let used = self.training_repo.count_records_for_project(id)?;
        if used > 0 {
            return Err(ApiError::BusinessRuleViolation(format!(
                "该项目已有{}条培训记录，无法删除",
                used
            )));
        }
        self.training_repo.delete_project(id)?;
        Ok(())
    }

    // ==========================================
    // 培训记录
    // ==========================================

    pub fn list_training(&self, user: &AuthUser, filter: &TrainingFilter) -> ApiResult<Vec<TrainingRecord>> {
        let scope = self.scope(user)?;
        let departments = self.employee_departments()?;
        Ok(self
            .training_repo
            .list_records(filter)?
            .into_iter()
            .filter(|r| {
                departments
                    .get(&r.emp_no)
                    .is_some_and(|d| scope.can_view_department(*d))
                    || scope.is_admin()
            })
            .collect())
    }

    #[instrument(skip(self, user, input), fields(emp_no = %input.emp_no))]
    pub fn create_training(&self, user: &AuthUser, input: TrainingInput) -> ApiResult<i64> {
        let record = self.build_record(user, input, None)?;
        let id = self.training_repo.insert_record(&record, Some(user.id))?;
        info!(id, "培训记录已创建");
        Ok(id)
    }

    /// 补考: 原记录必须为失格记录
    #[instrument(skip(self, user, input))]
    pub fn create_retake(&self, user: &AuthUser, original_id: i64, mut input: TrainingInput) -> ApiResult<i64> {
        let original = self
            .training_repo
            .find_record(original_id)?
            .ok_or_else(|| ApiError::not_found("TrainingRecord", original_id))?;
        if !original.is_failed() {
            return Err(ApiError::BusinessRuleViolation("原记录未失格，无需补考".to_string()));
        }
        input.emp_no = original.emp_no.clone();
        if input.project_id.is_none() {
            input.project_id = original.project_id;
        }
        let record = self.build_record(user, input, Some(original_id))?;
        let id = self.training_repo.insert_record(&record, Some(user.id))?;
        info!(id, original_id, "补考记录已创建");
        Ok(id)
    }

    fn build_record(
        &self,
        user: &AuthUser,
        input: TrainingInput,
        retake_of: Option<i64>,
    ) -> ApiResult<NewTrainingRecord> {
        let scope = self.scope(user)?;
        let (employee, _) = self
            .employee_repo
            .find_by_emp_no(input.emp_no.trim())?
            .ok_or_else(|| ApiError::not_found("Employee", &input.emp_no))?;
        scope.ensure_can_write_department(employee.department_id)?;

        let training_date = normalize_date(&input.training_date)
            .ok_or_else(|| ApiError::InvalidInput(format!("培训日期无效: {}", input.training_date)))?;
        let project = match input.project_id {
            Some(pid) => Some(
                self.training_repo
                    .find_project(pid)?
                    .ok_or_else(|| ApiError::not_found("TrainingProject", pid))?,
            ),
            None => None,
        };
        let text = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

        Ok(NewTrainingRecord {
            name: text(input.name).unwrap_or_else(|| employee.name.clone()),
            emp_no: employee.emp_no,
            team_name: text(input.team_name).or(employee.class_name),
            training_date,
            project_id: project.as_ref().map(|p| p.id),
            project_name: project.as_ref().map(|p| p.name.clone()),
            category_name: project.and_then(|p| p.category_name),
            problem_type: text(input.problem_type),
            specific_problem: text(input.specific_problem),
            corrective_measures: text(input.corrective_measures),
            time_spent: input.time_spent,
            score: input.score,
            assessor: text(input.assessor),
            remarks: text(input.remarks),
            is_qualified: input.is_qualified,
            is_disqualified: input.is_disqualified,
            is_retake: retake_of.is_some(),
            retake_of_record_id: retake_of,
            source_file: None,
        })
    }

    pub fn delete_training(&self, user: &AuthUser, id: i64) -> ApiResult<()> {
        let scope = self.scope(user)?;
        let record = self
            .training_repo
            .find_record(id)?
            .ok_or_else(|| ApiError::not_found("TrainingRecord", id))?;
        let department = self
            .employee_repo
            .find_by_emp_no(&record.emp_no)?
            .and_then(|(e, _)| e.department_id);
        scope.ensure_can_write_department(department)?;
        self.training_repo.delete_record(id)?;
        info!(id, "培训记录已删除");
        Ok(())
    }

    pub fn import_training(&self, user: &AuthUser, file_name: &str, bytes: &[u8]) -> ApiResult<ImportApiResponse> {
        self.import_api.run_import(user, &self.importer, file_name, bytes)
    }

    /// 统计: 总数、失格数、合格率（%）、按项目计数（按总数降序）
    pub fn training_stats(&self, user: &AuthUser, filter: &TrainingFilter) -> ApiResult<TrainingStats> {
        let records = self.list_training(user, filter)?;
        Ok(summarize(&records))
    }
}

fn summarize(records: &[TrainingRecord]) -> TrainingStats {
    let total = records.len() as i64;
    let failed = records.iter().filter(|r| r.is_failed()).count() as i64;
    let pass_rate = if total > 0 {
        round_to((total - failed) as f64 / total as f64 * 100.0, 1)
    } else {
        0.0
    };

    let mut by_project: BTreeMap<String, (i64, i64)> = BTreeMap::new();
    for r in records {
        let key = r
            .project_name
            .clone()
            .unwrap_or_else(|| NO_PROJECT_LABEL.to_string());
        let entry = by_project.entry(key).or_default();
        entry.0 += 1;
        if r.is_failed() {
            entry.1 += 1;
        }
    }
    let mut by_project: Vec<ProjectCount> = by_project
        .into_iter()
        .map(|(project_name, (total, failed))| ProjectCount {
            project_name,
            total,
            failed,
        })
        .collect();
    by_project.sort_by(|a, b| b.total.cmp(&a.total));

    TrainingStats {
        total,
        failed,
        pass_rate,
        by_project,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::employee::Employee;
    use crate::domain::types::UserRole;
    use crate::repository::test_support::setup_conn;
    use crate::repository::{ImportLogRepository, UserRepository};

    struct Fixture {
        api: TrainingApi,
        admin: AuthUser,
        manager: AuthUser,
    }

    fn fixture() -> Fixture {
        let conn = setup_conn();
        let dept_repo = Arc::new(DepartmentRepository::from_connection(conn.clone()));
        let root = dept_repo.find_by_id(1).unwrap().unwrap();
        let own = dept_repo.create("甲班", Some(&root), None, None).unwrap();
        let other = dept_repo.create("乙班", Some(&root), None, None).unwrap();
        let employee_repo = Arc::new(EmployeeRepository::from_connection(conn.clone()));
        for (no, dept) in [("E001", own.id), ("E002", other.id)] {
            employee_repo
                .upsert(
                    &Employee {
                        emp_no: no.to_string(),
                        name: format!("员工{}", no),
                        department_id: Some(dept),
                        class_name: Some("一班".to_string()),
                        ..Default::default()
                    },
                    None,
                )
                .unwrap();
        }
        let import_api = Arc::new(ImportApi::new(
            Arc::new(ImportLogRepository::from_connection(conn.clone())),
            dept_repo.clone(),
        ));
        let api = TrainingApi::new(
            Arc::new(TrainingRepository::from_connection(conn.clone())),
            employee_repo,
            dept_repo,
            import_api,
        );
        let admin = UserRepository::from_connection(conn).load_auth_user(1).unwrap().unwrap();
        let manager = AuthUser {
            id: 9,
            username: "m".to_string(),
            display_name: None,
            role: UserRole::Manager,
            department_id: Some(own.id),
            department_name: Some(own.name.clone()),
            department_path: Some(own.path),
        };
        Fixture { api, admin, manager }
    }

    fn input(emp_no: &str, project_id: Option<i64>, score: f64, qualified: bool) -> TrainingInput {
        TrainingInput {
            emp_no: emp_no.to_string(),
            training_date: "2024/03/05".to_string(),
            project_id,
            score: Some(score),
            is_qualified: qualified,
            ..Default::default()
        }
    }

    #[test]
    fn test_projects_normalized_and_unique() {
        let f = fixture();
        let cat = f.api.create_category(&f.admin, "安全类").unwrap();
        assert!(matches!(
            f.api.create_category(&f.admin, "安全类"),
            Err(ApiError::Conflict(_))
        ));
        let pid = f.api.create_project(&f.admin, "1、消防演练。", Some(cat)).unwrap();
        assert_eq!(f.api.list_projects(Some(cat)).unwrap()[0].name, "消防演练");
        assert!(matches!(
            f.api.create_project(&f.admin, "（2）消防演练", Some(cat)),
            Err(ApiError::Conflict(_))
        ));
        f.api.create_training(&f.admin, input("E001", Some(pid), 90.0, true)).unwrap();
        assert!(matches!(
            f.api.delete_project(&f.admin, pid),
            Err(ApiError::BusinessRuleViolation(_))
        ));
    }

    #[test]
    fn test_records_scope_and_retake() {
        let f = fixture();
        let pid = f.api.create_project(&f.admin, "应急处置", None).unwrap();
        let failed_id = f.api.create_training(&f.manager, input("E001", Some(pid), 0.0, false)).unwrap();
        let passed_id = f.api.create_training(&f.admin, input("E002", None, 88.0, true)).unwrap();
        assert!(matches!(
            f.api.create_training(&f.manager, input("E002", None, 80.0, true)),
            Err(ApiError::PermissionDenied(_))
        ));

        let visible = f.api.list_training(&f.manager, &TrainingFilter::default()).unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].project_name.as_deref(), Some("应急处置"));
        assert_eq!(visible[0].team_name.as_deref(), Some("一班"));

        assert!(matches!(
            f.api.create_retake(&f.admin, passed_id, input("E002", None, 95.0, true)),
            Err(ApiError::BusinessRuleViolation(_))
        ));
        let retake_id = f
            .api
            .create_retake(&f.manager, failed_id, input("ignored", None, 92.0, true))
            .unwrap();
        let all = f.api.list_training(&f.admin, &TrainingFilter::default()).unwrap();
        let retake = all.iter().find(|r| r.id == retake_id).unwrap();
        assert!(retake.is_retake);
        assert_eq!(retake.retake_of_record_id, Some(failed_id));
        assert_eq!(retake.emp_no, "E001");
        assert_eq!(retake.project_id, Some(pid));

        let stats = f.api.training_stats(&f.admin, &TrainingFilter::default()).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pass_rate, 66.7);
        assert_eq!(stats.by_project[0].project_name, "应急处置");
        assert_eq!(stats.by_project[0].total, 2);

        let only_failed = f
            .api
            .list_training(
                &f.admin,
                &TrainingFilter {
                    only_failed: true,
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(only_failed.len(), 1);

        f.api.delete_training(&f.manager, retake_id).unwrap();
        assert!(matches!(
            f.api.delete_training(&f.manager, passed_id),
            Err(ApiError::PermissionDenied(_))
        ));
    }
}
