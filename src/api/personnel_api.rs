// ==========================================
// 班组管理系统 - 人员档案 API
// ==========================================
// 职责: 人员列表/详情/统计图表、增改删、批量删除、花名册导入与模板
// 权限: 读取按部门范围过滤；写入需 admin/manager 且目标部门在范围内
// ==========================================

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use rusqlite::types::Value as SqlValue;
use serde::Serialize;
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::import_api::{ImportApi, ImportApiResponse};
use crate::domain::employee::{Employee, EmployeeInput, PersonnelField, PersonnelFilter, PersonnelView};
use crate::domain::user::AuthUser;
use crate::engine::access::AccessScope;
use crate::engine::personnel_stats::{
    personnel_analytics, personnel_charts, personnel_view, PersonnelAnalytics, PersonnelCharts,
};
use crate::engine::text::normalize_date;
use crate::importer::{write_sheet, PersonnelImporter, XlsxCell, PERSONNEL_EXAMPLE, PERSONNEL_HEADERS};
use crate::repository::{DepartmentRepository, EmployeeRepository};

/// 批量删除结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchDeleteResult {
    pub deleted: usize,
    pub skipped: usize,
}

/// 人员列表 + 图表
#[derive(Debug, Clone, Serialize)]
pub struct PersonnelOverview {
    pub rows: Vec<PersonnelView>,
    pub charts: PersonnelCharts,
}

// ==========================================
// PersonnelApi - 人员档案 API
// ==========================================
pub struct PersonnelApi {
    employee_repo: Arc<EmployeeRepository>,
    department_repo: Arc<DepartmentRepository>,
    import_api: Arc<ImportApi>,
    importer: PersonnelImporter,
}

impl PersonnelApi {
    pub fn new(
        employee_repo: Arc<EmployeeRepository>,
        department_repo: Arc<DepartmentRepository>,
        import_api: Arc<ImportApi>,
    ) -> Self {
        let importer = PersonnelImporter::new(employee_repo.clone(), department_repo.clone());
        Self {
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

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    /// 范围内人员列表（附部门名与派生字段）
    pub fn list_personnel(&self, user: &AuthUser, filter: &PersonnelFilter) -> ApiResult<Vec<PersonnelView>> {
        let scope = self.scope(user)?;
        if let Some(dept) = filter.department_id {
            scope.ensure_department(Some(dept))?;
        }
        let today = Self::today();
        Ok(self
            .employee_repo
            .list(filter.department_id, filter.keyword.as_deref())?
            .into_iter()
            .filter(|(e, _)| scope.can_view_department(e.department_id))
            .map(|(e, dept_name)| personnel_view(e, dept_name, today))
            .collect())
    }

    /// 列表与统计图表一并返回
    pub fn personnel_overview(&self, user: &AuthUser, filter: &PersonnelFilter) -> ApiResult<PersonnelOverview> {
        let rows = self.list_personnel(user, filter)?;
        let charts = personnel_charts(&rows);
        Ok(PersonnelOverview { rows, charts })
    }

    /// 司机队伍分析（风险分布、班组战力、经验与稳定性散点、籍贯与政治面貌）
    pub fn personnel_analytics(&self, user: &AuthUser) -> ApiResult<PersonnelAnalytics> {
        let scope = self.scope(user)?;
        let departments = self.department_repo.list_all()?;
        let leaves: Vec<(i64, String)> = departments
            .iter()
            .filter(|d| scope.can_view_department(Some(d.id)))
            .filter(|d| !departments.iter().any(|c| c.parent_id == Some(d.id)))
            .map(|d| (d.id, d.name.clone()))
            .collect();
        let rows = self.list_personnel(user, &PersonnelFilter::default())?;
        Ok(personnel_analytics(&rows, &leaves))
    }

    pub fn get_personnel(&self, user: &AuthUser, emp_no: &str) -> ApiResult<PersonnelView> {
        let scope = self.scope(user)?;
        let (employee, dept_name) = self
            .employee_repo
            .find_by_emp_no(emp_no)?
            .ok_or_else(|| ApiError::not_found("Employee", emp_no))?;
        scope.ensure_department(employee.department_id)?;
        Ok(personnel_view(employee, dept_name, Self::today()))
    }

    /// 新增或更新人员，返回 true 表示新增
    #[instrument(skip(self, user, input), fields(emp_no = %input.emp_no))]
    pub fn upsert_personnel(&self, user: &AuthUser, input: EmployeeInput) -> ApiResult<bool> {
        let scope = self.scope(user)?;
        let emp_no = input.emp_no.trim().to_string();
        let name = input.name.trim().to_string();
        if emp_no.is_empty() || name.is_empty() {
            return Err(ApiError::InvalidInput("工号和姓名不能为空".to_string()));
        }
        let department_id = input
            .department_id
            .ok_or_else(|| ApiError::InvalidInput("所属部门不能为空".to_string()))?;
        scope.ensure_can_write_department(Some(department_id))?;
        if self.department_repo.find_by_id(department_id)?.is_none() {
            return Err(ApiError::not_found("Department", department_id));
        }
        if let Some((existing, _)) = self.employee_repo.find_by_emp_no(&emp_no)? {
            scope.ensure_department(existing.department_id)?;
        }

        let date = |raw: &Option<String>| raw.as_deref().and_then(normalize_date);
        let text = |raw: Option<String>| raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        let employee = Employee {
            emp_no,
            name,
            department_id: Some(department_id),
            birth_date: date(&input.birth_date),
            certification_date: date(&input.certification_date),
            solo_driving_date: date(&input.solo_driving_date),
            work_start_date: date(&input.work_start_date),
            entry_date: date(&input.entry_date),
            class_name: text(input.class_name),
            position: text(input.position),
            marital_status: text(input.marital_status),
            hometown: text(input.hometown),
            political_status: text(input.political_status),
            education: text(input.education),
            graduation_school: text(input.graduation_school),
            specialty: text(input.specialty),
            ..Default::default()
        };
        let created = self.employee_repo.upsert(&employee, Some(user.id))?;
        info!(created, "人员档案已保存");
        Ok(created)
    }

    /// 修改单个字段（白名单）；日期字段规范化，部门字段重新校验范围
    #[instrument(skip(self, user, value))]
    pub fn update_personnel_field(
        &self,
        user: &AuthUser,
        emp_no: &str,
        field: &str,
        value: Option<&str>,
    ) -> ApiResult<()> {
        let scope = self.scope(user)?;
        let field = PersonnelField::from_str(field)
            .ok_or_else(|| ApiError::InvalidInput(format!("不允许修改的字段: {}", field)))?;
        let (existing, _) = self
            .employee_repo
            .find_by_emp_no(emp_no)?
            .ok_or_else(|| ApiError::not_found("Employee", emp_no))?;
        scope.ensure_can_write_department(existing.department_id)?;

        let value = value.map(str::trim).filter(|v| !v.is_empty());
        let sql_value = match field {
            PersonnelField::Name => match value {
                Some(v) => SqlValue::Text(v.to_string()),
                None => return Err(ApiError::InvalidInput("姓名不能为空".to_string())),
            },
            PersonnelField::DepartmentId => {
                let id: i64 = value
                    .and_then(|v| v.parse().ok())
                    .ok_or_else(|| ApiError::InvalidInput("部门ID无效".to_string()))?;
                scope.ensure_department(Some(id))?;
                if self.department_repo.find_by_id(id)?.is_none() {
                    return Err(ApiError::not_found("Department", id));
                }
                SqlValue::Integer(id)
            }
            f if f.is_date() => match value.and_then(normalize_date) {
                Some(d) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
                None => SqlValue::Null,
            },
            _ => value
                .map(|v| SqlValue::Text(v.to_string()))
                .unwrap_or(SqlValue::Null),
        };
        self.employee_repo.update_field(emp_no, field, sql_value)?;
        Ok(())
    }

    pub fn delete_personnel(&self, user: &AuthUser, emp_no: &str) -> ApiResult<()> {
        let scope = self.scope(user)?;
        let (existing, _) = self
            .employee_repo
            .find_by_emp_no(emp_no)?
            .ok_or_else(|| ApiError::not_found("Employee", emp_no))?;
        scope.ensure_can_write_department(existing.department_id)?;
        self.employee_repo.delete(emp_no)?;
        info!(emp_no, "人员已删除");
        Ok(())
    }

    /// 批量删除，范围外或不存在的工号计入 skipped
    pub fn batch_delete_personnel(&self, user: &AuthUser, emp_nos: &[String]) -> ApiResult<BatchDeleteResult> {
        let scope = self.scope(user)?;
        scope.ensure_can_write()?;
        let mut result = BatchDeleteResult {
            deleted: 0,
            skipped: 0,
        };
        for emp_no in emp_nos {
            match self.employee_repo.find_by_emp_no(emp_no)? {
                Some((e, _)) if scope.can_view_department(e.department_id) => {
                    result.deleted += self.employee_repo.delete(emp_no)?;
                }
                _ => result.skipped += 1,
            }
        }
        info!(deleted = result.deleted, skipped = result.skipped, "批量删除人员");
        Ok(result)
    }

    pub fn import_personnel(&self, user: &AuthUser, file_name: &str, bytes: &[u8]) -> ApiResult<ImportApiResponse> {
        self.import_api.run_import(user, &self.importer, file_name, bytes)
    }

    /// 花名册导入模板（xlsx）
    pub fn personnel_template(&self) -> ApiResult<Vec<u8>> {
        let example: Vec<XlsxCell> = PERSONNEL_EXAMPLE.iter().map(|v| XlsxCell::from(*v)).collect();
        Ok(write_sheet("人员导入模板", &PERSONNEL_HEADERS, &[example])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::UserRole;
    use crate::importer::{ExcelParser, FileParser};
    use crate::repository::test_support::setup_conn;
    use crate::repository::{ImportLogRepository, UserRepository};

    struct Fixture {
        api: PersonnelApi,
        admin: AuthUser,
        manager: AuthUser,
        own_dept: i64,
        other_dept: i64,
    }

    fn fixture() -> Fixture {
        let conn = setup_conn();
        let dept_repo = Arc::new(DepartmentRepository::from_connection(conn.clone()));
        let root = dept_repo.find_by_id(1).unwrap().unwrap();
        let own = dept_repo.create("甲班", Some(&root), None, None).unwrap();
        let other = dept_repo.create("乙班", Some(&root), None, None).unwrap();
        let import_api = Arc::new(ImportApi::new(
            Arc::new(ImportLogRepository::from_connection(conn.clone())),
            dept_repo.clone(),
        ));
        let api = PersonnelApi::new(
            Arc::new(EmployeeRepository::from_connection(conn.clone())),
            dept_repo,
            import_api,
        );
        let admin = UserRepository::from_connection(conn).load_auth_user(1).unwrap().unwrap();
        let manager = AuthUser {
            id: 50,
            username: "m".to_string(),
            display_name: None,
            role: UserRole::Manager,
            department_id: Some(own.id),
            department_name: Some(own.name.clone()),
            department_path: Some(own.path.clone()),
        };
        Fixture {
            api,
            admin,
            manager,
            own_dept: own.id,
            other_dept: other.id,
        }
    }

    fn input(emp_no: &str, dept: i64) -> EmployeeInput {
        EmployeeInput {
            emp_no: emp_no.to_string(),
            name: format!("员工{}", emp_no),
            department_id: Some(dept),
            birth_date: Some("1990/05/01".to_string()),
            entry_date: Some("2020.01".to_string()),
            education: Some("本科".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_upsert_and_scope_filtering() {
        let f = fixture();
        assert!(f.api.upsert_personnel(&f.admin, input("E001", f.own_dept)).unwrap());
        assert!(f.api.upsert_personnel(&f.admin, input("E002", f.other_dept)).unwrap());
        assert!(!f.api.upsert_personnel(&f.manager, input("E001", f.own_dept)).unwrap());
        assert!(matches!(
            f.api.upsert_personnel(&f.manager, input("E003", f.other_dept)),
            Err(ApiError::PermissionDenied(_))
        ));

        let rows = f.api.list_personnel(&f.manager, &PersonnelFilter::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].employee.emp_no, "E001");
        assert_eq!(rows[0].employee.entry_date, NaiveDate::from_ymd_opt(2020, 1, 1));
        assert!(rows[0].age.is_some());

        let overview = f.api.personnel_overview(&f.admin, &PersonnelFilter::default()).unwrap();
        assert_eq!(overview.rows.len(), 2);
        assert_eq!(overview.charts.education.values.iter().sum::<u32>(), 2);

        assert!(matches!(
            f.api.get_personnel(&f.manager, "E002"),
            Err(ApiError::PermissionDenied(_))
        ));
    }

    #[test]
    fn test_update_field_whitelist_and_dates() {
        let f = fixture();
        f.api.upsert_personnel(&f.admin, input("E001", f.own_dept)).unwrap();
        assert!(matches!(
            f.api.update_personnel_field(&f.manager, "E001", "emp_no", Some("X")),
            Err(ApiError::InvalidInput(_))
        ));
        f.api
            .update_personnel_field(&f.manager, "E001", "certification_date", Some("2015年6月"))
            .unwrap();
        let view = f.api.get_personnel(&f.manager, "E001").unwrap();
        assert_eq!(view.employee.certification_date, NaiveDate::from_ymd_opt(2015, 6, 1));

        assert!(matches!(
            f.api.update_personnel_field(
                &f.manager,
                "E001",
                "department_id",
                Some(&f.other_dept.to_string())
            ),
            Err(ApiError::PermissionDenied(_))
        ));
        f.api.update_personnel_field(&f.manager, "E001", "hometown", None).unwrap();
    }

    #[test]
    fn test_batch_delete_skips_out_of_scope() {
        let f = fixture();
        f.api.upsert_personnel(&f.admin, input("E001", f.own_dept)).unwrap();
        f.api.upsert_personnel(&f.admin, input("E002", f.other_dept)).unwrap();
        let result = f
            .api
            .batch_delete_personnel(
                &f.manager,
                &["E001".to_string(), "E002".to_string(), "E404".to_string()],
            )
            .unwrap();
        assert_eq!(result, BatchDeleteResult { deleted: 1, skipped: 2 });
        assert!(f.api.get_personnel(&f.admin, "E002").is_ok());
    }

    #[test]
    fn test_template_headers() {
        let f = fixture();
        let bytes = f.api.personnel_template().unwrap();
        let sheet = ExcelParser.parse_bytes(&bytes).unwrap();
        assert_eq!(sheet.headers.len(), PERSONNEL_HEADERS.len());
        assert_eq!(sheet.headers[0], "工号");
        assert_eq!(sheet.rows[0].cells["姓名"], "张三");
    }
}
