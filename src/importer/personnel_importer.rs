// ==========================================
// 班组管理系统 - 人员花名册导入
// ==========================================
// 必需列: 工号 / 姓名
// 部门: 填写部门 ID 或部门名称，缺失/无效计入 skipped_no_dept
// 部门不在权限范围内计入 skipped_no_permission
// ==========================================

use crate::domain::department::Department;
use crate::domain::employee::Employee;
use crate::domain::types::ImportModule;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::SheetData;
use crate::importer::importer_trait::{ImportContext, ImportOutcome, SheetImporter};
use crate::repository::{DepartmentRepository, EmployeeRepository};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// 花名册字段顺序（模板表头）
pub const PERSONNEL_HEADERS: [&str; 16] = [
    "工号",
    "姓名",
    "所属部门",
    "班级",
    "岗位",
    "出生年月",
    "取证时间",
    "单独驾驶时间",
    "婚姻状况",
    "籍贯",
    "政治面貌",
    "学历",
    "毕业院校",
    "参加工作时间",
    "入司时间",
    "特长及兴趣爱好",
];

/// 模板示例行
pub const PERSONNEL_EXAMPLE: [&str; 16] = [
    "1001",
    "张三",
    "",
    "一班",
    "班长",
    "1990-01-01",
    "",
    "",
    "已婚",
    "江苏南京",
    "群众",
    "本科",
    "某某大学",
    "2012-07-01",
    "2018-03-15",
    "摄影、篮球",
];

pub struct PersonnelImporter {
    employee_repo: Arc<EmployeeRepository>,
    department_repo: Arc<DepartmentRepository>,
}

impl PersonnelImporter {
    pub fn new(
        employee_repo: Arc<EmployeeRepository>,
        department_repo: Arc<DepartmentRepository>,
    ) -> Self {
        Self {
            employee_repo,
            department_repo,
        }
    }

    fn map_employee(mapper: &FieldMapper<'_>, emp_no: String, name: String, department_id: i64) -> Employee {
        Employee {
            emp_no,
            name,
            department_id: Some(department_id),
            class_name: mapper.get_string("班级"),
            position: mapper.get_string("岗位"),
            birth_date: mapper.parse_date_lenient("出生年月"),
            certification_date: mapper.parse_date_lenient("取证时间"),
            solo_driving_date: mapper.parse_date_lenient("单独驾驶时间"),
            marital_status: mapper.get_string("婚姻状况"),
            hometown: mapper.get_string("籍贯"),
            political_status: mapper.get_string("政治面貌"),
            education: mapper.get_string("学历"),
            graduation_school: mapper.get_string("毕业院校"),
            work_start_date: mapper.parse_date_lenient("参加工作时间"),
            entry_date: mapper.parse_date_lenient("入司时间"),
            specialty: mapper.get_string("特长及兴趣爱好"),
            ..Default::default()
        }
    }
}

/// 部门列解析: 纯数字按 ID，否则按名称
fn resolve_department(raw: Option<String>, departments: &[Department]) -> Option<i64> {
    let raw = raw?;
    if raw.chars().all(|c| c.is_ascii_digit()) {
        let id: i64 = raw.parse().ok()?;
        departments.iter().find(|d| d.id == id).map(|d| d.id)
    } else {
        departments.iter().find(|d| d.name == raw).map(|d| d.id)
    }
}

impl SheetImporter for PersonnelImporter {
    fn module(&self) -> ImportModule {
        ImportModule::Personnel
    }

    fn required_headers(&self) -> &'static [&'static str] {
        &["工号", "姓名"]
    }

    #[instrument(skip_all, fields(rows = sheet.rows.len()))]
    fn import_rows(&self, sheet: &SheetData, ctx: &ImportContext<'_>) -> ImportResult<ImportOutcome> {
        let departments = self.department_repo.list_all()?;
        let mut outcome = ImportOutcome::default();

        for row in &sheet.rows {
            let mapper = FieldMapper::new(row);
            let (emp_no, name) = match (mapper.require_string("工号"), mapper.require_string("姓名")) {
                (Ok(no), Ok(name)) => (no, name),
                (Err(e), _) | (_, Err(e)) => {
                    outcome.record_failure(row.row_number, e.to_string());
                    continue;
                }
            };

            let Some(department_id) = resolve_department(mapper.get_string("所属部门"), &departments)
            else {
                outcome.skipped_no_dept += 1;
                continue;
            };
            if !ctx.scope.can_view_department(Some(department_id)) {
                outcome.skipped_no_permission += 1;
                continue;
            }

            // 已存在于范围外部门的人员不可被覆盖
            match self.employee_repo.find_by_emp_no(&emp_no) {
                Ok(Some((existing, _))) if !ctx.scope.can_view_department(existing.department_id) => {
                    outcome.skipped_no_permission += 1;
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    outcome.record_failure(row.row_number, e.to_string());
                    continue;
                }
            }

            let employee = Self::map_employee(&mapper, emp_no, name, department_id);
            match self.employee_repo.upsert(&employee, ctx.created_by) {
                Ok(_) => outcome.imported += 1,
                Err(e) => {
                    warn!(row = row.row_number, emp_no = %employee.emp_no, error = %e, "人员写入失败");
                    outcome.record_failure(row.row_number, e.to_string());
                }
            }
        }

        info!(
            imported = outcome.imported,
            skipped_no_dept = outcome.skipped_no_dept,
            skipped_no_permission = outcome.skipped_no_permission,
            failed = outcome.failed,
            "人员导入完成"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::UserRole;
    use crate::engine::access::{AccessScope, DepartmentScope};
    use crate::importer::error::ImportError;
    use crate::importer::file_parser::UniversalFileParser;
    use crate::repository::test_support::setup_conn;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn setup() -> (PersonnelImporter, Arc<EmployeeRepository>, Vec<Department>) {
        let conn = setup_conn();
        let dept_repo = Arc::new(DepartmentRepository::from_connection(conn.clone()));
        let emp_repo = Arc::new(EmployeeRepository::from_connection(conn));
        let root = dept_repo.find_by_id(1).unwrap().unwrap();
        let a = dept_repo.create("甲班", Some(&root), None, None).unwrap();
        let b = dept_repo.create("乙班", Some(&root), None, None).unwrap();
        let importer = PersonnelImporter::new(emp_repo.clone(), dept_repo);
        (importer, emp_repo, vec![root, a, b])
    }

    fn scope_for(ids: &[i64]) -> AccessScope {
        AccessScope {
            user_id: 2,
            role: UserRole::Manager,
            departments: DepartmentScope::Only(ids.iter().copied().collect::<HashSet<_>>()),
        }
    }

    #[test]
    fn test_import_counts_by_department() {
        let (importer, emp_repo, depts) = setup();
        let csv = format!(
            "工号,姓名,部门,出生年月,婚否\n\
             E001,张三,甲班,1990/01/01,已婚\n\
             E002,李四,{},,\n\
             E003,王五,乙班,,\n\
             E004,赵六,不存在,,\n\
             E005,孙七,,,\n",
            depts[1].id
        );
        let sheet = UniversalFileParser.parse("roster.csv", csv.as_bytes()).unwrap();
        let scope = scope_for(&[depts[1].id]);
        let ctx = ImportContext {
            scope: &scope,
            created_by: Some(2),
            source_file: Some("roster.csv".to_string()),
        };

        let outcome = importer.import(&sheet, &ctx).unwrap();
        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.skipped_no_permission, 1);
        assert_eq!(outcome.skipped_no_dept, 2);
        assert_eq!(outcome.failed, 0);

        let (saved, dept_name) = emp_repo.find_by_emp_no("E001").unwrap().unwrap();
        assert_eq!(dept_name.as_deref(), Some("甲班"));
        assert_eq!(saved.birth_date, NaiveDate::from_ymd_opt(1990, 1, 1));
        assert_eq!(saved.marital_status.as_deref(), Some("已婚"));
        assert!(emp_repo.find_by_emp_no("E003").unwrap().is_none());
    }

    #[test]
    fn test_existing_employee_outside_scope_is_not_overwritten() {
        let (importer, emp_repo, depts) = setup();
        let other = Employee {
            emp_no: "E009".to_string(),
            name: "原名".to_string(),
            department_id: Some(depts[2].id),
            ..Default::default()
        };
        emp_repo.upsert(&other, None).unwrap();

        let sheet = UniversalFileParser
            .parse("r.csv", "工号,姓名,所属部门\nE009,新名,甲班\n".as_bytes())
            .unwrap();
        let scope = scope_for(&[depts[1].id]);
        let ctx = ImportContext {
            scope: &scope,
            created_by: None,
            source_file: None,
        };
        let outcome = importer.import(&sheet, &ctx).unwrap();
        assert_eq!(outcome.imported, 0);
        assert_eq!(outcome.skipped_no_permission, 1);
        let (kept, _) = emp_repo.find_by_emp_no("E009").unwrap().unwrap();
        assert_eq!(kept.name, "原名");
    }

    #[test]
    fn test_missing_required_headers() {
        let (importer, _, _) = setup();
        let sheet = UniversalFileParser
            .parse("r.csv", "编号,名字\n1,甲\n".as_bytes())
            .unwrap();
        let scope = AccessScope {
            user_id: 1,
            role: UserRole::Admin,
            departments: DepartmentScope::All,
        };
        let ctx = ImportContext {
            scope: &scope,
            created_by: None,
            source_file: None,
        };
        assert!(matches!(
            importer.import(&sheet, &ctx),
            Err(ImportError::MissingHeaders(missing)) if missing == vec!["工号", "姓名"]
        ));
    }
}
