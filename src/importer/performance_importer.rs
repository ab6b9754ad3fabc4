// ==========================================
// 班组管理系统 - 月度绩效导入
// ==========================================
// 必需列: 工号 / 年份 / 月份
// 可选列: 姓名 / 得分(分数) / 等级
// 工号不在权限范围内的人员计入 skipped_no_permission
// ==========================================

use crate::domain::employee::Employee;
use crate::domain::performance::{match_grade_option, validate_period};
use crate::domain::types::ImportModule;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::SheetData;
use crate::importer::importer_trait::{ImportContext, ImportOutcome, SheetImporter};
use crate::repository::{EmployeeRepository, PerformanceRepository, PerformanceUpsert};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct PerformanceImporter {
    employee_repo: Arc<EmployeeRepository>,
    performance_repo: Arc<PerformanceRepository>,
}

/// 单行解析结果
struct PerformanceRow {
    emp_no: String,
    name: Option<String>,
    year: i32,
    month: u32,
    score: Option<f64>,
    grade: Option<String>,
}

impl PerformanceImporter {
    pub fn new(
        employee_repo: Arc<EmployeeRepository>,
        performance_repo: Arc<PerformanceRepository>,
    ) -> Self {
        Self {
            employee_repo,
            performance_repo,
        }
    }

    fn map_row(mapper: &FieldMapper<'_>) -> ImportResult<PerformanceRow> {
        let emp_no = mapper.require_string("工号")?;
        let year = mapper
            .parse_i64("年份")?
            .ok_or_else(|| missing(mapper, "年份"))?;
        let month = mapper
            .parse_i64("月份")?
            .ok_or_else(|| missing(mapper, "月份"))?;
        Ok(PerformanceRow {
            emp_no,
            name: mapper.get_string("姓名"),
            year: year as i32,
            month: u32::try_from(month).unwrap_or(0),
            score: mapper.parse_f64("得分")?,
            grade: mapper.get_string("等级"),
        })
    }
}

fn missing(mapper: &FieldMapper<'_>, field: &str) -> ImportError {
    ImportError::InvalidCell {
        row: mapper.row_number(),
        column: field.to_string(),
        message: "不能为空".to_string(),
    }
}

impl SheetImporter for PerformanceImporter {
    fn module(&self) -> ImportModule {
        ImportModule::Performance
    }

    fn required_headers(&self) -> &'static [&'static str] {
        &["工号", "年份", "月份"]
    }

    #[instrument(skip_all, fields(rows = sheet.rows.len()))]
    fn import_rows(&self, sheet: &SheetData, ctx: &ImportContext<'_>) -> ImportResult<ImportOutcome> {
        let employees: HashMap<String, Employee> = self
            .employee_repo
            .list(None, None)?
            .into_iter()
            .map(|(e, _)| (e.emp_no.clone(), e))
            .collect();
        let options = self.performance_repo.list_grade_options()?;
        let grade_map = self.performance_repo.grade_map()?;
        let mut outcome = ImportOutcome::default();

        for row in &sheet.rows {
            let mapper = FieldMapper::new(row);
            let parsed = match Self::map_row(&mapper) {
                Ok(p) => p,
                Err(e) => {
                    outcome.record_failure(row.row_number, e.to_string());
                    continue;
                }
            };

            let Some(employee) = employees
                .get(&parsed.emp_no)
                .filter(|e| ctx.scope.can_view_department(e.department_id))
            else {
                outcome.skipped_no_permission += 1;
                continue;
            };

            if let Err(msg) = validate_period(parsed.year, parsed.month) {
                outcome.record_failure(row.row_number, msg);
                continue;
            }

            let grade = match parsed.grade.as_deref() {
                Some(raw) => match match_grade_option(raw, &options) {
                    Some(g) => Some(g),
                    None => {
                        outcome.record_failure(row.row_number, format!("无效的绩效等级: {}", raw));
                        continue;
                    }
                },
                None => None,
            };

            // 缺少得分时按等级映射补齐
            let score = parsed
                .score
                .or_else(|| grade.as_ref().and_then(|g| grade_map.get(g).copied()));
            if score.is_none() && grade.is_none() {
                outcome.record_failure(row.row_number, "得分与等级均为空");
                continue;
            }

            let name = parsed.name.as_deref().unwrap_or(&employee.name);
            let record = PerformanceUpsert {
                emp_no: &parsed.emp_no,
                name,
                year: parsed.year,
                month: parsed.month,
                score,
                grade: grade.as_deref(),
                src_file: ctx.source_file.as_deref(),
                created_by: ctx.created_by,
            };
            match self.performance_repo.upsert(&record) {
                Ok(()) => outcome.imported += 1,
                Err(e) => {
                    warn!(row = row.row_number, emp_no = %parsed.emp_no, error = %e, "绩效写入失败");
                    outcome.record_failure(row.row_number, e.to_string());
                }
            }
        }

        info!(
            imported = outcome.imported,
            skipped_no_permission = outcome.skipped_no_permission,
            failed = outcome.failed,
            "绩效导入完成"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::UserRole;
    use crate::engine::access::{AccessScope, DepartmentScope};
    use crate::importer::file_parser::UniversalFileParser;
    use crate::repository::test_support::setup_conn;
    use crate::repository::DepartmentRepository;
    use std::collections::HashSet;

    #[test]
    fn test_import_performance_rows() {
        let conn = setup_conn();
        let dept_repo = DepartmentRepository::from_connection(conn.clone());
        let emp_repo = Arc::new(EmployeeRepository::from_connection(conn.clone()));
        let perf_repo = Arc::new(PerformanceRepository::from_connection(conn));
        let root = dept_repo.find_by_id(1).unwrap().unwrap();
        let a = dept_repo.create("甲班", Some(&root), None, None).unwrap();
        let b = dept_repo.create("乙班", Some(&root), None, None).unwrap();
        for (no, name, dept) in [("E001", "张三", a.id), ("E002", "李四", b.id)] {
            emp_repo
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

        let csv = "工号,姓名,年份,月份,分数,等级\n\
                   E001,,2024,1,,b+\n\
                   E001,,2024,2,88,C\n\
                   E002,李四,2024,1,90,B\n\
                   E404,无名,2024,1,90,B\n\
                   E001,,2024,13,90,B\n\
                   E001,,2024,3,90,X\n\
                   E001,,2024,4,,\n";
        let sheet = UniversalFileParser.parse("perf.csv", csv.as_bytes()).unwrap();
        let scope = AccessScope {
            user_id: 2,
            role: UserRole::Manager,
            departments: DepartmentScope::Only(HashSet::from([a.id])),
        };
        let ctx = ImportContext {
            scope: &scope,
            created_by: Some(2),
            source_file: Some("perf.csv".to_string()),
        };
        let importer = PerformanceImporter::new(emp_repo, perf_repo.clone());
        let outcome = importer.import(&sheet, &ctx).unwrap();

        assert_eq!(outcome.total, 7);
        assert_eq!(outcome.imported, 2);
        assert_eq!(outcome.skipped_no_permission, 2);
        assert_eq!(outcome.failed, 3);

        let records = perf_repo.list(Some(2024), Some(1), Some("E001")).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].grade.as_deref(), Some("B+"));
        assert_eq!(records[0].score, Some(95.0));
        assert_eq!(records[0].name, "张三");
        assert_eq!(records[0].src_file.as_deref(), Some("perf.csv"));
    }
}
