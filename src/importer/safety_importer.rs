// ==========================================
// 班组管理系统 - 安全检查记录导入
// ==========================================
// 必需列: 检查日期
// 被检查人按姓名关联人员档案决定权限；非在册人员仅管理员可导入
// ==========================================

use crate::domain::safety::NewSafetyRecord;
use crate::domain::types::ImportModule;
use crate::engine::access::AccessScope;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::SheetData;
use crate::importer::importer_trait::{ImportContext, ImportOutcome, SheetImporter};
use crate::repository::{EmployeeRepository, SafetyRepository};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct SafetyImporter {
    employee_repo: Arc<EmployeeRepository>,
    safety_repo: Arc<SafetyRepository>,
}

/// 被检查人是否在访问范围内
///
/// 同名人员任一在范围内即可见
pub fn person_in_scope(
    scope: &AccessScope,
    person: Option<&str>,
    departments_by_name: &HashMap<String, Vec<Option<i64>>>,
) -> bool {
    if scope.is_admin() {
        return true;
    }
    person
        .and_then(|p| departments_by_name.get(p.trim()))
        .is_some_and(|depts| depts.iter().any(|d| scope.can_view_department(*d)))
}

impl SafetyImporter {
    pub fn new(employee_repo: Arc<EmployeeRepository>, safety_repo: Arc<SafetyRepository>) -> Self {
        Self {
            employee_repo,
            safety_repo,
        }
    }

    fn map_record(mapper: &FieldMapper<'_>, source_file: Option<String>) -> ImportResult<NewSafetyRecord> {
        Ok(NewSafetyRecord {
            category: mapper.get_string("检查类别"),
            inspection_date: mapper.require_date("检查日期")?,
            location: mapper.get_string("检查地点"),
            hazard_description: mapper.get_string("隐患描述"),
            corrective_measures: mapper.get_string("整改措施"),
            deadline_date: mapper.parse_date_lenient("整改期限"),
            inspected_person: mapper.get_string("被检查人"),
            responsible_team: mapper.get_string("责任班组"),
            assessment: mapper.get_string("考核"),
            rectification_status: mapper.get_string("整改状态"),
            rectifier: mapper.get_string("整改人"),
            work_type: mapper.get_string("工种"),
            responsibility_location: mapper.get_string("责任地点"),
            inspection_item: mapper.get_string("检查项目"),
            source_file,
        })
    }
}

impl SheetImporter for SafetyImporter {
    fn module(&self) -> ImportModule {
        ImportModule::Safety
    }

    fn required_headers(&self) -> &'static [&'static str] {
        &["检查日期"]
    }

    #[instrument(skip_all, fields(rows = sheet.rows.len()))]
    fn import_rows(&self, sheet: &SheetData, ctx: &ImportContext<'_>) -> ImportResult<ImportOutcome> {
        let mut departments_by_name: HashMap<String, Vec<Option<i64>>> = HashMap::new();
        for (employee, _) in self.employee_repo.list(None, None)? {
            departments_by_name
                .entry(employee.name)
                .or_default()
                .push(employee.department_id);
        }
        let mut outcome = ImportOutcome::default();

        for row in &sheet.rows {
            let mapper = FieldMapper::new(row);
            let record = match Self::map_record(&mapper, ctx.source_file.clone()) {
                Ok(r) => r,
                Err(e) => {
                    outcome.record_failure(row.row_number, e.to_string());
                    continue;
                }
            };
            if !person_in_scope(ctx.scope, record.inspected_person.as_deref(), &departments_by_name) {
                outcome.skipped_no_permission += 1;
                continue;
            }
            match self.safety_repo.insert(&record, ctx.created_by) {
                Ok(_) => outcome.imported += 1,
                Err(e) => {
                    warn!(row = row.row_number, error = %e, "安全检查记录写入失败");
                    outcome.record_failure(row.row_number, e.to_string());
                }
            }
        }

        info!(
            imported = outcome.imported,
            skipped_no_permission = outcome.skipped_no_permission,
            failed = outcome.failed,
            "安全检查导入完成"
        );
        Ok(outcome)
    }
}
