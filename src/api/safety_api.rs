// ==========================================
// 班组管理系统 - 安全检查 API
// ==========================================
// 职责: 安全检查记录增删改查、导入、统计
// 权限: 按被检查人（同名人员）所属部门过滤；非在册人员仅管理员可见
// ==========================================

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::import_api::{ImportApi, ImportApiResponse};
use crate::domain::safety::{
    MonthCount, NewSafetyRecord, PersonCount, SafetyFilter, SafetyInput, SafetyRecord, SafetyStats,
};
use crate::domain::user::AuthUser;
use crate::engine::access::AccessScope;
use crate::engine::round_to;
use crate::engine::text::{extract_score_from_assessment, normalize_date};
use crate::i18n::t;
use crate::importer::{person_in_scope, SafetyImporter};
use crate::repository::{DepartmentRepository, EmployeeRepository, SafetyRepository};

/// 统计中被检查人排行条数
const TOP_PERSONS: usize = 10;

pub struct SafetyApi {
    safety_repo: Arc<SafetyRepository>,
    employee_repo: Arc<EmployeeRepository>,
    department_repo: Arc<DepartmentRepository>,
    import_api: Arc<ImportApi>,
    importer: SafetyImporter,
}

impl SafetyApi {
    pub fn new(
        safety_repo: Arc<SafetyRepository>,
        employee_repo: Arc<EmployeeRepository>,
        department_repo: Arc<DepartmentRepository>,
        import_api: Arc<ImportApi>,
    ) -> Self {
        let importer = SafetyImporter::new(employee_repo.clone(), safety_repo.clone());
        Self {
            safety_repo,
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

    /// 姓名 → 同名人员的部门列表
    fn departments_by_name(&self) -> ApiResult<HashMap<String, Vec<Option<i64>>>> {
        let mut map: HashMap<String, Vec<Option<i64>>> = HashMap::new();
        for (employee, _) in self.employee_repo.list(None, None)? {
            map.entry(employee.name).or_default().push(employee.department_id);
        }
        Ok(map)
    }

    fn ensure_person_writable(&self, scope: &AccessScope, person: Option<&str>) -> ApiResult<()> {
        scope.ensure_can_write()?;
        if person_in_scope(scope, person, &self.departments_by_name()?) {
            Ok(())
        } else {
            Err(ApiError::PermissionDenied(t("access.department_denied")))
        }
    }

    pub fn list_safety(&self, user: &AuthUser, filter: &SafetyFilter) -> ApiResult<Vec<SafetyRecord>> {
        let scope = self.scope(user)?;
        let by_name = self.departments_by_name()?;
        Ok(self
            .safety_repo
            .list(filter)?
            .into_iter()
            .filter(|r| person_in_scope(&scope, r.inspected_person.as_deref(), &by_name))
            .collect())
    }

    #[instrument(skip(self, user, input))]
    pub fn create_safety(&self, user: &AuthUser, input: SafetyInput) -> ApiResult<i64> {
        let scope = self.scope(user)?;
        let record = to_record(input)?;
        self.ensure_person_writable(&scope, record.inspected_person.as_deref())?;
        let id = self.safety_repo.insert(&record, Some(user.id))?;
        info!(id, "安全检查记录已创建");
        Ok(id)
    }

    /// 更新记录: 原记录与新记录的被检查人都需在范围内
    #[instrument(skip(self, user, input))]
    pub fn update_safety(&self, user: &AuthUser, id: i64, input: SafetyInput) -> ApiResult<()> {
        let scope = self.scope(user)?;
        let existing = self
            .safety_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("SafetyRecord", id))?;
        self.ensure_person_writable(&scope, existing.inspected_person.as_deref())?;
        let mut record = to_record(input)?;
        self.ensure_person_writable(&scope, record.inspected_person.as_deref())?;
        record.source_file = existing.source_file;
        self.safety_repo.update(id, &record)?;
        info!(id, "安全检查记录已更新");
        Ok(())
    }

    pub fn delete_safety(&self, user: &AuthUser, id: i64) -> ApiResult<()> {
        let scope = self.scope(user)?;
        let existing = self
            .safety_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("SafetyRecord", id))?;
        self.ensure_person_writable(&scope, existing.inspected_person.as_deref())?;
        self.safety_repo.delete(id)?;
        info!(id, "安全检查记录已删除");
        Ok(())
    }

    pub fn import_safety(&self, user: &AuthUser, file_name: &str, bytes: &[u8]) -> ApiResult<ImportApiResponse> {
        self.import_api.run_import(user, &self.importer, file_name, bytes)
    }

    pub fn safety_stats(&self, user: &AuthUser, filter: &SafetyFilter) -> ApiResult<SafetyStats> {
        let records = self.list_safety(user, filter)?;
        Ok(summarize(&records))
    }
}

fn to_record(input: SafetyInput) -> ApiResult<NewSafetyRecord> {
    let inspection_date = normalize_date(&input.inspection_date)
        .ok_or_else(|| ApiError::InvalidInput(format!("检查日期无效: {}", input.inspection_date)))?;
    let text = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
    Ok(NewSafetyRecord {
        category: text(input.category),
        inspection_date,
        location: text(input.location),
        hazard_description: text(input.hazard_description),
        corrective_measures: text(input.corrective_measures),
        deadline_date: input.deadline_date.as_deref().and_then(normalize_date),
        inspected_person: text(input.inspected_person),
        responsible_team: text(input.responsible_team),
        assessment: text(input.assessment),
        rectification_status: text(input.rectification_status),
        rectifier: text(input.rectifier),
        work_type: text(input.work_type),
        responsibility_location: text(input.responsibility_location),
        inspection_item: text(input.inspection_item),
        source_file: None,
    })
}

/// 统计: 总数、总扣分、按月计数、被检查人排行
fn summarize(records: &[SafetyRecord]) -> SafetyStats {
    let mut by_month: BTreeMap<String, i64> = BTreeMap::new();
    let mut by_person: HashMap<String, (i64, f64)> = HashMap::new();
    let mut total_deduction = 0.0;

    for r in records {
        let deduction = extract_score_from_assessment(r.assessment.as_deref());
        total_deduction += deduction;
        *by_month
            .entry(r.inspection_date.format("%Y-%m").to_string())
            .or_default() += 1;
        if let Some(person) = r.inspected_person.as_deref().filter(|p| !p.is_empty()) {
            let entry = by_person.entry(person.to_string()).or_default();
            entry.0 += 1;
            entry.1 += deduction;
        }
    }

    let mut top_persons: Vec<PersonCount> = by_person
        .into_iter()
        .map(|(name, (count, total))| PersonCount {
            name,
            count,
            total_deduction: round_to(total, 1),
        })
        .collect();
    top_persons.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(b.total_deduction.total_cmp(&a.total_deduction))
            .then(a.name.cmp(&b.name))
    });
    top_persons.truncate(TOP_PERSONS);

    SafetyStats {
        total: records.len() as i64,
        total_deduction: round_to(total_deduction, 1),
        by_month: by_month
            .into_iter()
            .map(|(month, count)| MonthCount { month, count })
            .collect(),
        top_persons,
    }
}
