// ==========================================
// 班组管理系统 - 培训记录导入
// ==========================================
// 必需列: 工号 / 培训日期
// 项目按清洗后的名称匹配，不存在时自动创建（分类同理）
// ==========================================

use crate::domain::employee::Employee;
use crate::domain::training::{NewTrainingRecord, TrainingProject};
use crate::domain::types::ImportModule;
use crate::engine::text::normalize_project_name;
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::SheetData;
use crate::importer::importer_trait::{ImportContext, ImportOutcome, SheetImporter};
use crate::repository::{EmployeeRepository, TrainingRepository};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct TrainingImporter {
    employee_repo: Arc<EmployeeRepository>,
    training_repo: Arc<TrainingRepository>,
}

/// 已解析的项目快照
#[derive(Debug, Clone, Default, PartialEq)]
struct ProjectRef {
    id: Option<i64>,
    name: Option<String>,
    category_name: Option<String>,
}

/// 导入过程中的项目/分类缓存
struct ProjectResolver<'a> {
    repo: &'a TrainingRepository,
    projects: Vec<TrainingProject>,
    categories: HashMap<String, i64>,
}

impl<'a> ProjectResolver<'a> {
    fn load(repo: &'a TrainingRepository) -> ImportResult<Self> {
        let projects = repo.list_projects(None)?;
        let categories = repo
            .list_categories()?
            .into_iter()
            .map(|c| (c.name, c.id))
            .collect();
        Ok(Self {
            repo,
            projects,
            categories,
        })
    }

    fn resolve(&mut self, raw_name: Option<String>, category: Option<String>) -> ImportResult<ProjectRef> {
        let name = raw_name
            .map(|n| normalize_project_name(&n))
            .filter(|n| !n.is_empty());
        let Some(name) = name else {
            return Ok(ProjectRef {
                category_name: category,
                ..Default::default()
            });
        };

        let matched = {
            let mut candidates = self
                .projects
                .iter()
                .filter(|p| normalize_project_name(&p.name) == name);
            match &category {
                Some(cat) => candidates.find(|p| p.category_name.as_ref() == Some(cat)),
                None => candidates.next(),
            }
        };
        if let Some(p) = matched {
            return Ok(ProjectRef {
                id: Some(p.id),
                name: Some(p.name.clone()),
                category_name: p.category_name.clone(),
            });
        }

        let category_id = match &category {
            Some(cat) => Some(self.category_id(cat)?),
            None => None,
        };
        let id = self.repo.create_project(&name, category_id)?;
        debug!(project = %name, id, "导入时新建培训项目");
        self.projects.push(TrainingProject {
            id,
            name: name.clone(),
            category_id,
            category_name: category.clone(),
        });
        Ok(ProjectRef {
            id: Some(id),
            name: Some(name),
            category_name: category,
        })
    }

    fn category_id(&mut self, name: &str) -> ImportResult<i64> {
        if let Some(id) = self.categories.get(name) {
            return Ok(*id);
        }
        let id = self.repo.create_category(name)?;
        self.categories.insert(name.to_string(), id);
        Ok(id)
    }
}

impl TrainingImporter {
    pub fn new(employee_repo: Arc<EmployeeRepository>, training_repo: Arc<TrainingRepository>) -> Self {
        Self {
            employee_repo,
            training_repo,
        }
    }

    fn map_record(
        mapper: &FieldMapper<'_>,
        employee: &Employee,
        project: ProjectRef,
        source_file: Option<String>,
    ) -> ImportResult<NewTrainingRecord> {
        Ok(NewTrainingRecord {
            emp_no: employee.emp_no.clone(),
            name: mapper.get_string("姓名").unwrap_or_else(|| employee.name.clone()),
            team_name: mapper.get_string("班组"),
            training_date: mapper.require_date("培训日期")?,
            project_id: project.id,
            project_name: project.name,
            category_name: project.category_name,
            problem_type: mapper.get_string("问题类型"),
            specific_problem: mapper.get_string("具体问题"),
            corrective_measures: mapper.get_string("整改措施"),
            time_spent: mapper.parse_f64("用时")?,
            score: mapper.parse_f64("成绩")?,
            assessor: mapper.get_string("考核人"),
            remarks: mapper.get_string("备注"),
            is_qualified: mapper.parse_bool("是否合格", true)?,
            is_disqualified: mapper.parse_bool("是否失格", false)?,
            is_retake: false,
            retake_of_record_id: None,
            source_file,
        })
    }
}

impl SheetImporter for TrainingImporter {
    fn module(&self) -> ImportModule {
        ImportModule::Training
    }

    fn required_headers(&self) -> &'static [&'static str] {
        &["工号", "培训日期"]
    }

    #[instrument(skip_all, fields(rows = sheet.rows.len()))]
    fn import_rows(&self, sheet: &SheetData, ctx: &ImportContext<'_>) -> ImportResult<ImportOutcome> {
        let employees: HashMap<String, Employee> = self
            .employee_repo
            .list(None, None)?
            .into_iter()
            .map(|(e, _)| (e.emp_no.clone(), e))
            .collect();
        let mut resolver = ProjectResolver::load(&self.training_repo)?;
        let mut outcome = ImportOutcome::default();

        for row in &sheet.rows {
            let mapper = FieldMapper::new(row);
            let emp_no = match mapper.require_string("工号") {
                Ok(no) => no,
                Err(e) => {
                    outcome.record_failure(row.row_number, e.to_string());
                    continue;
                }
            };
            let Some(employee) = employees
                .get(&emp_no)
                .filter(|e| ctx.scope.can_view_department(e.department_id))
            else {
                outcome.skipped_no_permission += 1;
                continue;
            };

            let result = resolver
                .resolve(mapper.get_string("项目名称"), mapper.get_string("项目类别"))
                .and_then(|project| {
                    Self::map_record(&mapper, employee, project, ctx.source_file.clone())
                })
                .and_then(|record| {
                    self.training_repo
                        .insert_record(&record, ctx.created_by)
                        .map_err(Into::into)
                });
            match result {
                Ok(_) => outcome.imported += 1,
                Err(e) => {
                    warn!(row = row.row_number, emp_no = %emp_no, error = %e, "培训记录导入失败");
                    outcome.record_failure(row.row_number, e.to_string());
                }
            }
        }

        info!(
            imported = outcome.imported,
            skipped_no_permission = outcome.skipped_no_permission,
            failed = outcome.failed,
            "培训导入完成"
        );
        Ok(outcome)
    }
}
