// ==========================================
// 班组管理系统 - 部门管理 API
// ==========================================
// 职责: 部门列表/树查询（按访问范围）、部门增删改（仅管理员）
// 层级: 变更父部门时整棵子树的 level/path 同步重算
// ==========================================

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::domain::department::{
    Department, DepartmentNode, DepartmentPatch, DepartmentSummary, NewDepartment,
};
use crate::domain::user::AuthUser;
use crate::engine::access::AccessScope;
use crate::repository::{DepartmentRepository, EmployeeRepository, UserRepository};

pub struct DepartmentApi {
    department_repo: Arc<DepartmentRepository>,
    employee_repo: Arc<EmployeeRepository>,
    user_repo: Arc<UserRepository>,
}

impl DepartmentApi {
    pub fn new(
        department_repo: Arc<DepartmentRepository>,
        employee_repo: Arc<EmployeeRepository>,
        user_repo: Arc<UserRepository>,
    ) -> Self {
        Self {
            department_repo,
            employee_repo,
            user_repo,
        }
    }

    fn load(&self, user: &AuthUser) -> ApiResult<(Vec<Department>, AccessScope)> {
        let departments = self.department_repo.list_all()?;
        let scope = AccessScope::resolve(user, &departments);
        Ok((departments, scope))
    }

    /// 范围内部门列表（按 path 排序，附人数）
    pub fn list_departments(&self, user: &AuthUser) -> ApiResult<Vec<DepartmentSummary>> {
        let (departments, scope) = self.load(user)?;
        let counts = self.department_repo.employee_counts()?;
        Ok(departments
            .into_iter()
            .filter(|d| scope.can_view_department(Some(d.id)))
            .map(|d| DepartmentSummary {
                employee_count: counts.get(&d.id).copied().unwrap_or(0),
                department: d,
            })
            .collect())
    }

    /// 范围内部门树；父部门不可见的部门作为根节点
    pub fn department_tree(&self, user: &AuthUser) -> ApiResult<Vec<DepartmentNode>> {
        let visible = self.list_departments(user)?;
        Ok(build_tree(visible))
    }

    pub fn get_department(&self, user: &AuthUser, id: i64) -> ApiResult<Department> {
        let (departments, scope) = self.load(user)?;
        scope.ensure_department(Some(id))?;
        departments
            .into_iter()
            .find(|d| d.id == id)
            .ok_or_else(|| ApiError::not_found("Department", id))
    }

    #[instrument(skip(self, user, input), fields(name = %input.name))]
    pub fn create_department(&self, user: &AuthUser, input: NewDepartment) -> ApiResult<Department> {
        let (departments, scope) = self.load(user)?;
        scope.ensure_admin()?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(ApiError::InvalidInput("部门名称不能为空".to_string()));
        }
        let parent = match input.parent_id {
            Some(pid) => Some(
                departments
                    .iter()
                    .find(|d| d.id == pid)
                    .ok_or_else(|| ApiError::not_found("Department", pid))?,
            ),
            None => None,
        };
        let created = self.department_repo.create(
            name,
            parent,
            input.description.as_deref(),
            input.manager_user_id,
        )?;
        info!(id = created.id, path = %created.path, "部门已创建");
        Ok(created)
    }

    /// 更新部门；parent_id 变化时移动子树
    #[instrument(skip(self, user, patch))]
    pub fn update_department(&self, user: &AuthUser, id: i64, patch: DepartmentPatch) -> ApiResult<Department> {
        let (departments, scope) = self.load(user)?;
        scope.ensure_admin()?;
        let current = departments
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| ApiError::not_found("Department", id))?;

        let name = match patch.name.as_deref().map(str::trim) {
            Some("") => return Err(ApiError::InvalidInput("部门名称不能为空".to_string())),
            Some(n) => n.to_string(),
            None => current.name.clone(),
        };
        // Some(None) 移到顶层，Some(Some(pid)) 移到 pid 下
        let relocate = match patch.parent_id.filter(|p| *p != current.parent_id) {
            Some(Some(pid)) => {
                let parent = departments
                    .iter()
                    .find(|d| d.id == pid)
                    .ok_or_else(|| ApiError::not_found("Department", pid))?;
                if current.contains(parent) {
                    return Err(ApiError::BusinessRuleViolation(
                        "不能将部门移动到自身或其下级部门之下".to_string(),
                    ));
                }
                Some((current, Some(parent)))
            }
            Some(None) => Some((current, None)),
            None => None,
        };

        let description = patch.description.or_else(|| current.description.clone());
        let manager = patch.manager_user_id.or(current.manager_user_id);
        self.department_repo
            .update(id, &name, description.as_deref(), manager, relocate)?;
        if let Some((_, parent)) = relocate {
            info!(id, parent = ?parent.map(|p| p.id), "部门已移动");
        }

        self.department_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::not_found("Department", id))
    }

    /// 删除部门: 存在下级部门、人员或用户时拒绝
    pub fn delete_department(&self, user: &AuthUser, id: i64) -> ApiResult<()> {
        let (_, scope) = self.load(user)?;
        scope.ensure_admin()?;
        if self.department_repo.count_children(id)? > 0 {
            return Err(ApiError::BusinessRuleViolation("该部门存在下级部门，无法删除".to_string()));
        }
        if self.employee_repo.count_by_department(id)? > 0 {
            return Err(ApiError::BusinessRuleViolation("该部门存在人员，无法删除".to_string()));
        }
        if self.user_repo.count_by_department(id)? > 0 {
            return Err(ApiError::BusinessRuleViolation("该部门存在用户，无法删除".to_string()));
        }
        self.department_repo.delete(id)?;
        info!(id, "部门已删除");
        Ok(())
    }
}

/// 按 parent_id 组装树，输入需按 path 排序
fn build_tree(items: Vec<DepartmentSummary>) -> Vec<DepartmentNode> {
    let visible: std::collections::HashSet<i64> = items.iter().map(|s| s.department.id).collect();
    let mut children: HashMap<Option<i64>, Vec<DepartmentSummary>> = HashMap::new();
    for item in items {
        let parent = item.department.parent_id.filter(|p| visible.contains(p));
        children.entry(parent).or_default().push(item);
    }
    attach(None, &mut children)
}

fn attach(parent: Option<i64>, children: &mut HashMap<Option<i64>, Vec<DepartmentSummary>>) -> Vec<DepartmentNode> {
    let Some(items) = children.remove(&parent) else {
        return Vec::new();
    };
    items
        .into_iter()
        .map(|item| {
            let id = item.department.id;
            DepartmentNode {
                children: attach(Some(id), children),
                employee_count: item.employee_count,
                department: item.department,
            }
        })
        .collect()
}
