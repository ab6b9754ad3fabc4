// ==========================================
// 班组管理系统 - 部门层级权限模型
// ==========================================
// 管理员: 全部部门
// 其他角色: 本部门 + 路径前缀为 "{本部门路径}/" 的全部下级部门
// 未分配部门的非管理员: 不可见任何部门
// 写入: 仅 admin / manager
// ==========================================

use crate::domain::department::Department;
use crate::domain::types::UserRole;
use crate::domain::user::AuthUser;
use crate::i18n::t;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccessError {
    #[error("{0}")]
    PermissionDenied(String),
}

/// 可见部门范围
#[derive(Debug, Clone, PartialEq)]
pub enum DepartmentScope {
    All,
    Only(HashSet<i64>),
}

/// 当前操作者的访问范围
#[derive(Debug, Clone)]
pub struct AccessScope {
    pub user_id: i64,
    pub role: UserRole,
    pub departments: DepartmentScope,
}

impl AccessScope {
    /// 根据操作者与部门表计算访问范围
    pub fn resolve(user: &AuthUser, departments: &[Department]) -> Self {
        let scope = if user.is_admin() {
            DepartmentScope::All
        } else {
            let own = user
                .department_id
                .and_then(|id| departments.iter().find(|d| d.id == id));
            match own {
                Some(own) => DepartmentScope::Only(
                    departments
                        .iter()
                        .filter(|d| own.contains(d))
                        .map(|d| d.id)
                        .collect(),
                ),
                None => DepartmentScope::Only(HashSet::new()),
            }
        };
        Self {
            user_id: user.id,
            role: user.role,
            departments: scope,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// 部门是否可见；未归属部门的数据仅管理员可见
    pub fn can_view_department(&self, department_id: Option<i64>) -> bool {
        match (&self.departments, department_id) {
            (DepartmentScope::All, _) => true,
            (DepartmentScope::Only(ids), Some(id)) => ids.contains(&id),
            (DepartmentScope::Only(_), None) => false,
        }
    }

    /// 可见部门 ID 列表；None 表示不限
    pub fn department_ids(&self) -> Option<Vec<i64>> {
        match &self.departments {
            DepartmentScope::All => None,
            DepartmentScope::Only(ids) => {
                let mut ids: Vec<i64> = ids.iter().copied().collect();
                ids.sort_unstable();
                Some(ids)
            }
        }
    }

    pub fn ensure_department(&self, department_id: Option<i64>) -> Result<(), AccessError> {
        if self.can_view_department(department_id) {
            Ok(())
        } else {
            Err(AccessError::PermissionDenied(t("access.department_denied")))
        }
    }

    pub fn ensure_can_write(&self) -> Result<(), AccessError> {
        if self.role.can_write() {
            Ok(())
        } else {
            Err(AccessError::PermissionDenied(t("access.write_denied")))
        }
    }

    pub fn ensure_admin(&self) -> Result<(), AccessError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AccessError::PermissionDenied(t("access.admin_required")))
        }
    }

    /// 写入目标部门: 角色可写 且 部门在范围内
    pub fn ensure_can_write_department(&self, department_id: Option<i64>) -> Result<(), AccessError> {
        self.ensure_can_write()?;
        self.ensure_department(department_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dept(id: i64, parent: Option<i64>, path: &str) -> Department {
        Department {
            id,
            name: format!("部门{}", id),
            parent_id: parent,
            description: None,
            manager_user_id: None,
            level: path.matches('/').count() as i64,
            path: path.to_string(),
            created_at: None,
        }
    }

    fn tree() -> Vec<Department> {
        vec![
            dept(1, None, "/1"),
            dept(2, Some(1), "/1/2"),
            dept(3, Some(2), "/1/2/3"),
            dept(4, Some(1), "/1/4"),
            // 路径前缀相似但不属于部门2的子树
            dept(22, Some(1), "/1/22"),
        ]
    }

    fn user(role: UserRole, dept: Option<i64>) -> AuthUser {
        AuthUser {
            id: 7,
            username: "u".to_string(),
            display_name: None,
            role,
            department_id: dept,
            department_name: None,
            department_path: None,
        }
    }

    #[test]
    fn test_admin_sees_everything() {
        let scope = AccessScope::resolve(&user(UserRole::Admin, None), &tree());
        assert!(scope.can_view_department(Some(3)));
        assert!(scope.can_view_department(None));
        assert!(scope.department_ids().is_none());
        assert!(scope.ensure_admin().is_ok());
    }

    #[test]
    fn test_manager_sees_own_subtree_only() {
        let scope = AccessScope::resolve(&user(UserRole::Manager, Some(2)), &tree());
        assert_eq!(scope.department_ids(), Some(vec![2, 3]));
        assert!(!scope.can_view_department(Some(1)));
        assert!(!scope.can_view_department(Some(22)));
        assert!(!scope.can_view_department(None));
        assert!(scope.ensure_can_write_department(Some(3)).is_ok());
        assert!(matches!(
            scope.ensure_department(Some(4)),
            Err(AccessError::PermissionDenied(_))
        ));
        assert!(scope.ensure_admin().is_err());
    }

    #[test]
    fn test_user_is_read_only_and_unassigned_sees_nothing() {
        let reader = AccessScope::resolve(&user(UserRole::User, Some(4)), &tree());
        assert!(reader.can_view_department(Some(4)));
        assert!(reader.ensure_can_write().is_err());

        let orphan = AccessScope::resolve(&user(UserRole::Manager, None), &tree());
        assert_eq!(orphan.department_ids(), Some(vec![]));
        assert!(!orphan.can_view_department(Some(1)));
    }
}
