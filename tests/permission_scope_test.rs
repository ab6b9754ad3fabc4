// ==========================================
// 部门权限范围集成测试
// ==========================================
// 测试范围:
// 1. 经理仅可见本部门及下级部门的数据
// 2. 普通用户只读
// 3. 管理员专属操作
// ==========================================

mod helpers;

use helpers::ApiTestEnv;
use team_management::domain::employee::{EmployeeInput, PersonnelFilter};
use team_management::domain::performance::PerformanceInput;
use team_management::domain::safety::{SafetyFilter, SafetyInput};
use team_management::ApiError;

struct Org {
    env: ApiTestEnv,
    workshop_a: i64,
    team_a1: i64,
    workshop_b: i64,
}

fn org() -> Org {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let workshop_a = env.create_department("一车间", None).id;
    let team_a1 = env.create_department("一车间甲班", Some(workshop_a)).id;
    let workshop_b = env.create_department("二车间", None).id;

    env.add_employee("A001", "张三", workshop_a);
    env.add_employee("A101", "李四", team_a1);
    env.add_employee("B001", "王五", workshop_b);
    Org {
        env,
        workshop_a,
        team_a1,
        workshop_b,
    }
}

fn emp_nos(org: &Org, user: &team_management::domain::user::AuthUser) -> Vec<String> {
    let mut list: Vec<String> = org
        .env
        .state
        .personnel_api
        .list_personnel(user, &PersonnelFilter::default())
        .unwrap()
        .into_iter()
        .map(|p| p.employee.emp_no)
        .collect();
    list.sort();
    list
}

#[test]
fn test_manager_sees_own_subtree_only() {
    let org = org();
    let manager = org.env.login_as("mgr_a", "manager", org.workshop_a);

    assert_eq!(emp_nos(&org, &manager), vec!["A001", "A101"]);
    assert_eq!(emp_nos(&org, &org.env.admin), vec!["A001", "A101", "B001"]);

    let err = org
        .env
        .state
        .personnel_api
        .get_personnel(&manager, "B001")
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));

    // 按范围外部门过滤同样拒绝
    let err = org
        .env
        .state
        .personnel_api
        .list_personnel(
            &manager,
            &PersonnelFilter {
                department_id: Some(org.workshop_b),
                keyword: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));
}

#[test]
fn test_team_manager_cannot_see_parent_department() {
    let org = org();
    let manager = org.env.login_as("mgr_a1", "manager", org.team_a1);
    assert_eq!(emp_nos(&org, &manager), vec!["A101"]);
}

#[test]
fn test_reader_is_read_only() {
    let org = org();
    let reader = org.env.login_as("reader_a", "user", org.workshop_a);
    assert_eq!(emp_nos(&org, &reader), vec!["A001", "A101"]);

    let err = org
        .env
        .state
        .personnel_api
        .upsert_personnel(
            &reader,
            EmployeeInput {
                emp_no: "A002".to_string(),
                name: "赵六".to_string(),
                department_id: Some(org.workshop_a),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));

    let err = org
        .env
        .state
        .performance_api
        .upsert_performance(
            &reader,
            PerformanceInput {
                emp_no: "A001".to_string(),
                name: None,
                year: 2024,
                month: 1,
                score: None,
                grade: Some("B+".to_string()),
            },
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));
}

#[test]
fn test_manager_cannot_move_employee_out_of_scope() {
    let org = org();
    let manager = org.env.login_as("mgr_a", "manager", org.workshop_a);

    let err = org
        .env
        .state
        .personnel_api
        .upsert_personnel(
            &manager,
            EmployeeInput {
                emp_no: "A001".to_string(),
                name: "张三".to_string(),
                department_id: Some(org.workshop_b),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));
}

#[test]
fn test_batch_delete_skips_out_of_scope() {
    let org = org();
    let manager = org.env.login_as("mgr_a", "manager", org.workshop_a);

    let result = org
        .env
        .state
        .personnel_api
        .batch_delete_personnel(
            &manager,
            &["A001".to_string(), "B001".to_string(), "X999".to_string()],
        )
        .unwrap();
    assert_eq!(result.deleted, 1);
    assert_eq!(result.skipped, 2);
    assert_eq!(emp_nos(&org, &org.env.admin), vec!["A101", "B001"]);
}

#[test]
fn test_safety_records_follow_inspected_person_scope() {
    let org = org();
    let manager = org.env.login_as("mgr_b", "manager", org.workshop_b);

    for person in ["张三", "王五", "外协人员"] {
        org.env
            .state
            .safety_api
            .create_safety(
                &org.env.admin,
                SafetyInput {
                    inspection_date: "2024-03-05".to_string(),
                    inspected_person: Some(person.to_string()),
                    assessment: Some("扣2分".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    let visible = org
        .env
        .state
        .safety_api
        .list_safety(&manager, &SafetyFilter::default())
        .unwrap();
    let names: Vec<_> = visible
        .iter()
        .filter_map(|r| r.inspected_person.clone())
        .collect();
    assert_eq!(names, vec!["王五".to_string()]);

    let all = org
        .env
        .state
        .safety_api
        .list_safety(&org.env.admin, &SafetyFilter::default())
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn test_admin_only_operations() {
    let org = org();
    let manager = org.env.login_as("mgr_a", "manager", org.workshop_a);

    assert!(matches!(
        org.env.state.auth_api.list_users(&manager).unwrap_err(),
        ApiError::PermissionDenied(_)
    ));
    assert!(matches!(
        org.env.state.backup_api.list_backups(&manager).unwrap_err(),
        ApiError::PermissionDenied(_)
    ));
    assert!(matches!(
        org.env.state.config_api.get_logs(&manager, None, None).unwrap_err(),
        ApiError::PermissionDenied(_)
    ));
    assert!(matches!(
        org.env
            .state
            .department_api
            .delete_department(&manager, org.team_a1)
            .unwrap_err(),
        ApiError::PermissionDenied(_)
    ));
}

#[test]
fn test_driver_analytics_scoped_to_leaf_teams() {
    let o = org();
    for (emp_no, dept) in [("D001", o.team_a1), ("D002", o.workshop_b)] {
        o.env
            .state
            .personnel_api
            .upsert_personnel(
                &o.env.admin,
                EmployeeInput {
                    emp_no: emp_no.to_string(),
                    name: emp_no.to_string(),
                    department_id: Some(dept),
                    position: Some("电客车司机".to_string()),
                    hometown: Some("河南洛阳".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    let all = o.env.state.personnel_api.personnel_analytics(&o.env.admin).unwrap();
    assert_eq!(all.total_count, 5);
    assert_eq!(all.driver_count, 2);
    let teams: Vec<_> = all.team_power.iter().map(|t| t.team.as_str()).collect();
    assert_eq!(teams, vec!["一车间甲班", "二车间"]);

    let manager = o.env.login_as("mgr_a", "manager", o.workshop_a);
    let scoped = o.env.state.personnel_api.personnel_analytics(&manager).unwrap();
    assert_eq!(scoped.total_count, 3);
    assert_eq!(scoped.driver_count, 1);
    assert_eq!(scoped.team_power.len(), 1);
    assert_eq!(scoped.team_power[0].department_id, o.team_a1);
    assert_eq!(scoped.hometown_stats.labels, vec!["河南·洛阳"]);
}
