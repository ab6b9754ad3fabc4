// ==========================================
// 导入流程集成测试
// ==========================================
// 测试范围:
// 1. 人员 → 培训 → 安全检查 CSV 导入
// 2. 权限范围外的行被跳过
// 3. 导入日志按部门范围可见
// ==========================================

mod helpers;

use helpers::ApiTestEnv;
use team_management::domain::employee::PersonnelFilter;
use team_management::domain::import_log::ImportLogFilter;
use team_management::domain::safety::SafetyFilter;
use team_management::domain::training::TrainingFilter;
use team_management::ApiError;

const PERSONNEL_CSV: &str = "工号,姓名,所属部门,岗位,入司时间\n\
P001,张三,一车间,司机,2019-05-01\n\
P002,李四,一车间,副司机,2021-07-15\n\
P003,王五,二车间,司机,2018-01-01\n\
P004,赵六,不存在的部门,司机,2018-01-01\n\
,缺工号,一车间,司机,2018-01-01\n";

fn setup() -> (ApiTestEnv, i64, i64) {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let a = env.create_department("一车间", None).id;
    let b = env.create_department("二车间", None).id;
    (env, a, b)
}

#[test]
fn test_personnel_import_by_manager() {
    let (env, a, _) = setup();
    let manager = env.login_as("mgr_a", "manager", a);

    let resp = env
        .state
        .personnel_api
        .import_personnel(&manager, "人员.csv", PERSONNEL_CSV.as_bytes())
        .unwrap();
    assert_eq!(resp.outcome.total, 5);
    assert_eq!(resp.outcome.imported, 2);
    assert_eq!(resp.outcome.skipped_no_permission, 1);
    assert_eq!(resp.outcome.skipped_no_dept, 1);
    assert_eq!(resp.outcome.failed, 1);
    assert_eq!(resp.outcome.errors.len(), 1);

    let people = env
        .state
        .personnel_api
        .list_personnel(&env.admin, &PersonnelFilter::default())
        .unwrap();
    assert_eq!(people.len(), 2);
    assert!(people.iter().all(|p| p.employee.department_id == Some(a)));
}

#[test]
fn test_reader_cannot_import() {
    let (env, a, _) = setup();
    let reader = env.login_as("reader_a", "user", a);
    let err = env
        .state
        .personnel_api
        .import_personnel(&reader, "人员.csv", PERSONNEL_CSV.as_bytes())
        .unwrap_err();
    assert!(matches!(err, ApiError::PermissionDenied(_)));
}

#[test]
fn test_unsupported_extension_rejected() {
    let (env, _, _) = setup();
    let err = env
        .state
        .personnel_api
        .import_personnel(&env.admin, "人员.txt", PERSONNEL_CSV.as_bytes())
        .unwrap_err();
    assert!(matches!(err, ApiError::ImportError(_)));
}

#[test]
fn test_training_import_creates_projects() {
    let (env, _, _) = setup();
    env.state
        .personnel_api
        .import_personnel(&env.admin, "人员.csv", PERSONNEL_CSV.as_bytes())
        .unwrap();

    let csv = "工号,培训日期,项目类别,项目名称,成绩,是否合格\n\
P001,2024-03-01,安全,应急处置,92,是\n\
P002,2024-03-02,安全,应急处置,55,否\n\
P003,2024-03-03,设备,设备点检,88,是\n\
X999,2024-03-03,设备,设备点检,88,是\n";
    let resp = env
        .state
        .training_api
        .import_training(&env.admin, "培训.csv", csv.as_bytes())
        .unwrap();
    assert_eq!(resp.outcome.imported, 3);
    assert_eq!(resp.outcome.skipped_no_permission, 1);

    let categories = env.state.training_api.list_categories().unwrap();
    assert_eq!(categories.len(), 2);
    let projects = env.state.training_api.list_projects(None).unwrap();
    assert_eq!(projects.len(), 2);

    let stats = env
        .state
        .training_api
        .training_stats(&env.admin, &TrainingFilter::default())
        .unwrap();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.by_project[0].project_name, "应急处置");
    assert_eq!(stats.by_project[0].total, 2);
}

#[test]
fn test_import_logs_scoped_by_department() {
    let (env, a, _) = setup();
    let manager = env.login_as("mgr_a", "manager", a);

    env.state
        .personnel_api
        .import_personnel(&env.admin, "人员.csv", PERSONNEL_CSV.as_bytes())
        .unwrap();
    env.state
        .personnel_api
        .import_personnel(&manager, "一车间.csv", PERSONNEL_CSV.as_bytes())
        .unwrap();

    let all = env
        .state
        .import_api
        .list_logs(&env.admin, &ImportLogFilter::default())
        .unwrap();
    assert_eq!(all.len(), 2);

    let own = env
        .state
        .import_api
        .list_logs(&manager, &ImportLogFilter::default())
        .unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].file_name.as_deref(), Some("一车间.csv"));
    assert_eq!(own[0].module, "personnel");

    let none = env
        .state
        .import_api
        .list_logs(
            &env.admin,
            &ImportLogFilter {
                module: Some("safety".to_string()),
                limit: None,
                offset: None,
            },
        )
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn test_safety_import_and_stats() {
    let (env, _, b) = setup();
    env.state
        .personnel_api
        .import_personnel(&env.admin, "人员.csv", PERSONNEL_CSV.as_bytes())
        .unwrap();
    let manager_b = env.login_as("mgr_b", "manager", b);

    let csv = "检查日期,被检查人,考核,检查类别\n\
2024-03-05,张三,扣2分,作业标准\n\
2024-03-06,张三,扣3分,作业标准\n\
2024-04-01,王五,扣1分,劳动纪律\n\
2024-04-02,外协人员,,劳动纪律\n";
    let resp = env
        .state
        .safety_api
        .import_safety(&env.admin, "安全.csv", csv.as_bytes())
        .unwrap();
    assert_eq!(resp.outcome.imported, 4);

    let stats = env
        .state
        .safety_api
        .safety_stats(&env.admin, &SafetyFilter::default())
        .unwrap();
    assert_eq!(stats.total, 4);
    assert_eq!(stats.top_persons[0].name, "张三");
    assert_eq!(stats.top_persons[0].count, 2);
    let months: Vec<_> = stats.by_month.iter().map(|m| m.month.as_str()).collect();
    assert_eq!(months, vec!["2024-03", "2024-04"]);

    // 二车间经理只看到王五的记录
    let scoped = env
        .state
        .safety_api
        .safety_stats(&manager_b, &SafetyFilter::default())
        .unwrap();
    assert_eq!(scoped.total, 1);
    assert_eq!(scoped.top_persons[0].name, "王五");
}
