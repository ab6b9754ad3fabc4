// ==========================================
// HTTP 接口集成测试
// ==========================================
// 测试范围:
// 1. Bearer 认证与错误码映射
// 2. multipart 上传导入
// 3. 响应体格式 { success, data } / { success, error, message }
// 4. 多线程运行时下并发请求（同步 API 经阻塞线程池执行）
// ==========================================

mod helpers;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use helpers::ApiTestEnv;
use team_management::http::build_router;

const BOUNDARY: &str = "----team-management-boundary";

fn app(env: &ApiTestEnv) -> Router {
    build_router(env.state.clone())
}

async fn body_json(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

fn post_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    json_request("POST", uri, token, body)
}

fn json_request(method: &str, uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn multipart(uri: &str, token: &str, file_name: &str, content: &str) -> Request<Body> {
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: text/csv\r\n\r\n{c}\r\n--{b}--\r\n",
        b = BOUNDARY,
        f = file_name,
        c = content
    );
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_invalid_token_is_401() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let resp = app(&env)
        .oneshot(get("/api/departments", "not-a-token"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_wrong_password_login_rejected() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let resp = app(&env)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({"username": "admin", "password": "wrong"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_manager_forbidden_on_admin_routes() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let dept = env.create_department("一车间", None).id;
    let (_, token) = env.login_with_token("mgr", "manager", dept);

    let resp = app(&env).oneshot(get("/api/users", &token)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app(&env).oneshot(get("/api/backups", &token)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_department_crud_over_http() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let token = env.admin_token.clone();

    let resp = app(&env)
        .oneshot(post_json(
            "/api/departments",
            &token,
            json!({"name": "检修车间", "parent_id": 1}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "检修车间");
    let id = body["data"]["id"].as_i64().unwrap();

    let resp = app(&env)
        .oneshot(get(&format!("/api/departments/{}", id), &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // parent_id 显式 null: 移到顶层；缺省: 不移动
    let resp = app(&env)
        .oneshot(json_request(
            "PUT",
            &format!("/api/departments/{}", id),
            &token,
            json!({"parent_id": null}),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["level"], 1);
    assert_eq!(body["data"]["parent_id"], Value::Null);

    let resp = app(&env)
        .oneshot(json_request(
            "PUT",
            &format!("/api/departments/{}", id),
            &token,
            json!({"name": "检修一车间"}),
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["name"], "检修一车间");
    assert_eq!(body["data"]["path"], format!("/{}", id));

    let resp = app(&env)
        .oneshot(get("/api/departments/999", &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_requests_on_blocking_pool() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_department("一车间", None);
    let token = env.admin_token.clone();

    let requests = ["/api/personnel/analytics", "/api/departments/tree", "/api/auth/me"]
        .iter()
        .map(|uri| app(&env).oneshot(get(uri, &token)));
    for resp in spawn_all(requests).await {
        let resp = resp.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["success"], true);
    }

    let resp = app(&env)
        .oneshot(get("/api/personnel/analytics", &token))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["total_count"], 0);
    assert_eq!(body["data"]["driver_count"], 0);
    assert_eq!(body["data"]["team_power"].as_array().unwrap().len(), 0);
}

async fn spawn_all<F, T>(futs: impl Iterator<Item = F>) -> Vec<T>
where
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handles: Vec<_> = futs.map(tokio::spawn).collect();
    let mut out = Vec::with_capacity(handles.len());
    for h in handles {
        out.push(h.await.unwrap());
    }
    out
}

#[tokio::test]
async fn test_multipart_import() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_department("一车间", None);
    let token = env.admin_token.clone();

    let csv = "工号,姓名,所属部门\nP001,张三,一车间\nP002,李四,一车间";
    let resp = app(&env)
        .oneshot(multipart("/api/personnel/import", &token, "personnel.csv", csv))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"]["imported"], 2);
    assert!(body["data"]["log_id"].as_i64().unwrap() > 0);

    let resp = app(&env)
        .oneshot(get("/api/personnel", &token))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    // 扩展名不允许
    let resp = app(&env)
        .oneshot(multipart("/api/personnel/import", &token, "personnel.exe", csv))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_quarter_query_validation() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let token = env.admin_token.clone();

    let resp = app(&env)
        .oneshot(get("/api/performance/quarters?year=2024&quarter=5", &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app(&env)
        .oneshot(get("/api/performance/quarters?year=2024&quarter=1", &token))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_nine_grid_export_is_xlsx() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let dept = env.create_department("一车间", None).id;
    env.add_employee("E001", "张三", dept);

    let resp = app(&env)
        .oneshot(get(
            "/api/analytics/nine-grid/export?start_month=2024-01&end_month=2024-03",
            &env.admin_token,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("nine_grid.xlsx"));
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..2], b"PK");
}

#[tokio::test]
async fn test_logout_invalidates_token() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let token = env.admin_token.clone();

    let resp = app(&env)
        .oneshot(post_json("/api/auth/logout", &token, json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app(&env).oneshot(get("/api/auth/me", &token)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
